//! Request-path services for Storyloom.
//!
//! Everything here is written against the `storyloom_core::ports` traits so
//! the API can wire PostgreSQL adapters and tests can wire in-memory ones.

pub mod assembler;
pub mod cache;
pub mod state_service;
pub mod turn;

pub use assembler::{AssembledPrompt, PromptAssembler};
pub use cache::{InMemoryContextCache, CONTEXT_CACHE_TTL};
pub use state_service::{CharacterStateService, LoadedState};
pub use turn::{TurnOutcome, TurnPreview, TurnProcessor};
