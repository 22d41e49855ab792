//! Storyloom domain core.
//!
//! Pure domain logic for the prompt-assembly and character-state pipeline:
//! trait text codec, state extraction, state merging under protection rules,
//! prompt templates, and the embedding job state machine. The collaborator
//! traits the outer crates implement live in [`ports`].
//!
//! This crate performs no I/O.

pub mod attributes;
pub mod embedding_job;
pub mod error;
pub mod extraction;
pub mod merge;
pub mod ports;
pub mod prompt;
pub mod protection;
pub mod types;
