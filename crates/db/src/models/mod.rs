pub mod adventure;
pub mod character;
pub mod embedding_job;
pub mod protection_rule;
pub mod status;
pub mod trait_embedding;
