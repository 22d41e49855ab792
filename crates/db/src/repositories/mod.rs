pub mod adventure_repo;
pub mod character_repo;
pub mod embedding_job_repo;
pub mod protection_rule_repo;
pub mod trait_embedding_repo;

pub use adventure_repo::AdventureRepo;
pub use character_repo::CharacterRepo;
pub use embedding_job_repo::EmbeddingJobRepo;
pub use protection_rule_repo::ProtectionRuleRepo;
pub use trait_embedding_repo::TraitEmbeddingRepo;
