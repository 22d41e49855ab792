pub mod admin_jobs;
pub mod adventures;
