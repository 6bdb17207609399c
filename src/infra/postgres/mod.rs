pub mod audit_repo;
pub mod participant_repo;
pub mod store;
