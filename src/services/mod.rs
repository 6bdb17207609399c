pub mod checkout;
pub mod idempotency;
pub mod recorder;
pub mod stats;
pub mod validation;
