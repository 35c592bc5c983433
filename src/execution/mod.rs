pub mod executor;
pub mod verification;

pub use executor::{ExecutionRequest, Executor, LoggingExecutor};
pub use verification::{verify_binary_hash, VerificationError};
