pub mod broadcast;
pub mod core;
pub mod execution;
pub mod history;
pub mod quorum;
pub mod signal;
