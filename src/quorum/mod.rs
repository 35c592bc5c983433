pub mod evaluator;
pub mod state;

pub use evaluator::{EngineSettings, QuorumEngine};
pub use state::{QuorumState, RecordOutcome};
