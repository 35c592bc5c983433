pub mod types;
pub mod validator;

pub use types::{ActionKey, ActionKind, CandidateAction, RawEvent, Signal, SignerId};
pub use validator::{validate, RejectReason, ValidatorConfig};
