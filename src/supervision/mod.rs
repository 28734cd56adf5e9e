//! Per-action supervision of agent tool calls.

pub mod dispatcher;
pub mod evaluator;
pub mod extract;
pub mod judge;
pub mod registry;
pub mod types;

pub use dispatcher::ActionDispatcher;
pub use evaluator::{ActionKind, DomainDenylist, EvaluationRequest, Evaluator};
pub use judge::{ClickJudge, JudgeModel};
pub use registry::EvaluatorRegistry;
pub use types::*;
