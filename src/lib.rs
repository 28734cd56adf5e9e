pub mod agent;
pub mod config;
pub mod error;
pub mod replay;
pub mod supervision;

use crate::agent::llm::OpenAiJudge;
use crate::config::OverwatchConfig;
use crate::supervision::{ActionDispatcher, DomainDenylist, EvaluatorRegistry};
use std::sync::Arc;

/// Dispatcher with the standard browser supervisors, judging clicks with the
/// configured OpenAI-compatible model.
pub fn build_dispatcher(config: &OverwatchConfig) -> ActionDispatcher {
    let judge = Arc::new(OpenAiJudge::new(config.judge.clone()));
    let denylist = DomainDenylist::new(&config.supervision.navigation_denylist);
    ActionDispatcher::new(EvaluatorRegistry::browser_defaults(judge, denylist))
        .with_tool_name(config.supervision.tool_name.clone())
}
