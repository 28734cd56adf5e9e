//! Agent-side actions, model providers and the CDP page handle.

pub mod action;
pub mod cdp;
pub mod computer_use;
pub mod evaluation;
pub mod llm;

pub use action::{ActionResult, ElementText, RunControl};
pub use cdp::CdpPage;
pub use computer_use::{perform_computer_use, ComputerUseModel};
pub use evaluation::{evaluate_task_success, summarize_conversation, TaskSuccess};
pub use llm::{AnthropicComputerUse, OpenAiJudge};
