//! Free-form "computer use": a vision model returns device-level events
//! which are replayed on the current page.

use crate::agent::action::ActionResult;
use crate::error::Result;
use crate::replay::{InputReplayer, PageHandle};
use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;

/// Tool name the model uses for device events
pub const COMPUTER_TOOL: &str = "computer";

pub const COMPUTER_USE_DESCRIPTION: &str = "Perform computer use actions. Call this when you want \
to click outside of the highlighted elements! It will enable you to click anywhere on the page, \
for example dropdowns, buttons, etc.";

#[async_trait]
pub trait ComputerUseModel: Send + Sync {
    /// Propose device events given a PNG screenshot and the conversation so far.
    async fn propose(&self, screenshot_b64: &str, history: &str) -> Result<Vec<Value>>;
}

/// Screenshot the page, ask the model for events and replay them.
pub async fn perform_computer_use(
    page: &dyn PageHandle,
    model: &dyn ComputerUseModel,
    replayer: &InputReplayer,
    history: &[Value],
) -> Result<ActionResult> {
    let png = page.screenshot(None).await?;
    let screenshot_b64 = base64::engine::general_purpose::STANDARD.encode(png);
    let history = serde_json::to_string(history)?;

    let actions = model.propose(&screenshot_b64, &history).await?;
    tracing::info!("Computer-use model proposed {} action(s)", actions.len());

    let report = replayer.replay(page, actions.clone()).await?;
    if !report.skipped.is_empty() || !report.failed.is_empty() {
        tracing::warn!(
            "Computer use: {} skipped, {} failed",
            report.skipped.len(),
            report.failed.len()
        );
    }

    Ok(ActionResult::success(format!(
        "Executed actions: {}",
        Value::Array(actions)
    )))
}
