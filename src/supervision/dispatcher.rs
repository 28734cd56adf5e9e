use crate::error::Result;
use crate::supervision::evaluator::{ActionKind, EvaluationRequest};
use crate::supervision::extract::{extract_actions, AGENT_OUTPUT_TOOL};
use crate::supervision::registry::EvaluatorRegistry;
use crate::supervision::types::{ChatCompletionMessage, SupervisionContext, SupervisionVerdict};
use serde_json::{Map, Value};

/// Supervises a whole batch of proposed browser actions.
pub struct ActionDispatcher {
    registry: EvaluatorRegistry,
    tool_name: String,
}

impl ActionDispatcher {
    pub fn new(registry: EvaluatorRegistry) -> Self {
        Self {
            registry,
            tool_name: AGENT_OUTPUT_TOOL.to_string(),
        }
    }

    /// Match a tool name other than `AgentOutput`.
    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = tool_name.into();
        self
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Evaluate every action of the batch in order.
    ///
    /// The first non-approving verdict is returned as-is and later actions are
    /// not evaluated. If all approve, the result is a single approval listing
    /// each explanation with its 1-based position.
    pub async fn supervise(
        &self,
        message: &ChatCompletionMessage,
        context: &SupervisionContext,
        kwargs: &Map<String, Value>,
    ) -> Result<SupervisionVerdict> {
        let actions = extract_actions(message, &self.tool_name)?;
        tracing::debug!("Supervising batch of {} action(s)", actions.len());

        let mut passing_reasons = String::new();
        for (i, action) in actions.iter().enumerate() {
            let evaluator = self.registry.lookup(&ActionKind::parse(&action.name));
            let request = EvaluationRequest {
                message,
                action,
                context,
                kwargs,
            };

            let verdict = evaluator.evaluate(&request).await?;
            if !verdict.is_approved() {
                tracing::info!(
                    "Action {} ({}) blocked with {}: {}",
                    i + 1,
                    action.name,
                    verdict.decision,
                    verdict.explanation
                );
                return Ok(verdict);
            }

            tracing::debug!("Action {} ({}) approved", i + 1, action.name);
            passing_reasons.push_str(&format!(
                "Supervisor: {} returned: {}\n",
                i + 1,
                verdict.explanation
            ));
        }

        Ok(SupervisionVerdict::approve(passing_reasons))
    }
}
