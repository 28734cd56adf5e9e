use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// One browser action proposed by the agent, in batch order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedAction {
    /// Action-type name, e.g. `click_element`
    pub name: String,
    /// Parameter mapping for the action
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ProposedAction {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// String argument by key, if present.
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }
}

/// Decision kinds a supervisor can return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    Approve,
    Reject,
    Escalate,
    Terminate,
    Modify,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Approve => "approve",
            DecisionKind::Reject => "reject",
            DecisionKind::Escalate => "escalate",
            DecisionKind::Terminate => "terminate",
            DecisionKind::Modify => "modify",
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecisionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(DecisionKind::Approve),
            "reject" => Ok(DecisionKind::Reject),
            "escalate" => Ok(DecisionKind::Escalate),
            "terminate" => Ok(DecisionKind::Terminate),
            "modify" => Ok(DecisionKind::Modify),
            other => Err(format!("Unknown decision '{}'", other)),
        }
    }
}

/// Verdict for a single action or a whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisionVerdict {
    pub decision: DecisionKind,
    /// Human-readable explanation
    #[serde(default)]
    pub explanation: String,
    /// Replacement payload, only for `Modify`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<Value>,
}

impl SupervisionVerdict {
    fn with(decision: DecisionKind, explanation: impl Into<String>) -> Self {
        Self {
            decision,
            explanation: explanation.into(),
            modified: None,
        }
    }

    pub fn approve(explanation: impl Into<String>) -> Self {
        Self::with(DecisionKind::Approve, explanation)
    }

    pub fn reject(explanation: impl Into<String>) -> Self {
        Self::with(DecisionKind::Reject, explanation)
    }

    pub fn escalate(explanation: impl Into<String>) -> Self {
        Self::with(DecisionKind::Escalate, explanation)
    }

    pub fn terminate(explanation: impl Into<String>) -> Self {
        Self::with(DecisionKind::Terminate, explanation)
    }

    pub fn modify(explanation: impl Into<String>, modified: Value) -> Self {
        Self {
            decision: DecisionKind::Modify,
            explanation: explanation.into(),
            modified: Some(modified),
        }
    }

    pub fn is_approved(&self) -> bool {
        self.decision == DecisionKind::Approve
    }
}

/// Function call inside a tool call (OpenAI wire shape)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "default_tool_type")]
    pub kind: String,
    pub function: FunctionCall,
}

fn default_tool_type() -> String {
    "function".to_string()
}

/// Assistant message carrying the agent's tool calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionMessage {
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

fn default_role() -> String {
    "assistant".to_string()
}

impl ChatCompletionMessage {
    /// Assistant message with a single tool call.
    pub fn with_tool_call(name: &str, arguments: &Value) -> Self {
        Self {
            role: default_role(),
            content: None,
            tool_calls: vec![ToolCall {
                id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                kind: default_tool_type(),
                function: FunctionCall {
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                },
            }],
        }
    }
}

/// Conversation the supervised agent has seen so far.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupervisionContext {
    /// Role-tagged chat messages, in OpenAI format
    #[serde(default)]
    pub messages: Vec<Value>,
}

impl SupervisionContext {
    pub fn new(messages: Vec<Value>) -> Self {
        Self { messages }
    }

    /// URL of the last image attached to the most recent multimodal user message.
    pub fn latest_image_url(&self) -> Option<String> {
        let parts = self
            .messages
            .iter()
            .rev()
            .filter(|m| m.get("role").and_then(|r| r.as_str()) == Some("user"))
            .find_map(|m| m.get("content").and_then(|c| c.as_array()))?;

        parts
            .iter()
            .filter_map(|part| part.get("image_url"))
            .filter_map(|img| img.get("url").and_then(|u| u.as_str()))
            .last()
            .map(str::to_string)
    }
}
