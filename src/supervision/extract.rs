use crate::error::{OverwatchError, Result};
use crate::supervision::types::{ChatCompletionMessage, ProposedAction};
use serde_json::{Map, Value};

/// Tool name under which browser agents emit their action batch
pub const AGENT_OUTPUT_TOOL: &str = "AgentOutput";

/// Field of the tool arguments holding the action list
pub const ACTION_FIELD: &str = "action";

/// Decompose the first tool call of `message` into ordered actions.
///
/// A message without a matching tool call yields an empty batch. A matching
/// call whose arguments cannot be read is an error: the batch cannot be
/// supervised, so it must not run either.
pub fn extract_actions(
    message: &ChatCompletionMessage,
    tool_name: &str,
) -> Result<Vec<ProposedAction>> {
    let call = match message.tool_calls.first() {
        Some(call) if call.function.name == tool_name => call,
        _ => return Ok(Vec::new()),
    };

    let args: Value = serde_json::from_str(&call.function.arguments).map_err(|e| {
        OverwatchError::MalformedToolCall(format!("{} arguments are not JSON: {}", tool_name, e))
    })?;

    tracing::debug!("{} arguments: {}", tool_name, args);

    let entries = args
        .get(ACTION_FIELD)
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            OverwatchError::MalformedToolCall(format!(
                "{} arguments have no '{}' list",
                tool_name, ACTION_FIELD
            ))
        })?;

    let mut actions = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let obj = entry.as_object().ok_or_else(|| {
            OverwatchError::MalformedToolCall(format!("action #{} is not an object", i + 1))
        })?;
        for (name, arguments) in obj {
            let arguments = match arguments {
                Value::Object(map) => map.clone(),
                _ => Map::new(),
            };
            actions.push(ProposedAction::new(name.clone(), arguments));
        }
    }

    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervision::types::{FunctionCall, ToolCall};
    use serde_json::json;

    #[test]
    fn test_extract_preserves_order() {
        let message = ChatCompletionMessage::with_tool_call(
            AGENT_OUTPUT_TOOL,
            &json!({
                "current_state": {"next_goal": "buy"},
                "action": [
                    {"input_text": {"index": 3, "text": "socks"}},
                    {"click_element": {"index": 7}},
                    {"done": {"text": "ok"}}
                ]
            }),
        );
        let actions = extract_actions(&message, AGENT_OUTPUT_TOOL).unwrap();
        let names: Vec<_> = actions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["input_text", "click_element", "done"]);
        assert_eq!(actions[1].arguments["index"], 7);
    }

    #[test]
    fn test_other_tool_yields_empty_batch() {
        let message = ChatCompletionMessage::with_tool_call("search", &json!({"q": "x"}));
        assert!(extract_actions(&message, AGENT_OUTPUT_TOOL).unwrap().is_empty());

        let no_calls = ChatCompletionMessage {
            role: "assistant".to_string(),
            content: Some("hello".to_string()),
            tool_calls: vec![],
        };
        assert!(extract_actions(&no_calls, AGENT_OUTPUT_TOOL).unwrap().is_empty());
    }

    #[test]
    fn test_only_first_tool_call_is_inspected() {
        let mut message = ChatCompletionMessage::with_tool_call("other", &json!({}));
        message.tool_calls.push(ToolCall {
            id: "2".to_string(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: AGENT_OUTPUT_TOOL.to_string(),
                arguments: json!({"action": [{"go_back": {}}]}).to_string(),
            },
        });
        assert!(extract_actions(&message, AGENT_OUTPUT_TOOL).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_arguments_fail_closed() {
        let mut message = ChatCompletionMessage::with_tool_call(AGENT_OUTPUT_TOOL, &json!({}));
        assert!(matches!(
            extract_actions(&message, AGENT_OUTPUT_TOOL),
            Err(OverwatchError::MalformedToolCall(_))
        ));

        message.tool_calls[0].function.arguments = "{not json".to_string();
        assert!(extract_actions(&message, AGENT_OUTPUT_TOOL).is_err());
    }

    #[test]
    fn test_non_object_arguments_become_empty_map() {
        let message = ChatCompletionMessage::with_tool_call(
            AGENT_OUTPUT_TOOL,
            &json!({"action": [{"go_back": null}]}),
        );
        let actions = extract_actions(&message, AGENT_OUTPUT_TOOL).unwrap();
        assert_eq!(actions.len(), 1);
        assert!(actions[0].arguments.is_empty());
    }
}
