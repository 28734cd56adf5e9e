use crate::agent::computer_use::{ComputerUseModel, COMPUTER_TOOL};
use crate::config::schema::{ComputerUseConfig, ProviderConfig};
use crate::error::{OverwatchError, Result};
use crate::supervision::judge::{JudgeModel, JudgeRequest, JudgeResponse};
use crate::supervision::types::FunctionCall;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const COMPUTER_USE_BETA: &str = "computer-use-2024-10-22";
const COMPUTER_TOOL_TYPE: &str = "computer_20241022";

const COMPUTER_USE_SYSTEM_PROMPT: &str = "You are an extremely capable browser agent. You will get \
the history of a browser session and a screenshot of the current page. Decide what to do next to \
fulfill the user goal.\n\nTry to perform actions together. For example, if you want to move and \
click on an element, give all the actions together: move the mouse to the element, then click on it.";

/// Judge backed by an OpenAI-compatible chat completions endpoint
pub struct OpenAiJudge {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiJudge {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Request body forcing a call to the decision function.
    pub fn build_body(&self, request: &JudgeRequest) -> Value {
        let name = request.function["name"].clone();
        json!({
            "model": self.config.model,
            "messages": request.messages,
            "functions": [request.function],
            "function_call": { "name": name },
        })
    }
}

/// Pull the forced function call out of a chat completion.
///
/// Accepts both the legacy `function_call` field and the first `tool_calls` entry.
pub fn parse_judge_response(json: &Value) -> JudgeResponse {
    let message = &json["choices"][0]["message"];
    let call = message
        .get("function_call")
        .filter(|c| !c.is_null())
        .or_else(|| message["tool_calls"].get(0).map(|c| &c["function"]));

    let function_call = call.and_then(|c| {
        Some(FunctionCall {
            name: c.get("name")?.as_str()?.to_string(),
            arguments: c.get("arguments")?.as_str()?.to_string(),
        })
    });

    JudgeResponse { function_call }
}

#[async_trait]
impl JudgeModel for OpenAiJudge {
    async fn decide(&self, request: &JudgeRequest) -> Result<JudgeResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let mut http = self.client.post(&url).json(&self.build_body(request));
        if let Some(api_key) = self.config.resolved_api_key() {
            http = http.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = http
            .send()
            .await
            .map_err(|e| OverwatchError::Llm(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(OverwatchError::Llm(format!("OpenAI API error: {}", error_text)));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| OverwatchError::Llm(format!("Failed to parse response: {}", e)))?;

        Ok(parse_judge_response(&json))
    }
}

/// Anthropic model with the computer-use tool enabled
pub struct AnthropicComputerUse {
    client: Client,
    config: ComputerUseConfig,
}

impl AnthropicComputerUse {
    pub fn new(config: ComputerUseConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn build_body(&self, screenshot_b64: &str, history: &str) -> Value {
        json!({
            "model": self.config.provider.model,
            "max_tokens": self.config.max_tokens,
            "system": COMPUTER_USE_SYSTEM_PROMPT,
            "tools": [{
                "type": COMPUTER_TOOL_TYPE,
                "name": COMPUTER_TOOL,
                "display_width_px": self.config.display_width,
                "display_height_px": self.config.display_height,
                "display_number": 1
            }],
            "messages": [
                {
                    "role": "user",
                    "content": format!("This is the current conversation history: {}", history)
                },
                {
                    "role": "user",
                    "content": [{
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": "image/png",
                            "data": screenshot_b64
                        }
                    }]
                },
                {
                    "role": "user",
                    "content": "This is the current screenshot of the page. Don't take another \
                        screenshot, give me actions to perform on the page to move forward!"
                }
            ]
        })
    }
}

/// Inputs of every `computer` tool_use block, in response order.
pub fn parse_computer_actions(json: &Value) -> Vec<Value> {
    let Some(blocks) = json["content"].as_array() else {
        return Vec::new();
    };

    let mut actions = Vec::new();
    for block in blocks {
        match block["type"].as_str() {
            Some("text") => {
                tracing::info!("Computer-use model: {}", block["text"].as_str().unwrap_or(""));
            }
            Some("tool_use") if block["name"] == COMPUTER_TOOL => {
                actions.push(block["input"].clone());
            }
            _ => {}
        }
    }
    actions
}

#[async_trait]
impl ComputerUseModel for AnthropicComputerUse {
    async fn propose(&self, screenshot_b64: &str, history: &str) -> Result<Vec<Value>> {
        let url = format!("{}/v1/messages", self.config.provider.base_url);

        let api_key = self
            .config
            .provider
            .resolved_api_key()
            .ok_or_else(|| OverwatchError::Llm("Anthropic API key required".to_string()))?;

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("anthropic-beta", COMPUTER_USE_BETA)
            .header("content-type", "application/json")
            .json(&self.build_body(screenshot_b64, history))
            .send()
            .await
            .map_err(|e| OverwatchError::Llm(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(OverwatchError::Llm(format!("Anthropic API error: {}", error_text)));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| OverwatchError::Llm(format!("Failed to parse response: {}", e)))?;

        Ok(parse_computer_actions(&json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervision::judge::decision_function;

    #[test]
    fn test_judge_body_forces_function() {
        let judge = OpenAiJudge::new(ProviderConfig::default_judge());
        let request = JudgeRequest {
            messages: vec![json!({"role": "user", "content": "hi"})],
            function: decision_function(),
        };
        let body = judge.build_body(&request);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["function_call"]["name"], "supervision_decision");
        assert_eq!(body["functions"][0]["name"], "supervision_decision");
    }

    #[test]
    fn test_parse_judge_response_function_call() {
        let json = json!({"choices": [{"message": {
            "role": "assistant",
            "content": null,
            "function_call": {"name": "supervision_decision", "arguments": "{\"decision\":\"approve\"}"}
        }}]});
        let call = parse_judge_response(&json).function_call.unwrap();
        assert_eq!(call.name, "supervision_decision");
        assert!(call.arguments.contains("approve"));
    }

    #[test]
    fn test_parse_judge_response_tool_calls_and_missing() {
        let json = json!({"choices": [{"message": {
            "function_call": null,
            "tool_calls": [{"id": "x", "type": "function",
                "function": {"name": "supervision_decision", "arguments": "{}"}}]
        }}]});
        assert!(parse_judge_response(&json).function_call.is_some());

        let plain = json!({"choices": [{"message": {"content": "I approve"}}]});
        assert!(parse_judge_response(&plain).function_call.is_none());
    }

    #[test]
    fn test_parse_computer_actions() {
        let json = json!({"content": [
            {"type": "text", "text": "Moving to the button"},
            {"type": "tool_use", "name": "computer", "input": {"action": "mouse_move", "coordinate": [5, 6]}},
            {"type": "tool_use", "name": "bash", "input": {"command": "ls"}},
            {"type": "tool_use", "name": "computer", "input": {"action": "left_click"}}
        ]});
        let actions = parse_computer_actions(&json);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[1]["action"], "left_click");
        assert!(parse_computer_actions(&json!({})).is_empty());
    }

    #[test]
    fn test_computer_use_body() {
        let model = AnthropicComputerUse::new(ComputerUseConfig::default());
        let body = model.build_body("AAAA", "[]");
        assert_eq!(body["tools"][0]["type"], "computer_20241022");
        assert_eq!(body["tools"][0]["display_width_px"], 1024);
        assert_eq!(body["messages"][1]["content"][0]["source"]["data"], "AAAA");
    }
}
