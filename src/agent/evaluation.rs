//! After-run evaluation: a model scores task completion and summarizes the
//! steps taken. Both go through the forced function-call judge plumbing.

use crate::error::{OverwatchError, Result};
use crate::supervision::judge::{JudgeModel, JudgeRequest};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

pub const TASK_SUCCESS_FUNCTION: &str = "task_success";
pub const SUMMARY_FUNCTION: &str = "conversation_summary";

const SUMMARY_UNAVAILABLE: &str = "Summary unavailable.";

/// Completion score of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TaskSuccess {
    /// 1 = not completed, 10 = fully completed
    pub score: u32,
    pub explanation: String,
}

impl TaskSuccess {
    /// Score 0 marks an evaluation that could not be made.
    pub fn unavailable() -> Self {
        Self {
            score: 0,
            explanation: "Error evaluating task success".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConversationSummary {
    /// Bullet-point list of the steps the agent took
    pub summary: String,
}

fn function_for<T: JsonSchema>(name: &str, description: &str) -> Value {
    json!({
        "name": name,
        "description": description,
        "parameters": schemars::schema_for!(T),
    })
}

/// Scoring prompt, followed by one message holding every screenshot.
pub fn build_task_success_messages(
    task: &str,
    conversation: &[Value],
    screenshots_b64: &[String],
) -> Vec<Value> {
    let conversation = Value::Array(conversation.to_vec()).to_string();
    let prompt = format!(
        "Instructions:\n{}\n\nConversation:\n{}\n\nEvaluate the agent's performance on a scale \
         from 1 to 10, where 1 means not completed and 10 means fully completed. Consider if all \
         instructions were followed and tasks completed. Provide a score and explanation.",
        task, conversation
    );

    let mut messages = vec![
        json!({
            "role": "system",
            "content": "You are an evaluation assistant. Assess the agent's task completion \
                diligently, providing a score and explanation."
        }),
        json!({"role": "user", "content": prompt}),
    ];

    if !screenshots_b64.is_empty() {
        let images: Vec<Value> = screenshots_b64
            .iter()
            .map(|b64| {
                json!({
                    "type": "image_url",
                    "image_url": {"url": format!("data:image/png;base64,{}", b64)}
                })
            })
            .collect();
        messages.push(json!({"role": "user", "content": images}));
    }
    messages
}

pub fn build_summary_messages(task: &str, conversation: &[Value]) -> Vec<Value> {
    let conversation = Value::Array(conversation.to_vec()).to_string();
    vec![
        json!({"role": "system", "content": "You are a conversation summarizer."}),
        json!({
            "role": "user",
            "content": format!(
                "Provide a bullet-point summary of the steps the agent took to accomplish the \
                 task.\n\nTask:\n{}\n\nConversation:\n{}",
                task, conversation
            )
        }),
    ]
}

async fn call_function<T: DeserializeOwned>(
    model: &dyn JudgeModel,
    messages: Vec<Value>,
    function: Value,
) -> Result<T> {
    let response = model.decide(&JudgeRequest { messages, function }).await?;
    let call = response
        .function_call
        .ok_or_else(|| OverwatchError::Llm("No function call in response".to_string()))?;
    Ok(serde_json::from_str(&call.arguments)?)
}

/// Ask `model` how well the run completed `task`.
///
/// Failures are logged and reported as [`TaskSuccess::unavailable`].
pub async fn evaluate_task_success(
    model: &dyn JudgeModel,
    task: &str,
    conversation: &[Value],
    screenshots_b64: &[String],
) -> TaskSuccess {
    let function = function_for::<TaskSuccess>(
        TASK_SUCCESS_FUNCTION,
        "Rate how well the agent completed the instructions",
    );
    let messages = build_task_success_messages(task, conversation, screenshots_b64);

    match call_function::<TaskSuccess>(model, messages, function).await {
        Ok(success) => success,
        Err(e) => {
            tracing::error!("Error evaluating task success: {}", e);
            TaskSuccess::unavailable()
        }
    }
}

/// Bullet-point summary of the run, or a placeholder when the model fails.
pub async fn summarize_conversation(
    model: &dyn JudgeModel,
    task: &str,
    conversation: &[Value],
) -> String {
    let function = function_for::<ConversationSummary>(
        SUMMARY_FUNCTION,
        "Summarize the steps the agent took",
    );
    let messages = build_summary_messages(task, conversation);

    match call_function::<ConversationSummary>(model, messages, function).await {
        Ok(summary) => summary.summary,
        Err(e) => {
            tracing::error!("Error summarizing conversation: {}", e);
            SUMMARY_UNAVAILABLE.to_string()
        }
    }
}

/// Write the summary and score of a run into a fresh folder under `root`.
pub async fn write_run_report(
    root: &Path,
    task_name: &str,
    run_id: &str,
    summary: &str,
    score: &TaskSuccess,
) -> Result<PathBuf> {
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let folder = root.join(format!(
        "recording_{}_{}_{}",
        task_name.replace(' ', "_"),
        ts,
        run_id
    ));
    tokio::fs::create_dir_all(&folder).await?;

    tokio::fs::write(folder.join(format!("summary_{}_{}.txt", ts, run_id)), summary).await?;
    tokio::fs::write(
        folder.join(format!("score_{}_{}.txt", ts, run_id)),
        format!(
            "Task completion score (1-10): {}\n\n{}",
            score.score, score.explanation
        ),
    )
    .await?;

    tracing::info!(
        "Run {} scored {}/10, report saved in {}",
        run_id,
        score.score,
        folder.display()
    );
    Ok(folder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervision::judge::JudgeResponse;
    use crate::supervision::types::FunctionCall;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct ScriptedModel {
        arguments: Option<String>,
        seen: Mutex<Vec<JudgeRequest>>,
    }

    impl ScriptedModel {
        fn answering(arguments: Option<&str>) -> Self {
            Self {
                arguments: arguments.map(str::to_string),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl JudgeModel for ScriptedModel {
        async fn decide(&self, request: &JudgeRequest) -> Result<JudgeResponse> {
            self.seen.lock().push(request.clone());
            Ok(JudgeResponse {
                function_call: self.arguments.clone().map(|arguments| FunctionCall {
                    name: request.function["name"].as_str().unwrap_or_default().to_string(),
                    arguments,
                }),
            })
        }
    }

    fn conversation() -> Vec<Value> {
        vec![json!({"role": "assistant", "content": "Added socks to cart"})]
    }

    #[tokio::test]
    async fn test_task_success_scored() {
        let model = ScriptedModel::answering(Some(r#"{"score": 8, "explanation": "Mostly done"}"#));
        let result = evaluate_task_success(
            &model,
            "Buy socks",
            &conversation(),
            &["AAA".to_string(), "BBB".to_string()],
        )
        .await;

        assert_eq!(
            result,
            TaskSuccess {
                score: 8,
                explanation: "Mostly done".to_string()
            }
        );

        let seen = model.seen.lock();
        let request = &seen[0];
        assert_eq!(request.function["name"], TASK_SUCCESS_FUNCTION);
        assert!(request.function["parameters"]["properties"].get("score").is_some());
        let prompt = request.messages[1]["content"].as_str().unwrap();
        assert!(prompt.contains("Buy socks"));
        assert!(prompt.contains("Added socks to cart"));
        let images = request.messages[2]["content"].as_array().unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[1]["image_url"]["url"], "data:image/png;base64,BBB");
    }

    #[test]
    fn test_task_success_without_screenshots() {
        let messages = build_task_success_messages("Buy socks", &conversation(), &[]);
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn test_task_success_falls_back() {
        let silent = ScriptedModel::answering(None);
        assert_eq!(
            evaluate_task_success(&silent, "t", &[], &[]).await,
            TaskSuccess::unavailable()
        );

        let garbled = ScriptedModel::answering(Some("{\"score\": \"high\"}"));
        assert_eq!(
            evaluate_task_success(&garbled, "t", &[], &[]).await.score,
            0
        );
    }

    #[tokio::test]
    async fn test_summary() {
        let model = ScriptedModel::answering(Some(r#"{"summary": "- Opened shop\n- Added socks"}"#));
        let summary = summarize_conversation(&model, "Buy socks", &conversation()).await;
        assert_eq!(summary, "- Opened shop\n- Added socks");
        assert_eq!(model.seen.lock()[0].function["name"], SUMMARY_FUNCTION);

        let silent = ScriptedModel::answering(None);
        assert_eq!(
            summarize_conversation(&silent, "Buy socks", &[]).await,
            SUMMARY_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_write_run_report() {
        let dir = tempfile::tempdir().unwrap();
        let score = TaskSuccess {
            score: 7,
            explanation: "Cart filled".to_string(),
        };
        let folder = write_run_report(dir.path(), "buy socks", "run-9", "- step", &score)
            .await
            .unwrap();

        let name = folder.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("recording_buy_socks_"));
        assert!(name.ends_with("_run-9"));

        let mut files: Vec<String> = std::fs::read_dir(&folder)
            .unwrap()
            .map(|e| e.unwrap().path().to_string_lossy().into_owned())
            .collect();
        files.sort();
        assert_eq!(files.len(), 2);
        assert_eq!(
            std::fs::read_to_string(&files[0]).unwrap(),
            "Task completion score (1-10): 7\n\nCart filled"
        );
        assert_eq!(std::fs::read_to_string(&files[1]).unwrap(), "- step");
    }
}
