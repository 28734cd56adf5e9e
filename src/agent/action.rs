use crate::agent::computer_use::COMPUTER_USE_DESCRIPTION;
use crate::error::Result;
use crate::replay::PageHandle;
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Result of a custom agent action, reported back to the agent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActionResult {
    /// Content for the agent to read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_content: Option<String>,
    /// Error description when the action failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Keep the content in the agent's long-term memory
    pub include_in_memory: bool,
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            extracted_content: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn remembered(message: impl Into<String>) -> Self {
        Self {
            extracted_content: Some(message.into()),
            error: None,
            include_in_memory: true,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Text lookup for DOM elements by highlight index
#[async_trait]
pub trait ElementText: Send + Sync {
    /// `Ok(None)` when no element carries `index`
    async fn text_at(&self, index: u32) -> Result<Option<String>>;
}

/// Pause/resume control of a supervised run
#[async_trait]
pub trait RunControl: Send + Sync {
    async fn pause(&self, run_id: &str) -> Result<()>;

    /// Resolve once a human has resumed the run
    async fn wait_for_unpaused(&self, run_id: &str) -> Result<()>;
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Append `content` to a timestamped output file in `folder`.
pub async fn write_to_file(content: &str, folder: &Path) -> Result<ActionResult> {
    tokio::fs::create_dir_all(folder).await?;
    let path = folder.join(format!("output_{}.txt", timestamp()));

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await?;

    tracing::debug!("Appended {} bytes to {}", content.len(), path.display());
    Ok(ActionResult::success("Output appended to file"))
}

/// Capture the page into a timestamped PNG in `folder`.
pub async fn screenshot(page: &dyn PageHandle, folder: &Path) -> Result<ActionResult> {
    let path = folder.join(format!("screenshot_{}.png", timestamp()));
    page.screenshot(Some(&path)).await?;

    let msg = "Screenshot taken";
    tracing::info!("{}: {}", msg, path.display());
    Ok(ActionResult::remembered(msg))
}

/// Text of the element at `index`.
pub async fn get_text(index: u32, dom: &dyn ElementText) -> ActionResult {
    match dom.text_at(index).await {
        Ok(Some(text)) => {
            tracing::info!("Successfully retrieved text from element at index {}: {}", index, text);
            ActionResult::success(text)
        }
        Ok(None) => ActionResult::failure(format!("No element found at index {}", index)),
        Err(e) => {
            tracing::debug!("Error getting text content: {}", e);
            ActionResult::failure(format!("Failed to get text from element at index {}", index))
        }
    }
}

/// Pause the run until a human has fixed the browser state.
pub async fn get_human_supervisor_help(control: &dyn RunControl, run_id: &str) -> ActionResult {
    let paused = async {
        control.pause(run_id).await?;
        control.wait_for_unpaused(run_id).await
    };

    if let Err(e) = paused.await {
        tracing::error!("Error pausing run {}: {}", run_id, e);
        return ActionResult::failure(format!("Failed to pause run {}", run_id));
    }

    ActionResult::success(
        "Run was paused, human supervisor corrected the state, agent is now able to continue execution",
    )
}

/// Custom action advertised to the agent framework
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub requires_browser: bool,
}

/// Custom actions offered on top of the framework's built-in ones.
pub fn action_catalog() -> Vec<ActionSpec> {
    vec![
        ActionSpec {
            name: "write_to_file",
            description: "Write important output information to a file",
            requires_browser: false,
        },
        ActionSpec {
            name: "get_human_supervisor_help",
            description: "Get human supervisor help - get help from a human to perform an action in the browser.",
            requires_browser: true,
        },
        ActionSpec {
            name: "screenshot",
            description: "Screenshot the current page",
            requires_browser: true,
        },
        ActionSpec {
            name: "get_text",
            description: "Get text from element - retrieves the text content from a DOM element at the specified index",
            requires_browser: true,
        },
        ActionSpec {
            name: "perform_computer_use",
            description: COMPUTER_USE_DESCRIPTION,
            requires_browser: true,
        },
    ]
}
