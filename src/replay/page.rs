use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Identity of a live page/tab handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub String);

impl PageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn as_str(&self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        }
    }
}

/// Browser page the replayer drives.
#[async_trait]
pub trait PageHandle: Send + Sync {
    fn id(&self) -> PageId;

    async fn mouse_move(&self, x: f64, y: f64) -> Result<()>;

    /// Press `button` at the current pointer position
    async fn mouse_down(&self, button: MouseButton) -> Result<()>;

    /// Release `button` at the current pointer position
    async fn mouse_up(&self, button: MouseButton) -> Result<()>;

    async fn mouse_click(
        &self,
        x: f64,
        y: f64,
        button: MouseButton,
        click_count: u32,
        delay_ms: u64,
    ) -> Result<()>;

    async fn key_down(&self, key: &str) -> Result<()>;

    async fn key_up(&self, key: &str) -> Result<()>;

    async fn key_press(&self, key: &str) -> Result<()>;

    /// Insert text at the focused element
    async fn type_text(&self, text: &str) -> Result<()>;

    /// Capture a PNG, writing it to `path` when given.
    async fn screenshot(&self, path: Option<&Path>) -> Result<Vec<u8>>;
}
