use crate::error::Result;
use crate::replay::cursor::{CursorState, CursorTable};
use crate::replay::event::{EventBatch, InputCommand, KeyCombo};
use crate::replay::page::{MouseButton, PageHandle, PageId};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Delay between the two clicks of a double click
const DOUBLE_CLICK_DELAY_MS: u64 = 100;

/// What happened to each event of a batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplayReport {
    pub executed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

/// Replays device-level events against a page, tracking the cursor per page.
pub struct InputReplayer {
    cursors: Arc<CursorTable>,
    screenshot_dir: PathBuf,
}

impl InputReplayer {
    pub fn new(cursors: Arc<CursorTable>, screenshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            cursors,
            screenshot_dir: screenshot_dir.into(),
        }
    }

    pub fn cursors(&self) -> &Arc<CursorTable> {
        &self.cursors
    }

    /// Drop the cursor of a page that has been closed.
    pub fn close_page(&self, page: &PageId) {
        self.cursors.forget(page);
    }

    /// Replay `batch` in order.
    ///
    /// Malformed events are skipped and key-combo failures are contained to
    /// their event. Any other page error is returned immediately.
    pub async fn replay(
        &self,
        page: &dyn PageHandle,
        batch: impl Into<EventBatch>,
    ) -> Result<ReplayReport> {
        let EventBatch(events) = batch.into();
        let page_id = page.id();
        let mut cursor = self.cursors.get(&page_id);
        let mut report = ReplayReport::default();

        for event in &events {
            let command = match InputCommand::parse(event) {
                Ok(command) => command,
                Err(reason) => {
                    tracing::warn!("{}; skipping", reason);
                    report.skipped.push(reason.to_string());
                    continue;
                }
            };

            match command {
                InputCommand::MouseMove { x, y } => {
                    page.mouse_move(x, y).await?;
                    cursor = CursorState::new(x, y);
                    self.cursors.set(&page_id, cursor);
                    tracing::debug!("Moved mouse to ({}, {})", x, y);
                    report.executed.push(format!("mouse_move({}, {})", x, y));
                }

                InputCommand::LeftClickDrag { x, y } => {
                    page.mouse_down(MouseButton::Left).await?;
                    tracing::debug!("Mouse down at ({}, {})", cursor.x, cursor.y);
                    page.mouse_move(x, y).await?;
                    cursor = CursorState::new(x, y);
                    self.cursors.set(&page_id, cursor);
                    page.mouse_up(MouseButton::Left).await?;
                    tracing::debug!("Mouse dragged to ({}, {})", x, y);
                    report.executed.push(format!("left_click_drag({}, {})", x, y));
                }

                InputCommand::Click { button, count } => {
                    let delay = if count > 1 { DOUBLE_CLICK_DELAY_MS } else { 0 };
                    page.mouse_click(cursor.x, cursor.y, button, count, delay)
                        .await?;
                    tracing::debug!(
                        "{} click x{} at ({}, {})",
                        button.as_str(),
                        count,
                        cursor.x,
                        cursor.y
                    );
                    report.executed.push(format!(
                        "{}_click x{} at ({}, {})",
                        button.as_str(),
                        count,
                        cursor.x,
                        cursor.y
                    ));
                }

                InputCommand::Type { text } => {
                    page.type_text(&text).await?;
                    tracing::debug!("Typed text: {}", text);
                    report.executed.push(format!("type({:?})", text));
                }

                InputCommand::Key { combo } => {
                    let label = format!("key({}{})", prefix(&combo), combo.key);
                    match press_combo(page, &combo).await {
                        Ok(()) => {
                            tracing::debug!("Pressed key combination: {}", label);
                            report.executed.push(label);
                        }
                        Err(e) => {
                            tracing::error!("Key combination {} failed: {}", label, e);
                            report.failed.push(format!("{}: {}", label, e));
                        }
                    }
                }

                InputCommand::Screenshot { path } => {
                    let path = path.unwrap_or_else(|| {
                        self.screenshot_dir
                            .join(format!("screenshot_{}.png", uuid::Uuid::new_v4()))
                    });
                    page.screenshot(Some(&path)).await?;
                    tracing::info!("Saved screenshot to {}", path.display());
                    report.executed.push(format!("screenshot({})", path.display()));
                }

                InputCommand::CursorPosition => {
                    tracing::info!("Current mouse position is ({}, {})", cursor.x, cursor.y);
                    report
                        .executed
                        .push(format!("cursor_position({}, {})", cursor.x, cursor.y));
                }
            }
        }

        Ok(report)
    }
}

fn prefix(combo: &KeyCombo) -> String {
    combo
        .modifiers
        .iter()
        .map(|m| format!("{}+", m))
        .collect()
}

/// Modifiers down in order, final key, modifiers up in reverse.
///
/// Modifiers already down are released even when a later key fails, so a
/// failed combo leaves nothing held for the following events.
async fn press_combo(page: &dyn PageHandle, combo: &KeyCombo) -> Result<()> {
    let mut held: Vec<&str> = Vec::with_capacity(combo.modifiers.len());
    let mut result = Ok(());

    for modifier in &combo.modifiers {
        result = page.key_down(modifier).await;
        if result.is_err() {
            break;
        }
        held.push(modifier);
    }
    if result.is_ok() {
        result = page.key_press(&combo.key).await;
    }

    for modifier in held.into_iter().rev() {
        if let Err(e) = page.key_up(modifier).await {
            if result.is_ok() {
                result = Err(e);
            } else {
                tracing::warn!("Failed to release {}: {}", modifier, e);
            }
        }
    }
    result
}
