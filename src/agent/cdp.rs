use crate::error::{OverwatchError, Result};
use crate::replay::page::{MouseButton, PageHandle, PageId};
use async_trait::async_trait;
use base64::Engine;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

/// Seconds to wait for a CDP response
const COMMAND_TIMEOUT_SECS: u64 = 30;

/// `modifiers` bits of `Input.dispatchKeyEvent` / `Input.dispatchMouseEvent`
pub const MODIFIER_ALT: u32 = 1;
pub const MODIFIER_CTRL: u32 = 2;
pub const MODIFIER_META: u32 = 4;
pub const MODIFIER_SHIFT: u32 = 8;

type PendingMap = HashMap<u32, tokio::sync::oneshot::Sender<serde_json::Value>>;

type WsSink = futures::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    WsMessage,
>;

/// Page handle driving an already-running Chrome tab over raw CDP WebSocket
pub struct CdpPage {
    /// WebSocket sender
    ws_tx: Option<Arc<Mutex<WsSink>>>,
    /// Pending responses by message id
    responses: Arc<Mutex<PendingMap>>,
    /// Set once the reader task has stopped; guarded by the `responses` lock
    closed: Arc<AtomicBool>,
    /// Message ID counter
    msg_id: AtomicU32,
    /// Target id (or websocket URL when unknown)
    target_id: String,
    /// Pointer, button and modifier state repeated on every input event
    input: parking_lot::Mutex<InputState>,
}

/// Input state Chrome does not track between dispatched events
#[derive(Debug, Clone, Copy, Default)]
struct InputState {
    x: f64,
    y: f64,
    modifiers: u32,
    pressed: Option<MouseButton>,
}

/// Modifier bit for a DOM key name, 0 for ordinary keys.
pub fn modifier_bit(key: &str) -> u32 {
    match key {
        "Alt" => MODIFIER_ALT,
        "Control" => MODIFIER_CTRL,
        "Meta" => MODIFIER_META,
        "Shift" => MODIFIER_SHIFT,
        _ => 0,
    }
}

/// `buttons` mask bit of a mouse button.
pub fn button_mask(button: MouseButton) -> u32 {
    match button {
        MouseButton::Left => 1,
        MouseButton::Right => 2,
        MouseButton::Middle => 4,
    }
}

impl CdpPage {
    /// Connect to the first page target of a browser listening on `port`.
    pub async fn connect_port(host: &str, port: u16) -> Result<Self> {
        let list_url = format!("http://{}:{}/json/list", host, port);
        let targets: serde_json::Value = reqwest::get(&list_url)
            .await
            .map_err(|e| OverwatchError::Cdp(format!("Connection error: {}", e)))?
            .json()
            .await
            .map_err(|e| OverwatchError::Cdp(format!("Failed to parse targets response: {}", e)))?;

        let target = targets
            .as_array()
            .and_then(|arr| {
                arr.iter()
                    .find(|t| t.get("type").and_then(|v| v.as_str()) == Some("page"))
            })
            .ok_or_else(|| OverwatchError::Cdp("No page target found".to_string()))?;

        let ws_url = target
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| OverwatchError::Cdp("No webSocketDebuggerUrl in page target".to_string()))?;

        let mut page = Self::connect(ws_url).await?;
        if let Some(id) = target.get("id").and_then(|v| v.as_str()) {
            page.target_id = id.to_string();
        }
        Ok(page)
    }

    /// Connect to a page target's DevTools WebSocket URL.
    pub async fn connect(ws_url: &str) -> Result<Self> {
        tracing::info!("Connecting to page target WebSocket: {}", ws_url);

        let (ws_stream, _) = connect_async(ws_url)
            .await
            .map_err(|e| OverwatchError::Cdp(format!("Failed to connect WebSocket: {}", e)))?;
        let (tx, mut rx) = StreamExt::split(ws_stream);

        let responses: Arc<Mutex<PendingMap>> = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let pending = responses.clone();
        let reader_closed = closed.clone();

        tokio::spawn(async move {
            while let Some(msg) = StreamExt::next(&mut rx).await {
                match msg {
                    Ok(WsMessage::Text(text)) => {
                        let Ok(json) = serde_json::from_str::<serde_json::Value>(&text) else {
                            continue;
                        };
                        if let Some(id) = json.get("id").and_then(|i| i.as_u64()) {
                            if let Some(sender) = pending.lock().await.remove(&(id as u32)) {
                                let _ = sender.send(json);
                            }
                        }
                    }
                    Ok(WsMessage::Close(_)) => {
                        tracing::debug!("WebSocket closed");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!("WebSocket error: {:?}", e);
                        break;
                    }
                    _ => {}
                }
            }

            // Fail in-flight commands now instead of at their timeout
            let mut waiting = pending.lock().await;
            reader_closed.store(true, Ordering::SeqCst);
            waiting.clear();
        });

        let target_id = ws_url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(ws_url)
            .to_string();

        let page = Self {
            ws_tx: Some(Arc::new(Mutex::new(tx))),
            responses,
            closed,
            msg_id: AtomicU32::new(1),
            target_id,
            input: parking_lot::Mutex::new(InputState::default()),
        };

        page.send_command("Page.enable", json!({})).await?;
        tracing::info!("CDP page {} connected", page.target_id);
        Ok(page)
    }

    /// Send a CDP command and wait for its result
    async fn send_command(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let tx = self
            .ws_tx
            .as_ref()
            .ok_or_else(|| OverwatchError::Page("WebSocket not connected".to_string()))?;

        let id = self.msg_id.fetch_add(1, Ordering::SeqCst);
        let (resp_tx, resp_rx) = tokio::sync::oneshot::channel();
        {
            let mut pending = self.responses.lock().await;
            if self.closed.load(Ordering::SeqCst) {
                return Err(OverwatchError::Page("WebSocket closed".to_string()));
            }
            pending.insert(id, resp_tx);
        }

        let command = json!({
            "id": id,
            "method": method,
            "params": params
        });

        tx.lock()
            .await
            .send(WsMessage::Text(command.to_string()))
            .await
            .map_err(|e| OverwatchError::Page(format!("Failed to send {}: {}", method, e)))?;

        let response = match tokio::time::timeout(
            tokio::time::Duration::from_secs(COMMAND_TIMEOUT_SECS),
            resp_rx,
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(OverwatchError::Page("Response channel closed".to_string()));
            }
            Err(_) => {
                self.responses.lock().await.remove(&id);
                return Err(OverwatchError::Page(format!("{} timed out", method)));
            }
        };

        if let Some(error) = response.get("error") {
            return Err(OverwatchError::Cdp(format!("{} failed: {}", method, error)));
        }
        Ok(response)
    }

    /// Dispatch a mouse event carrying the held modifiers and pressed buttons.
    async fn dispatch_mouse(
        &self,
        kind: &str,
        x: f64,
        y: f64,
        button: Option<MouseButton>,
        click_count: u32,
    ) -> Result<()> {
        let (modifiers, buttons) = {
            let mut input = self.input.lock();
            match kind {
                "mousePressed" => input.pressed = button,
                "mouseReleased" => input.pressed = None,
                _ => {}
            }
            (input.modifiers, input.pressed.map(button_mask).unwrap_or(0))
        };

        self.send_command(
            "Input.dispatchMouseEvent",
            json!({
                "type": kind,
                "x": x,
                "y": y,
                "button": button.map(|b| b.as_str()).unwrap_or("none"),
                "buttons": buttons,
                "clickCount": click_count,
                "modifiers": modifiers
            }),
        )
        .await?;

        let mut input = self.input.lock();
        input.x = x;
        input.y = y;
        Ok(())
    }

    async fn dispatch_key(&self, kind: &str, key: &str) -> Result<()> {
        let def = key_definition(key)
            .ok_or_else(|| OverwatchError::Page(format!("Unknown key: \"{}\"", key)))?;

        let modifiers = {
            let mut input = self.input.lock();
            let bit = modifier_bit(&def.key);
            if kind == "keyDown" {
                input.modifiers |= bit;
            } else {
                input.modifiers &= !bit;
            }
            input.modifiers
        };

        let mut params = json!({
            "type": kind,
            "key": def.key,
            "code": def.code,
            "windowsVirtualKeyCode": def.key_code,
            "modifiers": modifiers
        });
        // With Ctrl, Alt or Meta held the key is a shortcut, not text input
        let shortcut = modifiers & (MODIFIER_ALT | MODIFIER_CTRL | MODIFIER_META) != 0;
        if kind == "keyDown" && !shortcut {
            if let Some(text) = &def.text {
                params["text"] = json!(text);
            }
        }

        self.send_command("Input.dispatchKeyEvent", params).await?;
        Ok(())
    }

    /// Close the WebSocket
    pub async fn close(&mut self) -> Result<()> {
        if let Some(tx) = self.ws_tx.take() {
            let mut tx_guard = tx.lock().await;
            let _ = tx_guard.close().await;
        }
        tracing::info!("CDP page {} closed", self.target_id);
        Ok(())
    }
}

#[async_trait]
impl PageHandle for CdpPage {
    fn id(&self) -> PageId {
        PageId::new(self.target_id.clone())
    }

    async fn mouse_move(&self, x: f64, y: f64) -> Result<()> {
        let pressed = self.input.lock().pressed;
        self.dispatch_mouse("mouseMoved", x, y, pressed, 0).await
    }

    async fn mouse_down(&self, button: MouseButton) -> Result<()> {
        let (x, y) = {
            let input = self.input.lock();
            (input.x, input.y)
        };
        self.dispatch_mouse("mousePressed", x, y, Some(button), 1)
            .await
    }

    async fn mouse_up(&self, button: MouseButton) -> Result<()> {
        let (x, y) = {
            let input = self.input.lock();
            (input.x, input.y)
        };
        self.dispatch_mouse("mouseReleased", x, y, Some(button), 1)
            .await
    }

    async fn mouse_click(
        &self,
        x: f64,
        y: f64,
        button: MouseButton,
        click_count: u32,
        delay_ms: u64,
    ) -> Result<()> {
        let pressed = self.input.lock().pressed;
        self.dispatch_mouse("mouseMoved", x, y, pressed, 0).await?;
        for count in 1..=click_count.max(1) {
            if count > 1 && delay_ms > 0 {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
            }
            self.dispatch_mouse("mousePressed", x, y, Some(button), count)
                .await?;
            self.dispatch_mouse("mouseReleased", x, y, Some(button), count)
                .await?;
        }
        Ok(())
    }

    async fn key_down(&self, key: &str) -> Result<()> {
        self.dispatch_key("keyDown", key).await
    }

    async fn key_up(&self, key: &str) -> Result<()> {
        self.dispatch_key("keyUp", key).await
    }

    async fn key_press(&self, key: &str) -> Result<()> {
        self.dispatch_key("keyDown", key).await?;
        self.dispatch_key("keyUp", key).await
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.send_command("Input.insertText", json!({ "text": text }))
            .await?;
        Ok(())
    }

    async fn screenshot(&self, path: Option<&Path>) -> Result<Vec<u8>> {
        let result = self
            .send_command("Page.captureScreenshot", json!({ "format": "png" }))
            .await?;

        let data = result
            .get("result")
            .and_then(|r| r.get("data"))
            .and_then(|d| d.as_str())
            .ok_or_else(|| OverwatchError::Page("Failed to capture screenshot".to_string()))?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| OverwatchError::Page(format!("Invalid screenshot data: {}", e)))?;

        if let Some(path) = path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, &bytes).await?;
        }
        Ok(bytes)
    }
}

/// DOM key description used by `Input.dispatchKeyEvent`
#[derive(Debug, Clone, PartialEq)]
pub struct KeyDefinition {
    pub key: String,
    pub code: String,
    pub key_code: u32,
    pub text: Option<String>,
}

/// Resolve a key name (`Enter`, `Control`, `a`, `F5`) to its DOM definition.
pub fn key_definition(key: &str) -> Option<KeyDefinition> {
    let named = |code: &str, key_code: u32, text: Option<&str>| KeyDefinition {
        key: key.to_string(),
        code: code.to_string(),
        key_code,
        text: text.map(str::to_string),
    };

    let def = match key {
        "Enter" => named("Enter", 13, Some("\r")),
        "Tab" => named("Tab", 9, None),
        "Escape" => named("Escape", 27, None),
        "Backspace" => named("Backspace", 8, None),
        "Delete" => named("Delete", 46, None),
        "Insert" => named("Insert", 45, None),
        "Home" => named("Home", 36, None),
        "End" => named("End", 35, None),
        "PageUp" => named("PageUp", 33, None),
        "PageDown" => named("PageDown", 34, None),
        "ArrowUp" => named("ArrowUp", 38, None),
        "ArrowDown" => named("ArrowDown", 40, None),
        "ArrowLeft" => named("ArrowLeft", 37, None),
        "ArrowRight" => named("ArrowRight", 39, None),
        "Space" | " " => KeyDefinition {
            key: " ".to_string(),
            code: "Space".to_string(),
            key_code: 32,
            text: Some(" ".to_string()),
        },
        "Shift" => named("ShiftLeft", 16, None),
        "Control" | "Ctrl" => KeyDefinition {
            key: "Control".to_string(),
            code: "ControlLeft".to_string(),
            key_code: 17,
            text: None,
        },
        "Alt" => named("AltLeft", 18, None),
        "Meta" | "Cmd" | "Super" => KeyDefinition {
            key: "Meta".to_string(),
            code: "MetaLeft".to_string(),
            key_code: 91,
            text: None,
        },
        _ => {
            if let Some(n) = key.strip_prefix('F').and_then(|n| n.parse::<u32>().ok()) {
                if (1..=12).contains(&n) {
                    return Some(named(key, 111 + n, None));
                }
                return None;
            }

            let mut chars = key.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            let code = if c.is_ascii_alphabetic() {
                format!("Key{}", c.to_ascii_uppercase())
            } else if c.is_ascii_digit() {
                format!("Digit{}", c)
            } else {
                String::new()
            };
            KeyDefinition {
                key: key.to_string(),
                code,
                key_code: c.to_ascii_uppercase() as u32,
                text: Some(key.to_string()),
            }
        }
    };
    Some(def)
}
