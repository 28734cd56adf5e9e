//! `CdpPage` against an in-process DevTools WebSocket endpoint.

use futures::{SinkExt, StreamExt};
use overwatch_lib::agent::CdpPage;
use overwatch_lib::replay::{CursorTable, InputReplayer, PageHandle};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

struct FakeDevTools {
    url: String,
    commands: Arc<Mutex<Vec<Value>>>,
}

impl FakeDevTools {
    /// Params of every recorded command with `method`
    fn params(&self, method: &str) -> Vec<Value> {
        self.commands
            .lock()
            .iter()
            .filter(|c| c["method"] == method)
            .map(|c| c["params"].clone())
            .collect()
    }
}

/// Answer every command with an empty result; hang up after `close_after` commands.
async fn fake_devtools(close_after: Option<usize>) -> FakeDevTools {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let commands = Arc::new(Mutex::new(Vec::new()));
    let recorded = commands.clone();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            let Message::Text(text) = msg else { continue };
            let command: Value = serde_json::from_str(&text).unwrap();
            let id = command["id"].clone();
            let count = {
                let mut recorded = recorded.lock();
                recorded.push(command);
                recorded.len()
            };

            let reply = json!({"id": id, "result": {}}).to_string();
            if ws.send(Message::Text(reply)).await.is_err() {
                break;
            }
            if close_after == Some(count) {
                let _ = ws.close(None).await;
                break;
            }
        }
    });

    FakeDevTools {
        url: format!("ws://{}/devtools/page/FAKE", addr),
        commands,
    }
}

fn replayer() -> InputReplayer {
    InputReplayer::new(Arc::new(CursorTable::new()), std::env::temp_dir())
}

#[tokio::test]
async fn test_connect_uses_target_id_from_url() {
    let server = fake_devtools(None).await;
    let page = CdpPage::connect(&server.url).await.unwrap();
    assert_eq!(page.id().0, "FAKE");
    assert_eq!(server.commands.lock()[0]["method"], "Page.enable");
}

#[tokio::test]
async fn test_control_combo_sends_modifiers_without_text() {
    let server = fake_devtools(None).await;
    let page = CdpPage::connect(&server.url).await.unwrap();

    let report = replayer()
        .replay(&page, json!([{"action": "key", "text": "Control+a"}]))
        .await
        .unwrap();
    assert!(report.failed.is_empty());

    let keys = server.params("Input.dispatchKeyEvent");
    let summary: Vec<_> = keys
        .iter()
        .map(|p| {
            (
                p["type"].as_str().unwrap().to_string(),
                p["key"].as_str().unwrap().to_string(),
                p["modifiers"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("keyDown".to_string(), "Control".to_string(), 2),
            ("keyDown".to_string(), "a".to_string(), 2),
            ("keyUp".to_string(), "a".to_string(), 2),
            ("keyUp".to_string(), "Control".to_string(), 0),
        ]
    );
    assert!(keys[1].get("text").is_none());
}

#[tokio::test]
async fn test_plain_key_still_types_text() {
    let server = fake_devtools(None).await;
    let page = CdpPage::connect(&server.url).await.unwrap();

    page.key_press("a").await.unwrap();

    let keys = server.params("Input.dispatchKeyEvent");
    assert_eq!(keys[0]["text"], "a");
    assert_eq!(keys[0]["modifiers"], 0);
}

#[tokio::test]
async fn test_drag_moves_with_left_button_held() {
    let server = fake_devtools(None).await;
    let page = CdpPage::connect(&server.url).await.unwrap();

    replayer()
        .replay(
            &page,
            json!([
                {"action": "mouse_move", "coordinate": [5, 5]},
                {"action": "left_click_drag", "coordinate": [300, 40]},
                {"action": "mouse_move", "coordinate": [310, 45]}
            ]),
        )
        .await
        .unwrap();

    let mouse = server.params("Input.dispatchMouseEvent");
    let summary: Vec<_> = mouse
        .iter()
        .map(|p| {
            (
                p["type"].as_str().unwrap().to_string(),
                p["button"].as_str().unwrap().to_string(),
                p["buttons"].as_u64().unwrap(),
                p["x"].as_f64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("mouseMoved".to_string(), "none".to_string(), 0, 5.0),
            ("mousePressed".to_string(), "left".to_string(), 1, 5.0),
            ("mouseMoved".to_string(), "left".to_string(), 1, 300.0),
            ("mouseReleased".to_string(), "left".to_string(), 0, 300.0),
            ("mouseMoved".to_string(), "none".to_string(), 0, 310.0),
        ]
    );
}

#[tokio::test]
async fn test_closed_socket_fails_commands_promptly() {
    let server = fake_devtools(Some(1)).await;
    let page = CdpPage::connect(&server.url).await.unwrap();

    // Let the reader observe the close frame
    tokio::time::sleep(Duration::from_millis(200)).await;

    let result = tokio::time::timeout(Duration::from_secs(5), page.mouse_move(1.0, 1.0))
        .await
        .expect("command should not wait for the response timeout");
    assert!(result.is_err());
}
