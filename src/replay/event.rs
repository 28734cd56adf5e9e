use crate::replay::page::MouseButton;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Ordered device-level events, as returned by a computer-use model.
#[derive(Debug, Clone, Default)]
pub struct EventBatch(pub Vec<Value>);

impl From<Value> for EventBatch {
    /// A single event object becomes a one-element batch.
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => EventBatch(items),
            other => EventBatch(vec![other]),
        }
    }
}

impl From<Vec<Value>> for EventBatch {
    fn from(items: Vec<Value>) -> Self {
        EventBatch(items)
    }
}

/// Key combination such as `Control+Shift+t`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCombo {
    pub modifiers: Vec<String>,
    pub key: String,
}

impl KeyCombo {
    pub fn parse(text: &str) -> Self {
        let mut segments: Vec<String> = text.split('+').map(|s| s.trim().to_string()).collect();
        // split always yields at least one segment
        let last = segments.pop().unwrap_or_default();
        let key = if last == "Return" {
            "Enter".to_string()
        } else {
            last
        };
        Self {
            modifiers: segments,
            key,
        }
    }
}

/// Why an event was not replayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingAction,
    BadCoordinate(String),
    MissingText(String),
    Unknown(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingAction => write!(f, "No action provided"),
            SkipReason::BadCoordinate(action) => {
                write!(f, "'{}' requires 'coordinate' = [x, y]", action)
            }
            SkipReason::MissingText(action) => {
                write!(f, "'{}' action must include 'text' string", action)
            }
            SkipReason::Unknown(action) => write!(f, "Unknown action: {}", action),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputCommand {
    MouseMove { x: f64, y: f64 },
    LeftClickDrag { x: f64, y: f64 },
    Click { button: MouseButton, count: u32 },
    Type { text: String },
    Key { combo: KeyCombo },
    Screenshot { path: Option<PathBuf> },
    CursorPosition,
}

impl InputCommand {
    pub fn parse(event: &Value) -> Result<Self, SkipReason> {
        let action = event
            .get("action")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or(SkipReason::MissingAction)?;

        let command = match action {
            "mouse_move" => {
                let (x, y) = coordinate(event).ok_or_else(|| SkipReason::BadCoordinate(action.to_string()))?;
                InputCommand::MouseMove { x, y }
            }
            "left_click_drag" => {
                let (x, y) = coordinate(event).ok_or_else(|| SkipReason::BadCoordinate(action.to_string()))?;
                InputCommand::LeftClickDrag { x, y }
            }
            "left_click" => InputCommand::Click {
                button: MouseButton::Left,
                count: 1,
            },
            "right_click" => InputCommand::Click {
                button: MouseButton::Right,
                count: 1,
            },
            "middle_click" => InputCommand::Click {
                button: MouseButton::Middle,
                count: 1,
            },
            "double_click" => InputCommand::Click {
                button: MouseButton::Left,
                count: 2,
            },
            "type" => InputCommand::Type {
                text: text(event).ok_or_else(|| SkipReason::MissingText(action.to_string()))?,
            },
            "key" => InputCommand::Key {
                combo: KeyCombo::parse(
                    &text(event).ok_or_else(|| SkipReason::MissingText(action.to_string()))?,
                ),
            },
            "screenshot" => InputCommand::Screenshot {
                path: event
                    .get("path")
                    .and_then(|v| v.as_str())
                    .map(PathBuf::from),
            },
            "cursor_position" => InputCommand::CursorPosition,
            other => return Err(SkipReason::Unknown(other.to_string())),
        };

        Ok(command)
    }

    /// Whether the command changes the tracked cursor position
    pub fn moves_cursor(&self) -> bool {
        matches!(
            self,
            InputCommand::MouseMove { .. } | InputCommand::LeftClickDrag { .. }
        )
    }
}

fn coordinate(event: &Value) -> Option<(f64, f64)> {
    match event.get("coordinate")?.as_array()?.as_slice() {
        [x, y] => Some((x.as_f64()?, y.as_f64()?)),
        _ => None,
    }
}

fn text(event: &Value) -> Option<String> {
    event.get("text").and_then(|v| v.as_str()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_event_normalizes_to_batch() {
        let batch = EventBatch::from(json!({"action": "left_click"}));
        assert_eq!(batch.0.len(), 1);
        let batch = EventBatch::from(json!([{"action": "left_click"}, {"action": "type", "text": "a"}]));
        assert_eq!(batch.0.len(), 2);
    }

    #[test]
    fn test_key_combo_remaps_return() {
        let combo = KeyCombo::parse("Control+Return");
        assert_eq!(combo.modifiers, vec!["Control".to_string()]);
        assert_eq!(combo.key, "Enter");

        let combo = KeyCombo::parse("Control + Shift + t");
        assert_eq!(combo.modifiers, vec!["Control", "Shift"]);
        assert_eq!(combo.key, "t");

        // only an exact final "Return" is remapped
        assert_eq!(KeyCombo::parse("return").key, "return");
        assert_eq!(KeyCombo::parse("Return+a").modifiers, vec!["Return"]);
    }

    #[test]
    fn test_parse_coordinates() {
        let cmd = InputCommand::parse(&json!({"action": "mouse_move", "coordinate": [10, 20.5]})).unwrap();
        assert_eq!(cmd, InputCommand::MouseMove { x: 10.0, y: 20.5 });

        for bad in [json!([1, 2, 3]), json!([1]), json!("1,2"), json!(["a", 2])] {
            let err = InputCommand::parse(&json!({"action": "mouse_move", "coordinate": bad}));
            assert_eq!(err, Err(SkipReason::BadCoordinate("mouse_move".to_string())));
        }
        assert!(InputCommand::parse(&json!({"action": "left_click_drag"})).is_err());
    }

    #[test]
    fn test_parse_clicks_ignore_coordinates() {
        let cmd = InputCommand::parse(&json!({"action": "double_click", "coordinate": [5, 5]})).unwrap();
        assert_eq!(
            cmd,
            InputCommand::Click {
                button: MouseButton::Left,
                count: 2
            }
        );
        assert!(!cmd.moves_cursor());
    }

    #[test]
    fn test_parse_skip_reasons() {
        assert_eq!(InputCommand::parse(&json!({})), Err(SkipReason::MissingAction));
        assert_eq!(
            InputCommand::parse(&json!({"action": "type", "text": 5})),
            Err(SkipReason::MissingText("type".to_string()))
        );
        assert_eq!(
            InputCommand::parse(&json!({"action": "wiggle"})),
            Err(SkipReason::Unknown("wiggle".to_string()))
        );
    }
}
