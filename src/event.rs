use serde_json::{Map, Value};

pub const TYPE_MESSAGE: &str = "message";
pub const TYPE_ERROR: &str = "error";

/// An undecoded RTM payload, kept verbatim.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawEvent(Map<String, Value>);

impl RawEvent {
    /// Parse a text frame. Frames that are not JSON objects are kept under a
    /// `payload` key so they still decode (to an event without a type).
    pub fn from_text(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from(value),
            Err(_) => {
                let mut fields = Map::new();
                fields.insert("payload".to_string(), Value::String(text.to_string()));
                Self(fields)
            }
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    fn get_str(&self, key: &str) -> Option<String> {
        self.0.get(key).and_then(Value::as_str).map(str::to_string)
    }
}

impl From<Value> for RawEvent {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self(fields),
            other => {
                let mut fields = Map::new();
                fields.insert("payload".to_string(), other);
                Self(fields)
            }
        }
    }
}

impl std::fmt::Display for RawEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = serde_json::to_string(&self.0).map_err(|_| std::fmt::Error)?;
        f.write_str(&text)
    }
}

/// Nested `error` object of an error frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ErrorFrame {
    pub msg: Option<String>,
}

/// Decoded view of an event. Fields missing from the payload (or of the wrong
/// JSON type) are `None`, never an empty string.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructuredMessage {
    /// The event `type`.
    pub kind: Option<String>,
    pub channel: Option<String>,
    pub user: Option<String>,
    /// Opaque ordering token. Passed back to Slack untouched.
    pub ts: Option<String>,
    /// Only populated for `type == "error"`.
    pub error: Option<ErrorFrame>,
}

impl StructuredMessage {
    pub fn is_type(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }
}

/// Best-effort field extraction. Never fails.
pub fn decode(raw: &RawEvent) -> StructuredMessage {
    let kind = raw.get_str("type");

    let error = if kind.as_deref() == Some(TYPE_ERROR) {
        raw.fields()
            .get("error")
            .and_then(Value::as_object)
            .map(|e| ErrorFrame {
                msg: e.get("msg").and_then(Value::as_str).map(str::to_string),
            })
    } else {
        None
    };

    StructuredMessage {
        kind,
        channel: raw.get_str("channel"),
        user: raw.get_str("user"),
        ts: raw.get_str("ts"),
        error,
    }
}
