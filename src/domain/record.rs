use serde_json::Value;

pub const IDE_TAG_PREFIX: &str = "<ide_";

/// One block of a message's `content` array.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ContentItem {
    Text(String),
    Other,
}

impl ContentItem {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::Other => None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TranscriptRecord {
    User {
        timestamp: Option<String>,
        content: Vec<ContentItem>,
    },
    Assistant {
        timestamp: Option<String>,
        content: Vec<ContentItem>,
    },
    Summary {
        summary: String,
    },
    QueueOperation {
        operation: String,
        content: Vec<ContentItem>,
    },
    Other,
}

impl TranscriptRecord {
    pub fn is_dialogue(&self) -> bool {
        matches!(self, Self::User { .. } | Self::Assistant { .. })
    }

    pub fn timestamp(&self) -> Option<&str> {
        match self {
            Self::User { timestamp, .. } | Self::Assistant { timestamp, .. } => {
                timestamp.as_deref()
            }
            _ => None,
        }
    }
}

/// Decodes a raw transcript line into a JSON object. Blank lines, malformed
/// JSON and non-object values all come back as `None`.
pub fn decode_line_value(line: &str) -> Option<Value> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => None,
        Err(error) => {
            log::trace!("skipping undecodable transcript line: {error}");
            None
        }
    }
}

pub fn decode_record(line: &str) -> Option<TranscriptRecord> {
    decode_line_value(line).map(|value| record_from_value(&value))
}

pub fn record_from_value(value: &Value) -> TranscriptRecord {
    let kind = value.get("type").and_then(|v| v.as_str()).unwrap_or("");
    match kind {
        "user" => TranscriptRecord::User {
            timestamp: string_field(value, "timestamp"),
            content: decode_message_content(value),
        },
        "assistant" => TranscriptRecord::Assistant {
            timestamp: string_field(value, "timestamp"),
            content: decode_message_content(value),
        },
        "summary" => TranscriptRecord::Summary {
            summary: string_field(value, "summary").unwrap_or_default(),
        },
        "queue-operation" => TranscriptRecord::QueueOperation {
            operation: string_field(value, "operation").unwrap_or_default(),
            content: decode_content(value.get("content").unwrap_or(&Value::Null)),
        },
        _ => TranscriptRecord::Other,
    }
}

pub fn decode_message_content(value: &Value) -> Vec<ContentItem> {
    let content = value
        .get("message")
        .and_then(|message| message.get("content"))
        .unwrap_or(&Value::Null);
    decode_content(content)
}

/// Maps a `content` value onto items, one per array element so indices line
/// up with the raw array. A bare string counts as a single text item.
pub fn decode_content(content: &Value) -> Vec<ContentItem> {
    match content {
        Value::String(text) => vec![ContentItem::Text(text.clone())],
        Value::Array(blocks) => blocks.iter().map(decode_content_item).collect(),
        _ => Vec::new(),
    }
}

fn decode_content_item(block: &Value) -> ContentItem {
    if block.get("type").and_then(|v| v.as_str()) != Some("text") {
        return ContentItem::Other;
    }
    let text = block
        .get("text")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    ContentItem::Text(text)
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub fn is_ide_tagged(text: &str) -> bool {
    text.trim().starts_with(IDE_TAG_PREFIX)
}
