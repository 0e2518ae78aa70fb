//! Title rewriting for transcript files.
//!
//! Only the first `user` record is regenerated; every other line is copied
//! back byte-for-byte, including a trailing line without a terminator.

use crate::domain::{
    ContentItem, TranscriptRecord, decode_content, decode_line_value, decode_record,
    is_ide_tagged,
};
use regex::Regex;
use serde_json::{Value, json};
use std::borrow::Cow;
use std::sync::LazyLock;
use thiserror::Error;

static TITLE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\n]+\n\n").expect("title prefix regex should compile"));

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("transcript has no user record")]
    NoUserRecord,

    #[error("first user record on line {line_no} is not a JSON object")]
    UndecodableUserRecord { line_no: usize },

    #[error("first user record on line {line_no} has no message object")]
    MissingMessage { line_no: usize },

    #[error("failed to encode rewritten record: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ContentPatch {
    Replace { index: usize, text: String },
    Insert { index: usize, text: String },
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TranscriptScan {
    pub first_user_idx: Option<usize>,
    pub original_message: Option<String>,
}

pub fn split_raw_lines(bytes: &[u8]) -> Vec<&[u8]> {
    bytes.split_inclusive(|byte| *byte == b'\n').collect()
}

fn line_text(line: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(line)
}

pub fn scan_transcript(lines: &[&[u8]]) -> TranscriptScan {
    let mut scan = TranscriptScan::default();
    for (idx, line) in lines.iter().enumerate() {
        let Some(record) = decode_record(&line_text(line)) else {
            continue;
        };
        match &record {
            TranscriptRecord::QueueOperation { operation, content }
                if operation == "enqueue" && scan.original_message.is_none() =>
            {
                scan.original_message = find_enqueue_text(content).map(|text| text.to_string());
            }
            TranscriptRecord::User { .. } if scan.first_user_idx.is_none() => {
                scan.first_user_idx = Some(idx);
            }
            _ => {}
        }
    }
    scan
}

/// First non-empty text of an enqueue record that is not IDE-injected context.
pub fn find_enqueue_text(content: &[ContentItem]) -> Option<&str> {
    content
        .iter()
        .filter_map(ContentItem::text)
        .find(|text| !text.is_empty() && !is_ide_tagged(text))
}

pub fn first_text_index(content: &[ContentItem]) -> Option<usize> {
    content.iter().position(|item| item.text().is_some())
}

pub fn first_plain_text_index(content: &[ContentItem]) -> Option<usize> {
    content
        .iter()
        .position(|item| item.text().is_some_and(|text| !is_ide_tagged(text)))
}

pub fn last_ide_text_index(content: &[ContentItem]) -> Option<usize> {
    content
        .iter()
        .rposition(|item| item.text().is_some_and(is_ide_tagged))
}

pub fn strip_title_prefix(text: &str) -> &str {
    match TITLE_PREFIX.find(text) {
        Some(found) => &text[found.end()..],
        None => text,
    }
}

pub fn plan_title_patch(
    content: &[ContentItem],
    new_title: &str,
    original_message: Option<&str>,
) -> Option<ContentPatch> {
    match original_message {
        Some(message) => {
            let text = format!("{new_title}\n\n{message}");
            match first_plain_text_index(content) {
                Some(index) => Some(ContentPatch::Replace { index, text }),
                None => {
                    let index = last_ide_text_index(content).map_or(0, |idx| idx + 1);
                    Some(ContentPatch::Insert { index, text })
                }
            }
        }
        None => {
            let index = first_text_index(content)?;
            let old_text = content[index].text().unwrap_or("");
            let text = format!("{new_title}\n\n{}", strip_title_prefix(old_text));
            Some(ContentPatch::Replace { index, text })
        }
    }
}

fn text_block(text: String) -> Value {
    json!({ "type": "text", "text": text })
}

fn apply_patch(record: &mut Value, patch: ContentPatch, line_no: usize) -> Result<(), RewriteError> {
    let Some(message) = record.get_mut("message").and_then(Value::as_object_mut) else {
        return Err(RewriteError::MissingMessage { line_no });
    };
    let content = message.entry("content").or_insert(Value::Null);

    let mut blocks = match content.take() {
        Value::String(existing) => {
            if let ContentPatch::Replace { text, .. } = patch {
                *content = Value::String(text);
                return Ok(());
            }
            vec![text_block(existing)]
        }
        Value::Array(blocks) => blocks,
        _ => Vec::new(),
    };

    match patch {
        ContentPatch::Replace { index, text } => {
            if let Some(block) = blocks.get_mut(index).and_then(Value::as_object_mut) {
                block.insert("text".to_string(), Value::String(text));
            }
        }
        ContentPatch::Insert { index, text } => {
            let index = index.min(blocks.len());
            blocks.insert(index, text_block(text));
        }
    }
    *content = Value::Array(blocks);
    Ok(())
}

/// Returns the full file contents with the first user record retitled.
pub fn retitle_transcript(bytes: &[u8], new_title: &str) -> Result<Vec<u8>, RewriteError> {
    let lines = split_raw_lines(bytes);
    let scan = scan_transcript(&lines);
    let Some(user_idx) = scan.first_user_idx else {
        return Err(RewriteError::NoUserRecord);
    };
    let line_no = user_idx + 1;

    let mut record = decode_line_value(&line_text(lines[user_idx]))
        .ok_or(RewriteError::UndecodableUserRecord { line_no })?;
    let content = decode_content(
        record
            .get("message")
            .and_then(|message| message.get("content"))
            .unwrap_or(&Value::Null),
    );

    let replacement = match plan_title_patch(&content, new_title, scan.original_message.as_deref())
    {
        Some(patch) => {
            apply_patch(&mut record, patch, line_no)?;
            let mut encoded = serde_json::to_vec(&record)?;
            encoded.push(b'\n');
            Some(encoded)
        }
        None => {
            log::debug!("first user record on line {line_no} has no text block; left as is");
            None
        }
    };

    let mut out = Vec::with_capacity(bytes.len() + new_title.len() + 2);
    for (idx, line) in lines.iter().enumerate() {
        match (&replacement, idx == user_idx) {
            (Some(encoded), true) => out.extend_from_slice(encoded),
            _ => out.extend_from_slice(line),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> ContentItem {
        ContentItem::Text(value.to_string())
    }

    fn user_line(content: Value) -> String {
        serde_json::to_string(&json!({
            "parentUuid": null,
            "type": "user",
            "message": { "role": "user", "content": content },
            "uuid": "u-1",
            "timestamp": "2026-03-01T09:00:00Z"
        }))
        .expect("encode")
    }

    fn first_user_content(bytes: &[u8]) -> Value {
        let text = String::from_utf8(bytes.to_vec()).expect("utf8");
        text.lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .find(|value| value["type"] == "user")
            .map(|value| value["message"]["content"].clone())
            .expect("user record")
    }

    #[test]
    fn search_helpers_find_expected_positions() {
        let content = vec![
            ContentItem::Other,
            text("<ide_opened_file>a</ide_opened_file>"),
            text("<ide_selection>b</ide_selection>"),
            text("question"),
            text("<ide_x>late</ide_x>"),
        ];
        assert_eq!(first_text_index(&content), Some(1));
        assert_eq!(first_plain_text_index(&content), Some(3));
        assert_eq!(last_ide_text_index(&content), Some(4));
        assert_eq!(first_text_index(&[ContentItem::Other]), None);
    }

    #[test]
    fn enqueue_text_skips_empty_and_ide_items() {
        let content = vec![text(""), text(" <ide_selection>x</ide_selection>"), text("real")];
        assert_eq!(find_enqueue_text(&content), Some("real"));
        assert_eq!(find_enqueue_text(&[text("<ide_a>x</ide_a>")]), None);
    }

    #[test]
    fn strips_only_a_leading_title_paragraph() {
        assert_eq!(strip_title_prefix("Old title\n\nBody"), "Body");
        assert_eq!(strip_title_prefix("Body only"), "Body only");
        assert_eq!(strip_title_prefix("\n\nBody"), "\n\nBody");
        assert_eq!(strip_title_prefix("Line\nnext\n\nBody"), "Line\nnext\n\nBody");
    }

    #[test]
    fn renaming_twice_does_not_double_the_prefix() {
        let input = format!("{}\n", user_line(json!([{ "type": "text", "text": "Original body" }])));
        let once = retitle_transcript(input.as_bytes(), "My title").expect("first");
        let twice = retitle_transcript(&once, "My title").expect("second");
        assert_eq!(
            first_user_content(&twice)[0]["text"],
            "My title\n\nOriginal body"
        );
        assert_eq!(once, twice);
    }

    #[test]
    fn enqueue_text_is_inserted_after_ide_context() {
        let enqueue = r#"{"type":"queue-operation","operation":"enqueue","timestamp":"2026-03-01T08:59:59Z","content":[{"type":"text","text":"Please fix the parser"}]}"#;
        let user = user_line(json!([
            { "type": "text", "text": "<ide_opened_file>src/lib.rs</ide_opened_file>" }
        ]));
        let input = format!("{enqueue}\n{user}\n");

        let output = retitle_transcript(input.as_bytes(), "Parser fix").expect("rewrite");
        let content = first_user_content(&output);
        let blocks = content.as_array().expect("array");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["text"], "<ide_opened_file>src/lib.rs</ide_opened_file>");
        assert_eq!(blocks[1]["type"], "text");
        assert_eq!(blocks[1]["text"], "Parser fix\n\nPlease fix the parser");
    }

    #[test]
    fn enqueue_text_replaces_stale_user_text() {
        let enqueue = r#"{"type":"queue-operation","operation":"enqueue","content":[{"type":"text","text":"queued body"}]}"#;
        let later = r#"{"type":"queue-operation","operation":"enqueue","content":[{"type":"text","text":"later body"}]}"#;
        let user = user_line(json!([
            { "type": "text", "text": "<ide_selection>x</ide_selection>" },
            { "type": "text", "text": "Old title\n\nstale copy" }
        ]));
        let input = format!("{enqueue}\n{later}\n{user}\n");

        let output = retitle_transcript(input.as_bytes(), "New").expect("rewrite");
        let content = first_user_content(&output);
        assert_eq!(content[0]["text"], "<ide_selection>x</ide_selection>");
        assert_eq!(content[1]["text"], "New\n\nqueued body");
        assert_eq!(content.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn enqueue_after_the_user_record_is_still_captured() {
        let user = user_line(json!([{ "type": "text", "text": "typed" }]));
        let enqueue = r#"{"type":"queue-operation","operation":"enqueue","content":[{"type":"text","text":"queued"}]}"#;
        let input = format!("{user}\n{enqueue}\n");
        let output = retitle_transcript(input.as_bytes(), "T").expect("rewrite");
        assert_eq!(first_user_content(&output)[0]["text"], "T\n\nqueued");
    }

    #[test]
    fn only_the_first_user_line_changes() {
        let lines = [
            r#"{"type":"summary","summary":"s","leafUuid":"x"}"#.to_string(),
            "not json at all".to_string(),
            user_line(json!([{ "type": "text", "text": "first" }])),
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"ok"}]}}"#.to_string(),
            user_line(json!([{ "type": "text", "text": "second" }])),
            String::new(),
        ];
        let input = lines.join("\n");
        let output = retitle_transcript(input.as_bytes(), "Title").expect("rewrite");

        let before: Vec<&[u8]> = split_raw_lines(input.as_bytes());
        let after: Vec<&[u8]> = split_raw_lines(&output);
        assert_eq!(before.len(), after.len());
        let changed: Vec<usize> = before
            .iter()
            .zip(after.iter())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(changed, vec![2]);
    }

    #[test]
    fn preserves_crlf_lines_and_trailing_partial_line() {
        let user = user_line(json!([{ "type": "text", "text": "hi" }]));
        let input = format!("{{\"type\":\"summary\"}}\r\n{user}\n{{\"type\":\"assistant\"");
        let output = retitle_transcript(input.as_bytes(), "T").expect("rewrite");
        let text = String::from_utf8(output).expect("utf8");
        assert!(text.starts_with("{\"type\":\"summary\"}\r\n"));
        assert!(text.ends_with("\n{\"type\":\"assistant\""));
    }

    #[test]
    fn rewritten_line_keeps_key_order_and_literal_unicode() {
        let user = user_line(json!([{ "type": "text", "text": "안녕하세요" }]));
        let output = retitle_transcript(format!("{user}\n").as_bytes(), "제목").expect("rewrite");
        let text = String::from_utf8(output).expect("utf8");
        assert!(text.contains("제목\\n\\n안녕하세요"));
        assert!(!text.contains("\\u"));
        assert!(text.starts_with(r#"{"parentUuid":null,"type":"user","message""#));
        assert!(text.ends_with("}\n"));
        assert_eq!(text.matches('\n').count(), 1);
    }

    #[test]
    fn missing_user_record_is_an_error() {
        let input = b"{\"type\":\"summary\",\"summary\":\"x\"}\n";
        assert!(matches!(
            retitle_transcript(input, "T"),
            Err(RewriteError::NoUserRecord)
        ));
    }

    #[test]
    fn user_record_without_text_is_left_untouched() {
        let user = user_line(json!([{ "type": "tool_result", "tool_use_id": "t", "content": "x" }]));
        let input = format!("{user}\n");
        let output = retitle_transcript(input.as_bytes(), "T").expect("rewrite");
        assert_eq!(output, input.as_bytes());
    }

    #[test]
    fn string_content_is_retitled_in_place() {
        let user = user_line(json!("plain prompt"));
        let output = retitle_transcript(format!("{user}\n").as_bytes(), "T").expect("rewrite");
        assert_eq!(first_user_content(&output), json!("T\n\nplain prompt"));
    }
}
