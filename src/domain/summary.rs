use crate::domain::{ContentItem, TranscriptRecord};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

pub const MAX_TITLE_CHARS: usize = 100;
const DEFAULT_TITLE_ID_CHARS: usize = 8;

static IDE_TAG_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<ide_[^>]*>.*?</ide_[^>]*>").expect("ide tag regex should compile")
});

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub title: String,
    pub message_count: usize,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Folds records in file order into a [`SessionSummary`].
#[derive(Clone, Debug)]
pub struct SummaryBuilder {
    session_id: String,
    message_count: usize,
    created_at: Option<String>,
    updated_at: Option<String>,
    first_user_text: Option<String>,
}

impl SummaryBuilder {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message_count: 0,
            created_at: None,
            updated_at: None,
            first_user_text: None,
        }
    }

    pub fn push(&mut self, record: &TranscriptRecord) {
        if !record.is_dialogue() {
            return;
        }
        self.message_count += 1;

        if let Some(timestamp) = record.timestamp().filter(|ts| !ts.is_empty()) {
            if self
                .created_at
                .as_deref()
                .is_none_or(|current| timestamp < current)
            {
                self.created_at = Some(timestamp.to_string());
            }
            if self
                .updated_at
                .as_deref()
                .is_none_or(|current| timestamp > current)
            {
                self.updated_at = Some(timestamp.to_string());
            }
        }

        if self.first_user_text.is_none() {
            if let TranscriptRecord::User { content, .. } = record {
                self.first_user_text = first_clean_text(content);
            }
        }
    }

    /// `None` when no user or assistant record was seen.
    pub fn finish(self) -> Option<SessionSummary> {
        if self.message_count == 0 {
            return None;
        }
        let title = self
            .first_user_text
            .as_deref()
            .map(derive_title)
            .unwrap_or_else(|| default_title(&self.session_id));
        Some(SessionSummary {
            session_id: self.session_id,
            title,
            message_count: self.message_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn first_clean_text(content: &[ContentItem]) -> Option<String> {
    content
        .iter()
        .filter_map(ContentItem::text)
        .map(clean_user_text)
        .find(|text| !text.is_empty())
}

pub fn strip_ide_tags(text: &str) -> String {
    IDE_TAG_BLOCK.replace_all(text, "").into_owned()
}

pub fn clean_user_text(text: &str) -> String {
    strip_ide_tags(text.trim()).trim().to_string()
}

pub fn derive_title(text: &str) -> String {
    let head = match text.split_once("\n\n") {
        Some((head, _)) => head,
        None => text.split('\n').next().unwrap_or(text),
    };
    head.chars().take(MAX_TITLE_CHARS).collect()
}

pub fn default_title(session_id: &str) -> String {
    let prefix: String = session_id.chars().take(DEFAULT_TITLE_ID_CHARS).collect();
    format!("Session {prefix}")
}

/// Most recently updated first; sessions without `updated_at` go last.
pub fn sort_sessions_by_recency(sessions: &mut [SessionSummary]) {
    sessions.sort_by(|a, b| {
        let a_key = a.updated_at.as_deref().unwrap_or("");
        let b_key = b.updated_at.as_deref().unwrap_or("");
        b_key.cmp(a_key)
    });
}
