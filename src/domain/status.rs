use crate::domain::TranscriptRecord;
use serde::Serialize;

pub const INVALID_API_KEY_MARKER: &str = "Invalid API key";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct SessionStatus {
    pub is_empty: bool,
    pub has_invalid_api_key: bool,
    pub has_messages: bool,
    pub file_size: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CleanupReason {
    Empty,
    InvalidApiKey,
}

impl CleanupReason {
    pub fn label(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::InvalidApiKey => "invalid_api_key",
        }
    }
}

impl SessionStatus {
    pub fn new(file_size: u64) -> Self {
        Self {
            is_empty: true,
            has_invalid_api_key: false,
            has_messages: false,
            file_size,
        }
    }

    /// Folds one record in. Never short-circuits: both flags matter for
    /// [`SessionStatus::cleanup_reason`].
    pub fn observe(&mut self, record: &TranscriptRecord) {
        match record {
            TranscriptRecord::Summary { summary } if summary.contains(INVALID_API_KEY_MARKER) => {
                self.has_invalid_api_key = true;
            }
            TranscriptRecord::User { .. } | TranscriptRecord::Assistant { .. } => {
                self.is_empty = false;
                self.has_messages = true;
            }
            _ => {}
        }
    }

    pub fn cleanup_reason(&self) -> Option<CleanupReason> {
        if self.has_invalid_api_key && !self.has_messages {
            return Some(CleanupReason::InvalidApiKey);
        }
        if self.is_empty || self.file_size == 0 {
            return Some(CleanupReason::Empty);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ContentItem;

    fn inspect(file_size: u64, records: &[TranscriptRecord]) -> SessionStatus {
        let mut status = SessionStatus::new(file_size);
        for record in records {
            status.observe(record);
        }
        status
    }

    #[test]
    fn zero_size_is_empty_candidate() {
        let status = inspect(0, &[]);
        assert!(status.is_empty);
        assert_eq!(status.cleanup_reason(), Some(CleanupReason::Empty));
    }

    #[test]
    fn invalid_key_without_messages_is_invalid_not_empty() {
        let status = inspect(
            120,
            &[TranscriptRecord::Summary {
                summary: "Invalid API key detected".to_string(),
            }],
        );
        assert!(status.is_empty);
        assert!(status.has_invalid_api_key);
        assert_eq!(status.cleanup_reason(), Some(CleanupReason::InvalidApiKey));
    }

    #[test]
    fn invalid_key_alongside_messages_is_kept() {
        let status = inspect(
            500,
            &[
                TranscriptRecord::User {
                    timestamp: None,
                    content: vec![ContentItem::Text("hello".to_string())],
                },
                TranscriptRecord::Summary {
                    summary: "Invalid API key · Please run /login".to_string(),
                },
            ],
        );
        assert!(status.has_invalid_api_key);
        assert!(status.has_messages);
        assert_eq!(status.cleanup_reason(), None);
    }

    #[test]
    fn non_dialogue_records_leave_file_empty() {
        let status = inspect(
            64,
            &[
                TranscriptRecord::Summary {
                    summary: "Refactor notes".to_string(),
                },
                TranscriptRecord::Other,
            ],
        );
        assert_eq!(status.cleanup_reason(), Some(CleanupReason::Empty));
    }
}
