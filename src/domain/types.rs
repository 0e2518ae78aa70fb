use serde::Serialize;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ProjectInfo {
    pub name: String,
    pub display_name: String,
    pub session_count: usize,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CleanupCandidate {
    pub project_name: String,
    pub session_id: String,
    pub file_size: u64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CleanupPlan {
    pub empty_sessions: Vec<CleanupCandidate>,
    pub invalid_api_key_sessions: Vec<CleanupCandidate>,
    pub total_count: usize,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CleanupFailure {
    pub session: CleanupCandidate,
    pub error: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ClearOutcome {
    pub empty_sessions: Vec<CleanupCandidate>,
    pub invalid_api_key_sessions: Vec<CleanupCandidate>,
    pub total_deleted: usize,
    pub errors: Vec<CleanupFailure>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
}

impl OperationResult {
    pub fn new(success: bool, ok_message: &str, failed_message: &str) -> Self {
        Self {
            success,
            message: if success { ok_message } else { failed_message }.to_string(),
        }
    }
}
