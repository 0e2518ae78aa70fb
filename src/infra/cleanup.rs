use crate::domain::{
    CleanupCandidate, CleanupFailure, CleanupPlan, CleanupReason, ClearOutcome,
};
use crate::infra::{
    ManagerConfig, delete_session, inspect_session_status, list_project_dirs, list_session_files,
    session_id_from_path,
};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ClearOptions {
    pub clear_empty: bool,
    pub clear_invalid: bool,
}

impl Default for ClearOptions {
    fn default() -> Self {
        Self {
            clear_empty: true,
            clear_invalid: true,
        }
    }
}

fn project_dirs_in_scope(
    config: &ManagerConfig,
    project_name: Option<&str>,
) -> Vec<(String, PathBuf)> {
    match project_name.filter(|name| !name.is_empty()) {
        Some(name) => match config.project_dir(name) {
            Ok(dir) if dir.is_dir() => vec![(name.to_string(), dir)],
            Ok(_) => Vec::new(),
            Err(error) => {
                log::warn!("{error}");
                Vec::new()
            }
        },
        None => list_project_dirs(config),
    }
}

pub fn find_cleanable_sessions(config: &ManagerConfig, project_name: Option<&str>) -> CleanupPlan {
    let mut plan = CleanupPlan::default();

    for (project, project_dir) in project_dirs_in_scope(config, project_name) {
        for path in list_session_files(&project_dir) {
            let status = inspect_session_status(&path);
            let Some(reason) = status.cleanup_reason() else {
                continue;
            };
            let candidate = CleanupCandidate {
                project_name: project.clone(),
                session_id: session_id_from_path(&path),
                file_size: status.file_size,
            };
            match reason {
                CleanupReason::InvalidApiKey => plan.invalid_api_key_sessions.push(candidate),
                CleanupReason::Empty => plan.empty_sessions.push(candidate),
            }
        }
    }

    plan.total_count = plan.empty_sessions.len() + plan.invalid_api_key_sessions.len();
    plan
}

/// Soft-deletes every selected candidate. A failing move is recorded in
/// `errors` and the batch carries on.
pub fn clear_sessions(
    config: &ManagerConfig,
    project_name: Option<&str>,
    options: ClearOptions,
) -> ClearOutcome {
    let plan = find_cleanable_sessions(config, project_name);
    let mut outcome = ClearOutcome::default();

    let mut selected: Vec<(CleanupCandidate, CleanupReason)> = Vec::new();
    if options.clear_empty {
        selected.extend(
            plan.empty_sessions
                .into_iter()
                .map(|candidate| (candidate, CleanupReason::Empty)),
        );
    }
    if options.clear_invalid {
        selected.extend(
            plan.invalid_api_key_sessions
                .into_iter()
                .map(|candidate| (candidate, CleanupReason::InvalidApiKey)),
        );
    }

    for (candidate, reason) in selected {
        match delete_session(config, &candidate.project_name, &candidate.session_id) {
            Ok(true) => {
                outcome.total_deleted += 1;
                match reason {
                    CleanupReason::Empty => outcome.empty_sessions.push(candidate),
                    CleanupReason::InvalidApiKey => {
                        outcome.invalid_api_key_sessions.push(candidate)
                    }
                }
            }
            Ok(false) => {
                log::debug!(
                    "{} session {} vanished before cleanup",
                    reason.label(),
                    candidate.session_id
                );
            }
            Err(error) => {
                log::warn!("failed to clear session {}: {error}", candidate.session_id);
                outcome.errors.push(CleanupFailure {
                    session: candidate,
                    error: error.to_string(),
                });
            }
        }
    }

    outcome
}
