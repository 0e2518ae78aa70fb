use crate::infra::{InvalidNameError, ManagerConfig};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error(transparent)]
    InvalidName(#[from] InvalidNameError),

    #[error("failed to create backup dir {path}: {source}")]
    CreateBackupDir { path: PathBuf, source: io::Error },

    #[error("failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

/// Moves `session_path` to `backup_path`, creating the backup directory as
/// needed. `Ok(false)` when there is nothing to move.
///
/// A single `rename`: atomic on one filesystem, fails across devices.
pub fn soft_delete(session_path: &Path, backup_path: &Path) -> Result<bool, DeleteError> {
    if !session_path.is_file() {
        return Ok(false);
    }

    if let Some(backup_dir) = backup_path.parent() {
        fs::create_dir_all(backup_dir).map_err(|source| DeleteError::CreateBackupDir {
            path: backup_dir.to_path_buf(),
            source,
        })?;
    }

    fs::rename(session_path, backup_path).map_err(|source| DeleteError::Move {
        from: session_path.to_path_buf(),
        to: backup_path.to_path_buf(),
        source,
    })?;
    log::info!(
        "moved {} to {}",
        session_path.display(),
        backup_path.display()
    );
    Ok(true)
}

pub fn delete_session(
    config: &ManagerConfig,
    project_name: &str,
    session_id: &str,
) -> Result<bool, DeleteError> {
    let session_path = config.session_path(project_name, session_id)?;
    let backup_path = config.backup_path(project_name, session_id)?;
    soft_delete(&session_path, &backup_path)
}
