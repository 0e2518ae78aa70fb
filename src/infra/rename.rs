use crate::domain::{RewriteError, retitle_transcript};
use crate::infra::{InvalidNameError, ManagerConfig};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenameError {
    #[error(transparent)]
    InvalidName(#[from] InvalidNameError),

    #[error("session file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("cannot retitle {path}: {source}")]
    Rewrite {
        path: PathBuf,
        source: RewriteError,
    },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Replaces the file contents through a sibling temp file so readers never
/// observe a half-written transcript.
///
/// A symlinked transcript is written through to its target, and the target's
/// permission bits carry over to the new file.
pub fn write_transcript(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let target = fs::canonicalize(path)?;
    let permissions = fs::metadata(&target)?.permissions();
    let tmp = temp_path_for(&target);

    let result = fs::write(&tmp, bytes)
        .and_then(|()| fs::set_permissions(&tmp, permissions))
        .and_then(|()| fs::rename(&tmp, &target));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Read, retitle and write back in one go. Appends made by another process
/// between the read and the write are lost; no locking is attempted.
pub fn rename_session_file(path: &Path, new_title: &str) -> Result<(), RenameError> {
    if !path.is_file() {
        return Err(RenameError::NotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path).map_err(|source| RenameError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let updated = retitle_transcript(&bytes, new_title).map_err(|source| RenameError::Rewrite {
        path: path.to_path_buf(),
        source,
    })?;
    write_transcript(path, &updated).map_err(|source| RenameError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    log::info!("retitled {} as {new_title:?}", path.display());
    Ok(())
}

pub fn rename_session(
    config: &ManagerConfig,
    project_name: &str,
    session_id: &str,
    new_title: &str,
) -> Result<(), RenameError> {
    let path = config.session_path(project_name, session_id)?;
    rename_session_file(&path, new_title)
}
