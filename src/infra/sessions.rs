use crate::domain::{
    SessionStatus, SessionSummary, SummaryBuilder, TranscriptRecord, decode_record,
    sort_sessions_by_recency,
};
use crate::infra::{ManagerConfig, is_session_file_name, session_id_from_path};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Calls `visit` for every decodable record in file order. Invalid UTF-8 is
/// replaced rather than treated as an error; undecodable lines are skipped.
pub fn for_each_record(path: &Path, mut visit: impl FnMut(TranscriptRecord)) -> io::Result<()> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut buf: Vec<u8> = Vec::new();
    loop {
        buf.clear();
        let bytes = reader.read_until(b'\n', &mut buf)?;
        if bytes == 0 {
            break;
        }
        if let Some(record) = decode_record(&String::from_utf8_lossy(&buf)) {
            visit(record);
        }
    }
    Ok(())
}

pub fn summarize_session_file(path: &Path) -> io::Result<Option<SessionSummary>> {
    let mut builder = SummaryBuilder::new(session_id_from_path(path));
    for_each_record(path, |record| builder.push(&record))?;
    Ok(builder.finish())
}

pub fn inspect_session_status(path: &Path) -> SessionStatus {
    let file_size = fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
    let mut status = SessionStatus::new(file_size);
    if file_size == 0 {
        return status;
    }

    if let Err(error) = for_each_record(path, |record| status.observe(&record)) {
        log::warn!("failed to read {}: {error}", path.display());
    }
    status
}

/// Non-agent `*.jsonl` files directly inside `project_dir`, sorted by path.
/// Symlinked transcripts are listed under their link name.
pub fn list_session_files(project_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(project_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                log::warn!("skipping unreadable entry in {}: {error}", project_dir.display());
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_str().is_some_and(is_session_file_name))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

pub fn list_sessions(config: &ManagerConfig, project_name: &str) -> Vec<SessionSummary> {
    let project_dir = match config.project_dir(project_name) {
        Ok(dir) => dir,
        Err(error) => {
            log::warn!("{error}");
            return Vec::new();
        }
    };
    if !project_dir.is_dir() {
        return Vec::new();
    }

    let mut sessions: Vec<SessionSummary> = Vec::new();
    for path in list_session_files(&project_dir) {
        match summarize_session_file(&path) {
            Ok(Some(summary)) => sessions.push(summary),
            Ok(None) => {}
            Err(error) => log::warn!("skipping {}: {error}", path.display()),
        }
    }
    sort_sessions_by_recency(&mut sessions);
    sessions
}
