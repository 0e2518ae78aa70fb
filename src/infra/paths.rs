use dirs::home_dir;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

pub const BACKUP_DIR_NAME: &str = ".bak";
pub const SESSION_EXTENSION: &str = "jsonl";
pub const AGENT_SESSION_PREFIX: &str = "agent-";

#[derive(Debug, Error)]
pub enum ResolveProjectsDirError {
    #[error("home directory not found")]
    HomeDirNotFound,
}

#[derive(Debug, Error)]
#[error("invalid {kind} name: {value:?}")]
pub struct InvalidNameError {
    pub kind: &'static str,
    pub value: String,
}

/// Where transcripts live. Resolved once at startup and passed to every
/// operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ManagerConfig {
    pub projects_dir: PathBuf,
    pub home_dir: Option<PathBuf>,
}

impl ManagerConfig {
    pub fn new(projects_dir: impl Into<PathBuf>) -> Self {
        Self {
            projects_dir: projects_dir.into(),
            home_dir: None,
        }
    }

    pub fn with_home_dir(mut self, home_dir: Option<PathBuf>) -> Self {
        self.home_dir = home_dir;
        self
    }

    pub fn resolve(override_dir: Option<PathBuf>) -> Result<Self, ResolveProjectsDirError> {
        let projects_dir = match override_dir {
            Some(dir) => dir,
            None => resolve_claude_projects_dir()?,
        };
        Ok(Self::new(projects_dir).with_home_dir(home_dir()))
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.projects_dir.join(BACKUP_DIR_NAME)
    }

    pub fn project_dir(&self, project_name: &str) -> Result<PathBuf, InvalidNameError> {
        ensure_single_component("project", project_name)?;
        Ok(self.projects_dir.join(project_name))
    }

    pub fn session_path(
        &self,
        project_name: &str,
        session_id: &str,
    ) -> Result<PathBuf, InvalidNameError> {
        ensure_single_component("session", session_id)?;
        Ok(self
            .project_dir(project_name)?
            .join(format!("{session_id}.{SESSION_EXTENSION}")))
    }

    pub fn backup_path(
        &self,
        project_name: &str,
        session_id: &str,
    ) -> Result<PathBuf, InvalidNameError> {
        ensure_single_component("project", project_name)?;
        ensure_single_component("session", session_id)?;
        Ok(self
            .backup_dir()
            .join(format!("{project_name}_{session_id}.{SESSION_EXTENSION}")))
    }
}

pub fn resolve_claude_projects_dir() -> Result<PathBuf, ResolveProjectsDirError> {
    if let Some(override_dir) = std::env::var_os("CLAUDE_PROJECTS_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let Some(home) = home_dir() else {
        return Err(ResolveProjectsDirError::HomeDirNotFound);
    };

    Ok(home.join(".claude").join("projects"))
}

/// Rejects anything that would not stay a single child of its parent
/// directory (`..`, separators, empty names).
fn ensure_single_component(kind: &'static str, value: &str) -> Result<(), InvalidNameError> {
    let mut components = Path::new(value).components();
    let valid = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == value
    );
    if valid && !value.contains(['/', '\\']) {
        Ok(())
    } else {
        Err(InvalidNameError {
            kind,
            value: value.to_string(),
        })
    }
}

pub fn is_session_file_name(file_name: &str) -> bool {
    file_name.ends_with(".jsonl") && !file_name.starts_with(AGENT_SESSION_PREFIX)
}

pub fn session_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_session_and_backup_paths() {
        let config = ManagerConfig::new("/base");
        assert_eq!(
            config.session_path("-p", "abc").expect("path"),
            PathBuf::from("/base/-p/abc.jsonl")
        );
        assert_eq!(
            config.backup_path("-p", "abc").expect("path"),
            PathBuf::from("/base/.bak/-p_abc.jsonl")
        );
    }

    #[test]
    fn rejects_names_that_escape_the_base_dir() {
        let config = ManagerConfig::new("/base");
        for bad in ["", ".", "..", "a/b", "../x", "/abs", "a\\b"] {
            assert!(config.project_dir(bad).is_err(), "project {bad:?}");
            assert!(config.session_path("p", bad).is_err(), "session {bad:?}");
        }
    }

    #[test]
    fn session_file_filter_skips_agent_transcripts() {
        assert!(is_session_file_name("0b7c.jsonl"));
        assert!(!is_session_file_name("agent-0b7c.jsonl"));
        assert!(!is_session_file_name("0b7c.json"));
        assert!(!is_session_file_name("0b7c.jsonl.tmp"));
    }
}
