use crate::domain::{ProjectInfo, format_project_name};
use crate::infra::{ManagerConfig, list_session_files};
use std::fs;
use std::path::PathBuf;

/// Project directories under the base path, skipping dot-directories such as
/// the `.bak` recovery folder. Sorted by name.
pub fn list_project_dirs(config: &ManagerConfig) -> Vec<(String, PathBuf)> {
    let entries = match fs::read_dir(&config.projects_dir) {
        Ok(entries) => entries,
        Err(error) => {
            log::warn!(
                "projects dir is not readable: {}: {error}",
                config.projects_dir.display()
            );
            return Vec::new();
        }
    };

    let mut dirs: Vec<(String, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                log::warn!("skipping unreadable project entry: {error}");
                continue;
            }
        };
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        dirs.push((name, entry.path()));
    }

    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    dirs
}

pub fn list_projects(config: &ManagerConfig) -> Vec<ProjectInfo> {
    if !config.projects_dir.exists() {
        return Vec::new();
    }

    list_project_dirs(config)
        .into_iter()
        .map(|(name, path)| ProjectInfo {
            display_name: format_project_name(&name, config.home_dir.as_deref()),
            session_count: list_session_files(&path).len(),
            name,
        })
        .collect()
}
