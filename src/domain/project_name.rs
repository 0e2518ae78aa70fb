use std::path::Path;

const JOINED_EXTENSIONS: &[&str] = &[
    "com", "org", "net", "io", "dev", "md", "txt", "py", "js", "ts",
];

/// Best-effort decoding of a project directory name such as
/// `-Users-me-work-site-io` back into `~/work/site.io`.
///
/// The encoding is lossy (`-` inside a path component is indistinguishable
/// from a separator), so this is for display only.
pub fn format_project_name(name: &str, home: Option<&Path>) -> String {
    let name = name.strip_prefix('-').unwrap_or(name);
    let name = name.replace("--", "/.");

    let mut parts: Vec<String> = name.split('-').map(|part| part.to_string()).collect();
    if parts.len() > 1 {
        let last_is_extension = parts
            .last()
            .is_some_and(|last| JOINED_EXTENSIONS.contains(&last.as_str()));
        if last_is_extension {
            if let Some(last) = parts.pop() {
                if let Some(prev) = parts.last_mut() {
                    prev.push('.');
                    prev.push_str(&last);
                }
            }
        }
    }

    let path = format!("/{}", parts.join("/"));
    match home.and_then(|home| home.to_str()) {
        Some(home) => abbreviate_home(&path, home.trim_end_matches('/')),
        None => path,
    }
}

fn abbreviate_home(path: &str, home: &str) -> String {
    if home.is_empty() {
        return path.to_string();
    }
    match path.strip_prefix(home) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => format!("~{rest}"),
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn decodes_plain_project_path() {
        assert_eq!(
            format_project_name("-Users-me-works-myproject", None),
            "/Users/me/works/myproject"
        );
    }

    #[test]
    fn abbreviates_home_directory() {
        let home = PathBuf::from("/Users/me");
        assert_eq!(
            format_project_name("-Users-me-works-myproject", Some(&home)),
            "~/works/myproject"
        );
        assert_eq!(format_project_name("-Users-me", Some(&home)), "~");
        assert_eq!(
            format_project_name("-Users-meg-code", Some(&home)),
            "/Users/meg/code"
        );
    }

    #[test]
    fn restores_hidden_directories_and_extensions() {
        assert_eq!(
            format_project_name("-home-dev--config-notes-md", None),
            "/home/dev/.config/notes.md"
        );
        assert_eq!(
            format_project_name("-srv-www-example-com", None),
            "/srv/www/example.com"
        );
    }

    #[test]
    fn single_component_keeps_extension_like_name() {
        assert_eq!(format_project_name("io", None), "/io");
    }
}
