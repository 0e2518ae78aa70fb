use crate::domain::{CleanupCandidate, CleanupPlan, ClearOutcome};
use crate::infra::{
    ClearOptions, DeleteError, ManagerConfig, RenameError, clear_sessions, delete_session,
    find_cleanable_sessions, list_projects, list_sessions, rename_session,
};
use humansize::{DECIMAL, format_size};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedArgs {
    pub projects_dir: Option<PathBuf>,
    pub invocation: CliInvocation,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliInvocation {
    PrintHelp,
    PrintVersion,
    Serve,
    Command(CliCommand),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliCommand {
    Projects {
        json: bool,
    },
    Sessions {
        project_name: String,
        json: bool,
    },
    Rename {
        project_name: String,
        session_id: String,
        new_title: String,
    },
    Delete {
        project_name: String,
        session_id: String,
    },
    Cleanup {
        project_name: Option<String>,
        apply: bool,
        options: ClearOptions,
        json: bool,
    },
}

#[derive(Debug, Error)]
pub enum CliParseError {
    #[error("unknown subcommand: {0}")]
    UnknownSubcommand(String),

    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("missing value for flag: {0}")]
    MissingFlagValue(String),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

pub fn parse_invocation(args: &[String]) -> Result<ParsedArgs, CliParseError> {
    let flags_end = args.iter().position(|arg| arg == "--").unwrap_or(args.len());
    let before_separator = &args[..flags_end];
    if before_separator
        .iter()
        .any(|arg| arg == "--help" || arg == "-h")
    {
        return Ok(ParsedArgs {
            projects_dir: None,
            invocation: CliInvocation::PrintHelp,
        });
    }
    if before_separator
        .iter()
        .any(|arg| arg == "--version" || arg == "-V")
    {
        return Ok(ParsedArgs {
            projects_dir: None,
            invocation: CliInvocation::PrintVersion,
        });
    }

    let mut iter = args.iter().skip(1).peekable();
    let mut projects_dir: Option<PathBuf> = None;
    while let Some(arg) = iter.peek() {
        match arg.as_str() {
            "--projects-dir" | "-d" => {
                let _ = iter.next();
                let value = iter
                    .next()
                    .ok_or_else(|| CliParseError::MissingFlagValue("--projects-dir".to_string()))?;
                projects_dir = Some(PathBuf::from(value));
            }
            "--" => {
                let _ = iter.next();
                break;
            }
            _ => break,
        }
    }

    let Some(subcommand) = iter.next() else {
        return Ok(ParsedArgs {
            projects_dir,
            invocation: CliInvocation::Serve,
        });
    };

    let rest: Vec<&String> = iter.collect();
    let invocation = match subcommand.as_str() {
        "serve" => {
            reject_extra(&rest)?;
            CliInvocation::Serve
        }
        "projects" => {
            let (flags, positionals) = split_flags(&rest, &["--json"])?;
            reject_extra(&positionals)?;
            CliInvocation::Command(CliCommand::Projects {
                json: flags.contains(&"--json"),
            })
        }
        "sessions" => {
            let (flags, positionals) = split_flags(&rest, &["--json"])?;
            let mut positionals = positionals.into_iter();
            let project_name = positionals
                .next()
                .ok_or(CliParseError::MissingArgument("project"))?;
            reject_extra(&positionals.collect::<Vec<_>>())?;
            CliInvocation::Command(CliCommand::Sessions {
                project_name: project_name.to_string(),
                json: flags.contains(&"--json"),
            })
        }
        "rename" => {
            let (_, positionals) = split_flags(&rest, &[])?;
            let mut positionals = positionals.into_iter();
            let project_name = positionals
                .next()
                .ok_or(CliParseError::MissingArgument("project"))?;
            let session_id = positionals
                .next()
                .ok_or(CliParseError::MissingArgument("session-id"))?;
            let words: Vec<&str> = positionals.map(|word| word.as_str()).collect();
            if words.is_empty() {
                return Err(CliParseError::MissingArgument("title"));
            }
            CliInvocation::Command(CliCommand::Rename {
                project_name: project_name.to_string(),
                session_id: session_id.to_string(),
                new_title: words.join(" "),
            })
        }
        "delete" => {
            let (_, positionals) = split_flags(&rest, &[])?;
            let mut positionals = positionals.into_iter();
            let project_name = positionals
                .next()
                .ok_or(CliParseError::MissingArgument("project"))?;
            let session_id = positionals
                .next()
                .ok_or(CliParseError::MissingArgument("session-id"))?;
            reject_extra(&positionals.collect::<Vec<_>>())?;
            CliInvocation::Command(CliCommand::Delete {
                project_name: project_name.to_string(),
                session_id: session_id.to_string(),
            })
        }
        "cleanup" => {
            let (flags, positionals) = split_flags(
                &rest,
                &["--apply", "--keep-empty", "--keep-invalid", "--json"],
            )?;
            let mut positionals = positionals.into_iter();
            let project_name = positionals.next().map(|name| name.to_string());
            reject_extra(&positionals.collect::<Vec<_>>())?;
            CliInvocation::Command(CliCommand::Cleanup {
                project_name,
                apply: flags.contains(&"--apply"),
                options: ClearOptions {
                    clear_empty: !flags.contains(&"--keep-empty"),
                    clear_invalid: !flags.contains(&"--keep-invalid"),
                },
                json: flags.contains(&"--json"),
            })
        }
        other => return Err(CliParseError::UnknownSubcommand(other.to_string())),
    };

    Ok(ParsedArgs {
        projects_dir,
        invocation,
    })
}

/// Splits `args` into known boolean flags and positionals. Anything after
/// `--` is positional, so titles may start with a dash.
fn split_flags<'a>(
    args: &[&'a String],
    known: &[&'static str],
) -> Result<(Vec<&'static str>, Vec<&'a String>), CliParseError> {
    let mut flags: Vec<&'static str> = Vec::new();
    let mut positionals: Vec<&'a String> = Vec::new();
    let mut only_positionals = false;
    for arg in args {
        if only_positionals {
            positionals.push(arg);
            continue;
        }
        if arg.as_str() == "--" {
            only_positionals = true;
            continue;
        }
        if let Some(flag) = known.iter().find(|flag| **flag == arg.as_str()) {
            flags.push(flag);
            continue;
        }
        if arg.starts_with('-') && arg.len() > 1 {
            return Err(CliParseError::UnknownFlag(arg.to_string()));
        }
        positionals.push(arg);
    }
    Ok((flags, positionals))
}

fn reject_extra(args: &[&String]) -> Result<(), CliParseError> {
    match args.first() {
        Some(arg) if arg.starts_with('-') => Err(CliParseError::UnknownFlag(arg.to_string())),
        Some(arg) => Err(CliParseError::UnexpectedArgument(arg.to_string())),
        None => Ok(()),
    }
}

#[derive(Debug, Error)]
pub enum CliRunError {
    #[error(transparent)]
    Rename(#[from] RenameError),

    #[error(transparent)]
    Delete(#[from] DeleteError),

    #[error("session not found: {session_id} (project {project_name})\nHint: run `ccsm sessions <project>` and copy the session id column.")]
    SessionNotFound {
        project_name: String,
        session_id: String,
    },

    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    WriteOutput(#[from] io::Error),
}

pub fn run(command: CliCommand, config: &ManagerConfig) -> Result<(), CliRunError> {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let stderr = io::stderr();
    let mut err = io::BufWriter::new(stderr.lock());

    match command {
        CliCommand::Projects { json } => {
            let projects = list_projects(config);
            if json {
                write_json(&mut out, &projects)?;
            } else {
                for project in projects {
                    let line = format!(
                        "{}\t{}\t{}",
                        project.name, project.display_name, project.session_count
                    );
                    if !write_line(&mut out, &line)? {
                        return Ok(());
                    }
                }
            }
        }
        CliCommand::Sessions { project_name, json } => {
            let sessions = list_sessions(config, &project_name);
            if json {
                write_json(&mut out, &sessions)?;
            } else {
                for session in sessions {
                    let line = format!(
                        "{}\t{}\t{}\t{}",
                        session.updated_at.as_deref().unwrap_or("-"),
                        session.session_id,
                        session.message_count,
                        session.title
                    );
                    if !write_line(&mut out, &line)? {
                        return Ok(());
                    }
                }
            }
        }
        CliCommand::Rename {
            project_name,
            session_id,
            new_title,
        } => {
            rename_session(config, &project_name, &session_id, &new_title)?;
            let _ = write_line(&mut out, "Session renamed")?;
        }
        CliCommand::Delete {
            project_name,
            session_id,
        } => {
            if !delete_session(config, &project_name, &session_id)? {
                return Err(CliRunError::SessionNotFound {
                    project_name,
                    session_id,
                });
            }
            let _ = write_line(&mut out, "Session deleted (backed up to .bak)")?;
        }
        CliCommand::Cleanup {
            project_name,
            apply,
            options,
            json,
        } => {
            if apply {
                let outcome = clear_sessions(config, project_name.as_deref(), options);
                if json {
                    write_json(&mut out, &outcome)?;
                } else {
                    print_clear_outcome(&mut out, &mut err, &outcome)?;
                }
            } else {
                let plan = find_cleanable_sessions(config, project_name.as_deref());
                if json {
                    write_json(&mut out, &plan)?;
                } else {
                    print_cleanup_plan(&mut out, &plan)?;
                }
            }
        }
    }

    out.flush()?;
    err.flush()?;
    Ok(())
}

fn print_cleanup_plan(out: &mut impl Write, plan: &CleanupPlan) -> io::Result<()> {
    let rows = plan
        .empty_sessions
        .iter()
        .map(|candidate| ("empty", candidate))
        .chain(
            plan.invalid_api_key_sessions
                .iter()
                .map(|candidate| ("invalid_api_key", candidate)),
        );
    for (reason, candidate) in rows {
        if !write_line(out, &candidate_row(reason, candidate))? {
            return Ok(());
        }
    }
    let _ = write_line(
        out,
        &format!(
            "{} session(s) can be cleaned. Re-run with --apply to move them to .bak.",
            plan.total_count
        ),
    )?;
    Ok(())
}

fn print_clear_outcome(
    out: &mut impl Write,
    err: &mut impl Write,
    outcome: &ClearOutcome,
) -> io::Result<()> {
    let rows = outcome
        .empty_sessions
        .iter()
        .map(|candidate| ("empty", candidate))
        .chain(
            outcome
                .invalid_api_key_sessions
                .iter()
                .map(|candidate| ("invalid_api_key", candidate)),
        );
    for (reason, candidate) in rows {
        if !write_line(out, &candidate_row(reason, candidate))? {
            return Ok(());
        }
    }
    for failure in &outcome.errors {
        let _ = write_line(
            err,
            &format!(
                "failed\t{}\t{}\t{}",
                failure.session.project_name, failure.session.session_id, failure.error
            ),
        )?;
    }
    let _ = write_line(
        out,
        &format!(
            "{} session(s) moved to .bak, {} failed.",
            outcome.total_deleted,
            outcome.errors.len()
        ),
    )?;
    Ok(())
}

fn candidate_row(reason: &str, candidate: &CleanupCandidate) -> String {
    format!(
        "{reason}\t{}\t{}\t{}",
        candidate.project_name,
        candidate.session_id,
        format_size(candidate.file_size, DECIMAL)
    )
}

fn write_json<T: Serialize>(out: &mut impl Write, payload: &T) -> Result<(), CliRunError> {
    let text = serde_json::to_string_pretty(payload)?;
    let _ = write_line(out, &text)?;
    Ok(())
}

fn write_line(out: &mut impl Write, line: &str) -> io::Result<bool> {
    match writeln!(out, "{line}") {
        Ok(()) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(false),
        Err(error) => Err(error),
    }
}
