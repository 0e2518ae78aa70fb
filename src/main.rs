mod cli;
mod domain;
mod infra;
mod mcp;

use crate::cli::{CliInvocation, ParsedArgs};
use crate::infra::{ManagerConfig, ResolveProjectsDirError};
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
enum MainError {
    #[error(transparent)]
    Resolve(#[from] ResolveProjectsDirError),

    #[error(transparent)]
    Cli(#[from] crate::cli::CliRunError),

    #[error("failed to start runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error("mcp server error: {0:#}")]
    Mcp(#[source] anyhow::Error),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(error) = run_main() {
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "{error}");
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), MainError> {
    let args = std::env::args().collect::<Vec<_>>();
    let ParsedArgs {
        projects_dir,
        invocation,
    } = match crate::cli::parse_invocation(&args) {
        Ok(parsed) => parsed,
        Err(error) => {
            let mut err = io::stderr().lock();
            let _ = writeln!(err, "{error}");
            let _ = writeln!(err);
            print_help();
            std::process::exit(2);
        }
    };

    match invocation {
        CliInvocation::PrintHelp => {
            print_help();
            Ok(())
        }
        CliInvocation::PrintVersion => {
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliInvocation::Serve => {
            let config = ManagerConfig::resolve(projects_dir)?;
            run_server(config)
        }
        CliInvocation::Command(command) => {
            let config = ManagerConfig::resolve(projects_dir)?;
            crate::cli::run(command, &config)?;
            Ok(())
        }
    }
}

/// Tool calls are handled one at a time, so a single-threaded runtime is
/// enough for the stdio transport.
fn run_server(config: ManagerConfig) -> Result<(), MainError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(MainError::Runtime)?;
    runtime
        .block_on(crate::mcp::serve_stdio(config))
        .map_err(MainError::Mcp)
}

fn print_help() {
    let text = format!(
        "{name} - browse, rename, and clean up Claude Code sessions\n\nUSAGE:\n  {name} [--projects-dir DIR]                      Serve MCP tools over stdio\n  {name} serve                                     Same as above\n  {name} projects [--json]                         List projects with session counts\n  {name} sessions <project> [--json]               List sessions, newest first\n  {name} rename <project> <session-id> <title...>  Prefix the first message with a title\n  {name} delete <project> <session-id>             Move a session to .bak\n  {name} cleanup [project] [--apply] [--keep-empty] [--keep-invalid] [--json]\n                                                   Preview (or apply) removal of empty and invalid-API-key sessions\n  {name} --help | --version\n\nGLOBAL FLAGS:\n  -d, --projects-dir DIR  Claude projects dir (default: $CLAUDE_PROJECTS_DIR or ~/.claude/projects)\n\nOUTPUT:\n  projects: project_name<TAB>display_name<TAB>session_count\n  sessions: updated_at<TAB>session_id<TAB>message_count<TAB>title\n  cleanup:  reason<TAB>project_name<TAB>session_id<TAB>size\n\nENV:\n  CLAUDE_PROJECTS_DIR   Override Claude projects dir (default: ~/.claude/projects)\n  RUST_LOG              Log filter for stderr diagnostics (default: warn)\n",
        name = env!("CARGO_PKG_NAME")
    );
    let mut out = io::stdout().lock();
    let _ = write!(out, "{text}");
}
