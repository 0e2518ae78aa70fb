//! MCP tools for browsing and tidying Claude Code sessions.
//!
//! Every tool answers with a single text item holding pretty-printed JSON.
//! Operation failures are reported inside that payload, never as protocol
//! errors.

use crate::domain::OperationResult;
use crate::infra::{
    ClearOptions, ManagerConfig, clear_sessions, delete_session, find_cleanable_sessions,
    list_projects, list_sessions, rename_session,
};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars;
use rmcp::transport::stdio;
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt, tool, tool_handler, tool_router};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct SessionManagerService {
    config: ManagerConfig,
    tool_router: ToolRouter<Self>,
}

impl SessionManagerService {
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_handler]
impl ServerHandler for SessionManagerService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("Manage Claude Code sessions stored under ~/.claude/projects. Use 'list_projects' and 'list_sessions' to browse, 'rename_session' to retitle, 'delete_session' to move a session to .bak, and 'preview_cleanup' before 'clear_sessions'.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

pub async fn serve_stdio(config: ManagerConfig) -> anyhow::Result<()> {
    log::info!(
        "serving sessions from {} over stdio",
        config.projects_dir.display()
    );
    let server = SessionManagerService::new(config).serve(stdio()).await?;
    server.waiting().await?;
    log::info!("session manager stopped");
    Ok(())
}

fn json_result<T: Serialize>(payload: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(payload)
        .map_err(|error| McpError::internal_error(error.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

// ============================================================================
// Tool Input Schemas
// ============================================================================

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct ListProjectsRequest {}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListSessionsRequest {
    #[schemars(description = "Project folder name (e.g., '-Users-me-works-myproject')")]
    #[serde(default)]
    pub project_name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RenameSessionRequest {
    #[schemars(description = "Project folder name")]
    #[serde(default)]
    pub project_name: String,

    #[schemars(description = "Session ID (filename without .jsonl)")]
    #[serde(default)]
    pub session_id: String,

    #[schemars(description = "New title to add as prefix")]
    #[serde(default)]
    pub new_title: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteSessionRequest {
    #[schemars(description = "Project folder name")]
    #[serde(default)]
    pub project_name: String,

    #[schemars(description = "Session ID to delete")]
    #[serde(default)]
    pub session_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PreviewCleanupRequest {
    #[schemars(description = "Optional: filter by project name")]
    pub project_name: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ClearSessionsRequest {
    #[schemars(description = "Optional: filter by project name")]
    pub project_name: Option<String>,

    #[schemars(description = "Clear empty sessions (default: true)")]
    pub clear_empty: Option<bool>,

    #[schemars(description = "Clear invalid API key sessions (default: true)")]
    pub clear_invalid: Option<bool>,
}

impl ClearSessionsRequest {
    fn options(&self) -> ClearOptions {
        let defaults = ClearOptions::default();
        ClearOptions {
            clear_empty: self.clear_empty.unwrap_or(defaults.clear_empty),
            clear_invalid: self.clear_invalid.unwrap_or(defaults.clear_invalid),
        }
    }
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl SessionManagerService {
    #[tool(description = "List all Claude Code projects with session counts")]
    pub async fn list_projects(
        &self,
        Parameters(_request): Parameters<ListProjectsRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&list_projects(&self.config))
    }

    #[tool(description = "List all sessions in a project")]
    pub async fn list_sessions(
        &self,
        Parameters(request): Parameters<ListSessionsRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&list_sessions(&self.config, &request.project_name))
    }

    #[tool(description = "Rename a session by adding a title prefix to the first message")]
    pub async fn rename_session(
        &self,
        Parameters(request): Parameters<RenameSessionRequest>,
    ) -> Result<CallToolResult, McpError> {
        let success = match rename_session(
            &self.config,
            &request.project_name,
            &request.session_id,
            &request.new_title,
        ) {
            Ok(()) => true,
            Err(error) => {
                log::warn!("rename_session failed: {error}");
                false
            }
        };
        json_result(&OperationResult::new(
            success,
            "Session renamed",
            "Failed to rename session",
        ))
    }

    #[tool(description = "Delete a session (moves to .bak folder for recovery)")]
    pub async fn delete_session(
        &self,
        Parameters(request): Parameters<DeleteSessionRequest>,
    ) -> Result<CallToolResult, McpError> {
        let success = match delete_session(&self.config, &request.project_name, &request.session_id)
        {
            Ok(deleted) => deleted,
            Err(error) => {
                log::warn!("delete_session failed: {error}");
                false
            }
        };
        json_result(&OperationResult::new(
            success,
            "Session deleted (backed up to .bak)",
            "Failed to delete session",
        ))
    }

    #[tool(
        description = "Preview sessions that would be cleaned (empty and invalid API key sessions)"
    )]
    pub async fn preview_cleanup(
        &self,
        Parameters(request): Parameters<PreviewCleanupRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&find_cleanable_sessions(
            &self.config,
            request.project_name.as_deref(),
        ))
    }

    #[tool(description = "Delete all empty sessions and invalid API key sessions")]
    pub async fn clear_sessions(
        &self,
        Parameters(request): Parameters<ClearSessionsRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&clear_sessions(
            &self.config,
            request.project_name.as_deref(),
            request.options(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime")
            .block_on(future)
    }

    fn result_text(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.clone()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn tools_report_outcomes_as_json_payloads() {
        let dir = tempdir().expect("tempdir");
        let project = dir.path().join("-p");
        fs::create_dir_all(&project).expect("mkdir");
        fs::write(
            project.join("s1.jsonl"),
            "{\"type\":\"user\",\"message\":{\"content\":\"안녕\"}}\n",
        )
        .expect("write");
        let service = SessionManagerService::new(ManagerConfig::new(dir.path()));

        let renamed = block_on(service.rename_session(Parameters(RenameSessionRequest {
            project_name: "-p".to_string(),
            session_id: "s1".to_string(),
            new_title: "제목".to_string(),
        })))
        .expect("tool");
        let payload: serde_json::Value =
            serde_json::from_str(&result_text(&renamed)).expect("json");
        assert_eq!(payload["success"], true);
        assert_eq!(payload["message"], "Session renamed");

        let listed = block_on(service.list_sessions(Parameters(ListSessionsRequest {
            project_name: "-p".to_string(),
        })))
        .expect("tool");
        let text = result_text(&listed);
        assert!(text.contains("\"title\": \"제목\""));

        let deleted = block_on(service.delete_session(Parameters(DeleteSessionRequest {
            project_name: "-p".to_string(),
            session_id: "missing".to_string(),
        })))
        .expect("tool");
        let payload: serde_json::Value =
            serde_json::from_str(&result_text(&deleted)).expect("json");
        assert_eq!(payload["success"], false);
        assert_eq!(payload["message"], "Failed to delete session");
    }

    #[test]
    fn clear_request_defaults_both_buckets_on() {
        let request: ClearSessionsRequest = serde_json::from_str("{}").expect("parse");
        assert_eq!(request.options(), ClearOptions::default());

        let request: ClearSessionsRequest =
            serde_json::from_str(r#"{"clear_empty":false}"#).expect("parse");
        assert_eq!(
            request.options(),
            ClearOptions {
                clear_empty: false,
                clear_invalid: true
            }
        );
    }

    #[test]
    fn missing_string_arguments_default_to_empty() {
        let request: RenameSessionRequest = serde_json::from_str("{}").expect("parse");
        assert_eq!(request.project_name, "");
        assert_eq!(request.session_id, "");
        assert_eq!(request.new_title, "");
    }

    #[test]
    fn operation_result_picks_message_by_outcome() {
        let ok = OperationResult::new(true, "Session renamed", "Failed to rename session");
        let failed = OperationResult::new(false, "Session renamed", "Failed to rename session");
        assert_eq!(ok.message, "Session renamed");
        assert_eq!(failed.message, "Failed to rename session");
        let json = serde_json::to_string(&failed).expect("encode");
        assert_eq!(json, r#"{"success":false,"message":"Failed to rename session"}"#);
    }
}
