//! MCP Server implementation

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use uuid::Uuid;

use logduck_common::{Config, Result};

use crate::{
    prompts, resources,
    state::{AppState, DatabaseSlot},
    tools::{self, McpTool},
};

/// MCP Server
pub struct McpServer {
    state: Arc<AppState>,
}

impl McpServer {
    pub fn new(database: DatabaseSlot, config: Config) -> Self {
        Self {
            state: Arc::new(AppState::new(database, config)),
        }
    }

    pub async fn run(self, addr: SocketAddr) -> anyhow::Result<()> {
        let app = router(self.state);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

/// Build the HTTP router over shared state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ping", get(ping_handler))
        .route("/mcp", post(mcp_handler))
        .route("/tools", get(list_tools_handler))
        .route("/resources", get(list_resources_handler))
        .route("/resources/read", post(read_resource_handler))
        .route("/prompts", get(list_prompts_handler))
        .route("/prompts/get", post(get_prompt_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let probe = state
        .database
        .run(|db| {
            db.execute_query("SELECT 1")?;
            Ok(db.status())
        })
        .await;

    match probe {
        Ok(status) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "healthy", "database": status})),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"status": "unhealthy", "error": e.to_string()})),
        ),
    }
}

async fn ping_handler() -> impl IntoResponse {
    Json(serde_json::json!({"pong": true}))
}

/// List available MCP tools
async fn list_tools_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tools: Vec<&McpTool> = state.tools.list();
    Json(serde_json::json!({
        "tools": tools
    }))
}

/// Main MCP endpoint for tool invocation
async fn mcp_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<McpRequest>,
) -> impl IntoResponse {
    let request_id = Uuid::new_v4();
    info!(%request_id, tool = %request.tool, "MCP tool invocation");

    let result = tools::execute_tool(&state, &request.tool, request.params).await;
    if let Err(e) = &result {
        error!(%request_id, tool = %request.tool, error = %e, "Tool execution failed");
    }
    respond(result)
}

async fn list_resources_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let result = resources::list_resources(&state)
        .await
        .map(|resources| serde_json::json!({ "resources": resources }));
    respond(result)
}

async fn read_resource_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReadResourceRequest>,
) -> impl IntoResponse {
    let result = resources::read_resource(&state, &request.uri).await;
    if let Err(e) = &result {
        error!(uri = %request.uri, error = %e, "Resource read failed");
    }
    respond(result)
}

async fn list_prompts_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "prompts": prompts::list_prompts()
    }))
}

async fn get_prompt_handler(Json(request): Json<GetPromptRequest>) -> impl IntoResponse {
    respond(prompts::get_prompt(&request.name, &request.arguments))
}

/// Failures are reported in the body, not the status code
fn respond(result: Result<serde_json::Value>) -> (StatusCode, Json<McpResponse>) {
    match result {
        Ok(data) => (
            StatusCode::OK,
            Json(McpResponse {
                success: true,
                data: Some(data),
                error: None,
            }),
        ),
        Err(e) => (
            StatusCode::OK,
            Json(McpResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            }),
        ),
    }
}

#[derive(Debug, Deserialize)]
struct McpRequest {
    tool: String,
    #[serde(default)]
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ReadResourceRequest {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct GetPromptRequest {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct McpResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}
