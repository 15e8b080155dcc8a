use crate::{
    config::Config,
    errors::AppError,
    files::FileGateway,
    sandbox::ConfinedRoot,
    security::{self, Authorizer},
    terminal::bridge::terminal_ws,
};
use axum::{
    extract::{DefaultBodyLimit, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub root: ConfinedRoot,
    pub files: Arc<FileGateway>,
    pub authorizer: Arc<Authorizer>,
    pub started: Instant,
}

impl AppState {
    pub fn new(cfg: Config, root: ConfinedRoot) -> Self {
        let authorizer = Authorizer::from_config(&cfg.auth);
        let files = FileGateway::new(root.clone());
        Self {
            cfg: Arc::new(cfg),
            root,
            files: Arc::new(files),
            authorizer: Arc::new(authorizer),
            started: Instant::now(),
        }
    }
}

pub async fn serve(cfg: Config, root: ConfinedRoot) -> anyhow::Result<()> {
    let addr: std::net::SocketAddr =
        format!("{}:{}", cfg.server.bind_addr, cfg.server.port).parse()?;
    let app = build_router(AppState::new(cfg, root));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let limit_bytes = state.cfg.limits.max_request_kb * 1024;
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/files",
            get(read_file).post(write_file).delete(delete_file),
        )
        .route("/api/dir", get(list_dir))
        .route("/ws/terminal", get(terminal_ws))
        .layer(DefaultBodyLimit::max(limit_bytes))
        .layer(RequestBodyLimitLayer::new(limit_bytes))
        .layer(security::cors_layer(&state.cfg.auth.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "uptime": state.started.elapsed().as_secs(),
        "platform": std::env::consts::OS,
        "workdir": state.root.path(),
    }))
}

#[derive(Deserialize)]
struct PathQuery {
    path: String,
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default = "default_list_path")]
    path: String,
}

fn default_list_path() -> String {
    ".".to_string()
}

#[derive(Deserialize)]
struct WriteRequest {
    path: String,
    content: String,
}

async fn read_file(
    State(state): State<AppState>,
    Query(q): Query<PathQuery>,
) -> Result<impl IntoResponse, AppError> {
    let content = state.files.read(&q.path).await?;
    Ok(Json(json!({"path": q.path, "content": content})))
}

async fn write_file(
    State(state): State<AppState>,
    Json(req): Json<WriteRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.files.write(&req.path, &req.content).await?;
    Ok(Json(json!({"success": true})))
}

async fn delete_file(
    State(state): State<AppState>,
    Query(q): Query<PathQuery>,
) -> Result<impl IntoResponse, AppError> {
    state.files.delete(&q.path).await?;
    Ok(Json(json!({"success": true})))
}

async fn list_dir(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let entries = state.files.list(&q.path).await?;
    Ok(Json(json!({"path": q.path, "entries": entries})))
}
