use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::recorder::tail_lines;

pub const DEFAULT_PORT: u16 = 8080;
pub const TAIL_LINES: usize = 20;

/// Files exposed read-only over HTTP.
#[derive(Debug, Clone)]
pub struct ApiState {
    pub log_path: PathBuf,
    pub metrics_path: PathBuf,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Read { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(error = %self, "exposition request failed");
        (status, self.to_string()).into_response()
    }
}

async fn tail(path: &Path) -> Result<String, ApiError> {
    let lines = tail_lines(path, TAIL_LINES).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ApiError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ApiError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let mut body = String::new();
    for line in lines {
        body.push_str(&line);
        body.push('\n');
    }
    Ok(body)
}

pub async fn get_logs(State(state): State<Arc<ApiState>>) -> Result<String, ApiError> {
    tail(&state.log_path).await
}

pub async fn get_metrics(State(state): State<Arc<ApiState>>) -> Result<String, ApiError> {
    tail(&state.metrics_path).await
}

pub fn create_router(state: Arc<ApiState>, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/logs", get(get_logs))
        .route("/metrics", get(get_metrics))
        .fallback_service(ServeDir::new(static_dir.as_ref()))
        .with_state(state)
}

pub async fn bind(port: u16) -> std::io::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Logs: http://localhost:{}/logs", port);
    info!("Metrics: http://localhost:{}/metrics", port);
    Ok(listener)
}

pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    axum::serve(listener, app).await
}
