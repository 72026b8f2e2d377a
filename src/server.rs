//! Local HTTP transport for dashboards and signal producers.
//!
//! Read routes serve the published snapshot and on-demand views; write
//! routes forward to the agent's control operations. Pose models and key
//! hooks running in other processes push their signals through `/ingest`.
//!
//! ```text
//! dashboard ──▶ GET /status ──▶ StateStore::snapshot
//! pose model ─▶ POST /ingest/frame ─▶ frame channel ─▶ pose loop
//! ```

use crate::activity::ActivityStats;
use crate::agent::AgentHandle;
use crate::collector::KeyPressEvent;
use crate::core::breaks::{BreakRecord, BreakStatistics};
use crate::core::landmarks::{Keypoint, LandmarkFrame};
use crate::core::stress::StressEvent;
use crate::core::{Insights, StateSnapshot};
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
}

impl ServerConfig {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub instance_id: String,
    pub components: ComponentHealth,
}

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub posture: bool,
    pub typing: bool,
    pub breaks: bool,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub breaks: Vec<BreakRecord>,
    pub statistics: BreakStatistics,
    pub stress: Vec<StressEvent>,
}

/// Acknowledgement for control routes
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    fn ok(message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_string(),
        })
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct IntervalRequest {
    pub minutes: i64,
}

#[derive(Debug, Deserialize)]
pub struct KeyRequest {
    #[serde(default)]
    pub backspace: bool,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A pose frame as named landmarks or as the raw 33-point BlazePose list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FrameRequest {
    Landmarks(Vec<Keypoint>),
    Named(LandmarkFrame),
}

impl From<FrameRequest> for LandmarkFrame {
    fn from(req: FrameRequest) -> Self {
        match req {
            FrameRequest::Landmarks(points) => LandmarkFrame::from_mediapipe(&points),
            FrameRequest::Named(frame) => frame,
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            code: code.to_string(),
        }),
    )
}

/// GET /status
async fn status(State(agent): State<AgentHandle>) -> Json<StateSnapshot> {
    Json(agent.store().snapshot().as_ref().clone())
}

/// GET /health
async fn health(State(agent): State<AgentHandle>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: agent.instance_id().to_string(),
        components: ComponentHealth {
            posture: true,
            typing: true,
            breaks: true,
        },
    })
}

/// GET /insights
async fn insights(State(agent): State<AgentHandle>) -> Json<Insights> {
    Json(agent.store().insights())
}

/// GET /history
async fn history(State(agent): State<AgentHandle>) -> Json<HistoryResponse> {
    let store = agent.store();
    Json(HistoryResponse {
        breaks: store.break_history(),
        statistics: store.break_statistics(),
        stress: store.stress_history(),
    })
}

/// GET /activity
async fn activity(State(agent): State<AgentHandle>) -> Json<ActivityStats> {
    Json(agent.activity().stats())
}

/// POST /break
async fn take_break(State(agent): State<AgentHandle>) -> Json<ActionResponse> {
    agent.record_break();
    ActionResponse::ok("Break recorded")
}

/// POST /reset
async fn reset(State(agent): State<AgentHandle>) -> Json<ActionResponse> {
    agent.reset_statistics();
    ActionResponse::ok("Stats reset")
}

/// POST /interval
async fn set_interval(
    State(agent): State<AgentHandle>,
    Json(req): Json<IntervalRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    agent
        .set_break_interval(req.minutes)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "INVALID_INTERVAL", e))?;
    Ok(ActionResponse::ok("Break interval updated"))
}

/// POST /calibration/reset
async fn reset_calibration(State(agent): State<AgentHandle>) -> Json<ActionResponse> {
    agent.reset_calibration();
    ActionResponse::ok("Calibration reset")
}

/// POST /typing/reset
async fn reset_typing(State(agent): State<AgentHandle>) -> Json<ActionResponse> {
    agent.reset_typing();
    ActionResponse::ok("Typing stats reset")
}

/// POST /ingest/frame
async fn ingest_frame(
    State(agent): State<AgentHandle>,
    Json(req): Json<FrameRequest>,
) -> Result<StatusCode, ApiError> {
    if agent.submit_frame(req.into()) {
        Ok(StatusCode::ACCEPTED)
    } else {
        Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "FRAME_QUEUE_FULL",
            "Frame queue is full",
        ))
    }
}

/// POST /ingest/key
async fn ingest_key(
    State(agent): State<AgentHandle>,
    Json(req): Json<KeyRequest>,
) -> Result<StatusCode, ApiError> {
    // Keys stamped in the future are taken as pressed now.
    let now = Utc::now();
    let timestamp = req.timestamp.map_or(now, |t| t.min(now));
    let event = KeyPressEvent::at(req.backspace, timestamp);
    if agent.submit_key(event) {
        Ok(StatusCode::ACCEPTED)
    } else {
        Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "KEY_QUEUE_FULL",
            "Key queue is full",
        ))
    }
}

/// Build the router over an agent handle.
pub fn router(agent: AgentHandle) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/health", get(health))
        .route("/insights", get(insights))
        .route("/history", get(history))
        .route("/activity", get(activity))
        .route("/break", post(take_break))
        .route("/reset", post(reset))
        .route("/interval", post(set_interval))
        .route("/calibration/reset", post(reset_calibration))
        .route("/typing/reset", post(reset_typing))
        .route("/ingest/frame", post(ingest_frame))
        .route("/ingest/key", post(ingest_key))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                    HeaderValue::from_static("http://localhost:3000"),
                    HeaderValue::from_static("http://127.0.0.1:3000"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(agent)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    agent: AgentHandle,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(agent);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("DevCare agent listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
