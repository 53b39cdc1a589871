use anyhow::{Context, Result};
use axum::{
    extract::{ConnectInfo, Path, Query, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::export::ExportFormat;
use crate::rate_limit::RateLimiter;

pub const TOO_MANY_REQUESTS: &str = "Too many requests. Please try again later.";
const INTERNAL_ERROR: &str = "Something went wrong. Please try again.";

#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(dashboard: Dashboard, limiter: RateLimiter) -> Self {
        Self {
            dashboard: Arc::new(dashboard),
            limiter: Arc::new(limiter),
        }
    }
}

/// Error body shared by every non-pipeline failure
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!(error = %format!("{:#}", err), "request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: INTERNAL_ERROR.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "status": "error",
            "error": self.message,
        }));
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/:user_id", delete(reset_handler))
        .route("/api/:user_id/checkin", post(checkin_handler))
        .route("/api/:user_id/chat", post(chat_handler))
        .route("/api/:user_id/state", get(state_handler))
        .route("/api/:user_id/history", get(history_handler))
        .route("/api/:user_id/insights", get(insights_handler))
        .route("/api/:user_id/export", get(export_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route("/health", get(health_handler))
        .merge(api)
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([Method::GET, Method::POST, Method::DELETE])
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

pub async fn serve(config: &Config, dashboard: Dashboard) -> Result<()> {
    let limiter = RateLimiter::new(
        config.rate_limit.max_requests,
        Duration::from_secs(config.rate_limit.window_secs),
    )?;
    let state = AppState::new(dashboard, limiter);

    let sweeper = state.limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5 * 60));
        loop {
            interval.tick().await;
            sweeper.retain_recent();
        }
    });

    let app = build_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(%addr, "neurocalm server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}

async fn rate_limit(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let key = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    let decision = state.limiter.check(&key);
    if !decision.allowed {
        warn!(%key, "rate limit exceeded");
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"status": "error", "error": TOO_MANY_REQUESTS})),
        )
            .into_response();
        if let Ok(retry) = HeaderValue::from_str(&decision.reset_in.as_secs().max(1).to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, retry);
        }
        return response;
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    response
}

async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "neurocalm",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn checkin_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Form(fields): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    Json(state.dashboard.check_in(&user_id, &fields).await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatBody {
    #[serde(default)]
    question: String,
    check_in_data: Option<Value>,
    scores: Option<Value>,
}

async fn chat_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<ChatBody>,
) -> ApiResult<impl IntoResponse> {
    let snapshot = match (body.check_in_data, body.scores) {
        (None, None) => None,
        (check_in, scores) => Some((
            check_in.unwrap_or(Value::Null),
            scores.unwrap_or(Value::Null),
        )),
    };

    let outcome = state
        .dashboard
        .chat(&user_id, &body.question, snapshot)
        .await?;
    Ok(Json(outcome))
}

async fn state_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.dashboard.state(&user_id).await?))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    days: Option<usize>,
}

async fn history_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.dashboard.history(&user_id, query.days).await?))
}

async fn insights_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.dashboard.insights(&user_id).await?))
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    format: Option<String>,
}

async fn export_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let format: ExportFormat = query
        .format
        .as_deref()
        .unwrap_or("json")
        .parse()
        .map_err(|e: anyhow::Error| ApiError::bad_request(e.to_string()))?;

    let body = state.dashboard.export(&user_id, format).await?;
    let extension = match format {
        ExportFormat::Json => "json",
        ExportFormat::Csv => "csv",
    };
    let disposition = format!(
        "attachment; filename=\"neurocalm-export-{}.{}\"",
        chrono::Utc::now().format("%Y-%m-%d"),
        extension
    );

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

async fn reset_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let deleted = state.dashboard.reset(&user_id).await?;
    Ok(Json(json!({"status": "success", "deleted": deleted})))
}
