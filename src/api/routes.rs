use axum::{
    routing::{get, post},
    Router,
    extract::{rejection::JsonRejection, Form, Json, State},
    response::{Html, IntoResponse},
};
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::error::{AppError, Result};
use crate::api::models::{SummarizeRequest, SummarizeResponse};
use crate::api::{page, response};
use crate::pipeline::PipelineReport;
use crate::AppState;

/// Slack on top of the per-stage timeouts before a whole run is abandoned.
const DEADLINE_MARGIN: Duration = Duration::from_secs(10);

pub fn create_router(app_state: AppState) -> Router {
    let api = Router::new()
        .route("/api/summarize", post(summarize_json_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    Router::new()
        .route("/", get(index_handler))
        .route("/summarize", post(summarize_form_handler))
        .route("/health", get(health_handler))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn index_handler() -> Html<String> {
    Html(page::render("", None))
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn summarize_form_handler(
    State(state): State<AppState>,
    Form(req): Form<SummarizeRequest>,
) -> impl IntoResponse {
    let outcome = run_with_deadline(&state, &req.url).await;
    let status = match &outcome {
        Ok(_) => axum::http::StatusCode::OK,
        Err(err) => err.status_code(),
    };

    (status, Html(page::render(req.url.trim(), Some(&outcome))))
}

async fn summarize_json_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SummarizeRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!(status = %rejection.status(), "Rejected JSON body");
            return response::error(&AppError::InvalidInput(rejection.body_text()));
        }
    };

    match run_with_deadline(&state, &req.url).await {
        Ok(report) => response::success(SummarizeResponse::from(report)),
        Err(err) => response::error(&err),
    }
}

/// Runs the pipeline once for a submission, bounded by the sum of the stage timeouts.
async fn run_with_deadline(state: &AppState, url: &str) -> Result<PipelineReport> {
    info!(url = %url.trim(), "Processing submission");
    let start_time = Instant::now();

    let limits = &state.config.limits;
    let deadline = limits
        .fetch_timeout
        .saturating_add(limits.download_timeout)
        .saturating_add(limits.model_timeout)
        .saturating_add(DEADLINE_MARGIN);

    let result = match tokio::time::timeout(deadline, state.pipeline.run(url)).await {
        Ok(result) => result,
        Err(_) => Err(AppError::NetworkError(format!(
            "Request processing timed out after {:?}",
            deadline
        ))),
    };

    let elapsed = start_time.elapsed();
    match &result {
        Ok(report) => info!(url = %report.url, ?elapsed, "Submission succeeded"),
        Err(err @ AppError::ConfigError(_)) => error!(kind = err.kind(), error = %err, ?elapsed, "Submission failed"),
        Err(err) => warn!(kind = err.kind(), error = %err, ?elapsed, "Submission failed"),
    }

    result
}
