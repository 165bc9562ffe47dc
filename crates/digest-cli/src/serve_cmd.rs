//! `digestd serve`: the HTTP Status/Control API of spec section 4.5/6.
//!
//! `GET /status?date=`, `POST /retry?date=`, `POST /force-publish?date=`,
//! `POST /trigger` all call straight through to `digest_core::control`, the
//! same functions the CLI subcommands use -- neither surface holds logic
//! of its own beyond argument parsing and response formatting.
//!
//! In addition to the request-driven surface, `serve` runs a background
//! task that calls the Driver every `cron_interval_minutes`, standing in
//! for the periodic external scheduler this system assumes in production
//! (see spec section 5, "Scheduling model").

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use digest_core::control;
use digest_core::handlers::HandlerContext;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Query params
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

fn resolve_date(q: DateQuery) -> NaiveDate {
    q.date.unwrap_or_else(digest_core::driver::today)
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(ctx: Arc<HandlerContext>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/retry", post(retry_failed))
        .route("/force-publish", post(force_publish))
        .route("/trigger", post(trigger))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

async fn get_status(
    State(ctx): State<Arc<HandlerContext>>,
    Query(q): Query<DateQuery>,
) -> Result<impl IntoResponse, AppError> {
    let date = resolve_date(q);
    let progress = control::get_status(&ctx, date).await.map_err(AppError::internal)?;
    match progress {
        Some(progress) => Ok((StatusCode::OK, Json(serde_json::json!(progress)))),
        None => Err(AppError::bad_request(format!("no task exists for {date}"))),
    }
}

async fn retry_failed(
    State(ctx): State<Arc<HandlerContext>>,
    Query(q): Query<DateQuery>,
) -> Result<impl IntoResponse, AppError> {
    let date = resolve_date(q);
    let outcome = control::retry_failed(&ctx, date).await.map_err(AppError::internal)?;
    Ok((StatusCode::OK, Json(serde_json::json!(outcome))))
}

async fn force_publish(
    State(ctx): State<Arc<HandlerContext>>,
    Query(q): Query<DateQuery>,
) -> Result<impl IntoResponse, AppError> {
    let date = resolve_date(q);
    control::force_publish(&ctx, date).await.map_err(|e| {
        AppError::bad_request(format!("force-publish precondition failed: {e:#}"))
    })?;
    Ok((StatusCode::OK, Json(serde_json::json!({ "task_date": date, "published": true }))))
}

async fn trigger(
    State(ctx): State<Arc<HandlerContext>>,
    Query(q): Query<DateQuery>,
) -> Result<impl IntoResponse, AppError> {
    let date = resolve_date(q);
    let outcome = control::trigger(&ctx, date).await.map_err(AppError::internal)?;
    Ok((StatusCode::OK, Json(serde_json::json!({
        "task_date": outcome.task_date,
        "phase_before": outcome.phase_before,
        "phase_after": outcome.phase_after,
        "error": outcome.error,
    }))))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run the HTTP Control API, plus a background task driving `today`'s
/// Driver tick every `cron_interval_minutes` until the process is
/// interrupted.
pub async fn run_serve(ctx: HandlerContext, bind: &str, port: u16, cron_interval_minutes: u32) -> Result<()> {
    let ctx = Arc::new(ctx);
    let app = build_router(ctx.clone());

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "digestd HTTP control API listening");

    let shutdown = CancellationToken::new();
    let scheduler = tokio::spawn(run_scheduler(ctx, cron_interval_minutes, shutdown.clone()));

    let shutdown_signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown_signal.cancel();
        })
        .await?;

    shutdown.cancel();
    let _ = scheduler.await;
    Ok(())
}

async fn run_scheduler(ctx: Arc<HandlerContext>, cron_interval_minutes: u32, shutdown: CancellationToken) {
    let interval = Duration::from_secs(u64::from(cron_interval_minutes) * 60);
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let today = digest_core::driver::today();
                if let Err(e) = control::trigger(&ctx, today).await {
                    warn!(error = %e, "scheduled tick failed");
                }
            }
            _ = shutdown.cancelled() => {
                info!("scheduler stopped");
                return;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    use digest_core::budget::{BudgetConfig, BudgetGuard};
    use digest_core::collaborators::{HttpArticleFetcher, HttpLlmClient, HttpNewsSource, NoopContentFilter, PublisherSet};
    use digest_core::handlers::{HandlerConfig, HandlerContext};
    use digest_db::queries::tasks;
    use digest_test_utils::{create_test_db, drop_test_db};
    use tower::ServiceExt;

    use super::*;

    fn build_test_context(pool: sqlx::PgPool) -> Arc<HandlerContext> {
        let llm = Arc::new(HttpLlmClient::new(
            "https://llm.example.com/v1/chat/completions".to_owned(),
            "sk-test".to_owned(),
            "gpt-4o-mini".to_owned(),
        ));
        Arc::new(HandlerContext {
            pool,
            news_source: Arc::new(HttpNewsSource::new("https://hacker-news.firebaseio.com/v0".to_owned())),
            article_fetcher: Arc::new(HttpArticleFetcher::new("https://fetcher.example.com/fetch".to_owned())),
            translator: llm.clone(),
            summarizer: llm,
            content_filter: Arc::new(NoopContentFilter),
            publishers: PublisherSet::new(),
            budget: BudgetGuard::new(BudgetConfig::default()),
            config: HandlerConfig::default(),
        })
    }

    async fn send_request(ctx: Arc<HandlerContext>, method: &str, uri: &str) -> axum::response::Response {
        let app = build_router(ctx);
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn status_returns_400_when_no_task_exists() {
        let (pool, db_name) = create_test_db().await;
        let ctx = build_test_context(pool.clone());

        let resp = send_request(ctx, "GET", "/status?date=2025-06-01").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn status_returns_200_for_an_existing_task() {
        let (pool, db_name) = create_test_db().await;
        let date = chrono::NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        tasks::get_or_create_task(&pool, date).await.unwrap();

        let ctx = build_test_context(pool.clone());
        let resp = send_request(ctx, "GET", "/status?date=2025-06-02").await;
        assert_eq!(resp.status(), StatusCode::OK);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn retry_reports_zero_requeued_when_nothing_failed() {
        let (pool, db_name) = create_test_db().await;
        let date = chrono::NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
        tasks::get_or_create_task(&pool, date).await.unwrap();

        let ctx = build_test_context(pool.clone());
        let resp = send_request(ctx, "POST", "/retry?date=2025-06-03").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), 65_536).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["requeued"], 0);

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
