use anyhow::{Context, Result};
use axum::{Router, routing};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::pipeline::SearchPipeline;

pub mod api;

pub use api::{ApiError, SearchRequest};

pub fn router(pipeline: Arc<SearchPipeline>) -> Router {
    Router::new()
        .route("/", routing::get(index))
        .route("/api/produtos", routing::post(api::search))
        .with_state(pipeline)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn index() -> &'static str {
    "catalog-pipeline"
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> axum::response::Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unexpected panic while handling request".to_string()
    };

    axum::response::IntoResponse::into_response(ApiError::Internal(message))
}

pub async fn serve(pipeline: SearchPipeline, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    info!("🚀 Listening on {}", bind);
    axum::serve(listener, router(Arc::new(pipeline))).await?;

    Ok(())
}
