use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::{ConfigError, validate_similarity};
use crate::pipeline::SearchPipeline;
use crate::processor::GroupView;

/// Body of `POST /api/produtos`.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub consulta: Option<String>,
    pub similaridade: Option<f64>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Consulta não fornecida")]
    MissingQuery,
    #[error("{0}")]
    InvalidSimilarity(#[from] ConfigError),
    #[error("{0}")]
    RequestParsing(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingQuery | ApiError::InvalidSimilarity(_) | ApiError::RequestParsing(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("internal error: {}", self);
        } else {
            debug!("rejected request: {}", self);
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub async fn search(
    State(pipeline): State<Arc<SearchPipeline>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<Vec<GroupView>>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::RequestParsing(rejection.body_text()))?;

    let term = request
        .consulta
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .ok_or(ApiError::MissingQuery)?;

    let similarity = request.similaridade.map(validate_similarity).transpose()?;

    let groups = pipeline
        .search(term, similarity)
        .await
        .map_err(|e| ApiError::Internal(format!("{:#}", e)))?;

    Ok(Json(groups))
}
