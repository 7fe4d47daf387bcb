// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	extract::rejection::JsonRejection,
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::{Deserialize, Serialize};
use trail_common_audit::ValidationError;
use trail_server_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	/// Request body was not a JSON event.
	#[error("Invalid JSON: {0}")]
	InvalidJson(String),

	#[error(transparent)]
	Validation(#[from] ValidationError),

	/// Storage failed. Detail is logged, never returned.
	#[error("Storage error: {0}")]
	Storage(#[from] DbError),

	#[error("Internal error: {0}")]
	Internal(String),
}

impl From<JsonRejection> for ServerError {
	fn from(rejection: JsonRejection) -> Self {
		ServerError::InvalidJson(rejection.body_text())
	}
}

impl From<prometheus::Error> for ServerError {
	fn from(e: prometheus::Error) -> Self {
		ServerError::Internal(format!("metrics: {e}"))
	}
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl ServerError {
	pub fn status(&self) -> StatusCode {
		match self {
			ServerError::InvalidJson(_) | ServerError::Validation(_) => StatusCode::BAD_REQUEST,
			ServerError::Storage(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let body = match &self {
			ServerError::InvalidJson(detail) => {
				tracing::debug!(error = %detail, "rejected request body");
				ErrorResponse {
					error: "invalid_json".to_string(),
					message: "Invalid JSON format".to_string(),
				}
			}
			ServerError::Validation(e) => {
				tracing::debug!(code = e.code(), error = %e, "validation failed");
				ErrorResponse {
					error: e.code().to_string(),
					message: e.to_string(),
				}
			}
			ServerError::Storage(e) => {
				tracing::error!(error = %e, "storage error");
				ErrorResponse {
					error: "storage_error".to_string(),
					message: "A storage error occurred".to_string(),
				}
			}
			ServerError::Internal(msg) => {
				tracing::error!(error = %msg, "internal error");
				ErrorResponse {
					error: "internal_error".to_string(),
					message: "An internal error occurred".to_string(),
				}
			}
		};

		(self.status(), Json(body)).into_response()
	}
}
