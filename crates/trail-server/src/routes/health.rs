// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health, stats and metrics HTTP handlers.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trail_server_db::Deadline;

use crate::{api::AppState, error::ServerError, version};

const HEALTH_PING_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
	pub version: String,
	pub uptime: String,
	pub uptime_secs: u64,
	pub total_requests: u64,
	pub total_errors: u64,
	pub db_connected: bool,
	pub timestamp: DateTime<Utc>,
}

/// GET /health - Live database probe.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	match state.store.ping(&Deadline::after(HEALTH_PING_TIMEOUT)).await {
		Ok(()) => {
			state.metrics.set_db_up(true);
			(
				StatusCode::OK,
				Json(HealthResponse {
					status: "healthy".to_string(),
					error: None,
				}),
			)
		}
		Err(e) => {
			tracing::warn!(error = %e, "health check failed");
			state.metrics.set_db_up(false);
			(
				StatusCode::SERVICE_UNAVAILABLE,
				Json(HealthResponse {
					status: "unhealthy".to_string(),
					error: Some("database unavailable".to_string()),
				}),
			)
		}
	}
}

/// GET /stats - Process counters and the last known database state.
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
	let uptime = Duration::from_secs(state.metrics.uptime().as_secs());
	Json(StatsResponse {
		version: version::VERSION.to_string(),
		uptime: humantime::format_duration(uptime).to_string(),
		uptime_secs: uptime.as_secs(),
		total_requests: state.metrics.total_requests(),
		total_errors: state.metrics.total_errors(),
		db_connected: state.metrics.db_up(),
		timestamp: Utc::now(),
	})
}

/// GET /metrics - Prometheus metrics export endpoint.
pub async fn prometheus_metrics(
	State(state): State<AppState>,
) -> Result<impl IntoResponse, ServerError> {
	let metrics = state.metrics.gather()?;
	Ok((
		StatusCode::OK,
		[(
			axum::http::header::CONTENT_TYPE,
			"text/plain; version=0.0.4; charset=utf-8",
		)],
		metrics,
	))
}
