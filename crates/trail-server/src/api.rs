// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router construction.

use std::sync::Arc;

use axum::{
	middleware::from_fn_with_state,
	routing::{get, post},
	Router,
};
use trail_server_config::ServerConfig;
use trail_server_db::EventStore;

use crate::error::ServerError;
use crate::metrics::ServerMetrics;
use crate::middleware::track_requests;
use crate::routes;
use crate::service::AuditService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<AuditService>,
	pub store: Arc<dyn EventStore>,
	pub metrics: Arc<ServerMetrics>,
}

/// Build the shared state from a store and the resolved configuration.
///
/// # Errors
/// Returns `ServerError::Internal` if the metrics registry cannot be built.
pub fn create_app_state(
	store: Arc<dyn EventStore>,
	config: &ServerConfig,
) -> Result<AppState, ServerError> {
	let metrics = Arc::new(ServerMetrics::new()?);
	let service = Arc::new(AuditService::new(
		Arc::clone(&store),
		Arc::clone(&metrics),
		config.query.timeout(),
	));

	Ok(AppState {
		service,
		store,
		metrics,
	})
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/audit/events", post(routes::events::store_event))
		.route("/audit/events/", post(routes::events::store_event))
		.route("/audit/events/query", get(routes::events::find_events))
		.route("/health", get(routes::health::health_check))
		.route("/stats", get(routes::health::stats))
		.route("/metrics", get(routes::health::prometheus_metrics))
		.layer(from_fn_with_state(state.clone(), track_requests))
		.with_state(state)
}
