// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit event HTTP handlers.

use axum::{
	extract::{rejection::JsonRejection, Query, State},
	http::StatusCode,
	Json,
};
use trail_common_audit::{params_from_pairs, AuditEvent, NewAuditEvent};

use crate::{api::AppState, error::ServerError};

/// POST /audit/events - Record one event.
///
/// The body is taken as `Result` so a malformed payload maps to our own
/// `invalid_json` error rather than axum's default rejection.
pub async fn store_event(
	State(state): State<AppState>,
	payload: Result<Json<NewAuditEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<AuditEvent>), ServerError> {
	let Json(event) = payload?;
	let stored = state.service.store_event(event).await?;
	Ok((StatusCode::CREATED, Json(stored)))
}

/// GET /audit/events/query - Filter events, newest first, at most 1000.
pub async fn find_events(
	State(state): State<AppState>,
	Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<AuditEvent>>, ServerError> {
	let params = params_from_pairs(pairs);
	let events = state.service.find_events(&params).await?;
	Ok(Json(events))
}
