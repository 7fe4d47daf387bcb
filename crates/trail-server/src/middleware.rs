// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{
	extract::{Request, State},
	middleware::Next,
	response::Response,
};

use crate::api::AppState;

/// Count every request by method and final status.
pub async fn track_requests(
	State(state): State<AppState>,
	request: Request,
	next: Next,
) -> Response {
	let method = request.method().clone();
	let response = next.run(request).await;
	state
		.metrics
		.record_request(method.as_str(), response.status().as_u16());
	response
}
