// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit event records.
//!
//! - [`NewAuditEvent`]: what a client submits; has no `id` or `created_at`
//! - [`AuditEvent`]: a persisted record; `id` and `created_at` always present
//!
//! Wire names follow the public JSON contract (`op`, `req_id`, `res`), so the
//! Rust field names and the serialized names differ for those three fields.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form structured document attached to an event.
pub type Document = Map<String, Value>;

/// An audit event as submitted by a client, before validation and storage.
///
/// `user` and `op` default to empty strings when missing so that a missing
/// field surfaces as a validation error rather than a JSON parse error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEvent {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timestamp: Option<DateTime<Utc>>,
	#[serde(default)]
	pub user: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub component: Option<String>,
	#[serde(rename = "op", default)]
	pub operation: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<i64>,
	#[serde(rename = "req_id", default, skip_serializing_if = "Option::is_none")]
	pub request_id: Option<i64>,
	#[serde(rename = "res", default, skip_serializing_if = "Option::is_none")]
	pub response: Option<Document>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub attributes: Option<Document>,
}

impl NewAuditEvent {
	pub fn new(user: impl Into<String>, operation: impl Into<String>) -> Self {
		Self {
			user: user.into(),
			operation: operation.into(),
			..Default::default()
		}
	}

	pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
		self.timestamp = Some(timestamp);
		self
	}

	pub fn with_component(mut self, component: impl Into<String>) -> Self {
		self.component = Some(component.into());
		self
	}

	pub fn with_session_id(mut self, session_id: i64) -> Self {
		self.session_id = Some(session_id);
		self
	}

	pub fn with_request_id(mut self, request_id: i64) -> Self {
		self.request_id = Some(request_id);
		self
	}

	pub fn with_response(mut self, response: Document) -> Self {
		self.response = Some(response);
		self
	}

	/// Set a single attribute, creating the document if needed.
	pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self
			.attributes
			.get_or_insert_with(Map::new)
			.insert(key.into(), value.into());
		self
	}
}

/// A persisted audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
	pub id: i64,
	pub timestamp: DateTime<Utc>,
	pub user: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub component: Option<String>,
	#[serde(rename = "op")]
	pub operation: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<i64>,
	#[serde(rename = "req_id", default, skip_serializing_if = "Option::is_none")]
	pub request_id: Option<i64>,
	#[serde(rename = "res", default, skip_serializing_if = "Option::is_none")]
	pub response: Option<Document>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub attributes: Option<Document>,
	pub created_at: DateTime<Utc>,
}

/// Truncate to the microsecond precision the store keeps.
pub fn normalize_timestamp(ts: DateTime<Utc>) -> DateTime<Utc> {
	ts.trunc_subsecs(6)
}

/// Fixed-width RFC 3339 rendering used for storage and bound parameters.
///
/// Always UTC with six fractional digits, so string order equals time order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
	ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
