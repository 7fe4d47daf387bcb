// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit event persistence.
//!
//! Events are written once and never modified. Reads execute a compiled
//! [`PredicateSet`] and stream the matching rows; a row that fails to decode
//! fails the whole query rather than being skipped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use trail_common_audit::event::normalize_timestamp;
use trail_common_audit::{format_timestamp, AuditEvent, Document, PredicateSet, ValidatedEvent};

use crate::deadline::Deadline;
use crate::error::{DbError, Result};

#[async_trait]
pub trait EventStore: Send + Sync {
	async fn write(&self, event: ValidatedEvent, deadline: &Deadline) -> Result<AuditEvent>;
	async fn query(&self, predicates: &PredicateSet, deadline: &Deadline)
		-> Result<Vec<AuditEvent>>;
	async fn ping(&self, deadline: &Deadline) -> Result<()>;
}

#[derive(Clone)]
pub struct EventRepository {
	pool: SqlitePool,
}

impl EventRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	/// Insert an event and return it with its generated `id` and `created_at`.
	///
	/// The insert runs in its own transaction under `deadline`; the commit
	/// happens only once the insert finished in time. An insert abandoned by
	/// the deadline is rolled back when its transaction drops, so a reported
	/// failure never leaves a row behind.
	///
	/// # Errors
	/// Returns `DbError::Timeout`/`DbError::Cancelled` when the deadline
	/// fires, `DbError::Sqlx` on any storage failure.
	#[tracing::instrument(
		skip(self, event, deadline),
		fields(user = %event.event().user, op = %event.event().operation)
	)]
	pub async fn write(&self, event: ValidatedEvent, deadline: &Deadline) -> Result<AuditEvent> {
		let created_at = normalize_timestamp(Utc::now());
		let new = event.event();

		let (tx, id) = deadline
			.run(async {
				let mut tx = self.pool.begin().await?;
				let id: i64 = sqlx::query_scalar(
					r#"
					INSERT INTO audit_events (
						timestamp, user_id, component, operation, session_id,
						request_id, response, attributes, created_at
					)
					VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
					RETURNING id
					"#,
				)
				.bind(format_timestamp(&event.timestamp()))
				.bind(new.user.as_str())
				.bind(new.component.as_deref())
				.bind(new.operation.as_str())
				.bind(new.session_id)
				.bind(new.request_id)
				.bind(new.response.as_ref().map(encode_document))
				.bind(new.attributes.as_ref().map(encode_document))
				.bind(format_timestamp(&created_at))
				.fetch_one(&mut *tx)
				.await?;
				Ok::<_, DbError>((tx, id))
			})
			.await?;

		// Not raced against the deadline: an abandoned COMMIT could still land.
		tx.commit().await?;

		tracing::debug!(id, "audit event stored");
		Ok(event.into_stored(id, created_at))
	}

	/// Run a compiled query. No match yields an empty list.
	#[tracing::instrument(skip(self, predicates, deadline), fields(predicates = predicates.len()))]
	pub async fn query(
		&self,
		predicates: &PredicateSet,
		deadline: &Deadline,
	) -> Result<Vec<AuditEvent>> {
		let sql = predicates.to_sql();
		let arguments = predicates.arguments();

		let events = deadline
			.run(async {
				let mut query = sqlx::query(&sql);
				for argument in &arguments {
					query = query.bind(argument.as_str());
				}

				let mut rows = query.fetch(&self.pool);
				let mut events = Vec::new();
				while let Some(row) = rows.try_next().await? {
					events.push(decode_row(&row)?);
				}
				Ok::<_, DbError>(events)
			})
			.await?;

		tracing::debug!(count = events.len(), "audit events fetched");
		Ok(events)
	}

	#[tracing::instrument(skip(self, deadline))]
	pub async fn ping(&self, deadline: &Deadline) -> Result<()> {
		deadline
			.run(async {
				sqlx::query("SELECT 1").execute(&self.pool).await?;
				Ok::<_, DbError>(())
			})
			.await
	}
}

#[async_trait]
impl EventStore for EventRepository {
	async fn write(&self, event: ValidatedEvent, deadline: &Deadline) -> Result<AuditEvent> {
		self.write(event, deadline).await
	}

	async fn query(
		&self,
		predicates: &PredicateSet,
		deadline: &Deadline,
	) -> Result<Vec<AuditEvent>> {
		self.query(predicates, deadline).await
	}

	async fn ping(&self, deadline: &Deadline) -> Result<()> {
		self.ping(deadline).await
	}
}

fn encode_document(document: &Document) -> String {
	serde_json::Value::Object(document.clone()).to_string()
}

fn decode_row(row: &SqliteRow) -> Result<AuditEvent> {
	let id: i64 = row.try_get("id")?;
	let timestamp: String = row.try_get("timestamp")?;
	let created_at: String = row.try_get("created_at")?;
	let response: Option<String> = row.try_get("response")?;
	let attributes: Option<String> = row.try_get("attributes")?;

	Ok(AuditEvent {
		id,
		timestamp: decode_timestamp(id, "timestamp", &timestamp)?,
		user: row.try_get("user_id")?,
		component: row.try_get("component")?,
		operation: row.try_get("operation")?,
		session_id: row.try_get("session_id")?,
		request_id: row.try_get("request_id")?,
		response: decode_document(id, "response", response)?,
		attributes: decode_document(id, "attributes", attributes)?,
		created_at: decode_timestamp(id, "created_at", &created_at)?,
	})
}

fn decode_timestamp(id: i64, column: &str, value: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|ts| ts.with_timezone(&Utc))
		.map_err(|e| DbError::Decode(format!("event {id}: {column} {value:?}: {e}")))
}

fn decode_document(id: i64, column: &str, value: Option<String>) -> Result<Option<Document>> {
	value
		.map(|text| {
			serde_json::from_str::<Document>(&text)
				.map_err(|e| DbError::Decode(format!("event {id}: {column}: {e}")))
		})
		.transpose()
}
