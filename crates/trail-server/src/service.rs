// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit event service: validation, query compilation and storage, with a
//! deadline on every store call.

use std::sync::Arc;
use std::time::Duration;

use trail_common_audit::{
	build_query, validate_event, validate_filter, AuditEvent, EventFilter, NewAuditEvent,
	QueryParams,
};
use trail_server_db::{Deadline, EventStore};

use crate::error::ServerError;
use crate::metrics::ServerMetrics;

pub struct AuditService {
	store: Arc<dyn EventStore>,
	metrics: Arc<ServerMetrics>,
	query_timeout: Duration,
}

impl AuditService {
	pub fn new(
		store: Arc<dyn EventStore>,
		metrics: Arc<ServerMetrics>,
		query_timeout: Duration,
	) -> Self {
		Self {
			store,
			metrics,
			query_timeout,
		}
	}

	fn deadline(&self) -> Deadline {
		Deadline::after(self.query_timeout)
	}

	/// Validate and persist a new event.
	#[tracing::instrument(skip(self, event), fields(user = %event.user, op = %event.operation))]
	pub async fn store_event(&self, event: NewAuditEvent) -> Result<AuditEvent, ServerError> {
		let validated = validate_event(event)?;
		let stored = self.store.write(validated, &self.deadline()).await?;
		self.metrics.record_written();
		tracing::info!(id = stored.id, "audit event recorded");
		Ok(stored)
	}

	/// Parse, validate and run a filter given as query parameters.
	#[tracing::instrument(skip(self, params), fields(params = params.len()))]
	pub async fn find_events(&self, params: &QueryParams) -> Result<Vec<AuditEvent>, ServerError> {
		let filter = validate_filter(EventFilter::from_params(params))?;
		let predicates = build_query(&filter)?;
		let events = self.store.query(&predicates, &self.deadline()).await?;
		self.metrics.record_returned(events.len());
		Ok(events)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use std::sync::Mutex;
	use trail_common_audit::{params_from_pairs, PredicateSet, ValidatedEvent, ValidationError};
	use trail_server_db::DbError;

	#[derive(Default)]
	struct RecordingStore {
		written: Mutex<Vec<AuditEvent>>,
		queries: Mutex<Vec<String>>,
	}

	#[async_trait]
	impl EventStore for RecordingStore {
		async fn write(
			&self,
			event: ValidatedEvent,
			_deadline: &Deadline,
		) -> trail_server_db::Result<AuditEvent> {
			let mut written = self.written.lock().unwrap();
			let id = written.len() as i64 + 1;
			let stored = event.into_stored(id, chrono::Utc::now());
			written.push(stored.clone());
			Ok(stored)
		}

		async fn query(
			&self,
			predicates: &PredicateSet,
			_deadline: &Deadline,
		) -> trail_server_db::Result<Vec<AuditEvent>> {
			self.queries.lock().unwrap().push(predicates.to_sql());
			Ok(self.written.lock().unwrap().clone())
		}

		async fn ping(&self, _deadline: &Deadline) -> trail_server_db::Result<()> {
			Err(DbError::Timeout)
		}
	}

	fn service(store: Arc<RecordingStore>) -> (AuditService, Arc<ServerMetrics>) {
		let metrics = Arc::new(ServerMetrics::new().unwrap());
		let service = AuditService::new(store, Arc::clone(&metrics), Duration::from_secs(5));
		(service, metrics)
	}

	#[tokio::test]
	async fn test_store_event_validates_before_writing() {
		let store = Arc::new(RecordingStore::default());
		let (service, _metrics) = service(Arc::clone(&store));

		let err = service
			.store_event(NewAuditEvent::new("", "login"))
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			ServerError::Validation(ValidationError::UserRequired)
		));
		assert!(store.written.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_store_event_defaults_timestamp() {
		let store = Arc::new(RecordingStore::default());
		let (service, _metrics) = service(Arc::clone(&store));

		let before = chrono::Utc::now() - chrono::Duration::seconds(1);
		let stored = service
			.store_event(NewAuditEvent::new("alice", "login"))
			.await
			.unwrap();
		assert_eq!(stored.id, 1);
		assert!(stored.timestamp >= before);
	}

	#[tokio::test]
	async fn test_find_events_rejects_before_querying() {
		let store = Arc::new(RecordingStore::default());
		let (service, _metrics) = service(Arc::clone(&store));

		let params = params_from_pairs([
			("ev_ts_start", "2024-02-01T00:00:00Z"),
			("ev_ts_end", "2024-01-01T00:00:00Z"),
		]);
		let err = service.find_events(&params).await.unwrap_err();
		assert!(matches!(
			err,
			ServerError::Validation(ValidationError::RangeInverted)
		));
		assert!(store.queries.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_find_events_compiles_filter() {
		let store = Arc::new(RecordingStore::default());
		let (service, _metrics) = service(Arc::clone(&store));
		service
			.store_event(NewAuditEvent::new("alice", "login"))
			.await
			.unwrap();

		let params = params_from_pairs([("ev_user", "alice"), ("attr_ip", "10.0.0.1")]);
		let events = service.find_events(&params).await.unwrap();
		assert_eq!(events.len(), 1);

		let queries = store.queries.lock().unwrap();
		assert_eq!(queries.len(), 1);
		assert!(queries[0].contains("user_id IN"));
		assert!(queries[0].contains("json_extract"));
	}
}
