// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Prometheus metrics for the audit server.
//!
//! One [`ServerMetrics`] is created per process and shared through
//! [`AppState`](crate::api::AppState); nothing registers into the global
//! default registry.

use std::time::{Duration, Instant};

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

pub struct ServerMetrics {
	registry: Registry,

	/// Counter with labels: requests by method and status code
	http_requests_total: IntCounterVec,

	/// Counter with labels: responses with status >= 400
	http_errors_total: IntCounterVec,

	/// Gauge: 1 when the last liveness probe succeeded
	db_up: IntGauge,

	events_written_total: IntCounter,
	events_returned_total: IntCounter,

	started_at: Instant,
}

fn opts(name: &str, help: &str) -> Opts {
	Opts::new(name, help).namespace("trail").subsystem("server")
}

impl ServerMetrics {
	/// # Errors
	/// Returns an error if metric registration fails.
	pub fn new() -> Result<Self, prometheus::Error> {
		let registry = Registry::new();

		let http_requests_total = IntCounterVec::new(
			opts("http_requests_total", "HTTP requests by method and status"),
			&["method", "status"],
		)?;
		registry.register(Box::new(http_requests_total.clone()))?;

		let http_errors_total = IntCounterVec::new(
			opts(
				"http_errors_total",
				"HTTP responses with a 4xx or 5xx status",
			),
			&["method", "status"],
		)?;
		registry.register(Box::new(http_errors_total.clone()))?;

		let db_up = IntGauge::with_opts(opts(
			"db_up",
			"Whether the last database liveness probe succeeded",
		))?;
		registry.register(Box::new(db_up.clone()))?;

		let events_written_total = IntCounter::with_opts(opts(
			"events_written_total",
			"Audit events persisted",
		))?;
		registry.register(Box::new(events_written_total.clone()))?;

		let events_returned_total = IntCounter::with_opts(opts(
			"events_returned_total",
			"Audit events returned by queries",
		))?;
		registry.register(Box::new(events_returned_total.clone()))?;

		Ok(Self {
			registry,
			http_requests_total,
			http_errors_total,
			db_up,
			events_written_total,
			events_returned_total,
			started_at: Instant::now(),
		})
	}

	pub fn record_request(&self, method: &str, status: u16) {
		let code = status.to_string();
		let labels = [method, code.as_str()];
		self.http_requests_total.with_label_values(&labels).inc();
		if status >= 400 {
			self.http_errors_total.with_label_values(&labels).inc();
		}
	}

	pub fn set_db_up(&self, up: bool) {
		self.db_up.set(i64::from(up));
	}

	pub fn db_up(&self) -> bool {
		self.db_up.get() == 1
	}

	pub fn record_written(&self) {
		self.events_written_total.inc();
	}

	pub fn record_returned(&self, count: usize) {
		self.events_returned_total.inc_by(count as u64);
	}

	pub fn total_requests(&self) -> u64 {
		sum_counters(&self.http_requests_total)
	}

	pub fn total_errors(&self) -> u64 {
		sum_counters(&self.http_errors_total)
	}

	pub fn uptime(&self) -> Duration {
		self.started_at.elapsed()
	}

	/// Render all metrics in the Prometheus text format.
	pub fn gather(&self) -> Result<String, prometheus::Error> {
		let families = self.registry.gather();
		let mut buf = Vec::new();
		TextEncoder::new().encode(&families, &mut buf)?;
		Ok(String::from_utf8_lossy(&buf).into_owned())
	}
}

fn sum_counters(vec: &IntCounterVec) -> u64 {
	vec.collect()
		.iter()
		.flat_map(|family| family.get_metric())
		.map(|metric| metric.get_counter().get_value() as u64)
		.sum()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_metrics_creation() {
		assert!(ServerMetrics::new().is_ok());
	}

	#[test]
	fn test_request_and_error_totals() {
		let metrics = ServerMetrics::new().unwrap();
		metrics.record_request("GET", 200);
		metrics.record_request("POST", 201);
		metrics.record_request("POST", 400);
		metrics.record_request("GET", 500);

		assert_eq!(metrics.total_requests(), 4);
		assert_eq!(metrics.total_errors(), 2);

		let output = metrics.gather().unwrap();
		assert!(output.contains(r#"trail_server_http_requests_total{method="POST",status="400"} 1"#));
		assert!(output.contains(r#"trail_server_http_errors_total{method="GET",status="500"} 1"#));
	}

	#[test]
	fn test_db_up_gauge() {
		let metrics = ServerMetrics::new().unwrap();
		assert!(!metrics.db_up());
		metrics.set_db_up(true);
		assert!(metrics.db_up());
		assert!(metrics.gather().unwrap().contains("trail_server_db_up 1"));
	}

	#[test]
	fn test_event_counters() {
		let metrics = ServerMetrics::new().unwrap();
		metrics.record_written();
		metrics.record_returned(3);
		let output = metrics.gather().unwrap();
		assert!(output.contains("trail_server_events_written_total 1"));
		assert!(output.contains("trail_server_events_returned_total 3"));
	}
}
