// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background database liveness monitor.
//!
//! Pings the store on a fixed interval and publishes the outcome through
//! [`ServerMetrics::set_db_up`], which `/stats` and `/metrics` read.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use trail_server_db::{Deadline, EventStore};

use crate::metrics::ServerMetrics;

pub const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Probe the store once and record the result. Returns whether it is up.
pub async fn check_database(
	store: &dyn EventStore,
	metrics: &ServerMetrics,
	cancel: &CancellationToken,
) -> bool {
	let deadline = Deadline::after(PING_TIMEOUT).with_cancellation(cancel.clone());
	let up = match store.ping(&deadline).await {
		Ok(()) => true,
		Err(e) => {
			tracing::warn!(error = %e, "database liveness probe failed");
			false
		}
	};

	let was_up = metrics.db_up();
	metrics.set_db_up(up);
	if up && !was_up {
		tracing::info!("database connection is up");
	}
	up
}

/// Spawn the monitor. It probes immediately, then every `interval`, until
/// `cancel` fires.
pub fn spawn_db_monitor(
	store: Arc<dyn EventStore>,
	metrics: Arc<ServerMetrics>,
	interval: Duration,
	cancel: CancellationToken,
) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(interval);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				_ = cancel.cancelled() => break,
				_ = ticker.tick() => {
					check_database(store.as_ref(), &metrics, &cancel).await;
				}
			}
		}
		tracing::debug!("database monitor stopped");
	})
}
