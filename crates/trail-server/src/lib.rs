// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP server for the Trail audit event store.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `POST /audit/events` | record one event (also with a trailing slash) |
//! | `GET /audit/events/query` | filter events |
//! | `GET /health` | live database probe |
//! | `GET /stats` | counters and uptime |
//! | `GET /metrics` | Prometheus exposition |

pub mod api;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod monitor;
pub mod routes;
pub mod service;
pub mod version;

pub use api::{create_app_state, create_router, AppState};
pub use error::{ErrorResponse, ServerError};
pub use metrics::ServerMetrics;
pub use trail_server_config::ServerConfig;
