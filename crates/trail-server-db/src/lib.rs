// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! # trail-server-db
//!
//! Persistence layer for Trail audit events using SQLite via sqlx.
//!
//! ## Repository Pattern
//!
//! - **[`EventStore`] trait**: the interface the server depends on
//! - **[`EventRepository`] struct**: concrete implementation holding a `SqlitePool`
//!
//! The trait methods delegate to inherent methods that carry the
//! `#[tracing::instrument]` spans.
//!
//! ## Deadlines
//!
//! Every store operation takes a [`Deadline`]. Expiry surfaces as
//! [`DbError::Timeout`], cancellation as [`DbError::Cancelled`].
//!
//! ## Error Handling
//!
//! | Variant | When |
//! |---------|------|
//! | `Sqlx` | Any driver or SQL failure, propagated via `?` |
//! | `Timeout` / `Cancelled` | The operation's deadline fired |
//! | `Decode` | A stored row could not be turned back into an `AuditEvent` |
//! | `Migration` | A schema migration failed at startup |
//! | `Internal` | Misconfiguration such as an unparseable database URL |
//!
//! ## Testing
//!
//! Tests use a single-connection in-memory pool with migrations applied:
//!
//! ```rust,ignore
//! #[tokio::test]
//! async fn test_example() {
//!     let repo = EventRepository::new(create_event_test_pool().await);
//!     // test operations...
//! }
//! ```

pub mod deadline;
mod error;
pub mod event;
pub mod migrate;
pub mod pool;

#[cfg(test)]
pub mod testing;

pub use deadline::Deadline;
pub use error::{DbError, Result};
pub use event::{EventRepository, EventStore};
pub use migrate::run_migrations;
pub use pool::{create_pool, PoolSettings};
