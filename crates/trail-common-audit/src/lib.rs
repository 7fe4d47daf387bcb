// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core audit types for Trail.
//!
//! This crate is the pure half of the service. Nothing here performs I/O:
//!
//! - [`event`]: [`NewAuditEvent`] as submitted and [`AuditEvent`] as stored
//! - [`filter`]: [`EventFilter`] and the query-parameter parser
//! - [`validate`]: invariants for new events and filters
//! - [`query`]: compilation of a validated filter into a [`PredicateSet`]
//!
//! Read path: `EventFilter::from_params` → `validate_filter` → `build_query`,
//! after which the predicate set is handed to the store.

pub mod error;
pub mod event;
pub mod filter;
pub mod query;
pub mod validate;

pub use error::ValidationError;
pub use event::{format_timestamp, AuditEvent, Document, NewAuditEvent};
pub use filter::{params_from_pairs, parse_timestamp, EventFilter, QueryParams};
pub use query::{
	build_query, AttributePath, BoundValue, Column, Operator, Predicate, PredicateSet, Target,
	EVENT_COLUMNS, RESULT_LIMIT,
};
pub use validate::{
	validate_event, validate_event_at, validate_filter, ValidatedEvent, ValidatedFilter,
	MAX_ATTRIBUTE_KEYS, MAX_FUTURE_SKEW_SECS, MAX_LIST_VALUES, MAX_OPERATION_LEN, MAX_RANGE_DAYS,
	MAX_USER_LEN,
};
