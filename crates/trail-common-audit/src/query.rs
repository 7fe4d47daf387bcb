// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Compilation of a validated filter into a parameterized SQLite query.
//!
//! A [`PredicateSet`] is an ordered list of `(target, operator, value)`
//! triples. Clause text is rendered mechanically from the triple with
//! positional placeholders (`?1`, `?2`, ...) and the bound values form a
//! parallel list, so clause `n` always owns argument `n`.
//!
//! Set membership binds the whole list as a single JSON array and expands it
//! with `json_each`, which keeps that 1:1 correspondence for lists of any
//! length.
//!
//! The only caller text that reaches query structure is an attribute key, and
//! only after it has matched [`AttributePath::parse`]'s allow-list.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;

use crate::error::ValidationError;
use crate::event::format_timestamp;
use crate::validate::ValidatedFilter;

/// Hard cap on returned rows. Not caller-configurable.
pub const RESULT_LIMIT: i64 = 1000;

pub const EVENTS_TABLE: &str = "audit_events";

/// Columns selected for every query, in decode order.
pub const EVENT_COLUMNS: &str = "id, timestamp, user_id, component, operation, session_id, \
	 request_id, response, attributes, created_at";

static ATTRIBUTE_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[A-Za-z0-9_]+(\.[A-Za-z0-9_]+)*$").expect("valid attribute key regex")
});

/// Filterable columns of `audit_events`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
	Timestamp,
	UserId,
	Component,
	Operation,
	SessionId,
	RequestId,
}

impl Column {
	pub fn as_sql(&self) -> &'static str {
		match self {
			Column::Timestamp => "timestamp",
			Column::UserId => "user_id",
			Column::Component => "component",
			Column::Operation => "operation",
			Column::SessionId => "session_id",
			Column::RequestId => "request_id",
		}
	}
}

/// An allow-listed key into the `attributes` document.
///
/// Dots separate path segments, so `geo.country` addresses
/// `{"geo": {"country": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath(String);

impl AttributePath {
	pub fn parse(key: &str) -> Result<Self, ValidationError> {
		if ATTRIBUTE_KEY_RE.is_match(key) {
			Ok(Self(key.to_string()))
		} else {
			Err(ValidationError::InvalidAttributeKey(key.to_string()))
		}
	}

	pub fn key(&self) -> &str {
		&self.0
	}

	/// SQLite JSON path with every segment quoted, e.g. `$."geo"."country"`.
	pub fn json_path(&self) -> String {
		let mut path = String::from("$");
		for segment in self.0.split('.') {
			path.push_str(".\"");
			path.push_str(segment);
			path.push('"');
		}
		path
	}

	/// The value at this path rendered as text. JSON booleans render as
	/// `true`/`false` rather than SQLite's `1`/`0`.
	fn text_expr(&self) -> String {
		let path = self.json_path();
		format!(
			"CASE json_type(attributes, '{path}') \
			 WHEN 'true' THEN 'true' WHEN 'false' THEN 'false' \
			 ELSE CAST(json_extract(attributes, '{path}') AS TEXT) END"
		)
	}
}

impl fmt::Display for AttributePath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Left-hand side of a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
	Column(Column),
	Attribute(AttributePath),
}

impl Target {
	fn expr(&self) -> String {
		match self {
			Target::Column(column) => column.as_sql().to_string(),
			Target::Attribute(path) => path.text_expr(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
	Eq,
	Gte,
	Lte,
	In,
}

/// A value bound to a single placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundValue {
	Timestamp(DateTime<Utc>),
	TextSet(Vec<String>),
	IntegerSet(Vec<i64>),
}

impl BoundValue {
	/// Text form handed to the driver. Timestamps use the stored fixed-width
	/// format; sets become a JSON array for `json_each`.
	pub fn encode(&self) -> String {
		match self {
			BoundValue::Timestamp(ts) => format_timestamp(ts),
			BoundValue::TextSet(values) => Value::from(values.clone()).to_string(),
			BoundValue::IntegerSet(values) => Value::from(values.clone()).to_string(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
	pub target: Target,
	pub operator: Operator,
	pub value: BoundValue,
}

impl Predicate {
	fn column(column: Column, operator: Operator, value: BoundValue) -> Self {
		Self {
			target: Target::Column(column),
			operator,
			value,
		}
	}

	/// Render the clause text with `?{position}` as its placeholder.
	pub fn render(&self, position: usize) -> String {
		let expr = self.target.expr();
		match self.operator {
			Operator::Eq => format!("{expr} = ?{position}"),
			Operator::Gte => format!("{expr} >= ?{position}"),
			Operator::Lte => format!("{expr} <= ?{position}"),
			Operator::In => format!("{expr} IN (SELECT value FROM json_each(?{position}))"),
		}
	}
}

/// Ordered predicates compiled from one filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredicateSet {
	predicates: Vec<Predicate>,
}

impl PredicateSet {
	pub fn predicates(&self) -> &[Predicate] {
		&self.predicates
	}

	pub fn is_empty(&self) -> bool {
		self.predicates.is_empty()
	}

	pub fn len(&self) -> usize {
		self.predicates.len()
	}

	/// Clause texts, placeholders numbered from 1.
	pub fn clauses(&self) -> Vec<String> {
		self
			.predicates
			.iter()
			.enumerate()
			.map(|(i, p)| p.render(i + 1))
			.collect()
	}

	/// Encoded arguments, parallel to [`clauses`](Self::clauses).
	pub fn arguments(&self) -> Vec<String> {
		self.predicates.iter().map(|p| p.value.encode()).collect()
	}

	/// The full SELECT statement, ordered newest first and capped.
	pub fn to_sql(&self) -> String {
		let mut sql = format!("SELECT {EVENT_COLUMNS} FROM {EVENTS_TABLE}");
		if !self.predicates.is_empty() {
			sql.push_str(" WHERE ");
			sql.push_str(&self.clauses().join(" AND "));
		}
		sql.push_str(&format!(
			" ORDER BY timestamp DESC, id DESC LIMIT {RESULT_LIMIT}"
		));
		sql
	}

	fn push(&mut self, predicate: Predicate) {
		self.predicates.push(predicate);
	}

	fn push_text_set(&mut self, column: Column, values: &[String]) {
		if !values.is_empty() {
			self.push(Predicate::column(
				column,
				Operator::In,
				BoundValue::TextSet(values.to_vec()),
			));
		}
	}

	fn push_integer_set(&mut self, column: Column, values: &[i64]) {
		if !values.is_empty() {
			self.push(Predicate::column(
				column,
				Operator::In,
				BoundValue::IntegerSet(values.to_vec()),
			));
		}
	}
}

/// Compile a validated filter.
///
/// Predicate order is fixed: exact timestamp (or else the range bounds),
/// user, component, operation, session, request, then attributes in
/// ascending key order. An exact timestamp suppresses the range.
pub fn build_query(filter: &ValidatedFilter) -> Result<PredicateSet, ValidationError> {
	let filter = filter.filter();
	let mut set = PredicateSet::default();

	if let Some(ts) = filter.timestamp {
		set.push(Predicate::column(
			Column::Timestamp,
			Operator::Eq,
			BoundValue::Timestamp(ts),
		));
	} else {
		if let Some(start) = filter.timestamp_start {
			set.push(Predicate::column(
				Column::Timestamp,
				Operator::Gte,
				BoundValue::Timestamp(start),
			));
		}
		if let Some(end) = filter.timestamp_end {
			set.push(Predicate::column(
				Column::Timestamp,
				Operator::Lte,
				BoundValue::Timestamp(end),
			));
		}
	}

	set.push_text_set(Column::UserId, &filter.users);
	set.push_text_set(Column::Component, &filter.components);
	set.push_text_set(Column::Operation, &filter.operations);
	set.push_integer_set(Column::SessionId, &filter.session_ids);
	set.push_integer_set(Column::RequestId, &filter.request_ids);

	for (key, values) in &filter.attributes {
		let path = AttributePath::parse(key)?;
		if values.is_empty() {
			continue;
		}
		set.push(Predicate {
			target: Target::Attribute(path),
			operator: Operator::In,
			value: BoundValue::TextSet(values.clone()),
		});
	}

	tracing::trace!(predicates = set.len(), "compiled event filter");
	Ok(set)
}
