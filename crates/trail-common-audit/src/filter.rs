// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event filter model and query-parameter parsing.
//!
//! # Parameter vocabulary
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `ev_ts` | exact timestamp; when present the range keys are ignored |
//! | `ev_ts_start` / `ev_ts_end` | inclusive time range |
//! | `ev_user`, `ev_component`, `ev_op` | comma-separated string sets |
//! | `ev_session_id`, `ev_req_id` | comma-separated integer sets |
//! | `attr_<key>` | comma-separated accepted values for attribute `<key>` |
//!
//! Only the first value of a repeated key is read.
//!
//! # Permissive parsing
//!
//! Malformed timestamps and integer segments are dropped without error. A
//! malformed `ev_ts_start` therefore filters nothing, and `ev_session_id=x`
//! yields no session predicate at all. This is part of the public contract.
//!
//! Keys outside both prefixes are ignored. Keys that carry the `ev_` prefix
//! but are not part of the vocabulary are kept in
//! [`EventFilter::unrecognized`] so validation can reject the typo.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};

pub const PARAM_TIMESTAMP: &str = "ev_ts";
pub const PARAM_TIMESTAMP_START: &str = "ev_ts_start";
pub const PARAM_TIMESTAMP_END: &str = "ev_ts_end";
pub const PARAM_USER: &str = "ev_user";
pub const PARAM_COMPONENT: &str = "ev_component";
pub const PARAM_OPERATION: &str = "ev_op";
pub const PARAM_SESSION_ID: &str = "ev_session_id";
pub const PARAM_REQUEST_ID: &str = "ev_req_id";

pub const RESERVED_PREFIX: &str = "ev_";
pub const ATTRIBUTE_PREFIX: &str = "attr_";

const KNOWN_PARAMS: &[&str] = &[
	PARAM_TIMESTAMP,
	PARAM_TIMESTAMP_START,
	PARAM_TIMESTAMP_END,
	PARAM_USER,
	PARAM_COMPONENT,
	PARAM_OPERATION,
	PARAM_SESSION_ID,
	PARAM_REQUEST_ID,
];

/// Naive fallback formats tried after RFC 3339, interpreted as UTC.
const FALLBACK_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Multi-valued query parameters, as decoded from a URL query string.
pub type QueryParams = BTreeMap<String, Vec<String>>;

/// Parsed, not yet validated, query criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
	pub timestamp: Option<DateTime<Utc>>,
	pub timestamp_start: Option<DateTime<Utc>>,
	pub timestamp_end: Option<DateTime<Utc>>,
	pub users: Vec<String>,
	pub components: Vec<String>,
	pub operations: Vec<String>,
	pub session_ids: Vec<i64>,
	pub request_ids: Vec<i64>,
	pub attributes: BTreeMap<String, Vec<String>>,
	pub unrecognized: Vec<String>,
}

impl EventFilter {
	/// Parse query parameters into a filter. Never fails; see module docs.
	pub fn from_params(params: &QueryParams) -> Self {
		let mut filter = EventFilter {
			timestamp: first(params, PARAM_TIMESTAMP).and_then(parse_timestamp),
			timestamp_start: first(params, PARAM_TIMESTAMP_START).and_then(parse_timestamp),
			timestamp_end: first(params, PARAM_TIMESTAMP_END).and_then(parse_timestamp),
			users: first(params, PARAM_USER).map(split_list).unwrap_or_default(),
			components: first(params, PARAM_COMPONENT)
				.map(split_list)
				.unwrap_or_default(),
			operations: first(params, PARAM_OPERATION)
				.map(split_list)
				.unwrap_or_default(),
			session_ids: first(params, PARAM_SESSION_ID)
				.map(split_int_list)
				.unwrap_or_default(),
			request_ids: first(params, PARAM_REQUEST_ID)
				.map(split_int_list)
				.unwrap_or_default(),
			..Default::default()
		};

		for (key, values) in params {
			if let Some(attribute) = key.strip_prefix(ATTRIBUTE_PREFIX) {
				if let Some(value) = values.first() {
					filter
						.attributes
						.insert(attribute.to_string(), split_list(value));
				}
			} else if key.starts_with(RESERVED_PREFIX) && !KNOWN_PARAMS.contains(&key.as_str()) {
				filter.unrecognized.push(key.clone());
			}
		}

		filter
	}

	pub fn with_users<I, S>(mut self, users: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.users = users.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
		self.timestamp_start = Some(start);
		self.timestamp_end = Some(end);
		self
	}

	pub fn with_attribute<I, S>(mut self, key: impl Into<String>, values: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self
			.attributes
			.insert(key.into(), values.into_iter().map(Into::into).collect());
		self
	}
}

/// Group `(key, value)` pairs into [`QueryParams`], keeping value order per key.
pub fn params_from_pairs<I, K, V>(pairs: I) -> QueryParams
where
	I: IntoIterator<Item = (K, V)>,
	K: Into<String>,
	V: Into<String>,
{
	let mut params = QueryParams::new();
	for (key, value) in pairs {
		params.entry(key.into()).or_default().push(value.into());
	}
	params
}

/// Parse a timestamp using RFC 3339 first, then the naive fallbacks.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
	if value.is_empty() {
		return None;
	}

	if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
		return Some(ts.with_timezone(&Utc));
	}

	FALLBACK_FORMATS
		.iter()
		.find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
		.map(|naive| naive.and_utc())
}

fn first<'a>(params: &'a QueryParams, key: &str) -> Option<&'a str> {
	params
		.get(key)
		.and_then(|values| values.first())
		.map(String::as_str)
}

fn split_list(value: &str) -> Vec<String> {
	value.split(',').map(str::to_string).collect()
}

fn split_int_list(value: &str) -> Vec<i64> {
	value
		.split(',')
		.filter_map(|segment| segment.parse::<i64>().ok())
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;
	use proptest::prelude::*;

	fn params(pairs: &[(&str, &str)]) -> QueryParams {
		params_from_pairs(pairs.iter().copied())
	}

	#[test]
	fn test_empty_params() {
		let filter = EventFilter::from_params(&QueryParams::new());
		assert_eq!(filter, EventFilter::default());
	}

	#[test]
	fn test_parse_timestamp_formats() {
		let expected = Utc.with_ymd_and_hms(2024, 1, 1, 10, 30, 0).unwrap();
		assert_eq!(parse_timestamp("2024-01-01T10:30:00Z"), Some(expected));
		assert_eq!(parse_timestamp("2024-01-01T12:30:00+02:00"), Some(expected));
		assert_eq!(parse_timestamp("2024-01-01T10:30:00"), Some(expected));

		let fractional = parse_timestamp("2024-01-01T10:30:00.250").unwrap();
		assert_eq!(fractional, expected + chrono::Duration::milliseconds(250));
	}

	#[test]
	fn test_unparseable_timestamp_is_dropped() {
		let filter = EventFilter::from_params(&params(&[
			("ev_ts_start", "yesterday"),
			("ev_ts_end", "2024-01-02T00:00:00Z"),
		]));
		assert!(filter.timestamp_start.is_none());
		assert!(filter.timestamp_end.is_some());
		assert!(parse_timestamp("").is_none());
		assert!(parse_timestamp("2024-13-01T00:00:00").is_none());
	}

	#[test]
	fn test_only_first_value_is_read() {
		let filter = EventFilter::from_params(&params(&[
			("ev_user", "alice,bob"),
			("ev_user", "carol"),
			("ev_ts", "2024-01-01T00:00:00Z"),
			("ev_ts", "garbage"),
		]));
		assert_eq!(filter.users, vec!["alice", "bob"]);
		assert!(filter.timestamp.is_some());
	}

	#[test]
	fn test_string_lists_keep_empty_segments() {
		let filter = EventFilter::from_params(&params(&[
			("ev_op", "login,,logout"),
			("ev_component", ""),
			("ev_user", " alice , alice"),
		]));
		assert_eq!(filter.operations, vec!["login", "", "logout"]);
		assert_eq!(filter.components, vec![""]);
		assert_eq!(filter.users, vec![" alice ", " alice"]);
	}

	#[test]
	fn test_integer_lists_skip_bad_segments() {
		let filter = EventFilter::from_params(&params(&[
			("ev_session_id", "1,x,3,,-4"),
			("ev_req_id", "abc"),
		]));
		assert_eq!(filter.session_ids, vec![1, 3, -4]);
		assert!(filter.request_ids.is_empty());
	}

	#[test]
	fn test_attribute_prefix() {
		let filter = EventFilter::from_params(&params(&[
			("attr_ip", "10.0.0.1,10.0.0.2"),
			("attr_geo.country", "NZ"),
			("utm_source", "newsletter"),
		]));
		assert_eq!(filter.attributes.len(), 2);
		assert_eq!(filter.attributes["ip"], vec!["10.0.0.1", "10.0.0.2"]);
		assert_eq!(filter.attributes["geo.country"], vec!["NZ"]);
		assert!(filter.unrecognized.is_empty());
	}

	#[test]
	fn test_misspelled_reserved_key_is_recorded() {
		let filter = EventFilter::from_params(&params(&[("ev_usr", "alice")]));
		assert!(filter.users.is_empty());
		assert!(filter.attributes.is_empty());
		assert_eq!(filter.unrecognized, vec!["ev_usr"]);
	}

	#[test]
	fn test_params_from_pairs_groups_keys() {
		let grouped = params(&[("a", "1"), ("b", "2"), ("a", "3")]);
		assert_eq!(grouped["a"], vec!["1", "3"]);
		assert_eq!(grouped["b"], vec!["2"]);
	}

	proptest! {
		#[test]
		fn prop_parse_never_panics(pairs in prop::collection::vec((".{0,12}", ".{0,24}"), 0..12)) {
			let _ = EventFilter::from_params(&params_from_pairs(pairs));
		}

		#[test]
		fn prop_user_list_round_trips(users in prop::collection::vec("[a-z0-9]{1,8}", 1..10)) {
			let joined = users.join(",");
			let filter = EventFilter::from_params(&params(&[("ev_user", joined.as_str())]));
			prop_assert_eq!(filter.users, users);
		}

		#[test]
		fn prop_session_ids_round_trip(ids in prop::collection::vec(any::<i64>(), 1..10)) {
			let joined = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
			let filter = EventFilter::from_params(&params(&[("ev_session_id", joined.as_str())]));
			prop_assert_eq!(filter.session_ids, ids);
		}
	}
}
