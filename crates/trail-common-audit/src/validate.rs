// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Validation of new events and filters.
//!
//! Both entry points consume their input and return a wrapper type
//! ([`ValidatedEvent`], [`ValidatedFilter`]) that can only be obtained here.
//! The store only writes a `ValidatedEvent` and the query builder only
//! compiles a `ValidatedFilter`.

use chrono::{DateTime, Duration, Utc};

use crate::error::ValidationError;
use crate::event::{normalize_timestamp, AuditEvent, NewAuditEvent};
use crate::filter::{EventFilter, PARAM_COMPONENT, PARAM_OPERATION, PARAM_REQUEST_ID};
use crate::filter::{ATTRIBUTE_PREFIX, PARAM_SESSION_ID, PARAM_USER};
use crate::query::AttributePath;

pub const MAX_USER_LEN: usize = 255;
pub const MAX_OPERATION_LEN: usize = 100;
pub const MAX_FUTURE_SKEW_SECS: i64 = 5 * 60;
pub const MAX_RANGE_DAYS: i64 = 30;
pub const MAX_LIST_VALUES: usize = 100;
pub const MAX_ATTRIBUTE_KEYS: usize = 20;

/// A new event that passed validation, with its timestamp resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEvent {
	timestamp: DateTime<Utc>,
	event: NewAuditEvent,
}

impl ValidatedEvent {
	pub fn timestamp(&self) -> DateTime<Utc> {
		self.timestamp
	}

	pub fn event(&self) -> &NewAuditEvent {
		&self.event
	}

	/// Attach store-generated fields.
	pub fn into_stored(self, id: i64, created_at: DateTime<Utc>) -> AuditEvent {
		let event = self.event;
		AuditEvent {
			id,
			timestamp: self.timestamp,
			user: event.user,
			component: event.component,
			operation: event.operation,
			session_id: event.session_id,
			request_id: event.request_id,
			response: event.response,
			attributes: event.attributes,
			created_at,
		}
	}
}

/// A filter that passed validation and may be compiled into a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFilter(EventFilter);

impl ValidatedFilter {
	pub fn filter(&self) -> &EventFilter {
		&self.0
	}

	pub fn into_inner(self) -> EventFilter {
		self.0
	}
}

/// Validate a new event against the current clock.
pub fn validate_event(event: NewAuditEvent) -> Result<ValidatedEvent, ValidationError> {
	validate_event_at(event, Utc::now())
}

/// Validate a new event against an explicit `now`.
///
/// A missing timestamp defaults to `now`. The resolved timestamp is
/// truncated to microseconds.
pub fn validate_event_at(
	mut event: NewAuditEvent,
	now: DateTime<Utc>,
) -> Result<ValidatedEvent, ValidationError> {
	let timestamp = normalize_timestamp(event.timestamp.unwrap_or(now));

	if timestamp > now + Duration::seconds(MAX_FUTURE_SKEW_SECS) {
		return Err(ValidationError::TimestampInFuture {
			max_skew_secs: MAX_FUTURE_SKEW_SECS,
		});
	}

	let user_len = event.user.chars().count();
	if user_len == 0 {
		return Err(ValidationError::UserRequired);
	}
	if user_len > MAX_USER_LEN {
		return Err(ValidationError::UserTooLong {
			len: user_len,
			max: MAX_USER_LEN,
		});
	}

	let operation_len = event.operation.chars().count();
	if operation_len == 0 {
		return Err(ValidationError::OperationRequired);
	}
	if operation_len > MAX_OPERATION_LEN {
		return Err(ValidationError::OperationTooLong {
			len: operation_len,
			max: MAX_OPERATION_LEN,
		});
	}

	event.timestamp = Some(timestamp);
	Ok(ValidatedEvent { timestamp, event })
}

/// Validate a parsed filter.
pub fn validate_filter(filter: EventFilter) -> Result<ValidatedFilter, ValidationError> {
	if let Some(key) = filter.unrecognized.first() {
		return Err(ValidationError::UnknownParameter(key.clone()));
	}

	if let (Some(start), Some(end)) = (filter.timestamp_start, filter.timestamp_end) {
		if start > end {
			return Err(ValidationError::RangeInverted);
		}
		if end - start > Duration::days(MAX_RANGE_DAYS) {
			return Err(ValidationError::RangeTooLarge {
				max_days: MAX_RANGE_DAYS,
			});
		}
	}

	check_list_len(PARAM_USER, filter.users.len())?;
	check_list_len(PARAM_COMPONENT, filter.components.len())?;
	check_list_len(PARAM_OPERATION, filter.operations.len())?;
	check_list_len(PARAM_SESSION_ID, filter.session_ids.len())?;
	check_list_len(PARAM_REQUEST_ID, filter.request_ids.len())?;

	if filter.attributes.len() > MAX_ATTRIBUTE_KEYS {
		return Err(ValidationError::TooManyAttributes {
			count: filter.attributes.len(),
			max: MAX_ATTRIBUTE_KEYS,
		});
	}

	for (key, values) in &filter.attributes {
		AttributePath::parse(key)?;
		check_list_len(&format!("{ATTRIBUTE_PREFIX}{key}"), values.len())?;
	}

	Ok(ValidatedFilter(filter))
}

fn check_list_len(name: &str, count: usize) -> Result<(), ValidationError> {
	if count > MAX_LIST_VALUES {
		return Err(ValidationError::TooManyValues {
			filter: name.to_string(),
			count,
			max: MAX_LIST_VALUES,
		});
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;
	use proptest::prelude::*;

	fn now() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
	}

	#[test]
	fn test_missing_timestamp_defaults_to_now() {
		let validated = validate_event_at(NewAuditEvent::new("alice", "login"), now()).unwrap();
		assert_eq!(validated.timestamp(), now());
		assert_eq!(validated.event().timestamp, Some(now()));
	}

	#[test]
	fn test_future_timestamp_within_skew_is_accepted() {
		let event = NewAuditEvent::new("alice", "login").with_timestamp(now() + Duration::minutes(5));
		assert!(validate_event_at(event, now()).is_ok());
	}

	#[test]
	fn test_future_timestamp_beyond_skew_is_rejected() {
		let event = NewAuditEvent::new("alice", "login")
			.with_timestamp(now() + Duration::minutes(5) + Duration::seconds(1));
		assert_eq!(
			validate_event_at(event, now()).unwrap_err(),
			ValidationError::TimestampInFuture {
				max_skew_secs: MAX_FUTURE_SKEW_SECS
			}
		);
	}

	#[test]
	fn test_past_timestamp_is_accepted() {
		let event = NewAuditEvent::new("alice", "login").with_timestamp(now() - Duration::days(365));
		assert!(validate_event_at(event, now()).is_ok());
	}

	#[test]
	fn test_required_fields() {
		assert_eq!(
			validate_event_at(NewAuditEvent::new("", "login"), now()).unwrap_err(),
			ValidationError::UserRequired
		);
		assert_eq!(
			validate_event_at(NewAuditEvent::new("alice", ""), now()).unwrap_err(),
			ValidationError::OperationRequired
		);
	}

	#[test]
	fn test_length_limits_count_characters() {
		let user = "é".repeat(MAX_USER_LEN);
		assert!(validate_event_at(NewAuditEvent::new(user, "login"), now()).is_ok());

		let user = "u".repeat(MAX_USER_LEN + 1);
		assert!(matches!(
			validate_event_at(NewAuditEvent::new(user, "login"), now()),
			Err(ValidationError::UserTooLong { len: 256, max: 255 })
		));

		let op = "o".repeat(MAX_OPERATION_LEN + 1);
		assert!(matches!(
			validate_event_at(NewAuditEvent::new("alice", op), now()),
			Err(ValidationError::OperationTooLong { len: 101, max: 100 })
		));
	}

	#[test]
	fn test_into_stored_keeps_payload() {
		let event = NewAuditEvent::new("alice", "login")
			.with_component("auth")
			.with_attribute("ip", "10.0.0.1");
		let stored = validate_event_at(event, now())
			.unwrap()
			.into_stored(7, now());
		assert_eq!(stored.id, 7);
		assert_eq!(stored.timestamp, now());
		assert_eq!(stored.component.as_deref(), Some("auth"));
		assert_eq!(stored.attributes.unwrap()["ip"], "10.0.0.1");
	}

	#[test]
	fn test_range_inverted() {
		let filter = EventFilter::default().with_range(now(), now() - Duration::seconds(1));
		assert_eq!(
			validate_filter(filter).unwrap_err(),
			ValidationError::RangeInverted
		);
	}

	#[test]
	fn test_range_limit_is_inclusive() {
		let filter = EventFilter::default().with_range(now() - Duration::days(30), now());
		assert!(validate_filter(filter).is_ok());

		let filter = EventFilter::default()
			.with_range(now() - Duration::days(30) - Duration::seconds(1), now());
		assert_eq!(
			validate_filter(filter).unwrap_err(),
			ValidationError::RangeTooLarge { max_days: 30 }
		);
	}

	#[test]
	fn test_open_ended_range_is_not_bounded() {
		let filter = EventFilter {
			timestamp_start: Some(now() - Duration::days(400)),
			..Default::default()
		};
		assert!(validate_filter(filter).is_ok());
	}

	#[test]
	fn test_list_cap() {
		let users: Vec<String> = (0..=MAX_LIST_VALUES).map(|i| format!("u{i}")).collect();
		let filter = EventFilter::default().with_users(users);
		assert!(matches!(
			validate_filter(filter),
			Err(ValidationError::TooManyValues { ref filter, count: 101, .. }) if filter == "ev_user"
		));
	}

	#[test]
	fn test_attribute_key_cap() {
		let mut filter = EventFilter::default();
		for i in 0..=MAX_ATTRIBUTE_KEYS {
			filter = filter.with_attribute(format!("k{i}"), ["v"]);
		}
		assert!(matches!(
			validate_filter(filter),
			Err(ValidationError::TooManyAttributes { count: 21, max: 20 })
		));
	}

	#[test]
	fn test_attribute_key_allow_list() {
		let filter = EventFilter::default().with_attribute("ip') OR 1=1 --", ["x"]);
		assert!(matches!(
			validate_filter(filter),
			Err(ValidationError::InvalidAttributeKey(_))
		));
	}

	#[test]
	fn test_unknown_reserved_parameter() {
		let filter = EventFilter {
			unrecognized: vec!["ev_usr".to_string()],
			..Default::default()
		};
		assert_eq!(
			validate_filter(filter).unwrap_err(),
			ValidationError::UnknownParameter("ev_usr".to_string())
		);
	}

	proptest! {
		#[test]
		fn prop_inverted_ranges_always_rejected(offset_secs in 1i64..10_000_000) {
			let filter = EventFilter::default()
				.with_range(now() + Duration::seconds(offset_secs), now());
			prop_assert_eq!(validate_filter(filter).unwrap_err(), ValidationError::RangeInverted);
		}

		#[test]
		fn prop_ranges_over_thirty_days_rejected(extra_secs in 1i64..100_000_000) {
			let start = now() - Duration::days(MAX_RANGE_DAYS) - Duration::seconds(extra_secs);
			let filter = EventFilter::default().with_range(start, now());
			prop_assert!(
				matches!(validate_filter(filter), Err(ValidationError::RangeTooLarge { .. })),
				"expected RangeTooLarge"
			);
		}

		#[test]
		fn prop_future_timestamps_rejected(extra_secs in 1i64..10_000_000) {
			let ts = now() + Duration::seconds(MAX_FUTURE_SKEW_SECS + extra_secs);
			let event = NewAuditEvent::new("alice", "login").with_timestamp(ts);
			prop_assert!(
				matches!(
					validate_event_at(event, now()),
					Err(ValidationError::TimestampInFuture { .. })
				),
				"expected TimestampInFuture"
			);
		}
	}
}
