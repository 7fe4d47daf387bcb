// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// A semantic rule violation on a new event or a filter.
///
/// Every variant carries a stable machine-readable [`code`](Self::code) that
/// the HTTP layer returns alongside the human-readable message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
	#[error("Field 'user' is required")]
	UserRequired,

	#[error("user field too long: {len} characters (max {max})")]
	UserTooLong { len: usize, max: usize },

	#[error("Field 'op' is required")]
	OperationRequired,

	#[error("operation field too long: {len} characters (max {max})")]
	OperationTooLong { len: usize, max: usize },

	#[error("timestamp cannot be more than {max_skew_secs} seconds in the future")]
	TimestampInFuture { max_skew_secs: i64 },

	#[error("timestamp_start cannot be after timestamp_end")]
	RangeInverted,

	#[error("date range cannot exceed {max_days} days")]
	RangeTooLarge { max_days: i64 },

	#[error("filter '{filter}' has {count} values (max {max})")]
	TooManyValues {
		filter: String,
		count: usize,
		max: usize,
	},

	#[error("{count} attribute filters given (max {max})")]
	TooManyAttributes { count: usize, max: usize },

	#[error("attribute key '{0}' must contain only letters, digits, '_' and '.'")]
	InvalidAttributeKey(String),

	#[error("unrecognized filter parameter '{0}'")]
	UnknownParameter(String),
}

impl ValidationError {
	pub fn code(&self) -> &'static str {
		match self {
			ValidationError::UserRequired => "user_required",
			ValidationError::UserTooLong { .. } => "user_too_long",
			ValidationError::OperationRequired => "operation_required",
			ValidationError::OperationTooLong { .. } => "operation_too_long",
			ValidationError::TimestampInFuture { .. } => "timestamp_in_future",
			ValidationError::RangeInverted => "range_inverted",
			ValidationError::RangeTooLarge { .. } => "range_too_large",
			ValidationError::TooManyValues { .. } => "too_many_values",
			ValidationError::TooManyAttributes { .. } => "too_many_attributes",
			ValidationError::InvalidAttributeKey(_) => "invalid_attribute_key",
			ValidationError::UnknownParameter(_) => "unknown_parameter",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_codes_are_distinct() {
		let errors = [
			ValidationError::UserRequired,
			ValidationError::UserTooLong { len: 300, max: 255 },
			ValidationError::OperationRequired,
			ValidationError::OperationTooLong { len: 101, max: 100 },
			ValidationError::TimestampInFuture { max_skew_secs: 300 },
			ValidationError::RangeInverted,
			ValidationError::RangeTooLarge { max_days: 30 },
			ValidationError::TooManyValues {
				filter: "ev_user".to_string(),
				count: 101,
				max: 100,
			},
			ValidationError::TooManyAttributes { count: 21, max: 20 },
			ValidationError::InvalidAttributeKey("a'b".to_string()),
			ValidationError::UnknownParameter("ev_usr".to_string()),
		];

		let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
		codes.sort_unstable();
		codes.dedup();
		assert_eq!(codes.len(), errors.len());
	}

	#[test]
	fn test_messages() {
		assert_eq!(
			ValidationError::RangeTooLarge { max_days: 30 }.to_string(),
			"date range cannot exceed 30 days"
		);
		assert_eq!(
			ValidationError::UserRequired.to_string(),
			"Field 'user' is required"
		);
	}
}
