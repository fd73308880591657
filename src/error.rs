use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Identity field validated at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdField {
    WorkerId,
    DatacenterId,
    Timestamp,
    Sequence,
}

impl fmt::Display for IdField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdField::WorkerId => "worker id",
            IdField::DatacenterId => "datacenter id",
            IdField::Timestamp => "timestamp",
            IdField::Sequence => "sequence",
        };
        f.write_str(name)
    }
}

/// Errors raised while building a generator or packing an id from parts.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {field} {value}; expected 0..={max}")]
    OutOfRange { field: IdField, value: u64, max: u64 },
    #[error("epoch must not be negative, got {0}")]
    InvalidEpoch(i64),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors returned by id allocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClockError {
    #[error("clock moved backwards by {drift_ms}ms (last={last}, now={now}); refusing to generate id")]
    Regression { last: i64, now: i64, drift_ms: i64 },
    #[error("sequence exhausted at {timestamp}; clock did not advance within {waited:?}")]
    SequenceExhausted { timestamp: i64, waited: Duration },
    #[error("timestamp offset {offset}ms is outside the encodable range")]
    TimestampOutOfRange { offset: i64 },
}

impl ClockError {
    /// Whether retrying the whole allocation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClockError::SequenceExhausted { .. })
    }
}

/// Failure to read a [`SnowflakeId`](crate::SnowflakeId) from its decimal form.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseIdError {
    #[error("failed to parse snowflake id: {0}")]
    Malformed(String),
    #[error("snowflake id cannot be negative")]
    Negative,
}
