//! Time-ordered 64-bit identifiers.
//!
//! Each id packs, from the most significant bit down, a 41-bit millisecond
//! offset from a custom epoch, a 5-bit datacenter id, a 5-bit worker id and a
//! 12-bit per-millisecond sequence. The sign bit is always zero.
//!
//! Build one [`SnowflakeGenerator`] per process and share it by reference:
//!
//! ```
//! use snowflake_alloc::SnowflakeGenerator;
//! use std::sync::Arc;
//!
//! let generator = Arc::new(SnowflakeGenerator::new(1, 1).unwrap());
//! let a = generator.next_id().unwrap();
//! let b = generator.next_id().unwrap();
//! assert!(a < b);
//! ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "sqlx")]
use sqlx::Type;

pub mod clock;
pub mod config;
pub mod defs;
pub mod error;
pub mod generator;
pub mod snowflake;

#[cfg(feature = "tokio")]
pub mod async_generator;

pub use clock::{Clock, SystemClock};
pub use config::SnowflakeConfig;
pub use defs::*;
pub use error::{ClockError, ConfigError, IdField, ParseIdError};
pub use generator::{GeneratorSettings, SnowflakeOperation};
pub use snowflake::Snowflake;

/// The concrete generator, parameterised on `SnowflakeId`.
pub type SnowflakeGenerator<C = SystemClock> = generator::SnowflakeGenerator<SnowflakeId, C>;

#[cfg(feature = "tokio")]
pub type AsyncSnowflakeGenerator<C = SystemClock> =
    async_generator::AsyncSnowflakeGenerator<SnowflakeId, C>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "sqlx", derive(Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "BIGINT"))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct SnowflakeId(i64);

/// The fields of a [`SnowflakeId`], timestamp relative to the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnowflakeParts {
    pub timestamp: u64,
    pub datacenter_id: u64,
    pub worker_id: u64,
    pub sequence: u64,
}

impl SnowflakeParts {
    /// Packs the fields, rejecting any that does not fit its width.
    pub fn encode(&self) -> Result<SnowflakeId, ConfigError> {
        let checks = [
            (IdField::Timestamp, self.timestamp, SnowflakeId::timestamp_mask()),
            (IdField::DatacenterId, self.datacenter_id, MAX_DATACENTER_ID),
            (IdField::WorkerId, self.worker_id, MAX_WORKER_ID),
            (IdField::Sequence, self.sequence, MAX_SEQUENCE),
        ];
        for (field, value, max) in checks {
            if value > max {
                return Err(ConfigError::OutOfRange { field, value, max });
            }
        }

        Ok(SnowflakeId::from_component_parts(
            self.timestamp,
            self.datacenter_id,
            self.worker_id,
            self.sequence,
        ))
    }
}

// ---------------------------------------------------------------------------
// Snowflake trait implementation
// ---------------------------------------------------------------------------

impl Snowflake for SnowflakeId {
    fn from_component_parts(
        timestamp_offset: u64,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> Self {
        let id = (timestamp_offset << Self::timestamp_shift())
            | (datacenter_id << Self::datacenter_id_shift())
            | (worker_id << Self::worker_id_shift())
            | sequence;
        SnowflakeId(id as i64)
    }

    fn id(&self) -> u64 {
        self.0 as u64
    }

    fn timestamp_bits() -> u64 {
        TIMESTAMP_BITS
    }

    fn datacenter_id_bits() -> u64 {
        DATACENTER_ID_BITS
    }

    fn worker_id_bits() -> u64 {
        WORKER_ID_BITS
    }

    fn sequence_bits() -> u64 {
        SEQUENCE_BITS
    }
}

// ---------------------------------------------------------------------------
// Inherent methods (i64 in, i64 out)
// ---------------------------------------------------------------------------

impl SnowflakeId {
    pub fn new(value: i64) -> Result<Self, ParseIdError> {
        if value < 0 {
            return Err(ParseIdError::Negative);
        }
        Ok(SnowflakeId(value))
    }

    /// Wraps `value` as-is; callers have already checked it is non-negative.
    pub(crate) fn new_unchecked(value: i64) -> Self {
        SnowflakeId(value)
    }

    pub fn id(&self) -> i64 {
        self.0
    }

    /// Returns the timestamp offset (in milliseconds) stored in this snowflake ID.
    /// This is NOT a Unix timestamp. To get the actual Unix timestamp, use `timestamp_with_epoch()`.
    pub fn timestamp(&self) -> i64 {
        <Self as Snowflake>::timestamp(self) as i64
    }

    /// Returns the timestamp in milliseconds since Unix epoch, using a custom epoch
    pub fn timestamp_with_epoch(&self, epoch: i64) -> i64 {
        <Self as Snowflake>::timestamp_with_epoch(self, epoch)
    }

    /// Wall-clock time the id was issued at, given the generator's epoch.
    /// `None` when the result is not a representable instant.
    pub fn datetime(&self, epoch: i64) -> Option<DateTime<Utc>> {
        <Self as Snowflake>::checked_timestamp_with_epoch(self, epoch)
            .and_then(DateTime::from_timestamp_millis)
    }

    pub fn datacenter_id(&self) -> u64 {
        <Self as Snowflake>::datacenter_id(self)
    }

    pub fn worker_id(&self) -> u64 {
        <Self as Snowflake>::worker_id(self)
    }

    pub fn sequence(&self) -> u64 {
        <Self as Snowflake>::sequence(self)
    }

    pub fn parts(&self) -> SnowflakeParts {
        SnowflakeParts {
            timestamp: <Self as Snowflake>::timestamp(self),
            datacenter_id: self.datacenter_id(),
            worker_id: self.worker_id(),
            sequence: self.sequence(),
        }
    }
}

// ---------------------------------------------------------------------------
// FromStr
// ---------------------------------------------------------------------------

impl FromStr for SnowflakeId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .parse::<i64>()
            .map_err(|e| ParseIdError::Malformed(e.to_string()))?;

        SnowflakeId::new(value)
    }
}

// ---------------------------------------------------------------------------
// Display, TryFrom, Into, Serde
// ---------------------------------------------------------------------------

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for SnowflakeId {
    type Error = ParseIdError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        SnowflakeId::new(value)
    }
}

impl From<SnowflakeId> for i64 {
    fn from(id: SnowflakeId) -> Self {
        id.0
    }
}

impl Serialize for SnowflakeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.0.to_string())
        } else {
            serializer.serialize_i64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for SnowflakeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SnowflakeIdVisitor;

        impl<'de> serde::de::Visitor<'de> for SnowflakeIdVisitor {
            type Value = SnowflakeId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer representing a snowflake id")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if value > i64::MAX as u64 {
                    return Err(E::custom("snowflake id value exceeds i64::MAX"));
                }
                Ok(SnowflakeId::new_unchecked(value as i64))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                SnowflakeId::new(value).map_err(E::custom)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse::<SnowflakeId>().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(SnowflakeIdVisitor)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_generator() {
        let generator = SnowflakeGenerator::with_epoch(1, 1, SNOWFLAKE_ID_EPOCH).unwrap();
        let id1 = generator.next_id().unwrap();
        let id2 = generator.next_id().unwrap();

        assert_ne!(id1, id2);
        assert!(id1.id() < id2.id());
    }

    #[test]
    fn test_snowflake_id_components() {
        let generator = SnowflakeGenerator::new(17, 9).unwrap();
        let id = generator.next_id().unwrap();

        assert_eq!(id.worker_id(), 17);
        assert_eq!(id.datacenter_id(), 9);
        // timestamp() returns offset, not Unix timestamp
        assert!(id.timestamp() > 0);
        assert!(id.timestamp_with_epoch(SNOWFLAKE_ID_EPOCH) > SNOWFLAKE_ID_EPOCH);
        assert!(id.is_valid());
    }

    #[test]
    fn test_next_string_id() {
        let generator = SnowflakeGenerator::new(1, 1).unwrap();
        let rendered = generator.next_string_id().unwrap();

        assert!(!rendered.starts_with('0'));
        assert!(rendered.chars().all(|c| c.is_ascii_digit()));
        let parsed = SnowflakeId::from_str(&rendered).unwrap();
        assert_eq!(parsed.worker_id(), 1);
    }

    #[test]
    fn test_parts_round_trip() {
        let parts = SnowflakeParts {
            timestamp: MAX_TIMESTAMP_MS as u64,
            datacenter_id: 21,
            worker_id: 10,
            sequence: 4_000,
        };
        let id = parts.encode().unwrap();

        assert!(id.id() > 0);
        assert!(id.is_valid());
        assert_eq!(id.parts(), parts);
    }

    #[test]
    fn test_parts_reject_oversized_fields() {
        let parts = SnowflakeParts {
            timestamp: 1,
            datacenter_id: 0,
            worker_id: 32,
            sequence: 0,
        };
        assert_eq!(
            parts.encode(),
            Err(ConfigError::OutOfRange {
                field: IdField::WorkerId,
                value: 32,
                max: MAX_WORKER_ID
            })
        );

        let parts = SnowflakeParts {
            sequence: MAX_SEQUENCE + 1,
            worker_id: 0,
            ..parts
        };
        assert!(matches!(
            parts.encode(),
            Err(ConfigError::OutOfRange {
                field: IdField::Sequence,
                ..
            })
        ));
    }

    #[test]
    fn test_datetime_uses_epoch() {
        let parts = SnowflakeParts {
            timestamp: 86_400_000,
            datacenter_id: 1,
            worker_id: 1,
            sequence: 0,
        };
        let id = parts.encode().unwrap();

        let issued = id.datetime(SNOWFLAKE_ID_EPOCH).unwrap();
        assert_eq!(issued.to_rfc3339(), "2023-01-02T00:00:00+00:00");
    }

    #[test]
    fn test_datetime_with_huge_epoch_is_none() {
        let id = SnowflakeId::new(i64::MAX >> 1).unwrap();

        assert_eq!(id.datetime(i64::MAX - 10), None);
        assert_eq!(
            <SnowflakeId as Snowflake>::checked_timestamp_with_epoch(&id, i64::MAX - 10),
            None
        );
        // In range for i64 but far beyond what chrono can represent.
        assert_eq!(id.datetime(i64::MAX / 2), None);
    }

    #[test]
    fn test_serialization() {
        let id = SnowflakeId::new(123456789012345678).unwrap();

        let json_string = serde_json::to_string(&id).unwrap();
        assert_eq!(json_string, "\"123456789012345678\"");

        let deserialized: SnowflakeId = serde_json::from_str(&json_string).unwrap();
        assert_eq!(id, deserialized);

        let from_int: SnowflakeId = serde_json::from_str("123456789012345678").unwrap();
        assert_eq!(id, from_int);

        assert!(serde_json::from_str::<SnowflakeId>("-1").is_err());
        assert!(serde_json::from_str::<SnowflakeId>("\"-1\"").is_err());
    }

    #[test]
    fn test_display() {
        let id = SnowflakeId::new(987654321098765432).unwrap();
        assert_eq!(format!("{}", id), "987654321098765432");
        assert_eq!(SnowflakeId::new(0).unwrap().to_string(), "0");
    }

    #[test]
    fn test_custom_epoch() {
        // Use Jan 1, 2024 as custom epoch
        let custom_epoch = 1704067200000i64;
        let generator = SnowflakeGenerator::with_epoch(5, 6, custom_epoch).unwrap();

        assert_eq!(generator.epoch(), custom_epoch);

        let id = generator.next_id().unwrap();
        assert_eq!(id.worker_id(), 5);
        assert_eq!(id.datacenter_id(), 6);

        let offset = id.timestamp();
        assert!(offset > 0);
        assert!(offset < MAX_TIMESTAMP_MS);

        let timestamp = id.timestamp_with_epoch(custom_epoch);
        assert!(timestamp >= custom_epoch);
        assert!(timestamp < custom_epoch + MAX_TIMESTAMP_MS);
    }

    #[test]
    fn test_from_str_rejects_negative() {
        assert_eq!(SnowflakeId::from_str("-123"), Err(ParseIdError::Negative));
    }

    #[test]
    fn test_from_str_rejects_invalid() {
        let result = SnowflakeId::from_str("not_a_number");
        assert!(matches!(result, Err(ParseIdError::Malformed(_))));
    }

    #[test]
    fn test_from_str_accepts_valid() {
        let id = SnowflakeId::from_str("123456789012345678").unwrap();
        assert_eq!(id.id(), 123456789012345678);

        let zero = SnowflakeId::from_str("0").unwrap();
        assert_eq!(zero.id(), 0);
    }

    #[test]
    fn test_try_from() {
        assert_eq!(SnowflakeId::try_from(-456i64), Err(ParseIdError::Negative));

        let id = SnowflakeId::try_from(123456789012345678i64).unwrap();
        assert_eq!(i64::from(id), 123456789012345678);
    }
}
