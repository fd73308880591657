use std::time::Duration;

/// Default custom epoch: 2023-01-01T00:00:00Z, in milliseconds since the Unix epoch.
pub const SNOWFLAKE_ID_EPOCH: i64 = 1_672_531_200_000;

pub const TIMESTAMP_BITS: u64 = 41;
pub const DATACENTER_ID_BITS: u64 = 5;
pub const WORKER_ID_BITS: u64 = 5;
pub const SEQUENCE_BITS: u64 = 12;

pub const MAX_WORKER_ID: u64 = (1 << WORKER_ID_BITS) - 1;
pub const MAX_DATACENTER_ID: u64 = (1 << DATACENTER_ID_BITS) - 1;
pub const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;

/// Largest timestamp offset (~69 years of milliseconds) that fits the layout.
pub const MAX_TIMESTAMP_MS: i64 = (1 << TIMESTAMP_BITS) - 1;

pub const DEFAULT_WORKER_ID: u64 = 1;
pub const DEFAULT_DATACENTER_ID: u64 = 1;

/// Upper bound on the in-lock busy-wait for the next millisecond.
pub const DEFAULT_SPIN_TIMEOUT: Duration = Duration::from_millis(5);
