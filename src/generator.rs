use crate::clock::{Clock, SystemClock};
use crate::defs::{DEFAULT_SPIN_TIMEOUT, SNOWFLAKE_ID_EPOCH};
use crate::error::{ClockError, ConfigError, IdField};
use crate::snowflake::Snowflake;
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::time::{Duration, Instant};
use typed_builder::TypedBuilder;

/// Outcome of a non-spinning allocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnowflakeOperation<S> {
    Ready(S),
    /// The current millisecond is exhausted; retry after the given delay.
    Pending(Duration),
}

/// Identity and tuning for a generator instance.
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct GeneratorSettings {
    /// Worker index, `0..=31` with the default layout.
    pub worker_id: u64,
    /// Datacenter index, `0..=31` with the default layout.
    pub datacenter_id: u64,
    /// Custom epoch in milliseconds since the Unix epoch.
    #[builder(default = SNOWFLAKE_ID_EPOCH)]
    pub epoch: i64,
    /// How long `next_id` may spin waiting for the clock to leave an
    /// exhausted millisecond before giving up.
    #[builder(default = DEFAULT_SPIN_TIMEOUT)]
    pub spin_timeout: Duration,
}

#[derive(Debug)]
struct GeneratorState {
    last_timestamp: i64,
    sequence: u64,
}

impl GeneratorState {
    const UNSET: i64 = -1;
}

pub struct SnowflakeGenerator<S: Snowflake, C: Clock = SystemClock> {
    worker_id: u64,
    datacenter_id: u64,
    epoch: i64,
    spin_timeout: Duration,
    clock: C,
    state: Mutex<GeneratorState>,
    _marker: PhantomData<S>,
}

impl<S: Snowflake> SnowflakeGenerator<S, SystemClock> {
    /// Creates a generator on the system clock with the default epoch.
    ///
    /// # Example
    /// ```
    /// use snowflake_alloc::SnowflakeGenerator;
    ///
    /// let generator = SnowflakeGenerator::new(1, 1).unwrap();
    /// let id = generator.next_id().unwrap();
    /// assert_eq!(id.worker_id(), 1);
    /// ```
    pub fn new(worker_id: u64, datacenter_id: u64) -> Result<Self, ConfigError> {
        Self::with_settings(
            GeneratorSettings::builder()
                .worker_id(worker_id)
                .datacenter_id(datacenter_id)
                .build(),
        )
    }

    /// Creates a generator with a custom epoch
    ///
    /// # Arguments
    /// * `worker_id` - Worker index (0-31)
    /// * `datacenter_id` - Datacenter index (0-31)
    /// * `epoch` - Custom epoch in milliseconds since Unix epoch
    ///
    /// # Example
    /// ```
    /// use snowflake_alloc::SnowflakeGenerator;
    ///
    /// // Use a custom epoch (e.g., Jan 1, 2024)
    /// let generator = SnowflakeGenerator::with_epoch(1, 2, 1704067200000).unwrap();
    /// assert_eq!(generator.epoch(), 1704067200000);
    /// ```
    pub fn with_epoch(
        worker_id: u64,
        datacenter_id: u64,
        epoch: i64,
    ) -> Result<Self, ConfigError> {
        Self::with_settings(
            GeneratorSettings::builder()
                .worker_id(worker_id)
                .datacenter_id(datacenter_id)
                .epoch(epoch)
                .build(),
        )
    }

    pub fn with_settings(settings: GeneratorSettings) -> Result<Self, ConfigError> {
        Self::with_clock(settings, SystemClock)
    }
}

impl<S: Snowflake, C: Clock> SnowflakeGenerator<S, C> {
    /// Creates a generator reading time from `clock`.
    pub fn with_clock(settings: GeneratorSettings, clock: C) -> Result<Self, ConfigError> {
        if settings.worker_id > S::max_worker_id() {
            return Err(ConfigError::OutOfRange {
                field: IdField::WorkerId,
                value: settings.worker_id,
                max: S::max_worker_id(),
            });
        }
        if settings.datacenter_id > S::max_datacenter_id() {
            return Err(ConfigError::OutOfRange {
                field: IdField::DatacenterId,
                value: settings.datacenter_id,
                max: S::max_datacenter_id(),
            });
        }
        if settings.epoch < 0 {
            return Err(ConfigError::InvalidEpoch(settings.epoch));
        }

        tracing::info!(
            worker_id = settings.worker_id,
            datacenter_id = settings.datacenter_id,
            epoch = settings.epoch,
            "snowflake generator initialized"
        );

        Ok(SnowflakeGenerator {
            worker_id: settings.worker_id,
            datacenter_id: settings.datacenter_id,
            epoch: settings.epoch,
            spin_timeout: settings.spin_timeout,
            clock,
            state: Mutex::new(GeneratorState {
                last_timestamp: GeneratorState::UNSET,
                sequence: 0,
            }),
            _marker: PhantomData,
        })
    }

    /// Returns the epoch being used by this generator
    pub fn epoch(&self) -> i64 {
        self.epoch
    }

    pub fn worker_id(&self) -> u64 {
        self.worker_id
    }

    pub fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    pub fn spin_timeout(&self) -> Duration {
        self.spin_timeout
    }

    /// Timestamp of the last allocation, `-1` before the first one.
    pub(crate) fn last_timestamp(&self) -> i64 {
        self.state.lock().last_timestamp
    }

    /// Allocates the next id.
    ///
    /// When the current millisecond's sequence is used up this spins on the
    /// clock, holding the lock, until the next millisecond or until the spin
    /// timeout elapses.
    ///
    /// # Errors
    /// - [`ClockError::Regression`] if the clock reads earlier than the last
    ///   allocation. Not retried.
    /// - [`ClockError::SequenceExhausted`] if the clock did not advance within
    ///   the spin timeout. The call may be retried.
    /// - [`ClockError::TimestampOutOfRange`] if the clock is before the epoch
    ///   or past the end of the 41-bit range.
    pub fn next_id(&self) -> Result<S, ClockError> {
        let mut state = self.state.lock();
        self.allocate(&mut state)
    }

    /// Allocates the next id and renders it in decimal.
    pub fn next_string_id(&self) -> Result<String, ClockError>
    where
        S: std::fmt::Display,
    {
        self.next_id().map(|id| id.to_string())
    }

    /// Like [`next_id`](Self::next_id), but returns
    /// [`SnowflakeOperation::Pending`] instead of spinning when the current
    /// millisecond is exhausted. State is not touched in that case.
    pub fn try_next_id(&self) -> Result<SnowflakeOperation<S>, ClockError> {
        let mut state = self.state.lock();
        let now = self.clock.now_millis();

        match self.advance(&mut state, now)? {
            Some(id) => Ok(SnowflakeOperation::Ready(id)),
            None => Ok(SnowflakeOperation::Pending(Duration::from_millis(1))),
        }
    }

    /// Allocates `count` strictly increasing ids under a single lock
    /// acquisition. The first failure aborts the batch.
    pub fn next_id_bulk(&self, count: usize) -> Result<Vec<S>, ClockError> {
        let mut ids = Vec::with_capacity(count);

        let mut state = self.state.lock();
        for _ in 0..count {
            ids.push(self.allocate(&mut state)?);
        }

        Ok(ids)
    }

    fn allocate(&self, state: &mut GeneratorState) -> Result<S, ClockError> {
        let now = self.clock.now_millis();
        if let Some(id) = self.advance(state, now)? {
            return Ok(id);
        }

        let now = self.wait_next_millis(state.last_timestamp)?;
        self.commit(state, now, 0)
    }

    /// Returns `None` when `now` repeats the last timestamp and its sequence
    /// space is exhausted.
    fn advance(&self, state: &mut GeneratorState, now: i64) -> Result<Option<S>, ClockError> {
        let last = state.last_timestamp;
        if last != GeneratorState::UNSET && now < last {
            let drift_ms = last - now;
            tracing::warn!(last, now, drift_ms, "clock moved backwards");
            return Err(ClockError::Regression { last, now, drift_ms });
        }

        let sequence = if now == last {
            let next_seq = (state.sequence + 1) & S::max_sequence();
            if next_seq == 0 {
                return Ok(None);
            }
            next_seq
        } else {
            0
        };

        self.commit(state, now, sequence).map(Some)
    }

    fn commit(
        &self,
        state: &mut GeneratorState,
        now: i64,
        sequence: u64,
    ) -> Result<S, ClockError> {
        let offset = now - self.epoch;
        if offset < 0 || offset > S::max_timestamp() {
            return Err(ClockError::TimestampOutOfRange { offset });
        }

        state.last_timestamp = now;
        state.sequence = sequence;

        Ok(S::from_component_parts(
            offset as u64,
            self.datacenter_id,
            self.worker_id,
            sequence,
        ))
    }

    fn wait_next_millis(&self, last: i64) -> Result<i64, ClockError> {
        tracing::debug!(timestamp = last, "sequence exhausted, waiting for next millisecond");

        let started = Instant::now();
        loop {
            let now = self.clock.now_millis();
            if now > last {
                return Ok(now);
            }

            let waited = started.elapsed();
            if waited > self.spin_timeout {
                tracing::warn!(
                    timestamp = last,
                    ?waited,
                    "clock did not advance within spin timeout"
                );
                return Err(ClockError::SequenceExhausted {
                    timestamp: last,
                    waited,
                });
            }
            std::hint::spin_loop();
        }
    }
}
