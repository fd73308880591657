use crate::clock::{Clock, SystemClock};
use crate::error::{ClockError, ConfigError};
use crate::generator::{GeneratorSettings, SnowflakeGenerator, SnowflakeOperation};
use crate::snowflake::Snowflake;
use std::sync::Arc;
use std::time::Instant;

/// Async front-end over a shared [`SnowflakeGenerator`].
///
/// Instead of spinning inside the lock when a millisecond is exhausted, the
/// task sleeps on the tokio timer and retries.
pub struct AsyncSnowflakeGenerator<S: Snowflake, C: Clock = SystemClock> {
    inner: Arc<SnowflakeGenerator<S, C>>,
}

impl<S: Snowflake> AsyncSnowflakeGenerator<S, SystemClock> {
    pub fn new(worker_id: u64, datacenter_id: u64) -> Result<Self, ConfigError> {
        Ok(Self::from_shared(Arc::new(SnowflakeGenerator::new(
            worker_id,
            datacenter_id,
        )?)))
    }

    pub fn with_settings(settings: GeneratorSettings) -> Result<Self, ConfigError> {
        Ok(Self::from_shared(Arc::new(SnowflakeGenerator::with_settings(
            settings,
        )?)))
    }
}

impl<S: Snowflake, C: Clock> AsyncSnowflakeGenerator<S, C> {
    /// Wraps a generator that may also be used synchronously elsewhere.
    pub fn from_shared(inner: Arc<SnowflakeGenerator<S, C>>) -> Self {
        Self { inner }
    }

    pub fn generator(&self) -> &Arc<SnowflakeGenerator<S, C>> {
        &self.inner
    }

    pub fn epoch(&self) -> i64 {
        self.inner.epoch()
    }

    /// Allocates the next id, sleeping while the current millisecond is
    /// exhausted. Gives up with [`ClockError::SequenceExhausted`] once the
    /// generator's spin timeout has passed without the clock advancing.
    pub async fn next_id(&self) -> Result<S, ClockError> {
        let started = Instant::now();
        loop {
            match self.inner.try_next_id()? {
                SnowflakeOperation::Ready(id) => return Ok(id),
                SnowflakeOperation::Pending(wait) => {
                    let waited = started.elapsed();
                    if waited > self.inner.spin_timeout() {
                        let timestamp = self.inner.last_timestamp();
                        tracing::warn!(
                            timestamp,
                            ?waited,
                            "clock did not advance within spin timeout"
                        );
                        return Err(ClockError::SequenceExhausted { timestamp, waited });
                    }
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    pub async fn next_id_bulk(&self, count: usize) -> Result<Vec<S>, ClockError> {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            ids.push(self.next_id().await?);
        }
        Ok(ids)
    }
}

impl<S: Snowflake, C: Clock> Clone for AsyncSnowflakeGenerator<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_clock::TestClock;
    use crate::defs::{MAX_SEQUENCE, SNOWFLAKE_ID_EPOCH};
    use crate::SnowflakeId;
    use std::time::Duration;

    const START: i64 = SNOWFLAKE_ID_EPOCH + 1_000;

    #[tokio::test]
    async fn test_async_generate() {
        let generator = crate::AsyncSnowflakeGenerator::new(1, 1).unwrap();
        let id1 = generator.next_id().await.unwrap();
        let id2 = generator.next_id().await.unwrap();

        assert_ne!(id1, id2);
        assert!(id1.id() < id2.id());
    }

    #[tokio::test]
    async fn test_async_generate_bulk() {
        let generator = crate::AsyncSnowflakeGenerator::new(1, 1).unwrap();
        let ids = generator.next_id_bulk(100).await.unwrap();

        assert_eq!(ids.len(), 100);
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[tokio::test]
    async fn test_async_sleeps_through_exhausted_millisecond() {
        let clock = TestClock::new(START);
        let settings = GeneratorSettings::builder()
            .worker_id(1)
            .datacenter_id(1)
            .spin_timeout(Duration::from_millis(500))
            .build();
        let sync = Arc::new(
            SnowflakeGenerator::<SnowflakeId, _>::with_clock(settings, clock.clone()).unwrap(),
        );
        let generator = AsyncSnowflakeGenerator::from_shared(Arc::clone(&sync));

        for _ in 0..=MAX_SEQUENCE {
            sync.next_id().unwrap();
        }

        let ticker = {
            let clock = clock.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                clock.advance(1);
            })
        };

        let id = generator.next_id().await.unwrap();
        ticker.await.unwrap();

        assert_eq!(id.sequence(), 0);
        assert_eq!(id.timestamp(), 1_001);
    }

    #[tokio::test]
    async fn test_async_stuck_clock_exhausts_sequence() {
        let clock = TestClock::new(START);
        let settings = GeneratorSettings::builder()
            .worker_id(1)
            .datacenter_id(1)
            .spin_timeout(Duration::from_millis(2))
            .build();
        let sync = Arc::new(
            SnowflakeGenerator::<SnowflakeId, _>::with_clock(settings, clock.clone()).unwrap(),
        );
        let generator = AsyncSnowflakeGenerator::from_shared(Arc::clone(&sync));

        for _ in 0..=MAX_SEQUENCE {
            sync.next_id().unwrap();
        }

        let result = tokio::time::timeout(Duration::from_millis(500), generator.next_id())
            .await
            .expect("async allocation must give up within the spin timeout");
        let err = result.unwrap_err();
        assert!(err.is_transient());
        match err {
            ClockError::SequenceExhausted { timestamp, waited } => {
                assert_eq!(timestamp, START);
                assert!(waited > Duration::from_millis(2));
            }
            other => panic!("Expected SequenceExhausted, got {other:?}"),
        }

        // Nothing was consumed: the next millisecond starts at sequence 0.
        clock.advance(1);
        let id = generator.next_id().await.unwrap();
        assert_eq!(id.sequence(), 0);
        assert_eq!(id.timestamp(), 1_001);
    }

    #[tokio::test]
    async fn test_async_reports_regression() {
        let clock = TestClock::new(START);
        let settings = GeneratorSettings::builder()
            .worker_id(1)
            .datacenter_id(1)
            .build();
        let generator = AsyncSnowflakeGenerator::from_shared(Arc::new(
            SnowflakeGenerator::<SnowflakeId, _>::with_clock(settings, clock.clone()).unwrap(),
        ));

        generator.next_id().await.unwrap();
        clock.set(START - 3);

        assert!(matches!(
            generator.next_id().await,
            Err(ClockError::Regression { drift_ms: 3, .. })
        ));
    }
}
