//! Inter-acceptance pacing
//!
//! Spaces out successive acceptances with a fixed base plus a uniformly
//! random jitter so request timing does not look mechanical.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::random_source::RandomSource;

/// Pause policy between accepted sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    pub base: Duration,
    pub jitter: Duration,
}

impl PacingPolicy {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self { base, jitter }
    }

    /// Draw the next delay: `base + uniform(0..=jitter)` at millisecond resolution
    pub fn next_delay(&self, random: &RandomSource) -> Duration {
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        self.base + Duration::from_millis(random.up_to(jitter_ms))
    }

    /// Sleep for the next delay unless cancelled first
    ///
    /// Returns `false` if the wait was interrupted by `cancel`.
    pub async fn wait(&self, random: &RandomSource, cancel: &CancellationToken) -> bool {
        let delay = self.next_delay(random);
        if delay.is_zero() {
            return !cancel.is_cancelled();
        }

        tracing::debug!(delay_ms = delay.as_millis() as u64, "Pacing before next source");

        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = cancel.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_delay_within_bounds() {
        let policy = PacingPolicy::new(Duration::from_millis(7000), Duration::from_millis(3000));
        let random = RandomSource::seeded(42);

        for _ in 0..200 {
            let delay = policy.next_delay(&random);
            assert!(delay >= Duration::from_millis(7000));
            assert!(delay <= Duration::from_millis(10000));
        }
    }

    #[test]
    fn test_same_seed_same_delays() {
        let policy = PacingPolicy::new(Duration::from_millis(100), Duration::from_millis(50));
        let a = RandomSource::seeded(9);
        let b = RandomSource::seeded(9);

        let first: Vec<_> = (0..10).map(|_| policy.next_delay(&a)).collect();
        let second: Vec<_> = (0..10).map(|_| policy.next_delay(&b)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_jitter_is_exact() {
        let policy = PacingPolicy::new(Duration::from_millis(250), Duration::ZERO);
        assert_eq!(policy.next_delay(&RandomSource::seeded(1)), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_wait_sleeps_for_delay() {
        let policy = PacingPolicy::new(Duration::from_millis(50), Duration::ZERO);
        let start = Instant::now();

        assert!(policy.wait(&RandomSource::seeded(1), &CancellationToken::new()).await);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_wait_interrupted_by_cancel() {
        let policy = PacingPolicy::new(Duration::from_secs(60), Duration::ZERO);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        assert!(!policy.wait(&RandomSource::seeded(1), &cancel).await);
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
