//! Simulated environment: virtual clock and seeded randomness.
//!
//! Time only moves when the test calls [`SimEnv::advance`] (or awaits
//! [`Environment::sleep`], which advances instead of waiting). All clones
//! share one clock and one RNG, so a room of clients observes the same time.

use std::{
    ops::Sub,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chatsync_core::Environment;
use chrono::{DateTime, Utc};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Wall-clock reading at virtual time zero: 2024-05-01T10:00:00Z.
const DEFAULT_EPOCH_MILLIS: i64 = 1_714_557_600_000;

/// Point on the virtual timeline, measured from the start of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Start of the simulation.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Time since the start of the simulation.
    pub fn since_start(self) -> Duration {
        self.0
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

/// Deterministic [`Environment`] for simulation.
#[derive(Debug, Clone)]
pub struct SimEnv {
    elapsed_millis: Arc<AtomicU64>,
    rng: Arc<Mutex<ChaCha8Rng>>,
    epoch_millis: i64,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl SimEnv {
    /// Environment whose random stream is fully determined by `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            elapsed_millis: Arc::new(AtomicU64::new(0)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            epoch_millis: DEFAULT_EPOCH_MILLIS,
        }
    }

    /// Set the wall-clock reading at virtual time zero.
    #[must_use]
    pub fn with_epoch(mut self, epoch: DateTime<Utc>) -> Self {
        self.epoch_millis = epoch.timestamp_millis();
        self
    }

    /// Move virtual time forward. Millisecond resolution.
    pub fn advance(&self, duration: Duration) {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.elapsed_millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Virtual time since the start of the simulation.
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_millis.load(Ordering::SeqCst))
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(self.elapsed())
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        let elapsed = i64::try_from(self.elapsed().as_millis()).unwrap_or(i64::MAX);
        DateTime::<Utc>::from_timestamp_millis(self.epoch_millis.saturating_add(elapsed))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_moves_only_when_advanced() {
        let env = SimEnv::default();
        let start = env.now();
        assert_eq!(env.now(), start);

        env.advance(Duration::from_secs(5));
        assert_eq!(env.now() - start, Duration::from_secs(5));
        assert_eq!(start - env.now(), Duration::ZERO);
    }

    #[test]
    fn clones_share_the_clock() {
        let env = SimEnv::default();
        let other = env.clone();

        other.advance(Duration::from_millis(250));
        assert_eq!(env.elapsed(), Duration::from_millis(250));
    }

    #[test]
    fn wall_clock_follows_virtual_time() {
        let env = SimEnv::default();
        assert_eq!(env.wall_clock().to_rfc3339(), "2024-05-01T10:00:00+00:00");

        env.advance(Duration::from_secs(90));
        assert_eq!(env.wall_clock().to_rfc3339(), "2024-05-01T10:01:30+00:00");
    }

    #[test]
    fn same_seed_same_bytes() {
        let a = SimEnv::with_seed(7);
        let b = SimEnv::with_seed(7);
        assert_eq!(a.random_u64(), b.random_u64());

        let c = SimEnv::with_seed(8);
        assert_ne!(SimEnv::with_seed(7).random_u64(), c.random_u64());
    }
}
