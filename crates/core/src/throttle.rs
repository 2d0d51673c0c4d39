//! Fixed-interval admission gate.
//!
//! A cycle is admitted with [`Gate::admit`] and closed with
//! [`Gate::complete`]. The next admission is held back until the interval
//! has passed since the previous cycle completed. The gate only paces; what
//! counts as a cycle is up to the caller.

use std::time::Duration;
use tokio::time::{self, Instant};

/// Default pause between paced cycles in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 2000;

#[derive(Debug)]
pub struct Gate {
    interval: Duration,
    ready_at: Option<Instant>,
}

impl Gate {
    pub fn new(interval: Duration) -> Self {
        Gate {
            interval,
            ready_at: None,
        }
    }

    /// A gate that never waits.
    pub fn open() -> Self {
        Gate::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until the next cycle may start. The first cycle starts at once.
    pub async fn admit(&mut self) {
        if let Some(ready_at) = self.ready_at {
            time::sleep_until(ready_at).await;
        }
    }

    /// Marks the current cycle as finished.
    pub fn complete(&mut self) {
        if !self.interval.is_zero() {
            self.ready_at = Some(Instant::now() + self.interval);
        }
    }
}

impl Default for Gate {
    fn default() -> Self {
        Gate::new(Duration::from_millis(DEFAULT_INTERVAL_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_admission_is_immediate() {
        let mut gate = Gate::default();
        let start = Instant::now();
        gate.admit().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycles_are_spaced_by_interval() {
        let mut gate = Gate::new(Duration::from_millis(2000));
        let start = Instant::now();
        for _ in 0..4 {
            gate.admit().await;
            gate.complete();
        }
        assert!(start.elapsed() >= Duration::from_millis(6000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_cycle_still_waits_full_interval() {
        let mut gate = Gate::new(Duration::from_millis(2000));
        gate.admit().await;
        time::sleep(Duration::from_millis(1500)).await;
        gate.complete();

        let before = Instant::now();
        gate.admit().await;
        assert!(before.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_gate_never_waits() {
        let mut gate = Gate::open();
        let start = Instant::now();
        for _ in 0..10 {
            gate.admit().await;
            gate.complete();
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_default_interval() {
        assert_eq!(Gate::default().interval(), Duration::from_millis(2000));
    }
}
