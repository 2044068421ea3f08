//! Admission control for concurrent scraping sessions.

use rand::Rng;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Bounds concurrent sessions with a guarded counter.
///
/// At the ceiling a caller waits a randomized interval and then proceeds
/// anyway. This is backpressure, not a queue.
#[derive(Debug, Clone)]
pub struct AdmissionControl {
    active: Arc<Mutex<usize>>,
    ceiling: usize,
    wait_min: Duration,
    wait_max: Duration,
}

impl AdmissionControl {
    /// Admit up to `ceiling` sessions before callers wait between
    /// `wait_min` and `wait_max`.
    #[must_use]
    pub fn new(ceiling: usize, wait_min: Duration, wait_max: Duration) -> Self {
        let (wait_min, wait_max) = if wait_min <= wait_max {
            (wait_min, wait_max)
        } else {
            (wait_max, wait_min)
        };
        Self {
            active: Arc::new(Mutex::new(0)),
            ceiling: ceiling.max(1),
            wait_min,
            wait_max,
        }
    }

    /// Sessions currently admitted.
    #[must_use]
    pub fn active(&self) -> usize {
        *self.active.lock().expect("acquire admission lock")
    }

    fn backoff(&self) -> Duration {
        if self.wait_min == self.wait_max {
            return self.wait_min;
        }
        rand::thread_rng().gen_range(self.wait_min..=self.wait_max)
    }

    /// Admit one session. The returned guard releases it on drop.
    pub async fn admit(&self) -> AdmissionGuard {
        let saturated = self.active() >= self.ceiling;
        if saturated {
            let wait = self.backoff();
            tracing::info!(
                "{} scraping sessions active (limit {}), waiting {:?}",
                self.active(),
                self.ceiling,
                wait
            );
            tokio::time::sleep(wait).await;
        }

        *self.active.lock().expect("acquire admission lock") += 1;
        AdmissionGuard {
            active: Arc::clone(&self.active),
        }
    }
}

/// Releases one admission when dropped, on every exit path.
#[derive(Debug)]
pub struct AdmissionGuard {
    active: Arc<Mutex<usize>>,
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        let mut active = self.active.lock().expect("acquire admission lock");
        *active = active.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_guard_releases_on_drop() {
        let admission = AdmissionControl::new(2, Duration::ZERO, Duration::ZERO);
        let first = admission.admit().await;
        let second = admission.admit().await;
        assert_eq!(admission.active(), 2);

        drop(first);
        assert_eq!(admission.active(), 1);
        drop(second);
        assert_eq!(admission.active(), 0);
    }

    #[tokio::test]
    async fn test_waits_at_ceiling_then_proceeds() {
        let admission =
            AdmissionControl::new(1, Duration::from_millis(30), Duration::from_millis(40));
        let _held = admission.admit().await;

        let started = Instant::now();
        let _second = admission.admit().await;
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(admission.active(), 2);
    }

    #[tokio::test]
    async fn test_no_wait_below_ceiling() {
        let admission = AdmissionControl::new(3, Duration::from_secs(5), Duration::from_secs(10));
        let started = Instant::now();
        let _guard = admission.admit().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
