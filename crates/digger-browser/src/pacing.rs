//! Human-like timing between browser actions.

use rand::Rng;
use std::time::Duration;

/// Randomized delays and motion plans that make a session look less scripted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanPacing {
    min_delay: Duration,
    max_delay: Duration,
}

impl HumanPacing {
    /// Delays are drawn uniformly from `[min, max]`; the bounds are swapped
    /// if given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self {
                min_delay: min,
                max_delay: max,
            }
        } else {
            Self {
                min_delay: max,
                max_delay: min,
            }
        }
    }

    /// No waiting at all.
    pub fn instant() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn random_delay(&self) -> Duration {
        if self.min_delay == self.max_delay {
            return self.min_delay;
        }
        rand::thread_rng().gen_range(self.min_delay..=self.max_delay)
    }

    /// Sleep for a random delay.
    pub async fn pause(&self) {
        let delay = self.random_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Scroll distances in pixels for one pass down a page.
    pub fn scroll_plan(&self) -> Vec<i32> {
        let mut rng = rand::thread_rng();
        let steps = rng.gen_range(3..=6);
        (0..steps).map(|_| rng.gen_range(180..=520)).collect()
    }

    /// Pointer waypoints inside a viewport.
    pub fn pointer_path(&self, width: u32, height: u32) -> Vec<(f64, f64)> {
        let mut rng = rand::thread_rng();
        let width = f64::from(width.max(1));
        let height = f64::from(height.max(1));
        let points = rng.gen_range(4..=8);
        (0..points)
            .map(|_| {
                (
                    rng.gen_range(0.05..0.95) * width,
                    rng.gen_range(0.05..0.95) * height,
                )
            })
            .collect()
    }
}

impl Default for HumanPacing {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500), Duration::from_millis(4000))
    }
}
