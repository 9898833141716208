use rand::Rng;
use std::time::Duration;

/// Decides how long to wait before offering to a newly announced peer.
pub trait OfferDelay: Send + Sync {
    fn next_delay(&self) -> Duration;
}

/// Uniform random wait in `[min, max]`. Spreading the offers out makes it
/// unlikely that two peers discovering each other both start offering.
#[derive(Debug, Clone, Copy)]
pub struct RandomJitter {
    min: Duration,
    max: Duration,
}

impl RandomJitter {
    pub fn new(min: Duration, max: Duration) -> Self {
        if max < min {
            return Self { min: max, max: min };
        }
        Self { min, max }
    }
}

impl OfferDelay for RandomJitter {
    fn next_delay(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

/// Always the same wait. Zero makes offers immediate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDelay(pub Duration);

impl OfferDelay for FixedDelay {
    fn next_delay(&self) -> Duration {
        self.0
    }
}
