//! Monotonic audit clock.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Issues epoch-millisecond stamps that strictly increase per clock.
///
/// Wall-clock time is used while it moves forward; otherwise the previous
/// stamp plus one millisecond is returned.
#[derive(Debug, Default)]
pub struct AuditClock {
    last: AtomicI64,
}

impl AuditClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock whose next stamp is greater than `floor`.
    pub fn starting_after(floor: i64) -> Self {
        Self {
            last: AtomicI64::new(floor),
        }
    }

    /// Returns the next stamp.
    pub fn stamp(&self) -> i64 {
        let wall = wall_clock_ms();
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let next = wall.max(previous + 1);
            match self
                .last
                .compare_exchange_weak(previous, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => previous = actual,
            }
        }
    }
}

fn wall_clock_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::AuditClock;

    #[test]
    fn stamps_strictly_increase_even_within_one_millisecond() {
        let clock = AuditClock::new();
        let mut previous = clock.stamp();
        for _ in 0..1_000 {
            let next = clock.stamp();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn floor_in_the_future_is_respected() {
        let far_future = i64::MAX / 2;
        let clock = AuditClock::starting_after(far_future);
        assert_eq!(clock.stamp(), far_future + 1);
    }
}
