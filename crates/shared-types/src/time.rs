//! Clock abstraction.

/// Time source trait for testability
pub trait TimeSource: Send + Sync {
    /// Current unix time in seconds.
    fn now(&self) -> i64;
}

/// System time implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            // Clock before the epoch reads as 0 rather than panicking.
            .unwrap_or(0)
    }
}

/// Fixed clock for tests and simulations.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource(pub i64);

impl TimeSource for FixedTimeSource {
    fn now(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_time_is_after_2020() {
        assert!(SystemTimeSource.now() > 1_577_836_800);
    }

    #[test]
    fn test_fixed_time() {
        assert_eq!(FixedTimeSource(42).now(), 42);
    }
}
