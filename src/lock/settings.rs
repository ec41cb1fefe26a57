//! Lock settings

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How concurrent mutations of one wallet are serialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockStrategy {
    /// Pessimistic row lock held for the transaction's lifetime
    #[default]
    RowLock,
    /// Persisted lease flag, polled until acquired or timed out
    Poll,
}

impl FromStr for LockStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "row" | "row_lock" | "pessimistic" => Ok(LockStrategy::RowLock),
            "poll" | "flag" => Ok(LockStrategy::Poll),
            other => Err(format!("unknown lock strategy {other:?} (expected \"row\" or \"poll\")")),
        }
    }
}

impl fmt::Display for LockStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockStrategy::RowLock => f.write_str("row"),
            LockStrategy::Poll => f.write_str("poll"),
        }
    }
}

/// Bounds for lock acquisition
#[derive(Debug, Clone)]
pub struct LockSettings {
    pub strategy: LockStrategy,
    /// Maximum time an acquirer waits before failing with a timeout
    pub timeout: Duration,
    /// Delay between poll attempts (poll strategy only)
    pub poll_interval: Duration,
    /// Age after which a poll lease counts as abandoned
    pub lease: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            strategy: LockStrategy::RowLock,
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
            lease: Duration::from_secs(30),
        }
    }
}

impl LockSettings {
    pub fn with_strategy(mut self, strategy: LockStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strategy() {
        assert_eq!("row".parse::<LockStrategy>().unwrap(), LockStrategy::RowLock);
        assert_eq!("POLL".parse::<LockStrategy>().unwrap(), LockStrategy::Poll);
        assert!("mutex".parse::<LockStrategy>().is_err());
    }

    #[test]
    fn test_defaults() {
        let settings = LockSettings::default();
        assert_eq!(settings.strategy, LockStrategy::RowLock);
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert_eq!(settings.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_builder() {
        let settings = LockSettings::default()
            .with_strategy(LockStrategy::Poll)
            .with_timeout(Duration::from_millis(500))
            .with_poll_interval(Duration::from_millis(50))
            .with_lease(Duration::from_secs(5));

        assert_eq!(settings.strategy, LockStrategy::Poll);
        assert_eq!(settings.timeout, Duration::from_millis(500));
        assert_eq!(settings.poll_interval, Duration::from_millis(50));
        assert_eq!(settings.lease, Duration::from_secs(5));
    }
}
