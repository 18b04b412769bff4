//! Pool configuration options

use crate::errors::{PoolError, PoolResult};

use std::num::NonZeroUsize;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for pool sizing and liveness behavior
///
/// # Examples
///
/// ```
/// use connpool::PoolConfiguration;
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new()
///     .with_min_conn(2)
///     .with_max_conn(10)
///     .with_idle_timeout(Duration::from_secs(30));
///
/// assert_eq!(config.min_conn, 2);
/// assert_eq!(config.max_conn, 10);
/// assert_eq!(config.idle_timeout, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfiguration {
    /// Number of resources created up front (best-effort)
    pub min_conn: usize,

    /// Maximum number of live resources, idle and in use together
    pub max_conn: usize,

    /// Idle threshold handed to [`Resource::is_usable`](crate::Resource::is_usable).
    /// `None` means resources never go stale by age alone.
    pub idle_timeout: Option<Duration>,

    /// Upper bound for a blocking acquire. `None` waits until a resource
    /// becomes available or the pool shuts down.
    pub acquire_timeout: Option<Duration>,

    /// Reject `min_conn > max_conn` instead of clamping
    pub strict: bool,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            min_conn: 0,
            max_conn: default_max_conn(),
            idle_timeout: None,
            acquire_timeout: None,
            strict: false,
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of resources to pre-create
    pub fn with_min_conn(mut self, n: usize) -> Self {
        self.min_conn = n;
        self
    }

    /// Set the maximum number of live resources
    ///
    /// # Examples
    ///
    /// ```
    /// use connpool::PoolConfiguration;
    ///
    /// let config = PoolConfiguration::new().with_max_conn(4);
    /// assert_eq!(config.max_conn, 4);
    /// ```
    pub fn with_max_conn(mut self, n: usize) -> Self {
        self.max_conn = n;
        self
    }

    /// Set the idle timeout passed to the liveness check
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Bound how long a blocking acquire may wait
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Fail pool construction on contradictory sizes instead of clamping
    pub fn with_strict_validation(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Normalize the configuration before a pool is built.
    ///
    /// A `max_conn` of zero falls back to the host parallelism. When
    /// `min_conn` exceeds `max_conn` it is clamped, or rejected with
    /// [`PoolError::InvalidParameter`] in strict mode.
    ///
    /// # Examples
    ///
    /// ```
    /// use connpool::{PoolConfiguration, PoolError};
    ///
    /// let config = PoolConfiguration::new()
    ///     .with_min_conn(8)
    ///     .with_max_conn(2)
    ///     .resolve()
    ///     .unwrap();
    /// assert_eq!(config.min_conn, 2);
    ///
    /// let strict = PoolConfiguration::new()
    ///     .with_min_conn(8)
    ///     .with_max_conn(2)
    ///     .with_strict_validation()
    ///     .resolve();
    /// assert!(matches!(strict, Err(PoolError::InvalidParameter(_))));
    /// ```
    pub fn resolve(mut self) -> PoolResult<Self> {
        if self.max_conn == 0 {
            self.max_conn = default_max_conn();
            debug!(max_conn = self.max_conn, "max_conn unset, using host parallelism");
        }

        if self.min_conn > self.max_conn {
            if self.strict {
                return Err(PoolError::InvalidParameter(format!(
                    "min_conn ({}) exceeds max_conn ({})",
                    self.min_conn, self.max_conn
                )));
            }
            warn!(
                min_conn = self.min_conn,
                max_conn = self.max_conn,
                "min_conn exceeds max_conn, clamping"
            );
            self.min_conn = self.max_conn;
        }

        Ok(self)
    }
}

fn default_max_conn() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfiguration::default();
        assert_eq!(config.min_conn, 0);
        assert!(config.max_conn > 0);
        assert_eq!(config.idle_timeout, None);
        assert_eq!(config.acquire_timeout, None);
        assert!(!config.strict);
    }

    #[test]
    fn test_zero_max_conn_falls_back() {
        let config = PoolConfiguration::new().with_max_conn(0).resolve().unwrap();
        assert_eq!(config.max_conn, default_max_conn());
    }

    #[test]
    fn test_min_conn_clamped() {
        let config = PoolConfiguration::new()
            .with_min_conn(5)
            .with_max_conn(3)
            .resolve()
            .unwrap();
        assert_eq!(config.min_conn, 3);
        assert_eq!(config.max_conn, 3);
    }

    #[test]
    fn test_strict_rejects_min_above_max() {
        let err = PoolConfiguration::new()
            .with_min_conn(5)
            .with_max_conn(3)
            .with_strict_validation()
            .resolve()
            .unwrap_err();
        assert!(matches!(err, PoolError::InvalidParameter(_)));
    }

    #[test]
    fn test_strict_accepts_valid_sizes() {
        let config = PoolConfiguration::new()
            .with_min_conn(3)
            .with_max_conn(3)
            .with_strict_validation()
            .resolve()
            .unwrap();
        assert_eq!(config.min_conn, 3);
    }
}
