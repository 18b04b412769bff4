//! Point-in-time view of a pool

/// Snapshot of a pool's accounting
///
/// # Examples
///
/// ```
/// use connpool::{BoxError, Pool, PoolConfiguration, Resource};
/// use std::time::Duration;
///
/// struct Noop;
///
/// impl Resource for Noop {
///     fn close(&mut self) -> Result<(), BoxError> { Ok(()) }
///     fn is_usable(&self, _: Option<Duration>) -> bool { true }
/// }
///
/// let pool = Pool::new(
///     || Ok::<_, BoxError>(Noop),
///     PoolConfiguration::new().with_min_conn(2).with_max_conn(4),
/// )
/// .unwrap();
///
/// let status = pool.status();
/// assert_eq!(status.live, 2);
/// assert_eq!(status.idle, 2);
/// assert_eq!(status.in_use, 0);
/// assert!(!status.closed);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolStatus {
    /// Resources created and not yet closed
    pub live: usize,

    /// Resources waiting in the idle buffer
    pub idle: usize,

    /// Resources currently checked out
    pub in_use: usize,

    pub min_conn: usize,

    pub max_conn: usize,

    /// Whether the pool has been shut down
    pub closed: bool,

    /// `live / max_conn` (0.0 to 1.0)
    pub utilization: f64,
}

impl PoolStatus {
    pub(crate) fn new(live: usize, idle: usize, min_conn: usize, max_conn: usize, closed: bool) -> Self {
        let utilization = if max_conn > 0 {
            live as f64 / max_conn as f64
        } else {
            0.0
        };

        Self {
            live,
            // idle may be read a moment after live, so never underflow
            in_use: live.saturating_sub(idle),
            idle,
            min_conn,
            max_conn,
            closed,
            utilization,
        }
    }

    /// Whether every permitted resource is live
    pub fn is_saturated(&self) -> bool {
        self.live >= self.max_conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utilization() {
        let status = PoolStatus::new(3, 1, 0, 4, false);
        assert_eq!(status.in_use, 2);
        assert!((status.utilization - 0.75).abs() < f64::EPSILON);
        assert!(!status.is_saturated());
    }

    #[test]
    fn test_saturated() {
        let status = PoolStatus::new(4, 0, 0, 4, false);
        assert!(status.is_saturated());
        assert_eq!(status.in_use, 4);
    }
}
