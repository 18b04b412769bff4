//! Capability interface for pooled resources

use crate::errors::BoxError;

use std::time::{Duration, Instant};

/// A closable, reusable handle managed by a [`Pool`](crate::Pool)
///
/// The pool never looks inside a resource. It only asks whether the resource
/// can still be handed out and closes it when retiring it.
///
/// # Examples
///
/// ```
/// use connpool::{BoxError, IdleStamp, Resource};
/// use std::time::Duration;
///
/// struct Session {
///     stamp: IdleStamp,
/// }
///
/// impl Resource for Session {
///     fn close(&mut self) -> Result<(), BoxError> {
///         Ok(())
///     }
///
///     fn is_usable(&self, idle_timeout: Option<Duration>) -> bool {
///         self.stamp.is_fresh(idle_timeout)
///     }
/// }
/// ```
pub trait Resource: Send + 'static {
    /// Release whatever the resource holds (socket, handle, ...)
    fn close(&mut self) -> Result<(), BoxError>;

    /// Whether the resource may be handed out right now.
    ///
    /// `idle_timeout` is the pool's configured threshold; `None` means age
    /// alone never makes a resource stale.
    fn is_usable(&self, idle_timeout: Option<Duration>) -> bool;
}

/// Timestamps for answering [`Resource::is_usable`] against an idle timeout
///
/// A resource is fresh while `last_used + idle_timeout` is still in the
/// future, so a zero timeout makes every resource stale.
///
/// # Examples
///
/// ```
/// use connpool::IdleStamp;
/// use std::time::Duration;
///
/// let stamp = IdleStamp::new();
/// assert!(stamp.is_fresh(None));
/// assert!(stamp.is_fresh(Some(Duration::from_secs(60))));
/// assert!(!stamp.is_fresh(Some(Duration::ZERO)));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct IdleStamp {
    created_at: Instant,
    last_used: Instant,
}

impl IdleStamp {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            created_at: now,
            last_used: now,
        }
    }

    /// Mark the resource as used just now
    pub fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_used(&self) -> Instant {
        self.last_used
    }

    /// Time elapsed since the last [`touch`](Self::touch) (or creation)
    pub fn idle_for(&self) -> Duration {
        self.last_used.elapsed()
    }

    pub fn is_fresh(&self, idle_timeout: Option<Duration>) -> bool {
        match idle_timeout {
            None => true,
            Some(timeout) => self.idle_for() < timeout,
        }
    }
}

impl Default for IdleStamp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_stamp_goes_stale() {
        let stamp = IdleStamp::new();
        thread::sleep(Duration::from_millis(20));
        assert!(!stamp.is_fresh(Some(Duration::from_millis(5))));
        assert!(stamp.is_fresh(Some(Duration::from_secs(60))));
        assert!(stamp.is_fresh(None));
    }

    #[test]
    fn test_touch_resets_idle_time() {
        let mut stamp = IdleStamp::new();
        thread::sleep(Duration::from_millis(20));
        stamp.touch();
        assert!(stamp.idle_for() < Duration::from_millis(20));
        assert!(stamp.last_used() > stamp.created_at());
    }
}
