//! # connpool
//!
//! Bounded, thread-safe pool for expensive reusable resources such as
//! network connections.
//!
//! ## Features
//!
//! - Factory-driven lazy creation up to a fixed number of live resources
//! - Best-effort pre-warming of a minimum number of resources
//! - Liveness check (with optional idle timeout) when a resource is reused
//! - Blocking acquire that wakes on release, freed capacity or shutdown
//! - Bounded waits and a cancellation-safe async acquire
//! - Guard type that returns the resource to the pool when dropped
//!
//! ## Quick Start
//!
//! ```rust
//! use connpool::{BoxError, IdleStamp, Pool, PoolConfiguration, Resource};
//! use std::time::Duration;
//!
//! struct Conn {
//!     stamp: IdleStamp,
//! }
//!
//! impl Resource for Conn {
//!     fn close(&mut self) -> Result<(), BoxError> {
//!         Ok(())
//!     }
//!
//!     fn is_usable(&self, idle_timeout: Option<Duration>) -> bool {
//!         self.stamp.is_fresh(idle_timeout)
//!     }
//! }
//!
//! let config = PoolConfiguration::new()
//!     .with_min_conn(1)
//!     .with_max_conn(4)
//!     .with_idle_timeout(Duration::from_secs(30));
//!
//! let pool = Pool::new(|| Ok::<_, BoxError>(Conn { stamp: IdleStamp::new() }), config).unwrap();
//! {
//!     let _conn = pool.get().unwrap();
//!     // returned to the pool when `_conn` goes out of scope
//! }
//! assert_eq!(pool.idle_count(), 1);
//! pool.shutdown().unwrap();
//! ```

mod config;
mod errors;
mod pool;
mod resource;
mod status;

pub use config::PoolConfiguration;
pub use errors::{BoxError, PoolError, PoolResult};
pub use pool::{Pool, PooledResource};
pub use resource::{IdleStamp, Resource};
pub use status::PoolStatus;
