//! Error types for the resource pool

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Boxed error produced by factories and by [`Resource::close`](crate::Resource::close)
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Error, Debug, Clone)]
pub enum PoolError {
    #[error("Invalid pool parameter: {0}")]
    InvalidParameter(String),

    #[error("Pool is closed")]
    PoolClosed,

    #[error("Pool is at maximum capacity")]
    PoolFull,

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Operation was cancelled")]
    Cancelled,

    /// The factory failed; its error is kept as the source.
    #[error("Factory failed to create a resource: {0}")]
    Factory(#[source] Arc<dyn StdError + Send + Sync + 'static>),

    #[error("Failed to close resource: {0}")]
    ResourceClose(#[source] Arc<dyn StdError + Send + Sync + 'static>),
}

impl PoolError {
    pub(crate) fn factory(err: BoxError) -> Self {
        PoolError::Factory(Arc::from(err))
    }

    pub(crate) fn resource_close(err: BoxError) -> Self {
        PoolError::ResourceClose(Arc::from(err))
    }

    /// Whether this error means the pool has been shut down
    pub fn is_closed(&self) -> bool {
        matches!(self, PoolError::PoolClosed)
    }
}

pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_factory_error_keeps_source() {
        let err = PoolError::factory(Box::new(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "refused",
        )));

        match &err {
            PoolError::Factory(inner) => {
                let io_err = inner.downcast_ref::<io::Error>().unwrap();
                assert_eq!(io_err.kind(), io::ErrorKind::ConnectionRefused);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("refused"));
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn test_is_closed() {
        assert!(PoolError::PoolClosed.is_closed());
        assert!(!PoolError::PoolFull.is_closed());
    }
}
