//! Core resource pool implementation

use crate::config::PoolConfiguration;
use crate::errors::{BoxError, PoolError, PoolResult};
use crate::resource::Resource;
use crate::status::PoolStatus;

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

type Factory<R> = Arc<dyn Fn() -> Result<R, BoxError> + Send + Sync>;

/// Delay between attempts of [`Pool::acquire_async`]
const ASYNC_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A resource checked out through [`Pool::get`], released when dropped
pub struct PooledResource<R: Resource> {
    resource: Option<R>,
    pool: Pool<R>,
}

impl<R: Resource> PooledResource<R> {
    fn new(resource: R, pool: Pool<R>) -> Self {
        Self {
            resource: Some(resource),
            pool,
        }
    }

    /// Hand the resource back to the pool now, surfacing any error
    pub fn release(mut self) -> PoolResult<()> {
        match self.resource.take() {
            Some(resource) => self.pool.release(resource),
            None => Ok(()),
        }
    }

    /// Retire the resource instead of returning it to the pool
    pub fn close(mut self) -> PoolResult<()> {
        match self.resource.take() {
            Some(resource) => self.pool.close(resource),
            None => Ok(()),
        }
    }

    /// Take the resource out of the guard.
    ///
    /// The pool still counts it as live; hand it back with [`Pool::release`]
    /// or [`Pool::close`].
    pub fn detach(mut self) -> R {
        self.resource.take().expect("Resource already taken")
    }
}

impl<R: Resource> Deref for PooledResource<R> {
    type Target = R;

    fn deref(&self) -> &Self::Target {
        self.resource.as_ref().expect("Resource already taken")
    }
}

impl<R: Resource> DerefMut for PooledResource<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.resource.as_mut().expect("Resource already taken")
    }
}

impl<R: Resource> Drop for PooledResource<R> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            if let Err(err) = self.pool.release(resource) {
                debug!(error = %err, "pooled resource dropped after release failed");
            }
        }
    }
}

impl<R: Resource + fmt::Debug> fmt::Debug for PooledResource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledResource")
            .field("resource", &self.resource)
            .finish()
    }
}

struct State {
    live: usize,
    closed: bool,
    // Dropping it disconnects `shutdown_rx` and wakes every waiter.
    shutdown_tx: Option<Sender<()>>,
}

struct Shared<R: Resource> {
    idle_tx: Sender<R>,
    idle_rx: Receiver<R>,
    freed_tx: Sender<()>,
    freed_rx: Receiver<()>,
    shutdown_rx: Receiver<()>,
    state: Mutex<State>,
    factory: Factory<R>,
    config: PoolConfiguration,
}

impl<R: Resource> Shared<R> {
    /// Give back one unit of capacity and wake a waiter that may use it
    fn release_slot(&self) {
        {
            let mut state = self.state.lock();
            debug_assert!(state.live > 0, "live count underflow");
            state.live = state.live.saturating_sub(1);
        }
        match self.freed_tx.try_send(()) {
            Ok(()) => {}
            // a wake-up is already pending
            Err(TrySendError::Full(())) => {}
            // the receiver lives in `self`
            Err(TrySendError::Disconnected(())) => {}
        }
    }

    /// Close a resource the pool is discarding. The slot is freed even if
    /// closing fails since nothing holds the resource afterwards.
    fn retire(&self, mut resource: R) {
        close_quietly(&mut resource);
        self.release_slot();
        debug!("retired resource");
    }
}

impl<R: Resource> Drop for Shared<R> {
    fn drop(&mut self) {
        if self.state.get_mut().closed {
            return;
        }
        for mut resource in self.idle_rx.try_iter() {
            close_quietly(&mut resource);
        }
    }
}

fn close_quietly<R: Resource>(resource: &mut R) {
    if let Err(err) = resource.close() {
        warn!(error = %err, "failed to close resource");
    }
}

/// Bounded pool of reusable resources
///
/// Resources are created by a factory on demand, up to `max_conn` live at
/// once, and checked for liveness when they are taken from the idle buffer.
/// `Pool` is a cheap handle; clones share the same pool.
///
/// # Examples
///
/// ```
/// use connpool::{BoxError, Pool, PoolConfiguration, Resource};
/// use std::time::Duration;
///
/// struct Conn(u32);
///
/// impl Resource for Conn {
///     fn close(&mut self) -> Result<(), BoxError> { Ok(()) }
///     fn is_usable(&self, _: Option<Duration>) -> bool { true }
/// }
///
/// let pool = Pool::new(|| Ok::<_, BoxError>(Conn(7)), PoolConfiguration::new().with_max_conn(2)).unwrap();
///
/// let conn = pool.acquire().unwrap();
/// assert_eq!(conn.0, 7);
/// pool.release(conn).unwrap();
///
/// pool.shutdown().unwrap();
/// assert!(pool.acquire().is_err());
/// ```
pub struct Pool<R: Resource> {
    shared: Arc<Shared<R>>,
}

impl<R: Resource> Clone for Pool<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R: Resource> fmt::Debug for Pool<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.shared.config)
            .field("status", &self.status())
            .finish()
    }
}

impl<R: Resource> Pool<R> {
    /// Create a pool and pre-create up to `min_conn` resources.
    ///
    /// Factory failures while pre-creating are logged and skipped; acquire
    /// creates the missing resources later. Only an invalid strict
    /// configuration fails construction.
    pub fn new<F, E>(factory: F, config: PoolConfiguration) -> PoolResult<Self>
    where
        F: Fn() -> Result<R, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let config = config.resolve()?;
        let factory: Factory<R> =
            Arc::new(move || -> Result<R, BoxError> { factory().map_err(Into::into) });

        let (idle_tx, idle_rx) = channel::bounded(config.max_conn);
        let (freed_tx, freed_rx) = channel::bounded(config.max_conn);
        let (shutdown_tx, shutdown_rx) = channel::bounded(0);

        let mut live = 0;
        for _ in 0..config.min_conn {
            match factory() {
                Ok(resource) => {
                    if let Err(err) = idle_tx.try_send(resource) {
                        close_quietly(&mut err.into_inner());
                        break;
                    }
                    live += 1;
                }
                Err(err) => {
                    warn!(error = %err, "failed to pre-create resource, skipping");
                }
            }
        }

        debug!(
            live,
            min_conn = config.min_conn,
            max_conn = config.max_conn,
            "pool created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                idle_tx,
                idle_rx,
                freed_tx,
                freed_rx,
                shutdown_rx,
                state: Mutex::new(State {
                    live,
                    closed: false,
                    shutdown_tx: Some(shutdown_tx),
                }),
                factory,
                config,
            }),
        })
    }

    /// Acquire a resource, waiting up to the configured `acquire_timeout`
    /// (or indefinitely) when the pool is at capacity.
    pub fn acquire(&self) -> PoolResult<R> {
        self.acquire_inner(self.shared.config.acquire_timeout)
    }

    /// Acquire a resource, failing with [`PoolError::Timeout`] if none
    /// becomes available within `timeout`.
    pub fn acquire_with_timeout(&self, timeout: Duration) -> PoolResult<R> {
        self.acquire_inner(Some(timeout))
    }

    /// Acquire a resource without blocking.
    ///
    /// Returns `Ok(None)` when nothing is idle and the pool is at capacity.
    pub fn try_acquire(&self) -> PoolResult<Option<R>> {
        if let Some(resource) = self.take_idle()? {
            return Ok(Some(resource));
        }
        self.create()
    }

    /// Pop idle resources until one passes the liveness check
    fn take_idle(&self) -> PoolResult<Option<R>> {
        loop {
            if self.shared.state.lock().closed {
                return Err(PoolError::PoolClosed);
            }
            let Ok(candidate) = self.shared.idle_rx.try_recv() else {
                break;
            };
            if let Some(resource) = self.check_out(candidate)? {
                return Ok(Some(resource));
            }
        }

        Ok(None)
    }

    /// Acquire a resource from async code.
    ///
    /// The factory runs on tokio's blocking pool, not on the calling worker.
    /// Dropping the future never strands a resource: one created after the
    /// caller went away is released into the pool.
    pub async fn acquire_async(&self) -> PoolResult<R> {
        let attempt = async {
            loop {
                match self.take_idle() {
                    Ok(Some(resource)) => return Ok(resource),
                    Ok(None) => {}
                    Err(err) => return Err(err),
                }
                if self.live_count() < self.shared.config.max_conn {
                    match self.create_blocking().await {
                        Ok(Some(resource)) => return Ok(resource),
                        Ok(None) => {}
                        Err(err) => return Err(err),
                    }
                }
                tokio::time::sleep(ASYNC_POLL_INTERVAL).await;
            }
        };

        match self.shared.config.acquire_timeout {
            Some(timeout) => tokio::time::timeout(timeout, attempt)
                .await
                .map_err(|_| PoolError::Timeout(timeout))?,
            None => attempt.await,
        }
    }

    /// Acquire a resource wrapped in a guard that releases it on drop
    pub fn get(&self) -> PoolResult<PooledResource<R>> {
        let resource = self.acquire()?;
        Ok(PooledResource::new(resource, self.clone()))
    }

    /// Async counterpart of [`get`](Self::get)
    pub async fn get_async(&self) -> PoolResult<PooledResource<R>> {
        let resource = self.acquire_async().await?;
        Ok(PooledResource::new(resource, self.clone()))
    }

    /// Return a resource to the idle buffer.
    ///
    /// On a closed pool the resource is closed and [`PoolError::PoolClosed`]
    /// returned.
    pub fn release(&self, resource: R) -> PoolResult<()> {
        let state = self.shared.state.lock();
        if state.closed {
            drop(state);
            self.shared.retire(resource);
            return Err(PoolError::PoolClosed);
        }

        // Pushed under the lock so a concurrent shutdown drains it.
        match self.shared.idle_tx.try_send(resource) {
            Ok(()) => {
                trace!("resource released");
                Ok(())
            }
            Err(TrySendError::Full(mut resource)) | Err(TrySendError::Disconnected(mut resource)) => {
                drop(state);
                warn!("idle buffer full, closing released resource");
                close_quietly(&mut resource);
                Err(PoolError::PoolFull)
            }
        }
    }

    /// Close a resource and free its slot.
    ///
    /// If closing fails the error is returned and the resource stays counted
    /// as live.
    pub fn close(&self, mut resource: R) -> PoolResult<()> {
        if let Err(err) = resource.close() {
            warn!(error = %err, "failed to close resource, keeping it counted");
            return Err(PoolError::resource_close(err));
        }
        self.shared.release_slot();
        debug!("closed resource");
        Ok(())
    }

    /// Close every idle resource and refuse further use.
    ///
    /// Idempotent. Close failures are logged, not returned. Checked-out
    /// resources are left to their holders; acquirers blocked on the pool
    /// wake with [`PoolError::PoolClosed`].
    pub fn shutdown(&self) -> PoolResult<()> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Ok(());
        }
        state.closed = true;

        let mut drained = 0;
        for mut resource in self.shared.idle_rx.try_iter() {
            close_quietly(&mut resource);
            debug_assert!(state.live > 0, "live count underflow");
            state.live = state.live.saturating_sub(1);
            drained += 1;
        }
        state.shutdown_tx.take();

        debug!(drained, in_use = state.live, "pool shut down");
        Ok(())
    }

    pub fn status(&self) -> PoolStatus {
        let state = self.shared.state.lock();
        PoolStatus::new(
            state.live,
            self.shared.idle_rx.len(),
            self.shared.config.min_conn,
            self.shared.config.max_conn,
            state.closed,
        )
    }

    /// Resources created and not yet closed, idle or in use
    pub fn live_count(&self) -> usize {
        self.shared.state.lock().live
    }

    pub fn idle_count(&self) -> usize {
        self.shared.idle_rx.len()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// The configuration after resolution (clamping, defaults)
    pub fn config(&self) -> &PoolConfiguration {
        &self.shared.config
    }

    fn acquire_inner(&self, timeout: Option<Duration>) -> PoolResult<R> {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t).map(|at| (at, t)));

        loop {
            if let Some(resource) = self.try_acquire()? {
                return Ok(resource);
            }
            trace!("pool at capacity, waiting");
            if let Some(candidate) = self.wait(deadline)? {
                if let Some(resource) = self.check_out(candidate)? {
                    return Ok(resource);
                }
            }
        }
    }

    /// Block until a resource is released, capacity is freed, the pool
    /// shuts down or the deadline passes. `Ok(None)` means "look again".
    fn wait(&self, deadline: Option<(Instant, Duration)>) -> PoolResult<Option<R>> {
        let shared = &*self.shared;
        match deadline {
            Some((at, timeout)) => {
                let remaining = at.saturating_duration_since(Instant::now());
                channel::select! {
                    recv(shared.idle_rx) -> msg => Ok(msg.ok()),
                    recv(shared.freed_rx) -> _ => Ok(None),
                    recv(shared.shutdown_rx) -> _ => Err(PoolError::PoolClosed),
                    default(remaining) => Err(PoolError::Timeout(timeout)),
                }
            }
            None => {
                channel::select! {
                    recv(shared.idle_rx) -> msg => Ok(msg.ok()),
                    recv(shared.freed_rx) -> _ => Ok(None),
                    recv(shared.shutdown_rx) -> _ => Err(PoolError::PoolClosed),
                }
            }
        }
    }

    /// Liveness check for a resource taken from the idle buffer. Stale
    /// resources are retired and `Ok(None)` returned.
    fn check_out(&self, candidate: R) -> PoolResult<Option<R>> {
        if self.shared.state.lock().closed {
            self.shared.retire(candidate);
            return Err(PoolError::PoolClosed);
        }
        if candidate.is_usable(self.shared.config.idle_timeout) {
            trace!("reusing idle resource");
            return Ok(Some(candidate));
        }
        debug!("idle resource no longer usable");
        self.shared.retire(candidate);
        Ok(None)
    }

    /// [`create`](Self::create) on tokio's blocking pool
    async fn create_blocking(&self) -> PoolResult<Option<R>> {
        let pool = self.clone();
        let (tx, rx) = tokio::sync::oneshot::channel();

        tokio::task::spawn_blocking(move || {
            if let Err(Ok(Some(resource))) = tx.send(pool.create()) {
                trace!("acquirer gone, keeping created resource");
                if let Err(err) = pool.release(resource) {
                    debug!(error = %err, "could not keep created resource");
                }
            }
        });

        rx.await.map_err(|_| PoolError::Cancelled)?
    }

    /// Create a resource if under capacity. The slot is reserved before the
    /// factory runs so the lock is not held during creation.
    fn create(&self) -> PoolResult<Option<R>> {
        {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(PoolError::PoolClosed);
            }
            if state.live >= self.shared.config.max_conn {
                return Ok(None);
            }
            state.live += 1;
        }

        match (self.shared.factory)() {
            Ok(mut resource) => {
                let mut state = self.shared.state.lock();
                if state.closed {
                    debug_assert!(state.live > 0, "live count underflow");
                    state.live = state.live.saturating_sub(1);
                    drop(state);
                    close_quietly(&mut resource);
                    return Err(PoolError::PoolClosed);
                }
                debug!(live = state.live, "created resource");
                Ok(Some(resource))
            }
            Err(err) => {
                self.shared.release_slot();
                debug!(error = %err, "factory failed");
                Err(PoolError::factory(err))
            }
        }
    }
}
