// connpool demo
// Runs a handful of workers against a small pool of simulated connections.
// Set RUST_LOG=connpool=debug to watch resources being created and retired.

use connpool::{BoxError, IdleStamp, Pool, PoolConfiguration, Resource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

struct DemoConn {
    id: usize,
    stamp: IdleStamp,
}

impl Resource for DemoConn {
    fn close(&mut self) -> Result<(), BoxError> {
        info!(id = self.id, "closing connection");
        Ok(())
    }

    fn is_usable(&self, idle_timeout: Option<Duration>) -> bool {
        self.stamp.is_fresh(idle_timeout)
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let next_id = Arc::new(AtomicUsize::new(0));
    let config = PoolConfiguration::new()
        .with_min_conn(2)
        .with_max_conn(4)
        .with_idle_timeout(Duration::from_millis(200));

    let pool = match Pool::new(
        move || {
            let id = next_id.fetch_add(1, Ordering::Relaxed);
            Ok::<_, BoxError>(DemoConn {
                id,
                stamp: IdleStamp::new(),
            })
        },
        config,
    ) {
        Ok(pool) => pool,
        Err(err) => {
            error!(error = %err, "failed to build pool");
            return;
        }
    };

    info!(status = ?pool.status(), "pool ready");

    let workers: Vec<_> = (0..8)
        .map(|worker| {
            let pool = pool.clone();
            thread::spawn(move || match pool.get() {
                Ok(mut conn) => {
                    conn.stamp.touch();
                    info!(worker, conn = conn.id, "working");
                    thread::sleep(Duration::from_millis(100));
                }
                Err(err) => error!(worker, error = %err, "acquire failed"),
            })
        })
        .collect();

    for worker in workers {
        if worker.join().is_err() {
            error!("worker panicked");
        }
    }

    info!(status = ?pool.status(), "workers done");

    // let the idle connections go stale, the next acquire replaces one
    thread::sleep(Duration::from_millis(250));
    if let Ok(conn) = pool.get() {
        info!(conn = conn.id, "after idle timeout");
    }

    if let Err(err) = pool.shutdown() {
        error!(error = %err, "shutdown failed");
    }
    info!(status = ?pool.status(), "pool shut down");
}
