use connpool::{BoxError, Pool, PoolConfiguration, Resource};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

struct NoopConn;

impl Resource for NoopConn {
    fn close(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    fn is_usable(&self, _idle_timeout: Option<Duration>) -> bool {
        true
    }
}

fn acquire_release(c: &mut Criterion) {
    let pool = Pool::new(
        || Ok::<_, BoxError>(NoopConn),
        PoolConfiguration::new().with_min_conn(4).with_max_conn(4),
    )
    .unwrap();

    c.bench_function("acquire_release", |b| {
        b.iter(|| {
            let conn = pool.acquire().unwrap();
            pool.release(black_box(conn)).unwrap();
        })
    });

    c.bench_function("guard_get_drop", |b| {
        b.iter(|| {
            let conn = pool.get().unwrap();
            black_box(&*conn);
        })
    });
}

criterion_group!(benches, acquire_release);
criterion_main!(benches);
