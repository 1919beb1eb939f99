//! Propiedades de concurrencia del pool, las métricas y el flag del cache

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use threadpool_server::pool::{PoolOptions, ShutdownReport};
use threadpool_server::{
    CacheController, Dispatcher, MetricsAggregator, MetricsSnapshot, PoolError, TaskError,
    WorkerPool,
};

fn dispatcher(workers: usize) -> Dispatcher {
    let options = PoolOptions {
        poll_interval: Duration::from_millis(20),
        join_timeout: None,
        ..PoolOptions::default()
    };
    Dispatcher::new(
        Arc::new(WorkerPool::with_options(workers, options).unwrap()),
        Arc::new(MetricsAggregator::new()),
        Arc::new(CacheController::new(false)),
    )
}

fn wait_for_total(d: &Dispatcher, total: u64, limit: Duration) -> MetricsSnapshot {
    let deadline = Instant::now() + limit;
    loop {
        let snap = d.snapshot();
        if snap.total_requests >= total || Instant::now() >= deadline {
            return snap;
        }
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn hundred_sleeping_tasks_on_eight_workers() {
    let d = dispatcher(8);
    let start = Instant::now();

    for _ in 0..100 {
        d.dispatch(|_| {
            thread::sleep(Duration::from_millis(10));
            Ok(())
        })
        .unwrap();
    }

    let snap = wait_for_total(&d, 100, Duration::from_secs(10));
    let elapsed = start.elapsed();

    assert_eq!(snap.total_requests, 100);
    assert_eq!(snap.failed, 0);
    assert_eq!(snap.success_rate, 100.0);
    assert!(snap.avg_response_time >= 0.009, "avg {}", snap.avg_response_time);
    assert!(snap.avg_response_time < 0.05, "avg {}", snap.avg_response_time);
    // Ideal ~125 ms; la cota sólo descarta ejecución secuencial (~1 s)
    assert!(elapsed < Duration::from_millis(900), "elapsed {:?}", elapsed);

    d.pool().shutdown(true);
}

#[test]
fn every_fifth_task_fails_and_workers_survive() {
    let d = dispatcher(8);

    for i in 0..50 {
        d.dispatch(move |_| {
            if i % 5 == 4 {
                Err(TaskError::failed(format!("task {} failed", i)))
            } else {
                Ok(())
            }
        })
        .unwrap();
    }

    let snap = wait_for_total(&d, 50, Duration::from_secs(10));
    assert_eq!(snap.total_requests, 50);
    assert_eq!(snap.failed, 10);
    assert_eq!(snap.successful, 40);
    assert!((snap.success_rate - 80.0).abs() < 1e-9);

    assert_eq!(d.pool().live_workers(), 8);
    d.dispatch(|_| Ok(())).unwrap();
    let snap = wait_for_total(&d, 51, Duration::from_secs(5));
    assert_eq!(snap.successful, 41);

    d.pool().shutdown(true);
}

#[test]
fn panicking_tasks_count_as_failures() {
    let d = dispatcher(2);
    for _ in 0..4 {
        d.dispatch(|_| panic!("task blew up")).unwrap();
    }

    let snap = wait_for_total(&d, 4, Duration::from_secs(5));
    assert_eq!(snap.failed, 4);
    assert_eq!(d.pool().live_workers(), 2);

    d.pool().shutdown(true);
}

#[test]
fn shutdown_accounts_for_every_task() {
    let d = dispatcher(2);
    let submitted = 40;

    for _ in 0..submitted {
        d.dispatch(|_| {
            thread::sleep(Duration::from_millis(5));
            Ok(())
        })
        .unwrap();
    }

    let report: ShutdownReport = d.pool().shutdown(true);
    assert!(report.is_complete());
    assert_eq!(report.joined, 2);

    // Lo que se sacó de la cola terminó; lo demás quedó abandonado
    let snap = d.snapshot();
    assert_eq!(snap.total_requests + report.abandoned as u64, submitted);
    assert!(matches!(d.dispatch(|_| Ok(())), Err(PoolError::ShutDown)));
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[test]
fn abandoned_tasks_are_released_at_shutdown() {
    let d = dispatcher(1);
    let started = Arc::new(AtomicBool::new(false));

    let s = Arc::clone(&started);
    d.dispatch(move |_| {
        s.store(true, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(200));
        Ok(())
    })
    .unwrap();

    // La tarea encolada mantiene vivo al propio dispatcher
    let dropped = Arc::new(AtomicBool::new(false));
    let flag = DropFlag(Arc::clone(&dropped));
    let held = d.clone();
    d.dispatch(move |_| {
        let _captures = (&flag, &held);
        Ok(())
    })
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    while !started.load(Ordering::SeqCst) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
    }

    let report = d.pool().shutdown(true);
    assert_eq!(report.abandoned, 1);
    assert!(dropped.load(Ordering::SeqCst));
    assert_eq!(d.pool().queue_size(), 0);
    assert_eq!(d.snapshot().total_requests, 1);

    assert_eq!(d.pool().shutdown(true).abandoned, 0);
}

#[test]
fn zero_workers_is_rejected() {
    assert!(matches!(
        WorkerPool::new(0),
        Err(PoolError::InvalidWorkerCount(0))
    ));
}

#[test]
fn concurrent_records_are_consistent() {
    let metrics = Arc::new(MetricsAggregator::new());
    let threads = 8;
    let per_thread = 250;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let metrics = Arc::clone(&metrics);
            thread::spawn(move || {
                for i in 0..per_thread {
                    metrics.record((t + i) % 4 != 0, Duration::from_millis(2));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snap = metrics.snapshot();
    let n = (threads * per_thread) as u64;
    assert_eq!(snap.total_requests, n);
    assert_eq!(snap.successful + snap.failed, n);
    assert!((snap.avg_response_time - 0.002).abs() < 1e-9);
    let expected_rate = snap.successful as f64 / n as f64 * 100.0;
    assert!((snap.success_rate - expected_rate).abs() < 1e-9);
}

#[test]
fn empty_snapshot_has_zero_rates() {
    let snap = MetricsAggregator::new().snapshot();
    assert_eq!(snap.total_requests, 0);
    assert_eq!(snap.success_rate, 0.0);
    assert_eq!(snap.avg_response_time, 0.0);
}

#[test]
fn toggle_is_an_involution_under_contention() {
    let cache = Arc::new(CacheController::new(false));

    assert!(cache.toggle());
    assert!(!cache.toggle());

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for _ in 0..100 {
                    cache.toggle();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // 1000 inversiones: vuelve al valor original
    assert!(!cache.is_enabled());
}

#[test]
fn independent_pools_do_not_share_metrics() {
    let a = dispatcher(1);
    let b = dispatcher(1);

    a.dispatch(|_| Ok(())).unwrap();
    wait_for_total(&a, 1, Duration::from_secs(5));

    assert_eq!(a.snapshot().total_requests, 1);
    assert_eq!(b.snapshot().total_requests, 0);

    a.pool().shutdown(true);
    b.pool().shutdown(true);
}
