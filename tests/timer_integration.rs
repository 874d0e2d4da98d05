//! 定时器公共接口集成测试
//! Timer public API integration tests

pub mod common;

use common::{FireLog, init_tracing};
use expiry_timer::{Error, Timer, TimerConfig};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::time::{Duration, Instant, sleep, timeout};

#[tokio::test(start_paused = true)]
async fn test_add_del_set_firing_order() {
    init_tracing();
    let timer = Timer::new(TimerConfig::default().with_growth_batch_size(8)).unwrap();
    let log = FireLog::default();
    let now = Instant::now();

    let ids: Vec<u64> = (0..10u64)
        .map(|i| timer.add(now + Duration::from_millis(i), log.recorder(i + 1)))
        .collect();
    assert_eq!(ids, (1..=10).collect::<Vec<_>>());

    timer.del(ids[0]);
    timer.del(ids[9]);
    timer.del(ids[7]);
    let err = timer.set(ids[7], now + Duration::from_secs(1)).unwrap_err();
    assert!(matches!(err, Error::UnknownTask(8)));
    assert_eq!(err.to_string(), "timer: task 8 does not exist");
    timer.set(ids[4], now + Duration::from_millis(20)).unwrap();

    sleep(Duration::from_millis(50)).await;
    assert_eq!(log.entries(), vec![2, 3, 4, 6, 7, 9, 5]);

    timer.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_equal_expiries_fire_in_insertion_order() {
    init_tracing();
    let timer = Timer::new(TimerConfig::default()).unwrap();
    let log = FireLog::default();
    let at = Instant::now() + Duration::from_millis(10);

    let first = timer.add(at, log.recorder(1));
    timer.add(at, log.recorder(2));
    timer.add(at, log.recorder(3));
    // Re-setting to the same instant moves the task to the back of the run.
    timer.set(first, at).unwrap();

    sleep(Duration::from_millis(20)).await;
    assert_eq!(log.entries(), vec![2, 3, 1]);
    timer.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_random_schedule_fires_in_expiry_order() {
    init_tracing();
    let timer = Timer::new(TimerConfig::default().with_growth_batch_size(16)).unwrap();
    let fired = Arc::new(Mutex::new(Vec::new()));
    let base = Instant::now();
    let mut rng = rand::rng();

    for _ in 0..300 {
        let offset = rng.random_range(0..100u64);
        let fired = fired.clone();
        timer.add(base + Duration::from_millis(offset), move || {
            fired.lock().unwrap().push(offset);
        });
    }

    sleep(Duration::from_millis(200)).await;
    let fired = fired.lock().unwrap().clone();
    assert_eq!(fired.len(), 300);
    assert!(fired.windows(2).all(|pair| pair[0] <= pair[1]));

    let stats = timer.stats();
    assert_eq!(stats.fired, 300);
    assert!(stats.pooled <= 32);
    timer.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_pool_stays_within_ceiling() {
    init_tracing();
    let timer = Timer::new(TimerConfig::default().with_growth_batch_size(4)).unwrap();
    let later = Instant::now() + Duration::from_secs(60);

    let ids: Vec<u64> = (0..50).map(|_| timer.add(later, || {})).collect();
    assert_eq!(timer.len(), 50);
    for id in ids {
        timer.del(id);
    }

    let stats = timer.stats();
    assert!(timer.is_empty());
    assert_eq!(stats.pooled, 8);
    assert_eq!(stats.allocated, 8);
    timer.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_callers() {
    init_tracing();
    let timer = Timer::new(TimerConfig::default()).unwrap();
    let fired = Arc::new(Mutex::new(Vec::new()));
    let done = Arc::new(Notify::new());
    let base = Instant::now() + Duration::from_millis(200);
    const EXPECTED: usize = 4 * 45;

    let workers: Vec<_> = (0..4u64)
        .map(|worker| {
            let handle = timer.handle();
            let fired = fired.clone();
            let done = done.clone();
            tokio::task::spawn_blocking(move || {
                for i in 0..50u64 {
                    let offset = (i * 7 + worker * 3) % 40;
                    let fired = fired.clone();
                    let done = done.clone();
                    let id = handle.add(base + Duration::from_millis(offset), move || {
                        let mut fired = fired.lock().unwrap();
                        fired.push(offset);
                        if fired.len() == EXPECTED {
                            done.notify_one();
                        }
                    });
                    if i % 10 == 0 {
                        handle.del(id);
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.await.unwrap();
    }

    timeout(Duration::from_secs(10), done.notified())
        .await
        .expect("every live task should fire");
    let fired = fired.lock().unwrap().clone();
    assert_eq!(fired.len(), EXPECTED);
    assert!(fired.windows(2).all(|pair| pair[0] <= pair[1]));

    let stats = timer.stats();
    assert_eq!(stats.cancelled, 4 * 5);
    assert_eq!(stats.pending, 0);

    timer.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_overdue_backlog_fires_promptly() {
    init_tracing();
    let timer = Timer::new(TimerConfig::default()).unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(Notify::new());
    const TASKS: usize = 500;

    let now = Instant::now();
    for _ in 0..TASKS {
        let count = count.clone();
        let done = done.clone();
        timer.add(now, move || {
            if count.fetch_add(1, Ordering::SeqCst) + 1 == TASKS {
                done.notify_one();
            }
        });
    }

    // One timer tick per task would need at least half a second.
    timeout(Duration::from_millis(250), done.notified())
        .await
        .expect("overdue tasks should fire without waiting on timer ticks");
    assert_eq!(count.load(Ordering::SeqCst), TASKS);
    assert!(timer.is_empty());

    timer.shutdown().await.unwrap();
}
