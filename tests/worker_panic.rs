//! A panicking unit of work must not wedge the pool or its other workers,
//! whether the panic comes from a plain queued task or from inside a
//! processor run.

use chunkpool::{Processor, Task, TaskPoolBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn panicking_task_is_caught_and_reported() {
    let reports = Arc::new(AtomicUsize::new(0));
    let reports2 = Arc::clone(&reports);
    let pool = TaskPoolBuilder::new()
        .num_threads(2)
        .panic_handler(move |_payload| {
            reports2.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    pool.queue_task(Task::new(|_worker_id| panic!("intentional test panic")), 1);

    let survived = Arc::new(AtomicUsize::new(0));
    let survived2 = Arc::clone(&survived);
    pool.queue_task(
        Task::new(move |_worker_id| {
            survived2.store(1, Ordering::SeqCst);
        }),
        1,
    );

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(reports.load(Ordering::SeqCst), 1);
    assert_eq!(survived.load(Ordering::SeqCst), 1);
}

#[test]
fn panicking_workload_element_does_not_stall_the_run() {
    let pool = TaskPoolBuilder::new().num_threads(4).build().unwrap();
    let processor = Processor::new(&pool, |_worker_id, x: &mut i32| {
        if *x == 5 {
            panic!("poisoned element");
        }
        *x *= 2;
    });

    let mut data: Vec<i32> = (0..10).collect();
    processor.process_slice(&mut data, 1, 4);

    // Every non-poisoned element still got processed; the run completed
    // rather than hanging.
    for (i, v) in data.iter().enumerate() {
        if i != 5 {
            assert_eq!(*v, (i as i32) * 2);
        }
    }
}
