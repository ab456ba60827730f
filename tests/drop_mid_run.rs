//! Dropping a processor while a run is in flight must abort it and join
//! every driver task in bounded time, never leaving the pool's workers
//! stuck processing a buffer that no longer exists.

use chunkpool::{Processor, TaskPoolBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[test]
fn dropping_a_processor_mid_run_returns_promptly() {
    let pool = TaskPoolBuilder::new().num_threads(4).build().unwrap();
    let touched = Arc::new(AtomicUsize::new(0));

    let mut data: Vec<u64> = (0..5000).collect();
    let ptr = data.as_mut_ptr();
    let len = data.len();

    {
        let touched = Arc::clone(&touched);
        let processor = Processor::new(&pool, move |_worker_id, x: &mut u64| {
            touched.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_micros(200));
            *x = *x + 1;
        });

        // SAFETY: `data` outlives this block, and nothing else touches it
        // while the processor (dropped at the end of this block) is alive.
        unsafe {
            assert!(processor.start_processing(ptr, len, 1, 4));
        }
        std::thread::sleep(Duration::from_millis(5));

        let start = Instant::now();
        drop(processor); // must abort and join within a bounded window
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    // The pool itself is still usable afterward.
    let processor = Processor::new(&pool, |_worker_id, x: &mut u64| *x += 1);
    let mut more: Vec<u64> = vec![1, 2, 3];
    assert!(processor.process_slice(&mut more, 1, 2));
    assert_eq!(more, vec![2, 3, 4]);
}
