//! A chunked data-parallel processing engine built on a shared worker pool.
//!
//! A [`TaskPool`] owns a fixed set of OS threads and a FIFO task queue; a
//! [`Processor`] drives a workload closure over a buffer by splitting it
//! into dynamically-claimed chunks and dispatching one driver task per
//! worker onto the pool. Processors are cheap to create and are meant to be
//! reused across many runs against the same pool.
//!
//! ```
//! use chunkpool::{Processor, TaskPoolBuilder};
//!
//! let pool = TaskPoolBuilder::new().num_threads(4).build().unwrap();
//! let processor = Processor::new(&pool, |_worker_id, x: &mut i32| *x *= *x);
//!
//! let mut data: Vec<i32> = (0..16).collect();
//! processor.process_slice(&mut data, 4, 4);
//! assert_eq!(data[3], 9);
//! ```

mod error;
mod job;
mod latch;
mod log;
mod pool;
mod processor;
mod queue;
mod unwind;

pub use error::BuildError;
pub use job::Task;
pub use latch::{CountdownLatch, Counter, OneShotLatch};
pub use pool::{TaskPool, TaskPoolBuilder};
pub use processor::Processor;
