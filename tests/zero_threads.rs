//! Building a pool with zero threads must fail cleanly, not panic or hang.

use chunkpool::TaskPoolBuilder;

#[test]
fn zero_threads_is_a_build_error() {
    let result = TaskPoolBuilder::new().num_threads(0).build();
    assert!(result.is_err());
    let err = result.unwrap_err();
    assert!(err.to_string().contains("no worker threads"));
}

#[test]
fn nonzero_threads_builds_successfully() {
    let pool = TaskPoolBuilder::new().num_threads(3).build();
    assert!(pool.is_ok());
    assert_eq!(pool.unwrap().thread_count(), 3);
}
