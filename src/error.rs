//! Hand-rolled build error and error kind, with no `thiserror`/`anyhow`
//! dependency: a single fallible entry point doesn't need one.

use std::error::Error;
use std::fmt;
use std::io;

#[derive(Debug)]
enum ErrorKind {
    ZeroThreads,
    Io(io::Error),
}

/// The error returned by `TaskPoolBuilder::build` when the requested pool
/// configuration can't be realized.
#[derive(Debug)]
pub struct BuildError {
    kind: ErrorKind,
}

impl BuildError {
    pub(crate) fn zero_threads() -> Self {
        BuildError {
            kind: ErrorKind::ZeroThreads,
        }
    }

    pub(crate) fn io(err: io::Error) -> Self {
        BuildError {
            kind: ErrorKind::Io(err),
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::ZeroThreads => {
                write!(f, "the requested task pool has no worker threads")
            }
            ErrorKind::Io(err) => write!(f, "failed to spawn worker thread: {}", err),
        }
    }
}

impl Error for BuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            ErrorKind::ZeroThreads => None,
            ErrorKind::Io(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threads_message() {
        let err = BuildError::zero_threads();
        assert!(err.to_string().contains("no worker threads"));
    }
}
