// Error types for the route resolver

use std::io;
use thiserror::Error;

/// Failure while reading the kernel routing table
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("sysctl() error ({stage}): {source}")]
    Sysctl {
        stage: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Failed to allocate enough memory after {0} tries")]
    OutOfAttempts(u32),

    #[error("Routing table size estimate too large: {0} bytes")]
    TableTooLarge(usize),

    #[error("Routing table introspection is not available on this platform")]
    Unsupported,
}

/// Result type alias using RouteError
pub type RouteResult<T> = Result<T, RouteError>;

impl RouteError {
    pub(crate) fn estimate(source: io::Error) -> Self {
        RouteError::Sysctl {
            stage: "estimate",
            source,
        }
    }

    pub(crate) fn dump(source: io::Error) -> Self {
        RouteError::Sysctl {
            stage: "dump",
            source,
        }
    }

    /// Raw OS error code of a failed system call, if any
    pub fn code(&self) -> Option<i32> {
        match self {
            RouteError::Sysctl { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

/// The kernel reports ENOMEM when the table grew past the buffer between
/// the size estimate and the dump
pub(crate) fn is_buffer_too_small(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::OutOfMemory
}
