//! The capability interface between query dispatch and the platform.

use thiserror::Error;

/// Process heap counters, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapCounters {
    /// Bytes currently live in the process allocator.
    pub used_bytes: u64,
    /// Resident-set size: physical memory the OS currently holds for us.
    pub reserved_bytes: u64,
    /// Upper bound the process may grow to.
    pub max_bytes: u64,
}

/// Host-wide memory state at sample time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemMemory {
    /// Memory available system-wide, in bytes.
    pub available_bytes: u64,
    /// Total physical memory, in bytes.
    pub total_bytes: u64,
    /// Whether available memory has dropped below the low-memory threshold.
    pub low_memory: bool,
}

/// A source of memory counters.
///
/// Every operation is read-only and fallible; implementations must not keep
/// mutable state between calls, so concurrent samples are independent.
pub trait MemorySource: Send + Sync {
    /// Current process heap counters.
    fn heap(&self) -> Result<HeapCounters, SourceError>;

    /// Proportional set size attributed to this process, in kilobytes.
    fn process_pss_kb(&self) -> Result<u64, SourceError>;

    /// Host-wide memory state.
    fn system(&self) -> Result<SystemMemory, SourceError>;
}

/// Failure to read an underlying counter.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    ProcRead {
        path: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("counter {counter} not present in {path}")]
    CounterMissing {
        counter: &'static str,
        path: &'static str,
    },

    #[error("memory status facility unavailable: {0}")]
    Unavailable(String),
}
