//! Scripted memory source for tests.

use crate::convert::BYTES_PER_MIB;
use crate::source::{HeapCounters, MemorySource, SourceError, SystemMemory};

/// A [`MemorySource`] returning fixed counters, with per-section failure
/// injection. Defaults are a plausible healthy host.
#[derive(Debug, Clone)]
pub struct FakeMemorySource {
    pub heap: HeapCounters,
    pub pss_kb: u64,
    pub system: SystemMemory,
    heap_failure: bool,
    pss_failure: bool,
    system_failure: bool,
}

impl Default for FakeMemorySource {
    fn default() -> Self {
        Self {
            heap: HeapCounters {
                // Off-by-a-few values so tests observe truncation, not luck.
                used_bytes: 48 * BYTES_PER_MIB + 123,
                reserved_bytes: 96 * BYTES_PER_MIB,
                max_bytes: 512 * BYTES_PER_MIB,
            },
            pss_kb: 80 * 1024 + 7,
            system: SystemMemory {
                available_bytes: 2048 * BYTES_PER_MIB,
                total_bytes: 8192 * BYTES_PER_MIB,
                low_memory: false,
            },
            heap_failure: false,
            pss_failure: false,
            system_failure: false,
        }
    }
}

impl FakeMemorySource {
    /// Make `heap()` fail.
    pub fn fail_heap(mut self) -> Self {
        self.heap_failure = true;
        self
    }

    /// Make `process_pss_kb()` fail.
    pub fn fail_pss(mut self) -> Self {
        self.pss_failure = true;
        self
    }

    /// Make `system()` fail.
    pub fn fail_system(mut self) -> Self {
        self.system_failure = true;
        self
    }
}

impl MemorySource for FakeMemorySource {
    fn heap(&self) -> Result<HeapCounters, SourceError> {
        if self.heap_failure {
            return Err(SourceError::Unavailable(
                "injected heap counter failure".to_string(),
            ));
        }
        Ok(self.heap)
    }

    fn process_pss_kb(&self) -> Result<u64, SourceError> {
        if self.pss_failure {
            return Err(SourceError::Unavailable(
                "injected pss counter failure".to_string(),
            ));
        }
        Ok(self.pss_kb)
    }

    fn system(&self) -> Result<SystemMemory, SourceError> {
        if self.system_failure {
            return Err(SourceError::Unavailable(
                "injected system memory failure".to_string(),
            ));
        }
        Ok(self.system)
    }
}
