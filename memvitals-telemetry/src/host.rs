//! Platform implementation of [`MemorySource`].
//!
//! Process counters come from procfs on Linux (`/proc/self/status`,
//! `/proc/self/smaps_rollup`) and from sysinfo elsewhere; host-wide state
//! always comes from sysinfo. A fresh `System` is built per sample so calls
//! share no mutable state.

use sysinfo::System;
use tracing::debug;

use crate::alloc;
use crate::source::{HeapCounters, MemorySource, SourceError, SystemMemory};

#[cfg(target_os = "linux")]
const PROC_STATUS: &str = "/proc/self/status";
#[cfg(target_os = "linux")]
const PROC_SMAPS_ROLLUP: &str = "/proc/self/smaps_rollup";

/// Memory source backed by the host OS.
pub struct HostMemorySource {
    low_mem_threshold_percent: u8,
}

impl HostMemorySource {
    /// `low_mem_threshold_percent` is the available/total percentage below
    /// which the host is reported as low on memory.
    pub fn new(low_mem_threshold_percent: u8) -> Self {
        Self {
            low_mem_threshold_percent,
        }
    }

    /// Resident-set size of this process, in bytes.
    fn resident_bytes() -> Result<u64, SourceError> {
        #[cfg(target_os = "linux")]
        {
            read_status_counter_kb("VmRSS:", "VmRSS").map(|kb| kb * 1024)
        }

        #[cfg(not(target_os = "linux"))]
        {
            current_process_memory()
        }
    }

    /// Soft address-space rlimit, if one is set.
    #[cfg(unix)]
    fn address_space_limit() -> Option<u64> {
        use nix::sys::resource::{getrlimit, Resource, RLIM_INFINITY};

        match getrlimit(Resource::RLIMIT_AS) {
            Ok((soft, _hard)) if soft != RLIM_INFINITY && soft > 0 => Some(soft),
            _ => None,
        }
    }

    #[cfg(not(unix))]
    fn address_space_limit() -> Option<u64> {
        None
    }
}

impl MemorySource for HostMemorySource {
    fn heap(&self) -> Result<HeapCounters, SourceError> {
        let reserved_bytes = Self::resident_bytes()?;

        // When the tracking allocator is not installed, the best available
        // "in use" figure is the resident size itself.
        let used_bytes = alloc::live_bytes().unwrap_or(reserved_bytes);

        let max_bytes = match Self::address_space_limit() {
            Some(limit) => limit,
            None => total_physical_bytes()?,
        };

        debug!(used_bytes, reserved_bytes, max_bytes, "sampled heap counters");

        Ok(HeapCounters {
            used_bytes,
            reserved_bytes,
            max_bytes,
        })
    }

    fn process_pss_kb(&self) -> Result<u64, SourceError> {
        #[cfg(target_os = "linux")]
        {
            match std::fs::read_to_string(PROC_SMAPS_ROLLUP) {
                Ok(contents) => {
                    parse_counter_kb(&contents, "Pss:").ok_or(SourceError::CounterMissing {
                        counter: "Pss",
                        path: PROC_SMAPS_ROLLUP,
                    })
                }
                // smaps_rollup appeared in kernel 4.14; older kernels get RSS.
                Err(_) => read_status_counter_kb("VmRSS:", "VmRSS"),
            }
        }

        #[cfg(not(target_os = "linux"))]
        {
            // No PSS attribution outside Linux; resident size is the closest
            // per-process figure the OS offers.
            Ok(Self::resident_bytes()? / 1024)
        }
    }

    fn system(&self) -> Result<SystemMemory, SourceError> {
        let mut sys = System::new();
        sys.refresh_memory();

        let total_bytes = sys.total_memory();
        if total_bytes == 0 {
            return Err(SourceError::Unavailable(
                "total physical memory reported as zero".to_string(),
            ));
        }

        let available_bytes = sys.available_memory();
        let low_memory = is_low_memory(available_bytes, total_bytes, self.low_mem_threshold_percent);

        debug!(available_bytes, total_bytes, low_memory, "sampled system memory");

        Ok(SystemMemory {
            available_bytes,
            total_bytes,
            low_memory,
        })
    }
}

/// Total physical memory on the host, in bytes.
fn total_physical_bytes() -> Result<u64, SourceError> {
    let mut sys = System::new();
    sys.refresh_memory();

    let total = sys.total_memory();
    if total == 0 {
        return Err(SourceError::Unavailable(
            "total physical memory reported as zero".to_string(),
        ));
    }
    Ok(total)
}

/// Low-memory condition: available has dropped below `threshold_percent` of
/// total. Widened to avoid overflow on the multiply.
pub(crate) fn is_low_memory(available: u64, total: u64, threshold_percent: u8) -> bool {
    (available as u128) * 100 < (total as u128) * (threshold_percent as u128)
}

/// Read one `kB` counter line from `/proc/self/status`.
#[cfg(target_os = "linux")]
fn read_status_counter_kb(label: &'static str, counter: &'static str) -> Result<u64, SourceError> {
    let contents =
        std::fs::read_to_string(PROC_STATUS).map_err(|source| SourceError::ProcRead {
            path: PROC_STATUS,
            source,
        })?;

    parse_counter_kb(&contents, label).ok_or(SourceError::CounterMissing {
        counter,
        path: PROC_STATUS,
    })
}

/// Find `label` (including its colon) and parse the kB value after it.
#[cfg(target_os = "linux")]
fn parse_counter_kb(contents: &str, label: &str) -> Option<u64> {
    contents.lines().find_map(|line| {
        line.strip_prefix(label)?
            .split_whitespace()
            .next()?
            .parse()
            .ok()
    })
}

/// Resident size via sysinfo, for platforms without procfs.
#[cfg(not(target_os = "linux"))]
fn current_process_memory() -> Result<u64, SourceError> {
    use sysinfo::ProcessesToUpdate;

    let pid = sysinfo::get_current_pid().map_err(|e| SourceError::Unavailable(e.to_string()))?;

    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    sys.process(pid)
        .map(|process| process.memory())
        .ok_or_else(|| SourceError::Unavailable("current process not visible".to_string()))
}
