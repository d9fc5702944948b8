//! The two memory query operations.

use memvitals_proto::{ErrorPayload, MemoryReport, QueryResult, Reply};
use memvitals_telemetry::convert::{bytes_to_mib, kib_to_mib};
use memvitals_telemetry::{MemorySource, SourceError};
use tracing::warn;

/// Build and return the full memory report.
pub(crate) fn handle_memory_usage(id: String, source: &dyn MemorySource) -> Reply {
    match build_report(source) {
        Ok(report) => Reply::ok(id, QueryResult::Memory(report)),
        Err(e) => {
            warn!(error = %e, "Memory usage sample failed");
            Reply::error(id, ErrorPayload::memory(e.to_string()))
        }
    }
}

/// Return the peak-memory approximation.
///
/// This reports the current reserved size, not a tracked historical
/// maximum; callers wanting a true peak must sample repeatedly and keep
/// the maximum themselves.
pub(crate) fn handle_peak_memory_usage(id: String, source: &dyn MemorySource) -> Reply {
    match source.heap() {
        Ok(heap) => Reply::ok(id, QueryResult::Peak(bytes_to_mib(heap.reserved_bytes))),
        Err(e) => {
            warn!(error = %e, "Peak memory sample failed");
            Reply::error(id, ErrorPayload::peak_memory(e.to_string()))
        }
    }
}

fn build_report(source: &dyn MemorySource) -> Result<MemoryReport, SourceError> {
    let heap = source.heap()?;
    let pss_kb = source.process_pss_kb()?;
    let system = source.system()?;

    Ok(MemoryReport {
        heap_used: bytes_to_mib(heap.used_bytes),
        heap_total: bytes_to_mib(heap.reserved_bytes),
        heap_max: bytes_to_mib(heap.max_bytes),
        pss_memory: kib_to_mib(pss_kb),
        system_available: bytes_to_mib(system.available_bytes),
        system_total: bytes_to_mib(system.total_bytes),
        system_low: system.low_memory,
    })
}
