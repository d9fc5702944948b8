//! # memvitals Proto
//!
//! Wire contract between the memvitals agent and its callers.
//!
//! The protocol is a named request with no payload, answered by exactly one
//! reply. A reply is either a successful result, a typed error, or a
//! distinct "not implemented" signal for operation names the agent does not
//! provide. "Not implemented" is part of the contract and is never folded
//! into the error taxonomy; callers branch on it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation name for a full memory report.
pub const METHOD_GET_MEMORY_USAGE: &str = "getMemoryUsage";

/// Operation name for the peak-memory approximation.
pub const METHOD_GET_PEAK_MEMORY_USAGE: &str = "getPeakMemoryUsage";

/// Error kind for a failed memory report.
pub const MEMORY_ERROR: &str = "MEMORY_ERROR";

/// Error kind for a failed peak-memory query.
pub const PEAK_MEMORY_ERROR: &str = "PEAK_MEMORY_ERROR";

const MEMORY_ERROR_SUMMARY: &str = "Failed to get memory usage";
const PEAK_MEMORY_ERROR_SUMMARY: &str = "Failed to get peak memory usage";

/// A single named request from a caller.
///
/// Requests carry no arguments; unknown fields are ignored so the envelope
/// can grow without breaking older agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Caller-chosen correlation id, echoed verbatim in the reply.
    pub id: String,
    /// Operation name, e.g. `"getMemoryUsage"`.
    pub method: String,
}

impl MethodCall {
    pub fn new(id: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
        }
    }
}

/// Memory counters reported by `getMemoryUsage`, all in whole megabytes.
///
/// Field names are part of the wire contract and must stay camelCase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryReport {
    /// Bytes currently live in the process allocator, in MB.
    pub heap_used: u64,
    /// Resident-set size, in MB.
    pub heap_total: u64,
    /// Upper bound the process may grow to, in MB.
    pub heap_max: u64,
    /// Proportional set size attributed to this process by the OS, in MB.
    pub pss_memory: u64,
    /// Memory available system-wide at sample time, in MB.
    pub system_available: u64,
    /// Total physical memory on the host, in MB.
    pub system_total: u64,
    /// Whether the host is in a low-memory state at sample time.
    pub system_low: bool,
}

/// Operation-specific success value.
///
/// Serialized untagged: a `MemoryReport` is a JSON object, a peak reading
/// is a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResult {
    Memory(MemoryReport),
    /// Current reserved size in MB. An approximation, not a tracked
    /// historical maximum.
    Peak(u64),
}

/// Typed failure carried in an error reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Machine-readable kind: [`MEMORY_ERROR`] or [`PEAK_MEMORY_ERROR`].
    pub code: String,
    /// Fixed human-readable summary for the kind.
    pub message: String,
    /// Diagnostic text of the underlying failure.
    pub details: String,
}

impl ErrorPayload {
    /// Failure of the full memory report.
    pub fn memory(details: impl Into<String>) -> Self {
        Self {
            code: MEMORY_ERROR.to_string(),
            message: MEMORY_ERROR_SUMMARY.to_string(),
            details: details.into(),
        }
    }

    /// Failure of the peak-memory query.
    pub fn peak_memory(details: impl Into<String>) -> Self {
        Self {
            code: PEAK_MEMORY_ERROR.to_string(),
            message: PEAK_MEMORY_ERROR_SUMMARY.to_string(),
            details: details.into(),
        }
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.code, self.message, self.details)
    }
}

/// One reply per request, discriminated by `status` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Reply {
    /// The operation succeeded.
    Ok { id: String, result: QueryResult },
    /// The operation failed with a typed, recoverable error.
    Error { id: String, error: ErrorPayload },
    /// The operation name is not one the agent provides. Not an error.
    NotImplemented { id: String },
}

impl Reply {
    pub fn ok(id: impl Into<String>, result: QueryResult) -> Self {
        Reply::Ok {
            id: id.into(),
            result,
        }
    }

    pub fn error(id: impl Into<String>, error: ErrorPayload) -> Self {
        Reply::Error {
            id: id.into(),
            error,
        }
    }

    pub fn not_implemented(id: impl Into<String>) -> Self {
        Reply::NotImplemented { id: id.into() }
    }

    /// The correlation id this reply answers.
    pub fn id(&self) -> &str {
        match self {
            Reply::Ok { id, .. } | Reply::Error { id, .. } | Reply::NotImplemented { id } => id,
        }
    }
}
