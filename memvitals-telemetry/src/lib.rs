//! # memvitals Telemetry
//!
//! Memory counter acquisition for the memvitals agent.
//!
//! Counter access is abstracted behind the [`MemorySource`] trait so the
//! query logic stays platform-independent and testable with a scripted
//! source. Each sample is computed fresh from the OS; no state is shared
//! between calls.
//!
//! ## Heap accounting
//!
//! Rust has no managed heap to introspect, so "heap used" is attributed via
//! [`TrackingAllocator`], a thin `GlobalAlloc` wrapper the agent binary
//! installs over the system allocator. "Heap total" is the resident-set size
//! the OS currently holds for the process, and "heap max" is the
//! address-space rlimit where one is set.

pub mod alloc;
pub mod convert;
pub mod fake;
pub mod host;
pub mod source;

pub use alloc::TrackingAllocator;
pub use fake::FakeMemorySource;
pub use host::HostMemorySource;
pub use source::{HeapCounters, MemorySource, SourceError, SystemMemory};
