//! Live-byte accounting over the global allocator.
//!
//! [`TrackingAllocator`] wraps another allocator and keeps process-wide
//! counters of live bytes and allocation events. The agent binary installs
//! it with `#[global_allocator]`; libraries only read the counters.
//!
//! Accounting uses relaxed atomics only, so the query path never takes a
//! lock and the wrapper is safe to call from any thread.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

// Signed so that frees of memory allocated before the first read (or
// accounting races during realloc) cannot underflow.
static LIVE_BYTES: AtomicI64 = AtomicI64::new(0);
static ALLOCATION_COUNT: AtomicU64 = AtomicU64::new(0);

/// `GlobalAlloc` wrapper that counts live bytes and allocation events.
pub struct TrackingAllocator<A = System> {
    inner: A,
}

impl TrackingAllocator<System> {
    /// Tracker over the system allocator.
    pub const fn system() -> Self {
        Self { inner: System }
    }
}

impl<A> TrackingAllocator<A> {
    pub const fn new(inner: A) -> Self {
        Self { inner }
    }
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for TrackingAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc(layout);
        if !ptr.is_null() {
            LIVE_BYTES.fetch_add(layout.size() as i64, Ordering::Relaxed);
            ALLOCATION_COUNT.fetch_add(1, Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc_zeroed(layout);
        if !ptr.is_null() {
            LIVE_BYTES.fetch_add(layout.size() as i64, Ordering::Relaxed);
            ALLOCATION_COUNT.fetch_add(1, Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.inner.dealloc(ptr, layout);
        LIVE_BYTES.fetch_sub(layout.size() as i64, Ordering::Relaxed);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = self.inner.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            LIVE_BYTES.fetch_add(new_size as i64 - layout.size() as i64, Ordering::Relaxed);
            ALLOCATION_COUNT.fetch_add(1, Ordering::Relaxed);
        }
        new_ptr
    }
}

/// Bytes currently live per the tracker.
///
/// `None` until the tracker has recorded at least one allocation, which is
/// how callers detect that it is not installed as the global allocator.
pub fn live_bytes() -> Option<u64> {
    if ALLOCATION_COUNT.load(Ordering::Relaxed) == 0 {
        return None;
    }
    Some(LIVE_BYTES.load(Ordering::Relaxed).max(0) as u64)
}

/// Total allocation events recorded since process start.
pub fn allocation_count() -> u64 {
    ALLOCATION_COUNT.load(Ordering::Relaxed)
}
