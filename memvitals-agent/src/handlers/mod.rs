//! Request dispatch for the diagnostic query service.
//!
//! Dispatch never fails: sampling failures become typed error replies and
//! unknown operation names get the distinct not-implemented reply. Unknown
//! operations are not failures; callers branch on the difference.

use std::sync::Arc;

use memvitals_proto::{MethodCall, Reply, METHOD_GET_MEMORY_USAGE, METHOD_GET_PEAK_MEMORY_USAGE};
use memvitals_telemetry::MemorySource;
use tracing::debug;

mod memory;

/// Routes incoming calls to the operation implementations.
pub struct QueryHandler {
    source: Arc<dyn MemorySource>,
}

impl QueryHandler {
    /// Create a handler over the given counter source.
    pub fn new(source: Arc<dyn MemorySource>) -> Self {
        Self { source }
    }

    /// Answer one request.
    ///
    /// Each call samples fresh; a failed query has no effect on later ones.
    pub fn handle(&self, call: MethodCall) -> Reply {
        match call.method.as_str() {
            METHOD_GET_MEMORY_USAGE => {
                debug!(id = %call.id, "Handling memory usage request");
                memory::handle_memory_usage(call.id, self.source.as_ref())
            }
            METHOD_GET_PEAK_MEMORY_USAGE => {
                debug!(id = %call.id, "Handling peak memory usage request");
                memory::handle_peak_memory_usage(call.id, self.source.as_ref())
            }
            other => {
                debug!(id = %call.id, method = %other, "Method not implemented");
                Reply::not_implemented(call.id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memvitals_proto::QueryResult;
    use memvitals_telemetry::FakeMemorySource;

    fn handler(source: FakeMemorySource) -> QueryHandler {
        QueryHandler::new(Arc::new(source))
    }

    #[test]
    fn test_unknown_method_is_not_implemented() {
        let handler = handler(FakeMemorySource::default());

        let reply = handler.handle(MethodCall::new("u1", "doSomethingElse"));

        match reply {
            Reply::NotImplemented { id } => assert_eq!(id, "u1"),
            other => panic!("expected NotImplemented, got {other:?}"),
        }
    }

    #[test]
    fn test_known_methods_succeed() {
        let handler = handler(FakeMemorySource::default());

        assert!(matches!(
            handler.handle(MethodCall::new("m1", METHOD_GET_MEMORY_USAGE)),
            Reply::Ok {
                result: QueryResult::Memory(_),
                ..
            }
        ));
        assert!(matches!(
            handler.handle(MethodCall::new("p1", METHOD_GET_PEAK_MEMORY_USAGE)),
            Reply::Ok {
                result: QueryResult::Peak(_),
                ..
            }
        ));
    }

    #[test]
    fn test_failed_query_does_not_affect_later_queries() {
        // System counters fail, so the full report errors, but the peak
        // query only needs heap counters and must still succeed.
        let handler = handler(FakeMemorySource::default().fail_system());

        assert!(matches!(
            handler.handle(MethodCall::new("f1", METHOD_GET_MEMORY_USAGE)),
            Reply::Error { .. }
        ));
        assert!(matches!(
            handler.handle(MethodCall::new("f2", METHOD_GET_PEAK_MEMORY_USAGE)),
            Reply::Ok { .. }
        ));
    }
}
