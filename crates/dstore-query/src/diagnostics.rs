/// Evaluation-time failure sink (`spec.md` §7: "Evaluation-time errors...
/// degrade to false for the offending document, logged via a diagnostic
/// sink").
pub trait QueryDiagnostics {
    fn where_predicate_panicked(&self, _detail: &str) {}
}

/// Default sink: logs through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl QueryDiagnostics for TracingDiagnostics {
    fn where_predicate_panicked(&self, detail: &str) {
        tracing::warn!(target: "dstore_query", detail, "$where predicate panicked; document excluded");
    }
}
