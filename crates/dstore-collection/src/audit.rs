use bson::Bson;

/// One entry in a collection's optional mutation history (`spec.md` §4.5
/// mentions audit/version history as part of a complete collection
/// implementation; kept as a simple append log here rather than full
/// before/after document diffs).
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub operation: &'static str,
    pub id: Option<Bson>,
    pub timestamp_millis: i64,
}
