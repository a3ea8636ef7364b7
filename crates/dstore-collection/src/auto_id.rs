use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use bson::Bson;

/// How a missing id field is filled in on `create`/`push` (`spec.md` §4.5:
/// "when the id-index is `auto`, a generator function yields the next id").
#[derive(Default)]
pub enum AutoId {
    /// No generation — a missing id is left missing (and will usually fail
    /// a required-id validation elsewhere).
    #[default]
    None,
    /// Monotonically increasing counter, seeded from the highest id already
    /// present in the document list.
    Counter(AtomicI64),
    /// Millisecond timestamp, matching the teacher's own id strategy for
    /// append-only collections.
    Timestamp,
}

impl AutoId {
    pub fn counter_starting_at(seed: i64) -> Self {
        AutoId::Counter(AtomicI64::new(seed))
    }

    pub fn next(&self) -> Option<Bson> {
        match self {
            AutoId::None => None,
            AutoId::Counter(counter) => Some(Bson::Int64(counter.fetch_add(1, Ordering::SeqCst))),
            AutoId::Timestamp => {
                let millis = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0);
                Some(Bson::Int64(millis))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_increments_each_call() {
        let auto = AutoId::counter_starting_at(1);
        assert_eq!(auto.next(), Some(Bson::Int64(1)));
        assert_eq!(auto.next(), Some(Bson::Int64(2)));
    }

    #[test]
    fn none_never_generates() {
        assert_eq!(AutoId::None.next(), None);
    }
}
