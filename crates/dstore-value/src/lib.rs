//! Value & BSON comparator (C1).
//!
//! Provides `deep_equal` and `compare` over `bson::Bson`, with the BSON
//! type-order total ordering described in `spec.md` §3 / §4.1.

use std::cmp::Ordering;

use bson::Bson;

/// Result of comparing two values. `Incomparable` covers `undefined`
/// operands and cross-family comparisons that have no defined ordering
/// (documents compare equal for ordering purposes only, never
/// `Incomparable`, per §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Less,
    Equal,
    Greater,
    Incomparable,
}

impl Comparison {
    pub fn from_ordering(o: Ordering) -> Self {
        match o {
            Ordering::Less => Comparison::Less,
            Ordering::Equal => Comparison::Equal,
            Ordering::Greater => Comparison::Greater,
        }
    }

    pub fn is_definite(self) -> bool {
        !matches!(self, Comparison::Incomparable)
    }
}

/// BSON type-order family, used whenever two values have different tags.
///
/// `undefined` sorts before `null`; `MinKey`/`MaxKey` bracket everything;
/// types outside §3's enumerated set (timestamp, symbol, decimal128,
/// javascript, dbPointer) are folded into the nearest matching family so the
/// ordering stays total over every `Bson` variant the engine may encounter.
fn type_order(v: &Bson) -> u8 {
    match v {
        Bson::MinKey => 0,
        Bson::Undefined => 1,
        Bson::Null => 2,
        Bson::Double(_)
        | Bson::Int32(_)
        | Bson::Int64(_)
        | Bson::Decimal128(_) => 3,
        Bson::Symbol(_) | Bson::String(_) | Bson::JavaScriptCode(_) => 4,
        Bson::Document(_) | Bson::DbPointer(_) | Bson::JavaScriptCodeWithScope(_) => 5,
        Bson::Array(_) => 6,
        Bson::Binary(_) => 7,
        Bson::ObjectId(_) => 8,
        Bson::Boolean(_) => 9,
        Bson::DateTime(_) | Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::MaxKey => 12,
    }
}

/// BSON "tag" used by `$type` and operator/type compatibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BsonTag {
    Null,
    Undefined,
    Bool,
    Int,
    Double,
    Long,
    String,
    Date,
    Regex,
    Binary,
    Array,
    Object,
    ObjectId,
    MinKey,
    MaxKey,
    Timestamp,
    Symbol,
    JavaScript,
    Decimal128,
    DbPointer,
}

/// Map a runtime value to its BSON tag (int vs double distinguished, per
/// `spec.md` §4.8's "Type detection").
pub fn tag_of(v: &Bson) -> BsonTag {
    match v {
        Bson::Null => BsonTag::Null,
        Bson::Undefined => BsonTag::Undefined,
        Bson::Boolean(_) => BsonTag::Bool,
        Bson::Int32(_) => BsonTag::Int,
        Bson::Double(_) => BsonTag::Double,
        Bson::Int64(_) => BsonTag::Long,
        Bson::String(_) => BsonTag::String,
        Bson::DateTime(_) => BsonTag::Date,
        Bson::RegularExpression(_) => BsonTag::Regex,
        Bson::Binary(_) => BsonTag::Binary,
        Bson::Array(_) => BsonTag::Array,
        Bson::Document(_) => BsonTag::Object,
        Bson::ObjectId(_) => BsonTag::ObjectId,
        Bson::MinKey => BsonTag::MinKey,
        Bson::MaxKey => BsonTag::MaxKey,
        Bson::Timestamp(_) => BsonTag::Timestamp,
        Bson::Symbol(_) => BsonTag::Symbol,
        Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => BsonTag::JavaScript,
        Bson::Decimal128(_) => BsonTag::Decimal128,
        Bson::DbPointer(_) => BsonTag::DbPointer,
    }
}

/// BSON type-number aliases accepted by `$type` (1..=19 plus a couple of
/// legacy aliases), per `spec.md` §4.2 ("BSON type number aliases 1..18").
pub fn tag_from_type_number(n: i64) -> Option<BsonTag> {
    Some(match n {
        1 => BsonTag::Double,
        2 => BsonTag::String,
        3 => BsonTag::Object,
        4 => BsonTag::Array,
        5 => BsonTag::Binary,
        6 => BsonTag::Undefined,
        7 => BsonTag::ObjectId,
        8 => BsonTag::Bool,
        9 => BsonTag::Date,
        10 => BsonTag::Null,
        11 => BsonTag::Regex,
        12 => BsonTag::DbPointer,
        13 => BsonTag::JavaScript,
        14 => BsonTag::Symbol,
        15 => BsonTag::JavaScript,
        16 => BsonTag::Int,
        17 => BsonTag::Timestamp,
        18 => BsonTag::Long,
        19 => BsonTag::Decimal128,
        -1 => BsonTag::MinKey,
        127 => BsonTag::MaxKey,
        _ => return None,
    })
}

pub fn tag_from_name(name: &str) -> Option<BsonTag> {
    Some(match name {
        "double" => BsonTag::Double,
        "string" => BsonTag::String,
        "object" => BsonTag::Object,
        "array" => BsonTag::Array,
        "binData" => BsonTag::Binary,
        "undefined" => BsonTag::Undefined,
        "objectId" => BsonTag::ObjectId,
        "bool" => BsonTag::Bool,
        "date" => BsonTag::Date,
        "null" => BsonTag::Null,
        "regex" => BsonTag::Regex,
        "dbPointer" => BsonTag::DbPointer,
        "javascript" => BsonTag::JavaScript,
        "symbol" => BsonTag::Symbol,
        "int" => BsonTag::Int,
        "timestamp" => BsonTag::Timestamp,
        "long" => BsonTag::Long,
        "decimal" => BsonTag::Decimal128,
        "minKey" => BsonTag::MinKey,
        "maxKey" => BsonTag::MaxKey,
        "number" => BsonTag::Double,
        _ => return None,
    })
}

/// `deepEqual` (§4.1): reflexive on primitives, Dates by instant, arrays
/// element-wise, regexes by (source, flags). Objects compare equal only by
/// reference identity in the source design; since this engine has no notion
/// of object identity across a parsed filter literal and a stored document,
/// document equality here is defined as recursive structural equality
/// (Open Question resolution — see DESIGN.md).
pub fn deep_equal(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        (Bson::Null, Bson::Null) => true,
        (Bson::Undefined, Bson::Undefined) => true,
        (Bson::Boolean(x), Bson::Boolean(y)) => x == y,
        (Bson::String(x), Bson::String(y)) => x == y,
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x == y,
        (Bson::Binary(x), Bson::Binary(y)) => x == y,
        (Bson::DateTime(x), Bson::DateTime(y)) => x.timestamp_millis() == y.timestamp_millis(),
        (Bson::RegularExpression(x), Bson::RegularExpression(y)) => {
            x.pattern == y.pattern && x.options == y.options
        }
        (Bson::Array(x), Bson::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(p, q)| deep_equal(p, q))
        }
        (Bson::Document(x), Bson::Document(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| deep_equal(v, w)))
        }
        _ if is_numeric(a) && is_numeric(b) => numeric_eq(a, b),
        _ => false,
    }
}

fn is_numeric(v: &Bson) -> bool {
    matches!(v, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

fn as_f64(v: &Bson) -> Option<f64> {
    match v {
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn numeric_eq(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => {
            if x.is_nan() && y.is_nan() {
                true
            } else {
                x == y
            }
        }
        _ => false,
    }
}

/// `compare` (§4.1). `Bson::Undefined` is `Incomparable` against anything
/// except another `Undefined` (`Equal`, used only internally by the engine,
/// never surfaced to `$gt`-family operators on missing fields).
pub fn compare(a: &Bson, b: &Bson) -> Comparison {
    if matches!(a, Bson::Undefined) || matches!(b, Bson::Undefined) {
        return if matches!(a, Bson::Undefined) && matches!(b, Bson::Undefined) {
            Comparison::Equal
        } else {
            Comparison::Incomparable
        };
    }

    let (ta, tb) = (type_order(a), type_order(b));
    if ta != tb {
        // Numbers of different concrete tags share a type-order family.
        if is_numeric(a) && is_numeric(b) {
            return compare_numeric(a, b);
        }
        return Comparison::from_ordering(ta.cmp(&tb));
    }

    match (a, b) {
        (Bson::Null, Bson::Null) | (Bson::MinKey, Bson::MinKey) | (Bson::MaxKey, Bson::MaxKey) => {
            Comparison::Equal
        }
        _ if is_numeric(a) && is_numeric(b) => compare_numeric(a, b),
        (Bson::String(x), Bson::String(y)) => Comparison::from_ordering(x.as_str().cmp(y.as_str())),
        (Bson::Symbol(x), Bson::Symbol(y)) => Comparison::from_ordering(x.as_str().cmp(y.as_str())),
        (Bson::Boolean(x), Bson::Boolean(y)) => Comparison::from_ordering(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => {
            Comparison::from_ordering(x.timestamp_millis().cmp(&y.timestamp_millis()))
        }
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Comparison::from_ordering(x.bytes().cmp(&y.bytes())),
        (Bson::Binary(x), Bson::Binary(y)) => Comparison::from_ordering(x.bytes.cmp(&y.bytes)),
        (Bson::Array(x), Bson::Array(y)) => compare_arrays(x, y),
        (Bson::Document(_), Bson::Document(_)) => Comparison::Equal,
        (Bson::RegularExpression(x), Bson::RegularExpression(y)) => Comparison::from_ordering(
            (x.pattern.as_str(), x.options.as_str()).cmp(&(y.pattern.as_str(), y.options.as_str())),
        ),
        _ => Comparison::Incomparable,
    }
}

fn compare_numeric(a: &Bson, b: &Bson) -> Comparison {
    // Use i128 for exact integer comparisons when both sides are integral,
    // falling back to f64 (with NaN-before-everything) otherwise.
    match (a, b) {
        (Bson::Int32(x), Bson::Int32(y)) => Comparison::from_ordering(x.cmp(y)),
        (Bson::Int64(x), Bson::Int64(y)) => Comparison::from_ordering(x.cmp(y)),
        (Bson::Int32(x), Bson::Int64(y)) | (Bson::Int64(y), Bson::Int32(x)) => {
            let ord = (*x as i128).cmp(&(*y as i128));
            if matches!(a, Bson::Int32(_)) {
                Comparison::from_ordering(ord)
            } else {
                Comparison::from_ordering(ord.reverse())
            }
        }
        _ => {
            let x = as_f64(a).unwrap();
            let y = as_f64(b).unwrap();
            match (x.is_nan(), y.is_nan()) {
                (true, true) => Comparison::Equal,
                (true, false) => Comparison::Less,
                (false, true) => Comparison::Greater,
                (false, false) => Comparison::from_ordering(x.partial_cmp(&y).unwrap()),
            }
        }
    }
}

fn compare_arrays(x: &[Bson], y: &[Bson]) -> Comparison {
    for (p, q) in x.iter().zip(y.iter()) {
        let c = compare(p, q);
        if c != Comparison::Equal {
            return c;
        }
    }
    Comparison::from_ordering(x.len().cmp(&y.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{Bson, DateTime};
    use proptest::prelude::*;

    #[test]
    fn type_order_spans_families() {
        assert_eq!(compare(&Bson::Null, &Bson::Int32(1)), Comparison::Less);
        assert_eq!(compare(&Bson::Int32(1), &Bson::String("a".into())), Comparison::Less);
        assert_eq!(
            compare(&Bson::String("a".into()), &Bson::Document(bson::doc! {})),
            Comparison::Less
        );
        assert_eq!(
            compare(&Bson::Document(bson::doc! {}), &Bson::Array(vec![])),
            Comparison::Less
        );
        assert_eq!(compare(&Bson::Boolean(false), &Bson::Boolean(true)), Comparison::Less);
    }

    #[test]
    fn numeric_cross_type_compare() {
        assert_eq!(compare(&Bson::Int32(5), &Bson::Double(5.5)), Comparison::Less);
        assert_eq!(compare(&Bson::Int64(10), &Bson::Int32(10)), Comparison::Equal);
        assert!(deep_equal(&Bson::Int32(3), &Bson::Double(3.0)));
    }

    #[test]
    fn nan_orders_before_numbers_and_equals_itself() {
        let nan = Bson::Double(f64::NAN);
        assert_eq!(compare(&nan, &nan), Comparison::Equal);
        assert_eq!(compare(&nan, &Bson::Int32(0)), Comparison::Less);
    }

    #[test]
    fn undefined_is_incomparable_except_to_itself() {
        assert_eq!(compare(&Bson::Undefined, &Bson::Undefined), Comparison::Equal);
        assert_eq!(compare(&Bson::Undefined, &Bson::Null), Comparison::Incomparable);
        assert!(!compare(&Bson::Undefined, &Bson::Int32(1)).is_definite());
    }

    #[test]
    fn array_prefix_ties_break_on_length() {
        let shorter = Bson::Array(vec![Bson::Int32(1)]);
        let longer = Bson::Array(vec![Bson::Int32(1), Bson::Int32(2)]);
        assert_eq!(compare(&shorter, &longer), Comparison::Less);
    }

    #[test]
    fn documents_are_equal_for_ordering_but_deep_equal_is_structural() {
        let a = Bson::Document(bson::doc! { "x": 1 });
        let b = Bson::Document(bson::doc! { "x": 2 });
        assert_eq!(compare(&a, &b), Comparison::Equal);
        assert!(!deep_equal(&a, &b));
        assert!(deep_equal(&a, &Bson::Document(bson::doc! { "x": 1 })));
    }

    #[test]
    fn dates_compare_by_instant() {
        let earlier = Bson::DateTime(DateTime::from_millis(100));
        let later = Bson::DateTime(DateTime::from_millis(200));
        assert_eq!(compare(&earlier, &later), Comparison::Less);
    }

    proptest! {
        #[test]
        fn compare_is_antisymmetric(a in -1000i32..1000, b in -1000i32..1000) {
            let (ba, bb) = (Bson::Int32(a), Bson::Int32(b));
            let fwd = compare(&ba, &bb);
            let rev = compare(&bb, &ba);
            match fwd {
                Comparison::Less => prop_assert_eq!(rev, Comparison::Greater),
                Comparison::Greater => prop_assert_eq!(rev, Comparison::Less),
                Comparison::Equal => prop_assert_eq!(rev, Comparison::Equal),
                Comparison::Incomparable => prop_assert_eq!(rev, Comparison::Incomparable),
            }
        }

        #[test]
        fn deep_equal_is_reflexive_for_ints(a in -10000i64..10000) {
            let v = Bson::Int64(a);
            prop_assert!(deep_equal(&v, &v));
        }
    }
}
