use bson::{Bson, DateTime};
use dstore_value::BsonTag;

/// Attempt to coerce `value` into one of `targets`, trying each target tag in
/// order. Grounded on `slate-db/src/encoding.rs`'s value-normalization pass,
/// generalized to the conversions named in `spec.md` §4 ("Coercion applies
/// when `coerce≠false`"): string<->number, bool<->number, string<->date,
/// string<->bool, any->string, and array-wraps-scalar.
pub fn coerce(value: &Bson, targets: &[BsonTag]) -> Option<Bson> {
    targets.iter().find_map(|t| coerce_to(value, *t))
}

fn coerce_to(value: &Bson, target: BsonTag) -> Option<Bson> {
    match target {
        BsonTag::String => Some(Bson::String(to_string_repr(value))),
        BsonTag::Int => to_i64(value).and_then(|n| i32::try_from(n).ok()).map(Bson::Int32),
        BsonTag::Long => to_i64(value).map(Bson::Int64),
        BsonTag::Double => to_f64(value).map(Bson::Double),
        BsonTag::Bool => to_bool(value).map(Bson::Boolean),
        BsonTag::Date => to_date(value).map(Bson::DateTime),
        BsonTag::Array => match value {
            Bson::Array(_) => None,
            other => Some(Bson::Array(vec![other.clone()])),
        },
        _ => None,
    }
}

fn to_string_repr(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => n.to_string(),
        Bson::Double(n) => n.to_string(),
        Bson::Boolean(b) => b.to_string(),
        Bson::DateTime(d) => d.try_to_rfc3339_string().unwrap_or_else(|_| d.timestamp_millis().to_string()),
        Bson::ObjectId(o) => o.to_hex(),
        Bson::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn to_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(*n as i64),
        Bson::Int64(n) => Some(*n),
        Bson::Double(n) if n.fract() == 0.0 => Some(*n as i64),
        Bson::Boolean(b) => Some(*b as i64),
        Bson::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn to_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        Bson::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        Bson::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn to_bool(value: &Bson) -> Option<bool> {
    match value {
        Bson::Boolean(b) => Some(*b),
        Bson::Int32(n) => Some(*n != 0),
        Bson::Int64(n) => Some(*n != 0),
        Bson::Double(n) => Some(*n != 0.0),
        Bson::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn to_date(value: &Bson) -> Option<DateTime> {
    match value {
        Bson::DateTime(d) => Some(*d),
        Bson::String(s) => DateTime::parse_rfc3339_str(s).ok(),
        Bson::Int64(ms) => Some(DateTime::from_millis(*ms)),
        Bson::Int32(ms) => Some(DateTime::from_millis(*ms as i64)),
        _ => None,
    }
}
