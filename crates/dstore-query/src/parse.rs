use bson::{Bson, Document};
use regex::Regex;

use crate::ast::{CachedRegex, Expression, FieldOp, InMatcher, TextSearch, VALID_REGEX_FLAGS};
use crate::error::QueryError;
use crate::normalize::normalize_text;
use dstore_value::{tag_from_name, tag_from_type_number};

/// Parse a filter document into an [`Expression`] tree (`spec.md` §4.2's
/// parsing grammar).
pub fn parse_filter(doc: &Document) -> Result<Expression, QueryError> {
    let mut children = Vec::new();

    for (key, value) in doc.iter() {
        match key.as_str() {
            "$and" => children.push(parse_logical_array(key, value, Expression::And, false)?),
            "$or" => children.push(parse_logical_array(key, value, Expression::Or, false)?),
            "$nor" => children.push(parse_logical_array(key, value, Expression::Nor, true)?),
            "$not" => {
                let sub = value
                    .as_document()
                    .ok_or_else(|| QueryError::new("$not", "value must be a document").with_value(value.clone()))?;
                children.push(Expression::Not(Box::new(parse_filter(sub)?)));
            }
            "$where" => {
                return Err(QueryError::new(
                    "$where",
                    "string/code $where is rejected at parse time; supply a host predicate via \
                     Expression::and_where instead (this engine performs no dynamic evaluation)",
                )
                .with_value(value.clone()));
            }
            k if k.starts_with('$') => {
                return Err(QueryError::new(k, "unknown top-level operator"));
            }
            _ => children.push(parse_field_condition(key, value)?),
        }
    }

    match children.len() {
        0 => Err(QueryError::new("$and", "empty filter document")),
        1 => Ok(children.pop().unwrap()),
        _ => Ok(Expression::And(children)),
    }
}

/// `$and`/`$or`/`$nor` accept non-empty arrays of sub-queries; empty arrays
/// vacuously resolve per operator (`spec.md` §4.2 "Logical").
fn parse_logical_array(
    op: &str,
    value: &Bson,
    make: fn(Vec<Expression>) -> Expression,
    allow_empty: bool,
) -> Result<Expression, QueryError> {
    let arr = match value {
        Bson::Array(a) => a,
        _ => return Err(QueryError::new(op, "value must be an array").with_value(value.clone())),
    };

    if arr.is_empty() {
        return if allow_empty {
            // $nor vacuously true == "not any" == And([])-style tautology;
            // represent directly since And([]) already means vacuously true.
            Ok(Expression::And(vec![]))
        } else if op == "$and" {
            Ok(Expression::And(vec![]))
        } else {
            // $or vacuously false.
            Ok(Expression::Or(vec![]))
        };
    }

    let mut children = Vec::with_capacity(arr.len());
    for elem in arr {
        match elem {
            Bson::Document(d) => children.push(parse_filter(d)?),
            _ => return Err(QueryError::new(op, "array elements must be documents")),
        }
    }
    Ok(make(children))
}

/// Parse a single field condition: implicit `$eq`, a regex literal, or an
/// operator sub-document.
pub(crate) fn parse_field_condition(field: &str, value: &Bson) -> Result<Expression, QueryError> {
    match value {
        Bson::RegularExpression(re) => {
            Ok(Expression::Field(field.to_string(), FieldOp::Regex(compile_regex(&re.pattern, &re.options)?)))
        }
        Bson::Document(sub) => {
            let is_operator_doc = sub
                .iter()
                .next()
                .is_some_and(|(k, _)| k.starts_with('$'));
            if is_operator_doc {
                parse_operator_doc(field, sub)
            } else {
                Ok(Expression::Field(field.to_string(), FieldOp::Eq(value.clone())))
            }
        }
        _ => Ok(Expression::Field(field.to_string(), FieldOp::Eq(value.clone()))),
    }
}

fn parse_operator_doc(field: &str, doc: &Document) -> Result<Expression, QueryError> {
    let mut ops = Vec::new();
    let mut keys: Vec<&String> = doc.keys().collect();
    // Handle $regex (which may consume a sibling $options) first.
    if doc.contains_key("$regex") {
        ops.push(parse_regex_op(doc)?);
        keys.retain(|k| k.as_str() != "$regex" && k.as_str() != "$options");
    }
    for key in keys {
        let value = doc.get(key).unwrap();
        match key.as_str() {
            "$options" => {
                return Err(QueryError::new("$options", "$options without $regex"));
            }
            _ => ops.push(parse_single_field_op(key, value)?),
        }
    }

    if ops.is_empty() {
        return Err(QueryError::new(field, "empty operator document"));
    }
    if ops.len() == 1 {
        Ok(Expression::Field(field.to_string(), ops.pop().unwrap()))
    } else {
        Ok(Expression::And(
            ops.into_iter()
                .map(|op| Expression::Field(field.to_string(), op))
                .collect(),
        ))
    }
}

/// Parse one operator key/value pair (outside of `$regex`/`$options`, which
/// are handled separately since `$regex` may consume a sibling key).
fn parse_single_field_op(key: &str, value: &Bson) -> Result<FieldOp, QueryError> {
    match key {
        "$eq" => Ok(FieldOp::Eq(value.clone())),
        "$ne" => Ok(FieldOp::Ne(value.clone())),
        "$gt" => Ok(FieldOp::Gt(value.clone())),
        "$gte" => Ok(FieldOp::Gte(value.clone())),
        "$lt" => Ok(FieldOp::Lt(value.clone())),
        "$lte" => Ok(FieldOp::Lte(value.clone())),
        "$in" => Ok(FieldOp::In(parse_in_list(key, value)?)),
        "$nin" => Ok(FieldOp::Nin(parse_in_list(key, value)?)),
        "$exists" => match value {
            Bson::Boolean(b) => Ok(FieldOp::Exists(*b)),
            _ => Err(QueryError::new(key, "value must be a boolean")),
        },
        "$type" => Ok(FieldOp::Type(parse_type_list(value)?)),
        "$all" => Ok(FieldOp::All(as_array(key, value)?)),
        "$size" => match value {
            Bson::Int32(n) => Ok(FieldOp::Size(*n as i64)),
            Bson::Int64(n) => Ok(FieldOp::Size(*n)),
            _ => Err(QueryError::new(key, "value must be an integer")),
        },
        "$elemMatch" => match value {
            Bson::Document(d) => Ok(FieldOp::ElemMatch(Box::new(parse_elem_match(d)?))),
            _ => Err(QueryError::new(key, "value must be a document")),
        },
        "$mod" => parse_mod(value),
        "$bitsAllSet" => Ok(FieldOp::BitsAllSet(parse_bitmask(key, value)?)),
        "$bitsAnySet" => Ok(FieldOp::BitsAnySet(parse_bitmask(key, value)?)),
        "$bitsAllClear" => Ok(FieldOp::BitsAllClear(parse_bitmask(key, value)?)),
        "$bitsAnyClear" => Ok(FieldOp::BitsAnyClear(parse_bitmask(key, value)?)),
        "$text" => parse_text(value),
        "$not" => parse_not(value),
        _ => Err(QueryError::new(key, "unknown field operator")),
    }
}

fn parse_not(value: &Bson) -> Result<FieldOp, QueryError> {
    match value {
        Bson::RegularExpression(re) => Ok(FieldOp::Not(Box::new(FieldOp::Regex(compile_regex(
            &re.pattern,
            &re.options,
        )?)))),
        Bson::Document(d) => {
            let mut inner = Vec::new();
            for (k, v) in d.iter() {
                if k == "$regex" {
                    inner.push(parse_regex_op(d)?);
                } else if k == "$options" {
                    continue;
                } else {
                    inner.push(parse_single_field_op(k, v)?);
                }
            }
            match inner.len() {
                1 => Ok(FieldOp::Not(Box::new(inner.pop().unwrap()))),
                _ => Err(QueryError::new("$not", "$not sub-document must contain exactly one operator")),
            }
        }
        _ => Err(QueryError::new("$not", "value must be an operator document or RegExp")),
    }
}

fn parse_regex_op(doc: &Document) -> Result<FieldOp, QueryError> {
    let pattern = match doc.get("$regex") {
        Some(Bson::String(s)) => s.clone(),
        Some(Bson::RegularExpression(re)) => re.pattern.clone(),
        Some(_) => return Err(QueryError::new("$regex", "value must be a string or regex")),
        None => return Err(QueryError::new("$regex", "missing pattern")),
    };
    let options = match doc.get("$options") {
        Some(Bson::String(s)) => s.clone(),
        Some(_) => return Err(QueryError::new("$options", "value must be a string")),
        None => match doc.get("$regex") {
            Some(Bson::RegularExpression(re)) => re.options.clone(),
            _ => String::new(),
        },
    };
    Ok(FieldOp::Regex(compile_regex(&pattern, &options)?))
}

fn compile_regex(pattern: &str, flags: &str) -> Result<CachedRegex, QueryError> {
    for ch in flags.chars() {
        if !VALID_REGEX_FLAGS.contains(ch) {
            return Err(QueryError::new("$regex", format!("invalid regex flag: {ch}")));
        }
    }
    let mut inline = String::new();
    // `y` ("sticky") has no regex-crate equivalent; drop it (anchoring is
    // handled at the call site via `^`/`$` in the pattern itself). `u`
    // ("unicode") is always on in the `regex` crate.
    for ch in flags.chars() {
        match ch {
            'i' | 's' | 'm' => inline.push(ch),
            'x' => inline.push('x'),
            'g' | 'u' | 'y' => {}
            _ => unreachable!(),
        }
    }
    let full_pattern = if inline.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{inline}){pattern}")
    };
    let regex = Regex::new(&full_pattern)
        .map_err(|e| QueryError::new("$regex", format!("invalid pattern: {e}")))?;
    Ok(CachedRegex {
        source: pattern.to_string(),
        flags: flags.to_string(),
        regex,
    })
}

fn parse_in_list(op: &str, value: &Bson) -> Result<Vec<InMatcher>, QueryError> {
    let arr = as_array(op, value)?;
    arr.into_iter()
        .map(|v| match v {
            Bson::RegularExpression(re) => {
                compile_regex(&re.pattern, &re.options).map(InMatcher::Regex)
            }
            other => Ok(InMatcher::Value(other)),
        })
        .collect()
}

fn as_array(op: &str, value: &Bson) -> Result<Vec<Bson>, QueryError> {
    match value {
        Bson::Array(a) => Ok(a.clone()),
        _ => Err(QueryError::new(op, "value must be an array")),
    }
}

fn parse_type_list(value: &Bson) -> Result<Vec<dstore_value::BsonTag>, QueryError> {
    let items: Vec<Bson> = match value {
        Bson::Array(a) => a.clone(),
        other => vec![other.clone()],
    };
    let mut tags = Vec::with_capacity(items.len());
    for item in items {
        let tag = match &item {
            Bson::String(s) => tag_from_name(s),
            Bson::Int32(n) => tag_from_type_number(*n as i64),
            Bson::Int64(n) => tag_from_type_number(*n),
            Bson::Double(n) => tag_from_type_number(*n as i64),
            _ => None,
        };
        let tag = tag.ok_or_else(|| {
            QueryError::new("$type", "invalid BSON type name or number").with_value(item.clone())
        })?;
        tags.push(tag);
    }
    Ok(tags)
}

fn parse_mod(value: &Bson) -> Result<FieldOp, QueryError> {
    let arr = as_array("$mod", value)?;
    if arr.len() != 2 {
        return Err(QueryError::new("$mod", "value must be a 2-element array [divisor, remainder]"));
    }
    let as_i128 = |b: &Bson| -> Option<i128> {
        match b {
            Bson::Int32(n) => Some(*n as i128),
            Bson::Int64(n) => Some(*n as i128),
            Bson::Double(n) if n.fract() == 0.0 => Some(*n as i128),
            _ => None,
        }
    };
    let d = as_i128(&arr[0]).ok_or_else(|| QueryError::new("$mod", "divisor must be an integer"))?;
    let r = as_i128(&arr[1]).ok_or_else(|| QueryError::new("$mod", "remainder must be an integer"))?;
    if d == 0 {
        return Err(QueryError::new("$mod", "divisor must not be zero"));
    }
    Ok(FieldOp::Mod(d, r))
}

fn parse_bitmask(op: &str, value: &Bson) -> Result<u64, QueryError> {
    match value {
        Bson::Int32(n) if *n >= 0 => Ok(*n as u64),
        Bson::Int64(n) if *n >= 0 => Ok(*n as u64),
        Bson::Array(positions) => {
            let mut mask: u64 = 0;
            for p in positions {
                let bit = match p {
                    Bson::Int32(n) if *n >= 0 => *n as u32,
                    Bson::Int64(n) if *n >= 0 => *n as u32,
                    _ => return Err(QueryError::new(op, "bit positions must be non-negative integers")),
                };
                if bit < 64 {
                    mask |= 1u64 << bit;
                }
            }
            Ok(mask)
        }
        _ => Err(QueryError::new(op, "value must be a non-negative integer or a list of bit positions")),
    }
}

fn parse_text(value: &Bson) -> Result<FieldOp, QueryError> {
    let doc = match value {
        Bson::Document(d) => d,
        _ => return Err(QueryError::new("$text", "value must be a document")),
    };
    let search = match doc.get("$search") {
        Some(Bson::String(s)) => s.clone(),
        _ => return Err(QueryError::new("$text", "missing $search string")),
    };
    let case_sensitive = matches!(doc.get("$caseSensitive"), Some(Bson::Boolean(true)));
    let diacritic_sensitive = matches!(doc.get("$diacriticSensitive"), Some(Bson::Boolean(true)));
    let normalized_search = normalize_text(&search, case_sensitive, diacritic_sensitive);
    let tokens = normalized_search
        .split_whitespace()
        .map(|s| s.to_string())
        .collect();
    Ok(FieldOp::Text(TextSearch {
        search,
        case_sensitive,
        diacritic_sensitive,
        tokens,
    }))
}

/// `$elemMatch`'s body is either an operator document applied to the
/// element value itself (`{ $gt: 10 }`) or a field-style document applied
/// assuming the element is itself a subdocument.
fn parse_elem_match(doc: &Document) -> Result<Expression, QueryError> {
    let is_operator_doc = doc.iter().next().is_some_and(|(k, _)| k.starts_with('$'));
    if is_operator_doc {
        parse_operator_doc("", doc)
    } else {
        parse_filter(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn implicit_and_over_field_keys() {
        let f = doc! { "age": { "$gt": 21 }, "name": "Alice" };
        let expr = parse_filter(&f).unwrap();
        matches!(expr, Expression::And(ref v) if v.len() == 2);
    }

    #[test]
    fn rejects_string_where() {
        let f = doc! { "$where": "this.age > 21" };
        assert!(parse_filter(&f).is_err());
    }

    #[test]
    fn mod_rejects_zero_divisor() {
        let f = doc! { "x": { "$mod": [0, 1] } };
        assert!(parse_filter(&f).is_err());
    }

    #[test]
    fn empty_and_is_vacuously_true() {
        let f = doc! { "$and": [] };
        let expr = parse_filter(&f).unwrap();
        assert!(matches!(expr, Expression::And(v) if v.is_empty()));
    }

    #[test]
    fn empty_or_is_vacuously_false() {
        let f = doc! { "$or": [] };
        let expr = parse_filter(&f).unwrap();
        assert!(matches!(expr, Expression::Or(v) if v.is_empty()));
    }

    #[test]
    fn invalid_regex_flag_rejected() {
        let f = doc! { "x": { "$regex": "a", "$options": "z" } };
        assert!(parse_filter(&f).is_err());
    }

    #[test]
    fn top_level_not_negates_sub_filter() {
        let f = doc! { "$not": { "age": { "$gt": 21 } } };
        let expr = parse_filter(&f).unwrap();
        assert!(matches!(expr, Expression::Not(_)));
        assert!(!crate::evaluate(&expr, &doc! { "age": 30 }));
        assert!(crate::evaluate(&expr, &doc! { "age": 10 }));
    }
}
