use std::panic::{self, AssertUnwindSafe};

use bson::{Bson, Document};
use dstore_value::{compare, deep_equal, tag_of, Comparison};

use crate::ast::{Expression, FieldOp, InMatcher};
use crate::diagnostics::{QueryDiagnostics, TracingDiagnostics};
use crate::normalize::normalize_text;

/// Evaluate `expr` against `doc`, logging evaluation-time failures through
/// the default `tracing`-backed diagnostic sink.
pub fn evaluate(expr: &Expression, doc: &Document) -> bool {
    evaluate_with(expr, doc, &TracingDiagnostics)
}

/// Evaluate `expr` against `doc`, reporting evaluation-time failures through
/// a caller-supplied sink (`spec.md` §7).
pub fn evaluate_with(expr: &Expression, doc: &Document, diag: &dyn QueryDiagnostics) -> bool {
    eval_ctx(expr, &Ctx::Doc(doc), diag)
}

/// Evaluation context: either the root document, or a value reached while
/// recursing into `$elemMatch` (which may test operators against a bare
/// array element rather than a named field of a document).
enum Ctx<'a> {
    Doc(&'a Document),
    Val(&'a Bson),
}

impl<'a> Ctx<'a> {
    fn get(&self, path: &str) -> Option<&'a Bson> {
        match self {
            Ctx::Doc(d) => resolve_doc(d, path),
            Ctx::Val(v) => resolve_value(v, path),
        }
    }
}

fn resolve_doc<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.splitn(2, '.');
    let first = parts.next()?;
    let rest = parts.next().unwrap_or("");
    let value = doc.get(first)?;
    if rest.is_empty() {
        Some(value)
    } else {
        resolve_value(value, rest)
    }
}

fn resolve_value<'a>(value: &'a Bson, path: &str) -> Option<&'a Bson> {
    if path.is_empty() {
        return Some(value);
    }
    let mut parts = path.splitn(2, '.');
    let first = parts.next().unwrap();
    let rest = parts.next().unwrap_or("");
    let next = match value {
        Bson::Document(d) => d.get(first)?,
        Bson::Array(items) => items.get(first.parse::<usize>().ok()?)?,
        _ => return None,
    };
    if rest.is_empty() {
        Some(next)
    } else {
        resolve_value(next, rest)
    }
}

fn eval_ctx(expr: &Expression, ctx: &Ctx, diag: &dyn QueryDiagnostics) -> bool {
    match expr {
        Expression::And(children) => children.iter().all(|c| eval_ctx(c, ctx, diag)),
        Expression::Or(children) => !children.is_empty() && children.iter().any(|c| eval_ctx(c, ctx, diag)),
        Expression::Nor(children) => !children.iter().any(|c| eval_ctx(c, ctx, diag)),
        Expression::Not(inner) => !eval_ctx(inner, ctx, diag),
        Expression::Field(path, op) => eval_field(path, op, ctx, diag),
        Expression::Where(pred) => match ctx {
            Ctx::Doc(doc) => {
                let f = &pred.0;
                match panic::catch_unwind(AssertUnwindSafe(|| f(doc))) {
                    Ok(b) => b,
                    Err(_) => {
                        diag.where_predicate_panicked("$where predicate panicked");
                        false
                    }
                }
            }
            Ctx::Val(_) => false,
        },
    }
}

/// Evaluate a single field operator against a document root. Exposed for
/// the compiler (`compile.rs`), which flattens the tree into closures but
/// still dispatches leaf operators through the same logic as the
/// interpreter so the two stay equivalent by construction.
pub(crate) fn evaluate_field_internal(
    path: &str,
    op: &FieldOp,
    doc: &Document,
    diag: &dyn QueryDiagnostics,
) -> bool {
    eval_field(path, op, &Ctx::Doc(doc), diag)
}

fn eval_field(path: &str, op: &FieldOp, ctx: &Ctx, diag: &dyn QueryDiagnostics) -> bool {
    match op {
        FieldOp::Not(inner) => !eval_field(path, inner, ctx, diag),
        FieldOp::Exists(expected) => *expected == ctx.get(path).is_some(),
        FieldOp::Eq(q) => field_eq(ctx.get(path), q),
        FieldOp::Ne(q) => !field_eq(ctx.get(path), q),
        FieldOp::In(list) => in_match(ctx.get(path), list),
        FieldOp::Nin(list) => !in_match(ctx.get(path), list),
        FieldOp::Type(tags) => match ctx.get(path) {
            Some(v) => tags.contains(&tag_of(v)),
            None => false,
        },
        FieldOp::All(list) => match ctx.get(path) {
            Some(Bson::Array(items)) => list.iter().all(|q| items.iter().any(|it| deep_equal(it, q))),
            Some(v) => list.len() == 1 && deep_equal(v, &list[0]),
            None => list.is_empty(),
        },
        FieldOp::Size(n) => matches!(ctx.get(path), Some(Bson::Array(items)) if items.len() as i64 == *n),
        FieldOp::ElemMatch(inner) => match ctx.get(path) {
            Some(Bson::Array(items)) => items.iter().any(|elem| eval_ctx(inner, &Ctx::Val(elem), diag)),
            _ => false,
        },
        _ => match ctx.get(path) {
            None => false,
            Some(v) => eval_broadcast(op, v, diag),
        },
    }
}

/// "When a field resolves to an array and the operator is not in {$all,
/// $size, $elemMatch, $type, $exists, $in, $nin}, the operator is evaluated
/// element-wise (existential semantics)" — `spec.md` §4.2.
fn eval_broadcast(op: &FieldOp, value: &Bson, diag: &dyn QueryDiagnostics) -> bool {
    match value {
        Bson::Array(items) => eval_single(op, value, diag) || items.iter().any(|e| eval_single(op, e, diag)),
        other => eval_single(op, other, diag),
    }
}

fn eval_single(op: &FieldOp, v: &Bson, _diag: &dyn QueryDiagnostics) -> bool {
    match op {
        FieldOp::Gt(q) => compare(v, q) == Comparison::Greater,
        FieldOp::Gte(q) => matches!(compare(v, q), Comparison::Greater | Comparison::Equal),
        FieldOp::Lt(q) => compare(v, q) == Comparison::Less,
        FieldOp::Lte(q) => matches!(compare(v, q), Comparison::Less | Comparison::Equal),
        FieldOp::Regex(re) => matches!(v, Bson::String(s) if re.regex.is_match(s)),
        FieldOp::Mod(d, r) => as_i128(v).is_some_and(|n| n % d == *r),
        FieldOp::BitsAllSet(mask) => as_i64(v).is_some_and(|n| (n as u64 & mask) == *mask),
        FieldOp::BitsAnySet(mask) => as_i64(v).is_some_and(|n| (n as u64 & mask) != 0),
        FieldOp::BitsAllClear(mask) => as_i64(v).is_some_and(|n| (n as u64 & mask) == 0),
        FieldOp::BitsAnyClear(mask) => as_i64(v).is_some_and(|n| (n as u64 & mask) != *mask),
        FieldOp::Text(t) => match v {
            Bson::String(s) => {
                let normalized = normalize_text(s, t.case_sensitive, t.diacritic_sensitive);
                t.tokens.iter().all(|tok| normalized.contains(tok.as_str()))
            }
            _ => false,
        },
        // Eq/Ne/In/Nin/Exists/Type/All/Size/ElemMatch/Not are handled in eval_field.
        _ => false,
    }
}

fn field_eq(value: Option<&Bson>, query: &Bson) -> bool {
    match query {
        Bson::Undefined => value.is_none() || matches!(value, Some(Bson::Undefined)),
        Bson::Null => value.is_none() || matches!(value, Some(Bson::Null)),
        _ => match value {
            None => false,
            Some(v) => {
                if deep_equal(v, query) {
                    true
                } else if let Bson::Array(items) = v {
                    items.iter().any(|it| deep_equal(it, query))
                } else {
                    false
                }
            }
        },
    }
}

fn in_match(value: Option<&Bson>, list: &[InMatcher]) -> bool {
    list.iter().any(|m| match m {
        InMatcher::Value(q) => field_eq(value, q),
        InMatcher::Regex(re) => match value {
            Some(Bson::String(s)) => re.regex.is_match(s),
            Some(Bson::Array(items)) => items
                .iter()
                .any(|it| matches!(it, Bson::String(s) if re.regex.is_match(s))),
            _ => false,
        },
    })
}

fn as_i128(v: &Bson) -> Option<i128> {
    match v {
        Bson::Int32(n) => Some(*n as i128),
        Bson::Int64(n) => Some(*n as i128),
        _ => None,
    }
}

fn as_i64(v: &Bson) -> Option<i64> {
    match v {
        Bson::Int32(n) => Some(*n as i64),
        Bson::Int64(n) => Some(*n),
        _ => None,
    }
}
