use dstore_query::{Expression, FieldOp};
use dstore_value::BsonTag;

use crate::validate::Schema;

/// Name an operator for compatibility reporting and for the restriction
/// table in [`operator_compatible`].
fn op_name(op: &FieldOp) -> &'static str {
    match op {
        FieldOp::Eq(_) => "$eq",
        FieldOp::Ne(_) => "$ne",
        FieldOp::Gt(_) => "$gt",
        FieldOp::Gte(_) => "$gte",
        FieldOp::Lt(_) => "$lt",
        FieldOp::Lte(_) => "$lte",
        FieldOp::In(_) => "$in",
        FieldOp::Nin(_) => "$nin",
        FieldOp::Exists(_) => "$exists",
        FieldOp::Type(_) => "$type",
        FieldOp::All(_) => "$all",
        FieldOp::Size(_) => "$size",
        FieldOp::ElemMatch(_) => "$elemMatch",
        FieldOp::Mod(_, _) => "$mod",
        FieldOp::Regex(_) => "$regex",
        FieldOp::BitsAllSet(_) => "$bitsAllSet",
        FieldOp::BitsAnySet(_) => "$bitsAnySet",
        FieldOp::BitsAllClear(_) => "$bitsAllClear",
        FieldOp::BitsAnyClear(_) => "$bitsAnyClear",
        FieldOp::Text(_) => "$text",
        FieldOp::Not(inner) => op_name(inner),
    }
}

/// Whether `op_name` makes sense against a value tagged `tag`. Operators not
/// named here are considered universally compatible (comparisons, `$exists`,
/// equality, logical combinators).
fn operator_compatible(name: &str, tag: BsonTag) -> bool {
    match name {
        "$mod" | "$bitsAllSet" | "$bitsAnySet" | "$bitsAllClear" | "$bitsAnyClear" => {
            matches!(tag, BsonTag::Int | BsonTag::Long | BsonTag::Double)
        }
        "$regex" | "$text" => matches!(tag, BsonTag::String),
        "$size" | "$all" | "$elemMatch" => matches!(tag, BsonTag::Array),
        _ => true,
    }
}

/// Result of checking a query filter against a [`Schema`].
#[derive(Debug, Clone, Default)]
pub struct QueryValidation {
    pub valid: bool,
    pub warnings: Vec<String>,
}

/// Walk a parsed filter and flag operator/type mismatches against `schema`.
///
/// In non-strict schemas, mismatches are reported as warnings only and
/// `valid` stays `true` (the filter still compiles and runs — it may just
/// never match anything). A field with a `strict` [`crate::FieldSchema`]
/// entry makes a mismatch a hard validation failure.
pub fn validate_query(schema: &Schema, expr: &Expression) -> QueryValidation {
    let mut warnings = Vec::new();
    let mut valid = true;
    walk(schema, expr, &mut warnings, &mut valid);
    QueryValidation { valid, warnings }
}

fn walk(schema: &Schema, expr: &Expression, warnings: &mut Vec<String>, valid: &mut bool) {
    match expr {
        Expression::And(children) | Expression::Or(children) | Expression::Nor(children) => {
            for child in children {
                walk(schema, child, warnings, valid);
            }
        }
        Expression::Not(inner) => walk(schema, inner, warnings, valid),
        Expression::Where(_) => {}
        Expression::Field(path, op) => {
            let Some(field) = schema.fields.get(path) else { return };
            if field.types.is_empty() {
                return;
            }
            let name = op_name(op);
            let compatible = field.types.iter().any(|t| operator_compatible(name, *t));
            if !compatible {
                let message = format!("operator {name} is never satisfiable on field '{path}' (declared types {:?})", field.types);
                if field.strict {
                    *valid = false;
                }
                warnings.push(message);
            }
        }
    }
}
