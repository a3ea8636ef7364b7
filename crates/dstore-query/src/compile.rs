use std::panic::{self, AssertUnwindSafe};

use bson::Document;

use crate::ast::Expression;
use crate::diagnostics::{QueryDiagnostics, TracingDiagnostics};
use crate::eval::evaluate_field_internal as eval_field;

/// A lowered, closed-form predicate equivalent to interpreting the source
/// [`Expression`] tree (`spec.md` §4.3).
///
/// Built once per filter and reused across every document in a scan —
/// regexes and `$text` tokens are already cached inside the `Expression`
/// leaves at parse time (`CachedRegex`, `TextSearch::tokens`); compiling
/// flattens the tree into a closure chain so each `find` no longer
/// re-destructures nested `Vec<Expression>` children per document.
pub struct CompiledQuery {
    predicate: Box<dyn Fn(&Document) -> bool + Send + Sync>,
}

impl CompiledQuery {
    pub fn matches(&self, doc: &Document) -> bool {
        (self.predicate)(doc)
    }
}

/// Lower an [`Expression`] into a [`CompiledQuery`].
///
/// Never fails in this engine — every structural error is already rejected
/// by `parse_filter` at parse time, per `spec.md` §4.3 ("compile falls back
/// to the interpreter only for optimizer-side issues, never to mask a
/// malformed filter"); there are no optimizer-side failure modes here, so
/// compilation is infallible. Kept as a `Result` for interface stability.
pub fn compile(expr: &Expression) -> Result<CompiledQuery, std::convert::Infallible> {
    Ok(CompiledQuery {
        predicate: compile_node(expr.clone()),
    })
}

fn compile_node(expr: Expression) -> Box<dyn Fn(&Document) -> bool + Send + Sync> {
    match expr {
        Expression::And(children) => {
            let compiled: Vec<_> = children.into_iter().map(compile_node).collect();
            Box::new(move |doc| compiled.iter().all(|c| c(doc)))
        }
        Expression::Or(children) => {
            let compiled: Vec<_> = children.into_iter().map(compile_node).collect();
            Box::new(move |doc| !compiled.is_empty() && compiled.iter().any(|c| c(doc)))
        }
        Expression::Nor(children) => {
            let compiled: Vec<_> = children.into_iter().map(compile_node).collect();
            Box::new(move |doc| !compiled.iter().any(|c| c(doc)))
        }
        Expression::Not(inner) => {
            let compiled = compile_node(*inner);
            Box::new(move |doc| !compiled(doc))
        }
        Expression::Field(path, op) => {
            let diag = TracingDiagnostics;
            Box::new(move |doc| eval_field(&path, &op, doc, &diag))
        }
        Expression::Where(pred) => Box::new(move |doc| {
            let f = &pred.0;
            match panic::catch_unwind(AssertUnwindSafe(|| f(doc))) {
                Ok(b) => b,
                Err(_) => {
                    TracingDiagnostics.where_predicate_panicked("$where predicate panicked");
                    false
                }
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::evaluate;
    use crate::parse::parse_filter;
    use bson::doc;
    use proptest::prelude::*;

    #[test]
    fn compiled_matches_interpreted_s1() {
        let filter = doc! { "age": { "$gt": 28 } };
        let expr = parse_filter(&filter).unwrap();
        let compiled = compile(&expr).unwrap();
        for (age, expected) in [(25, false), (30, true), (35, true)] {
            let d = doc! { "age": age };
            assert_eq!(evaluate(&expr, &d), expected);
            assert_eq!(compiled.matches(&d), expected);
        }
    }

    proptest! {
        #[test]
        fn compiled_equals_interpreted_over_random_docs(
            threshold in -50i32..50,
            age in -100i32..100,
            name in "[a-z]{1,8}",
        ) {
            let filter = doc! { "$and": [ { "age": { "$gte": threshold } }, { "name": { "$regex": "^[a-z]+$" } } ] };
            let expr = parse_filter(&filter).unwrap();
            let compiled = compile(&expr).unwrap();
            let d = doc! { "age": age, "name": name };
            prop_assert_eq!(evaluate(&expr, &d), compiled.matches(&d));
        }
    }
}
