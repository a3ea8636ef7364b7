use std::fmt;
use std::sync::Arc;

use bson::Bson;
use dstore_value::BsonTag;
use regex::Regex;

/// A recursive filter expression tree (`spec.md` §4.2).
///
/// Owns field names and values so the tree can outlive the document it was
/// parsed from — the same shape as `slate-db/src/expression/mod.rs`'s
/// `Expression`, generalized to the full operator set in `spec.md`.
#[derive(Debug, Clone)]
pub enum Expression {
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Nor(Vec<Expression>),
    Not(Box<Expression>),
    /// A condition on a single (possibly dotted) field path.
    Field(String, FieldOp),
    /// `$where` gate, evaluated once per document after everything else
    /// returns true. Only constructible from Rust (never parsed from a BSON
    /// string — see `spec.md` §9's design note).
    Where(WherePredicate),
}

/// Per-field operator, evaluated against the value(s) found at a field path.
#[derive(Debug, Clone)]
pub enum FieldOp {
    Eq(Bson),
    Ne(Bson),
    Gt(Bson),
    Gte(Bson),
    Lt(Bson),
    Lte(Bson),
    In(Vec<InMatcher>),
    Nin(Vec<InMatcher>),
    Exists(bool),
    Type(Vec<BsonTag>),
    All(Vec<Bson>),
    Size(i64),
    ElemMatch(Box<Expression>),
    Mod(i128, i128),
    Regex(CachedRegex),
    BitsAllSet(u64),
    BitsAnySet(u64),
    BitsAllClear(u64),
    BitsAnyClear(u64),
    Text(TextSearch),
    /// Field-scoped `$not`: negates a single nested operator (or regex).
    Not(Box<FieldOp>),
}

/// Operators for which array fields are matched as a whole value rather than
/// broadcast element-wise (`spec.md` §4.2 "Field path traversal").
impl FieldOp {
    pub fn is_array_whole_value(&self) -> bool {
        matches!(
            self,
            FieldOp::All(_)
                | FieldOp::Size(_)
                | FieldOp::ElemMatch(_)
                | FieldOp::Type(_)
                | FieldOp::Exists(_)
                | FieldOp::In(_)
                | FieldOp::Nin(_)
        )
    }
}

/// An element of an `$in`/`$nin` list: either a literal value (compared via
/// `deep_equal`/whole-or-element semantics) or a pre-compiled regex
/// (matched against string values), per `spec.md` §4.2.
#[derive(Debug, Clone)]
pub enum InMatcher {
    Value(Bson),
    Regex(CachedRegex),
}

/// A compiled regex plus the source text needed for `deep_equal`-style
/// comparisons and `Clone`/`Debug`.
#[derive(Clone)]
pub struct CachedRegex {
    pub source: String,
    pub flags: String,
    pub regex: Regex,
}

impl fmt::Debug for CachedRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

impl PartialEq for CachedRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

/// Valid `$regex` flag set, per `spec.md` §4.2: only `gimsuy`.
pub const VALID_REGEX_FLAGS: &str = "gimsuy";

#[derive(Debug, Clone)]
pub struct TextSearch {
    pub search: String,
    pub case_sensitive: bool,
    pub diacritic_sensitive: bool,
    pub tokens: Vec<String>,
}

/// A host-supplied `$where` predicate. Evaluated against the full document.
#[derive(Clone)]
pub struct WherePredicate(pub Arc<dyn Fn(&bson::Document) -> bool + Send + Sync>);

impl fmt::Debug for WherePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<where predicate>")
    }
}

impl WherePredicate {
    pub fn new(f: impl Fn(&bson::Document) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }
}

impl Expression {
    /// Attach a `$where` gate, AND-ed with the rest of the expression and
    /// evaluated exactly once per document after it (`spec.md` §4.3).
    pub fn and_where(self, predicate: WherePredicate) -> Expression {
        Expression::And(vec![self, Expression::Where(predicate)])
    }
}
