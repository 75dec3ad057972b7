//! Predicate tree for parsed content queries.
//!
//! A query is represented as an immutable tree of [`Predicate`] nodes:
//!
//! - [`TextPredicate`] - a single field/value term match, optionally carrying
//!   a boost or fuzzy factor
//! - [`RangePredicate`] - a half-open or closed range over one field
//! - [`LogicPredicate`] - a boolean group of [`BoolClause`]s, each with a
//!   Must/Should/MustNot occurrence
//!
//! Nodes are shared through `Arc`, so rewrite passes can hand back the exact
//! same node when nothing changed and callers can detect "no rewrite
//! happened" with a cheap pointer comparison (`Arc::ptr_eq`) instead of a
//! deep structural one. Nothing in this module mutates a node after
//! construction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Boolean-clause role within a [`LogicPredicate`].
///
/// `Default` is what the parser assigns to an unprefixed clause; every
/// consumer treats it as `Should`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Occur {
    /// No explicit prefix. Interpreted as `Should`.
    #[default]
    Default,
    /// The clause may match (OR).
    Should,
    /// The clause must match (AND), written `+` in query text.
    Must,
    /// The clause must not match (AND NOT), written `-` in query text.
    MustNot,
}

impl Occur {
    /// True for `Must`, false for everything else.
    pub fn is_must(self) -> bool {
        self == Occur::Must
    }

    /// True for `Should` and for the parser's `Default`.
    pub fn is_should(self) -> bool {
        matches!(self, Occur::Should | Occur::Default)
    }
}

/// A typed value attached to a [`TextPredicate`] or [`RangePredicate`].
///
/// Multi-valued membership sets (the sharing field) use `StringArray`;
/// everything the parser produces is `String`. Scalar variants exist for
/// programmatically built predicates such as the lifespan window.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum IndexValue {
    String(String),
    StringArray(Vec<String>),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    DateTime(DateTime<Utc>),
}

/// Discriminant of an [`IndexValue`], for callers that dispatch on the
/// stored type without caring about the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum IndexValueType {
    String,
    StringArray,
    Int,
    Long,
    Float,
    Double,
    Bool,
    DateTime,
}

impl IndexValue {
    pub fn value_type(&self) -> IndexValueType {
        match self {
            IndexValue::String(_) => IndexValueType::String,
            IndexValue::StringArray(_) => IndexValueType::StringArray,
            IndexValue::Int(_) => IndexValueType::Int,
            IndexValue::Long(_) => IndexValueType::Long,
            IndexValue::Float(_) => IndexValueType::Float,
            IndexValue::Double(_) => IndexValueType::Double,
            IndexValue::Bool(_) => IndexValueType::Bool,
            IndexValue::DateTime(_) => IndexValueType::DateTime,
        }
    }

    /// The value as a list of term strings.
    ///
    /// `StringArray` yields its elements, every other variant yields its
    /// single textual form. Used by the sharing rewrite, which treats each
    /// value as a set of membership tokens.
    pub fn terms(&self) -> Vec<String> {
        match self {
            IndexValue::StringArray(values) => values.clone(),
            other => vec![other.to_string()],
        }
    }
}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexValue::String(s) => write!(f, "{}", s),
            IndexValue::StringArray(values) => write!(f, "{}", values.join(",")),
            IndexValue::Int(n) => write!(f, "{}", n),
            IndexValue::Long(n) => write!(f, "{}", n),
            IndexValue::Float(n) => write!(f, "{}", n),
            IndexValue::Double(n) => write!(f, "{}", n),
            IndexValue::Bool(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
            IndexValue::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

impl From<&str> for IndexValue {
    fn from(value: &str) -> Self {
        IndexValue::String(value.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(value: String) -> Self {
        IndexValue::String(value)
    }
}

/// A single field/value term match.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextPredicate {
    /// Name of the indexed field the term matches against.
    pub field_name: String,
    /// Term value. Wildcard characters (`*`, `?`) keep their index-level
    /// meaning inside the string.
    pub value: IndexValue,
    /// Score boost, emitted as `^n` in query text when it differs from the
    /// default.
    pub boost: Option<f64>,
    /// Fuzzy-match factor, emitted as `~n` in query text when it differs
    /// from the default.
    pub fuzzy_value: Option<f64>,
}

/// A range match over one field. `min`/`max` may each be absent for
/// open-ended ranges; exclusivity is tracked per bound.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RangePredicate {
    pub field_name: String,
    pub min: Option<IndexValue>,
    pub max: Option<IndexValue>,
    pub min_exclusive: bool,
    pub max_exclusive: bool,
    pub boost: Option<f64>,
}

/// A boolean group of clauses.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogicPredicate {
    pub clauses: Vec<BoolClause>,
}

/// One clause of a [`LogicPredicate`]: an inner predicate plus its
/// occurrence. Clauses are cheap to clone; the predicate is shared.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoolClause {
    pub predicate: Arc<Predicate>,
    pub occur: Occur,
}

impl BoolClause {
    pub fn new(predicate: Arc<Predicate>, occur: Occur) -> Self {
        Self { predicate, occur }
    }
}

/// A node of the parsed query tree.
///
/// The set of node kinds is closed: rewrite passes match exhaustively and
/// the compiler rejects any pass that forgets a kind.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Predicate {
    Text(TextPredicate),
    Range(RangePredicate),
    Logic(LogicPredicate),
}

impl Predicate {
    /// Build a term predicate with no boost or fuzzy factor.
    pub fn text(field_name: impl Into<String>, value: impl Into<IndexValue>) -> Arc<Self> {
        Arc::new(Predicate::Text(TextPredicate {
            field_name: field_name.into(),
            value: value.into(),
            boost: None,
            fuzzy_value: None,
        }))
    }

    /// Build a range predicate.
    pub fn range(
        field_name: impl Into<String>,
        min: Option<IndexValue>,
        max: Option<IndexValue>,
        min_exclusive: bool,
        max_exclusive: bool,
    ) -> Arc<Self> {
        Arc::new(Predicate::Range(RangePredicate {
            field_name: field_name.into(),
            min,
            max,
            min_exclusive,
            max_exclusive,
            boost: None,
        }))
    }

    /// Build a boolean group from clauses.
    pub fn logic(clauses: Vec<BoolClause>) -> Arc<Self> {
        Arc::new(Predicate::Logic(LogicPredicate { clauses }))
    }

    /// The field name for leaf predicates, `None` for boolean groups.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Predicate::Text(text) => Some(&text.field_name),
            Predicate::Range(range) => Some(&range.field_name),
            Predicate::Logic(_) => None,
        }
    }
}

/// One sort instruction of a query, parsed from `.SORT:field` or
/// `.REVERSESORT:field`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SortInfo {
    pub field_name: String,
    pub reverse: bool,
}

impl SortInfo {
    pub fn new(field_name: impl Into<String>, reverse: bool) -> Self {
        Self {
            field_name: field_name.into(),
            reverse,
        }
    }
}

/// Three-state switch for the implicitly injected filters. `Default` defers
/// to the per-filter default (autofilter on, lifespan off).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum FilterStatus {
    #[default]
    Default,
    Enabled,
    Disabled,
}

/// Execution-mode hint passed through to the engines. `Quick` is written
/// `.QUICK` in query text and asks the engine for a faster, possibly less
/// exact evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum ExecutionMode {
    #[default]
    Default,
    Quick,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_value_terms_scalar() {
        let value = IndexValue::String("admin".to_string());
        assert_eq!(value.terms(), vec!["admin".to_string()]);
    }

    #[test]
    fn test_index_value_terms_array() {
        let value = IndexValue::StringArray(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(value.terms(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_index_value_display_bool() {
        assert_eq!(IndexValue::Bool(true).to_string(), "yes");
        assert_eq!(IndexValue::Bool(false).to_string(), "no");
    }

    #[test]
    fn test_index_value_type_discriminant() {
        assert_eq!(
            IndexValue::StringArray(vec![]).value_type(),
            IndexValueType::StringArray
        );
        assert_eq!(IndexValue::Long(7).value_type(), IndexValueType::Long);
    }

    #[test]
    fn test_occur_default_is_should() {
        assert!(Occur::Default.is_should());
        assert!(Occur::Should.is_should());
        assert!(!Occur::Must.is_should());
        assert!(!Occur::MustNot.is_should());
    }

    #[test]
    fn test_predicate_field_name() {
        let text = Predicate::text("Name", "admin");
        assert_eq!(text.field_name(), Some("Name"));

        let logic = Predicate::logic(vec![BoolClause::new(text, Occur::Must)]);
        assert_eq!(logic.field_name(), None);
    }

    #[test]
    fn test_shared_nodes_compare_by_pointer() {
        let leaf = Predicate::text("Name", "admin");
        let same = leaf.clone();
        let equal_copy = Predicate::text("Name", "admin");

        assert!(Arc::ptr_eq(&leaf, &same));
        assert!(!Arc::ptr_eq(&leaf, &equal_copy));
        assert_eq!(leaf, equal_copy);
    }
}
