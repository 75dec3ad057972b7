//! Query shape statistics for diagnostics and tuning.
//!
//! [`classify`] walks a query once, read-only, and produces an immutable
//! [`QueryInfo`] snapshot: clause counts by occurrence, boolean node
//! count, and a breakdown of the leaf predicates by matching style.

use crate::ast::{LogicPredicate, Predicate};
use crate::error::QueryError;
use crate::query::CqlQuery;
use crate::visitor::PredicateVisitor;
use serde::Serialize;
use std::sync::Arc;

/// Shape statistics of one query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QueryInfo {
    /// Clause counts by occurrence. Unprefixed clauses count as should.
    pub should_clauses: usize,
    pub must_clauses: usize,
    pub must_not_clauses: usize,
    /// Number of boolean group nodes in the tree.
    pub boolean_nodes: usize,
    /// Plain term matches: no wildcard, no fuzzy factor.
    pub term_queries: usize,
    /// Single trailing `*`, no other wildcard characters.
    pub prefix_queries: usize,
    /// Any other use of `*` or `?`.
    pub wildcard_queries: usize,
    /// Terms carrying a fuzzy factor.
    pub fuzzy_queries: usize,
    /// All range predicates.
    pub range_queries: usize,
    /// Ranges with both bounds present.
    pub closed_ranges: usize,
    /// Ranges with one open end.
    pub open_ranges: usize,
    /// Paging and sorting, copied from the query for one-stop diagnostics.
    pub top: usize,
    pub skip: usize,
    pub sort_fields: Vec<String>,
    pub count_only: bool,
    pub all_versions: bool,
}

/// Compute shape statistics for a full query.
pub fn classify(query: &CqlQuery) -> Result<QueryInfo, QueryError> {
    let mut info = classify_predicate(&query.tree)?;
    info.top = query.top;
    info.skip = query.skip;
    info.sort_fields = query
        .sort
        .iter()
        .map(|sort| sort.field_name.clone())
        .collect();
    info.count_only = query.count_only;
    info.all_versions = query.all_versions;
    Ok(info)
}

/// Compute shape statistics for a bare predicate tree.
pub fn classify_predicate(tree: &Arc<Predicate>) -> Result<QueryInfo, QueryError> {
    let mut classifier = Classifier::default();
    classifier.visit(tree)?;
    Ok(classifier.info)
}

#[derive(Default)]
struct Classifier {
    info: QueryInfo,
}

impl PredicateVisitor for Classifier {
    fn visit_text(&mut self, node: &Arc<Predicate>) -> Result<Arc<Predicate>, QueryError> {
        if let Predicate::Text(text) = node.as_ref() {
            let value = text.value.to_string();
            let wildcards = value.chars().filter(|c| matches!(c, '*' | '?')).count();
            if text.fuzzy_value.is_some() {
                self.info.fuzzy_queries += 1;
            } else if wildcards == 1 && value.ends_with('*') {
                self.info.prefix_queries += 1;
            } else if wildcards > 0 {
                self.info.wildcard_queries += 1;
            } else {
                self.info.term_queries += 1;
            }
        }
        Ok(Arc::clone(node))
    }

    fn visit_range(&mut self, node: &Arc<Predicate>) -> Result<Arc<Predicate>, QueryError> {
        if let Predicate::Range(range) = node.as_ref() {
            self.info.range_queries += 1;
            if range.min.is_some() && range.max.is_some() {
                self.info.closed_ranges += 1;
            } else {
                self.info.open_ranges += 1;
            }
        }
        Ok(Arc::clone(node))
    }

    fn visit_logic(
        &mut self,
        node: &Arc<Predicate>,
        logic: &LogicPredicate,
    ) -> Result<Arc<Predicate>, QueryError> {
        self.info.boolean_nodes += 1;
        for clause in &logic.clauses {
            if clause.occur.is_must() {
                self.info.must_clauses += 1;
            } else if clause.occur.is_should() {
                self.info.should_clauses += 1;
            } else {
                self.info.must_not_clauses += 1;
            }
            self.visit(&clause.predicate)?;
        }
        Ok(Arc::clone(node))
    }
}
