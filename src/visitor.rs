//! Rewrite traversal over predicate trees.
//!
//! [`PredicateVisitor`] walks a tree and produces a (possibly) rewritten
//! tree. The default implementation is structure-preserving: when no
//! override changes anything, `visit` returns the exact node it was given,
//! so a caller can detect a no-op pass with `Arc::ptr_eq` on the root.
//! Clause lists are copied lazily - the first changed clause allocates the
//! new list and the clauses examined before it are carried over as-is.
//!
//! Passes override `visit_text`, `visit_range` or `visit_logic`
//! selectively; dispatch over the node kinds is exhaustive, so a new
//! predicate kind is a compile error in every pass rather than a runtime
//! fallback.

use crate::ast::{BoolClause, LogicPredicate, Predicate};
use crate::error::QueryError;
use std::sync::Arc;

/// A tree-rewriting traversal with per-kind hooks.
///
/// `visit` never mutates nodes in place; it returns either the input `Arc`
/// unchanged or a newly allocated node. Errors abort the whole traversal.
pub trait PredicateVisitor {
    /// Dispatch on the node kind. Usually not overridden.
    fn visit(&mut self, node: &Arc<Predicate>) -> Result<Arc<Predicate>, QueryError> {
        match node.as_ref() {
            Predicate::Text(_) => self.visit_text(node),
            Predicate::Range(_) => self.visit_range(node),
            Predicate::Logic(logic) => self.visit_logic(node, logic),
        }
    }

    /// Term predicate hook. Default: no rewrite.
    fn visit_text(&mut self, node: &Arc<Predicate>) -> Result<Arc<Predicate>, QueryError> {
        Ok(Arc::clone(node))
    }

    /// Range predicate hook. Default: no rewrite.
    fn visit_range(&mut self, node: &Arc<Predicate>) -> Result<Arc<Predicate>, QueryError> {
        Ok(Arc::clone(node))
    }

    /// Boolean group hook. The default visits every clause and rebuilds the
    /// group only when at least one clause changed.
    fn visit_logic(
        &mut self,
        node: &Arc<Predicate>,
        logic: &LogicPredicate,
    ) -> Result<Arc<Predicate>, QueryError> {
        match self.visit_clauses(&logic.clauses)? {
            Some(clauses) => Ok(Predicate::logic(clauses)),
            None => Ok(Arc::clone(node)),
        }
    }

    /// Walk a clause list copy-on-write.
    ///
    /// Returns `None` when every clause came back identical, otherwise the
    /// full rewritten list. The new list is only allocated when the first
    /// difference shows up; clauses before that point are carried over.
    fn visit_clauses(
        &mut self,
        clauses: &[BoolClause],
    ) -> Result<Option<Vec<BoolClause>>, QueryError> {
        let mut rewritten: Option<Vec<BoolClause>> = None;
        for (index, clause) in clauses.iter().enumerate() {
            let visited = self.visit_clause(clause)?;
            let changed =
                !Arc::ptr_eq(&clause.predicate, &visited.predicate) || clause.occur != visited.occur;
            match rewritten.as_mut() {
                Some(list) => list.push(visited),
                None if changed => {
                    let mut list = Vec::with_capacity(clauses.len());
                    list.extend_from_slice(&clauses[..index]);
                    list.push(visited);
                    rewritten = Some(list);
                }
                None => {}
            }
        }
        Ok(rewritten)
    }

    /// Visit one clause; re-wraps only when the inner predicate changed.
    /// The occurrence is preserved.
    fn visit_clause(&mut self, clause: &BoolClause) -> Result<BoolClause, QueryError> {
        let visited = self.visit(&clause.predicate)?;
        if Arc::ptr_eq(&clause.predicate, &visited) {
            Ok(clause.clone())
        } else {
            Ok(BoolClause::new(visited, clause.occur))
        }
    }
}
