/// Integration tests for the visitor base through the public API: custom
/// rewrite passes, registration order, and the structure-preservation
/// guarantee.
use cqlkit::engine::{OpenPermissions, PermissionFilter, QueryContext, QueryEngine, QueryResult};
use cqlkit::visitor::PredicateVisitor;
use cqlkit::{
    parse_predicate, CqlQuery, Predicate, QueryError, RewriterFactory, TextPredicate,
};
use std::borrow::Cow;
use std::sync::Arc;

struct NullEngine;

impl QueryEngine for NullEngine {
    fn execute(
        &self,
        _query: &CqlQuery,
        _filter: &dyn PermissionFilter,
        _context: &QueryContext,
    ) -> Result<QueryResult<i64>, QueryError> {
        Ok(QueryResult::empty())
    }

    fn execute_and_project(
        &self,
        _query: &CqlQuery,
        _filter: &dyn PermissionFilter,
        _context: &QueryContext,
    ) -> Result<QueryResult<String>, QueryError> {
        Ok(QueryResult::empty())
    }
}

/// Appends a marker to every value of one field. Used to observe
/// registration order.
struct TagField {
    field: &'static str,
    tag: &'static str,
}

impl PredicateVisitor for TagField {
    fn visit_text(&mut self, node: &Arc<Predicate>) -> Result<Arc<Predicate>, QueryError> {
        let Predicate::Text(text) = node.as_ref() else {
            return Ok(Arc::clone(node));
        };
        if text.field_name != self.field {
            return Ok(Arc::clone(node));
        }
        Ok(Arc::new(Predicate::Text(TextPredicate {
            value: format!("{}{}", text.value, self.tag).into(),
            ..text.clone()
        })))
    }
}

struct TagFieldFactory {
    field: &'static str,
    tag: &'static str,
}

impl RewriterFactory for TagFieldFactory {
    fn create(&self) -> Box<dyn PredicateVisitor> {
        Box::new(TagField {
            field: self.field,
            tag: self.tag,
        })
    }
}

#[test]
fn test_noop_pass_preserves_identity_at_every_level() {
    let tree = parse_predicate("+TypeIs:User +(Name:a Name:b)").unwrap();

    struct NoOp;
    impl PredicateVisitor for NoOp {}

    let visited = NoOp.visit(&tree).unwrap();
    assert!(Arc::ptr_eq(&tree, &visited));
}

#[test]
fn test_registered_passes_run_in_order() {
    let context = QueryContext::builder(Arc::new(NullEngine), Arc::new(OpenPermissions))
        .rewriter(Arc::new(TagFieldFactory {
            field: "Name",
            tag: "-first",
        }))
        .rewriter(Arc::new(TagFieldFactory {
            field: "Name",
            tag: "-second",
        }))
        .build();

    let query = CqlQuery::parse("Name:x").unwrap();
    let applied = query.apply_visitors(&context).unwrap();
    assert_eq!(applied.to_text(), "Name:x-first-second");
}

#[test]
fn test_pass_touching_nothing_keeps_the_query_instance() {
    let context = QueryContext::builder(Arc::new(NullEngine), Arc::new(OpenPermissions))
        .rewriter(Arc::new(TagFieldFactory {
            field: "NoSuchField",
            tag: "-tag",
        }))
        .build();

    let query = CqlQuery::parse("+TypeIs:User +(Name:a Name:b)").unwrap();
    let applied = query.apply_visitors(&context).unwrap();
    assert!(matches!(applied, Cow::Borrowed(_)));
}

#[test]
fn test_partial_rewrite_shares_untouched_subtrees() {
    let tree = parse_predicate("+TypeIs:User +(Name:a DisplayName:b)").unwrap();
    let mut pass = TagField {
        field: "Name",
        tag: "!",
    };
    let visited = pass.visit(&tree).unwrap();
    assert!(!Arc::ptr_eq(&tree, &visited));

    let (Predicate::Logic(before), Predicate::Logic(after)) = (tree.as_ref(), visited.as_ref())
    else {
        panic!("roots must stay boolean groups");
    };
    assert!(Arc::ptr_eq(
        &before.clauses[0].predicate,
        &after.clauses[0].predicate
    ));
    // rendered standalone, the subtree is its own root and gets no parens
    assert_eq!(after.clauses[1].predicate.to_string(), "Name:a! DisplayName:b");
}

#[test]
fn test_visitor_error_stops_the_traversal() {
    struct Reject;
    impl PredicateVisitor for Reject {
        fn visit_range(&mut self, _node: &Arc<Predicate>) -> Result<Arc<Predicate>, QueryError> {
            Err(QueryError::Unsupported {
                operation: "ranges in this pipeline".to_string(),
            })
        }
    }

    let tree = parse_predicate("+Name:a +Index:[1 TO 2]").unwrap();
    let err = Reject.visit(&tree).unwrap_err();
    assert!(matches!(err, QueryError::Unsupported { .. }));
}
