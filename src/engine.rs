//! Execution boundary: the engines a query runs against.
//!
//! This crate compiles and rewrites queries; it does not own a search
//! index. The host injects:
//!
//! - a [`QueryEngine`] - the authoritative index, expected to fail loudly
//! - optionally a [`MetaQueryEngine`] - a fast path that may decline any
//!   query (`Ok(None)` and `Err` are both treated as "not handled")
//! - a [`PermissionFilterFactory`] - per-candidate authorization, invoked
//!   by the engine for every hit
//! - an ordered list of [`RewriterFactory`]s - the rewrite passes applied
//!   before execution
//!
//! All of that lives on [`QueryContext`], built once at startup and passed
//! by reference into every call. There is no process-wide registry.

use crate::ast::Predicate;
use crate::error::QueryError;
use crate::parser;
use crate::query::CqlQuery;
use crate::visitor::PredicateVisitor;
use serde::Serialize;
use std::sync::{Arc, OnceLock};

/// Fixed clause injected by the autofilter: system content is excluded
/// unless the query author turns the filter off.
const AUTOFILTER_QUERY: &str = "IsSystemContent:no";

/// Hits plus the total match count (which may exceed `hits.len()` when
/// paging is in effect).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueryResult<T> {
    pub hits: Vec<T>,
    pub total_count: usize,
}

impl<T> QueryResult<T> {
    pub fn new(hits: Vec<T>, total_count: usize) -> Self {
        Self { hits, total_count }
    }

    pub fn empty() -> Self {
        Self {
            hits: Vec::new(),
            total_count: 0,
        }
    }
}

/// Per-candidate authorization check, called by the engine for every
/// potential hit.
pub trait PermissionFilter {
    fn is_permitted(&self, node_id: i64, is_last_public: bool, is_last_draft: bool) -> bool;
}

/// Creates the [`PermissionFilter`] for one query execution.
pub trait PermissionFilterFactory: Send + Sync {
    fn create(&self, query: &CqlQuery, context: &QueryContext) -> Box<dyn PermissionFilter>;
}

/// A filter that permits everything. For hosts without a security model
/// and for tests.
pub struct OpenPermissionFilter;

impl PermissionFilter for OpenPermissionFilter {
    fn is_permitted(&self, _node_id: i64, _is_last_public: bool, _is_last_draft: bool) -> bool {
        true
    }
}

/// Factory counterpart of [`OpenPermissionFilter`].
pub struct OpenPermissions;

impl PermissionFilterFactory for OpenPermissions {
    fn create(&self, _query: &CqlQuery, _context: &QueryContext) -> Box<dyn PermissionFilter> {
        Box::new(OpenPermissionFilter)
    }
}

/// The authoritative search index.
///
/// `execute` must return a result for every well-formed query and raise
/// `QueryError::ExecutionFailed` only on genuine failure - "no match" is
/// an empty result, not an error.
pub trait QueryEngine: Send + Sync {
    fn execute(
        &self,
        query: &CqlQuery,
        filter: &dyn PermissionFilter,
        context: &QueryContext,
    ) -> Result<QueryResult<i64>, QueryError>;

    /// Field-projection counterpart of `execute`: hits are projected field
    /// values instead of node ids.
    fn execute_and_project(
        &self,
        query: &CqlQuery,
        filter: &dyn PermissionFilter,
        context: &QueryContext,
    ) -> Result<QueryResult<String>, QueryError>;
}

/// Optional fast-path engine consulted before [`QueryEngine`].
///
/// Returning `Ok(None)` means "I decline this query"; an `Err` is treated
/// the same way by the caller. It never aborts a query on its own.
pub trait MetaQueryEngine: Send + Sync {
    fn try_execute(
        &self,
        query: &CqlQuery,
        filter: &dyn PermissionFilter,
        context: &QueryContext,
    ) -> Result<Option<QueryResult<i64>>, QueryError>;

    fn try_execute_and_project(
        &self,
        query: &CqlQuery,
        filter: &dyn PermissionFilter,
        context: &QueryContext,
    ) -> Result<Option<QueryResult<String>>, QueryError>;
}

/// Creates one rewrite pass. Registered passes run in registration order
/// over every executed query; each execution gets a fresh visitor so
/// passes may keep per-run state.
pub trait RewriterFactory: Send + Sync {
    fn create(&self) -> Box<dyn PredicateVisitor>;
}

/// Execution-time configuration for queries.
///
/// Built once at startup via [`QueryContext::builder`] and shared by
/// reference. The autofilter clause is parsed on first use and cached for
/// the lifetime of the context.
pub struct QueryContext {
    user_id: i64,
    engine: Arc<dyn QueryEngine>,
    meta_engine: Option<Arc<dyn MetaQueryEngine>>,
    permission_filters: Arc<dyn PermissionFilterFactory>,
    rewriters: Vec<Arc<dyn RewriterFactory>>,
    autofilter: OnceLock<Arc<Predicate>>,
}

impl QueryContext {
    pub fn builder(
        engine: Arc<dyn QueryEngine>,
        permission_filters: Arc<dyn PermissionFilterFactory>,
    ) -> QueryContextBuilder {
        QueryContextBuilder {
            user_id: 0,
            engine,
            meta_engine: None,
            permission_filters,
            rewriters: Vec::new(),
        }
    }

    /// Id of the user the query runs as.
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn engine(&self) -> &dyn QueryEngine {
        self.engine.as_ref()
    }

    pub fn meta_engine(&self) -> Option<&dyn MetaQueryEngine> {
        self.meta_engine.as_deref()
    }

    pub fn permission_filters(&self) -> &dyn PermissionFilterFactory {
        self.permission_filters.as_ref()
    }

    pub fn rewriters(&self) -> &[Arc<dyn RewriterFactory>] {
        &self.rewriters
    }

    /// The autofilter clause, parsed once per context.
    pub fn autofilter_clause(&self) -> &Arc<Predicate> {
        self.autofilter.get_or_init(|| {
            parser::parse_predicate(AUTOFILTER_QUERY)
                .unwrap_or_else(|_| Predicate::text("IsSystemContent", "no"))
        })
    }
}

/// Builder for [`QueryContext`].
pub struct QueryContextBuilder {
    user_id: i64,
    engine: Arc<dyn QueryEngine>,
    meta_engine: Option<Arc<dyn MetaQueryEngine>>,
    permission_filters: Arc<dyn PermissionFilterFactory>,
    rewriters: Vec<Arc<dyn RewriterFactory>>,
}

impl QueryContextBuilder {
    pub fn user_id(mut self, user_id: i64) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn meta_engine(mut self, meta_engine: Arc<dyn MetaQueryEngine>) -> Self {
        self.meta_engine = Some(meta_engine);
        self
    }

    /// Append a rewrite pass. Order of registration is order of execution.
    pub fn rewriter(mut self, factory: Arc<dyn RewriterFactory>) -> Self {
        self.rewriters.push(factory);
        self
    }

    pub fn build(self) -> QueryContext {
        QueryContext {
            user_id: self.user_id,
            engine: self.engine,
            meta_engine: self.meta_engine,
            permission_filters: self.permission_filters,
            rewriters: self.rewriters,
            autofilter: OnceLock::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn context() -> QueryContext {
        QueryContext::builder(Arc::new(NullEngine), Arc::new(OpenPermissions)).build()
    }

    #[test]
    fn test_autofilter_clause_is_cached() {
        let context = context();
        let first = Arc::clone(context.autofilter_clause());
        let second = Arc::clone(context.autofilter_clause());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.to_string(), "IsSystemContent:no");
    }

    #[test]
    fn test_open_permission_filter_permits_everything() {
        let filter = OpenPermissionFilter;
        assert!(filter.is_permitted(1, true, false));
        assert!(filter.is_permitted(42, false, true));
    }

    #[test]
    fn test_builder_defaults() {
        let context = context();
        assert_eq!(context.user_id(), 0);
        assert!(context.meta_engine().is_none());
        assert!(context.rewriters().is_empty());
    }
}
