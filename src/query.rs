//! The executable content query.
//!
//! [`CqlQuery`] carries the parsed predicate tree plus paging, sorting and
//! filter switches, and orchestrates the execution pipeline:
//!
//! 1. create the permission filter for this run
//! 2. inject the implicit autofilter/lifespan clauses (once per instance)
//! 3. run the registered rewrite passes (copy-on-write: callers get the
//!    same query back when no pass changed the tree)
//! 4. offer the query to the fast-path meta engine, falling back to the
//!    authoritative engine when it declines
//!
//! Instances are single-use with respect to execution: the filter
//! injection flag is set once and never reset.

use crate::ast::{
    BoolClause, ExecutionMode, FilterStatus, IndexValue, Occur, Predicate, SortInfo,
};
use crate::engine::{QueryContext, QueryResult};
use crate::error::QueryError;
use crate::parser;
use crate::writer;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// A parsed, executable content query.
#[derive(Clone, Debug, Serialize)]
pub struct CqlQuery {
    /// Root of the predicate tree. Exclusively owned by this query; rewrite
    /// passes replace it wholesale instead of mutating nodes.
    pub tree: Arc<Predicate>,
    /// Maximum number of hits to return; 0 means unlimited.
    pub top: usize,
    /// Number of leading hits to skip; 0 means none.
    pub skip: usize,
    pub sort: Vec<SortInfo>,
    pub enable_autofilters: FilterStatus,
    pub enable_lifespan_filter: FilterStatus,
    pub execution_mode: ExecutionMode,
    pub count_only: bool,
    pub count_all_pages: bool,
    pub all_versions: bool,
    #[serde(skip)]
    filters_prepared: bool,
}

impl CqlQuery {
    /// Build a query directly from a predicate tree, with default paging
    /// and filter switches.
    pub fn create(tree: Arc<Predicate>) -> Self {
        Self {
            tree,
            top: 0,
            skip: 0,
            sort: Vec::new(),
            enable_autofilters: FilterStatus::Default,
            enable_lifespan_filter: FilterStatus::Default,
            execution_mode: ExecutionMode::Default,
            count_only: false,
            count_all_pages: false,
            all_versions: false,
            filters_prepared: false,
        }
    }

    /// Parse query text, including trailing query-level modifiers.
    pub fn parse(text: &str) -> Result<Self, QueryError> {
        parser::parse_query(text)
    }

    /// True once the implicit filters have been injected.
    pub fn filters_prepared(&self) -> bool {
        self.filters_prepared
    }

    /// AND a predicate onto the whole query.
    ///
    /// The current tree is wrapped in a fresh two-clause boolean group, so
    /// repeated calls nest instead of flattening into one group.
    pub fn add_and_clause(&mut self, predicate: Arc<Predicate>) {
        self.add_clause(predicate, Occur::Must);
    }

    /// OR a predicate onto the whole query. Wraps like
    /// [`add_and_clause`](CqlQuery::add_and_clause).
    pub fn add_or_clause(&mut self, predicate: Arc<Predicate>) {
        self.add_clause(predicate, Occur::Should);
    }

    /// Wrap the current tree and the given predicate into a new top-level
    /// group, both clauses carrying `occur`.
    pub fn add_clause(&mut self, predicate: Arc<Predicate>, occur: Occur) {
        self.tree = Predicate::logic(vec![
            BoolClause::new(Arc::clone(&self.tree), occur),
            BoolClause::new(predicate, occur),
        ]);
    }

    /// Inject the autofilter and lifespan clauses the query has enabled.
    ///
    /// Idempotent: the second and every later call on the same instance is
    /// a no-op. The autofilter defaults to enabled, the lifespan filter to
    /// disabled; when at least one applies, the current tree is wrapped in
    /// a new top-level group with the filter clauses added as Must.
    pub fn prepare_filters(&mut self, context: &QueryContext) {
        if self.filters_prepared {
            return;
        }
        let autofilter = matches!(
            self.enable_autofilters,
            FilterStatus::Default | FilterStatus::Enabled
        );
        let lifespan = self.enable_lifespan_filter == FilterStatus::Enabled;

        if autofilter || lifespan {
            let mut clauses = vec![BoolClause::new(Arc::clone(&self.tree), Occur::Must)];
            if autofilter {
                clauses.push(BoolClause::new(
                    Arc::clone(context.autofilter_clause()),
                    Occur::Must,
                ));
            }
            if lifespan {
                clauses.push(BoolClause::new(lifespan_clause(Utc::now()), Occur::Must));
            }
            self.tree = Predicate::logic(clauses);
        }
        self.filters_prepared = true;
    }

    /// Run every registered rewrite pass over the tree, in order.
    ///
    /// Returns `Cow::Borrowed(self)` when no pass changed anything (checked
    /// by node identity, not structural equality) and an owned copy with
    /// the rewritten tree otherwise, leaving `self` untouched for reuse.
    pub fn apply_visitors(&self, context: &QueryContext) -> Result<Cow<'_, Self>, QueryError> {
        let mut tree = Arc::clone(&self.tree);
        for factory in context.rewriters() {
            let mut visitor = factory.create();
            tree = visitor.visit(&tree)?;
        }
        if Arc::ptr_eq(&tree, &self.tree) {
            Ok(Cow::Borrowed(self))
        } else {
            let mut rewritten = self.clone();
            rewritten.tree = tree;
            Ok(Cow::Owned(rewritten))
        }
    }

    /// Execute the query, returning matching node ids.
    pub fn execute(&mut self, context: &QueryContext) -> Result<QueryResult<i64>, QueryError> {
        let filter = context.permission_filters().create(self, context);
        self.prepare_filters(context);
        let query = self.apply_visitors(context)?;
        if let Some(meta) = context.meta_engine() {
            match meta.try_execute(&query, filter.as_ref(), context) {
                Ok(Some(result)) => return Ok(result),
                // both mean the fast path declined the query
                Ok(None) | Err(_) => {}
            }
        }
        context.engine().execute(&query, filter.as_ref(), context)
    }

    /// Execute the query, returning projected field values.
    pub fn execute_and_project(
        &mut self,
        context: &QueryContext,
    ) -> Result<QueryResult<String>, QueryError> {
        let filter = context.permission_filters().create(self, context);
        self.prepare_filters(context);
        let query = self.apply_visitors(context)?;
        if let Some(meta) = context.meta_engine() {
            match meta.try_execute_and_project(&query, filter.as_ref(), context) {
                Ok(Some(result)) => return Ok(result),
                Ok(None) | Err(_) => {}
            }
        }
        context
            .engine()
            .execute_and_project(&query, filter.as_ref(), context)
    }

    /// Canonical text form, tree plus modifiers.
    pub fn to_text(&self) -> String {
        writer::query_to_text(self)
    }

    /// Stable short id of the canonical text, for logs and cache keys.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_text().as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }
}

impl fmt::Display for CqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// The lifespan window, rebuilt from the wall clock on every injection:
/// content matches when lifespan tracking is off, or when it is already
/// valid and not yet expired (an expiry equal to the epoch sentinel means
/// "never expires").
fn lifespan_clause(now: DateTime<Utc>) -> Arc<Predicate> {
    let not_expired = Predicate::logic(vec![
        BoolClause::new(
            Predicate::range(
                "ValidTill",
                Some(IndexValue::DateTime(now)),
                None,
                true,
                false,
            ),
            Occur::Should,
        ),
        BoolClause::new(
            Predicate::text("ValidTill", IndexValue::DateTime(DateTime::UNIX_EPOCH)),
            Occur::Should,
        ),
    ]);
    let window = Predicate::logic(vec![
        BoolClause::new(
            Predicate::range(
                "ValidFrom",
                None,
                Some(IndexValue::DateTime(now)),
                false,
                true,
            ),
            Occur::Must,
        ),
        BoolClause::new(not_expired, Occur::Must),
    ]);
    Predicate::logic(vec![
        BoolClause::new(
            Predicate::text("EnableLifespan", IndexValue::Bool(false)),
            Occur::Should,
        ),
        BoolClause::new(window, Occur::Should),
    ])
}
