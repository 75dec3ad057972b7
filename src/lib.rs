//! cqlkit - content query compilation and rewriting.
//!
//! This library turns content query text (CQL) into an immutable predicate
//! tree, rewrites the tree through pluggable visitor passes, renders it
//! back to canonical text, and hands it to an injected search engine for
//! execution.
//!
//! # Features
//!
//! - **Predicate model**: term, range and boolean-group nodes shared via
//!   `Arc`, so no-op rewrites are detectable by pointer identity
//! - **Parser/Writer**: round-trippable CQL text surface, including
//!   query-level modifiers (`.TOP`, `.SORT`, `.AUTOFILTERS`, ...)
//! - **Rewrite passes**: a copy-on-write visitor base plus the sharing
//!   rewrite pipeline (scanner, composer, finalizer)
//! - **Implicit filters**: idempotent autofilter and lifespan-window
//!   injection
//! - **Diagnostics**: query shape classification for tuning
//! - **Execution boundary**: engine, fast-path engine and permission
//!   filter traits, wired together by a startup-built `QueryContext`
//!
//! # Quick Start
//!
//! ```no_run
//! use cqlkit::{CqlQuery, QueryContext};
//! # use cqlkit::engine::OpenPermissions;
//! # use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let my_engine: Arc<dyn cqlkit::engine::QueryEngine> = unimplemented!();
//! let context = QueryContext::builder(my_engine, Arc::new(OpenPermissions))
//!     .user_id(1)
//!     .build();
//!
//! let mut query = CqlQuery::parse("+TypeIs:Document +Name:plan* .TOP:20")?;
//! let result = query.execute(&context)?;
//! println!("{} hits", result.total_count);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`ast`] - predicate tree node types
//! - [`classifier`] - query shape statistics
//! - [`cql`] - lexical constants of the query text surface
//! - [`engine`] - execution boundary traits and `QueryContext`
//! - [`error`] - error types
//! - [`output`] - response types and formatting
//! - [`parser`] - query text to predicate tree
//! - [`query`] - the executable query object
//! - [`sharing`] - the sharing rewrite pipeline
//! - [`visitor`] - the rewrite traversal base
//! - [`writer`] - predicate tree to query text

pub mod ast;
pub mod classifier;
pub mod cql;
pub mod engine;
pub mod error;
pub mod output;
pub mod parser;
pub mod query;
pub mod sharing;
pub mod visitor;
pub mod writer;

// Re-export the predicate model for external use
pub use ast::{
    BoolClause, ExecutionMode, FilterStatus, IndexValue, IndexValueType, LogicPredicate, Occur,
    Predicate, RangePredicate, SortInfo, TextPredicate,
};

// Re-export the query surface for external use
pub use classifier::{classify, classify_predicate, QueryInfo};
pub use engine::{
    MetaQueryEngine, PermissionFilter, PermissionFilterFactory, QueryContext, QueryEngine,
    QueryResult, RewriterFactory,
};
pub use error::QueryError;
pub use parser::{parse_predicate, parse_query};
pub use query::CqlQuery;
pub use sharing::{SharingComposer, SharingFinalizer, SharingRewrite, SharingRewriter, SharingScanner};
pub use visitor::PredicateVisitor;
pub use writer::query_to_text;
