//! Predicate tree back to CQL text.
//!
//! The writer is a small stateful visitor: one output buffer plus a
//! boolean-nesting depth counter. Groups below the root are parenthesized;
//! the root group is not. Values are quoted only when they have to be, and
//! boost/fuzzy suffixes are emitted only when they differ from
//! [`crate::cql::DEFAULT_SIMILARITY`].
//!
//! `Predicate` implements `Display` through this module, so any
//! sub-predicate can be rendered in isolation for logs and error messages.

use crate::ast::{
    ExecutionMode, FilterStatus, IndexValue, LogicPredicate, Occur, Predicate, RangePredicate,
    TextPredicate,
};
use crate::cql::{self, keyword, DEFAULT_SIMILARITY};
use crate::query::CqlQuery;
use std::fmt;
use std::fmt::Write as _;

/// Render a full query: predicate tree plus trailing query-level modifiers.
pub fn query_to_text(query: &CqlQuery) -> String {
    let mut writer = CqlWriter::default();
    writer.write_predicate(&query.tree);
    let mut out = writer.out;

    if query.top != 0 {
        let _ = write!(out, " .{}:{}", keyword::TOP, query.top);
    }
    if query.skip != 0 {
        let _ = write!(out, " .{}:{}", keyword::SKIP, query.skip);
    }
    for sort in &query.sort {
        let key = if sort.reverse {
            keyword::REVERSE_SORT
        } else {
            keyword::SORT
        };
        let _ = write!(out, " .{}:{}", key, sort.field_name);
    }
    match query.enable_autofilters {
        FilterStatus::Default => {}
        FilterStatus::Enabled => {
            let _ = write!(out, " .{}:{}", keyword::AUTOFILTERS, keyword::ON);
        }
        FilterStatus::Disabled => {
            let _ = write!(out, " .{}:{}", keyword::AUTOFILTERS, keyword::OFF);
        }
    }
    match query.enable_lifespan_filter {
        FilterStatus::Default => {}
        FilterStatus::Enabled => {
            let _ = write!(out, " .{}:{}", keyword::LIFESPAN, keyword::ON);
        }
        FilterStatus::Disabled => {
            let _ = write!(out, " .{}:{}", keyword::LIFESPAN, keyword::OFF);
        }
    }
    if query.count_only {
        let _ = write!(out, " .{}", keyword::COUNT_ONLY);
    }
    if query.all_versions {
        let _ = write!(out, " .{}", keyword::ALL_VERSIONS);
    }
    if query.execution_mode == ExecutionMode::Quick {
        let _ = write!(out, " .{}", keyword::QUICK);
    }
    out
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut writer = CqlWriter::default();
        writer.write_predicate(self);
        f.write_str(&writer.out)
    }
}

#[derive(Default)]
struct CqlWriter {
    out: String,
    depth: usize,
}

impl CqlWriter {
    fn write_predicate(&mut self, node: &Predicate) {
        match node {
            Predicate::Text(text) => self.write_text(text),
            Predicate::Range(range) => self.write_range(range),
            Predicate::Logic(logic) => self.write_logic(logic),
        }
    }

    fn write_text(&mut self, text: &TextPredicate) {
        let value = escape_value(&text.value.to_string());
        let _ = write!(self.out, "{}:{}", text.field_name, value);
        self.write_suffixes(text.boost, text.fuzzy_value);
    }

    fn write_range(&mut self, range: &RangePredicate) {
        let min = range.min.as_ref().map(value_text);
        let max = range.max.as_ref().map(value_text);
        match (min, max) {
            (Some(min), Some(max)) => {
                let open = if range.min_exclusive { '{' } else { '[' };
                let close = if range.max_exclusive { '}' } else { ']' };
                let _ = write!(
                    self.out,
                    "{}:{}{} TO {}{}",
                    range.field_name, open, min, max, close
                );
            }
            (Some(min), None) => {
                let op = if range.min_exclusive { ">" } else { ">=" };
                let _ = write!(self.out, "{}:{}{}", range.field_name, op, min);
            }
            (None, Some(max)) => {
                let op = if range.max_exclusive { "<" } else { "<=" };
                let _ = write!(self.out, "{}:{}{}", range.field_name, op, max);
            }
            // a parsed range always has at least one bound
            (None, None) => {
                let _ = write!(self.out, "{}:[]", range.field_name);
            }
        }
        self.write_suffixes(range.boost, None);
    }

    fn write_logic(&mut self, logic: &LogicPredicate) {
        if self.depth > 0 {
            self.out.push('(');
        }
        self.depth += 1;
        for (index, clause) in logic.clauses.iter().enumerate() {
            if index > 0 {
                self.out.push(' ');
            }
            match clause.occur {
                Occur::Must => self.out.push('+'),
                Occur::MustNot => self.out.push('-'),
                Occur::Should | Occur::Default => {}
            }
            self.write_predicate(&clause.predicate);
        }
        self.depth -= 1;
        if self.depth > 0 {
            self.out.push(')');
        }
    }

    fn write_suffixes(&mut self, boost: Option<f64>, fuzzy: Option<f64>) {
        if let Some(boost) = boost {
            if boost != DEFAULT_SIMILARITY {
                let _ = write!(self.out, "^{}", boost);
            }
        }
        if let Some(fuzzy) = fuzzy {
            if fuzzy != DEFAULT_SIMILARITY {
                let _ = write!(self.out, "~{}", fuzzy);
            }
        }
    }
}

fn value_text(value: &IndexValue) -> String {
    escape_value(&value.to_string())
}

fn escape_value(raw: &str) -> String {
    if !cql::needs_quoting(raw) {
        return raw.to_string();
    }
    if raw.contains('\'') {
        format!("\"{}\"", raw)
    } else {
        format!("'{}'", raw)
    }
}
