//! Sharing-query rewrite pipeline.
//!
//! Five field names (`Sharing`, `SharedWith`, `SharedBy`, `SharingMode`,
//! `SharingLevel`) are aliases over one underlying multi-valued `Sharing`
//! index field. The index stores each sharing record as one comma-joined
//! token string whose token order is significant, so a query that
//! constrains several sharing aspects at once has to be rewritten into
//! terms matching that exact wire format.
//!
//! The pipeline runs three passes over the tree:
//!
//! 1. [`SharingScanner`] - validates placement (no negated sharing, no
//!    ranges over sharing, no mixing with general clauses inside an inner
//!    group) and splits the top level into general and sharing clauses.
//! 2. [`SharingComposer`] - per boolean level, bottom-up: merges multiple
//!    Must sharing terms and cross-multiplies Must sharing groups into one
//!    Must clause holding every token combination.
//! 3. [`SharingFinalizer`] - normalizes each composed value set into the
//!    canonical comma-joined string and folds the alias field names into
//!    `Sharing`.
//!
//! [`SharingRewriter`] packages the three passes as one registrable
//! rewrite pass.

use crate::ast::{BoolClause, IndexValue, LogicPredicate, Occur, Predicate, TextPredicate};
use crate::engine::RewriterFactory;
use crate::error::QueryError;
use crate::visitor::PredicateVisitor;
use std::collections::HashSet;
use std::sync::Arc;

/// The underlying index field every alias resolves to.
pub const SHARING_FIELD: &str = "Sharing";

/// All field names the rewrite recognizes as sharing-related.
pub const SHARING_FIELD_NAMES: [&str; 5] = [
    SHARING_FIELD,
    "SharedWith",
    "SharedBy",
    "SharingMode",
    "SharingLevel",
];

/// Canonical token order: a token sorts by its first letter's position in
/// this string (Type, Identity, Creator, Mode, Level). Unknown initials
/// sort after known ones; ties break on the token text.
const CANONICAL_TOKEN_ORDER: &str = "TICML";

pub fn is_sharing_field(field_name: &str) -> bool {
    SHARING_FIELD_NAMES.contains(&field_name)
}

fn canonical_key(token: &str) -> (usize, String) {
    let initial = token
        .chars()
        .next()
        .and_then(|c| CANONICAL_TOKEN_ORDER.find(c))
        .unwrap_or(CANONICAL_TOKEN_ORDER.len());
    (initial, token.to_string())
}

/// Sort tokens into canonical order and drop duplicates.
fn canonicalize_tokens(mut tokens: Vec<String>) -> Vec<String> {
    tokens.sort_by_key(|token| canonical_key(token));
    tokens.dedup();
    tokens
}

/// True when any leaf under `node` targets a sharing field.
fn contains_sharing(node: &Predicate) -> bool {
    match node {
        Predicate::Text(text) => is_sharing_field(&text.field_name),
        Predicate::Range(range) => is_sharing_field(&range.field_name),
        Predicate::Logic(logic) => logic
            .clauses
            .iter()
            .any(|clause| contains_sharing(&clause.predicate)),
    }
}

/// Validation walk over the whole tree.
///
/// Rejects structurally invalid sharing queries and, as a side product,
/// exposes the top-level clauses split into general and sharing-related
/// groups for downstream consumers.
#[derive(Default)]
pub struct SharingScanner {
    depth: usize,
    saw_sharing: bool,
    last_was_sharing: bool,
    top_general: Vec<BoolClause>,
    top_sharing: Vec<BoolClause>,
}

impl SharingScanner {
    /// Walk `tree` and validate sharing clause placement.
    pub fn scan(&mut self, tree: &Arc<Predicate>) -> Result<(), QueryError> {
        self.visit(tree)?;
        // a bare sharing leaf at the root is the whole "sharing side"
        if !matches!(tree.as_ref(), Predicate::Logic(_)) && self.last_was_sharing {
            self.top_sharing
                .push(BoolClause::new(Arc::clone(tree), Occur::Default));
        }
        Ok(())
    }

    /// True when the scanned tree referenced any sharing field.
    pub fn saw_sharing(&self) -> bool {
        self.saw_sharing
    }

    /// Top-level clauses with no sharing leaves under them.
    pub fn top_level_general_clauses(&self) -> &[BoolClause] {
        &self.top_general
    }

    /// Top-level clauses containing sharing leaves.
    pub fn top_level_sharing_clauses(&self) -> &[BoolClause] {
        &self.top_sharing
    }
}

impl PredicateVisitor for SharingScanner {
    fn visit_text(&mut self, node: &Arc<Predicate>) -> Result<Arc<Predicate>, QueryError> {
        if let Predicate::Text(text) = node.as_ref() {
            self.last_was_sharing = is_sharing_field(&text.field_name);
            self.saw_sharing |= self.last_was_sharing;
        }
        Ok(Arc::clone(node))
    }

    fn visit_range(&mut self, node: &Arc<Predicate>) -> Result<Arc<Predicate>, QueryError> {
        if let Predicate::Range(range) = node.as_ref() {
            if is_sharing_field(&range.field_name) {
                return Err(QueryError::InvalidSharingQuery {
                    reason: format!(
                        "a range over '{}' is not meaningful; sharing holds membership sets",
                        range.field_name
                    ),
                });
            }
            self.last_was_sharing = false;
        }
        Ok(Arc::clone(node))
    }

    fn visit_logic(
        &mut self,
        node: &Arc<Predicate>,
        logic: &LogicPredicate,
    ) -> Result<Arc<Predicate>, QueryError> {
        let mut sharing = Vec::new();
        let mut general = Vec::new();

        self.depth += 1;
        for clause in &logic.clauses {
            self.visit(&clause.predicate)?;
            if self.last_was_sharing {
                if clause.occur == Occur::MustNot {
                    return Err(QueryError::InvalidSharingQuery {
                        reason: "a sharing clause must not be negated".to_string(),
                    });
                }
                sharing.push(clause.clone());
            } else {
                general.push(clause.clone());
            }
        }
        self.depth -= 1;

        // inner parenthesis groups must be homogeneous; only the top level
        // may combine sharing and general clauses
        if self.depth > 0 && !sharing.is_empty() && !general.is_empty() {
            return Err(QueryError::InvalidSharingQuery {
                reason: "sharing and general clauses cannot be mixed inside a group".to_string(),
            });
        }

        self.last_was_sharing = !sharing.is_empty();
        if self.depth == 0 {
            self.top_general = general;
            self.top_sharing = sharing;
        }
        Ok(Arc::clone(node))
    }
}

/// Combinatorial combination of Must sharing clauses, per boolean level,
/// bottom-up.
///
/// With only simple Must sharing terms at a level, their values merge into
/// one Must term. When Must sharing groups participate, every value set of
/// every group is cross-multiplied against the accumulated combinations -
/// `+a +b +(c d) +(e f)` becomes one Must clause matching the four sets
/// `{a,b,c,e} {a,b,c,f} {a,b,d,e} {a,b,d,f}` - because a comma-joined
/// index term has to carry every simultaneously required token.
#[derive(Default)]
pub struct SharingComposer;

impl PredicateVisitor for SharingComposer {
    fn visit_logic(
        &mut self,
        node: &Arc<Predicate>,
        logic: &LogicPredicate,
    ) -> Result<Arc<Predicate>, QueryError> {
        // children first, so inner levels are already composed
        let visited = self.visit_clauses(&logic.clauses)?;
        let clauses: &[BoolClause] = visited.as_deref().unwrap_or(&logic.clauses);

        let mut general = Vec::new();
        let mut simple_must: Vec<&TextPredicate> = Vec::new();
        let mut group_must: Vec<&Arc<Predicate>> = Vec::new();
        for clause in clauses {
            if !contains_sharing(&clause.predicate) {
                general.push(clause.clone());
                continue;
            }
            match (clause.predicate.as_ref(), clause.occur) {
                (_, Occur::MustNot) => {
                    return Err(QueryError::Unsupported {
                        operation: "composing negated sharing clauses".to_string(),
                    });
                }
                (Predicate::Text(text), Occur::Must) => simple_must.push(text),
                (Predicate::Logic(_), Occur::Must) => group_must.push(&clause.predicate),
                // Should-level sharing clauses are alternatives; they stay
                // where they are and feed the level above
                _ => general.push(clause.clone()),
            }
        }

        if simple_must.len() + group_must.len() < 2 {
            return Ok(match visited {
                Some(clauses) => Predicate::logic(clauses),
                None => Arc::clone(node),
            });
        }

        let base: Vec<String> = simple_must
            .iter()
            .flat_map(|text| text.value.terms())
            .collect();

        let combined = if group_must.is_empty() {
            sharing_term(IndexValue::StringArray(base))
        } else {
            let mut combinations = vec![base];
            for group in &group_must {
                let value_sets = sharing_value_sets(group);
                if value_sets.is_empty() {
                    continue;
                }
                let mut next = Vec::with_capacity(combinations.len() * value_sets.len());
                for combination in &combinations {
                    for set in &value_sets {
                        let mut merged = combination.clone();
                        merged.extend(set.iter().cloned());
                        next.push(merged);
                    }
                }
                combinations = next;
            }

            let mut seen = HashSet::new();
            let mut unique = Vec::new();
            for combination in combinations {
                let canonical = canonicalize_tokens(combination);
                if seen.insert(canonical.join(",")) {
                    unique.push(canonical);
                }
            }

            if unique.len() == 1 {
                sharing_term(IndexValue::StringArray(unique.remove(0)))
            } else {
                Predicate::logic(
                    unique
                        .into_iter()
                        .map(|tokens| {
                            BoolClause::new(
                                sharing_term(IndexValue::StringArray(tokens)),
                                Occur::Should,
                            )
                        })
                        .collect(),
                )
            }
        };

        general.push(BoolClause::new(combined, Occur::Must));
        Ok(Predicate::logic(general))
    }
}

/// Build a plain term over the canonical sharing field.
fn sharing_term(value: IndexValue) -> Arc<Predicate> {
    Arc::new(Predicate::Text(TextPredicate {
        field_name: SHARING_FIELD.to_string(),
        value,
        boost: None,
        fuzzy_value: None,
    }))
}

/// Collect the alternative token sets under a Must sharing group.
/// Clauses at any depth are alternatives (the group's members are Should
/// by validation, and already-composed inner levels contribute their
/// combined sets).
fn sharing_value_sets(node: &Predicate) -> Vec<Vec<String>> {
    match node {
        Predicate::Text(text) if is_sharing_field(&text.field_name) => vec![text.value.terms()],
        Predicate::Text(_) | Predicate::Range(_) => Vec::new(),
        Predicate::Logic(logic) => logic
            .clauses
            .iter()
            .flat_map(|clause| sharing_value_sets(&clause.predicate))
            .collect(),
    }
}

/// Terminal normalization pass.
///
/// Every sharing term leaves this pass with field name `Sharing` and a
/// single comma-joined, canonically ordered, deduplicated string value.
/// Already-normalized terms come back as the identical node, so running
/// the pass twice changes nothing.
#[derive(Default)]
pub struct SharingFinalizer;

impl PredicateVisitor for SharingFinalizer {
    fn visit_text(&mut self, node: &Arc<Predicate>) -> Result<Arc<Predicate>, QueryError> {
        let Predicate::Text(text) = node.as_ref() else {
            return Ok(Arc::clone(node));
        };
        if !is_sharing_field(&text.field_name) {
            return Ok(Arc::clone(node));
        }
        let canonical_value = match &text.value {
            IndexValue::StringArray(tokens) => Some(IndexValue::String(
                canonicalize_tokens(tokens.clone()).join(","),
            )),
            _ => None,
        };
        if canonical_value.is_none() && text.field_name == SHARING_FIELD {
            return Ok(Arc::clone(node));
        }
        Ok(Arc::new(Predicate::Text(TextPredicate {
            field_name: SHARING_FIELD.to_string(),
            value: canonical_value.unwrap_or_else(|| text.value.clone()),
            boost: text.boost,
            fuzzy_value: text.fuzzy_value,
        })))
    }
}

/// The full three-pass pipeline as one rewrite pass: validate, compose,
/// finalize. Trees without sharing clauses come back untouched (and
/// pointer-identical).
#[derive(Default)]
pub struct SharingRewriter;

impl PredicateVisitor for SharingRewriter {
    fn visit(&mut self, node: &Arc<Predicate>) -> Result<Arc<Predicate>, QueryError> {
        let mut scanner = SharingScanner::default();
        scanner.scan(node)?;
        if !scanner.saw_sharing() {
            return Ok(Arc::clone(node));
        }
        let composed = SharingComposer.visit(node)?;
        SharingFinalizer.visit(&composed)
    }
}

/// Registers [`SharingRewriter`] with a [`crate::engine::QueryContext`].
pub struct SharingRewrite;

impl RewriterFactory for SharingRewrite {
    fn create(&self) -> Box<dyn PredicateVisitor> {
        Box::new(SharingRewriter)
    }
}
