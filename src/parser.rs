//! Recursive-descent parser for CQL query text.
//!
//! The grammar is exactly the surface the writer emits: `field:value`
//! terms (bare or quoted values), `+`/`-` occurrence prefixes,
//! parenthesized groups, bracket ranges `[a TO b]`/`{a TO b}`, unary
//! comparisons `<x <=x >x >=x`, `^n`/`~n` suffixes, and the trailing
//! query-level modifiers (`.TOP:n`, `.SORT:field`, ...). A bare term with
//! no `field:` prefix matches the default full-text field.
//!
//! Values always parse as strings; typed values are built
//! programmatically by hosts.

use crate::ast::{
    BoolClause, ExecutionMode, FilterStatus, IndexValue, Occur, Predicate, SortInfo, TextPredicate,
};
use crate::cql::{keyword, DEFAULT_FIELD, DEFAULT_SIMILARITY};
use crate::error::QueryError;
use crate::query::CqlQuery;
use std::sync::Arc;

/// Parse full query text into a [`CqlQuery`].
pub fn parse_query(text: &str) -> Result<CqlQuery, QueryError> {
    if text.trim().is_empty() {
        return Err(QueryError::EmptyQuery);
    }
    let mut parser = Parser::new(text);
    parser.parse()
}

/// Parse query text and return only the predicate tree.
///
/// Used for fixed internal clauses such as the autofilter; trailing
/// modifiers are accepted and dropped.
pub fn parse_predicate(text: &str) -> Result<Arc<Predicate>, QueryError> {
    Ok(parse_query(text)?.tree)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn parse(&mut self) -> Result<CqlQuery, QueryError> {
        let mut query = CqlQuery::create(Predicate::text(DEFAULT_FIELD, ""));
        let mut clauses = Vec::new();

        loop {
            self.skip_ws();
            match self.peek() {
                None => break,
                Some('.') => self.parse_modifier(&mut query)?,
                Some(')') => return Err(self.error("unexpected ')'")),
                Some(_) => clauses.push(self.parse_clause()?),
            }
        }

        query.tree = match clauses.len() {
            0 => return Err(QueryError::EmptyQuery),
            // a single non-negated clause needs no boolean wrapper
            1 if clauses[0].occur != Occur::MustNot => clauses.remove(0).predicate,
            _ => Predicate::logic(clauses),
        };
        Ok(query)
    }

    fn parse_clause(&mut self) -> Result<BoolClause, QueryError> {
        let occur = match self.peek() {
            Some('+') => {
                self.bump();
                Occur::Must
            }
            Some('-') => {
                self.bump();
                Occur::MustNot
            }
            _ => Occur::Default,
        };
        self.skip_ws();
        let predicate = if self.peek() == Some('(') {
            self.parse_group()?
        } else {
            self.parse_term()?
        };
        Ok(BoolClause::new(predicate, occur))
    }

    fn parse_group(&mut self) -> Result<Arc<Predicate>, QueryError> {
        self.bump(); // '('
        let mut clauses = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(self.error("unclosed '('")),
                Some(')') => {
                    self.bump();
                    break;
                }
                Some(_) => clauses.push(self.parse_clause()?),
            }
        }
        if clauses.is_empty() {
            return Err(self.error("empty group"));
        }
        Ok(Predicate::logic(clauses))
    }

    fn parse_term(&mut self) -> Result<Arc<Predicate>, QueryError> {
        let start = self.pos;
        let name = self.read_field_name();
        if !name.is_empty() && self.peek() == Some(':') {
            self.bump(); // ':'
            self.parse_field_term(name)
        } else {
            // bare full-text term
            self.pos = start;
            let value = self.read_value()?;
            let (boost, fuzzy) = self.read_suffixes()?;
            Ok(Arc::new(Predicate::Text(TextPredicate {
                field_name: DEFAULT_FIELD.to_string(),
                value: IndexValue::String(value),
                boost,
                fuzzy_value: fuzzy,
            })))
        }
    }

    fn parse_field_term(&mut self, field_name: String) -> Result<Arc<Predicate>, QueryError> {
        match self.peek() {
            Some('[') | Some('{') => self.parse_bracket_range(field_name),
            Some('<') | Some('>') => self.parse_comparison(field_name),
            _ => {
                let value = self.read_value()?;
                let (boost, fuzzy) = self.read_suffixes()?;
                Ok(Arc::new(Predicate::Text(TextPredicate {
                    field_name,
                    value: IndexValue::String(value),
                    boost,
                    fuzzy_value: fuzzy,
                })))
            }
        }
    }

    fn parse_bracket_range(&mut self, field_name: String) -> Result<Arc<Predicate>, QueryError> {
        let min_exclusive = self.bump() == Some('{');
        self.skip_ws();
        let min = self.read_value()?;
        self.skip_ws();
        if self.read_field_name() != "TO" {
            return Err(self.error("expected 'TO' in range"));
        }
        self.skip_ws();
        let max = self.read_value()?;
        self.skip_ws();
        let max_exclusive = match self.bump() {
            Some(']') => false,
            Some('}') => true,
            _ => return Err(self.error("expected ']' or '}' to close range")),
        };
        let boost = self.read_range_boost()?;
        Ok(Arc::new(Predicate::Range(crate::ast::RangePredicate {
            field_name,
            min: Some(IndexValue::String(min)),
            max: Some(IndexValue::String(max)),
            min_exclusive,
            max_exclusive,
            boost,
        })))
    }

    fn parse_comparison(&mut self, field_name: String) -> Result<Arc<Predicate>, QueryError> {
        let op = self.bump();
        let exclusive = self.peek() != Some('=');
        if !exclusive {
            self.bump(); // '='
        }
        let value = IndexValue::String(self.read_value()?);
        let boost = self.read_range_boost()?;
        let (min, max, min_exclusive, max_exclusive) = match op {
            Some('>') => (Some(value), None, exclusive, false),
            _ => (None, Some(value), false, exclusive),
        };
        Ok(Arc::new(Predicate::Range(crate::ast::RangePredicate {
            field_name,
            min,
            max,
            min_exclusive,
            max_exclusive,
            boost,
        })))
    }

    fn parse_modifier(&mut self, query: &mut CqlQuery) -> Result<(), QueryError> {
        self.bump(); // '.'
        let word = self.read_keyword();
        match word.as_str() {
            keyword::TOP => query.top = self.read_modifier_number()?,
            keyword::SKIP => query.skip = self.read_modifier_number()?,
            keyword::SORT => {
                let field = self.read_modifier_field()?;
                query.sort.push(SortInfo::new(field, false));
            }
            keyword::REVERSE_SORT => {
                let field = self.read_modifier_field()?;
                query.sort.push(SortInfo::new(field, true));
            }
            keyword::AUTOFILTERS => {
                query.enable_autofilters = self.read_modifier_switch()?;
            }
            keyword::LIFESPAN => {
                query.enable_lifespan_filter = self.read_modifier_switch()?;
            }
            keyword::COUNT_ONLY => query.count_only = true,
            keyword::ALL_VERSIONS => query.all_versions = true,
            keyword::QUICK => query.execution_mode = ExecutionMode::Quick,
            other => {
                return Err(self.error(&format!("unknown modifier '.{}'", other)));
            }
        }
        Ok(())
    }

    fn read_modifier_number(&mut self) -> Result<usize, QueryError> {
        self.expect(':')?;
        let digits = self.read_while(|c| c.is_ascii_digit());
        digits
            .parse()
            .map_err(|_| self.error("expected a number"))
    }

    fn read_modifier_field(&mut self) -> Result<String, QueryError> {
        self.expect(':')?;
        let field = self.read_field_name();
        if field.is_empty() {
            return Err(self.error("expected a field name"));
        }
        Ok(field)
    }

    fn read_modifier_switch(&mut self) -> Result<FilterStatus, QueryError> {
        self.expect(':')?;
        match self.read_keyword().as_str() {
            keyword::ON => Ok(FilterStatus::Enabled),
            keyword::OFF => Ok(FilterStatus::Disabled),
            _ => Err(self.error("expected ON or OFF")),
        }
    }

    /// Quoted or bare term value. Quoted values may be empty; bare values
    /// may not.
    fn read_value(&mut self) -> Result<String, QueryError> {
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.bump();
                let value = self.read_while(|c| c != quote);
                if self.bump() != Some(quote) {
                    return Err(self.error("unterminated quoted value"));
                }
                Ok(value)
            }
            _ => {
                let value = self.read_while(is_bare_value_char);
                if value.is_empty() {
                    return Err(self.error("expected a value"));
                }
                Ok(value)
            }
        }
    }

    fn read_suffixes(&mut self) -> Result<(Option<f64>, Option<f64>), QueryError> {
        let mut boost = None;
        let mut fuzzy = None;
        if self.peek() == Some('^') {
            self.bump();
            boost = Some(self.read_number()?);
        }
        if self.peek() == Some('~') {
            self.bump();
            fuzzy = Some(match self.peek() {
                Some(c) if c.is_ascii_digit() || c == '.' => self.read_number()?,
                _ => DEFAULT_SIMILARITY,
            });
        }
        Ok((boost, fuzzy))
    }

    /// Ranges take a boost but a fuzzy factor has no meaning on them.
    fn read_range_boost(&mut self) -> Result<Option<f64>, QueryError> {
        let (boost, fuzzy) = self.read_suffixes()?;
        if fuzzy.is_some() {
            return Err(self.error("a fuzzy factor is not valid on a range"));
        }
        Ok(boost)
    }

    fn read_number(&mut self) -> Result<f64, QueryError> {
        let digits = self.read_while(|c| c.is_ascii_digit() || c == '.');
        digits
            .parse()
            .map_err(|_| self.error("expected a number"))
    }

    fn read_field_name(&mut self) -> String {
        self.read_while(|c| c.is_alphanumeric() || c == '_' || c == '#')
    }

    fn read_keyword(&mut self) -> String {
        self.read_while(|c| c.is_ascii_uppercase())
    }

    fn read_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !keep(c) {
                break;
            }
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn expect(&mut self, expected: char) -> Result<(), QueryError> {
        if self.bump() == Some(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn error(&self, message: &str) -> QueryError {
        QueryError::ParseFailed {
            message: message.to_string(),
            position: self.pos,
        }
    }
}

/// Bare values run until whitespace, grouping, quoting, or a terminator
/// character. Wildcards (`*`, `?`) and commas pass through.
fn is_bare_value_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '\'' | '"') && !crate::cql::TEXT_TERMINATORS.contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::RangePredicate;

    fn text_parts(node: &Arc<Predicate>) -> (&str, &IndexValue) {
        let Predicate::Text(text) = node.as_ref() else {
            panic!("expected a text predicate, got {:?}", node);
        };
        (&text.field_name, &text.value)
    }

    #[test]
    fn test_simple_term() {
        let tree = parse_predicate("Name:admin").unwrap();
        let (field, value) = text_parts(&tree);
        assert_eq!(field, "Name");
        assert_eq!(value, &IndexValue::String("admin".to_string()));
    }

    #[test]
    fn test_bare_term_uses_default_field() {
        let tree = parse_predicate("admin").unwrap();
        let (field, value) = text_parts(&tree);
        assert_eq!(field, DEFAULT_FIELD);
        assert_eq!(value, &IndexValue::String("admin".to_string()));
    }

    #[test]
    fn test_quoted_value_keeps_spaces() {
        let tree = parse_predicate("Name:'a b'").unwrap();
        let (_, value) = text_parts(&tree);
        assert_eq!(value, &IndexValue::String("a b".to_string()));
    }

    #[test]
    fn test_boolean_clauses() {
        let tree = parse_predicate("+TypeIs:User -Hidden:yes Name:a*").unwrap();
        let Predicate::Logic(logic) = tree.as_ref() else {
            panic!("expected a boolean group");
        };
        assert_eq!(logic.clauses.len(), 3);
        assert_eq!(logic.clauses[0].occur, Occur::Must);
        assert_eq!(logic.clauses[1].occur, Occur::MustNot);
        assert_eq!(logic.clauses[2].occur, Occur::Default);
    }

    #[test]
    fn test_single_clause_is_unwrapped() {
        let tree = parse_predicate("+Name:admin").unwrap();
        assert!(matches!(tree.as_ref(), Predicate::Text(_)));
    }

    #[test]
    fn test_single_must_not_keeps_group() {
        let tree = parse_predicate("-Name:admin").unwrap();
        let Predicate::Logic(logic) = tree.as_ref() else {
            panic!("negation needs its boolean group");
        };
        assert_eq!(logic.clauses[0].occur, Occur::MustNot);
    }

    #[test]
    fn test_nested_groups() {
        let tree = parse_predicate("+TypeIs:User +(Name:a Name:b)").unwrap();
        let Predicate::Logic(logic) = tree.as_ref() else {
            panic!("expected a boolean group");
        };
        assert!(matches!(
            logic.clauses[1].predicate.as_ref(),
            Predicate::Logic(_)
        ));
    }

    #[test]
    fn test_bracket_range() {
        let tree = parse_predicate("Index:[1 TO 10]").unwrap();
        let Predicate::Range(range) = tree.as_ref() else {
            panic!("expected a range");
        };
        assert_eq!(range.min, Some(IndexValue::String("1".to_string())));
        assert_eq!(range.max, Some(IndexValue::String("10".to_string())));
        assert!(!range.min_exclusive);
        assert!(!range.max_exclusive);
    }

    #[test]
    fn test_mixed_bracket_range() {
        let tree = parse_predicate("Index:{1 TO 10]").unwrap();
        let Predicate::Range(range) = tree.as_ref() else {
            panic!("expected a range");
        };
        assert!(range.min_exclusive);
        assert!(!range.max_exclusive);
    }

    #[test]
    fn test_comparison_forms() {
        let check = |text: &str, has_min: bool, exclusive: bool| {
            let tree = parse_predicate(text).unwrap();
            let Predicate::Range(range) = tree.as_ref() else {
                panic!("expected a range for {}", text);
            };
            assert_eq!(range.min.is_some(), has_min, "{}", text);
            assert_eq!(
                if has_min {
                    range.min_exclusive
                } else {
                    range.max_exclusive
                },
                exclusive,
                "{}",
                text
            );
        };
        check("Index:>5", true, true);
        check("Index:>=5", true, false);
        check("Index:<5", false, true);
        check("Index:<=5", false, false);
    }

    #[test]
    fn test_boost_and_fuzzy_suffixes() {
        let tree = parse_predicate("Name:admin^2~0.8").unwrap();
        let Predicate::Text(text) = tree.as_ref() else {
            panic!("expected a text predicate");
        };
        assert_eq!(text.boost, Some(2.0));
        assert_eq!(text.fuzzy_value, Some(0.8));
    }

    #[test]
    fn test_bare_fuzzy_uses_default() {
        let tree = parse_predicate("Name:admin~").unwrap();
        let Predicate::Text(text) = tree.as_ref() else {
            panic!("expected a text predicate");
        };
        assert_eq!(text.fuzzy_value, Some(DEFAULT_SIMILARITY));
    }

    #[test]
    fn test_fuzzy_on_range_is_rejected() {
        let err = parse_predicate("Index:[1 TO 2]~0.7").unwrap_err();
        assert!(matches!(err, QueryError::ParseFailed { .. }));
    }

    #[test]
    fn test_modifiers() {
        let query =
            parse_query("Name:a .TOP:10 .SKIP:20 .SORT:Name .REVERSESORT:Index .AUTOFILTERS:OFF .LIFESPAN:ON .COUNTONLY .ALLVERSIONS .QUICK")
                .unwrap();
        assert_eq!(query.top, 10);
        assert_eq!(query.skip, 20);
        assert_eq!(query.sort.len(), 2);
        assert_eq!(query.sort[0], SortInfo::new("Name", false));
        assert_eq!(query.sort[1], SortInfo::new("Index", true));
        assert_eq!(query.enable_autofilters, FilterStatus::Disabled);
        assert_eq!(query.enable_lifespan_filter, FilterStatus::Enabled);
        assert!(query.count_only);
        assert!(query.all_versions);
        assert_eq!(query.execution_mode, ExecutionMode::Quick);
    }

    #[test]
    fn test_unknown_modifier_is_rejected() {
        let err = parse_query("Name:a .NOSUCH").unwrap_err();
        assert!(matches!(err, QueryError::ParseFailed { .. }));
    }

    #[test]
    fn test_empty_query_is_rejected() {
        assert!(matches!(parse_query("   "), Err(QueryError::EmptyQuery)));
        assert!(matches!(
            parse_query(".TOP:5"),
            Err(QueryError::EmptyQuery)
        ));
    }

    #[test]
    fn test_unclosed_group_is_rejected() {
        let err = parse_predicate("+(Name:a Name:b").unwrap_err();
        let QueryError::ParseFailed { message, .. } = err else {
            panic!("expected a parse error");
        };
        assert!(message.contains("unclosed"));
    }

    #[test]
    fn test_unterminated_quote_reports_position() {
        let err = parse_predicate("Name:'abc").unwrap_err();
        assert!(matches!(
            err,
            QueryError::ParseFailed { position: 9, .. }
        ));
    }

    #[test]
    fn test_range_predicate_shape() {
        let tree = parse_predicate("Index:[1 TO 10]^2").unwrap();
        assert_eq!(
            tree.as_ref(),
            &Predicate::Range(RangePredicate {
                field_name: "Index".to_string(),
                min: Some(IndexValue::String("1".to_string())),
                max: Some(IndexValue::String("10".to_string())),
                min_exclusive: false,
                max_exclusive: false,
                boost: Some(2.0),
            })
        );
    }
}
