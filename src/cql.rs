//! Lexical surface of the content query language.
//!
//! Shared between the parser and the writer so the two sides of the
//! round-trip cannot drift apart.

/// Field a bare term (no `field:` prefix) is matched against.
pub const DEFAULT_FIELD: &str = "_Text";

/// Default boost and fuzzy factor. Suffixes (`^n`, `~n`) are omitted from
/// query text at this value.
pub const DEFAULT_SIMILARITY: f64 = 0.5;

/// Characters that terminate a bare term value. A value containing any of
/// these, or whitespace, is quoted on output.
pub const TEXT_TERMINATORS: &str = "\":+-&|!(){}[]^~";

/// Trailing query-level modifier keywords.
pub mod keyword {
    pub const TOP: &str = "TOP";
    pub const SKIP: &str = "SKIP";
    pub const SORT: &str = "SORT";
    pub const REVERSE_SORT: &str = "REVERSESORT";
    pub const AUTOFILTERS: &str = "AUTOFILTERS";
    pub const LIFESPAN: &str = "LIFESPAN";
    pub const COUNT_ONLY: &str = "COUNTONLY";
    pub const ALL_VERSIONS: &str = "ALLVERSIONS";
    pub const QUICK: &str = "QUICK";

    pub const ON: &str = "ON";
    pub const OFF: &str = "OFF";
}

/// True when `value` needs quoting in query text.
pub fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || TEXT_TERMINATORS.contains(c))
}
