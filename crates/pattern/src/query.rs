//! Dictionary query descriptors.
//!
//! Queries are resolved by the dictionary collaborator; the engine only
//! carries the compiled descriptor through and hands it over together with
//! its RNG (and, for carrier queries, a synchronizer).

use regex::Regex;

/// Include/exclude filter on a dictionary entry class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFilter {
    pub class: String,
    /// When set, entries carrying the class are rejected instead of required.
    pub exclude: bool,
}

/// Regex filter on the entry text.
#[derive(Debug, Clone)]
pub struct RegexFilter {
    pub pattern: Regex,
    /// When set, entries matching the pattern are rejected.
    pub negate: bool,
}

/// A compiled dictionary query.
#[derive(Debug, Clone)]
pub struct QueryDescriptor {
    /// Table to draw from.
    pub table: String,
    /// Optional subtype (e.g. a plural form) within the table.
    pub subtype: Option<String>,
    /// Class include/exclude filters, applied conjunctively.
    pub class_filters: Vec<ClassFilter>,
    /// Regex filters on entry text, applied conjunctively.
    pub regex_filters: Vec<RegexFilter>,
    /// Carrier id requesting cross-call synchronized selection.
    pub carrier: Option<String>,
}

impl QueryDescriptor {
    /// A bare query against a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            subtype: None,
            class_filters: Vec::new(),
            regex_filters: Vec::new(),
            carrier: None,
        }
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    /// Require entries to carry `class`.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class_filters.push(ClassFilter {
            class: class.into(),
            exclude: false,
        });
        self
    }

    /// Reject entries carrying `class`.
    pub fn without_class(mut self, class: impl Into<String>) -> Self {
        self.class_filters.push(ClassFilter {
            class: class.into(),
            exclude: true,
        });
        self
    }

    pub fn with_regex(mut self, pattern: Regex, negate: bool) -> Self {
        self.regex_filters.push(RegexFilter { pattern, negate });
        self
    }

    /// Bind this query to a carrier id for synchronized selection.
    pub fn with_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = Some(carrier.into());
        self
    }
}
