//! Dictionary collaborator.
//!
//! Word data lives outside the engine. Anything that can resolve a query
//! descriptor to a string implements [`Dictionary`]; the engine hands it
//! the RNG (and a synchronizer when the query names a carrier) so the
//! collaborator's draws stay inside the run's deterministic sequence.

use weft_foundation::PatternRng;
use weft_pattern::QueryDescriptor;

use crate::sync::Synchronizer;

/// Placeholder emitted when a query cannot be satisfied. Generation
/// continues; missing data is visible in the output, not fatal.
pub fn missing_sentinel(table: &str) -> String {
    format!("[missing:{table}]")
}

/// Resolves dictionary queries.
pub trait Dictionary {
    /// Resolve `query` to a string, or None when the table has no matching
    /// entry. `filter` is the host's content-filter flag. When `sync` is
    /// present the query names a carrier and selection must go through it.
    fn query(
        &self,
        rng: &mut PatternRng,
        sync: Option<&mut Synchronizer>,
        query: &QueryDescriptor,
        filter: bool,
    ) -> Option<String>;
}

/// One dictionary entry: its text and classification labels.
#[derive(Debug, Clone)]
pub struct TableEntry {
    pub text: String,
    pub classes: Vec<String>,
}

impl TableEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            classes: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }
}

/// In-memory dictionary over named tables. Tables are keyed by
/// `name` or `name.subtype`; a query with a subtype looks up the combined
/// key.
#[derive(Debug, Default)]
pub struct TableDictionary {
    tables: indexmap::IndexMap<String, Vec<TableEntry>>,
}

impl TableDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(
        mut self,
        name: impl Into<String>,
        entries: impl IntoIterator<Item = TableEntry>,
    ) -> Self {
        self.tables
            .insert(name.into(), entries.into_iter().collect());
        self
    }

    /// Convenience for class-less word lists.
    pub fn with_words<S: Into<String>>(
        self,
        name: impl Into<String>,
        words: impl IntoIterator<Item = S>,
    ) -> Self {
        self.with_table(name, words.into_iter().map(|w| TableEntry::new(w)))
    }

    fn matches(entry: &TableEntry, query: &QueryDescriptor) -> bool {
        for filter in &query.class_filters {
            let has = entry.classes.iter().any(|c| c == &filter.class);
            if has == filter.exclude {
                return false;
            }
        }
        for filter in &query.regex_filters {
            if filter.pattern.is_match(&entry.text) == filter.negate {
                return false;
            }
        }
        true
    }
}

impl Dictionary for TableDictionary {
    fn query(
        &self,
        rng: &mut PatternRng,
        sync: Option<&mut Synchronizer>,
        query: &QueryDescriptor,
        _filter: bool,
    ) -> Option<String> {
        let key = match &query.subtype {
            Some(subtype) => format!("{}.{subtype}", query.table),
            None => query.table.clone(),
        };
        let entries = self.tables.get(&key)?;
        let candidates: Vec<&TableEntry> = entries
            .iter()
            .filter(|e| Self::matches(e, query))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let idx = match sync {
            Some(sync) => sync.next_item(candidates.len()).min(candidates.len() - 1),
            None => rng.next_max(candidates.len() as u32) as usize,
        };
        Some(candidates[idx].text.clone())
    }
}
