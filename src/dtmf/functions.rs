//! Function table: longest-prefix lookup over a configured verb table (§4.2
//! "Function lookup"). Pre-parsed into a sorted map so the runtime lookup is
//! a handful of string comparisons rather than a linear scan of config text;
//! a trie was considered and rejected as over-engineering for tables with at
//! most a few dozen entries (see DESIGN.md).

use std::collections::BTreeMap;

/// A configured command verb, e.g. `cop`, `ilink`, `remote`, `status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    pub verb: String,
    pub args: String,
}

/// Outcome of a function-table lookup (§4.2 "Function lookup").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// Exact longest-prefix match.
    Found(&'a FunctionEntry),
    /// Not yet a full match, but a valid prefix of some known key: keep collecting.
    Indeterminate,
    /// Not a prefix of anything, and already as long as the longest known key.
    Error,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    entries: BTreeMap<String, FunctionEntry>,
    longest_key_len: usize,
}

impl FunctionTable {
    pub fn new() -> FunctionTable {
        FunctionTable::default()
    }

    /// Insert a configured `code = verb,args` row.
    pub fn insert(&mut self, code: impl Into<String>, verb: impl Into<String>, args: impl Into<String>) {
        let code = code.into();
        self.longest_key_len = self.longest_key_len.max(code.len());
        self.entries
            .insert(code, FunctionEntry { verb: verb.into(), args: args.into() });
    }

    /// Longest-prefix match of `accum` against the configured keys.
    pub fn lookup(&self, accum: &str) -> Lookup<'_> {
        // Longest match first: BTreeMap is sorted by key, so walk candidates
        // of decreasing length explicitly rather than relying on ordering.
        let mut best: Option<&FunctionEntry> = None;
        let mut best_len = 0usize;
        for (key, entry) in &self.entries {
            if accum == key.as_str() && key.len() >= best_len {
                best = Some(entry);
                best_len = key.len();
            }
        }
        if let Some(entry) = best {
            return Lookup::Found(entry);
        }
        if accum.len() < self.longest_key_len {
            Lookup::Indeterminate
        } else {
            Lookup::Error
        }
    }
}
