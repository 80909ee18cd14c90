// ABOUTME: Table selection rules for a backup run
// ABOUTME: Allow-list decides which tables appear, ignore-list suppresses their rows

use std::collections::HashSet;

/// Table selection rules
///
/// The two lists are independent. The allow-list controls whether a table
/// appears in the script at all; the ignore-list only suppresses row data for
/// tables that do appear.
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    allow: HashSet<String>,
    ignore: HashSet<String>,
}

/// What to emit for one discovered table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDecision {
    pub include: bool,
    pub suppress_data: bool,
}

impl TableFilter {
    /// Creates a filter from the configured lists. Empty lists mean "no restriction".
    ///
    /// Names are trimmed and blank entries dropped, so `--tables ""` or
    /// `--tables a,,b` never put an empty name in a list.
    pub fn new<A, I>(allow: A, ignore: I) -> Self
    where
        A: IntoIterator<Item = String>,
        I: IntoIterator<Item = String>,
    {
        Self {
            allow: normalize(allow),
            ignore: normalize(ignore),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.ignore.is_empty()
    }

    /// Determines whether a table appears in the script
    pub fn should_include(&self, table_name: &str) -> bool {
        self.allow.is_empty() || self.allow.contains(table_name)
    }

    /// Determines whether a table's rows are left out
    pub fn should_suppress_data(&self, table_name: &str) -> bool {
        self.ignore.contains(table_name)
    }

    pub fn decide(&self, table_name: &str) -> TableDecision {
        TableDecision {
            include: self.should_include(table_name),
            suppress_data: self.should_suppress_data(table_name),
        }
    }

    /// Resolves every discovered table, preserving discovery order
    pub fn resolve<'a>(&self, tables: &'a [String]) -> Vec<(&'a str, TableDecision)> {
        tables
            .iter()
            .map(|name| (name.as_str(), self.decide(name)))
            .collect()
    }
}

fn normalize<L: IntoIterator<Item = String>>(names: L) -> HashSet<String> {
    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}
