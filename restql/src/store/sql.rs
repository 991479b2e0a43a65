//! SQL fragment builders shared by reads and writes.
//!
//! Identifiers are always quoted and values are always bound as parameters.

use crate::intent::Search;
use crate::query::FilterBuckets;

/// Quote an identifier for DuckDB.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escape LIKE wildcards so user text matches literally (with `ESCAPE '\'`).
pub fn escape_like(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + 4);
    for c in text.chars() {
        match c {
            '%' => result.push_str("\\%"),
            '_' => result.push_str("\\_"),
            '\\' => result.push_str("\\\\"),
            _ => result.push(c),
        }
    }
    result
}

/// `"a", "b"` or `*` for an empty list.
pub fn projection(columns: &[String]) -> String {
    if columns.is_empty() {
        "*".to_string()
    } else {
        columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// `?, ?, ?`
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// ANDed conditions plus their bind values, in order.
#[derive(Debug, Default)]
pub struct WhereClause {
    conditions: Vec<String>,
    binds: Vec<String>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(label ILIKE %q% OR f2 ILIKE %q% ...)`, case-insensitive.
    ///
    /// The first search field is matched on the label column when one is given.
    pub fn search(&mut self, search: &Search, label_column: Option<&str>) {
        if !search.is_active() {
            return;
        }

        let pattern = format!("%{}%", escape_like(&search.q));
        let mut alternatives = Vec::with_capacity(search.fields.len());
        for (i, field) in search.fields.iter().enumerate() {
            let column = match (i, label_column) {
                (0, Some(label)) => label,
                _ => field.as_str(),
            };
            alternatives.push(format!(
                "CAST({} AS VARCHAR) ILIKE ? ESCAPE '\\'",
                quote_ident(column)
            ));
            self.binds.push(pattern.clone());
        }
        self.conditions
            .push(format!("({})", alternatives.join(" OR ")));
    }

    /// One `"column" op ?` condition per bucket entry.
    pub fn filter(&mut self, buckets: &FilterBuckets) {
        for (op, column, value) in buckets.conditions() {
            self.conditions
                .push(format!("{} {} ?", quote_ident(column), op));
            self.binds.push(value.to_string());
        }
    }

    /// `"column" IN (?, ...)`
    pub fn any_of(&mut self, column: &str, values: Vec<String>) {
        self.conditions.push(format!(
            "{} IN ({})",
            quote_ident(column),
            placeholders(values.len())
        ));
        self.binds.extend(values);
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// ` WHERE ...`, or an empty string when there are no conditions.
    pub fn sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn binds(&self) -> &[String] {
        &self.binds
    }
}
