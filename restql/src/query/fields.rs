//! Field selection parser.

use indexmap::IndexMap;
use serde::Serialize;

/// Columns to project from the base entity plus relations to eager-load.
///
/// An empty subfield list for a relation means all of its fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldSelection {
    pub select: Vec<String>,
    pub relations: IndexMap<String, Vec<String>>,
}

/// Parse a field string like `id,name,orders.total` into a selection.
///
/// Tokens are trimmed and empty tokens are skipped. A token is split at its first
/// `.` into relation and subfield; repeated tokens are kept once.
pub fn parse_fields(input: &str) -> FieldSelection {
    let mut selection = FieldSelection::default();

    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.split_once('.') {
            Some((relation, field)) => selection.add_relation_field(relation, field),
            None => selection.add_select(token),
        }
    }

    selection
}

impl FieldSelection {
    /// Add a base-entity column.
    pub fn add_select(&mut self, column: &str) {
        if !self.select.iter().any(|c| c == column) {
            self.select.push(column.to_string());
        }
    }

    /// Add a relation with no subfield restriction (all fields).
    pub fn add_relation(&mut self, relation: &str) {
        self.relations.entry(relation.to_string()).or_default();
    }

    /// Add a subfield to a relation.
    pub fn add_relation_field(&mut self, relation: &str, field: &str) {
        let fields = self.relations.entry(relation.to_string()).or_default();
        if !field.is_empty() && !fields.iter().any(|f| f == field) {
            fields.push(field.to_string());
        }
    }

    /// Check if nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.select.is_empty() && self.relations.is_empty()
    }

    /// Keys visible on a written entity: selected columns plus relation names.
    pub fn visible_keys(&self) -> Vec<&str> {
        self.select
            .iter()
            .map(String::as_str)
            .chain(self.relations.keys().map(String::as_str))
            .collect()
    }
}
