//! Table descriptions the translator reads from and writes to.

use crate::query::FieldSelection;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Related rows point at the parent (`orders.user_id = users.id`); loads an array.
    HasMany,
    /// The parent points at one related row (`orders.user_id = users.id`); loads an object.
    BelongsTo,
}

/// An eager-loadable relation between two tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub name: String,
    pub table: String,
    pub kind: RelationKind,
    /// Column on the parent row holding the join key.
    pub parent_column: String,
    /// Column on the related row matched against `parent_column`.
    pub related_column: String,
    /// Ordering of the related rows within each parent.
    pub order_column: String,
}

impl Relation {
    /// `parent.id = related.<foreign_key>`
    pub fn has_many(
        name: impl Into<String>,
        table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            kind: RelationKind::HasMany,
            parent_column: "id".to_string(),
            related_column: foreign_key.into(),
            order_column: "id".to_string(),
        }
    }

    /// `parent.<foreign_key> = related.id`
    pub fn belongs_to(
        name: impl Into<String>,
        table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            kind: RelationKind::BelongsTo,
            parent_column: foreign_key.into(),
            related_column: "id".to_string(),
            order_column: "id".to_string(),
        }
    }

    pub fn with_parent_column(mut self, column: impl Into<String>) -> Self {
        self.parent_column = column.into();
        self
    }

    pub fn with_related_column(mut self, column: impl Into<String>) -> Self {
        self.related_column = column.into();
        self
    }

    pub fn with_order_column(mut self, column: impl Into<String>) -> Self {
        self.order_column = column.into();
        self
    }
}

/// A base table with its primary key, optional search label column and relations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    table: String,
    primary_key: String,
    label_column: Option<String>,
    relations: Vec<Relation>,
}

impl Model {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: "id".to_string(),
            label_column: None,
            relations: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Column matched against the first search field.
    pub fn with_label_column(mut self, column: impl Into<String>) -> Self {
        self.label_column = Some(column.into());
        self
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn label_column(&self) -> Option<&str> {
        self.label_column.as_deref()
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Look up every relation a selection asks for, in selection order.
    pub fn resolve_relations<'m, 's>(
        &'m self,
        selection: &'s FieldSelection,
    ) -> Result<Vec<(&'m Relation, &'s [String])>> {
        selection
            .relations
            .iter()
            .map(|(name, subfields)| {
                self.relation(name)
                    .map(|relation| (relation, subfields.as_slice()))
                    .ok_or_else(|| {
                        Error::InvalidSchema(format!(
                            "relation '{}' is not defined on '{}'",
                            name, self.table
                        ))
                    })
            })
            .collect()
    }
}
