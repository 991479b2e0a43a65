//! Filter key tokenizer and operator-bucketed filter sets.

use indexmap::IndexMap;
use serde::Serialize;

use super::operator::CompareOp;
use crate::{Error, Result};

/// A decomposed filter parameter name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterKey {
    /// `column` or `column_op`: filters the base entity.
    Base { column: String, op: CompareOp },
    /// `relation_column` or `relation_column_op`: filters an eager-loaded relation.
    Relation {
        relation: String,
        column: String,
        op: CompareOp,
    },
}

impl FilterKey {
    /// Decompose a filter key on `_`.
    ///
    /// A two-part key is `column_op` only when its suffix is an operator acronym,
    /// otherwise it is `relation_column` with an implicit `eq`. A three-part key is
    /// always `relation_column_op`.
    pub fn parse(key: &str) -> Result<Self> {
        let parts: Vec<&str> = key.split('_').collect();

        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid_key(key, "empty segment"));
        }

        match parts.as_slice() {
            [column] => Ok(FilterKey::Base {
                column: column.to_string(),
                op: CompareOp::Eq,
            }),
            [first, second] => match CompareOp::from_acronym(second) {
                Some(op) => Ok(FilterKey::Base {
                    column: first.to_string(),
                    op,
                }),
                None => Ok(FilterKey::Relation {
                    relation: first.to_string(),
                    column: second.to_string(),
                    op: CompareOp::Eq,
                }),
            },
            [relation, column, op] => {
                let op = CompareOp::from_acronym(op)
                    .ok_or_else(|| invalid_key(key, "unknown operator suffix"))?;
                Ok(FilterKey::Relation {
                    relation: relation.to_string(),
                    column: column.to_string(),
                    op,
                })
            }
            _ => Err(invalid_key(key, "too many segments")),
        }
    }

    pub fn op(&self) -> CompareOp {
        match self {
            FilterKey::Base { op, .. } | FilterKey::Relation { op, .. } => *op,
        }
    }

    pub fn column(&self) -> &str {
        match self {
            FilterKey::Base { column, .. } | FilterKey::Relation { column, .. } => column,
        }
    }
}

fn invalid_key(key: &str, reason: &str) -> Error {
    Error::InvalidSchema(format!("filter key '{}': {}", key, reason))
}

/// Column → value maps, one per operator. All four buckets always exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterBuckets {
    pub eq: IndexMap<String, String>,
    pub ne: IndexMap<String, String>,
    pub gt: IndexMap<String, String>,
    pub lt: IndexMap<String, String>,
}

impl FilterBuckets {
    pub fn bucket(&self, op: CompareOp) -> &IndexMap<String, String> {
        match op {
            CompareOp::Eq => &self.eq,
            CompareOp::Ne => &self.ne,
            CompareOp::Gt => &self.gt,
            CompareOp::Lt => &self.lt,
        }
    }

    fn bucket_mut(&mut self, op: CompareOp) -> &mut IndexMap<String, String> {
        match op {
            CompareOp::Eq => &mut self.eq,
            CompareOp::Ne => &mut self.ne,
            CompareOp::Gt => &mut self.gt,
            CompareOp::Lt => &mut self.lt,
        }
    }

    pub fn insert(&mut self, op: CompareOp, column: impl Into<String>, value: impl Into<String>) {
        self.bucket_mut(op).insert(column.into(), value.into());
    }

    /// Every `(op, column, value)` condition, bucket by bucket.
    pub fn conditions(&self) -> impl Iterator<Item = (CompareOp, &str, &str)> {
        CompareOp::ALL.into_iter().flat_map(move |op| {
            self.bucket(op)
                .iter()
                .map(move |(column, value)| (op, column.as_str(), value.as_str()))
        })
    }

    pub fn is_empty(&self) -> bool {
        CompareOp::ALL.iter().all(|op| self.bucket(*op).is_empty())
    }
}

/// Filters for the base entity and for each relation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSet {
    pub select: FilterBuckets,
    pub relations: IndexMap<String, FilterBuckets>,
}

impl FilterSet {
    /// Bucket a value under its decomposed key.
    pub fn insert(&mut self, key: &FilterKey, value: impl Into<String>) {
        match key {
            FilterKey::Base { column, op } => self.select.insert(*op, column.as_str(), value),
            FilterKey::Relation {
                relation,
                column,
                op,
            } => self
                .relations
                .entry(relation.clone())
                .or_default()
                .insert(*op, column.as_str(), value),
        }
    }

    /// Filters scoped to a relation, if any were given.
    pub fn relation(&self, name: &str) -> Option<&FilterBuckets> {
        self.relations.get(name)
    }
}
