//! The structured query intent compiled from request parameters.
//!
//! A [`QueryIntent`] is built once per request by [`IntentBuilder`] and is never
//! mutated afterwards. The translator in [`crate::store`] consumes it by reference.

mod builder;

pub use builder::IntentBuilder;
pub(crate) use builder::default_order;

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::query::{FieldSelection, FilterSet};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(Direction::Asc),
            "desc" => Some(Direction::Desc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }

    /// SQL keyword.
    pub fn sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// `field.direction`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

impl Order {
    /// Parse `field.direction`. Exactly two non-empty parts are required.
    pub fn parse(s: &str) -> Option<Self> {
        let (field, direction) = s.split_once('.')?;
        if field.is_empty() || direction.contains('.') {
            return None;
        }
        Some(Order {
            field: field.to_string(),
            direction: Direction::parse(direction)?,
        })
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.field, self.direction.as_str())
    }
}

/// Free-text search over a list of columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Search {
    pub q: String,
    pub fields: Vec<String>,
}

impl Search {
    /// Search only narrows results when there is text and something to match it on.
    pub fn is_active(&self) -> bool {
        !self.q.is_empty() && !self.fields.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: u64,
    pub offset: u64,
}

/// Everything a request asked for, validated and typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryIntent {
    pub fields: FieldSelection,
    pub filter: FilterSet,
    pub search: Search,
    pub order: Option<Order>,
    pub pagination: Pagination,
    pub body: IndexMap<String, String>,
}
