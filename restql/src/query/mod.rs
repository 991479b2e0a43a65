//! Parameter micro-grammar: operator acronyms, field paths and filter keys.
//!
//! # Syntax Overview
//!
//! - **Fields**: `id,name,orders.total` (comma-separated, `relation.field` for relations)
//! - **Filter keys**: `column`, `column_op`, `relation_column`, `relation_column_op`
//! - **Operators**: `eq`, `ne`, `gt`, `lt`
//! - **Order**: `field.direction` with direction `asc` or `desc`

mod case;
mod fields;
mod filter;
mod operator;

pub use case::to_snake_case;
pub use fields::{parse_fields, FieldSelection};
pub use filter::{FilterBuckets, FilterKey, FilterSet};
pub use operator::CompareOp;

#[cfg(test)]
mod tests;
