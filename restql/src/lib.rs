//! RESTQL: declarative REST query engine
//!
//! Compiles flat request parameters into a validated [`QueryIntent`] and runs it
//! against DuckDB tables, returning `{total, collection, limit, offset}`.
//!
//! ```text
//! RequestParams -> Validator -> ValidatedParams -> IntentBuilder -> QueryIntent -> Store
//! ```

pub mod config;
pub mod endpoint;
pub mod error;
pub mod intent;
pub mod method;
pub mod params;
pub mod query;
pub mod schema;
pub mod store;
pub mod validate;

pub use config::Config;
pub use endpoint::Endpoint;
pub use error::{Error, Failure, Result};
pub use intent::{Direction, Order, Pagination, QueryIntent, Search};
pub use method::Method;
pub use params::{ParamValue, RequestParams, SUPPRESS_STATUS_PARAM};
pub use query::{parse_fields, CompareOp, FieldSelection, FilterBuckets, FilterKey, FilterSet};
pub use schema::{Capabilities, Capability, EndpointSchema, FieldAllowList, ValueKind, ValueRule};
pub use store::{Entity, Model, Relation, RelationKind, ResultEnvelope, Store};
pub use validate::{ValidatedParams, Validator};
