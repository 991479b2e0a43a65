//! Store - executes query intents against DuckDB tables.
//!
//! Reads and writes share one connection behind a mutex; each operation works
//! on a cloned handle so it sees the same database.

mod model;
mod read;
mod sql;
mod write;

use std::path::Path;
use std::sync::Mutex;

use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use duckdb::{
    params_from_iter,
    types::{TimeUnit, Value as DuckValue, ValueRef},
    Connection,
};
use serde_json::{Number, Value};

use crate::{Error, Result};

pub use model::{Model, Relation, RelationKind};
pub use read::ResultEnvelope;

/// A store row as a JSON object, with eager-loaded relations nested under their names.
pub type Entity = serde_json::Map<String, Value>;

/// A DuckDB database the translator runs against.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get a DuckDB connection to the store.
    pub fn connection(&self) -> Result<Connection> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::Storage("connection lock poisoned".to_string()))?;
        Ok(conn.try_clone()?)
    }

    /// Run one or more statements that return nothing (schema setup, seeding).
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.connection()?.execute_batch(sql)?;
        Ok(())
    }

    /// Query the store using SQL, returning each row as an entity.
    pub fn query(&self, sql: &str) -> Result<Vec<Entity>> {
        let conn = self.connection()?;
        fetch_entities(&conn, sql, &[])
    }
}

/// Run `f` between BEGIN and COMMIT, rolling back if it fails.
fn in_transaction<T>(conn: &Connection, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
    conn.execute("BEGIN TRANSACTION", [])?;

    match f(conn) {
        Ok(value) => {
            conn.execute("COMMIT", [])?;
            Ok(value)
        }
        Err(e) => {
            let _ = conn.execute("ROLLBACK", []);
            Err(e)
        }
    }
}

/// Execute a statement with bound parameters and collect the rows as entities.
fn fetch_entities(conn: &Connection, sql: &str, binds: &[String]) -> Result<Vec<Entity>> {
    tracing::debug!(sql = %sql, params = binds.len(), "restql.query");

    let mut stmt = conn.prepare(sql)?;

    // Execute the query first to get column info
    let mut rows_iter = stmt.query(params_from_iter(binds.iter()))?;

    let column_count = rows_iter.as_ref().map(|r| r.column_count()).unwrap_or(0);
    let column_names: Vec<String> = if let Some(row_ref) = rows_iter.as_ref() {
        (0..column_count)
            .map(|i| {
                row_ref
                    .column_name(i)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| format!("col{}", i))
            })
            .collect()
    } else {
        Vec::new()
    };

    let mut entities = Vec::new();
    while let Some(row) = rows_iter.next()? {
        let mut entity = Entity::new();
        for (i, name) in column_names.iter().enumerate() {
            entity.insert(name.clone(), value_to_json(row.get_ref(i)?));
        }
        entities.push(entity);
    }

    Ok(entities)
}

fn to_micros(unit: TimeUnit, val: i64) -> i64 {
    match unit {
        TimeUnit::Second => val * 1_000_000,
        TimeUnit::Millisecond => val * 1_000,
        TimeUnit::Microsecond => val,
        TimeUnit::Nanosecond => val / 1_000,
    }
}

fn huge_int_json(n: i128) -> Value {
    i64::try_from(n)
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(n.to_string()))
}

fn decimal_json(text: String) -> Value {
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::String(text))
}

fn timestamp_json(unit: TimeUnit, val: i64) -> Value {
    DateTime::<Utc>::from_timestamp_micros(to_micros(unit, val))
        .map(|dt| Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.fZ").to_string()))
        .unwrap_or(Value::Null)
}

fn date_json(days: i32) -> Value {
    // Days since 1970-01-01
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|epoch| epoch.checked_add_signed(TimeDelta::days(days as i64)))
        .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
        .unwrap_or(Value::Null)
}

fn time_json(unit: TimeUnit, val: i64) -> Value {
    let micros = to_micros(unit, val);
    let secs = (micros / 1_000_000) as u32;
    let micro_part = (micros % 1_000_000) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, micro_part * 1000)
        .map(|t| Value::String(t.format("%H:%M:%S%.f").to_string()))
        .unwrap_or(Value::Null)
}

fn interval_json(months: i32, days: i32, nanos: i64) -> Value {
    Value::String(format!("{} months {} days {} ns", months, days, nanos))
}

fn blob_json(bytes: &[u8]) -> Value {
    Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Convert a DuckDB value to JSON.
///
/// Temporal values become ISO-8601 strings and blobs become base64 strings.
/// Enums become their label; lists, arrays, structs and maps nest as JSON.
fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(n) => Value::from(n),
        ValueRef::SmallInt(n) => Value::from(n),
        ValueRef::Int(n) => Value::from(n),
        ValueRef::BigInt(n) => Value::from(n),
        ValueRef::HugeInt(n) => huge_int_json(n),
        ValueRef::UTinyInt(n) => Value::from(n),
        ValueRef::USmallInt(n) => Value::from(n),
        ValueRef::UInt(n) => Value::from(n),
        ValueRef::UBigInt(n) => Value::from(n),
        ValueRef::Float(f) => Value::from(f),
        ValueRef::Double(f) => Value::from(f),
        ValueRef::Decimal(d) => decimal_json(d.to_string()),
        ValueRef::Timestamp(unit, val) => timestamp_json(unit, val),
        ValueRef::Date32(days) => date_json(days),
        ValueRef::Time64(unit, val) => time_json(unit, val),
        ValueRef::Interval {
            months,
            days,
            nanos,
        } => interval_json(months, days, nanos),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).into_owned()),
        ValueRef::Blob(b) => blob_json(b),
        // Enum, List, Array, Struct, Map and Union are read out of their arrow
        // arrays by duckdb's owned conversion.
        nested => owned_to_json(DuckValue::from(nested)),
    }
}

/// Convert an owned DuckDB value (nested elements included) to JSON.
fn owned_to_json(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(n) => Value::from(n),
        DuckValue::SmallInt(n) => Value::from(n),
        DuckValue::Int(n) => Value::from(n),
        DuckValue::BigInt(n) => Value::from(n),
        DuckValue::HugeInt(n) => huge_int_json(n),
        DuckValue::UTinyInt(n) => Value::from(n),
        DuckValue::USmallInt(n) => Value::from(n),
        DuckValue::UInt(n) => Value::from(n),
        DuckValue::UBigInt(n) => Value::from(n),
        DuckValue::Float(f) => Value::from(f),
        DuckValue::Double(f) => Value::from(f),
        DuckValue::Decimal(d) => decimal_json(d.to_string()),
        DuckValue::Timestamp(unit, val) => timestamp_json(unit, val),
        DuckValue::Date32(days) => date_json(days),
        DuckValue::Time64(unit, val) => time_json(unit, val),
        DuckValue::Interval {
            months,
            days,
            nanos,
        } => interval_json(months, days, nanos),
        DuckValue::Text(s) => Value::String(s),
        DuckValue::Blob(b) => blob_json(&b),
        DuckValue::Enum(label) => Value::String(label),
        DuckValue::List(items) | DuckValue::Array(items) => {
            Value::Array(items.into_iter().map(owned_to_json).collect())
        }
        DuckValue::Struct(fields) => Value::Object(
            fields
                .keys()
                .cloned()
                .zip(fields.values().cloned().map(owned_to_json))
                .collect(),
        ),
        DuckValue::Map(entries) => Value::Object(
            entries
                .keys()
                .map(|k| key_string(&owned_to_json(k.clone())).unwrap_or_else(|| "null".to_string()))
                .zip(entries.values().cloned().map(owned_to_json))
                .collect(),
        ),
        DuckValue::Union(inner) => owned_to_json(*inner),
        #[allow(unreachable_patterns)]
        other => Value::String(format!("{:?}", other)),
    }
}

/// Stable string form of a key value, used for grouping and binding.
fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
