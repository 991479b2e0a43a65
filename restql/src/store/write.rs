//! Create, update and delete, shaped by the same field and relation machinery as reads.

use duckdb::params;

use super::model::Model;
use super::read::attach_relation;
use super::sql::{placeholders, quote_ident};
use super::{fetch_entities, in_transaction, Entity, Store};
use crate::intent::QueryIntent;
use crate::query::FieldSelection;
use crate::schema::{Capabilities, Capability};
use crate::{Error, Result};

impl Store {
    /// Insert `intent.body` and return the new row.
    pub fn create(
        &self,
        model: &Model,
        intent: &QueryIntent,
        capabilities: Capabilities,
    ) -> Result<Entity> {
        let (columns, values) = body_columns(intent)?;

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            quote_ident(model.table()),
            columns.join(", "),
            placeholders(values.len())
        );

        let conn = self.connection()?;
        let mut entity = in_transaction(&conn, |conn| {
            fetch_entities(conn, &sql, &values)?
                .into_iter()
                .next()
                .ok_or_else(|| Error::Storage(format!("insert into {} returned no row", model.table())))
        })?;

        tracing::info!(table = model.table(), columns = columns.len(), "restql.create");

        if capabilities.contains(Capability::Fields) {
            restrict_visible(&mut entity, &intent.fields);
        }
        Ok(entity)
    }

    /// Update the row with primary key `key` from `intent.body` and return it.
    pub fn update(
        &self,
        model: &Model,
        key: &str,
        intent: &QueryIntent,
        capabilities: Capabilities,
    ) -> Result<Entity> {
        let (columns, mut values) = body_columns(intent)?;
        let relations = if capabilities.contains(Capability::Relations) {
            model.resolve_relations(&intent.fields)?
        } else {
            Vec::new()
        };

        let assignments: Vec<String> = columns.iter().map(|c| format!("{} = ?", c)).collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ? RETURNING *",
            quote_ident(model.table()),
            assignments.join(", "),
            quote_ident(model.primary_key())
        );
        values.push(key.to_string());

        let conn = self.connection()?;
        let mut entity = in_transaction(&conn, |conn| {
            let mut rows = fetch_entities(conn, &sql, &values)?;
            if rows.is_empty() {
                return Err(Error::NotFound(format!("{} {}", model.table(), key)));
            }

            for (relation, subfields) in &relations {
                let filter = intent.filter.relation(&relation.name);
                attach_relation(conn, relation, subfields, filter, &mut rows[..1])?;
            }

            Ok(rows.swap_remove(0))
        })?;

        tracing::info!(table = model.table(), key = %key, "restql.update");

        if capabilities.contains(Capability::Fields) {
            restrict_visible(&mut entity, &intent.fields);
        }
        Ok(entity)
    }

    /// Delete the row with primary key `key`.
    pub fn delete(&self, model: &Model, key: &str) -> Result<()> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            quote_ident(model.table()),
            quote_ident(model.primary_key())
        );

        let conn = self.connection()?;
        let deleted = conn.execute(&sql, params![key])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("{} {}", model.table(), key)));
        }

        tracing::info!(table = model.table(), key = %key, "restql.delete");
        Ok(())
    }
}

/// Quoted body columns and their values, in body order.
fn body_columns(intent: &QueryIntent) -> Result<(Vec<String>, Vec<String>)> {
    if intent.body.is_empty() {
        return Err(Error::invalid_value("body", "no columns to write"));
    }
    Ok(intent
        .body
        .iter()
        .map(|(column, value)| (quote_ident(column), value.clone()))
        .unzip())
}

/// Keep only selected columns and relation names. An empty selection keeps everything.
fn restrict_visible(entity: &mut Entity, fields: &FieldSelection) {
    let visible = fields.visible_keys();
    if visible.is_empty() {
        return;
    }
    entity.retain(|key, _| visible.contains(&key.as_str()));
}
