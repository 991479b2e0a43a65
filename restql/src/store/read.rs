//! Read translation: QueryIntent -> paged result envelope.

use duckdb::Connection;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use super::model::{Model, Relation, RelationKind};
use super::sql::{projection, quote_ident, WhereClause};
use super::{fetch_entities, in_transaction, key_string, Entity, Store};
use crate::intent::QueryIntent;
use crate::query::FilterBuckets;
use crate::schema::{Capabilities, Capability};
use crate::Result;

/// Window column carrying the pre-pagination match count.
const TOTAL_COLUMN: &str = "__restql_total";

/// A page of entities plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    pub total: u64,
    pub collection: Vec<Entity>,
    pub limit: u64,
    pub offset: u64,
}

impl Store {
    /// Execute a read intent against a model.
    ///
    /// Only the parts of the intent named in `capabilities` are applied. The page,
    /// the total and every relation load run in one transaction.
    pub fn read(
        &self,
        model: &Model,
        intent: &QueryIntent,
        capabilities: Capabilities,
    ) -> Result<ResultEnvelope> {
        let relations = if capabilities.contains(Capability::Relations) {
            model.resolve_relations(&intent.fields)?
        } else {
            Vec::new()
        };

        // Requested columns, plus any join keys relations need
        let mut columns = Vec::new();
        let mut helpers = Vec::new();
        if capabilities.contains(Capability::Fields) && !intent.fields.select.is_empty() {
            columns = intent.fields.select.clone();
            for (relation, _) in &relations {
                if !columns.contains(&relation.parent_column) {
                    columns.push(relation.parent_column.clone());
                    helpers.push(relation.parent_column.clone());
                }
            }
        }

        let mut clause = WhereClause::new();
        if capabilities.contains(Capability::Search) {
            clause.search(&intent.search, model.label_column());
        }
        if capabilities.contains(Capability::Filter) {
            clause.filter(&intent.filter.select);
        }

        let table = quote_ident(model.table());
        let pk = quote_ident(model.primary_key());
        let order_by = match &intent.order {
            Some(order) if capabilities.contains(Capability::Order) => {
                if order.field == model.primary_key() {
                    format!("{} {}", pk, order.direction.sql())
                } else {
                    format!("{} {}, {} ASC", quote_ident(&order.field), order.direction.sql(), pk)
                }
            }
            _ => format!("{} ASC", pk),
        };

        let paginate = capabilities.contains(Capability::Pagination);
        let page = if paginate {
            format!(
                " LIMIT {} OFFSET {}",
                intent.pagination.limit, intent.pagination.offset
            )
        } else {
            String::new()
        };

        let sql = format!(
            "SELECT {}, COUNT(*) OVER () AS {} FROM {}{} ORDER BY {}{}",
            projection(&columns),
            TOTAL_COLUMN,
            table,
            clause.sql(),
            order_by,
            page
        );

        let conn = self.connection()?;
        let (total, collection) = in_transaction(&conn, |conn| {
            let mut collection = fetch_entities(conn, &sql, clause.binds())?;

            let total = match collection.first() {
                Some(first) => first.get(TOTAL_COLUMN).and_then(Value::as_u64).unwrap_or(0),
                None if paginate && intent.pagination.offset > 0 => {
                    count(conn, &table, &clause)?
                }
                None => 0,
            };
            for entity in &mut collection {
                entity.shift_remove(TOTAL_COLUMN);
            }

            let filter = capabilities.contains(Capability::Filter);
            for (relation, subfields) in &relations {
                let filter = if filter {
                    intent.filter.relation(&relation.name)
                } else {
                    None
                };
                attach_relation(conn, relation, subfields, filter, &mut collection)?;
            }

            Ok((total, collection))
        })?;

        let collection = collection
            .into_iter()
            .map(|mut entity| {
                for helper in &helpers {
                    entity.shift_remove(helper);
                }
                entity
            })
            .collect();

        let (limit, offset) = if paginate {
            (intent.pagination.limit, intent.pagination.offset)
        } else {
            (total, 0)
        };

        Ok(ResultEnvelope {
            total,
            collection,
            limit,
            offset,
        })
    }
}

fn count(conn: &Connection, table: &str, clause: &WhereClause) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) AS n FROM {}{}", table, clause.sql());
    let rows = fetch_entities(conn, &sql, clause.binds())?;
    Ok(rows
        .first()
        .and_then(|row| row.get("n"))
        .and_then(Value::as_u64)
        .unwrap_or(0))
}

/// Load one relation for every entity of the page and nest it under the relation name.
///
/// The relation filter narrows the loaded rows only; parents are never dropped.
pub(super) fn attach_relation(
    conn: &Connection,
    relation: &Relation,
    subfields: &[String],
    filter: Option<&FilterBuckets>,
    entities: &mut [Entity],
) -> Result<()> {
    let mut keys: Vec<String> = Vec::new();
    for entity in entities.iter() {
        if let Some(key) = entity.get(&relation.parent_column).and_then(key_string) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    let mut grouped: IndexMap<String, Vec<Entity>> = IndexMap::new();
    if !keys.is_empty() {
        let mut columns = subfields.to_vec();
        let strip_key = !columns.is_empty() && !columns.contains(&relation.related_column);
        if strip_key {
            columns.push(relation.related_column.clone());
        }

        let mut clause = WhereClause::new();
        clause.any_of(&relation.related_column, keys);
        if let Some(filter) = filter {
            clause.filter(filter);
        }

        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {} ASC",
            projection(&columns),
            quote_ident(&relation.table),
            clause.sql(),
            quote_ident(&relation.order_column)
        );

        for mut row in fetch_entities(conn, &sql, clause.binds())? {
            let key = row.get(&relation.related_column).and_then(key_string);
            if strip_key {
                row.shift_remove(&relation.related_column);
            }
            if let Some(key) = key {
                grouped.entry(key).or_default().push(row);
            }
        }
    }

    for entity in entities.iter_mut() {
        let related = entity
            .get(&relation.parent_column)
            .and_then(key_string)
            .and_then(|key| grouped.get(&key))
            .cloned()
            .unwrap_or_default();

        let value = match relation.kind {
            RelationKind::HasMany => Value::Array(related.into_iter().map(Value::Object).collect()),
            RelationKind::BelongsTo => related
                .into_iter()
                .next()
                .map(Value::Object)
                .unwrap_or(Value::Null),
        };
        entity.insert(relation.name.clone(), value);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{Order, Pagination, Search};
    use crate::query::{parse_fields, CompareOp, FieldSelection, FilterSet};
    use serde_json::json;

    fn setup_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .execute_batch(
                "CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR, email VARCHAR);
                 CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER, total INTEGER);
                 INSERT INTO users VALUES
                    (1, 'anna', 'anna@example.com'),
                    (2, 'bob', 'bob@example.com'),
                    (3, 'hannah', 'h@example.com'),
                    (4, 'zed', 'zed@example.com');
                 INSERT INTO orders VALUES (10, 1, 50), (11, 1, 150), (12, 3, 20);",
            )
            .unwrap();
        store
    }

    fn users() -> Model {
        Model::new("users").with_relation(Relation::has_many("orders", "orders", "user_id"))
    }

    fn intent() -> QueryIntent {
        QueryIntent {
            fields: FieldSelection::default(),
            filter: FilterSet::default(),
            search: Search::default(),
            order: None,
            pagination: Pagination {
                limit: 20,
                offset: 0,
            },
            body: IndexMap::new(),
        }
    }

    fn ids(envelope: &ResultEnvelope) -> Vec<i64> {
        envelope
            .collection
            .iter()
            .map(|e| e["id"].as_i64().unwrap())
            .collect()
    }

    #[test]
    fn test_read_all() {
        let store = setup_store();
        let envelope = store.read(&users(), &intent(), Capabilities::read()).unwrap();
        assert_eq!(envelope.total, 4);
        assert_eq!(ids(&envelope), vec![1, 2, 3, 4]);
        assert!(!envelope.collection[0].contains_key(TOTAL_COLUMN));
    }

    #[test]
    fn test_filter_gt() {
        let store = setup_store();
        let mut intent = intent();
        intent.filter.select.insert(CompareOp::Gt, "name", "m");
        let envelope = store.read(&users(), &intent, Capabilities::read()).unwrap();
        assert_eq!(ids(&envelope), vec![4]);
        assert_eq!(envelope.total, 1);
    }

    #[test]
    fn test_total_ignores_pagination() {
        let store = setup_store();
        let mut intent = intent();
        intent.pagination = Pagination {
            limit: 2,
            offset: 1,
        };
        let envelope = store.read(&users(), &intent, Capabilities::read()).unwrap();
        assert_eq!(envelope.total, 4);
        assert_eq!(ids(&envelope), vec![2, 3]);
        assert_eq!((envelope.limit, envelope.offset), (2, 1));

        intent.pagination.offset = 10;
        let envelope = store.read(&users(), &intent, Capabilities::read()).unwrap();
        assert_eq!(envelope.total, 4);
        assert!(envelope.collection.is_empty());
    }

    #[test]
    fn test_search_and_order() {
        let store = setup_store();
        let mut intent = intent();
        intent.search = Search {
            q: "ann".to_string(),
            fields: vec!["name".to_string(), "email".to_string()],
        };
        intent.order = Order::parse("name.desc");
        let envelope = store.read(&users(), &intent, Capabilities::read()).unwrap();
        assert_eq!(ids(&envelope), vec![3, 1]);
    }

    #[test]
    fn test_search_ignores_case() {
        let store = setup_store();
        let mut intent = intent();
        intent.search = Search {
            q: "ANNA".to_string(),
            fields: vec!["name".to_string()],
        };
        let envelope = store.read(&users(), &intent, Capabilities::read()).unwrap();
        assert_eq!(ids(&envelope), vec![1, 3]);
    }

    #[test]
    fn test_search_wildcards_are_literal() {
        let store = setup_store();
        let mut intent = intent();
        intent.search = Search {
            q: "%".to_string(),
            fields: vec!["name".to_string()],
        };
        let envelope = store.read(&users(), &intent, Capabilities::read()).unwrap();
        assert_eq!(envelope.total, 0);
    }

    #[test]
    fn test_projection_and_relations() {
        let store = setup_store();
        let mut intent = intent();
        intent.fields = parse_fields("name,orders.total");
        let envelope = store.read(&users(), &intent, Capabilities::read()).unwrap();

        assert_eq!(
            json!(envelope.collection[0]),
            json!({"name": "anna", "orders": [{"total": 50}, {"total": 150}]})
        );
        assert_eq!(json!(envelope.collection[1]), json!({"name": "bob", "orders": []}));
    }

    #[test]
    fn test_relation_filter_scopes_relation_only() {
        let store = setup_store();
        let mut intent = intent();
        intent.fields = parse_fields("id,orders.total");
        intent.filter.insert(
            &crate::query::FilterKey::parse("orders_total_gt").unwrap(),
            "100",
        );
        let envelope = store.read(&users(), &intent, Capabilities::read()).unwrap();

        assert_eq!(envelope.total, 4);
        assert_eq!(envelope.collection[0]["orders"], json!([{"total": 150}]));
        assert_eq!(envelope.collection[2]["orders"], json!([]));
    }

    #[test]
    fn test_capabilities_gate_intent() {
        let store = setup_store();
        let mut intent = intent();
        intent.filter.select.insert(CompareOp::Eq, "name", "bob");
        intent.fields = parse_fields("name,orders.total");
        intent.pagination.limit = 1;

        let caps = Capabilities::empty().with(Capability::Fields);
        let envelope = store.read(&users(), &intent, caps).unwrap();
        assert_eq!(envelope.total, 4);
        assert_eq!(envelope.collection.len(), 4);
        assert_eq!((envelope.limit, envelope.offset), (4, 0));
        assert_eq!(json!(envelope.collection[0]), json!({"name": "anna"}));
    }

    #[test]
    fn test_belongs_to() {
        let store = setup_store();
        let model = Model::new("orders").with_relation(Relation::belongs_to("user", "users", "user_id"));
        let mut intent = intent();
        intent.fields = parse_fields("id,user.name");
        let envelope = store.read(&model, &intent, Capabilities::read()).unwrap();

        assert_eq!(
            json!(envelope.collection[0]),
            json!({"id": 10, "user": {"name": "anna"}})
        );
    }
}
