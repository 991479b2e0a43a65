//! Builds a [`QueryIntent`] from validated parameters.

use indexmap::IndexMap;

use super::{Order, Pagination, QueryIntent, Search};
use crate::config::Config;
use crate::query::{parse_fields, FieldSelection, FilterKey, FilterSet};
use crate::schema::{EndpointSchema, FieldAllowList};
use crate::validate::ValidatedParams;
use crate::{Error, Result};

pub struct IntentBuilder<'a> {
    config: &'a Config,
    schema: &'a EndpointSchema,
}

impl<'a> IntentBuilder<'a> {
    pub fn new(config: &'a Config, schema: &'a EndpointSchema) -> Self {
        Self { config, schema }
    }

    pub fn build(&self, params: &ValidatedParams) -> Result<QueryIntent> {
        Ok(QueryIntent {
            fields: self.fields(params),
            filter: self.filter(params)?,
            search: self.search(params),
            order: self.order(params)?,
            pagination: Pagination {
                limit: params.limit(),
                offset: params.offset(),
            },
            body: self.body(params),
        })
    }

    fn fields(&self, params: &ValidatedParams) -> FieldSelection {
        let Some(allow) = self.schema.field_allow_list() else {
            return FieldSelection::default();
        };

        let selection = params
            .get("fields")
            .map(|fields| promote_relations(parse_fields(fields), allow))
            .unwrap_or_default();

        if selection.is_empty() {
            allow.to_selection()
        } else {
            selection
        }
    }

    fn search(&self, params: &ValidatedParams) -> Search {
        match self.schema.search_fields() {
            Some(fields) => Search {
                q: params.get("q").unwrap_or_default().to_string(),
                fields: fields.to_vec(),
            },
            None => Search::default(),
        }
    }

    fn order(&self, params: &ValidatedParams) -> Result<Option<Order>> {
        if self.schema.order_columns().is_none() {
            return Ok(None);
        }

        match params.get("order") {
            Some(order) => Ok(Order::parse(order)),
            None => default_order(self.config).map(Some),
        }
    }

    fn filter(&self, params: &ValidatedParams) -> Result<FilterSet> {
        let mut filter = FilterSet::default();
        for key in self.schema.filter_keys().unwrap_or_default() {
            if let Some(value) = params.get(key) {
                filter.insert(&FilterKey::parse(key)?, value);
            }
        }
        Ok(filter)
    }

    fn body(&self, params: &ValidatedParams) -> IndexMap<String, String> {
        self.schema
            .body_columns()
            .unwrap_or_default()
            .iter()
            .filter_map(|column| {
                params
                    .get(column)
                    .map(|value| (column.clone(), value.to_string()))
            })
            .collect()
    }
}

/// The configured default order, which must itself be well formed.
pub(crate) fn default_order(config: &Config) -> Result<Order> {
    Order::parse(&config.default_order).ok_or_else(|| {
        Error::Config(format!(
            "default_order '{}' is not field.direction",
            config.default_order
        ))
    })
}

/// Plain tokens that name a declared relation load that whole relation.
fn promote_relations(selection: FieldSelection, allow: &FieldAllowList) -> FieldSelection {
    let mut promoted = FieldSelection {
        select: Vec::new(),
        relations: selection.relations,
    };
    for column in &selection.select {
        if allow.is_relation(column) {
            promoted.add_relation(column);
        } else {
            promoted.add_select(column);
        }
    }
    promoted
}
