//! Per-endpoint parameter validation.
//!
//! Validation runs in a fixed order and stops at the first failure:
//! 1. every declared capability must be usable with the request method
//! 2. every parameter must be declared (after snake_case canonicalization)
//! 3. values are checked capability by capability: pagination, search, fields,
//!    order, filter, body
//!
//! Defaults for `limit`, `offset` and `q` are injected here so later stages never
//! see a missing value.

use indexmap::IndexMap;

use crate::config::Config;
use crate::intent::Order;
use crate::method::Method;
use crate::params::{is_suppress_status_param, ParamValue, RequestParams};
use crate::query::{parse_fields, to_snake_case};
use crate::schema::{Capability, EndpointSchema};
use crate::{Error, Result};

/// Parameters that passed validation, with canonical keys and defaults applied.
///
/// Only built by [`Validator::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedParams {
    method: Method,
    values: IndexMap<String, String>,
    limit: u64,
    offset: u64,
    suppress_status: bool,
}

impl ValidatedParams {
    pub fn method(&self) -> Method {
        self.method
    }

    /// Value of a canonical (snake_case) parameter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn suppresses_status(&self) -> bool {
        self.suppress_status
    }
}

/// Checks raw parameters against one endpoint declaration.
pub struct Validator<'a> {
    config: &'a Config,
    schema: &'a EndpointSchema,
}

impl<'a> Validator<'a> {
    pub fn new(config: &'a Config, schema: &'a EndpointSchema) -> Self {
        Self { config, schema }
    }

    pub fn validate(&self, method: Method, params: &RequestParams) -> Result<ValidatedParams> {
        self.check_methods(method)?;
        let raw = self.canonicalize(params)?;

        let mut validated = ValidatedParams {
            method,
            values: IndexMap::new(),
            limit: self.config.default_limit,
            offset: self.config.default_offset,
            suppress_status: params.suppresses_status(),
        };

        for capability in self.schema.declared() {
            match capability {
                Capability::Pagination => self.pagination(&raw, &mut validated)?,
                Capability::Search => self.search(&raw, &mut validated)?,
                Capability::Fields => self.fields(&raw, &mut validated)?,
                Capability::Order => self.order(&raw, &mut validated)?,
                Capability::Filter => {
                    let keys = self.schema.filter_keys().unwrap_or_default();
                    self.copy_scalars(keys, &raw, &mut validated)?;
                }
                Capability::Body => {
                    let keys = self.schema.body_columns().unwrap_or_default();
                    self.copy_scalars(keys, &raw, &mut validated)?;
                }
                Capability::Relations => {}
            }
        }

        Ok(validated)
    }

    fn check_methods(&self, method: Method) -> Result<()> {
        match self
            .schema
            .declared()
            .into_iter()
            .find(|capability| !capability.allows(method))
        {
            Some(capability) => Err(Error::MethodNotAllowed { capability, method }),
            None => Ok(()),
        }
    }

    /// Re-key parameters in snake_case, rejecting the first undeclared one.
    ///
    /// Two keys that canonicalize to the same name (`name_gt` and `nameGt`) are
    /// rejected on the second.
    fn canonicalize<'p>(&self, params: &'p RequestParams) -> Result<IndexMap<String, &'p ParamValue>> {
        let mut raw = IndexMap::new();
        for (key, value) in params.iter() {
            if is_suppress_status_param(key) {
                continue;
            }
            let canonical = to_snake_case(key);
            if !self.schema.declares(&canonical) {
                return Err(Error::UnknownParameter(key.to_string()));
            }
            if raw.contains_key(&canonical) {
                return Err(Error::invalid_value(key, "duplicate parameter"));
            }
            raw.insert(canonical, value);
        }
        Ok(raw)
    }

    fn pagination(
        &self,
        raw: &IndexMap<String, &ParamValue>,
        validated: &mut ValidatedParams,
    ) -> Result<()> {
        if let Some(value) = raw.get("limit") {
            let limit = parse_count("limit", value)?;
            if limit < 1 {
                return Err(Error::invalid_value("limit", "must be at least 1"));
            }
            if let Some(max) = self.config.max_limit {
                if limit > max {
                    return Err(Error::invalid_value(
                        "limit",
                        format!("must be at most {}", max),
                    ));
                }
            }
            validated.limit = limit;
        }

        if let Some(value) = raw.get("offset") {
            validated.offset = parse_count("offset", value)?;
        }

        validated
            .values
            .insert("limit".to_string(), validated.limit.to_string());
        validated
            .values
            .insert("offset".to_string(), validated.offset.to_string());
        Ok(())
    }

    fn search(
        &self,
        raw: &IndexMap<String, &ParamValue>,
        validated: &mut ValidatedParams,
    ) -> Result<()> {
        let q = match raw.get("q") {
            Some(value) => scalar("q", value)?.to_string(),
            None => String::new(),
        };
        validated.values.insert("q".to_string(), q);
        Ok(())
    }

    fn fields(
        &self,
        raw: &IndexMap<String, &ParamValue>,
        validated: &mut ValidatedParams,
    ) -> Result<()> {
        let Some(value) = raw.get("fields") else {
            return Ok(());
        };

        let canonical = canonical_fields(&value.joined());
        let selection = parse_fields(&canonical);
        let Some(allow) = self
            .schema
            .field_allow_list()
            .filter(|allow| allow.allows(&selection))
        else {
            return Err(Error::FieldsNotApplicable);
        };

        let wants_relation = !selection.relations.is_empty()
            || selection.select.iter().any(|c| allow.is_relation(c));
        if wants_relation && !Capability::Relations.allows(validated.method) {
            return Err(Error::MethodNotAllowed {
                capability: Capability::Relations,
                method: validated.method,
            });
        }

        validated.values.insert("fields".to_string(), canonical);
        Ok(())
    }

    fn order(
        &self,
        raw: &IndexMap<String, &ParamValue>,
        validated: &mut ValidatedParams,
    ) -> Result<()> {
        let Some(value) = raw.get("order") else {
            return Ok(());
        };

        let order = value
            .as_single()
            .and_then(Order::parse)
            .map(|order| Order {
                field: to_snake_case(&order.field),
                direction: order.direction,
            })
            .filter(|order| {
                self.schema
                    .order_columns()
                    .is_some_and(|columns| columns.contains(&order.field))
            })
            .ok_or(Error::OrderNotApplicable)?;

        validated
            .values
            .insert("order".to_string(), order.to_string());
        Ok(())
    }

    /// Copy the declared keys that were sent, requiring single values that
    /// satisfy the key's value rule.
    fn copy_scalars(
        &self,
        keys: &[String],
        raw: &IndexMap<String, &ParamValue>,
        validated: &mut ValidatedParams,
    ) -> Result<()> {
        for key in keys {
            let rule = self.schema.value_rule(key);
            match raw.get(key) {
                Some(value) => {
                    let value = scalar(key, value)?;
                    rule.check(value)
                        .map_err(|reason| Error::invalid_value(key.as_str(), reason))?;
                    validated.values.insert(key.clone(), value.to_string());
                }
                None if rule.required => {
                    return Err(Error::invalid_value(key.as_str(), "is required"));
                }
                None => {}
            }
        }
        Ok(())
    }
}

fn scalar<'v>(param: &str, value: &'v ParamValue) -> Result<&'v str> {
    value
        .as_single()
        .ok_or_else(|| Error::invalid_value(param, "must be a single value"))
}

/// A non-negative count that still fits DuckDB's signed `LIMIT`/`OFFSET`.
fn parse_count(param: &str, value: &ParamValue) -> Result<u64> {
    let count = scalar(param, value)?
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::invalid_value(param, "must be a non-negative integer"))?;
    if count > i64::MAX as u64 {
        return Err(Error::invalid_value(
            param,
            format!("must be at most {}", i64::MAX),
        ));
    }
    Ok(count)
}

/// snake_case every identifier in a field string, keeping relation dots.
fn canonical_fields(input: &str) -> String {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| match token.split_once('.') {
            Some((relation, field)) => {
                format!("{}.{}", to_snake_case(relation), to_snake_case(field))
            }
            None => to_snake_case(token),
        })
        .collect::<Vec<_>>()
        .join(",")
}
