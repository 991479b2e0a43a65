//! Endpoint schema declarations and the capability set.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::method::Method;
use crate::query::{FieldSelection, FilterKey};
use crate::{Error, Result};

/// A query or mutation feature an endpoint can enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Column projection (`fields`)
    Fields,
    /// Eager loading of relations named in `fields`
    Relations,
    /// `limit` / `offset`
    Pagination,
    /// Free-text search (`q`)
    Search,
    /// `order=field.direction`
    Order,
    /// Allow-listed filter keys
    Filter,
    /// Allow-listed body columns for writes
    Body,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::Fields,
        Capability::Relations,
        Capability::Pagination,
        Capability::Search,
        Capability::Order,
        Capability::Filter,
        Capability::Body,
    ];

    /// HTTP methods this capability may be used with.
    pub fn allowed_methods(self) -> &'static [Method] {
        match self {
            Capability::Fields => &[Method::Get, Method::Put, Method::Post],
            Capability::Relations => &[Method::Get, Method::Put],
            Capability::Pagination
            | Capability::Search
            | Capability::Order
            | Capability::Filter => &[Method::Get],
            Capability::Body => &[Method::Put, Method::Post],
        }
    }

    pub fn allows(self, method: Method) -> bool {
        self.allowed_methods().contains(&method)
    }

    pub fn name(self) -> &'static str {
        match self {
            Capability::Fields => "fields",
            Capability::Relations => "relations",
            Capability::Pagination => "pagination",
            Capability::Search => "search",
            Capability::Order => "order",
            Capability::Filter => "filter",
            Capability::Body => "body",
        }
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A closed set of capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const fn empty() -> Self {
        Capabilities(0)
    }

    /// Everything a read can apply.
    pub const fn read() -> Self {
        Capabilities::empty()
            .with(Capability::Fields)
            .with(Capability::Relations)
            .with(Capability::Pagination)
            .with(Capability::Search)
            .with(Capability::Order)
            .with(Capability::Filter)
    }

    pub const fn with(self, capability: Capability) -> Self {
        Capabilities(self.0 | capability.bit())
    }

    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Capabilities::empty(), |caps, c| caps.with(c))
    }
}

/// Allowed columns and relation subfields for `fields`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldAllowList {
    columns: Vec<String>,
    relations: IndexMap<String, Vec<String>>,
}

impl FieldAllowList {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            relations: IndexMap::new(),
        }
    }

    /// Allow a relation with the given subfields.
    pub fn relation<I, S>(mut self, name: impl Into<String>, subfields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relations
            .insert(name.into(), subfields.into_iter().map(Into::into).collect());
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn relations(&self) -> &IndexMap<String, Vec<String>> {
        &self.relations
    }

    pub fn is_relation(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Check a requested selection against the allow-list.
    ///
    /// Plain tokens must be allowed columns or relation names; relation subfields
    /// must be among that relation's allowed subfields.
    pub fn allows(&self, selection: &FieldSelection) -> bool {
        let columns_ok = selection
            .select
            .iter()
            .all(|c| self.columns.contains(c) || self.is_relation(c));

        columns_ok
            && selection.relations.iter().all(|(relation, subfields)| {
                self.relations
                    .get(relation)
                    .is_some_and(|allowed| subfields.iter().all(|s| allowed.contains(s)))
            })
    }

    /// The full allow-list as a selection (used when `fields` is not sent).
    pub fn to_selection(&self) -> FieldSelection {
        FieldSelection {
            select: self.columns.clone(),
            relations: self.relations.clone(),
        }
    }
}

/// Value shape a filter or body key must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueKind {
    #[default]
    String,
    Integer,
    Numeric,
}

/// Rule checked against a filter or body value before it reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValueRule {
    pub kind: ValueKind,
    pub required: bool,
}

impl ValueRule {
    pub fn string() -> Self {
        Self::default()
    }

    pub fn integer() -> Self {
        Self {
            kind: ValueKind::Integer,
            required: false,
        }
    }

    pub fn numeric() -> Self {
        Self {
            kind: ValueKind::Numeric,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Check one value, returning the reason it was rejected.
    pub fn check(&self, value: &str) -> std::result::Result<(), &'static str> {
        if self.required && value.trim().is_empty() {
            return Err("is required");
        }
        match self.kind {
            ValueKind::String => Ok(()),
            ValueKind::Integer => value
                .trim()
                .parse::<i64>()
                .map(|_| ())
                .map_err(|_| "must be an integer"),
            ValueKind::Numeric => match value.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(()),
                _ => Err("must be a number"),
            },
        }
    }
}

impl FromStr for ValueRule {
    type Err = Error;

    /// Parses pipe-separated tokens such as `required|integer`.
    fn from_str(s: &str) -> Result<Self> {
        let mut rule = ValueRule::default();
        for token in s.split('|').map(str::trim).filter(|t| !t.is_empty()) {
            match token.to_ascii_lowercase().as_str() {
                "required" => rule.required = true,
                "string" => rule.kind = ValueKind::String,
                "integer" => rule.kind = ValueKind::Integer,
                "numeric" => rule.kind = ValueKind::Numeric,
                other => {
                    return Err(Error::InvalidSchema(format!(
                        "unknown value rule '{}'",
                        other
                    )))
                }
            }
        }
        Ok(rule)
    }
}

/// Per-endpoint declaration of which parameters are accepted.
///
/// A capability that is not declared causes its parameters to be rejected.
#[derive(Debug, Clone, Default)]
pub struct EndpointSchema {
    pagination: bool,
    search: Option<Vec<String>>,
    fields: Option<FieldAllowList>,
    order: Option<Vec<String>>,
    filter: Option<Vec<String>>,
    body: Option<Vec<String>>,
    rules: IndexMap<String, ValueRule>,
}

fn owned<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl EndpointSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `limit` and `offset`.
    pub fn pagination(mut self) -> Self {
        self.pagination = true;
        self
    }

    /// Accept `q`, matched against these columns.
    pub fn search<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search = Some(owned(fields));
        self
    }

    /// Accept `fields`, restricted to this allow-list.
    pub fn fields(mut self, allow: FieldAllowList) -> Self {
        self.fields = Some(allow);
        self
    }

    /// Accept `order` on these columns.
    pub fn order<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order = Some(owned(columns));
        self
    }

    /// Accept these filter keys.
    pub fn filter<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = Some(owned(keys));
        self
    }

    /// Accept these body columns.
    pub fn body<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body = Some(owned(columns));
        self
    }

    /// Attach a value rule to a declared filter key or body column.
    pub fn rule(mut self, key: impl Into<String>, rule: ValueRule) -> Self {
        self.rules.insert(key.into(), rule);
        self
    }

    /// Rule for a filter or body key; unconstrained strings when none was set.
    pub fn value_rule(&self, key: &str) -> ValueRule {
        self.rules.get(key).copied().unwrap_or_default()
    }

    pub fn has_pagination(&self) -> bool {
        self.pagination
    }

    pub fn search_fields(&self) -> Option<&[String]> {
        self.search.as_deref()
    }

    pub fn field_allow_list(&self) -> Option<&FieldAllowList> {
        self.fields.as_ref()
    }

    pub fn order_columns(&self) -> Option<&[String]> {
        self.order.as_deref()
    }

    pub fn filter_keys(&self) -> Option<&[String]> {
        self.filter.as_deref()
    }

    pub fn body_columns(&self) -> Option<&[String]> {
        self.body.as_deref()
    }

    /// Declared capabilities, in validation order.
    pub fn declared(&self) -> Vec<Capability> {
        let mut declared = Vec::new();
        if self.pagination {
            declared.push(Capability::Pagination);
        }
        if self.search.is_some() {
            declared.push(Capability::Search);
        }
        if self.fields.is_some() {
            declared.push(Capability::Fields);
        }
        if self.order.is_some() {
            declared.push(Capability::Order);
        }
        if self.filter.is_some() {
            declared.push(Capability::Filter);
        }
        if self.body.is_some() {
            declared.push(Capability::Body);
        }
        declared
    }

    /// Capabilities the translator should apply for this endpoint.
    pub fn capabilities(&self) -> Capabilities {
        let mut caps: Capabilities = self.declared().into_iter().collect();
        if self
            .fields
            .as_ref()
            .is_some_and(|f| !f.relations().is_empty())
        {
            caps = caps.with(Capability::Relations);
        }
        caps
    }

    /// Whether `key` (canonical casing) is a parameter this schema accepts.
    pub fn declares(&self, key: &str) -> bool {
        let contains = |list: &Option<Vec<String>>| {
            list.as_ref().is_some_and(|l| l.iter().any(|k| k == key))
        };

        match key {
            "limit" | "offset" if self.pagination => true,
            "q" if self.search.is_some() => true,
            "fields" if self.fields.is_some() => true,
            "order" if self.order.is_some() => true,
            _ => contains(&self.filter) || contains(&self.body),
        }
    }

    /// Check the declaration itself for mistakes.
    pub fn check(&self) -> Result<()> {
        if let Some(fields) = &self.search {
            if fields.is_empty() {
                return Err(Error::InvalidSchema(
                    "search must declare at least one field".to_string(),
                ));
            }
        }

        if let Some(keys) = &self.filter {
            for key in keys {
                FilterKey::parse(key)?;
            }
        }

        let contains = |list: &Option<Vec<String>>, key: &str| {
            list.as_ref().is_some_and(|l| l.iter().any(|k| k == key))
        };
        for key in self.rules.keys() {
            if !contains(&self.filter, key) && !contains(&self.body, key) {
                return Err(Error::InvalidSchema(format!(
                    "value rule for undeclared key '{}'",
                    key
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_fields;

    fn users_fields() -> FieldAllowList {
        FieldAllowList::new(["id", "name"]).relation("orders", ["total", "status"])
    }

    #[test]
    fn test_capability_methods() {
        assert!(Capability::Pagination.allows(Method::Get));
        assert!(!Capability::Pagination.allows(Method::Post));
        assert!(Capability::Fields.allows(Method::Put));
        assert!(Capability::Fields.allows(Method::Post));
        assert!(!Capability::Fields.allows(Method::Delete));
        assert!(Capability::Body.allows(Method::Post));
        assert!(!Capability::Body.allows(Method::Get));
        assert!(!Capability::Filter.allows(Method::Put));
    }

    #[test]
    fn test_capabilities_set() {
        let caps = Capabilities::empty()
            .with(Capability::Fields)
            .with(Capability::Order);
        assert!(caps.contains(Capability::Fields));
        assert!(caps.contains(Capability::Order));
        assert!(!caps.contains(Capability::Search));
        assert_eq!(
            caps.iter().collect::<Vec<_>>(),
            vec![Capability::Fields, Capability::Order]
        );
        assert!(Capabilities::empty().is_empty());
        assert!(!Capabilities::read().contains(Capability::Body));
    }

    #[test]
    fn test_allow_list_accepts_subset() {
        let allow = users_fields();
        assert!(allow.allows(&parse_fields("id,orders.total")));
        assert!(allow.allows(&parse_fields("name")));
        assert!(allow.allows(&parse_fields("orders")));
        assert!(allow.allows(&parse_fields("orders.")));
    }

    #[test]
    fn test_allow_list_rejects_unknown() {
        let allow = users_fields();
        assert!(!allow.allows(&parse_fields("id,email")));
        assert!(!allow.allows(&parse_fields("orders.sku")));
        assert!(!allow.allows(&parse_fields("payments.total")));
        assert!(!allow.allows(&parse_fields("total")));
    }

    #[test]
    fn test_allow_list_to_selection() {
        let selection = users_fields().to_selection();
        assert_eq!(selection.select, vec!["id", "name"]);
        assert_eq!(selection.relations["orders"], vec!["total", "status"]);
    }

    #[test]
    fn test_declares() {
        let schema = EndpointSchema::new()
            .pagination()
            .search(["name"])
            .filter(["name_gt"]);
        assert!(schema.declares("limit"));
        assert!(schema.declares("offset"));
        assert!(schema.declares("q"));
        assert!(schema.declares("name_gt"));
        assert!(!schema.declares("fields"));
        assert!(!schema.declares("order"));
        assert!(!schema.declares("foo"));
    }

    #[test]
    fn test_capabilities_from_schema() {
        let schema = EndpointSchema::new()
            .pagination()
            .fields(users_fields())
            .order(["id"]);
        let caps = schema.capabilities();
        assert!(caps.contains(Capability::Pagination));
        assert!(caps.contains(Capability::Fields));
        assert!(caps.contains(Capability::Relations));
        assert!(caps.contains(Capability::Order));
        assert!(!caps.contains(Capability::Search));

        let flat = EndpointSchema::new().fields(FieldAllowList::new(["id"]));
        assert!(!flat.capabilities().contains(Capability::Relations));
    }

    #[test]
    fn test_check_rejects_bad_declarations() {
        assert!(EndpointSchema::new().filter(["a_b_c_d"]).check().is_err());
        assert!(EndpointSchema::new().filter(["orders_total_gte"]).check().is_err());
        assert!(EndpointSchema::new()
            .search(Vec::<String>::new())
            .check()
            .is_err());
        assert!(EndpointSchema::new()
            .filter(["name_gt", "orders_total_lt", "status"])
            .check()
            .is_ok());
    }

    #[test]
    fn test_value_rules() {
        assert!(ValueRule::integer().check("42").is_ok());
        assert!(ValueRule::integer().check(" -7 ").is_ok());
        assert_eq!(ValueRule::integer().check("abc"), Err("must be an integer"));
        assert_eq!(ValueRule::integer().check("1.5"), Err("must be an integer"));
        assert!(ValueRule::numeric().check("1.5").is_ok());
        assert_eq!(ValueRule::numeric().check("NaN"), Err("must be a number"));
        assert!(ValueRule::string().check("").is_ok());
        assert_eq!(ValueRule::string().required().check("  "), Err("is required"));
    }

    #[test]
    fn test_value_rule_from_str() {
        let rule: ValueRule = "required|integer".parse().unwrap();
        assert_eq!(rule, ValueRule::integer().required());
        assert_eq!("numeric".parse::<ValueRule>().unwrap(), ValueRule::numeric());
        assert!(matches!(
            "integer|uuid".parse::<ValueRule>(),
            Err(Error::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_rules_must_name_declared_keys() {
        let schema = EndpointSchema::new()
            .filter(["id_gt"])
            .body(["total"])
            .rule("id_gt", ValueRule::integer())
            .rule("total", ValueRule::numeric().required());
        assert!(schema.check().is_ok());
        assert_eq!(schema.value_rule("id_gt"), ValueRule::integer());
        assert_eq!(schema.value_rule("status"), ValueRule::string());

        let stray = EndpointSchema::new()
            .filter(["id_gt"])
            .rule("id_lt", ValueRule::integer());
        assert!(matches!(stray.check(), Err(Error::InvalidSchema(_))));
    }
}
