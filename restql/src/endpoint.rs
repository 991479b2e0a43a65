//! An endpoint binds a [`Config`] and an [`EndpointSchema`] and compiles requests.

use crate::config::Config;
use crate::error::Failure;
use crate::intent::{default_order, IntentBuilder, QueryIntent};
use crate::method::Method;
use crate::params::RequestParams;
use crate::schema::{Capabilities, EndpointSchema};
use crate::validate::Validator;
use crate::{Error, Result};

/// A declared endpoint, checked once at construction.
///
/// `Endpoint` holds no per-request state and can be shared across threads.
#[derive(Debug, Clone)]
pub struct Endpoint {
    config: Config,
    schema: EndpointSchema,
}

impl Endpoint {
    pub fn new(config: Config, schema: EndpointSchema) -> Result<Self> {
        config.check()?;
        schema.check()?;
        if schema.order_columns().is_some() {
            default_order(&config)?;
        }
        Ok(Self { config, schema })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn schema(&self) -> &EndpointSchema {
        &self.schema
    }

    /// Capabilities the translator should apply for this endpoint.
    pub fn capabilities(&self) -> Capabilities {
        self.schema.capabilities()
    }

    /// Validate raw parameters and build the query intent.
    pub fn compile(&self, method: Method, params: &RequestParams) -> Result<QueryIntent> {
        let validated = Validator::new(&self.config, &self.schema)
            .validate(method, params)
            .inspect_err(|e| {
                tracing::warn!(method = %method, key = e.key(), error = %e, "restql.validate");
            })?;

        let intent = IntentBuilder::new(&self.config, &self.schema).build(&validated)?;
        tracing::trace!(?intent, "restql.intent");
        Ok(intent)
    }

    /// Describe a failure for the response formatter, honoring status suppression.
    pub fn failure(&self, error: &Error, params: &RequestParams) -> Failure {
        error.failure().suppressed(params.suppresses_status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Capability, FieldAllowList};

    fn users() -> Endpoint {
        Endpoint::new(
            Config::default(),
            EndpointSchema::new()
                .pagination()
                .search(["name"])
                .fields(FieldAllowList::new(["id", "name"]).relation("orders", ["total"]))
                .order(["id", "name"])
                .filter(["name_gt"]),
        )
        .unwrap()
    }

    #[test]
    fn test_compile_name_gt() {
        let intent = users()
            .compile(Method::Get, &RequestParams::new().with("name_gt", "m"))
            .unwrap();
        assert_eq!(intent.filter.select.gt["name"], "m");
    }

    #[test]
    fn test_compile_is_deterministic() {
        let endpoint = users();
        let params = RequestParams::new()
            .with("q", "anna")
            .with("fields", "id,orders.total")
            .with("order", "name.desc");
        assert_eq!(
            endpoint.compile(Method::Get, &params).unwrap(),
            endpoint.compile(Method::Get, &params).unwrap()
        );
    }

    #[test]
    fn test_failure_reporting() {
        let endpoint = users();
        let params = RequestParams::new().with("foo", "1");
        let err = endpoint.compile(Method::Get, &params).unwrap_err();

        let failure = endpoint.failure(&err, &params);
        assert_eq!(failure.status, 422);
        assert_eq!(failure.message(), Some("Invalid param foo."));

        let params = params.with("suppressResponseHttpStatusCode", "true");
        let err = endpoint.compile(Method::Get, &params).unwrap_err();
        assert_eq!(endpoint.failure(&err, &params).status, 200);
    }

    #[test]
    fn test_construction_checks_declarations() {
        assert!(matches!(
            Endpoint::new(Config::default(), EndpointSchema::new().filter(["a_b_c_d"])),
            Err(Error::InvalidSchema(_))
        ));
        assert!(matches!(
            Endpoint::new(
                Config::default().with_default_order("id"),
                EndpointSchema::new().order(["id"])
            ),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_capabilities() {
        let caps = users().capabilities();
        assert!(caps.contains(Capability::Relations));
        assert!(caps.contains(Capability::Search));
        assert!(!caps.contains(Capability::Body));
    }

    #[test]
    fn test_endpoint_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Endpoint>();
    }
}
