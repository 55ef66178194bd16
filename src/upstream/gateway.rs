//! Upstream gateway seam
//!
//! Everything the core knows about the network goes through [`Upstream`]:
//! one parameterized query against one of two endpoints, returning decoded
//! JSON or a [`GatewayError`]. No retries happen at this layer.

use super::error::GatewayError;
use async_trait::async_trait;
use serde_json::Value;

/// Query parameters as ordered key/value pairs
pub type Params = Vec<(&'static str, String)>;

/// Upstream endpoint addressed by a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Change-log / revision / page-image action API (`api.php`)
    Action,
    /// Page-view statistics REST API; path segments below the metrics root
    PageViews(Vec<String>),
}

#[async_trait]
pub trait Upstream: Send + Sync {
    /// Issue one query and return the decoded JSON body
    async fn query(&self, endpoint: &Endpoint, params: &[(&'static str, String)])
        -> Result<Value, GatewayError>;
}

/// Look up a parameter by name
pub fn param<'a>(params: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.as_str())
}
