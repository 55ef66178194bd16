//! reqwest-backed implementation of [`Upstream`]
//!
//! One shared client with a fixed timeout and the configured User-Agent.
//! Action API queries always ask for `format=json`.

use super::error::GatewayError;
use super::gateway::{Endpoint, Upstream};
use crate::config::EdiscoConfig;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;

pub struct HttpGateway {
    client: reqwest::Client,
    action_url: Url,
    pageviews_url: Url,
}

impl HttpGateway {
    pub fn new(config: &EdiscoConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            action_url: Url::parse(&config.api_url)?,
            pageviews_url: Url::parse(&config.pageviews_url)?,
        })
    }

    fn url_for(&self, endpoint: &Endpoint) -> Result<Url, GatewayError> {
        match endpoint {
            Endpoint::Action => Ok(self.action_url.clone()),
            Endpoint::PageViews(segments) => {
                let mut url = self.pageviews_url.clone();
                url.path_segments_mut()
                    .map_err(|_| GatewayError::Transport("page-view base URL cannot be a base".into()))?
                    .pop_if_empty()
                    .extend(segments);
                Ok(url)
            }
        }
    }
}

#[async_trait]
impl Upstream for HttpGateway {
    async fn query(
        &self,
        endpoint: &Endpoint,
        params: &[(&'static str, String)],
    ) -> Result<Value, GatewayError> {
        let url = self.url_for(endpoint)?;
        let mut request = self.client.get(url.clone());
        if matches!(endpoint, Endpoint::Action) {
            request = request.query(&[("format", "json")]);
        }
        if !params.is_empty() {
            request = request.query(params);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            log::debug!("Upstream {} answered {}", url, status);
            return Err(GatewayError::UpstreamStatus(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
