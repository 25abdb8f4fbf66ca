//! Sends alert POSTs to the VictorOps REST endpoint.
//!
//! The routing credentials are part of the request path, so neither the url
//! nor transport errors carrying it may end up in logs or error messages.
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use http::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use url::Url;

use crate::{
    credentials::RoutingCredentials,
    error::Error,
    settings::Settings,
    victorops::{AlertPost, AlertResponse},
};

/// path of the generic REST integration below the base url
const ALERT_PATH: [&str; 4] = ["integrations", "generic", "20131114", "alert"];

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct VictorOpsSettings {
    pub base_url: Url,
    #[serde_as(as = "DurationSeconds<f64>")]
    pub request_timeout: Duration,
}

impl VictorOpsSettings {
    pub fn global() -> &'static Self {
        &Settings::global().victorops
    }
}

/// what VictorOps answered to one POST
#[derive(Debug)]
pub struct Receipt {
    pub status: StatusCode,
    /// the decoded body, or why it couldn't be decoded. What a decode failure
    /// means is up to the caller
    pub body: Result<AlertResponse, serde_json::Error>,
}

#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Sends one alert. Only encoding and transport failures are errors, any
    /// response that arrived is returned as [Receipt]
    async fn send(
        &self,
        post: &AlertPost,
        credentials: &RoutingCredentials,
    ) -> Result<Receipt, Error>;
}

/// [Dispatch] implementation talking https to VictorOps
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpDispatcher {
    pub fn new(settings: &VictorOpsSettings) -> Result<Self> {
        if settings.base_url.cannot_be_a_base() {
            bail!("VictorOps base url {} can't be a base", settings.base_url);
        }

        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build VictorOps http client")?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
        })
    }

    /// `<base>/integrations/generic/20131114/alert/<api_key>/<routing_key>`
    pub fn alert_url(&self, credentials: &RoutingCredentials) -> Url {
        let mut url = self.base_url.clone();

        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(ALERT_PATH)
                .push(credentials.api_key())
                .push(credentials.routing_key());
        }

        url
    }
}

#[async_trait]
impl Dispatch for HttpDispatcher {
    async fn send(
        &self,
        post: &AlertPost,
        credentials: &RoutingCredentials,
    ) -> Result<Receipt, Error> {
        let body = serde_json::to_vec(post).map_err(Error::Encoding)?;

        tracing::debug!(
            message_type = %post.message_type,
            entity_id = %post.entity_id,
            "posting alert to VictorOps"
        );

        let response = self
            .client
            .post(self.alert_url(credentials))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| Error::Dispatch(err.without_url()))?;

        let status = response.status();

        let bytes = response
            .bytes()
            .await
            .map_err(|err| Error::Dispatch(err.without_url()))?;

        tracing::debug!(%status, "VictorOps answered");

        Ok(Receipt {
            status,
            body: serde_json::from_slice(&bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher(base_url: &str) -> HttpDispatcher {
        HttpDispatcher::new(&VictorOpsSettings {
            base_url: Url::parse(base_url).unwrap(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn builds_alert_url_from_credentials() {
        let credentials = RoutingCredentials::new("abc", "ops").unwrap();

        assert_eq!(
            dispatcher("https://alert.victorops.com")
                .alert_url(&credentials)
                .as_str(),
            "https://alert.victorops.com/integrations/generic/20131114/alert/abc/ops"
        );
        assert_eq!(
            dispatcher("http://localhost:8080/proxy/")
                .alert_url(&credentials)
                .as_str(),
            "http://localhost:8080/proxy/integrations/generic/20131114/alert/abc/ops"
        );
    }

    #[test]
    fn credentials_are_path_encoded() {
        let credentials = RoutingCredentials::new("a/b", "team ops").unwrap();

        assert_eq!(
            dispatcher("https://alert.victorops.com")
                .alert_url(&credentials)
                .path(),
            "/integrations/generic/20131114/alert/a%2Fb/team%20ops"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        let settings = VictorOpsSettings {
            base_url: Url::parse("mailto:ops@example.com").unwrap(),
            request_timeout: Duration::from_secs(5),
        };

        assert!(HttpDispatcher::new(&settings).is_err());
    }
}
