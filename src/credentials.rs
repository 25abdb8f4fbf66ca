//! per request VictorOps routing credentials
use std::fmt;

use crate::error::Error;

pub const API_KEY_PARAM: &str = "api_key";
pub const ROUTING_KEY_PARAM: &str = "routing_key";

/// The two keys VictorOps expects in the alert endpoint path. They are only
/// kept for the lifetime of one request and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct RoutingCredentials {
    api_key: String,
    routing_key: String,
}

impl RoutingCredentials {
    pub fn new(api_key: impl Into<String>, routing_key: impl Into<String>) -> Result<Self, Error> {
        let (api_key, routing_key) = (api_key.into(), routing_key.into());

        if api_key.is_empty() || routing_key.is_empty() {
            return Err(Error::MissingCredentials);
        }

        Ok(Self {
            api_key,
            routing_key,
        })
    }

    /// Extracts the credentials from a raw (still urlencoded) query string. The
    /// first occurrence of each parameter wins.
    pub fn from_query(query: Option<&str>) -> Result<Self, Error> {
        let mut api_key = None;
        let mut routing_key = None;

        for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                API_KEY_PARAM if api_key.is_none() => api_key = Some(value.into_owned()),
                ROUTING_KEY_PARAM if routing_key.is_none() => {
                    routing_key = Some(value.into_owned())
                }
                _ => {}
            }
        }

        match (api_key, routing_key) {
            (Some(api_key), Some(routing_key)) => Self::new(api_key, routing_key),
            _ => Err(Error::MissingCredentials),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }
}

impl fmt::Debug for RoutingCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingCredentials")
            .field("api_key", &"<redacted>")
            .field("routing_key", &"<redacted>")
            .finish()
    }
}
