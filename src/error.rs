//! errors that can occur while translating and forwarding a notification
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::credentials::{API_KEY_PARAM, ROUTING_KEY_PARAM};

#[derive(Debug, Error)]
pub enum Error {
    /// the inbound body is not a usable alertmanager webhook
    #[error("malformed alertmanager request body: {0}")]
    MalformedInput(String),

    #[error("requires query parameters '{}' and '{}'", API_KEY_PARAM, ROUTING_KEY_PARAM)]
    MissingCredentials,

    #[error("unknown alertmanager status: {0}")]
    UnknownStatus(String),

    /// the outbound alert could not be serialized
    #[error("failed to encode VictorOps alert: {0}")]
    Encoding(#[source] serde_json::Error),

    /// VictorOps could not be reached (connection, timeout, tls)
    #[error("failed post to VictorOps REST api: {0}")]
    Dispatch(#[source] reqwest::Error),

    /// VictorOps answered with a non 2xx status
    #[error("unexpected status code {status} from VictorOps: {message}")]
    DownstreamRejected { status: u16, message: String },

    #[error("could not decode VictorOps response body (status {status}): {source}")]
    UndecodableResponse {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// a failure while forwarding one alert of a firing batch
    #[error("alert {index} of the batch: {source}")]
    Alert {
        index: usize,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// status code reported back to alertmanager
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MalformedInput(_) | Error::MissingCredentials | Error::UnknownStatus(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Dispatch(_)
            | Error::DownstreamRejected { .. }
            | Error::UndecodableResponse { .. } => StatusCode::BAD_GATEWAY,
            Error::Alert { source, .. } => source.status_code(),
        }
    }

    /// short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MalformedInput(_) => "malformed_input",
            Error::MissingCredentials => "missing_credentials",
            Error::UnknownStatus(_) => "unknown_status",
            Error::Encoding(_) => "encoding",
            Error::Dispatch(_) => "dispatch",
            Error::DownstreamRejected { .. } => "downstream_rejected",
            Error::UndecodableResponse { .. } => "undecodable_response",
            Error::Alert { source, .. } => source.kind(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_failures_report_the_wrapped_status() {
        let err = Error::Alert {
            index: 2,
            source: Box::new(Error::DownstreamRejected {
                status: 500,
                message: "bad routing key".to_owned(),
            }),
        };

        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.kind(), "downstream_rejected");
        assert_eq!(
            err.to_string(),
            "alert 2 of the batch: unexpected status code 500 from VictorOps: bad routing key"
        );
    }

    #[test]
    fn request_errors_are_bad_requests() {
        assert_eq!(Error::MissingCredentials.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::UnknownStatus("pending".to_owned()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::MalformedInput("alerts missing".to_owned()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::MissingCredentials.to_string(),
            "requires query parameters 'api_key' and 'routing_key'"
        );
    }

    #[test]
    fn encoding_errors_are_internal() {
        let source = serde_json::from_str::<u8>("x").unwrap_err();
        assert_eq!(Error::Encoding(source).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
