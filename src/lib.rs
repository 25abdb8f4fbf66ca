//! prometheus alertmanager receiver that forwards alerts to the VictorOps REST
//! alert endpoint
//!
//! Features:
//! - one VictorOps alert per firing alert, one recovery per resolved group
//! - per request routing via the `api_key` and `routing_key` query parameters
//! - alert severity override via the `victorops_message_type` label
pub mod alert;
pub mod alertmanager_webhook_receiver;
pub mod credentials;
pub mod dispatcher;
pub mod error;
pub mod log;
pub mod metrics;
pub mod settings;
pub mod telemetry_endpoint;
pub mod translator;
pub mod victorops;

pub use error::Error;
