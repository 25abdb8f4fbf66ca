//! Payloads of the VictorOps REST alert ingestion endpoint.
//!
//! The endpoint accepts alerts from any source via an HTTPS POST request, only
//! `message_type` is required.
//! <http://victorops.force.com/knowledgebase/articles/Integration/Alert-Ingestion-API-Documentation/>
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// name we report as `monitoring_tool`
pub const MONITORING_TOOL: &str = "Prometheus Alertmanager";

/// CRITICAL messages raise incidents in VictorOps, WARNING messages can be
/// configured to do so. INFO messages become part of the timeline only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    Info,
    Warning,
    Acknowledgement,
    Critical,
    Recovery,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Info => "INFO",
            MessageType::Warning => "WARNING",
            MessageType::Acknowledgement => "ACKNOWLEDGEMENT",
            MessageType::Critical => "CRITICAL",
            MessageType::Recovery => "RECOVERY",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown VictorOps message type `{0}`")]
pub struct UnknownMessageType(pub String);

impl FromStr for MessageType {
    type Err = UnknownMessageType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(MessageType::Info),
            "WARNING" => Ok(MessageType::Warning),
            "ACKNOWLEDGEMENT" => Ok(MessageType::Acknowledgement),
            "CRITICAL" => Ok(MessageType::Critical),
            "RECOVERY" => Ok(MessageType::Recovery),
            _ => Err(UnknownMessageType(s.to_owned())),
        }
    }
}

/// Body of an alert POST. Empty strings and missing options are left out of
/// the wire form.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AlertPost {
    pub message_type: MessageType,

    /// VictorOps uses this to identify the monitored entity, a random one is
    /// assigned if none is given
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub entity_id: String,

    /// seconds since epoch, defaults to the time the alert is received
    #[serde(default, skip_serializing_if = "is_zero")]
    pub timestamp: i64,

    /// seconds since epoch the entity entered its current state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_start_time: Option<i64>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub state_message: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub monitoring_tool: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub entity_display_name: String,

    #[serde(rename = "ack_msg", default, skip_serializing_if = "String::is_empty")]
    pub ack_message: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ack_author: String,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// The HTTP status tells success or failure, the body carries these details
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AlertResponse {
    /// "success" or "failure"
    #[serde(default)]
    pub result: String,

    /// the id passed in with the POST or the one assigned by VictorOps
    #[serde(default)]
    pub entity_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
