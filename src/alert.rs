//! data structures for deserializing incoming alertmanager webhooks
use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// label and annotation sets. Ordered so that everything rendered from them
/// comes out sorted by key
pub type KV = BTreeMap<String, String>;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
/// notification sent by the alertmanager webhook receiver for one alert group
pub struct WebhookMessage {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub group_key: GroupKey,
    #[serde(default)]
    pub receiver: String,
    pub status: Status,
    /// `None` if the field was `null` or missing
    #[serde(default)]
    pub alerts: Option<Vec<Alert>>,
    #[serde(default)]
    pub group_labels: KV,
    #[serde(default)]
    pub common_labels: KV,
    #[serde(default)]
    pub common_annotations: KV,
    #[serde(rename = "externalURL", default)]
    pub external_url: String,
    #[serde(default)]
    pub truncated_alerts: u64,
}

impl WebhookMessage {
    /// the group label values ordered by label name and joined with `:`
    pub fn display_name(&self) -> String {
        self.group_labels
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(":")
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub labels: KV,
    #[serde(default)]
    pub annotations: KV,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(rename = "generatorURL", default)]
    pub generator_url: String,
    #[serde(default)]
    pub fingerprint: String,
}

/// state of the alert group
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Firing,
    Resolved,
    Other(String),
}

impl From<String> for Status {
    fn from(status: String) -> Self {
        match status.as_str() {
            "firing" => Status::Firing,
            "resolved" => Status::Resolved,
            _ => Status::Other(status),
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Firing => "firing".to_owned(),
            Status::Resolved => "resolved".to_owned(),
            Status::Other(status) => status,
        }
    }
}

impl Status {
    /// label value for metrics, anything unknown is collapsed into `other`
    pub fn metric_label(&self) -> &'static str {
        match self {
            Status::Firing => "firing",
            Status::Resolved => "resolved",
            Status::Other(_) => "other",
        }
    }
}

/// Identifies the alert group. Older alertmanager releases send an unsigned
/// integer, newer ones an opaque string.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    Numeric(u64),
    Opaque(String),
}

impl Default for GroupKey {
    fn default() -> Self {
        GroupKey::Opaque(String::new())
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Numeric(key) => write!(f, "{key}"),
            GroupKey::Opaque(key) => f.write_str(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_alertmanager_payload() {
        let message: WebhookMessage = serde_json::from_value(json!({
            "version": "4",
            "groupKey": 8347198,
            "receiver": "victorops",
            "status": "firing",
            "groupLabels": {"job": "node", "alertname": "InstanceDown"},
            "externalURL": "http://alertmanager:9093",
            "alerts": [{
                "status": "firing",
                "labels": {"instance": "db-1"},
                "annotations": {"summary": "db-1 is down"},
                "startsAt": "2022-05-01T10:00:00Z",
                "endsAt": "0001-01-01T00:00:00Z",
                "generatorURL": "http://prometheus:9090/graph"
            }]
        }))
        .unwrap();

        assert_eq!(message.status, Status::Firing);
        assert_eq!(message.group_key.to_string(), "8347198");
        assert_eq!(message.display_name(), "InstanceDown:node");

        let alerts = message.alerts.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].generator_url, "http://prometheus:9090/graph");
        assert_eq!(alerts[0].starts_at.unwrap().timestamp(), 1651399200);
    }

    #[test]
    fn null_and_missing_alerts_decode_to_none() {
        let null: WebhookMessage =
            serde_json::from_value(json!({"status": "resolved", "alerts": null})).unwrap();
        let missing: WebhookMessage =
            serde_json::from_value(json!({"status": "resolved"})).unwrap();

        assert!(null.alerts.is_none());
        assert!(missing.alerts.is_none());
    }

    #[test]
    fn string_group_keys_are_kept_verbatim() {
        let message: WebhookMessage = serde_json::from_value(json!({
            "status": "resolved",
            "groupKey": "{}:{alertname=\"InstanceDown\"}",
            "alerts": []
        }))
        .unwrap();

        assert_eq!(message.group_key.to_string(), "{}:{alertname=\"InstanceDown\"}");
    }

    #[test]
    fn unknown_status_is_preserved() {
        let message: WebhookMessage =
            serde_json::from_value(json!({"status": "pending", "alerts": []})).unwrap();

        assert_eq!(message.status, Status::Other("pending".to_owned()));
        assert_eq!(String::from(message.status), "pending");
    }

    #[test]
    fn unknown_statuses_share_one_metric_label() {
        let junk = Status::from("junk-a".to_owned());
        let other_junk = Status::from("junk-b".to_owned());

        assert_eq!(junk.metric_label(), "other");
        assert_eq!(other_junk.metric_label(), junk.metric_label());
        assert_eq!(Status::Firing.metric_label(), "firing");
        assert_eq!(Status::Resolved.metric_label(), "resolved");
    }

    #[test]
    fn missing_status_is_rejected() {
        assert!(serde_json::from_value::<WebhookMessage>(json!({"alerts": []})).is_err());
    }
}
