//! Turns alertmanager notifications into VictorOps alerts and forwards them.
//!
//! A firing notification yields one alert per contained alertmanager alert,
//! sent one after another. The first failed send stops the batch, alerts sent
//! before it are not taken back. A resolved notification yields a single
//! RECOVERY alert for the whole group.
use std::{sync::Arc, time::Instant};

use chrono::{DateTime, Utc};

use crate::{
    alert::{Alert, Status, WebhookMessage},
    credentials::RoutingCredentials,
    dispatcher::Dispatch,
    error::Error,
    metrics::Metrics,
    victorops::{AlertPost, AlertResponse, MessageType, MONITORING_TOOL},
};

/// label that overrides the VictorOps message type of a firing alert
pub const MESSAGE_TYPE_LABEL: &str = "victorops_message_type";

pub const RECOVERY_STATE_MESSAGE: &str = "entity recovered";

/// What to do with a VictorOps response body that can't be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePolicy {
    /// log it, keep a warning and go on checking the status code
    Lenient,
    /// fail the request
    Strict,
}

impl DecodePolicy {
    /// firing alerts tolerate undecodable responses, recoveries don't
    pub fn for_status(status: &Status) -> Self {
        match status {
            Status::Resolved => DecodePolicy::Strict,
            _ => DecodePolicy::Lenient,
        }
    }
}

/// result of one successful send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// position of the alert in the notification, `None` for recoveries
    pub alert_index: Option<usize>,
    pub message_type: MessageType,
    pub entity_id: String,
    pub response: Option<AlertResponse>,
    /// set if the response body couldn't be decoded but the send was accepted
    pub decode_warning: Option<String>,
}

pub struct Translator {
    dispatcher: Arc<dyn Dispatch>,
}

impl Translator {
    pub fn new(dispatcher: Arc<dyn Dispatch>) -> Self {
        Self { dispatcher }
    }

    /// Translates the notification and sends the resulting alerts.
    ///
    /// # Arguments
    ///
    /// * `message` - the decoded alertmanager notification
    ///
    /// * `credentials` - VictorOps keys of the request
    pub async fn translate(
        &self,
        message: &WebhookMessage,
        credentials: &RoutingCredentials,
    ) -> Result<Vec<DispatchOutcome>, Error> {
        let alerts = message
            .alerts
            .as_deref()
            .ok_or_else(|| Error::MalformedInput("missing alerts".to_owned()))?;

        let policy = DecodePolicy::for_status(&message.status);

        match &message.status {
            Status::Firing => {
                let mut outcomes = Vec::with_capacity(alerts.len());

                for (index, alert) in alerts.iter().enumerate() {
                    let post = firing_post(message, alert, Utc::now());

                    let outcome = self
                        .deliver(post, credentials, policy, Some(index))
                        .await
                        .map_err(|source| Error::Alert {
                            index,
                            source: Box::new(source),
                        })?;

                    outcomes.push(outcome);
                }

                Ok(outcomes)
            }
            Status::Resolved => {
                let post = recovery_post(message, Utc::now());

                Ok(vec![self.deliver(post, credentials, policy, None).await?])
            }
            Status::Other(status) => Err(Error::UnknownStatus(status.clone())),
        }
    }

    /// sends one alert and interprets the answer
    async fn deliver(
        &self,
        post: AlertPost,
        credentials: &RoutingCredentials,
        policy: DecodePolicy,
        alert_index: Option<usize>,
    ) -> Result<DispatchOutcome, Error> {
        let started = Instant::now();
        let result = self.dispatch(&post, credentials, policy).await;

        if let Ok(metrics) = Metrics::global() {
            let outcome = match &result {
                Ok(_) => "success",
                Err(err) => err.kind(),
            };
            metrics.record_dispatch(
                post.message_type.as_str(),
                outcome,
                started.elapsed().as_secs_f64(),
            );
        }

        let (response, decode_warning) = result?;

        Ok(DispatchOutcome {
            alert_index,
            message_type: post.message_type,
            entity_id: post.entity_id,
            response,
            decode_warning,
        })
    }

    async fn dispatch(
        &self,
        post: &AlertPost,
        credentials: &RoutingCredentials,
        policy: DecodePolicy,
    ) -> Result<(Option<AlertResponse>, Option<String>), Error> {
        let receipt = self.dispatcher.send(post, credentials).await?;
        let status = receipt.status.as_u16();

        let (response, decode_warning) = match receipt.body {
            Ok(response) => (Some(response), None),
            Err(source) if policy == DecodePolicy::Strict => {
                return Err(Error::UndecodableResponse { status, source });
            }
            Err(err) => {
                tracing::error!(%status, "could not decode VictorOps response body: {}", err);
                (
                    None,
                    Some(format!("could not decode VictorOps response body: {err}")),
                )
            }
        };

        if !receipt.status.is_success() {
            let message = response
                .and_then(|response| response.message)
                .unwrap_or_default();

            return Err(Error::DownstreamRejected { status, message });
        }

        Ok((response, decode_warning))
    }
}

/// Builds the alert for one firing alertmanager alert.
///
/// The state message lists all annotations, then all labels, each ordered by
/// key, followed by the prometheus and alertmanager urls.
pub fn firing_post(message: &WebhookMessage, alert: &Alert, now: DateTime<Utc>) -> AlertPost {
    let message_type = match alert.labels.get(MESSAGE_TYPE_LABEL) {
        Some(value) if !value.is_empty() => value.parse::<MessageType>().unwrap_or_else(|err| {
            tracing::warn!("{}, falling back to {}", err, MessageType::Critical);
            MessageType::Critical
        }),
        _ => MessageType::Critical,
    };

    let state_message = alert
        .annotations
        .iter()
        .chain(alert.labels.iter())
        .map(|(key, value)| format!("{key}: {value}\n"))
        .chain([format!(
            "source: {}\naggregator: {}",
            alert.generator_url, message.external_url
        )])
        .collect::<String>();

    AlertPost {
        message_type,
        entity_id: message.group_key.to_string(),
        timestamp: now.timestamp(),
        state_start_time: alert.starts_at.map(|starts_at| starts_at.timestamp()),
        state_message,
        monitoring_tool: MONITORING_TOOL.to_owned(),
        entity_display_name: message.display_name(),
        ack_message: String::new(),
        ack_author: String::new(),
    }
}

/// Builds the RECOVERY alert for a resolved alert group
pub fn recovery_post(message: &WebhookMessage, now: DateTime<Utc>) -> AlertPost {
    AlertPost {
        message_type: MessageType::Recovery,
        entity_id: message.group_key.to_string(),
        timestamp: now.timestamp(),
        state_start_time: None,
        state_message: RECOVERY_STATE_MESSAGE.to_owned(),
        monitoring_tool: MONITORING_TOOL.to_owned(),
        entity_display_name: message.display_name(),
        ack_message: String::new(),
        ack_author: String::new(),
    }
}
