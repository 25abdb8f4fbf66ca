//! HTTP endpoint receiving alertmanager webhooks and answering with the outcome
//! of forwarding them to VictorOps.
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Extension, Json, RawQuery},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;

use crate::{
    alert::WebhookMessage,
    credentials::RoutingCredentials,
    error::Error,
    metrics::Metrics,
    settings::Settings,
    translator::{DispatchOutcome, Translator},
};

#[derive(Debug, Deserialize, Clone)]
pub struct AlertReceiverSettings {
    pub bind_address: IpAddr,
    pub port: u16,
    /// path alertmanager posts to
    pub route: String,
}

impl AlertReceiverSettings {
    pub fn global() -> &'static Self {
        &Settings::global().webhook_receiver
    }

    pub fn to_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

struct State {
    translator: Translator,
    metrics: &'static Metrics,
}

async fn victorops_receiver(
    Extension(state): Extension<Arc<State>>,
    RawQuery(query): RawQuery,
    message: Result<Json<WebhookMessage>, JsonRejection>,
) -> Response {
    tracing::debug!("received VictorOps translation request");

    match handle(&state, query.as_deref(), message).await {
        Ok(outcomes) => {
            tracing::info!(
                dispatches = outcomes.len(),
                "forwarded notification to VictorOps"
            );

            // undecodable VictorOps answers of accepted alerts are reported
            // back but don't fail the request
            let warnings = outcomes
                .iter()
                .filter_map(|outcome| outcome.decode_warning.as_deref())
                .collect::<Vec<_>>()
                .join("\n");

            (StatusCode::OK, warnings).into_response()
        }
        Err(err) => {
            tracing::error!("{}", err);
            state.metrics.record_notification_error(err.kind());

            err.into_response()
        }
    }
}

/// decode, validate, extract credentials, translate
async fn handle(
    state: &State,
    query: Option<&str>,
    message: Result<Json<WebhookMessage>, JsonRejection>,
) -> Result<Vec<DispatchOutcome>, Error> {
    let Json(message) =
        message.map_err(|rejection| Error::MalformedInput(rejection.to_string()))?;

    state.metrics.record_notification(message.status.metric_label());

    if message.alerts.is_none() {
        return Err(Error::MalformedInput("missing alerts".to_owned()));
    }

    let credentials = RoutingCredentials::from_query(query)?;

    state.translator.translate(&message, &credentials).await
}

/// The route table: the translator mounted on `route`.
pub fn router(route: &str, translator: Translator) -> Result<Router> {
    if !route.starts_with('/') {
        bail!("webhook route {route} must start with a '/'");
    }

    let state = Arc::new(State {
        translator,
        metrics: Metrics::global().context("failed to register metrics")?,
    });

    Ok(Router::new()
        .route(route, post(victorops_receiver))
        .layer(Extension(state)))
}

pub async fn run_webhook_receiver(
    settings: &AlertReceiverSettings,
    translator: Translator,
) -> Result<()> {
    let app = router(&settings.route, translator)?;
    let addr = settings.to_socket_addr();

    tracing::info!(%addr, route = %settings.route, "alertmanager webhook endpoint listening");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .context("alertmanager webhook endpoint crashed")?;

    Ok(())
}
