//! Here we expose prometheus metrics about the translator
use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use axum::{
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;

use crate::settings::Settings;

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryEndpointSettings {
    pub bind_address: IpAddr,
    pub port: u16,
}

impl TelemetryEndpointSettings {
    pub fn global() -> &'static Self {
        &Settings::global().telemetry_endpoint
    }

    pub fn to_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

async fn metrics_handler() -> Response {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => ([(CONTENT_TYPE, encoder.format_type().to_owned())], buffer).into_response(),
        Err(err) => {
            tracing::error!("failed to encode metrics: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

pub fn telemetry_router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_telemetry_endpoint(settings: &TelemetryEndpointSettings) -> Result<()> {
    axum::Server::bind(&settings.to_socket_addr())
        .serve(telemetry_router().into_make_service())
        .await
        .context("telemetry endpoint crashed")?;

    Ok(())
}
