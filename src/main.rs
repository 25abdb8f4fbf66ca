use std::sync::Arc;

use am_victorops::{
	alertmanager_webhook_receiver::{self, AlertReceiverSettings},
	dispatcher::{HttpDispatcher, VictorOpsSettings},
	log::{self, LogSettings},
	telemetry_endpoint::{self, TelemetryEndpointSettings},
	translator::Translator,
};
use anyhow::{Context, Result};

/// exit the complete program if one thread panics
fn setup_panic_handler() {
	let default_panic = std::panic::take_hook();
	std::panic::set_hook(Box::new(move |info| {
		default_panic(info);
		std::process::exit(1);
	}));
}

/// the entry point of the program
#[tokio::main]
pub async fn main() -> Result<()> {
	setup_panic_handler();

	log::setup_logging(LogSettings::global()).context("could not setup logging")?;

	let dispatcher = HttpDispatcher::new(VictorOpsSettings::global())
		.context("failed to construct VictorOps dispatcher")?;
	let translator = Translator::new(Arc::new(dispatcher));

	tokio::spawn(async move {
		#[allow(clippy::expect_used)]
		alertmanager_webhook_receiver::run_webhook_receiver(
			AlertReceiverSettings::global(),
			translator,
		)
		.await
		.expect("alertmanager webhook endpoint failed to start or crashed");
	});

	telemetry_endpoint::run_telemetry_endpoint(TelemetryEndpointSettings::global()).await
}
