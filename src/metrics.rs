//! prometheus meters for the translator

use once_cell::sync::OnceCell;
use prometheus::{
	exponential_buckets, histogram_opts, opts, register_histogram_vec, register_int_counter_vec,
	HistogramVec, IntCounterVec,
};

static METRICS: OnceCell<Metrics> = OnceCell::new();

#[derive(Debug)]
/// prometheus meters registered in the default registry
pub struct Metrics {
	/// number of deserialized webhook notifications
	notifications: IntCounterVec,
	/// number of failed webhook notifications
	notification_errors: IntCounterVec,
	/// number of alert POSTs made to VictorOps
	dispatches: IntCounterVec,
	/// duration of alert POSTs to VictorOps
	dispatch_duration: HistogramVec,
}

impl Metrics {
	/// construct and register the meters once, later calls return the same
	/// instance
	pub fn global() -> Result<&'static Self, prometheus::Error> {
		METRICS.get_or_try_init(Self::new)
	}

	fn new() -> Result<Self, prometheus::Error> {
		let notifications = register_int_counter_vec!(
			opts!("received_notifications", "total number of deserialized notifications")
				.namespace("am_victorops")
				.subsystem("alertmanager_webhook"),
			&["status"]
		)?;

		let notification_errors = register_int_counter_vec!(
			opts!("failed_notifications", "notifications answered with an error status")
				.namespace("am_victorops")
				.subsystem("alertmanager_webhook"),
			&["kind"]
		)?;

		let dispatches = register_int_counter_vec!(
			opts!("dispatches_total", "total number of alert POSTs made to VictorOps")
				.namespace("am_victorops")
				.subsystem("victorops"),
			&["message_type", "outcome"]
		)?;

		let dispatch_duration = register_histogram_vec!(
			histogram_opts!(
				"dispatch_duration_seconds",
				"total time of an alert POST in seconds",
				exponential_buckets(0.01, 2., 12)?
			)
			.namespace("am_victorops")
			.subsystem("victorops"),
			&["message_type"]
		)?;

		Ok(Self { notifications, notification_errors, dispatches, dispatch_duration })
	}

	/// counts a decoded notification by its alertmanager status
	pub fn record_notification(&self, status: &str) {
		self.notifications.with_label_values(&[status]).inc();
	}

	/// counts a notification answered with an error
	pub fn record_notification_error(&self, kind: &str) {
		self.notification_errors.with_label_values(&[kind]).inc();
	}

	/// counts a finished dispatch and observes its duration
	pub fn record_dispatch(&self, message_type: &str, outcome: &str, seconds: f64) {
		self.dispatches.with_label_values(&[message_type, outcome]).inc();
		self.dispatch_duration.with_label_values(&[message_type]).observe(seconds);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn global_meters_register_once() {
		let first = Metrics::global().unwrap();
		let second = Metrics::global().unwrap();

		assert!(std::ptr::eq(first, second));

		first.record_dispatch("CRITICAL", "success", 0.2);
		let count = first.dispatches.with_label_values(&["CRITICAL", "success"]).get();
		assert!(count >= 1);
	}
}
