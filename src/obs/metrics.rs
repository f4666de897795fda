// self
use crate::obs::{OperationKind, OperationOutcome, RefreshEvent};

/// Counter of client operations, labeled by `operation` and `outcome`.
pub const OPERATION_TOTAL: &str = "salesline_client_operation_total";
/// Counter of refresh coordination steps, labeled by `event`.
pub const REFRESH_EVENTS_TOTAL: &str = "salesline_client_refresh_events_total";
/// Gauge of callers queued behind the in-flight refresh.
pub const REFRESH_QUEUE_DEPTH: &str = "salesline_client_refresh_queue_depth";

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_operation_outcome(kind: OperationKind, outcome: OperationOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(OPERATION_TOTAL, "operation" => kind.as_str(), "outcome" => outcome.as_str())
		.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

pub(super) fn count_refresh_event(event: RefreshEvent, queue_depth: usize) {
	let depth = queue_depth_after(event, queue_depth);

	#[cfg(feature = "metrics")]
	{
		metrics::counter!(REFRESH_EVENTS_TOTAL, "event" => event.as_str()).increment(1);
		metrics::gauge!(REFRESH_QUEUE_DEPTH).set(depth as f64);
	}
	#[cfg(not(feature = "metrics"))]
	let _ = depth;
}

/// Queue length left behind by `event`: a settled cycle hands its outcome to every waiter.
fn queue_depth_after(event: RefreshEvent, queue_depth: usize) -> usize {
	match event {
		RefreshEvent::Joined => queue_depth,
		RefreshEvent::Started | RefreshEvent::Succeeded | RefreshEvent::Failed => 0,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn settled_cycles_empty_the_queue_gauge() {
		assert_eq!(queue_depth_after(RefreshEvent::Joined, 3), 3);
		assert_eq!(queue_depth_after(RefreshEvent::Succeeded, 3), 0);
		assert_eq!(queue_depth_after(RefreshEvent::Failed, 5), 0);
		assert_eq!(queue_depth_after(RefreshEvent::Started, 2), 0);
	}

	#[test]
	fn recording_without_a_recorder_is_silent() {
		record_operation_outcome(OperationKind::Checkout, OperationOutcome::Failure);
		count_refresh_event(RefreshEvent::Joined, 1);
	}
}
