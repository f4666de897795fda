// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::obs::{self, RefreshEvent};

/// Point-in-time copy of a coordinator's [`RefreshMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshStats {
	/// Refresh calls actually issued.
	pub attempts: u64,
	/// Callers that waited on an in-flight refresh instead of starting one.
	pub joined: u64,
	/// Refresh calls that produced a token.
	pub successes: u64,
	/// Refresh calls that failed, timed out, or were abandoned.
	pub failures: u64,
}

/// Lock-free counters kept by a [`RefreshCoordinator`](super::RefreshCoordinator).
///
/// Indexed by [`RefreshEvent`]. Each step is also handed to [`obs::record_refresh_event`], which
/// feeds the global recorders when the `metrics` or `tracing` features are on.
#[derive(Debug, Default)]
pub struct RefreshMetrics([AtomicU64; 4]);
impl RefreshMetrics {
	/// Reads every counter.
	pub fn snapshot(&self) -> RefreshStats {
		let [attempts, joined, successes, failures] =
			self.0.each_ref().map(|counter| counter.load(Ordering::Relaxed));

		RefreshStats { attempts, joined, successes, failures }
	}

	pub(crate) fn record(&self, event: RefreshEvent, queue_depth: usize) {
		let slot = match event {
			RefreshEvent::Started => 0,
			RefreshEvent::Joined => 1,
			RefreshEvent::Succeeded => 2,
			RefreshEvent::Failed => 3,
		};

		self.0[slot].fetch_add(1, Ordering::Relaxed);

		obs::record_refresh_event(event, queue_depth);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn snapshot_reports_each_event_separately() {
		let metrics = RefreshMetrics::default();

		metrics.record(RefreshEvent::Started, 0);
		metrics.record(RefreshEvent::Joined, 1);
		metrics.record(RefreshEvent::Joined, 2);
		metrics.record(RefreshEvent::Failed, 2);

		assert_eq!(
			metrics.snapshot(),
			RefreshStats { attempts: 1, joined: 2, successes: 0, failures: 1 }
		);
	}
}
