//! Optional observability helpers for client operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `salesline_client.operation` with the
//!   `operation` and `stage` fields. Refresh spans also carry `refresh_role` (leader or
//!   follower) and `queue_depth`, and every refresh coordination step is logged at debug level.
//! - Enable `metrics` to increment the `salesline_client_operation_total` counter for every
//!   attempt/success/failure, labeled by `operation` + `outcome`, the
//!   `salesline_client_refresh_events_total` counter labeled by `event`, and the
//!   `salesline_client_refresh_queue_depth` gauge.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Authenticated backend request, including any replay after a refresh.
	Request,
	/// Access-token refresh call.
	Refresh,
	/// Package subscription checkout.
	Checkout,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Request => "request",
			OperationKind::Refresh => "refresh",
			OperationKind::Checkout => "checkout",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Entry to a client operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OperationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Attempt => "attempt",
			OperationOutcome::Success => "success",
			OperationOutcome::Failure => "failure",
		}
	}

	/// Maps a result onto its terminal outcome.
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { Self::Success } else { Self::Failure }
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Step of a single-flight refresh cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshEvent {
	/// A caller became leader and issued the refresh call.
	Started,
	/// A caller queued behind the in-flight refresh.
	Joined,
	/// The cycle produced a token.
	Succeeded,
	/// The cycle failed, timed out, or was abandoned.
	Failed,
}
impl RefreshEvent {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Started => "started",
			Self::Joined => "joined",
			Self::Succeeded => "succeeded",
			Self::Failed => "failed",
		}
	}

	/// Returns `true` for the events that settle a cycle and empty its queue.
	pub const fn settles(self) -> bool {
		matches!(self, Self::Succeeded | Self::Failed)
	}
}
impl Display for RefreshEvent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Reports a refresh coordination step to every enabled sink.
///
/// `queue_depth` is the caller's place in the queue for [`RefreshEvent::Joined`] and the number
/// of released waiters for settling events.
pub fn record_refresh_event(event: RefreshEvent, queue_depth: usize) {
	self::metrics::count_refresh_event(event, queue_depth);
	self::tracing::trace_refresh_event(event, queue_depth);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn only_terminal_refresh_events_settle() {
		assert!(RefreshEvent::Succeeded.settles());
		assert!(RefreshEvent::Failed.settles());
		assert!(!RefreshEvent::Started.settles());
		assert!(!RefreshEvent::Joined.settles());
		assert_eq!(RefreshEvent::Joined.to_string(), "joined");
	}
}
