// self
use crate::{
	_prelude::*,
	obs::{OperationKind, RefreshEvent},
	refresh::RefreshRole,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOperation<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOperation<F> = F;

/// Span wrapped around client operations.
///
/// Every span carries `operation` and `stage`; `refresh_role` and `queue_depth` start empty
/// and are filled in once a refresh cycle tells the caller its part in it.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OperationSpan {
	/// Opens a span tagged with the operation kind and call site.
	pub fn new(kind: OperationKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"salesline_client.operation",
				operation = kind.as_str(),
				stage,
				refresh_role = tracing::field::Empty,
				queue_depth = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Records whether the caller led the refresh cycle or waited on it.
	pub fn record_refresh_role(&self, role: RefreshRole) {
		#[cfg(feature = "tracing")]
		self.span.record("refresh_role", role.as_str());
		#[cfg(not(feature = "tracing"))]
		let _ = role;
	}

	/// Records the refresh queue depth seen by the caller.
	pub fn record_queue_depth(&self, depth: usize) {
		#[cfg(feature = "tracing")]
		self.span.record("queue_depth", depth);
		#[cfg(not(feature = "tracing"))]
		let _ = depth;
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOperation<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs a refresh step inside whichever span the coordinator runs in.
pub(super) fn trace_refresh_event(event: RefreshEvent, queue_depth: usize) {
	#[cfg(feature = "tracing")]
	{
		if event.settles() {
			tracing::debug!(
				event = event.as_str(),
				released = queue_depth,
				"access token refresh settled"
			);
		} else {
			tracing::debug!(event = event.as_str(), queue_depth, "access token refresh step");
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (event, queue_depth);
	}
}
