//! Single-flight access-token refresh with a FIFO wait queue.
//!
//! [`RefreshCoordinator`] owns the in-flight flag and the queue of callers waiting on it. The
//! first caller to observe an expired token becomes the leader and performs the refresh; every
//! caller arriving while that refresh is outstanding joins the queue and is resumed, in enqueue
//! order, with the leader's outcome. The queue lock is synchronous and is never held across an
//! `.await`, so the flag and the queue always change together.

mod metrics;

pub use metrics::{RefreshMetrics, RefreshStats};

// std
use std::mem;
// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	api,
	auth::AccessToken,
	http::ApiResponse,
	obs::RefreshEvent,
};

const NO_CREDENTIAL_STATUS: u16 = 425;

/// Outcome shared with every caller of a refresh cycle.
pub type RefreshOutcome = Result<AccessToken, RefreshError>;

/// Refresh-layer failure, cloned to every caller waiting on the same cycle.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// Refresh endpoint was reachable but rejected the credential (or returned no token).
	#[error("REFRESH_INVALID: the refresh credential was rejected (HTTP {status}).")]
	Invalid {
		/// HTTP status of the refresh response.
		status: u16,
	},
	/// No refresh credential was presented at all.
	#[error("NO_REFRESH: no refresh credential is available.")]
	NoCredential,
	/// Refresh did not settle within the configured timeout.
	#[error("REFRESH_TIMEOUT: the refresh call did not settle within {after}.")]
	TimedOut {
		/// Configured bound that was exceeded.
		after: Duration,
	},
	/// Refresh endpoint could not be reached.
	#[error("REFRESH_TRANSPORT: {message}")]
	Transport {
		/// Rendered transport failure.
		message: String,
	},
	/// The leading refresh was cancelled before it settled.
	#[error("REFRESH_ABANDONED: the in-flight refresh was cancelled before it settled.")]
	Abandoned,
}
impl RefreshError {
	/// Returns the stable error code.
	pub const fn code(&self) -> &'static str {
		match self {
			Self::Invalid { .. } => "REFRESH_INVALID",
			Self::NoCredential => "NO_REFRESH",
			Self::TimedOut { .. } => "REFRESH_TIMEOUT",
			Self::Transport { .. } => "REFRESH_TRANSPORT",
			Self::Abandoned => "REFRESH_ABANDONED",
		}
	}
}

/// How a caller took part in a refresh cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshRole {
	/// The caller issued the refresh call.
	Leader {
		/// Waiters resumed with this caller's outcome.
		released: usize,
	},
	/// The caller waited on a refresh started by someone else.
	Follower {
		/// Place in the queue when the caller joined, starting at 1.
		position: usize,
	},
}
impl RefreshRole {
	/// Returns a stable label suitable for span fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Leader { .. } => "leader",
			Self::Follower { .. } => "follower",
		}
	}

	/// Returns `true` for the caller that issued the refresh call.
	pub const fn is_leader(self) -> bool {
		matches!(self, Self::Leader { .. })
	}

	/// Queue depth this caller saw: its place in line, or how many waiters it released.
	pub const fn queue_depth(self) -> usize {
		match self {
			Self::Leader { released } => released,
			Self::Follower { position } => position,
		}
	}
}

#[derive(Debug, Default)]
struct RefreshState {
	in_flight: bool,
	waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Owned single-flight state shared by every clone of a client.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
	metrics: RefreshMetrics,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns `true` while a refresh call is outstanding.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().in_flight
	}

	/// Number of callers currently queued behind the in-flight refresh.
	pub fn pending(&self) -> usize {
		self.state.lock().waiters.len()
	}

	/// Refresh counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Runs `refresh` unless a refresh is already in flight, in which case the caller waits for
	/// that one instead.
	///
	/// The leader's outcome is delivered to queued callers in the order they joined, and the
	/// flag is cleared in the same critical section that takes the queue, so a caller arriving
	/// afterwards starts a new cycle rather than joining a settled one. If the leader's future is
	/// dropped before `refresh` completes, queued callers receive [`RefreshError::Abandoned`].
	pub async fn run<F, Fut>(&self, refresh: F) -> (RefreshRole, RefreshOutcome)
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = RefreshOutcome>,
	{
		let waiter = {
			let mut state = self.state.lock();

			if state.in_flight {
				let (tx, rx) = oneshot::channel();

				state.waiters.push(tx);

				Some((rx, state.waiters.len()))
			} else {
				state.in_flight = true;

				None
			}
		};

		if let Some((rx, position)) = waiter {
			self.metrics.record(RefreshEvent::Joined, position);

			let outcome = rx.await.unwrap_or(Err(RefreshError::Abandoned));

			return (RefreshRole::Follower { position }, outcome);
		}

		self.metrics.record(RefreshEvent::Started, 0);

		let settle = SettleGuard { coordinator: self, settled: false };
		let outcome = refresh().await;

		let released = settle.settle(&outcome);

		(RefreshRole::Leader { released }, outcome)
	}

	fn drain(&self, outcome: &RefreshOutcome) -> usize {
		let waiters = {
			let mut state = self.state.lock();

			state.in_flight = false;

			mem::take(&mut state.waiters)
		};

		let event = if outcome.is_ok() { RefreshEvent::Succeeded } else { RefreshEvent::Failed };

		let released = waiters.len();

		self.metrics.record(event, released);

		for waiter in waiters {
			// A waiter whose caller gave up has dropped its receiver.
			let _ = waiter.send(outcome.clone());
		}

		released
	}
}

/// Settles the cycle even when the leader is cancelled mid-refresh.
struct SettleGuard<'a> {
	coordinator: &'a RefreshCoordinator,
	settled: bool,
}
impl SettleGuard<'_> {
	fn settle(mut self, outcome: &RefreshOutcome) -> usize {
		self.settled = true;

		self.coordinator.drain(outcome)
	}
}
impl Drop for SettleGuard<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.coordinator.drain(&Err(RefreshError::Abandoned));
		}
	}
}

#[derive(Debug, Default, Deserialize)]
struct RefreshEnvelope {
	#[serde(default)]
	token: Option<String>,
	#[serde(default)]
	status: Option<serde_json::Value>,
}

/// Interprets a refresh endpoint response.
///
/// A 2xx body carrying a non-empty `token` is the only success. A `status` of `"425"` (string or
/// number), or an HTTP 425, means no refresh credential was presented; every other shape,
/// including non-JSON bodies, is a rejected credential.
pub fn token_from_response(response: &ApiResponse) -> RefreshOutcome {
	let envelope: RefreshEnvelope = serde_json::from_slice(response.body()).unwrap_or_default();

	if response.is_success()
		&& let Some(token) = envelope.token.filter(|token| !token.is_empty())
	{
		return Ok(AccessToken::new(token));
	}

	let no_credential = response.status() == NO_CREDENTIAL_STATUS
		|| api::body_status_is(envelope.status.as_ref(), NO_CREDENTIAL_STATUS);

	if no_credential {
		Err(RefreshError::NoCredential)
	} else {
		Err(RefreshError::Invalid { status: response.status() })
	}
}
