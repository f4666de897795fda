//! Thread-safe in-memory session for services, tests, and demos.

// std
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, SessionHooks},
};

/// Keeps the access token in process memory and tracks logout signals.
///
/// `on_logout` clears the token and marks the session as expired so callers can route the user
/// back to the login screen.
#[derive(Debug, Default)]
pub struct MemorySession {
	token: RwLock<Option<AccessToken>>,
	expired: AtomicBool,
	logouts: AtomicU64,
}
impl MemorySession {
	/// Creates a session seeded with an access token (e.g. restored from a previous login).
	pub fn with_token(token: impl Into<AccessToken>) -> Self {
		Self { token: RwLock::new(Some(token.into())), ..Default::default() }
	}

	/// Returns `true` once an unrecoverable authorization failure ended the session.
	pub fn session_expired(&self) -> bool {
		self.expired.load(Ordering::Acquire)
	}

	/// Returns how many times the logout callback fired.
	pub fn logout_count(&self) -> u64 {
		self.logouts.load(Ordering::Acquire)
	}

	pub(crate) fn replace(&self, token: Option<AccessToken>) {
		*self.token.write() = token;
	}
}
impl SessionHooks for MemorySession {
	fn access_token(&self) -> Option<AccessToken> {
		self.token.read().clone()
	}

	fn set_access_token(&self, token: AccessToken) {
		self.replace(Some(token));
		self.expired.store(false, Ordering::Release);
	}

	fn clear_access_token(&self) {
		self.replace(None);
	}

	fn on_logout(&self) {
		self.replace(None);
		self.expired.store(true, Ordering::Release);
		self.logouts.fetch_add(1, Ordering::AcqRel);
	}
}
