//! Session hooks injected into every client instance.

// self
use crate::{_prelude::*, auth::AccessToken};

/// Decouples the HTTP layer from whatever holds authentication state.
///
/// The client reads the token through [`SessionHooks::access_token`] on every send, so a token
/// replaced after construction is picked up by the next request. Implementations must be cheap
/// and must not block: they are called between network round trips, never across them.
pub trait SessionHooks
where
	Self: Send + Sync,
{
	/// Returns the token that should authorize the next request, if any.
	fn access_token(&self) -> Option<AccessToken>;

	/// Stores a token issued by login or by a successful refresh.
	fn set_access_token(&self, token: AccessToken);

	/// Drops the current token without signalling an expired session (explicit logout).
	fn clear_access_token(&self);

	/// Invoked once per unrecoverable authorization failure: a failed refresh cycle or a
	/// request rejected again after its single retry.
	fn on_logout(&self);
}
impl<H> SessionHooks for Arc<H>
where
	H: ?Sized + SessionHooks,
{
	fn access_token(&self) -> Option<AccessToken> {
		(**self).access_token()
	}

	fn set_access_token(&self, token: AccessToken) {
		(**self).set_access_token(token)
	}

	fn clear_access_token(&self) {
		(**self).clear_access_token()
	}

	fn on_logout(&self) {
		(**self).on_logout()
	}
}
