//! Typed backend endpoints layered over [`AuthenticatedClient`].

pub mod agents;
pub mod dashboard;
pub mod packages;
pub mod registration;
pub mod session;
pub mod users;

pub use agents::*;
pub use dashboard::*;
pub use packages::*;
pub use registration::*;
pub use session::*;
pub use users::*;

// self
use crate::{client::AuthenticatedClient, error::Error, http::HttpTransport};

impl<T> AuthenticatedClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Login, logout, and profile endpoints.
	pub fn session(&self) -> SessionApi<'_, T> {
		SessionApi { client: self }
	}

	/// Sign-up and availability checks.
	pub fn registration(&self) -> RegistrationApi<'_, T> {
		RegistrationApi { client: self }
	}

	/// Admin package management endpoints.
	pub fn packages(&self) -> PackagesApi<'_, T> {
		PackagesApi { client: self }
	}

	/// Admin account management endpoints.
	pub fn users(&self) -> UsersApi<'_, T> {
		UsersApi { client: self }
	}

	/// Calling agent, campaign, and call queue endpoints.
	pub fn agents(&self) -> AgentsApi<'_, T> {
		AgentsApi { client: self }
	}
}

/// Matches the backend's in-body `status` field, which arrives as a string or a number.
pub(crate) fn body_status_is(status: Option<&serde_json::Value>, code: u16) -> bool {
	match status {
		Some(serde_json::Value::String(status)) => status.trim() == code.to_string(),
		Some(serde_json::Value::Number(status)) => status.as_u64() == Some(u64::from(code)),
		_ => false,
	}
}

/// Rejects a 2xx envelope whose `success` flag is explicitly `false`.
///
/// An absent flag counts as success; the backend omits it on several endpoints.
pub(crate) fn ensure_success(
	success: Option<bool>,
	message: Option<String>,
	what: &str,
) -> Result<(), Error> {
	if success != Some(false) {
		return Ok(());
	}

	let reason = message
		.filter(|message| !message.trim().is_empty())
		.unwrap_or_else(|| format!("{what} reported failure"));

	Err(Error::UnexpectedResponse { reason })
}
