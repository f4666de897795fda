//! Self-service sign-up and its availability checks.

// self
use crate::{
	_prelude::*,
	client::AuthenticatedClient,
	error::ValidationError,
	http::{ApiRequest, HttpTransport},
};

/// Path of the username availability check.
pub const USERNAME_EXISTS_PATH: &str = "/api/auth/user-name-exist/";
/// Path of the email availability check.
pub const EMAIL_EXISTS_PATH: &str = "/api/auth/user-email-exist/";
/// Path of the registration endpoint.
pub const REGISTER_PATH: &str = "/api/auth/register/";
/// Shortest password the sign-up form accepts.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Sign-up form contents.
#[derive(Clone, PartialEq, Eq)]
pub struct Registration {
	/// Public handle.
	pub username: String,
	/// Login email; a verification mail is sent here.
	pub email: String,
	/// Chosen password.
	pub password: String,
}
impl Registration {
	/// Checks the form locally: every field filled, password long enough.
	pub fn validate(&self) -> Result<(), ValidationError> {
		if self.username.trim().is_empty() {
			return Err(ValidationError::new("username", "must not be empty"));
		}
		if self.email.trim().is_empty() {
			return Err(ValidationError::new("email", "must not be empty"));
		}
		if self.password.is_empty() {
			return Err(ValidationError::new("password", "must not be empty"));
		}
		if self.password.chars().count() < MIN_PASSWORD_LEN {
			return Err(ValidationError::new("password", "must be at least 8 characters long"));
		}

		Ok(())
	}
}
impl Debug for Registration {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Registration")
			.field("username", &self.username)
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

#[derive(Serialize)]
struct UsernameQuery<'a> {
	user_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct UsernameReply {
	#[serde(default)]
	user_name_exists: bool,
}

#[derive(Serialize)]
struct EmailQuery<'a> {
	email_exist: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmailReply {
	#[serde(default)]
	email_exist: bool,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
	user_name: &'a str,
	email: &'a str,
	password: &'a str,
}

/// Registration endpoints bound to a client.
#[derive(Debug)]
pub struct RegistrationApi<'a, T>
where
	T: ?Sized + HttpTransport,
{
	pub(crate) client: &'a AuthenticatedClient<T>,
}
impl<T> RegistrationApi<'_, T>
where
	T: ?Sized + HttpTransport,
{
	/// Returns `true` when nobody holds `username` yet.
	pub async fn username_available(&self, username: &str) -> Result<bool> {
		let username = username.trim();

		if username.is_empty() {
			return Err(ValidationError::new("username", "must not be empty").into());
		}

		let reply: UsernameReply = self
			.client
			.post_json(USERNAME_EXISTS_PATH, &UsernameQuery { user_name: username })
			.await?;

		Ok(!reply.user_name_exists)
	}

	/// Returns `true` when no account uses `email` yet.
	pub async fn email_available(&self, email: &str) -> Result<bool> {
		let email = email.trim();

		if email.is_empty() {
			return Err(ValidationError::new("email", "must not be empty").into());
		}

		let reply: EmailReply =
			self.client.post_json(EMAIL_EXISTS_PATH, &EmailQuery { email_exist: email }).await?;

		Ok(!reply.email_exist)
	}

	/// Creates an account; the backend then mails a verification link.
	///
	/// The form is validated locally and the username is checked for availability before the
	/// registration call, so a taken name fails with a validation error and nothing is created.
	pub async fn register(&self, registration: &Registration) -> Result<()> {
		registration.validate()?;

		let username = registration.username.trim();

		if !self.username_available(username).await? {
			return Err(ValidationError::new("username", "is already taken").into());
		}

		let request = ApiRequest::post(REGISTER_PATH).with_json(&RegisterRequest {
			user_name: username,
			email: registration.email.trim(),
			password: &registration.password,
		})?;

		self.client.request(request).await?;

		#[cfg(feature = "tracing")]
		tracing::info!(username, "account registered; verification pending");

		Ok(())
	}
}
