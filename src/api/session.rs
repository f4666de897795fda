//! Login, logout, and current-user endpoints.

// self
use crate::{
	_prelude::*,
	api,
	auth::AccessToken,
	client::AuthenticatedClient,
	error::ValidationError,
	http::{ApiRequest, HttpTransport},
};

/// Path of the login endpoint.
pub const LOGIN_PATH: &str = "/api/auth/login/";
/// Path of the logout endpoint.
pub const LOGOUT_PATH: &str = "/api/auth/logout/";
/// Path of the current-user endpoint.
pub const USER_DATA_PATH: &str = "/api/accounts/users/data/";

const INVALID_CREDENTIALS_STATUS: u16 = 402;

/// Account role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	/// Platform administrator.
	Admin,
	/// Subscriber.
	User,
}

/// Subscription lifecycle state reported for a subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
	/// Paid and usable.
	Active,
	/// Never activated or paused.
	Inactive,
	/// Lapsed.
	Expired,
}

/// Authenticated user as returned by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	/// Display name.
	pub name: String,
	/// Login email.
	pub email: String,
	/// Account role.
	pub role: Role,
	/// Whether the user holds a subscription.
	#[serde(default)]
	pub has_subscription: bool,
	/// Subscription state, when known.
	#[serde(default)]
	pub subscription_status: Option<SubscriptionStatus>,
}

/// Subscription summary for the signed-in user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubscriptionInfo {
	/// Whether the user holds a subscription.
	pub has_subscription: bool,
	/// Subscription state, when known.
	pub subscription_status: Option<SubscriptionStatus>,
}

/// Where a freshly signed-in user should be sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LandingRoute {
	/// Admin console.
	AdminDashboard,
	/// Subscriber dashboard.
	Dashboard,
	/// Package selection, for users without an active subscription.
	PackageSelection,
}
impl LandingRoute {
	/// Application path of the route.
	pub const fn path(self) -> &'static str {
		match self {
			Self::AdminDashboard => "/admin/dashboard",
			Self::Dashboard => "/dashboard",
			Self::PackageSelection => "/usersubscription",
		}
	}
}

/// Picks the post-login destination for `profile`.
pub fn landing_route(profile: &UserProfile) -> LandingRoute {
	match profile.role {
		Role::Admin => LandingRoute::AdminDashboard,
		Role::User
			if profile.has_subscription
				&& profile.subscription_status == Some(SubscriptionStatus::Active) =>
			LandingRoute::Dashboard,
		Role::User => LandingRoute::PackageSelection,
	}
}

/// Outcome of the role guard in front of a protected page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouteAccess {
	/// No access token; send the visitor to the login page.
	SignIn,
	/// Token present but the profile has not been loaded yet.
	Loading,
	/// Signed in with a role the page does not admit; send the user to their own dashboard.
	Redirect(LandingRoute),
	/// The page may render.
	Granted,
}
impl RouteAccess {
	/// Path to navigate to, or `None` when the page should stay put.
	pub const fn redirect_path(self) -> Option<&'static str> {
		match self {
			Self::SignIn => Some(LOGIN_ROUTE),
			Self::Redirect(route) => Some(route.path()),
			Self::Loading | Self::Granted => None,
		}
	}
}

/// Application path of the login page.
pub const LOGIN_ROUTE: &str = "/login";
/// Roles admitted by admin-only pages.
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];
/// Roles admitted by subscriber-only pages.
pub const USER_ONLY: &[Role] = &[Role::User];
/// Roles admitted by pages open to any signed-in account.
pub const ANY_ROLE: &[Role] = &[Role::Admin, Role::User];

/// Decides whether a protected page admitting `allowed` may render.
///
/// A disallowed admin lands on the admin console and a disallowed subscriber on the
/// subscriber dashboard, regardless of subscription state.
pub fn route_access(
	has_token: bool,
	profile: Option<&UserProfile>,
	allowed: &[Role],
) -> RouteAccess {
	let Some(profile) = profile.filter(|_| has_token) else {
		return if has_token { RouteAccess::Loading } else { RouteAccess::SignIn };
	};

	if allowed.contains(&profile.role) {
		return RouteAccess::Granted;
	}

	match profile.role {
		Role::Admin => RouteAccess::Redirect(LandingRoute::AdminDashboard),
		Role::User => RouteAccess::Redirect(LandingRoute::Dashboard),
	}
}

#[derive(Serialize)]
struct LoginRequest<'a> {
	email: &'a str,
	password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginReply {
	#[serde(default)]
	tokens: Option<LoginTokens>,
	#[serde(default)]
	user: Option<UserProfile>,
	#[serde(default)]
	status: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct LoginTokens {
	#[serde(default)]
	access: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionReply {
	#[serde(default)]
	has_subscription: bool,
	#[serde(default)]
	subscription_status: Option<SubscriptionStatus>,
}

/// Session endpoints bound to a client.
#[derive(Debug)]
pub struct SessionApi<'a, T>
where
	T: ?Sized + HttpTransport,
{
	pub(crate) client: &'a AuthenticatedClient<T>,
}
impl<T> SessionApi<'_, T>
where
	T: ?Sized + HttpTransport,
{
	/// Signs in with email and password.
	///
	/// On success the access token is handed to the session hooks (the refresh credential
	/// arrives as a cookie on the transport) and the profile is returned, enriched with the
	/// subscription summary for non-admin users.
	///
	/// A subscription lookup that fails for any reason other than authentication falls back to
	/// the empty summary. If the lookup ends the session (refresh failure, or a 401 on the
	/// replayed call) that error is returned instead, since the token is already gone.
	pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
		if email.trim().is_empty() {
			return Err(ValidationError::new("email", "must not be empty").into());
		}
		if password.is_empty() {
			return Err(ValidationError::new("password", "must not be empty").into());
		}

		let request = ApiRequest::post(LOGIN_PATH).with_json(&LoginRequest { email, password })?;
		let reply = match self.client.request(request).await {
			Ok(response) => response.json::<LoginReply>()?,
			Err(Error::Status { status: INVALID_CREDENTIALS_STATUS, .. }) =>
				return Err(Error::InvalidCredentials),
			Err(e) => return Err(e),
		};
		let access =
			reply.tokens.and_then(|tokens| tokens.access).filter(|access| !access.is_empty());
		let (access, mut user) = match (access, reply.user) {
			(Some(access), Some(user)) => (access, user),
			_ if api::body_status_is(reply.status.as_ref(), INVALID_CREDENTIALS_STATUS) =>
				return Err(Error::InvalidCredentials),
			_ =>
				return Err(Error::UnexpectedResponse {
					reason: "login reply carried no access token or user".into(),
				}),
		};

		self.client.hooks.set_access_token(AccessToken::new(access));

		if user.role != Role::Admin {
			let info = match self.fetch_subscription().await {
				Ok(info) => info,
				Err(e @ Error::Refresh(_)) => return Err(e),
				Err(e) if e.status() == Some(crate::http::UNAUTHORIZED) => return Err(e),
				Err(e) => {
					#[cfg(feature = "tracing")]
					tracing::warn!(error = %e, "failed to read subscription status");
					#[cfg(not(feature = "tracing"))]
					let _ = e;

					SubscriptionInfo::default()
				},
			};

			user.has_subscription = info.has_subscription;
			user.subscription_status = info.subscription_status;
		}
		if self.client.hooks.access_token().is_none() {
			return Err(Error::UnexpectedResponse {
				reason: "session ended while loading the profile".into(),
			});
		}

		#[cfg(feature = "tracing")]
		tracing::info!(role = ?user.role, "signed in");

		Ok(user)
	}

	/// Signs out on the server and clears the local token.
	///
	/// The token is cleared even when the server call fails; that failure is still returned.
	pub async fn logout(&self) -> Result<()> {
		let result = self.send_logout().await;

		self.client.hooks.clear_access_token();

		result
	}

	/// Fetches the signed-in user.
	pub async fn current_user(&self) -> Result<UserProfile> {
		self.client.get_json(USER_DATA_PATH).await
	}

	/// Reads the subscription summary of the signed-in user.
	///
	/// A missing status on a successful reply counts as active. Any failure yields the empty
	/// summary, which routes the user to package selection.
	pub async fn subscription_info(&self) -> SubscriptionInfo {
		match self.fetch_subscription().await {
			Ok(info) => info,
			Err(e) => {
				#[cfg(feature = "tracing")]
				tracing::warn!(error = %e, "failed to read subscription status");
				#[cfg(not(feature = "tracing"))]
				let _ = e;

				SubscriptionInfo::default()
			},
		}
	}

	async fn fetch_subscription(&self) -> Result<SubscriptionInfo> {
		let reply: SubscriptionReply = self.client.get_json(USER_DATA_PATH).await?;

		Ok(SubscriptionInfo {
			has_subscription: reply.has_subscription,
			subscription_status: Some(
				reply.subscription_status.unwrap_or(SubscriptionStatus::Active),
			),
		})
	}

	async fn send_logout(&self) -> Result<()> {
		let request =
			ApiRequest::post(LOGOUT_PATH).with_json(&serde_json::json!({ "refresh": "" }))?;

		self.client.request(request).await?;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn profile(
		role: Role,
		has_subscription: bool,
		status: Option<SubscriptionStatus>,
	) -> UserProfile {
		UserProfile {
			name: "Ada".into(),
			email: "ada@example.com".into(),
			role,
			has_subscription,
			subscription_status: status,
		}
	}

	#[test]
	fn landing_route_follows_role_and_subscription() {
		assert_eq!(
			landing_route(&profile(Role::Admin, false, None)),
			LandingRoute::AdminDashboard
		);
		assert_eq!(
			landing_route(&profile(Role::User, true, Some(SubscriptionStatus::Active))),
			LandingRoute::Dashboard
		);
		assert_eq!(
			landing_route(&profile(Role::User, true, Some(SubscriptionStatus::Expired))),
			LandingRoute::PackageSelection
		);
		assert_eq!(landing_route(&profile(Role::User, false, None)).path(), "/usersubscription");
	}

	#[test]
	fn route_guard_mirrors_protected_pages() {
		let admin = profile(Role::Admin, false, None);
		let subscriber = profile(Role::User, false, None);

		assert_eq!(route_access(false, Some(&admin), ANY_ROLE), RouteAccess::SignIn);
		assert_eq!(route_access(false, None, ANY_ROLE).redirect_path(), Some("/login"));
		assert_eq!(route_access(true, None, ADMIN_ONLY), RouteAccess::Loading);
		assert_eq!(route_access(true, None, ADMIN_ONLY).redirect_path(), None);
		assert_eq!(route_access(true, Some(&admin), ADMIN_ONLY), RouteAccess::Granted);
		assert_eq!(route_access(true, Some(&subscriber), ANY_ROLE), RouteAccess::Granted);
		assert_eq!(
			route_access(true, Some(&subscriber), ADMIN_ONLY).redirect_path(),
			Some("/dashboard")
		);
		assert_eq!(
			route_access(true, Some(&admin), USER_ONLY),
			RouteAccess::Redirect(LandingRoute::AdminDashboard)
		);
	}

	#[test]
	fn profile_defaults_missing_subscription_fields() {
		let profile: UserProfile =
			serde_json::from_str(r#"{"name":"Ada","email":"ada@example.com","role":"user"}"#)
				.expect("Minimal profile should deserialize.");

		assert!(!profile.has_subscription);
		assert_eq!(profile.subscription_status, None);
		assert_eq!(profile.role, Role::User);
	}
}
