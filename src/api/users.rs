//! Admin management of dashboard accounts.

// self
use crate::{
	_prelude::*,
	api::Role,
	auth::UserId,
	client::AuthenticatedClient,
	http::HttpTransport,
};

/// Path of the admin user listing.
pub const ADMIN_USERS_PATH: &str = "/api/accounts/admin/users/";
/// Prefix of per-user admin actions.
pub const ADMIN_USER_ACTIONS_PATH: &str = "/api/admin/users/";

/// Moderation state of an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
	/// Can sign in.
	Active,
	/// Disabled by the user or an admin.
	Inactive,
	/// Blocked by an admin.
	Banned,
	/// Registered but not yet verified.
	Pending,
}

/// Billing standing of an account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingStatus {
	/// Paid up.
	#[default]
	Active,
	/// Payment late.
	Overdue,
	/// Subscription cancelled.
	Cancelled,
}

/// Account row of the admin user table.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedUser {
	/// Account identifier.
	pub id: UserId,
	/// Display name.
	pub name: String,
	/// Login email.
	pub email: String,
	/// Account role.
	pub role: Role,
	/// Moderation state.
	pub status: AccountStatus,
	/// Contact phone.
	#[serde(default)]
	pub phone: Option<String>,
	/// Company name.
	#[serde(default)]
	pub company: Option<String>,
	/// Registration timestamp (ISO 8601).
	#[serde(default)]
	pub joined_at: Option<String>,
	/// Last sign-in timestamp (ISO 8601).
	#[serde(default)]
	pub last_login_at: Option<String>,
	/// Calls placed by the account's agents.
	#[serde(default)]
	pub total_calls: u64,
	/// Call minutes consumed.
	#[serde(default)]
	pub minutes_used: u64,
	/// Name of the subscribed package.
	#[serde(default)]
	pub current_plan: String,
	/// Billing standing.
	#[serde(default)]
	pub billing_status: BillingStatus,
}

/// Growth figures shown above the user table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGrowth {
	/// Accounts created this calendar month.
	#[serde(default)]
	pub new_users_this_month: u64,
	/// Revenue to date, in dollars.
	#[serde(default)]
	pub total_revenue: f64,
	/// Average calls per account.
	#[serde(default)]
	pub avg_calls_per_user: f64,
}

/// Admin user listing with its headline counts.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersOverview {
	/// Every account.
	#[serde(default)]
	pub users: Vec<ManagedUser>,
	/// Number of accounts.
	#[serde(default)]
	pub total_users: u64,
	/// Number of active accounts.
	#[serde(default)]
	pub active_users: u64,
	/// Number of banned accounts.
	#[serde(default)]
	pub banned_users: u64,
	/// Growth figures.
	#[serde(default)]
	pub stats: UserGrowth,
}
impl UsersOverview {
	/// Accounts currently in `status`.
	pub fn with_status(&self, status: AccountStatus) -> impl Iterator<Item = &ManagedUser> {
		self.users.iter().filter(move |user| user.status == status)
	}
}

#[derive(Serialize)]
struct StatusChange {
	status: AccountStatus,
}

/// Admin user endpoints bound to a client.
#[derive(Debug)]
pub struct UsersApi<'a, T>
where
	T: ?Sized + HttpTransport,
{
	pub(crate) client: &'a AuthenticatedClient<T>,
}
impl<T> UsersApi<'_, T>
where
	T: ?Sized + HttpTransport,
{
	/// Lists every account with the headline counts.
	pub async fn list(&self) -> Result<UsersOverview> {
		self.client.get_json(ADMIN_USERS_PATH).await
	}

	/// Moves an account to `status` (ban, reactivate, ...) and returns the updated row.
	pub async fn set_status(&self, id: &UserId, status: AccountStatus) -> Result<ManagedUser> {
		let user = self
			.client
			.patch_json(&format!("{ADMIN_USER_ACTIONS_PATH}{id}/status"), &StatusChange { status })
			.await?;

		#[cfg(feature = "tracing")]
		tracing::info!(user = %id, ?status, "account status changed");

		Ok(user)
	}

	/// Deletes an account.
	pub async fn delete(&self, id: &UserId) -> Result<()> {
		self.client.delete(&format!("{ADMIN_USER_ACTIONS_PATH}{id}")).await
	}
}
