//! Admin dashboard figures.

// self
use crate::{
	_prelude::*,
	api::{AccountStatus, Role, packages},
	auth::{PackageId, UserId},
	client::AuthenticatedClient,
	http::HttpTransport,
};

/// Path of the admin dashboard endpoint.
pub const ADMIN_DASHBOARD_PATH: &str = "/api/accounts/admin/dashboard/";

/// Headline business metrics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
	/// Number of accounts.
	#[serde(default)]
	pub total_users: u64,
	/// Number of active accounts.
	#[serde(default)]
	pub active_users: u64,
	/// Number of packages on offer.
	#[serde(default)]
	pub total_packages: u64,
	/// Monthly recurring revenue, in dollars.
	#[serde(default)]
	pub mrr_usd: f64,
	/// Calls placed today.
	#[serde(default)]
	pub calls_today: u64,
	/// Monthly churn, in percent.
	#[serde(default)]
	pub churn_rate_pct: f64,
}

/// One sparkline sample.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct TrendPoint {
	/// Sample position.
	pub x: f64,
	/// Sample value.
	pub y: f64,
}

/// Sparkline series.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct DashboardTrends {
	/// Recurring revenue.
	#[serde(default)]
	pub mrr: Vec<TrendPoint>,
	/// Call volume.
	#[serde(default)]
	pub calls: Vec<TrendPoint>,
	/// Account growth.
	#[serde(default)]
	pub users: Vec<TrendPoint>,
}

/// Recently registered account.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RecentUser {
	/// Account identifier.
	pub id: UserId,
	/// Display name.
	pub name: String,
	/// Login email.
	pub email: String,
	/// Account role.
	pub role: Role,
	/// Registration timestamp (ISO 8601).
	#[serde(default)]
	pub joined_at: Option<String>,
	/// Moderation state.
	pub status: AccountStatus,
}

/// Best-selling package.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TopPackage {
	/// Package identifier.
	pub id: PackageId,
	/// Display name.
	pub name: String,
	/// Monthly price in dollars; the backend sends a number or a numeric string.
	#[serde(deserialize_with = "packages::price_from_number_or_text")]
	pub price_monthly: f64,
	/// Active subscribers.
	#[serde(default)]
	pub subscribers: u64,
	/// Call minutes included.
	#[serde(default)]
	pub minutes_included: u64,
}

/// Everything the admin dashboard shows.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
	/// Headline metrics.
	#[serde(default)]
	pub metrics: DashboardMetrics,
	/// Sparkline series.
	#[serde(default)]
	pub trends: DashboardTrends,
	/// Latest registrations.
	#[serde(default)]
	pub recent_users: Vec<RecentUser>,
	/// Best-selling packages.
	#[serde(default)]
	pub top_packages: Vec<TopPackage>,
}

impl<T> AuthenticatedClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Reads the admin dashboard figures.
	pub async fn admin_dashboard(&self) -> Result<AdminDashboard> {
		self.get_json(ADMIN_DASHBOARD_PATH).await
	}
}
