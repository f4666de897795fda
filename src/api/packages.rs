//! Admin management of subscription packages.

// crates.io
use serde::{Deserializer, de::Error as DeError};
// self
use crate::{
	_prelude::*,
	api,
	auth::PackageId,
	client::AuthenticatedClient,
	error::ValidationError,
	http::{ApiRequest, HttpTransport},
	payment::Amount,
};

/// Collection path of the admin package endpoints.
pub const PACKAGES_PATH: &str = "/api/subscriptions/admin/packages/";

/// Optional capabilities bundled with a package.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageFeatures {
	/// Number of campaigns allowed.
	#[serde(default)]
	pub campaigns: u32,
	/// Programmatic API access.
	#[serde(default)]
	pub api_access: bool,
	/// Advanced analytics; only meaningful with analytics access.
	#[serde(default)]
	pub advanced_analytics: bool,
}

/// Subscription package as stored by the backend.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Package {
	/// Package identifier.
	pub id: PackageId,
	/// Display name.
	pub name: String,
	/// Monthly price in dollars.
	#[serde(deserialize_with = "price_from_number_or_text")]
	pub price_monthly: f64,
	/// Inbound call minutes; ignored when a total limit is set.
	#[serde(default)]
	pub minutes_inbound_limit: u32,
	/// Outbound call minutes; ignored when a total limit is set.
	#[serde(default)]
	pub minutes_outbound_limit: u32,
	/// Combined call minutes; `0` means split inbound/outbound limits apply.
	#[serde(default)]
	pub minutes_total_limit: u32,
	/// Number of agents allowed.
	#[serde(default)]
	pub agents_allowed: u32,
	/// Analytics access.
	#[serde(default)]
	pub analytics_access: bool,
	/// Capability flags.
	#[serde(default, deserialize_with = "features_or_default")]
	pub features: PackageFeatures,
	/// Whether the package can be subscribed to.
	#[serde(default)]
	pub is_active: bool,
	/// Creation timestamp as reported by the backend.
	#[serde(default)]
	pub created_at: Option<String>,
	/// Current subscriber count, when reported.
	#[serde(default)]
	pub subscribers: Option<u64>,
}
impl Package {
	/// Returns `true` when a combined minute limit replaces the split limits.
	pub fn uses_total_minutes(&self) -> bool {
		self.minutes_total_limit > 0
	}

	/// Monthly price in cents, as charged by the payment processor.
	pub fn monthly_amount(&self) -> Result<Amount, ValidationError> {
		Amount::from_dollars(self.price_monthly)
	}
}

/// Create/update payload for a package.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PackageDraft {
	/// Display name.
	pub name: String,
	/// Monthly price in dollars.
	pub price_monthly: f64,
	/// Inbound call minutes.
	pub minutes_inbound_limit: u32,
	/// Outbound call minutes.
	pub minutes_outbound_limit: u32,
	/// Combined call minutes.
	pub minutes_total_limit: u32,
	/// Number of agents allowed.
	pub agents_allowed: u32,
	/// Analytics access.
	pub analytics_access: bool,
	/// Capability flags.
	pub features: PackageFeatures,
	/// Whether the package can be subscribed to.
	pub is_active: bool,
}
impl PackageDraft {
	/// Validates the draft and returns the payload that will be sent.
	///
	/// A total minute limit zeroes the split limits, and advanced analytics is dropped when
	/// analytics access is off.
	pub fn validate(&self) -> Result<Self, ValidationError> {
		let name = self.name.trim();

		if name.is_empty() {
			return Err(ValidationError::new("name", "must not be empty"));
		}
		if !self.price_monthly.is_finite() || self.price_monthly < 0. {
			return Err(ValidationError::new("price_monthly", "must be a non-negative amount"));
		}

		let mut draft = self.clone();

		draft.name = name.to_owned();

		if draft.minutes_total_limit > 0 {
			draft.minutes_inbound_limit = 0;
			draft.minutes_outbound_limit = 0;
		}

		draft.features.advanced_analytics &= draft.analytics_access;

		Ok(draft)
	}
}
impl From<&Package> for PackageDraft {
	fn from(package: &Package) -> Self {
		Self {
			name: package.name.clone(),
			price_monthly: package.price_monthly,
			minutes_inbound_limit: package.minutes_inbound_limit,
			minutes_outbound_limit: package.minutes_outbound_limit,
			minutes_total_limit: package.minutes_total_limit,
			agents_allowed: package.agents_allowed,
			analytics_access: package.analytics_access,
			features: package.features,
			is_active: package.is_active,
		}
	}
}

#[derive(Debug, Deserialize)]
struct PackageList {
	#[serde(default)]
	success: Option<bool>,
	#[serde(default)]
	message: Option<String>,
	#[serde(default)]
	packages: Vec<Package>,
}

/// Package endpoints bound to a client.
#[derive(Debug)]
pub struct PackagesApi<'a, T>
where
	T: ?Sized + HttpTransport,
{
	pub(crate) client: &'a AuthenticatedClient<T>,
}
impl<T> PackagesApi<'_, T>
where
	T: ?Sized + HttpTransport,
{
	/// Lists every package.
	pub async fn list(&self) -> Result<Vec<Package>> {
		let list: PackageList = self.client.get_json(PACKAGES_PATH).await?;

		api::ensure_success(list.success, list.message, "package listing")?;

		Ok(list.packages)
	}

	/// Fetches one package.
	pub async fn get(&self, id: &PackageId) -> Result<Package> {
		self.client.get_json(&item_path(id)).await
	}

	/// Creates a package from a validated draft.
	pub async fn create(&self, draft: &PackageDraft) -> Result<Package> {
		let payload = draft.validate()?;

		self.client.post_json(PACKAGES_PATH, &payload).await
	}

	/// Replaces a package with a validated draft.
	pub async fn update(&self, id: &PackageId, draft: &PackageDraft) -> Result<Package> {
		let payload = draft.validate()?;

		self.client.put_json(&item_path(id), &payload).await
	}

	/// Deletes a package.
	pub async fn delete(&self, id: &PackageId) -> Result<()> {
		self.client.request(ApiRequest::delete(item_path(id))).await.map(|_| ())
	}
}

fn item_path(id: &PackageId) -> String {
	format!("{PACKAGES_PATH}{id}/")
}

pub(crate) fn price_from_number_or_text<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum RawPrice {
		Number(f64),
		Text(String),
	}

	match RawPrice::deserialize(deserializer)? {
		RawPrice::Number(value) => Ok(value),
		RawPrice::Text(value) => value.trim().parse().map_err(D::Error::custom),
	}
}

fn features_or_default<'de, D>(deserializer: D) -> Result<PackageFeatures, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<PackageFeatures>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn draft() -> PackageDraft {
		PackageDraft {
			name: "  Growth ".into(),
			price_monthly: 49.5,
			minutes_inbound_limit: 300,
			minutes_outbound_limit: 200,
			minutes_total_limit: 0,
			agents_allowed: 3,
			analytics_access: false,
			features: PackageFeatures { campaigns: 2, api_access: true, advanced_analytics: true },
			is_active: true,
		}
	}

	#[test]
	fn validate_normalizes_limits_and_analytics() {
		let payload = draft().validate().expect("Draft fixture should validate.");

		assert_eq!(payload.name, "Growth");
		assert_eq!(payload.minutes_inbound_limit, 300);
		assert!(!payload.features.advanced_analytics);

		let total = PackageDraft { minutes_total_limit: 1_000, ..draft() }
			.validate()
			.expect("Total-minutes draft should validate.");

		assert_eq!(total.minutes_inbound_limit, 0);
		assert_eq!(total.minutes_outbound_limit, 0);
		assert_eq!(total.minutes_total_limit, 1_000);
	}

	#[test]
	fn validate_rejects_blank_names_and_bad_prices() {
		let err = PackageDraft { name: "   ".into(), ..draft() }
			.validate()
			.expect_err("Blank name should be rejected.");

		assert_eq!(err.field, "name");

		for price in [-1., f64::NAN, f64::INFINITY] {
			let err = PackageDraft { price_monthly: price, ..draft() }
				.validate()
				.expect_err("Invalid price should be rejected.");

			assert_eq!(err.field, "price_monthly");
		}
	}

	#[test]
	fn package_accepts_textual_prices_and_null_features() {
		let package: Package = serde_json::from_str(
			r#"{"id":7,"name":"Starter","price_monthly":"19.99","features":null,"is_active":true}"#,
		)
		.expect("Package fixture should deserialize.");

		assert_eq!(package.id.as_str(), "7");
		assert_eq!(package.price_monthly, 19.99);
		assert_eq!(package.features, PackageFeatures::default());
		assert!(!package.uses_total_minutes());
		assert_eq!(package.monthly_amount().map(Amount::cents), Ok(1_999));
		assert!(
			serde_json::from_str::<Package>(r#"{"id":7,"name":"x","price_monthly":"free"}"#)
				.is_err()
		);
	}
}
