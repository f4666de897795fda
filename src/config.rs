//! Client configuration: backend base URL, endpoint paths, and the refresh timeout policy.

pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Validated, immutable client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	base_url: Url,
	refresh_url: Url,
	subscribe_path: String,
	refresh_timeout: Option<Duration>,
	default_headers: BTreeMap<String, String>,
}
impl ClientConfig {
	/// Default path of the access-token refresh endpoint.
	pub const DEFAULT_REFRESH_PATH: &str = "/api/accounts/refresh-access-token/";
	/// Default path of the package subscription endpoint.
	pub const DEFAULT_SUBSCRIBE_PATH: &str = "/api/subscriptions/user/packages/";

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Parses `base_url` and returns a builder seeded with it.
	pub fn parse(base_url: &str) -> Result<ClientConfigBuilder, ConfigError> {
		let url = Url::parse(base_url).map_err(|source| ConfigError::InvalidUrl { source })?;

		Ok(Self::builder(url))
	}

	/// Normalized base URL (always ends with `/`).
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Absolute URL of the refresh endpoint.
	pub fn refresh_url(&self) -> &Url {
		&self.refresh_url
	}

	/// Path of the package subscription endpoint.
	pub fn subscribe_path(&self) -> &str {
		&self.subscribe_path
	}

	/// Upper bound for a single refresh call; `None` waits indefinitely.
	pub fn refresh_timeout(&self) -> Option<Duration> {
		self.refresh_timeout
	}

	/// Headers attached to every outbound request.
	pub fn default_headers(&self) -> &BTreeMap<String, String> {
		&self.default_headers
	}

	/// Resolves a path relative to the base URL.
	///
	/// Leading slashes are ignored so `"/api/x/"` and `"api/x/"` resolve identically and a base
	/// URL with a path prefix keeps it. Absolute URLs are refused so bearer tokens never leave
	/// the configured backend.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		resolve_against(&self.base_url, path)
	}
}

fn resolve_against(base: &Url, path: &str) -> Result<Url, ConfigError> {
	let relative = path.trim_start_matches('/');

	if relative.is_empty() || relative.starts_with('/') || relative.contains("://") {
		return Err(ConfigError::InvalidPath { path: path.to_owned() });
	}

	base.join(relative).map_err(|source| ConfigError::InvalidUrl { source })
}
