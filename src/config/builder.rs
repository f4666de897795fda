//! Validated construction of [`ClientConfig`]: base URL checks, endpoint paths, and the refresh
//! timeout policy.

// std
use std::net::IpAddr;
// crates.io
use url::Host;
// self
use crate::{
	_prelude::*,
	config::{ClientConfig, resolve_against},
	error::ConfigError,
};

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Backend base URL.
	pub base_url: Url,
	/// Path of the refresh endpoint.
	pub refresh_path: String,
	/// Path of the subscription endpoint.
	pub subscribe_path: String,
	/// Optional bound for a single refresh call.
	pub refresh_timeout: Option<Duration>,
	/// Allows plain HTTP for non-loopback hosts.
	pub allow_insecure_http: bool,
	/// Headers attached to every request.
	pub default_headers: BTreeMap<String, String>,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with the provided base URL and default endpoint paths.
	pub fn new(base_url: Url) -> Self {
		let default_headers = BTreeMap::from([
			("accept".to_owned(), "application/json".to_owned()),
			("content-type".to_owned(), "application/json".to_owned()),
		]);

		Self {
			base_url,
			refresh_path: ClientConfig::DEFAULT_REFRESH_PATH.to_owned(),
			subscribe_path: ClientConfig::DEFAULT_SUBSCRIBE_PATH.to_owned(),
			refresh_timeout: None,
			allow_insecure_http: false,
			default_headers,
		}
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the subscription endpoint path.
	pub fn subscribe_path(mut self, path: impl Into<String>) -> Self {
		self.subscribe_path = path.into();

		self
	}

	/// Bounds every refresh call; when exceeded the refresh fails with a timeout error.
	pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
		self.refresh_timeout = Some(timeout);

		self
	}

	/// Permits `http://` base URLs for non-loopback hosts.
	pub fn allow_insecure_http(mut self, allow: bool) -> Self {
		self.allow_insecure_http = allow;

		self
	}

	/// Adds or replaces a default header.
	pub fn default_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.default_headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let base_url = normalize_base(self.base_url)?;

		validate_scheme(&base_url, self.allow_insecure_http)?;

		if self.refresh_timeout.is_some_and(|timeout| !timeout.is_positive()) {
			return Err(ConfigError::NonPositiveTimeout);
		}

		let refresh_url = resolve_against(&base_url, &self.refresh_path)?;

		resolve_against(&base_url, &self.subscribe_path)?;

		Ok(ClientConfig {
			base_url,
			refresh_url,
			subscribe_path: self.subscribe_path,
			refresh_timeout: self.refresh_timeout,
			default_headers: self.default_headers,
		})
	}
}

fn normalize_base(mut url: Url) -> Result<Url, ConfigError> {
	if url.cannot_be_a_base() {
		return Err(ConfigError::CannotBeABase { url: url.to_string() });
	}

	url.set_query(None);
	url.set_fragment(None);

	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	Ok(url)
}

fn validate_scheme(url: &Url, allow_insecure_http: bool) -> Result<(), ConfigError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if allow_insecure_http || is_loopback(url) => Ok(()),
		"http" => Err(ConfigError::InsecureBaseUrl { url: url.to_string() }),
		other => Err(ConfigError::UnsupportedScheme { scheme: other.to_owned() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		None => false,
	}
}
