//! Client-level error types shared across requests, refresh, stores, and checkout.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Session storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Caller-supplied input failed local validation.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token refresh failed; the session has been handed to the logout callback.
	#[error(transparent)]
	Refresh(#[from] crate::refresh::RefreshError),
	/// Payment handshake failure.
	#[error(transparent)]
	Payment(#[from] crate::payment::PaymentError),

	/// Backend answered with a non-success status.
	#[error("Backend responded with HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Retry-After hint from the backend, if supplied.
		retry_after: Option<Duration>,
		/// Truncated response body for diagnostics.
		body: String,
	},
	/// Backend responded with JSON that does not match the expected shape.
	#[error("Backend returned malformed JSON.")]
	Decode {
		/// Structured parsing failure naming the offending field path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// Login was rejected by the backend.
	#[error("Login failed: the backend rejected the credentials.")]
	InvalidCredentials,
	/// Backend returned a well-formed but unusable payload.
	#[error("Backend returned an unexpected response: {reason}.")]
	UnexpectedResponse {
		/// Human-readable summary of what was missing.
		reason: String,
	},
}
impl Error {
	/// Returns the HTTP status attached to the error, when one exists.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } | Self::Decode { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Configuration failures raised while building or using a client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A URL could not be parsed.
	#[error("URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL cannot carry relative paths (e.g. `mailto:` or `data:` URLs).
	#[error("Base URL `{url}` cannot be used as a base.")]
	CannotBeABase {
		/// Offending URL.
		url: String,
	},
	/// Base URL uses a scheme other than HTTP(S).
	#[error("Base URL scheme `{scheme}` is not supported.")]
	UnsupportedScheme {
		/// Offending scheme.
		scheme: String,
	},
	/// Plain HTTP was requested for a non-loopback host.
	#[error("Base URL must use HTTPS for non-loopback hosts: {url}.")]
	InsecureBaseUrl {
		/// Offending URL.
		url: String,
	},
	/// An endpoint path is empty or absolute.
	#[error("Endpoint path `{path}` must be a non-empty relative path.")]
	InvalidPath {
		/// Offending path.
		path: String,
	},
	/// Refresh timeout must be strictly positive.
	#[error("The refresh timeout must be positive.")]
	NonPositiveTimeout,
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Local validation failure for caller-supplied input.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Invalid {field}: {reason}.")]
pub struct ValidationError {
	/// Name of the rejected field.
	pub field: &'static str,
	/// Why the value was rejected.
	pub reason: &'static str,
}
impl ValidationError {
	/// Creates a validation error for `field`.
	pub const fn new(field: &'static str, reason: &'static str) -> Self {
		Self { field, reason }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the backend.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::{refresh::RefreshError, store::StoreError};

	#[test]
	fn store_error_converts_into_client_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let client_error: Error = store_error.clone().into();

		assert!(matches!(client_error, Error::Storage(_)));
		assert!(client_error.to_string().contains("disk unavailable"));

		let source = StdError::source(&client_error)
			.expect("Client error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn refresh_error_keeps_its_code_in_the_message() {
		let err: Error = RefreshError::NoCredential.into();

		assert!(err.to_string().starts_with("NO_REFRESH"));
		assert_eq!(err.status(), None);
	}

	#[test]
	fn status_errors_expose_the_http_status() {
		let err = Error::Status { status: 403, retry_after: None, body: String::new() };

		assert_eq!(err.status(), Some(403));
		assert_eq!(err.to_string(), "Backend responded with HTTP 403.");
	}
}
