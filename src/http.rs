//! Transport primitives for backend calls.
//!
//! Callers describe a call with [`ApiRequest`]; the client resolves it into an
//! [`OutboundRequest`] (absolute URL, default headers, bearer token) and hands it to an
//! [`HttpTransport`]. The transport is the client's only dependency on an HTTP stack, so tests
//! and embedders can swap in their own implementation without touching the refresh logic.

// crates.io
use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	error::{ConfigError, TransportError},
};

/// HTTP status that triggers the refresh-and-retry path.
pub const UNAUTHORIZED: u16 = 401;

const BODY_PREVIEW_LIMIT: usize = 512;

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing resolved backend requests.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared across
/// client clones, and must carry ambient credentials (the refresh cookie) across calls the
/// way a browser does with `withCredentials`.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends the request and returns the raw response, whatever its status.
	///
	/// Non-success statuses are not errors at this layer; only failures to obtain a response
	/// at all are reported as [`TransportError`].
	fn execute(&self, request: OutboundRequest) -> TransportFuture<'_>;
}

/// HTTP methods used by the backend API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Caller-facing description of a backend call.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the configured base URL.
	pub path: String,
	/// Query string pairs appended in order.
	pub query: Vec<(String, String)>,
	/// Extra headers; names are matched case-insensitively.
	pub headers: BTreeMap<String, String>,
	/// Optional JSON body.
	pub body: Option<serde_json::Value>,
	retried: bool,
	bearer: Option<AccessToken>,
}
impl ApiRequest {
	/// Creates a request for `path` with no body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			headers: BTreeMap::new(),
			body: None,
			retried: false,
			bearer: None,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::Patch, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Serializes `body` as the JSON payload.
	pub fn with_json<B>(mut self, body: &B) -> Result<Self, ConfigError>
	where
		B: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_value(body)?);

		Ok(self)
	}

	/// Appends a query pair.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Adds or replaces a header.
	pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Returns `true` once the request has been replayed after a refresh.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	/// Marks the request as retried and pins the token it must be replayed with.
	pub(crate) fn resume_with(&mut self, token: AccessToken) {
		self.retried = true;
		self.bearer = Some(token);
	}

	pub(crate) fn bearer_override(&self) -> Option<&AccessToken> {
		self.bearer.as_ref()
	}
}

/// Fully resolved request handed to an [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct OutboundRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute target URL.
	pub url: Url,
	/// Header map with lower-case names.
	pub headers: BTreeMap<String, String>,
	/// Encoded body bytes.
	pub body: Option<Vec<u8>>,
}
impl OutboundRequest {
	/// Returns a header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Returns the `Authorization` header, if one was attached.
	pub fn authorization(&self) -> Option<&str> {
		self.header("authorization")
	}
}

/// Raw response returned by an [`HttpTransport`].
#[derive(Clone, Debug, Default)]
pub struct ApiResponse {
	status: u16,
	headers: BTreeMap<String, String>,
	body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response from a status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: BTreeMap::new(), body: body.into() }
	}

	/// Adds a header (lower-casing its name).
	pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// HTTP status code.
	pub fn status(&self) -> u16 {
		self.status
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns a header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Raw body bytes.
	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Body decoded as lossy UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the body as JSON, reporting the failing field path on mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::Decode { source, status: self.status })
	}

	/// Parses the `Retry-After` header (delta-seconds or an RFC 2822 date).
	pub fn retry_after(&self) -> Option<Duration> {
		parse_retry_after(self.header("retry-after")?)
	}

	/// Converts a non-success response into [`Error::Status`].
	pub fn into_status_error(self) -> Error {
		let retry_after = self.retry_after();
		let mut body = self.text();

		if body.len() > BODY_PREVIEW_LIMIT {
			let mut cut = BODY_PREVIEW_LIMIT;

			while !body.is_char_boundary(cut) {
				cut -= 1;
			}

			body.truncate(cut);
		}

		Error::Status { status: self.status, retry_after, body }
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// [`ReqwestTransport::new`] enables a cookie store, which is how the httpOnly refresh cookie
/// issued at login rides along on the refresh call, and disables redirect following so auth
/// failures are observed directly. Clients passed to [`ReqwestTransport::with_client`] should be
/// configured the same way.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport with a cookie store and redirects disabled.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.cookie_store(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: OutboundRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
				Method::Put => reqwest::Method::PUT,
				Method::Patch => reqwest::Method::PATCH,
				Method::Delete => reqwest::Method::DELETE,
			};
			let mut builder = client.request(method, request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse { status, headers, body })
		})
	}
}

fn parse_retry_after(raw: &str) -> Option<Duration> {
	let raw = raw.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(i64::from(secs)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn retry_after_accepts_delta_seconds() {
		let response = ApiResponse::new(429, Vec::new()).with_header("Retry-After", "12");

		assert_eq!(response.retry_after(), Some(Duration::seconds(12)));
	}

	#[test]
	fn retry_after_ignores_dates_in_the_past() {
		assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
		assert_eq!(parse_retry_after("soon"), None);
	}

	#[test]
	fn json_decode_reports_field_path() {
		#[derive(Debug, Deserialize)]
		struct Payload {
			#[allow(dead_code)]
			count: u32,
		}

		let response = ApiResponse::new(200, br#"{"count":"many"}"#.to_vec());
		let err = response.json::<Payload>().expect_err("String count should fail to decode.");

		match err {
			Error::Decode { source, status } => {
				assert_eq!(status, 200);
				assert_eq!(source.path().to_string(), "count");
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn status_error_truncates_large_bodies() {
		let response = ApiResponse::new(500, vec![b'x'; BODY_PREVIEW_LIMIT * 2]);

		match response.into_status_error() {
			Error::Status { status, body, .. } => {
				assert_eq!(status, 500);
				assert_eq!(body.len(), BODY_PREVIEW_LIMIT);
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn request_builder_lowercases_headers() {
		let request = ApiRequest::get("/api/agents/").with_header("X-Trace", "abc");

		assert_eq!(request.headers.get("x-trace").map(String::as_str), Some("abc"));
		assert!(!request.is_retried());
	}
}
