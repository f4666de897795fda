//! Authenticated request pipeline with refresh-and-retry recovery.
//!
//! [`AuthenticatedClient::request`] attaches the current bearer token, and when the backend
//! answers `401` it refreshes the token through the shared [`RefreshCoordinator`] and replays the
//! request exactly once. A request rejected again after its replay, or a refresh that fails,
//! ends the session through [`SessionHooks::on_logout`].

// std
#[cfg(feature = "reqwest")] use std::path::PathBuf;
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, SessionHooks},
	config::ClientConfig,
	error::ConfigError,
	http::{ApiRequest, ApiResponse, HttpTransport, Method, OutboundRequest, UNAUTHORIZED},
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	refresh::{self, RefreshCoordinator, RefreshError, RefreshOutcome},
};
#[cfg(feature = "reqwest")] use crate::{http::ReqwestTransport, store::FileSession};

/// Client specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestClientHandle = AuthenticatedClient<ReqwestTransport>;

/// HTTP client that injects bearer tokens and recovers from expired ones.
///
/// Clones share the transport, session hooks, and refresh coordinator, so concurrent requests
/// made through any clone collapse onto a single refresh call.
pub struct AuthenticatedClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Validated configuration (base URL, refresh endpoint, timeout policy).
	pub config: Arc<ClientConfig>,
	/// Transport used for every backend call, including refresh.
	pub transport: Arc<T>,
	/// Session state the client reads tokens from and reports logouts to.
	pub hooks: Arc<dyn SessionHooks>,
	coordinator: Arc<RefreshCoordinator>,
}
impl<T> AuthenticatedClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client over the provided transport and session hooks.
	pub fn new(
		config: ClientConfig,
		transport: impl Into<Arc<T>>,
		hooks: Arc<dyn SessionHooks>,
	) -> Self {
		Self {
			config: Arc::new(config),
			transport: transport.into(),
			hooks,
			coordinator: Default::default(),
		}
	}

	/// Shares an existing refresh coordinator, e.g. between clients pointed at the same session.
	pub fn with_coordinator(mut self, coordinator: Arc<RefreshCoordinator>) -> Self {
		self.coordinator = coordinator;

		self
	}

	/// Refresh coordinator shared by every clone of this client.
	pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
		&self.coordinator
	}

	/// Sends `request`, refreshing the access token and replaying once on `401`.
	///
	/// Returns the response for 2xx statuses. Any other status surfaces as
	/// [`Error::Status`]; `403` in particular is passed through without touching the session.
	/// A failed refresh surfaces as [`Error::Refresh`] after the logout callback has fired.
	pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: OperationKind = OperationKind::Request;

		let span = OperationSpan::new(KIND, "request");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span.instrument(self.send_with_recovery(request)).await;

		obs::record_operation_outcome(KIND, OperationOutcome::of(&result));

		result
	}

	/// Obtains a fresh access token, joining the refresh already in flight if there is one.
	///
	/// Only the caller that issued the refresh call fires the logout callback on failure, so a
	/// failed cycle ends the session exactly once however many callers were waiting on it.
	pub async fn refresh_access_token(&self) -> Result<AccessToken> {
		let span = OperationSpan::new(OperationKind::Refresh, "refresh_access_token");
		let (role, outcome) = span
			.instrument(self.coordinator.run(|| async {
				let outcome = self.call_refresh_endpoint().await;

				if let Ok(token) = &outcome {
					self.hooks.set_access_token(token.clone());
				}

				outcome
			}))
			.await;

		span.record_refresh_role(role);
		span.record_queue_depth(role.queue_depth());

		match outcome {
			Ok(token) => Ok(token),
			Err(e) => {
				if role.is_leader() {
					#[cfg(feature = "tracing")]
					tracing::warn!(code = e.code(), "access token refresh failed; ending session");

					self.hooks.on_logout();
				}

				Err(e.into())
			},
		}
	}

	/// Sends a `GET` and decodes the JSON body.
	pub async fn get_json<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.request(ApiRequest::get(path)).await?.json()
	}

	/// Sends a `POST` with a JSON body and decodes the JSON response.
	pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.request(ApiRequest::post(path).with_json(body)?).await?.json()
	}

	/// Sends a `PUT` with a JSON body and decodes the JSON response.
	pub async fn put_json<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.request(ApiRequest::put(path).with_json(body)?).await?.json()
	}

	/// Sends a `PATCH` with a JSON body and decodes the JSON response.
	pub async fn patch_json<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.request(ApiRequest::patch(path).with_json(body)?).await?.json()
	}

	/// Sends a `DELETE`, discarding the response body.
	pub async fn delete(&self, path: &str) -> Result<()> {
		self.request(ApiRequest::delete(path)).await.map(|_| ())
	}

	async fn send_with_recovery(&self, mut request: ApiRequest) -> Result<ApiResponse> {
		loop {
			let outbound = self.prepare(&request)?;
			let response = self.transport.execute(outbound).await?;

			if response.is_success() {
				return Ok(response);
			}
			if response.status() != UNAUTHORIZED {
				return Err(response.into_status_error());
			}
			if request.is_retried() {
				#[cfg(feature = "tracing")]
				tracing::warn!(
					method = %request.method,
					path = %request.path,
					"request rejected after token refresh; ending session"
				);

				self.hooks.on_logout();

				return Err(response.into_status_error());
			}

			let token = self.refresh_access_token().await?;

			request.resume_with(token);
		}
	}

	fn prepare(&self, request: &ApiRequest) -> Result<OutboundRequest> {
		let mut url = self.config.resolve(&request.path)?;

		if !request.query.is_empty() {
			url.query_pairs_mut()
				.extend_pairs(request.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
		}

		let mut headers = self.config.default_headers().clone();

		headers.extend(request.headers.iter().map(|(k, v)| (k.clone(), v.clone())));

		// A replayed request carries the token its refresh produced, not whatever the session
		// holds by the time it is resent.
		let token = request
			.bearer_override()
			.cloned()
			.or_else(|| self.hooks.access_token())
			.filter(|token| !token.is_empty());

		if let Some(token) = token {
			headers.insert("authorization".into(), token.bearer());
		}

		let body =
			request.body.as_ref().map(serde_json::to_vec).transpose().map_err(ConfigError::from)?;

		Ok(OutboundRequest { method: request.method, url, headers, body })
	}

	async fn call_refresh_endpoint(&self) -> RefreshOutcome {
		const KIND: OperationKind = OperationKind::Refresh;

		let span = OperationSpan::new(KIND, "call_refresh_endpoint");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let outcome = span
			.instrument(async {
				// The refresh credential travels as a cookie; no bearer header is attached.
				let request = OutboundRequest {
					method: Method::Post,
					url: self.config.refresh_url().clone(),
					headers: self.config.default_headers().clone(),
					body: Some(b"{}".to_vec()),
				};
				let call = self.transport.execute(request);
				let response = match self.config.refresh_timeout() {
					Some(after) => {
						let bound = StdDuration::try_from(after).unwrap_or_default();

						tokio::time::timeout(bound, call)
							.await
							.map_err(|_| RefreshError::TimedOut { after })?
					},
					None => call.await,
				};

				match response {
					Ok(response) => refresh::token_from_response(&response),
					Err(e) => Err(RefreshError::Transport { message: error_chain(&e) }),
				}
			})
			.await;

		obs::record_operation_outcome(KIND, OperationOutcome::of(&outcome));

		outcome
	}
}
#[cfg(feature = "reqwest")]
impl AuthenticatedClient<ReqwestTransport> {
	/// Creates a client backed by a cookie-carrying reqwest transport.
	pub fn with_reqwest(
		config: ClientConfig,
		hooks: Arc<dyn SessionHooks>,
	) -> Result<Self, ConfigError> {
		Ok(Self::new(config, ReqwestTransport::new()?, hooks))
	}

	/// Creates a reqwest-backed client whose access token is mirrored to the file at `path`.
	///
	/// A token saved there by an earlier run is restored. An unreadable or corrupt snapshot
	/// fails with [`Error::Storage`].
	pub fn with_file_session(
		config: ClientConfig,
		path: impl Into<PathBuf>,
	) -> Result<(Self, Arc<FileSession>)> {
		let session = Arc::new(FileSession::open(path)?);
		let client = Self::new(config, ReqwestTransport::new()?, session.clone());

		Ok((client, session))
	}
}
impl<T> Clone for AuthenticatedClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: self.transport.clone(),
			hooks: self.hooks.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<T> Debug for AuthenticatedClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedClient")
			.field("base_url", &self.config.base_url().as_str())
			.field("refreshing", &self.coordinator.is_refreshing())
			.finish()
	}
}

fn error_chain(error: &dyn StdError) -> String {
	let mut message = error.to_string();
	let mut source = error.source();

	while let Some(cause) = source {
		message.push_str(": ");
		message.push_str(&cause.to_string());

		source = cause.source();
	}

	message
}
