//! Authenticated REST client for the Salesline dashboard backend: bearer-token injection,
//! single-flight token refresh with a FIFO wait queue, retry-once recovery, and the card payment
//! confirmation handshake used to subscribe to a package.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod payment;
pub mod refresh;
pub mod store;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		client::AuthenticatedClient,
		config::ClientConfig,
		http::ReqwestTransport,
		store::MemorySession,
	};

	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = AuthenticatedClient<ReqwestTransport>;

	/// Builds a configuration pointing at a local mock server.
	pub fn test_config(base_url: &str) -> ClientConfig {
		ClientConfig::parse(base_url)
			.expect("Mock server base URL should parse.")
			.build()
			.expect("Mock server configuration should validate.")
	}

	/// Constructs a client backed by an in-memory session and the reqwest transport.
	pub fn build_reqwest_test_client(
		config: ClientConfig,
		token: Option<&str>,
	) -> (ReqwestTestClient, Arc<MemorySession>) {
		let session = Arc::new(match token {
			Some(token) => MemorySession::with_token(token),
			None => MemorySession::default(),
		});
		let transport = ReqwestTransport::new().expect("Failed to build reqwest transport for tests.");
		let client = AuthenticatedClient::new(config, transport, session.clone());

		(client, session)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
