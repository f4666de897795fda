//! Built-in [`SessionHooks`](crate::auth::SessionHooks) implementations that hold the access
//! token between requests.

pub mod file;
pub mod memory;

pub use file::FileSession;
pub use memory::MemorySession;

// self
use crate::_prelude::*;

/// Error type produced by persistent session stores.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
