//! File-backed session that mirrors the access token to disk so it survives restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, SessionHooks},
	store::{MemorySession, StoreError},
};

/// On-disk snapshot layout.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
	access: Option<AccessToken>,
	saved_at: OffsetDateTime,
}

/// Persists the access token to a JSON file after each mutation.
///
/// The in-memory value is authoritative: a failed write is logged and the session keeps
/// working, it just will not survive the next restart.
#[derive(Debug)]
pub struct FileSession {
	path: PathBuf,
	session: MemorySession,
}
impl FileSession {
	/// Opens (or creates) a session at the provided path, eagerly loading a mirrored token.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let session = MemorySession::default();

		session.replace(Self::load_snapshot(&path)?.and_then(|snapshot| snapshot.access));

		Ok(Self { path, session })
	}

	/// Location of the mirrored snapshot.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Returns `true` once an unrecoverable authorization failure ended the session.
	pub fn session_expired(&self) -> bool {
		self.session.session_expired()
	}

	/// Returns how many times the logout callback fired.
	pub fn logout_count(&self) -> u64 {
		self.session.logout_count()
	}

	/// Writes the current token to disk immediately.
	pub fn persist(&self) -> Result<(), StoreError> {
		self.write_snapshot(self.session.access_token())
	}

	fn load_snapshot(path: &Path) -> Result<Option<Snapshot>, StoreError> {
		if !path.exists() {
			return Ok(None);
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(None);
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let snapshot = serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})?;

		Ok(Some(snapshot))
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create session directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn write_snapshot(&self, access: Option<AccessToken>) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let snapshot = Snapshot { access, saved_at: OffsetDateTime::now_utc() };
		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize session snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn mirror(&self) {
		if let Err(e) = self.persist() {
			#[cfg(feature = "tracing")]
			tracing::warn!(path = %self.path.display(), error = %e, "failed to mirror access token");
			#[cfg(not(feature = "tracing"))]
			let _ = e;
		}
	}
}
impl SessionHooks for FileSession {
	fn access_token(&self) -> Option<AccessToken> {
		self.session.access_token()
	}

	fn set_access_token(&self, token: AccessToken) {
		self.session.set_access_token(token);
		self.mirror();
	}

	fn clear_access_token(&self) {
		self.session.clear_access_token();
		self.mirror();
	}

	fn on_logout(&self) {
		self.session.on_logout();
		self.mirror();
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn temp_path(label: &str) -> PathBuf {
		let unique = format!(
			"salesline_file_session_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn token_survives_reopen() {
		let path = temp_path("reopen");
		let session = FileSession::open(&path).expect("Failed to open file session.");

		assert!(session.access_token().is_none());

		session.set_access_token(AccessToken::new("persisted"));
		drop(session);

		let reopened = FileSession::open(&path).expect("Failed to reopen file session.");

		assert_eq!(
			reopened.access_token().as_ref().map(AccessToken::expose),
			Some("persisted"),
			"Mirrored token should be restored on open."
		);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary session snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn logout_erases_mirrored_token() {
		let path = temp_path("logout");
		let session = FileSession::open(&path).expect("Failed to open file session.");

		session.set_access_token(AccessToken::new("doomed"));
		session.on_logout();

		assert!(session.session_expired());
		assert_eq!(session.logout_count(), 1);

		let reopened = FileSession::open(&path).expect("Failed to reopen file session.");

		assert!(reopened.access_token().is_none());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary session snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupt_snapshot_is_reported() {
		let path = temp_path("corrupt");

		fs::write(&path, b"not json").expect("Failed to write corrupt snapshot fixture.");

		let err = FileSession::open(&path).expect_err("Corrupt snapshot should be rejected.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary session snapshot {}: {e}", path.display())
		});
	}
}
