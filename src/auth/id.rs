//! Strongly typed identifiers for backend and payment-processor resources.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "RawId", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}

			/// Returns the identifier as a string slice.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl TryFrom<RawId> for $name {
			type Error = IdentifierError;

			fn try_from(value: RawId) -> Result<Self, Self::Error> {
				Self::try_from(value.into_string())
			}
		}
		impl From<u64> for $name {
			fn from(value: u64) -> Self {
				Self(value.to_string())
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl std::str::FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 255;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (package, user, agent, ...).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (package, user, agent, ...).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (package, user, agent, ...).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Wire form of an identifier; the backend emits numeric ids for some resources.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum RawId {
	/// Numeric identifier.
	Number(u64),
	/// String identifier.
	Text(String),
}
impl RawId {
	fn into_string(self) -> String {
		match self {
			Self::Number(value) => value.to_string(),
			Self::Text(value) => value,
		}
	}
}

def_id! { PackageId, "Identifier of a subscription package.", "Package" }
def_id! { PaymentMethodId, "Opaque reference to tokenized card details.", "PaymentMethod" }
def_id! { PaymentIntentId, "Identifier of a processor-side pending charge.", "PaymentIntent" }
def_id! { UserId, "Identifier of a dashboard account.", "User" }
def_id! { AgentId, "Identifier of an AI calling agent.", "Agent" }
def_id! { CampaignId, "Identifier of an agent's calling campaign.", "Campaign" }
def_id! { CallId, "Identifier of a queued outbound call.", "Call" }

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}
