// self
use crate::{_prelude::*, error::ValidationError};

/// Monetary amount in minor units (cents), the unit payment processors charge in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);
impl Amount {
	/// Wraps an amount already expressed in cents.
	pub const fn from_cents(cents: u64) -> Self {
		Self(cents)
	}

	/// Converts a dollar amount, rounding to the nearest cent.
	pub fn from_dollars(dollars: f64) -> Result<Self, ValidationError> {
		if !dollars.is_finite() || dollars < 0. {
			return Err(ValidationError::new("amount", "must be a non-negative amount"));
		}

		let cents = (dollars * 100.).round();

		if cents > u64::MAX as f64 {
			return Err(ValidationError::new("amount", "is too large"));
		}

		Ok(Self(cents as u64))
	}

	/// Amount in cents.
	pub const fn cents(self) -> u64 {
		self.0
	}

	/// Amount in dollars.
	pub fn dollars(self) -> f64 {
		self.0 as f64 / 100.
	}
}
impl Display for Amount {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn dollars_round_to_the_nearest_cent() {
		assert_eq!(Amount::from_dollars(49.99).expect("Price should convert.").cents(), 4_999);
		assert_eq!(Amount::from_dollars(0.125).expect("Price should convert.").cents(), 13);
		assert_eq!(Amount::from_dollars(19.994).expect("Price should convert.").cents(), 1_999);
		assert_eq!(Amount::from_cents(1_050).to_string(), "10.50");
		assert_eq!(Amount::from_cents(1_050).dollars(), 10.5);
	}

	#[test]
	fn negative_and_non_finite_amounts_are_rejected() {
		assert!(Amount::from_dollars(-0.01).is_err());
		assert!(Amount::from_dollars(f64::NAN).is_err());
		assert!(Amount::from_dollars(f64::INFINITY).is_err());
	}
}
