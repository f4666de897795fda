//! Card payment confirmation handshake for package subscriptions.
//!
//! A subscription is paid in three sequential steps: the card is tokenized by the payment
//! processor (raw card data never reaches the backend), the backend turns the resulting payment
//! method into a pending charge and returns its confirmation secret, and the processor confirms
//! that charge (3-D Secure included). The subscription counts as active only once the
//! confirmation reports `succeeded`; any failing step aborts the whole checkout.

mod amount;
#[cfg(feature = "reqwest")] mod stripe;

pub use amount::Amount;
#[cfg(feature = "reqwest")] pub use stripe::StripeProcessor;

// self
use crate::{
	_prelude::*,
	auth::{PackageId, PaymentIntentId, PaymentMethodId},
	client::AuthenticatedClient,
	error::ValidationError,
	http::HttpTransport,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
};

const MAX_EXPIRY_YEARS_AHEAD: i32 = 50;

/// Terminal confirmation status of a paid intent.
pub const SUCCEEDED: &str = "succeeded";

/// Boxed future returned by [`PaymentProcessor`] methods.
pub type PaymentFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PaymentError>> + 'a + Send>>;

/// Payment handshake failure.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum PaymentError {
	/// The processor refused to tokenize the card.
	#[error("CARD_INVALID: {reason}")]
	CardInvalid {
		/// Processor or local validation message.
		reason: String,
	},
	/// The backend did not return a confirmation secret for the pending charge.
	#[error("MISSING_CLIENT_SECRET: the backend did not return a client secret.")]
	MissingClientSecret,
	/// Confirmation finished in a non-terminal or failed state.
	#[error("PAYMENT_NOT_CONFIRMED: the payment ended with status `{status}`.")]
	PaymentNotConfirmed {
		/// Status reported by the processor.
		status: String,
	},
	/// Another checkout is still running on this handle.
	#[error("CHECKOUT_IN_PROGRESS: a checkout is already in progress.")]
	AlreadyInProgress,
	/// The processor could not be reached or returned an unexpected reply.
	#[error("PROCESSOR_ERROR: {message}")]
	Processor {
		/// Processor or transport message.
		message: String,
		/// HTTP status, when a response was received.
		status: Option<u16>,
	},
}
impl PaymentError {
	/// Returns the stable error code.
	pub const fn code(&self) -> &'static str {
		match self {
			Self::CardInvalid { .. } => "CARD_INVALID",
			Self::MissingClientSecret => "MISSING_CLIENT_SECRET",
			Self::PaymentNotConfirmed { .. } => "PAYMENT_NOT_CONFIRMED",
			Self::AlreadyInProgress => "CHECKOUT_IN_PROGRESS",
			Self::Processor { .. } => "PROCESSOR_ERROR",
		}
	}
}

/// Confirmation secret of a pending charge. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSecret(String);
impl ClientSecret {
	/// Wraps a secret issued by the backend.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw secret for the processor call.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Identifier of the intent the secret belongs to (`pi_x_secret_y` → `pi_x`).
	pub fn payment_intent_id(&self) -> Option<PaymentIntentId> {
		let (id, _) = self.0.split_once("_secret_")?;

		PaymentIntentId::new(id).ok()
	}
}
impl Debug for ClientSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ClientSecret").field(&"<redacted>").finish()
	}
}

/// Raw card input. Only ever handed to the payment processor.
#[derive(Clone)]
pub struct CardDetails {
	number: String,
	exp_month: u8,
	exp_year: u16,
	cvc: String,
}
impl CardDetails {
	/// Validates the card locally: Luhn checksum, a four-digit expiry that has not passed, and the
	/// CVC length.
	pub fn new(
		number: impl AsRef<str>,
		exp_month: u8,
		exp_year: u16,
		cvc: impl Into<String>,
	) -> Result<Self, PaymentError> {
		let number: String =
			number.as_ref().chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
		let cvc = cvc.into();
		let invalid = |reason: &str| PaymentError::CardInvalid { reason: reason.to_owned() };

		if !(12..=19).contains(&number.len()) || !passes_luhn(&number) {
			return Err(invalid("card number is invalid"));
		}
		if !(1..=12).contains(&exp_month) {
			return Err(invalid("expiry month is invalid"));
		}
		if let Some(reason) = expiry_problem(exp_month, exp_year, OffsetDateTime::now_utc()) {
			return Err(invalid(reason));
		}
		if !(3..=4).contains(&cvc.len()) || !cvc.bytes().all(|b| b.is_ascii_digit()) {
			return Err(invalid("security code is invalid"));
		}

		Ok(Self { number, exp_month, exp_year, cvc })
	}

	/// Last four digits, safe to display.
	pub fn last4(&self) -> &str {
		&self.number[self.number.len() - 4..]
	}

	pub(crate) fn number(&self) -> &str {
		&self.number
	}

	pub(crate) fn exp_month(&self) -> u8 {
		self.exp_month
	}

	pub(crate) fn exp_year(&self) -> u16 {
		self.exp_year
	}

	pub(crate) fn cvc(&self) -> &str {
		&self.cvc
	}
}
impl Debug for CardDetails {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CardDetails")
			.field("last4", &self.last4())
			.field("exp_month", &self.exp_month)
			.field("exp_year", &self.exp_year)
			.finish_non_exhaustive()
	}
}

/// Cards stay valid through the last day of their expiry month.
fn expiry_problem(exp_month: u8, exp_year: u16, now: OffsetDateTime) -> Option<&'static str> {
	let year = i32::from(exp_year);

	if !(1000..=9999).contains(&year) || year > now.year() + MAX_EXPIRY_YEARS_AHEAD {
		return Some("expiry year is invalid");
	}
	if (year, exp_month) < (now.year(), u8::from(now.month())) {
		return Some("card has expired");
	}

	None
}

fn passes_luhn(number: &str) -> bool {
	let mut sum = 0;

	for (idx, byte) in number.bytes().rev().enumerate() {
		if !byte.is_ascii_digit() {
			return false;
		}

		let mut digit = u32::from(byte - b'0');

		if idx % 2 == 1 {
			digit *= 2;

			if digit > 9 {
				digit -= 9;
			}
		}

		sum += digit;
	}

	sum % 10 == 0
}

/// Cardholder details attached to the payment method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BillingDetails {
	/// Cardholder name.
	pub name: String,
	/// Receipt email.
	pub email: String,
}
impl BillingDetails {
	/// Validates a non-empty name and an email containing `@`.
	pub fn new(name: impl AsRef<str>, email: impl AsRef<str>) -> Result<Self, ValidationError> {
		let name = name.as_ref().trim();
		let email = email.as_ref().trim();

		if name.is_empty() {
			return Err(ValidationError::new("name", "must not be empty"));
		}
		if !email.contains('@') {
			return Err(ValidationError::new("email", "must be an email address"));
		}

		Ok(Self { name: name.to_owned(), email: email.to_owned() })
	}
}

/// Processor-side view of a confirmed (or failed) charge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentIntent {
	/// Intent identifier.
	pub id: PaymentIntentId,
	/// Processor status; [`SUCCEEDED`] is the only terminal success.
	pub status: String,
	/// Charged amount, when reported.
	pub amount: Option<Amount>,
	/// ISO currency code, when reported.
	pub currency: Option<String>,
	/// Receipt link, when reported.
	pub receipt_url: Option<String>,
}
impl PaymentIntent {
	/// Returns `true` once the charge has gone through.
	pub fn is_succeeded(&self) -> bool {
		self.status == SUCCEEDED
	}
}

/// Card tokenization and confirmation provided by a payment processor SDK.
pub trait PaymentProcessor
where
	Self: 'static + Send + Sync,
{
	/// Tokenizes the card into an opaque payment method.
	fn create_payment_method<'a>(
		&'a self,
		card: &'a CardDetails,
		billing: &'a BillingDetails,
	) -> PaymentFuture<'a, PaymentMethodId>;

	/// Completes the pending charge identified by `client_secret` with `payment_method`.
	fn confirm_card_payment<'a>(
		&'a self,
		client_secret: &'a ClientSecret,
		payment_method: &'a PaymentMethodId,
	) -> PaymentFuture<'a, PaymentIntent>;
}

/// Everything needed to subscribe to a package.
#[derive(Clone, Debug)]
pub struct CheckoutRequest {
	/// Package being purchased.
	pub package_id: PackageId,
	/// Card to charge.
	pub card: CardDetails,
	/// Cardholder details.
	pub billing: BillingDetails,
}

/// Proof of a confirmed subscription payment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionReceipt {
	/// Package purchased.
	pub package_id: PackageId,
	/// Payment method charged.
	pub payment_method_id: PaymentMethodId,
	/// Confirmed intent.
	pub payment_intent_id: PaymentIntentId,
	/// Final processor status (always [`SUCCEEDED`]).
	pub status: String,
	/// Charged amount, when reported.
	pub amount: Option<Amount>,
	/// ISO currency code, when reported.
	pub currency: Option<String>,
	/// Receipt link, when reported.
	pub receipt_url: Option<String>,
	/// Cardholder details used.
	pub billing: BillingDetails,
}

#[derive(Serialize)]
struct SubscribeRequest<'a> {
	package_id: &'a PackageId,
	payment_method_id: &'a PaymentMethodId,
}

#[derive(Debug, Deserialize)]
struct SubscribeReply {
	#[serde(default)]
	subscription: Option<PendingSubscription>,
}

#[derive(Debug, Deserialize)]
struct PendingSubscription {
	#[serde(default)]
	client_secret: Option<String>,
}

/// Runs the subscription payment handshake, one checkout at a time.
pub struct SubscriptionCheckout<T, P>
where
	T: ?Sized + HttpTransport,
	P: ?Sized + PaymentProcessor,
{
	/// Authenticated backend client.
	pub client: AuthenticatedClient<T>,
	/// Payment processor used for tokenization and confirmation.
	pub processor: Arc<P>,
	in_progress: AsyncMutex<()>,
}
impl<T, P> SubscriptionCheckout<T, P>
where
	T: ?Sized + HttpTransport,
	P: ?Sized + PaymentProcessor,
{
	/// Creates a checkout over the client and processor.
	pub fn new(client: AuthenticatedClient<T>, processor: impl Into<Arc<P>>) -> Self {
		Self { client, processor: processor.into(), in_progress: AsyncMutex::new(()) }
	}

	/// Subscribes to a package, charging the card.
	///
	/// Steps run strictly in order and the first failure aborts the checkout. A second call
	/// made while one is running fails with [`PaymentError::AlreadyInProgress`] rather than
	/// charging twice.
	pub async fn subscribe(&self, request: &CheckoutRequest) -> Result<SubscriptionReceipt> {
		const KIND: OperationKind = OperationKind::Checkout;

		let span = OperationSpan::new(KIND, "subscribe");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async {
				let _checkout = self.in_progress.try_lock().ok_or(PaymentError::AlreadyInProgress)?;

				self.run_handshake(request).await
			})
			.await;

		obs::record_operation_outcome(KIND, OperationOutcome::of(&result));

		result
	}

	async fn run_handshake(&self, request: &CheckoutRequest) -> Result<SubscriptionReceipt> {
		let payment_method_id =
			self.processor.create_payment_method(&request.card, &request.billing).await?;

		#[cfg(feature = "tracing")]
		tracing::debug!(payment_method = %payment_method_id, "card tokenized");

		let reply: SubscribeReply = self
			.client
			.post_json(
				self.client.config.subscribe_path(),
				&SubscribeRequest {
					package_id: &request.package_id,
					payment_method_id: &payment_method_id,
				},
			)
			.await?;
		let client_secret = reply
			.subscription
			.and_then(|subscription| subscription.client_secret)
			.filter(|secret| !secret.is_empty())
			.map(ClientSecret::new)
			.ok_or(PaymentError::MissingClientSecret)?;

		#[cfg(feature = "tracing")]
		tracing::debug!("client secret received");

		let intent =
			self.processor.confirm_card_payment(&client_secret, &payment_method_id).await?;

		if !intent.is_succeeded() {
			return Err(PaymentError::PaymentNotConfirmed { status: intent.status }.into());
		}

		#[cfg(feature = "tracing")]
		tracing::info!(payment_intent = %intent.id, "subscription payment confirmed");

		Ok(SubscriptionReceipt {
			package_id: request.package_id.clone(),
			payment_method_id,
			payment_intent_id: intent.id,
			status: intent.status,
			amount: intent.amount,
			currency: intent.currency,
			receipt_url: intent.receipt_url,
			billing: request.billing.clone(),
		})
	}
}
impl<T, P> Debug for SubscriptionCheckout<T, P>
where
	T: ?Sized + HttpTransport,
	P: ?Sized + PaymentProcessor,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SubscriptionCheckout").field("client", &self.client).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const VISA: &str = "4242 4242 4242 4242";

	#[test]
	fn expiry_must_be_a_current_four_digit_date() {
		let now = time::macros::datetime!(2026-10-19 12:00 UTC);

		assert_eq!(expiry_problem(10, 2026, now), None);
		assert_eq!(expiry_problem(1, 2030, now), None);
		assert_eq!(expiry_problem(9, 2026, now), Some("card has expired"));
		assert_eq!(expiry_problem(12, 2025, now), Some("card has expired"));
		assert_eq!(expiry_problem(12, 0, now), Some("expiry year is invalid"));
		assert_eq!(expiry_problem(12, 30, now), Some("expiry year is invalid"));
		assert_eq!(expiry_problem(12, 2090, now), Some("expiry year is invalid"));

		let err = CardDetails::new(VISA, 12, 0, "123").expect_err("Year zero should be rejected.");

		assert!(matches!(
			err,
			PaymentError::CardInvalid { reason } if reason == "expiry year is invalid"
		));
	}

	#[test]
	fn card_details_are_checked_locally_and_redacted() {
		let card = CardDetails::new(VISA, 12, 2030, "123").expect("Test card should validate.");

		assert_eq!(card.last4(), "4242");
		assert!(!format!("{card:?}").contains("4242424242424242"));
		assert!(!format!("{card:?}").contains("123"));

		for (number, month, cvc) in
			[("4242 4242 4242 4241", 12, "123"), (VISA, 13, "123"), (VISA, 1, "12a")]
		{
			let err = CardDetails::new(number, month, 2030, cvc)
				.expect_err("Malformed card should be rejected.");

			assert_eq!(err.code(), "CARD_INVALID");
		}
	}

	#[test]
	fn billing_details_require_name_and_email() {
		assert!(BillingDetails::new("Ada", "ada@example.com").is_ok());
		assert_eq!(
			BillingDetails::new(" ", "ada@example.com").expect_err("Blank name should fail.").field,
			"name"
		);
		assert_eq!(
			BillingDetails::new("Ada", "ada.example.com").expect_err("Bad email should fail.").field,
			"email"
		);
	}

	#[test]
	fn client_secret_yields_intent_id_and_stays_redacted() {
		let secret = ClientSecret::new("pi_3Nabc_secret_xyz");

		assert_eq!(secret.payment_intent_id().map(String::from), Some("pi_3Nabc".to_owned()));
		assert_eq!(format!("{secret:?}"), "ClientSecret(\"<redacted>\")");
		assert_eq!(ClientSecret::new("opaque").payment_intent_id(), None);
	}

	#[test]
	fn payment_error_messages_lead_with_their_code() {
		let err = PaymentError::PaymentNotConfirmed { status: "requires_action".into() };

		assert!(err.to_string().starts_with(err.code()));
		assert!(err.to_string().contains("requires_action"));
	}
}
