//! Stripe's public REST API, authenticated with a publishable key.

// crates.io
use url::form_urlencoded::Serializer as FormSerializer;
// self
use crate::{
	_prelude::*,
	auth::{PaymentIntentId, PaymentMethodId},
	error::ConfigError,
	payment::{
		Amount, BillingDetails, CardDetails, ClientSecret, PaymentError, PaymentFuture,
		PaymentIntent, PaymentProcessor,
	},
};

const STRIPE_API_BASE: &str = "https://api.stripe.com/";

#[derive(Debug, Deserialize)]
struct StripeErrorReply {
	error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
	#[serde(default)]
	message: Option<String>,
	#[serde(default)]
	code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentMethodReply {
	id: PaymentMethodId,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentReply {
	id: PaymentIntentId,
	status: String,
	#[serde(default)]
	amount: Option<Amount>,
	#[serde(default)]
	currency: Option<String>,
	#[serde(default)]
	charges: Option<ChargeList>,
}

#[derive(Debug, Deserialize)]
struct ChargeList {
	#[serde(default)]
	data: Vec<Charge>,
}

#[derive(Debug, Deserialize)]
struct Charge {
	#[serde(default)]
	receipt_url: Option<String>,
}

/// [`PaymentProcessor`] backed by Stripe's REST API.
///
/// Only endpoints callable with a publishable key are used, so the secret key stays on the
/// backend. Card data is sent to Stripe directly and nowhere else.
#[derive(Clone)]
pub struct StripeProcessor {
	client: ReqwestClient,
	api_base: Url,
	publishable_key: String,
}
impl StripeProcessor {
	/// Creates a processor for the publishable key against the production API.
	pub fn new(publishable_key: impl Into<String>) -> Result<Self, ConfigError> {
		let api_base =
			Url::parse(STRIPE_API_BASE).map_err(|source| ConfigError::InvalidUrl { source })?;
		let client = ReqwestClient::builder().build()?;

		Ok(Self { client, api_base, publishable_key: publishable_key.into() })
	}

	/// Points the processor at another API base (a mock server, typically).
	pub fn with_api_base(mut self, api_base: Url) -> Self {
		self.api_base = api_base;

		self
	}

	async fn post_form<R>(&self, path: &str, form: String) -> Result<R, PaymentError>
	where
		R: DeserializeOwned,
	{
		let url = self.api_base.join(path).map_err(|e| PaymentError::Processor {
			message: format!("invalid processor endpoint `{path}`: {e}"),
			status: None,
		})?;
		let response = self
			.client
			.post(url)
			.bearer_auth(&self.publishable_key)
			.header("content-type", "application/x-www-form-urlencoded")
			.body(form)
			.send()
			.await
			.map_err(|e| PaymentError::Processor { message: e.to_string(), status: None })?;
		let status = response.status().as_u16();
		let body = response
			.bytes()
			.await
			.map_err(|e| PaymentError::Processor { message: e.to_string(), status: Some(status) })?;

		if !(200..300).contains(&status) {
			let message = serde_json::from_slice::<StripeErrorReply>(&body)
				.ok()
				.and_then(|reply| reply.error.message.or(reply.error.code))
				.unwrap_or_else(|| format!("processor responded with HTTP {status}"));

			return Err(PaymentError::Processor { message, status: Some(status) });
		}

		serde_json::from_slice(&body).map_err(|e| PaymentError::Processor {
			message: format!("malformed processor reply: {e}"),
			status: Some(status),
		})
	}
}
impl Debug for StripeProcessor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StripeProcessor").field("api_base", &self.api_base.as_str()).finish()
	}
}
impl PaymentProcessor for StripeProcessor {
	fn create_payment_method<'a>(
		&'a self,
		card: &'a CardDetails,
		billing: &'a BillingDetails,
	) -> PaymentFuture<'a, PaymentMethodId> {
		Box::pin(async move {
			let form = FormSerializer::new(String::new())
				.append_pair("type", "card")
				.append_pair("card[number]", card.number())
				.append_pair("card[exp_month]", &card.exp_month().to_string())
				.append_pair("card[exp_year]", &card.exp_year().to_string())
				.append_pair("card[cvc]", card.cvc())
				.append_pair("billing_details[name]", &billing.name)
				.append_pair("billing_details[email]", &billing.email)
				.finish();

			match self.post_form::<PaymentMethodReply>("v1/payment_methods", form).await {
				Ok(reply) => Ok(reply.id),
				// A 4xx here is Stripe refusing the card itself.
				Err(PaymentError::Processor { message, status: Some(400..=499) }) =>
					Err(PaymentError::CardInvalid { reason: message }),
				Err(e) => Err(e),
			}
		})
	}

	fn confirm_card_payment<'a>(
		&'a self,
		client_secret: &'a ClientSecret,
		payment_method: &'a PaymentMethodId,
	) -> PaymentFuture<'a, PaymentIntent> {
		Box::pin(async move {
			let intent_id = client_secret.payment_intent_id().ok_or_else(|| {
				PaymentError::Processor {
					message: "client secret does not name a payment intent".into(),
					status: None,
				}
			})?;
			let form = FormSerializer::new(String::new())
				.append_pair("client_secret", client_secret.expose())
				.append_pair("payment_method", payment_method.as_str())
				.finish();
			let path = format!("v1/payment_intents/{intent_id}/confirm");
			let reply = self.post_form::<PaymentIntentReply>(&path, form).await?;
			let receipt_url = reply
				.charges
				.and_then(|charges| charges.data.into_iter().next())
				.and_then(|charge| charge.receipt_url);

			Ok(PaymentIntent {
				id: reply.id,
				status: reply.status,
				amount: reply.amount,
				currency: reply.currency,
				receipt_url,
			})
		})
	}
}
