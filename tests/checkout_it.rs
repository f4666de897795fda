#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use tokio::sync::{Notify, oneshot};
// self
use salesline_client::{
	_preludet::*,
	auth::{PackageId, PaymentIntentId, PaymentMethodId},
	payment::{
		BillingDetails, CardDetails, CheckoutRequest, ClientSecret, PaymentError, PaymentFuture,
		PaymentIntent, PaymentProcessor, StripeProcessor, SubscriptionCheckout,
	},
};

const SUBSCRIBE: &str = "/api/subscriptions/user/packages/";

fn checkout_request() -> CheckoutRequest {
	CheckoutRequest {
		package_id: PackageId::from(7),
		card: CardDetails::new("4242 4242 4242 4242", 12, 2030, "123")
			.expect("Test card should validate."),
		billing: BillingDetails::new("Ada Lovelace", "ada@example.com")
			.expect("Billing fixture should validate."),
	}
}

fn stripe(server: &MockServer) -> StripeProcessor {
	StripeProcessor::new("pk_test_123")
		.expect("Stripe processor should build.")
		.with_api_base(Url::parse(&server.base_url()).expect("Mock server URL should parse."))
}

#[tokio::test]
async fn checkout_confirms_before_reporting_success() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(test_config(&server.base_url()), Some("t1"));
	let tokenize = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/payment_methods").header("authorization", "Bearer pk_test_123");
			then.status(200).header("content-type", "application/json").body("{\"id\":\"pm_1\"}");
		})
		.await;
	let subscribe = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(SUBSCRIBE)
				.header("authorization", "Bearer t1")
				.json_body(serde_json::json!({ "package_id": "7", "payment_method_id": "pm_1" }));
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"subscription\":{\"client_secret\":\"pi_1_secret_abc\"}}");
		})
		.await;
	let confirm = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/payment_intents/pi_1/confirm");
			then.status(200).header("content-type", "application/json").body(
				"{\"id\":\"pi_1\",\"status\":\"succeeded\",\"amount\":4900,\"currency\":\"usd\",\"charges\":{\"data\":[{\"receipt_url\":\"https://pay.example.com/r/1\"}]}}",
			);
		})
		.await;
	let checkout = SubscriptionCheckout::new(client, stripe(&server));
	let receipt =
		checkout.subscribe(&checkout_request()).await.expect("Checkout should succeed.");

	tokenize.assert_async().await;
	subscribe.assert_async().await;
	confirm.assert_async().await;

	assert_eq!(receipt.payment_method_id.as_str(), "pm_1");
	assert_eq!(receipt.payment_intent_id.as_str(), "pi_1");
	assert_eq!(receipt.status, "succeeded");
	assert_eq!(receipt.amount.map(|amount| amount.cents()), Some(4_900));
	assert_eq!(receipt.receipt_url.as_deref(), Some("https://pay.example.com/r/1"));
}

#[tokio::test]
async fn declined_card_stops_before_the_backend() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(test_config(&server.base_url()), Some("t1"));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/payment_methods");
			then.status(402)
				.header("content-type", "application/json")
				.body("{\"error\":{\"code\":\"card_declined\",\"message\":\"Your card was declined.\"}}");
		})
		.await;

	let subscribe = server
		.mock_async(|when, then| {
			when.method(POST).path(SUBSCRIBE);
			then.status(201).body("{}");
		})
		.await;
	let checkout = SubscriptionCheckout::new(client, stripe(&server));
	let err = checkout.subscribe(&checkout_request()).await.expect_err("Declined card should fail.");

	match err {
		Error::Payment(PaymentError::CardInvalid { reason }) => {
			assert_eq!(reason, "Your card was declined.");
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	subscribe.assert_calls_async(0).await;
}

#[tokio::test]
async fn missing_client_secret_never_confirms() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(test_config(&server.base_url()), Some("t1"));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/payment_methods");
			then.status(200).body("{\"id\":\"pm_1\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path(SUBSCRIBE);
			then.status(201).body("{\"subscription\":{}}");
		})
		.await;

	let confirm = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/payment_intents/pi_1/confirm");
			then.status(200).body("{\"id\":\"pi_1\",\"status\":\"succeeded\"}");
		})
		.await;
	let checkout = SubscriptionCheckout::new(client, stripe(&server));
	let err = checkout.subscribe(&checkout_request()).await.expect_err("Missing secret should fail.");

	assert!(matches!(err, Error::Payment(PaymentError::MissingClientSecret)), "{err:?}");

	confirm.assert_calls_async(0).await;
}

#[tokio::test]
async fn unconfirmed_payment_is_not_a_subscription() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(test_config(&server.base_url()), Some("t1"));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/payment_methods");
			then.status(200).body("{\"id\":\"pm_1\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path(SUBSCRIBE);
			then.status(201).body("{\"subscription\":{\"client_secret\":\"pi_1_secret_abc\"}}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/payment_intents/pi_1/confirm");
			then.status(200).body("{\"id\":\"pi_1\",\"status\":\"requires_action\"}");
		})
		.await;

	let checkout = SubscriptionCheckout::new(client, stripe(&server));
	let err = checkout.subscribe(&checkout_request()).await.expect_err("Unconfirmed should fail.");

	match err {
		Error::Payment(PaymentError::PaymentNotConfirmed { status }) => {
			assert_eq!(status, "requires_action");
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
}

/// Holds tokenization open until released so a second checkout can race the first.
struct GatedProcessor {
	entered: Notify,
	release: Mutex<Option<oneshot::Receiver<()>>>,
}
impl PaymentProcessor for GatedProcessor {
	fn create_payment_method<'a>(
		&'a self,
		_: &'a CardDetails,
		_: &'a BillingDetails,
	) -> PaymentFuture<'a, PaymentMethodId> {
		Box::pin(async move {
			let gate = self.release.lock().take();

			self.entered.notify_one();

			if let Some(gate) = gate {
				let _ = gate.await;
			}

			Err(PaymentError::CardInvalid { reason: "released".into() })
		})
	}

	fn confirm_card_payment<'a>(
		&'a self,
		_: &'a ClientSecret,
		_: &'a PaymentMethodId,
	) -> PaymentFuture<'a, PaymentIntent> {
		Box::pin(async move {
			Ok(PaymentIntent {
				id: PaymentIntentId::new("pi_never").expect("Intent fixture should be valid."),
				status: "succeeded".into(),
				amount: None,
				currency: None,
				receipt_url: None,
			})
		})
	}
}

#[tokio::test]
async fn second_checkout_is_rejected_while_one_runs() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(test_config(&server.base_url()), Some("t1"));
	let (release, gate) = oneshot::channel();
	let processor =
		Arc::new(GatedProcessor { entered: Notify::new(), release: Mutex::new(Some(gate)) });
	let checkout = Arc::new(SubscriptionCheckout::<_, GatedProcessor>::new(client, processor.clone()));
	let first = {
		let checkout = checkout.clone();

		tokio::spawn(async move { checkout.subscribe(&checkout_request()).await })
	};

	processor.entered.notified().await;

	let err = checkout
		.subscribe(&checkout_request())
		.await
		.expect_err("Concurrent checkout should be refused.");

	assert!(matches!(err, Error::Payment(PaymentError::AlreadyInProgress)), "{err:?}");

	release.send(()).expect("First checkout should still be waiting.");

	let first = first.await.expect("First checkout task should not panic.");

	assert!(matches!(first, Err(Error::Payment(PaymentError::CardInvalid { .. }))));

	let again = checkout
		.subscribe(&checkout_request())
		.await
		.expect_err("Gate is spent, so tokenization fails immediately.");

	assert!(matches!(again, Error::Payment(PaymentError::CardInvalid { .. })), "{again:?}");
}
