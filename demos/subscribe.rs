//! Walks a subscriber through sign-in, package selection, and a card checkout against a local
//! mock of both the backend and the payment processor.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use salesline_client::{
	api,
	auth::SessionHooks,
	client::AuthenticatedClient,
	config::ClientConfig,
	payment::{BillingDetails, CardDetails, CheckoutRequest, StripeProcessor, SubscriptionCheckout},
	store::MemorySession,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/login/");
			then.status(200).header("content-type", "application/json").body(
				"{\"tokens\":{\"access\":\"demo-access\"},\"user\":{\"name\":\"Ada\",\"email\":\"ada@example.com\",\"role\":\"user\"}}",
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/accounts/users/data/");
			then.status(200).header("content-type", "application/json").body(
				"{\"name\":\"Ada\",\"email\":\"ada@example.com\",\"role\":\"user\",\"has_subscription\":false}",
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/subscriptions/admin/packages/");
			then.status(200).header("content-type", "application/json").body(
				"{\"success\":true,\"message\":\"ok\",\"packages\":[{\"id\":1,\"name\":\"Starter\",\"price_monthly\":\"29.00\",\"minutes_total_limit\":500,\"is_active\":true}]}",
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/payment_methods");
			then.status(200).header("content-type", "application/json").body("{\"id\":\"pm_demo\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/subscriptions/user/packages/");
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"subscription\":{\"client_secret\":\"pi_demo_secret_1\"}}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/payment_intents/pi_demo/confirm");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":\"pi_demo\",\"status\":\"succeeded\",\"amount\":2900,\"currency\":\"usd\"}");
		})
		.await;

	let session = Arc::new(MemorySession::default());
	let config = ClientConfig::parse(&server.base_url())?.build()?;
	let client = AuthenticatedClient::with_reqwest(config, session.clone())?;
	let user = client.session().login("ada@example.com", "hunter2").await?;

	println!("Signed in as {}; next stop {}.", user.name, api::landing_route(&user).path());

	let packages = client.packages().list().await?;
	let Some(package) = packages.iter().find(|package| package.is_active) else {
		println!("No active package is available.");

		return Ok(());
	};

	println!("Subscribing to {} at ${}/month.", package.name, package.monthly_amount()?);

	let processor =
		StripeProcessor::new("pk_test_demo")?.with_api_base(Url::parse(&server.base_url())?);
	let checkout = SubscriptionCheckout::new(client, processor);
	let receipt = checkout
		.subscribe(&CheckoutRequest {
			package_id: package.id.clone(),
			card: CardDetails::new("4242 4242 4242 4242", 12, 2030, "123")?,
			billing: BillingDetails::new(&user.name, &user.email)?,
		})
		.await?;

	println!(
		"Payment {} {}; token present: {}.",
		receipt.payment_intent_id,
		receipt.status,
		session.access_token().is_some()
	);

	Ok(())
}
