#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use salesline_client::{
	_preludet::*,
	api::{AgentDraft, AgentStatus, CallStatus, CampaignDraft, OperatingHours},
	auth::AgentId,
};

const AGENT_JSON: &str = "{\"id\":4,\"name\":\"Nova\",\"agent_type\":\"outbound\",\"status\":\"active\",\"voice_tone\":\"calm\",\"total_calls\":10,\"successful_calls\":7,\"active_campaigns_count\":2,\"operating_hours\":{\"start\":\"08:00\",\"end\":\"18:00\"},\"auto_answer_enabled\":true}";

fn nova_draft() -> AgentDraft {
	AgentDraft {
		name: " Nova ".into(),
		agent_type: "outbound".into(),
		status: AgentStatus::Active,
		voice_tone: "calm".into(),
		operating_hours: OperatingHours::default(),
		auto_answer_enabled: true,
		website_url: Some(" ".into()),
	}
}

#[tokio::test]
async fn listing_accepts_every_reply_shape() {
	for body in [
		format!("{{\"success\":true,\"agents\":[{AGENT_JSON}]}}"),
		format!("{{\"agents\":[{AGENT_JSON}]}}"),
		format!("[{AGENT_JSON}]"),
	] {
		let server = MockServer::start_async().await;
		let (client, _) = build_reqwest_test_client(test_config(&server.base_url()), Some("t1"));
		let list = server
			.mock_async(|when, then| {
				when.method(GET).path("/api/agents/").header("authorization", "Bearer t1");
				then.status(200).header("content-type", "application/json").body(body);
			})
			.await;
		let agents = client.agents().list().await.expect("Agent listing should succeed.");

		list.assert_async().await;

		assert_eq!(agents.len(), 1);
		assert_eq!(agents[0].operating_hours.start, "08:00");
		assert_eq!(agents[0].success_rate(), 70);
	}
}

#[tokio::test]
async fn listing_without_agents_is_an_error() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(test_config(&server.base_url()), Some("t1"));

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/agents/");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"success\":false,\"message\":\"no workspace\"}");
		})
		.await;

	let err = client.agents().list().await.expect_err("A failed listing should be reported.");

	assert!(
		matches!(&err, Error::UnexpectedResponse { reason } if reason == "no workspace"),
		"{err:?}"
	);
}

#[tokio::test]
async fn agent_lifecycle_hits_each_endpoint() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(test_config(&server.base_url()), Some("t1"));
	let id = AgentId::from(4);
	let get = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/agents/4/");
			then.status(200)
				.header("content-type", "application/json")
				.body(format!("{{\"success\":true,\"agent\":{AGENT_JSON}}}"));
		})
		.await;
	let create = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/agents/create/").json_body_includes(
				"{\"name\":\"Nova\",\"agent_type\":\"outbound\",\"auto_answer_enabled\":true}",
			);
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"success\":true,\"agent\":{\"id\":4}}");
		})
		.await;
	let update = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path("/api/agents/4/update/")
				.json_body_includes("{\"voice_tone\":\"calm\"}");
			then.status(200).body("{\"success\":true}");
		})
		.await;
	let pause = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path("/api/agents/4/update/")
				.json_body(serde_json::json!({ "status": "paused" }));
			then.status(200).body("{\"success\":true}");
		})
		.await;
	let delete = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/api/agents/4/delete/");
			then.status(204);
		})
		.await;
	let agent = client.agents().get(&id).await.expect("Agent lookup should succeed.");

	assert_eq!(agent.voice_tone, "calm");

	client.agents().create(&nova_draft()).await.expect("Agent creation should succeed.");
	client.agents().update(&id, &AgentDraft::from(&agent)).await.expect("Update should succeed.");
	client
		.agents()
		.set_status(&id, agent.status.toggled())
		.await
		.expect("Pausing should succeed.");
	client.agents().delete(&id).await.expect("Deletion should succeed.");

	get.assert_async().await;
	create.assert_async().await;
	update.assert_async().await;
	pause.assert_async().await;
	delete.assert_async().await;
}

#[tokio::test]
async fn blank_agent_name_never_reaches_the_backend() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(test_config(&server.base_url()), Some("t1"));
	let create = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/agents/create/");
			then.status(201);
		})
		.await;
	let err = client
		.agents()
		.create(&AgentDraft { name: "  ".into(), ..nova_draft() })
		.await
		.expect_err("Blank name should fail locally.");

	create.assert_calls_async(0).await;

	assert!(matches!(&err, Error::Validation(e) if e.field == "name"), "{err:?}");
}

#[tokio::test]
async fn campaigns_are_created_and_filtered_per_agent() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(test_config(&server.base_url()), Some("t1"));
	let create = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/agents/4/campaigns/create/").json_body_includes(
				"{\"name\":\"Spring\",\"status\":\"scheduled\",\"schedule_type\":\"immediate\",\"max_retry_attempts\":3,\"retry_interval_hours\":24,\"target_audience\":\"general\"}",
			);
			then.status(201).body("{\"success\":true}");
		})
		.await;
	let list = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/agents/campaigns/");
			then.status(200).header("content-type", "application/json").body(
				"{\"success\":true,\"campaigns\":[{\"id\":11,\"name\":\"Spring\",\"agent\":4},{\"id\":12,\"name\":\"Other\",\"agent_id\":5},{\"id\":13,\"name\":\"Summer\",\"agent_id\":\"4\"}]}",
			);
		})
		.await;
	let id = AgentId::from(4);

	client
		.agents()
		.create_campaign(&id, &CampaignDraft::new("Spring", "high", "2025-03-01", "2025-03-31"))
		.await
		.expect("Campaign creation should succeed.");

	let campaigns = client.agents().campaigns_for(&id).await.expect("Listing should succeed.");

	create.assert_async().await;
	list.assert_async().await;

	assert_eq!(
		campaigns.iter().map(|campaign| campaign.name.as_str()).collect::<Vec<_>>(),
		["Spring", "Summer"]
	);
}

#[tokio::test]
async fn call_queue_reports_progress() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(test_config(&server.base_url()), Some("t1"));
	let queue = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/agents/4/call-queue/");
			then.status(200).header("content-type", "application/json").body(
				"{\"success\":true,\"queue\":[{\"id\":1,\"contact\":\"Dee\",\"phone\":\"+15550100\",\"status\":\"in_progress\"},{\"id\":2,\"contact\":\"Eve\",\"phone\":\"+15550101\",\"status\":\"completed\",\"outcome\":\"won\"},{\"id\":3,\"contact\":\"Fay\",\"phone\":\"+15550102\",\"status\":\"voicemail\"}]}",
			);
		})
		.await;
	let calls =
		client.agents().call_queue(&AgentId::from(4)).await.expect("Queue lookup should succeed.");

	queue.assert_async().await;

	assert_eq!(
		calls.iter().map(|call| call.status).collect::<Vec<_>>(),
		[CallStatus::InProgress, CallStatus::Completed, CallStatus::Unknown]
	);
	assert_eq!(calls[1].outcome.as_deref(), Some("won"));
}
