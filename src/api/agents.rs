//! AI calling agents, their campaigns, and their outbound call queues.
//!
//! Knowledge-file uploads ride on multipart forms in the dashboard; this client sends agent and
//! campaign payloads as JSON only.

// crates.io
use serde::Deserializer;
// self
use crate::{
	_prelude::*,
	api,
	auth::{AgentId, CallId, CampaignId},
	client::AuthenticatedClient,
	error::ValidationError,
	http::{ApiRequest, ApiResponse, HttpTransport},
};

/// Collection path of the agent endpoints.
pub const AGENTS_PATH: &str = "/api/agents/";
/// Path of the cross-agent campaign listing.
pub const CAMPAIGNS_PATH: &str = "/api/agents/campaigns/";

/// Run state of an agent. Unknown states read as [`AgentStatus::Inactive`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
	/// Taking and placing calls.
	#[default]
	Active,
	/// Temporarily halted by the owner.
	Paused,
	/// Any other state reported by the backend.
	#[serde(other)]
	Inactive,
}
impl AgentStatus {
	/// State the dashboard's pause/resume switch moves to.
	pub const fn toggled(self) -> Self {
		match self {
			Self::Active => Self::Paused,
			Self::Paused | Self::Inactive => Self::Active,
		}
	}
}

/// Daily window in which an agent works.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingHours {
	/// Opening time, `HH:MM`.
	#[serde(default = "OperatingHours::default_start")]
	pub start: String,
	/// Closing time, `HH:MM`.
	#[serde(default = "OperatingHours::default_end")]
	pub end: String,
	/// IANA time zone, when set.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timezone: Option<String>,
	/// Working days, when restricted.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub working_days: Vec<String>,
}
impl OperatingHours {
	fn default_start() -> String {
		"09:00".into()
	}

	fn default_end() -> String {
		"17:00".into()
	}
}
impl Default for OperatingHours {
	fn default() -> Self {
		Self {
			start: Self::default_start(),
			end: Self::default_end(),
			timezone: None,
			working_days: Vec::new(),
		}
	}
}

/// Agent as reported by the backend.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Agent {
	/// Agent identifier.
	pub id: AgentId,
	/// Display name.
	#[serde(default)]
	pub name: String,
	/// `inbound`, `outbound`, or a backend-defined kind.
	#[serde(default = "default_agent_type")]
	pub agent_type: String,
	/// Run state.
	#[serde(default)]
	pub status: AgentStatus,
	/// Voice persona.
	#[serde(default = "default_voice_tone")]
	pub voice_tone: String,
	/// Calls handled.
	#[serde(default)]
	pub total_calls: u64,
	/// Calls that reached their objective.
	#[serde(default)]
	pub successful_calls: u64,
	/// Campaigns currently running.
	#[serde(default)]
	pub active_campaigns_count: u32,
	/// Working window.
	#[serde(default, deserialize_with = "null_as_default")]
	pub operating_hours: OperatingHours,
	/// Whether inbound calls are picked up automatically.
	#[serde(default)]
	pub auto_answer_enabled: bool,
	/// Website the agent draws business knowledge from.
	#[serde(default)]
	pub website_url: Option<String>,
	/// Last call activity (ISO 8601).
	#[serde(default)]
	pub last_activity: Option<String>,
	/// Last configuration change (ISO 8601).
	#[serde(default)]
	pub updated_at: Option<String>,
}
impl Agent {
	/// Share of successful calls, as a whole percentage.
	pub fn success_rate(&self) -> u32 {
		let rate = self.successful_calls as f64 / self.total_calls.max(1) as f64 * 100.;

		rate.round().min(100.) as u32
	}

	/// Most recent sign of life: call activity, else the last configuration change.
	pub fn last_active(&self) -> Option<&str> {
		self.last_activity.as_deref().or(self.updated_at.as_deref())
	}
}

/// Create/update payload for an agent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AgentDraft {
	/// Display name.
	pub name: String,
	/// `inbound`, `outbound`, or a backend-defined kind.
	pub agent_type: String,
	/// Run state.
	pub status: AgentStatus,
	/// Voice persona.
	pub voice_tone: String,
	/// Working window.
	pub operating_hours: OperatingHours,
	/// Whether inbound calls are picked up automatically.
	pub auto_answer_enabled: bool,
	/// Website the agent draws business knowledge from.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub website_url: Option<String>,
}
impl AgentDraft {
	/// Validates the draft and returns the payload that will be sent.
	pub fn validate(&self) -> Result<Self, ValidationError> {
		let name = self.name.trim();

		if name.is_empty() {
			return Err(ValidationError::new("name", "must not be empty"));
		}
		if self.agent_type.trim().is_empty() {
			return Err(ValidationError::new("agent_type", "must not be empty"));
		}

		let mut draft = self.clone();

		draft.name = name.to_owned();
		draft.website_url = draft.website_url.filter(|url| !url.trim().is_empty());

		Ok(draft)
	}
}
impl From<&Agent> for AgentDraft {
	fn from(agent: &Agent) -> Self {
		Self {
			name: agent.name.clone(),
			agent_type: agent.agent_type.clone(),
			status: agent.status,
			voice_tone: agent.voice_tone.clone(),
			operating_hours: agent.operating_hours.clone(),
			auto_answer_enabled: agent.auto_answer_enabled,
			website_url: agent.website_url.clone(),
		}
	}
}

/// Campaign to schedule on an agent.
///
/// [`CampaignDraft::new`] fills the same defaults the dashboard form submits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CampaignDraft {
	/// Campaign name.
	pub name: String,
	/// Free-form description.
	pub description: String,
	/// Initial state, `scheduled` by default.
	pub status: String,
	/// `immediate` or `scheduled`.
	pub schedule_type: String,
	/// Start moment for scheduled campaigns (ISO 8601).
	pub scheduled_start: Option<String>,
	/// Queue priority.
	pub priority: String,
	/// First calling day.
	pub start_date: String,
	/// Last calling day.
	pub end_date: String,
	/// Whether failed calls are retried.
	pub retry_failed_calls: bool,
	/// Retry budget per contact.
	pub max_retry_attempts: u32,
	/// Hours between retries.
	pub retry_interval_hours: u32,
	/// Audience segment.
	pub target_audience: String,
	/// What a successful call achieves.
	pub call_objective: String,
	/// Script read before the conversation.
	pub pre_call_script: String,
	/// Follow-ups after each call.
	pub post_call_actions: Vec<String>,
	/// Conditions marking a call as won.
	pub success_criteria: Vec<String>,
	/// Internal notes.
	pub notes: String,
}
impl CampaignDraft {
	/// Creates an immediate campaign with the dashboard's defaults.
	pub fn new(
		name: impl Into<String>,
		priority: impl Into<String>,
		start_date: impl Into<String>,
		end_date: impl Into<String>,
	) -> Self {
		Self {
			name: name.into(),
			description: String::new(),
			status: "scheduled".into(),
			schedule_type: "immediate".into(),
			scheduled_start: None,
			priority: priority.into(),
			start_date: start_date.into(),
			end_date: end_date.into(),
			retry_failed_calls: false,
			max_retry_attempts: 3,
			retry_interval_hours: 24,
			target_audience: "general".into(),
			call_objective: String::new(),
			pre_call_script: String::new(),
			post_call_actions: Vec::new(),
			success_criteria: Vec::new(),
			notes: String::new(),
		}
	}

	/// Validates the draft.
	///
	/// Zero retry settings fall back to the defaults, matching the dashboard form.
	pub fn validate(&self) -> Result<Self, ValidationError> {
		if self.name.trim().is_empty() {
			return Err(ValidationError::new("name", "must not be empty"));
		}
		if self.start_date.trim().is_empty() {
			return Err(ValidationError::new("start_date", "must not be empty"));
		}
		if self.end_date.trim().is_empty() {
			return Err(ValidationError::new("end_date", "must not be empty"));
		}
		if self.schedule_type == "scheduled" && self.scheduled_start.is_none() {
			return Err(ValidationError::new(
				"scheduled_start",
				"is required for scheduled campaigns",
			));
		}

		let mut draft = self.clone();

		draft.name = draft.name.trim().to_owned();

		if draft.max_retry_attempts == 0 {
			draft.max_retry_attempts = 3;
		}
		if draft.retry_interval_hours == 0 {
			draft.retry_interval_hours = 24;
		}

		Ok(draft)
	}
}

/// Campaign as listed by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Campaign {
	/// Campaign identifier.
	pub id: CampaignId,
	/// Campaign name.
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	agent: Option<AgentId>,
	#[serde(default)]
	agent_id: Option<AgentId>,
	/// Current state.
	#[serde(default)]
	pub status: Option<String>,
	/// `immediate` or `scheduled`.
	#[serde(default)]
	pub schedule_type: Option<String>,
	/// Start moment for scheduled campaigns.
	#[serde(default)]
	pub scheduled_start: Option<String>,
	/// Queue priority.
	#[serde(default)]
	pub priority: Option<String>,
	/// Audience segment.
	#[serde(default)]
	pub target_audience: Option<String>,
	/// Number of contacts to call.
	#[serde(default)]
	pub total_contacts: Option<u64>,
}
impl Campaign {
	/// Agent running the campaign; the backend names the field `agent` or `agent_id`.
	pub fn agent(&self) -> Option<&AgentId> {
		self.agent.as_ref().or(self.agent_id.as_ref())
	}
}

/// Progress of a queued call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
	/// Waiting for its slot.
	Pending,
	/// Dialing or talking.
	InProgress,
	/// Finished.
	Completed,
	/// Could not be completed.
	Failed,
	/// Any other state reported by the backend.
	#[serde(other)]
	Unknown,
}

/// Entry of an agent's outbound call queue.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct QueuedCall {
	/// Call identifier.
	pub id: CallId,
	/// Contact name.
	#[serde(default)]
	pub contact: String,
	/// Number to dial.
	#[serde(default)]
	pub phone: String,
	/// Planned dialing time.
	#[serde(default)]
	pub schedule: Option<String>,
	/// Progress.
	pub status: CallStatus,
	/// Result label (won, lost, escalated, ...), once finished.
	#[serde(default)]
	pub outcome: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AgentList {
	Bare(Vec<Agent>),
	Envelope {
		#[serde(default)]
		success: Option<bool>,
		#[serde(default)]
		message: Option<String>,
		#[serde(default)]
		agents: Option<Vec<Agent>>,
	},
}

#[derive(Debug, Deserialize)]
struct AgentEnvelope {
	#[serde(default)]
	success: Option<bool>,
	#[serde(default)]
	message: Option<String>,
	#[serde(default)]
	agent: Option<Agent>,
}

#[derive(Debug, Deserialize)]
struct CampaignList {
	#[serde(default)]
	success: Option<bool>,
	#[serde(default)]
	message: Option<String>,
	#[serde(default)]
	campaigns: Vec<Campaign>,
}

#[derive(Debug, Deserialize)]
struct CallQueue {
	#[serde(default)]
	success: Option<bool>,
	#[serde(default)]
	message: Option<String>,
	#[serde(default)]
	queue: Vec<QueuedCall>,
}

#[derive(Debug, Default, Deserialize)]
struct Ack {
	#[serde(default)]
	success: Option<bool>,
	#[serde(default)]
	message: Option<String>,
}

#[derive(Serialize)]
struct StatusChange {
	status: AgentStatus,
}

/// Agent endpoints bound to a client.
#[derive(Debug)]
pub struct AgentsApi<'a, T>
where
	T: ?Sized + HttpTransport,
{
	pub(crate) client: &'a AuthenticatedClient<T>,
}
impl<T> AgentsApi<'_, T>
where
	T: ?Sized + HttpTransport,
{
	/// Lists the caller's agents.
	///
	/// Accepts a bare array, `{ agents }`, or `{ success, agents }`.
	pub async fn list(&self) -> Result<Vec<Agent>> {
		let list: AgentList = self.client.get_json(AGENTS_PATH).await?;

		match list {
			AgentList::Bare(agents) => Ok(agents),
			AgentList::Envelope { success, message, agents } => {
				api::ensure_success(success, message, "agent listing")?;

				agents.ok_or_else(|| Error::UnexpectedResponse {
					reason: "agent listing carried no agents".into(),
				})
			},
		}
	}

	/// Fetches one agent with its details.
	pub async fn get(&self, id: &AgentId) -> Result<Agent> {
		let envelope: AgentEnvelope = self.client.get_json(&format!("{AGENTS_PATH}{id}/")).await?;

		api::ensure_success(envelope.success, envelope.message, "agent lookup")?;

		envelope.agent.ok_or_else(|| Error::UnexpectedResponse {
			reason: format!("agent {id} was not returned"),
		})
	}

	/// Creates an agent from a validated draft.
	pub async fn create(&self, draft: &AgentDraft) -> Result<()> {
		let payload = draft.validate()?;
		let request = ApiRequest::post(format!("{AGENTS_PATH}create/")).with_json(&payload)?;

		acknowledge(self.client.request(request).await?, "agent creation")
	}

	/// Replaces an agent's settings with a validated draft.
	pub async fn update(&self, id: &AgentId, draft: &AgentDraft) -> Result<()> {
		let payload = draft.validate()?;
		let request = ApiRequest::put(update_path(id)).with_json(&payload)?;

		acknowledge(self.client.request(request).await?, "agent update")
	}

	/// Changes only the run state, as the pause/resume switch does.
	pub async fn set_status(&self, id: &AgentId, status: AgentStatus) -> Result<()> {
		let request = ApiRequest::put(update_path(id)).with_json(&StatusChange { status })?;

		acknowledge(self.client.request(request).await?, "agent status change")
	}

	/// Deletes an agent.
	pub async fn delete(&self, id: &AgentId) -> Result<()> {
		let request = ApiRequest::delete(format!("{AGENTS_PATH}{id}/delete/"));

		acknowledge(self.client.request(request).await?, "agent deletion")
	}

	/// Schedules a campaign on an agent.
	pub async fn create_campaign(&self, agent: &AgentId, draft: &CampaignDraft) -> Result<()> {
		let payload = draft.validate()?;
		let path = format!("{AGENTS_PATH}{agent}/campaigns/create/");
		let request = ApiRequest::post(path).with_json(&payload)?;

		acknowledge(self.client.request(request).await?, "campaign creation")
	}

	/// Lists campaigns across every agent, newest first as the backend orders them.
	pub async fn campaigns(&self) -> Result<Vec<Campaign>> {
		let list: CampaignList = self.client.get_json(CAMPAIGNS_PATH).await?;

		api::ensure_success(list.success, list.message, "campaign listing")?;

		Ok(list.campaigns)
	}

	/// Lists the campaigns run by `agent`, keeping the backend's order.
	pub async fn campaigns_for(&self, agent: &AgentId) -> Result<Vec<Campaign>> {
		let mut campaigns = self.campaigns().await?;

		campaigns.retain(|campaign| campaign.agent() == Some(agent));

		Ok(campaigns)
	}

	/// Reads an agent's outbound call queue.
	pub async fn call_queue(&self, agent: &AgentId) -> Result<Vec<QueuedCall>> {
		let queue: CallQueue =
			self.client.get_json(&format!("{AGENTS_PATH}{agent}/call-queue/")).await?;

		api::ensure_success(queue.success, queue.message, "call queue")?;

		Ok(queue.queue)
	}
}

fn update_path(id: &AgentId) -> String {
	format!("{AGENTS_PATH}{id}/update/")
}

/// Accepts any 2xx reply, rejecting only an explicit `success: false` body.
fn acknowledge(response: ApiResponse, what: &str) -> Result<()> {
	let ack = if response.body().iter().all(u8::is_ascii_whitespace) {
		Ack::default()
	} else {
		serde_json::from_slice(response.body()).unwrap_or_default()
	};

	api::ensure_success(ack.success, ack.message, what)
}

fn default_agent_type() -> String {
	"inbound".into()
}

fn default_voice_tone() -> String {
	"friendly".into()
}

fn null_as_default<'de, D, V>(deserializer: D) -> Result<V, D::Error>
where
	D: Deserializer<'de>,
	V: Default + Deserialize<'de>,
{
	Ok(Option::<V>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn agent_fills_dashboard_defaults() {
		let agent: Agent = serde_json::from_str(
			r#"{"id":4,"name":"Nova","status":"archived","operating_hours":null,"total_calls":3,"successful_calls":2,"updated_at":"2025-02-01T00:00:00Z"}"#,
		)
		.expect("Sparse agent should deserialize.");

		assert_eq!(agent.agent_type, "inbound");
		assert_eq!(agent.voice_tone, "friendly");
		assert_eq!(agent.status, AgentStatus::Inactive);
		assert_eq!(agent.operating_hours, OperatingHours::default());
		assert_eq!(agent.success_rate(), 67);
		assert_eq!(agent.last_active(), Some("2025-02-01T00:00:00Z"));
	}

	#[test]
	fn success_rate_handles_idle_agents() {
		let agent: Agent =
			serde_json::from_str(r#"{"id":1}"#).expect("Minimal agent should deserialize.");

		assert_eq!(agent.success_rate(), 0);
		assert_eq!(agent.status, AgentStatus::Active);
		assert_eq!(agent.status.toggled(), AgentStatus::Paused);
		assert_eq!(AgentStatus::Inactive.toggled(), AgentStatus::Active);
	}

	#[test]
	fn campaign_draft_validation_restores_retry_defaults() {
		let draft = CampaignDraft {
			max_retry_attempts: 0,
			retry_interval_hours: 0,
			..CampaignDraft::new(" Spring ", "high", "2025-03-01", "2025-03-31")
		}
		.validate()
		.expect("Campaign fixture should validate.");

		assert_eq!(draft.name, "Spring");
		assert_eq!(draft.max_retry_attempts, 3);
		assert_eq!(draft.retry_interval_hours, 24);

		let err = CampaignDraft {
			schedule_type: "scheduled".into(),
			..CampaignDraft::new("Spring", "high", "2025-03-01", "2025-03-31")
		}
		.validate()
		.expect_err("Scheduled campaign without a start should fail.");

		assert_eq!(err.field, "scheduled_start");
	}

	#[test]
	fn campaigns_resolve_either_owner_field() {
		let campaigns: Vec<Campaign> =
			serde_json::from_str(r#"[{"id":1,"agent":4},{"id":2,"agent_id":"4"},{"id":3}]"#)
				.expect("Campaign fixtures should deserialize.");
		let owner = AgentId::from(4);

		assert_eq!(campaigns[0].agent(), Some(&owner));
		assert_eq!(campaigns[1].agent(), Some(&owner));
		assert_eq!(campaigns[2].agent(), None);
	}

	#[test]
	fn acknowledge_only_rejects_explicit_failure() {
		assert!(acknowledge(ApiResponse::new(204, Vec::new()), "agent deletion").is_ok());
		assert!(acknowledge(ApiResponse::new(200, b"not json".to_vec()), "agent deletion").is_ok());
		assert!(matches!(
			acknowledge(
				ApiResponse::new(200, br#"{"success":false,"message":"in use"}"#.to_vec()),
				"agent deletion",
			),
			Err(Error::UnexpectedResponse { reason }) if reason == "in use"
		));
	}
}
