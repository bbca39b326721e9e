use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Channel selection for a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Sms,
    Voice,
    Both,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Voice => "voice",
            Self::Both => "both",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sms" => Some(Self::Sms),
            "voice" => Some(Self::Voice),
            "both" => Some(Self::Both),
            _ => None,
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single (campaign, lead) run. Terminal states are
/// `Completed` and `Failed`; a terminal row is never reprocessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Campaign-level lifecycle status. `Paused` is set externally and checked
/// between leads by the sweep; it never interrupts a run in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Pending,
    Processing,
    Paused,
    Completed,
    Failed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Role in the per-run conversation transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// Contact details for a lead, threaded through a run.
///
/// `extra` holds enriched attributes (industry, size, location, ...) merged in
/// by the enrichment step. Enrichment never removes existing keys; it only
/// adds or overwrites the keys it explicitly produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadProfile {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LeadProfile {
    /// Non-destructive merge of enriched attributes into the profile.
    pub fn absorb(&mut self, data: &serde_json::Map<String, serde_json::Value>) {
        for (k, v) in data {
            self.extra.insert(k.clone(), v.clone());
        }
    }
}

/// A declared tool binding on the deterministic agent. Tools are surfaced in
/// the processing log; execution is wired in by the deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolBinding {
    pub name: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Persisted agent configuration referenced by a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    pub system_prompt: String,
    pub model: String,
    #[serde(default)]
    pub tools: Vec<ToolBinding>,
}

/// An outbound-contact campaign as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub agent_type: AgentType,
    pub status: CampaignStatus,
    /// Creative half of the dual-agent (A2A) pair, if configured.
    #[serde(default)]
    pub creative_agent: Option<AgentProfile>,
    /// Deterministic half of the dual-agent (A2A) pair, if configured.
    #[serde(default)]
    pub deterministic_agent: Option<AgentProfile>,
    /// Legacy single agent, superseded by the A2A pair when both are set.
    #[serde(default)]
    pub agent: Option<AgentProfile>,
    #[serde(default)]
    pub sms_system_prompt: Option<String>,
    /// Temperature as a 0-100 integer; converted to 0.0-1.0 at run start.
    #[serde(default = "default_temperature")]
    pub sms_temperature: u8,
    /// User-authored workflow; when present (and A2A is off) the run uses
    /// the dynamic topology.
    #[serde(default)]
    pub workflow: Option<WorkflowDescription>,
}

fn default_temperature() -> u8 {
    70
}

/// A lead as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub notes: String,
}

impl Lead {
    pub fn profile(&self) -> LeadProfile {
        LeadProfile {
            name: self.name.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            company: self.company.clone(),
            notes: self.notes.clone(),
            extra: serde_json::Map::new(),
        }
    }
}

/// The (campaign, lead) join row; one run per row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignLead {
    pub id: String,
    pub campaign_id: String,
    pub lead_id: String,
    pub status: LeadStatus,
    #[serde(default)]
    pub sms_sent: bool,
    #[serde(default)]
    pub sms_message: String,
    #[serde(default)]
    pub voice_call_made: bool,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub trace_id: String,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
}

/// One append-only processing-log entry. Entries are never mutated or
/// removed once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub node: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(default)]
    pub detail: serde_json::Value,
}

impl LogEntry {
    pub fn new(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            timestamp: Utc::now(),
            message: message.into(),
            detail: serde_json::Value::Null,
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }
}

/// One append-only conversation-transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    /// Agent tag for A2A runs ("creative" or "deterministic").
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl HistoryEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            agent: None,
            agent_id: None,
            content: content.into(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn tagged(mut self, agent: impl Into<String>, agent_id: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Explicit node kind in a user-authored workflow.
///
/// The typed kind is authoritative; free-text label matching is kept only as
/// an import-compatibility fallback for descriptions that predate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowNodeKind {
    Input,
    Output,
    Validate,
    Sms,
    Voice,
    Enrich,
}

/// A node in a serialized workflow description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub kind: Option<WorkflowNodeKind>,
}

/// A directed edge in a serialized workflow description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEdge {
    pub source: String,
    pub target: String,
}

/// Generic serialized graph consumed by the dynamic graph builder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowDescription {
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
}

/// Outcome of one coordinator run, handed back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub success: bool,
    pub status: LeadStatus,
    pub sms_sent: bool,
    pub call_made: bool,
    pub error_message: String,
}

/// Severity of persisted processing-log rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Error => "ERROR",
        }
    }
}
