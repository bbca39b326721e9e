use serde::{Deserialize, Serialize};

use outreach_core::types::{
    AgentType, HistoryEntry, LeadProfile, LeadStatus, LogEntry, ToolBinding,
};

/// Read-only snapshot of the campaign configuration, taken once at run
/// start. Nodes never write to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignSnapshot {
    pub agent_type: AgentType,

    /// Dual-agent mode; true iff both agent ids below are set.
    pub use_a2a: bool,
    pub creative_agent_id: String,
    pub creative_agent_prompt: String,
    pub creative_agent_model: String,
    pub deterministic_agent_id: String,
    pub deterministic_agent_prompt: String,
    pub deterministic_agent_model: String,
    pub deterministic_agent_tools: Vec<ToolBinding>,

    // Legacy single agent (backward compatibility)
    pub sms_system_prompt: String,
    pub sms_model: String,
    /// 0.0-1.0 fraction, converted from the persisted 0-100 integer.
    pub sms_temperature: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    /// Append-only; writers add to this list, never replace it.
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmsOutcome {
    pub sent: bool,
    pub message: String,
    pub error: String,
    pub cost: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceOutcome {
    pub call_made: bool,
    pub call_id: String,
    pub error: String,
    pub cost: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub data: serde_json::Map<String, serde_json::Value>,
    pub error: String,
}

/// Mutable record threaded through a single lead's run.
///
/// Exclusively owned by one run; created by the coordinator, discarded after
/// the final values are extracted. Nodes never mutate it directly — they
/// return a [`StateUpdate`] which the graph executor applies via
/// [`ProcessingState::apply`], so the append-only rules hold regardless of
/// what any node returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingState {
    pub campaign_lead_id: String,
    pub campaign_id: String,
    pub lead_id: String,

    pub profile: LeadProfile,
    pub config: CampaignSnapshot,

    pub validation: ValidationResult,
    pub sms: SmsOutcome,
    pub voice: VoiceOutcome,
    pub enrichment: EnrichmentResult,

    /// Append-only audit trail; at least one entry per node invocation.
    pub log: Vec<LogEntry>,
    /// Append-only transcript of everything said by any agent or tool.
    pub history: Vec<HistoryEntry>,

    /// Observability correlation id; assigned at most once per run.
    pub trace_id: String,

    pub status: LeadStatus,
    pub error_message: String,
}

/// Delta produced by one node invocation.
///
/// `Option` fields are last-writer-wins; the `Vec` fields are accumulated by
/// concatenation in node execution order.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub profile: Option<LeadProfile>,

    pub validation_passed: Option<bool>,
    pub validation_errors: Vec<String>,

    pub sms_sent: Option<bool>,
    pub sms_message: Option<String>,
    pub sms_error: Option<String>,
    pub sms_cost: Option<f64>,

    pub voice_call_made: Option<bool>,
    pub voice_call_id: Option<String>,
    pub voice_error: Option<String>,
    pub voice_cost: Option<f64>,

    pub enrichment_data: Option<serde_json::Map<String, serde_json::Value>>,
    pub enrichment_error: Option<String>,

    pub log: Vec<LogEntry>,
    pub history: Vec<HistoryEntry>,

    pub trace_id: Option<String>,
    pub status: Option<LeadStatus>,
    pub error_message: Option<String>,
}

impl StateUpdate {
    pub fn log(mut self, entry: LogEntry) -> Self {
        self.log.push(entry);
        self
    }

    pub fn history(mut self, entry: HistoryEntry) -> Self {
        self.history.push(entry);
        self
    }
}

impl ProcessingState {
    /// Merge a node's delta into the state.
    ///
    /// Append-only sequences (validation errors, processing log, conversation
    /// history) are concatenated; everything else is assigned when present.
    /// The trace id is write-once: a later assignment is ignored.
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(profile) = update.profile {
            self.profile = profile;
        }

        if let Some(passed) = update.validation_passed {
            self.validation.passed = passed;
        }
        self.validation.errors.extend(update.validation_errors);

        if let Some(sent) = update.sms_sent {
            self.sms.sent = sent;
        }
        if let Some(message) = update.sms_message {
            self.sms.message = message;
        }
        if let Some(error) = update.sms_error {
            self.sms.error = error;
        }
        if let Some(cost) = update.sms_cost {
            self.sms.cost = cost;
        }

        if let Some(call_made) = update.voice_call_made {
            self.voice.call_made = call_made;
        }
        if let Some(call_id) = update.voice_call_id {
            self.voice.call_id = call_id;
        }
        if let Some(error) = update.voice_error {
            self.voice.error = error;
        }
        if let Some(cost) = update.voice_cost {
            self.voice.cost = cost;
        }

        if let Some(data) = update.enrichment_data {
            self.enrichment.data = data;
        }
        if let Some(error) = update.enrichment_error {
            self.enrichment.error = error;
        }

        self.log.extend(update.log);
        self.history.extend(update.history);

        if let Some(trace_id) = update.trace_id {
            if self.trace_id.is_empty() {
                self.trace_id = trace_id;
            }
        }

        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(error_message) = update.error_message {
            self.error_message = error_message;
        }
    }
}
