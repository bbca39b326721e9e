use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::*;

/// Request handed to the message-generation capability.
///
/// `history` carries the run transcript so far; implementations use it as
/// few-shot context and must skip system-role entries from it. The hard
/// length/style constraint for the channel is the implementation's
/// responsibility (SMS: under 160 characters).
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub model: String,
    /// 0.0-1.0 fraction.
    pub temperature: f32,
    pub profile: LeadProfile,
    pub history: Vec<HistoryEntry>,
}

/// Successful generation output. `cost` is in currency-agnostic units and
/// must be present even when pricing is unknown (zero-cost fallback).
#[derive(Debug, Clone)]
pub struct GeneratedMessage {
    pub message: String,
    pub cost: f64,
}

/// Message-generation capability (LLM-backed in production).
pub trait MessageGenerator: Send + Sync + 'static {
    fn generate(&self, request: GenerationRequest) -> BoxFuture<'_, Result<GeneratedMessage>>;
}

/// Receipt from a successful delivery.
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    pub delivery_id: String,
}

/// Outbound message delivery capability (SMS transport).
pub trait MessageSender: Send + Sync + 'static {
    fn send(&self, to: &str, message: &str) -> BoxFuture<'_, Result<DeliveryReceipt>>;
}

/// Receipt from a placed call.
#[derive(Debug, Clone)]
pub struct CallReceipt {
    pub call_id: String,
}

/// Voice-call capability. The bundled implementation is a deterministic
/// mock; a telephony integration replaces it behind the same contract.
pub trait CallPlacer: Send + Sync + 'static {
    fn place(&self, lead_id: &str, profile: &LeadProfile) -> BoxFuture<'_, Result<CallReceipt>>;
}

/// Lead-enrichment capability. Returns only the attributes it inferred;
/// the caller merges them into the profile non-destructively.
pub trait Enricher: Send + Sync + 'static {
    fn enrich(
        &self,
        profile: &LeadProfile,
    ) -> BoxFuture<'_, Result<serde_json::Map<String, serde_json::Value>>>;
}

/// Final values written back onto the persisted campaign-lead row.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub status: LeadStatus,
    pub sms_sent: bool,
    pub sms_message: String,
    pub voice_call_made: bool,
    pub error_message: String,
    pub trace_id: String,
    pub processed_at: DateTime<Utc>,
}

/// Persistence boundary for campaigns, leads, and run artifacts.
///
/// The engine only issues the calls below; transactional integrity of the
/// status transitions is the implementation's concern.
pub trait CampaignStore: Send + Sync + 'static {
    fn campaign(&self, id: &str) -> BoxFuture<'_, Result<Option<Campaign>>>;

    fn lead(&self, id: &str) -> BoxFuture<'_, Result<Option<Lead>>>;

    fn campaign_lead(&self, id: &str) -> BoxFuture<'_, Result<Option<CampaignLead>>>;

    /// Ids of pending campaign-lead rows for a campaign, in insertion order.
    fn pending_lead_ids(&self, campaign_id: &str) -> BoxFuture<'_, Result<Vec<String>>>;

    fn set_lead_status(&self, id: &str, status: LeadStatus) -> BoxFuture<'_, Result<()>>;

    /// Write back the final run values onto the campaign-lead row.
    fn record_run(&self, id: &str, record: RunRecord) -> BoxFuture<'_, Result<()>>;

    /// Persist transcript entries as durable conversation rows.
    fn append_conversation(
        &self,
        campaign_lead_id: &str,
        entries: Vec<HistoryEntry>,
    ) -> BoxFuture<'_, Result<()>>;

    /// Persist processing-log entries as durable log rows at one level.
    fn append_logs(
        &self,
        campaign_lead_id: &str,
        level: LogLevel,
        entries: Vec<LogEntry>,
    ) -> BoxFuture<'_, Result<()>>;

    /// Latest campaign status; the sweep polls this between leads.
    fn campaign_status(&self, id: &str) -> BoxFuture<'_, Result<CampaignStatus>>;

    fn set_campaign_status(
        &self,
        id: &str,
        status: CampaignStatus,
    ) -> BoxFuture<'_, Result<()>>;

    /// Recompute the campaign's aggregate counters from its lead rows.
    fn refresh_campaign_stats(&self, campaign_id: &str) -> BoxFuture<'_, Result<()>>;
}
