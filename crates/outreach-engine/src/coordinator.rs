//! Run coordinator: owns the lifecycle of a single campaign-lead run.
//!
//! Loads the row and its campaign/lead, seeds the processing state, selects
//! and builds the topology, executes the graph, and writes every artifact
//! back through the store. Engine failures never leak a half-updated row:
//! the row is marked failed with the error before the result is returned.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use outreach_core::error::{OutreachError, Result};
use outreach_core::traits::{CampaignStore, RunRecord};
use outreach_core::types::{
    Campaign, CampaignLead, Lead, LeadStatus, LogEntry, LogLevel, RunResult,
};

use crate::graph::{GraphBuilder, Topology};
use crate::state::{
    CampaignSnapshot, EnrichmentResult, ProcessingState, SmsOutcome, StateUpdate,
    ValidationResult, VoiceOutcome,
};

const DEFAULT_CREATIVE_PROMPT: &str =
    "You are a creative sales assistant focused on engaging conversation.";
const DEFAULT_DETERMINISTIC_PROMPT: &str =
    "You are a deterministic assistant focused on executing tools and actions.";
const DEFAULT_LEGACY_PROMPT: &str = "You are a helpful sales assistant.";
const DEFAULT_AGENT_MODEL: &str = "gpt-4o";
const DEFAULT_LEGACY_MODEL: &str = "gpt-4o-mini";

/// Seed the mutable run state from the persisted rows.
///
/// Dual-agent mode engages only when both halves of the pair are configured.
/// Prompt and model fall back per slot: configured agent, then the
/// campaign's legacy prompt, then a generic default. The stored 0-100
/// temperature becomes a 0.0-1.0 fraction.
pub fn initialize_state(
    campaign_lead: &CampaignLead,
    campaign: &Campaign,
    lead: &Lead,
) -> ProcessingState {
    let use_a2a = campaign.creative_agent.is_some() && campaign.deterministic_agent.is_some();

    let (creative_id, creative_prompt, creative_model) = match &campaign.creative_agent {
        Some(agent) => (
            agent.id.clone(),
            agent.system_prompt.clone(),
            agent.model.clone(),
        ),
        None => (
            String::new(),
            DEFAULT_CREATIVE_PROMPT.to_string(),
            DEFAULT_AGENT_MODEL.to_string(),
        ),
    };

    let (deterministic_id, deterministic_prompt, deterministic_model, deterministic_tools) =
        match &campaign.deterministic_agent {
            Some(agent) => (
                agent.id.clone(),
                agent.system_prompt.clone(),
                agent.model.clone(),
                agent.tools.clone(),
            ),
            None => (
                String::new(),
                DEFAULT_DETERMINISTIC_PROMPT.to_string(),
                DEFAULT_AGENT_MODEL.to_string(),
                vec![],
            ),
        };

    let sms_system_prompt = campaign
        .agent
        .as_ref()
        .map(|agent| agent.system_prompt.clone())
        .or_else(|| campaign.sms_system_prompt.clone())
        .unwrap_or_else(|| DEFAULT_LEGACY_PROMPT.to_string());

    let sms_model = campaign
        .agent
        .as_ref()
        .map(|agent| agent.model.clone())
        .unwrap_or_else(|| DEFAULT_LEGACY_MODEL.to_string());

    ProcessingState {
        campaign_lead_id: campaign_lead.id.clone(),
        campaign_id: campaign.id.clone(),
        lead_id: lead.id.clone(),
        profile: lead.profile(),
        config: CampaignSnapshot {
            agent_type: campaign.agent_type,
            use_a2a,
            creative_agent_id: creative_id,
            creative_agent_prompt: creative_prompt,
            creative_agent_model: creative_model,
            deterministic_agent_id: deterministic_id,
            deterministic_agent_prompt: deterministic_prompt,
            deterministic_agent_model: deterministic_model,
            deterministic_agent_tools: deterministic_tools,
            sms_system_prompt,
            sms_model,
            sms_temperature: f32::from(campaign.sms_temperature) / 100.0,
        },
        validation: ValidationResult::default(),
        sms: SmsOutcome::default(),
        voice: VoiceOutcome::default(),
        enrichment: EnrichmentResult::default(),
        log: vec![],
        history: vec![],
        trace_id: String::new(),
        status: LeadStatus::Pending,
        error_message: String::new(),
    }
}

pub struct RunCoordinator {
    store: Arc<dyn CampaignStore>,
    builder: GraphBuilder,
    tracing_enabled: bool,
}

impl RunCoordinator {
    pub fn new(store: Arc<dyn CampaignStore>, builder: GraphBuilder, tracing_enabled: bool) -> Self {
        Self {
            store,
            builder,
            tracing_enabled,
        }
    }

    /// Process one campaign-lead row end to end.
    ///
    /// Missing rows are the caller's error and surface as `Err`. Everything
    /// downstream of a successful load resolves to `Ok`: node failures are
    /// folded into the state by the nodes themselves, and engine failures
    /// are written back as a failed run.
    pub async fn run(&self, campaign_lead_id: &str) -> Result<RunResult> {
        let campaign_lead = self
            .store
            .campaign_lead(campaign_lead_id)
            .await?
            .ok_or_else(|| OutreachError::CampaignLeadNotFound(campaign_lead_id.to_string()))?;
        let campaign = self
            .store
            .campaign(&campaign_lead.campaign_id)
            .await?
            .ok_or_else(|| OutreachError::CampaignNotFound(campaign_lead.campaign_id.clone()))?;
        let lead = self
            .store
            .lead(&campaign_lead.lead_id)
            .await?
            .ok_or_else(|| OutreachError::LeadNotFound(campaign_lead.lead_id.clone()))?;

        info!(
            campaign_lead_id = %campaign_lead.id,
            campaign_id = %campaign.id,
            lead_id = %lead.id,
            "Starting campaign lead run"
        );

        self.store
            .set_lead_status(campaign_lead_id, LeadStatus::Processing)
            .await?;

        let mut state = initialize_state(&campaign_lead, &campaign, &lead);

        let topology = Topology::select(state.config.use_a2a, campaign.workflow.as_ref());
        let built = self.builder.build(topology, campaign.workflow.as_ref());
        if !built.warnings.is_empty() {
            let mut update = StateUpdate::default();
            for warning in &built.warnings {
                warn!(campaign_lead_id = %campaign_lead.id, %warning, "Graph construction warning");
                update = update.log(LogEntry::new("graph_builder", warning.clone()));
            }
            state.apply(update);
        }

        let span = if self.tracing_enabled {
            let trace_id = Uuid::new_v4().to_string();
            let span = info_span!(
                "campaign_lead_run",
                trace_id = %trace_id,
                campaign_lead_id = %campaign_lead.id,
            );
            state.apply(StateUpdate {
                trace_id: Some(trace_id),
                ..Default::default()
            });
            span
        } else {
            info_span!("campaign_lead_run", campaign_lead_id = %campaign_lead.id)
        };

        match built.graph.execute(state).instrument(span).await {
            Ok(final_state) => self.write_back(&campaign.id, final_state).await,
            Err(e) => {
                error!(campaign_lead_id, error = %e, "Graph execution failed");
                self.write_failure(&campaign.id, campaign_lead_id, e.to_string())
                    .await
            }
        }
    }

    /// Persist every artifact of a finished run: the row write-back, the
    /// conversation transcript, the processing log, and refreshed campaign
    /// counters.
    async fn write_back(&self, campaign_id: &str, state: ProcessingState) -> Result<RunResult> {
        let completed = state.status == LeadStatus::Completed;

        self.store
            .record_run(
                &state.campaign_lead_id,
                RunRecord {
                    status: state.status,
                    sms_sent: state.sms.sent,
                    sms_message: state.sms.message.clone(),
                    voice_call_made: state.voice.call_made,
                    error_message: state.error_message.clone(),
                    trace_id: state.trace_id.clone(),
                    processed_at: Utc::now(),
                },
            )
            .await?;

        if !state.history.is_empty() {
            self.store
                .append_conversation(&state.campaign_lead_id, state.history.clone())
                .await?;
        }

        if !state.log.is_empty() {
            let level = if completed { LogLevel::Info } else { LogLevel::Error };
            self.store
                .append_logs(&state.campaign_lead_id, level, state.log.clone())
                .await?;
        }

        self.store.refresh_campaign_stats(campaign_id).await?;

        info!(
            campaign_lead_id = %state.campaign_lead_id,
            status = %state.status,
            sms_sent = state.sms.sent,
            call_made = state.voice.call_made,
            "Campaign lead run finished"
        );

        Ok(RunResult {
            success: completed,
            status: state.status,
            sms_sent: state.sms.sent,
            call_made: state.voice.call_made,
            error_message: state.error_message,
        })
    }

    /// An engine failure still leaves a consistent row behind.
    async fn write_failure(
        &self,
        campaign_id: &str,
        campaign_lead_id: &str,
        error_message: String,
    ) -> Result<RunResult> {
        self.store
            .record_run(
                campaign_lead_id,
                RunRecord {
                    status: LeadStatus::Failed,
                    sms_sent: false,
                    sms_message: String::new(),
                    voice_call_made: false,
                    error_message: error_message.clone(),
                    trace_id: String::new(),
                    processed_at: Utc::now(),
                },
            )
            .await?;
        self.store.refresh_campaign_stats(campaign_id).await?;

        Ok(RunResult {
            success: false,
            status: LeadStatus::Failed,
            sms_sent: false,
            call_made: false,
            error_message,
        })
    }
}
