//! Node library — independently callable units of work over [`ProcessingState`].
//!
//! A node is total: it never propagates an error. Capability failures are
//! encoded into the relevant outcome's error field so execution can continue
//! to routing and finalization with a complete audit trail. Every invocation
//! appends at least one processing-log entry.

pub mod a2a;

use std::sync::Arc;

use chrono::{Datelike, Local, Timelike};
use futures::future::BoxFuture;
use serde_json::json;
use tracing::{error, info};

use outreach_core::config::WorkingHoursConfig;
use outreach_core::traits::{CallPlacer, Enricher, GenerationRequest, MessageGenerator, MessageSender};
use outreach_core::types::{AgentType, HistoryEntry, LeadStatus, LogEntry, Role};

use crate::state::{ProcessingState, StateUpdate};

/// A named unit of work. Implementations read the prior state and return a
/// delta; they never mutate the state directly.
pub trait StateNode: Send + Sync {
    fn name(&self) -> &'static str;

    fn run<'a>(&'a self, state: &'a ProcessingState) -> BoxFuture<'a, StateUpdate>;
}

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Checks lead data and the working-hours policy before any contact is made.
pub struct ValidateNode {
    policy: WorkingHoursConfig,
}

impl ValidateNode {
    pub fn new(policy: WorkingHoursConfig) -> Self {
        Self { policy }
    }
}

/// Policy violations for a given local hour and weekday (0 = Monday).
/// Split out from the node so the window logic is testable at any clock.
pub(crate) fn working_hours_errors(
    policy: &WorkingHoursConfig,
    hour: u32,
    weekday: u32,
) -> Vec<String> {
    let mut errors = Vec::new();

    if !policy.allow_weekend && weekday >= 5 {
        errors.push(format!(
            "Weekend sending disabled (current day: {})",
            WEEKDAYS[weekday as usize % 7]
        ));
    }

    if !(policy.start_hour <= hour && hour < policy.end_hour) {
        errors.push(format!(
            "Outside working hours (current: {}:00, allowed: {}:00-{}:00)",
            hour, policy.start_hour, policy.end_hour
        ));
    }

    errors
}

impl StateNode for ValidateNode {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn run<'a>(&'a self, state: &'a ProcessingState) -> BoxFuture<'a, StateUpdate> {
        Box::pin(async move {
            info!(lead_id = %state.lead_id, "Validating lead");

            let mut errors = Vec::new();

            if state.profile.phone.trim().is_empty() {
                errors.push("Missing phone number".to_string());
            }
            if state.profile.name.trim().is_empty() {
                errors.push("Missing name".to_string());
            }

            if self.policy.enforce {
                let now = Local::now();
                errors.extend(working_hours_errors(
                    &self.policy,
                    now.hour(),
                    now.weekday().num_days_from_monday(),
                ));
            }

            let passed = errors.is_empty();
            info!(lead_id = %state.lead_id, passed, "Validation result");

            StateUpdate {
                validation_passed: Some(passed),
                validation_errors: errors.clone(),
                ..Default::default()
            }
            .log(
                LogEntry::new(
                    "validate",
                    if passed {
                        "Validation passed"
                    } else {
                        "Validation failed"
                    },
                )
                .with_detail(json!({ "errors": errors })),
            )
        })
    }
}

/// Generates the outreach message on the legacy single-agent SMS path.
pub struct GenerateMessageNode {
    generator: Arc<dyn MessageGenerator>,
}

impl GenerateMessageNode {
    pub fn new(generator: Arc<dyn MessageGenerator>) -> Self {
        Self { generator }
    }
}

impl StateNode for GenerateMessageNode {
    fn name(&self) -> &'static str {
        "generate_message"
    }

    fn run<'a>(&'a self, state: &'a ProcessingState) -> BoxFuture<'a, StateUpdate> {
        Box::pin(async move {
            info!(lead_id = %state.lead_id, "Generating SMS message");

            let request = GenerationRequest {
                system_prompt: state.config.sms_system_prompt.clone(),
                model: state.config.sms_model.clone(),
                temperature: state.config.sms_temperature,
                profile: state.profile.clone(),
                history: vec![],
            };

            match self.generator.generate(request).await {
                Ok(generated) => StateUpdate {
                    sms_message: Some(generated.message.clone()),
                    sms_cost: Some(generated.cost),
                    ..Default::default()
                }
                .history(
                    HistoryEntry::new(Role::System, state.config.sms_system_prompt.clone())
                        .with_metadata(json!({ "node": "generate_message", "step": "system_prompt" })),
                )
                .history(
                    HistoryEntry::new(Role::Assistant, generated.message.clone()).with_metadata(
                        json!({
                            "node": "generate_message",
                            "step": "generated_message",
                            "cost": generated.cost,
                        }),
                    ),
                )
                .log(
                    LogEntry::new("generate_message", "SMS message generated").with_detail(
                        json!({ "message_preview": preview(&generated.message, 100) }),
                    ),
                ),
                Err(e) => {
                    error!(lead_id = %state.lead_id, error = %e, "SMS generation failed");
                    StateUpdate {
                        sms_message: Some(String::new()),
                        sms_sent: Some(false),
                        sms_error: Some(e.to_string()),
                        sms_cost: Some(0.0),
                        ..Default::default()
                    }
                    .log(
                        LogEntry::new("generate_message", "SMS generation failed")
                            .with_detail(json!({ "error": e.to_string() })),
                    )
                }
            }
        })
    }
}

/// Delivers a previously generated message to the lead's phone.
pub struct SendMessageNode {
    sender: Arc<dyn MessageSender>,
}

impl SendMessageNode {
    pub fn new(sender: Arc<dyn MessageSender>) -> Self {
        Self { sender }
    }
}

impl StateNode for SendMessageNode {
    fn name(&self) -> &'static str {
        "send_message"
    }

    fn run<'a>(&'a self, state: &'a ProcessingState) -> BoxFuture<'a, StateUpdate> {
        Box::pin(async move {
            if state.sms.message.is_empty() {
                // Nothing to deliver; the generation error (if any) stands.
                return StateUpdate::default()
                    .log(LogEntry::new("send_message", "SMS send skipped (no message)"));
            }

            match self.sender.send(&state.profile.phone, &state.sms.message).await {
                Ok(receipt) => {
                    info!(lead_id = %state.lead_id, delivery_id = %receipt.delivery_id, "SMS sent");
                    StateUpdate {
                        sms_sent: Some(true),
                        sms_error: Some(String::new()),
                        ..Default::default()
                    }
                    .log(LogEntry::new("send_message", "SMS sent").with_detail(json!({
                        "sms_message": preview(&state.sms.message, 100),
                        "delivery_id": receipt.delivery_id,
                    })))
                }
                Err(e) => {
                    error!(lead_id = %state.lead_id, error = %e, "SMS delivery failed");
                    StateUpdate {
                        sms_sent: Some(false),
                        sms_error: Some(e.to_string()),
                        ..Default::default()
                    }
                    .log(LogEntry::new("send_message", "SMS failed").with_detail(json!({
                        "sms_message": preview(&state.sms.message, 100),
                        "error": e.to_string(),
                    })))
                }
            }
        })
    }
}

/// Places the voice call through the telephony capability.
pub struct PlaceCallNode {
    placer: Arc<dyn CallPlacer>,
}

impl PlaceCallNode {
    pub fn new(placer: Arc<dyn CallPlacer>) -> Self {
        Self { placer }
    }
}

impl StateNode for PlaceCallNode {
    fn name(&self) -> &'static str {
        "voice_agent"
    }

    fn run<'a>(&'a self, state: &'a ProcessingState) -> BoxFuture<'a, StateUpdate> {
        Box::pin(async move {
            info!(lead_id = %state.lead_id, "Placing voice call");

            match self.placer.place(&state.lead_id, &state.profile).await {
                Ok(receipt) => StateUpdate {
                    voice_call_made: Some(true),
                    voice_call_id: Some(receipt.call_id.clone()),
                    voice_error: Some(String::new()),
                    voice_cost: Some(0.0),
                    ..Default::default()
                }
                .log(
                    LogEntry::new("voice_agent", "Voice call initiated")
                        .with_detail(json!({ "call_id": receipt.call_id })),
                ),
                Err(e) => {
                    error!(lead_id = %state.lead_id, error = %e, "Voice call failed");
                    StateUpdate {
                        voice_call_made: Some(false),
                        voice_error: Some(e.to_string()),
                        voice_cost: Some(0.0),
                        ..Default::default()
                    }
                    .log(
                        LogEntry::new("voice_agent", "Voice call failed")
                            .with_detail(json!({ "error": e.to_string() })),
                    )
                }
            }
        })
    }
}

/// Computes auxiliary profile attributes and merges them into the profile.
pub struct EnrichNode {
    enricher: Arc<dyn Enricher>,
}

impl EnrichNode {
    pub fn new(enricher: Arc<dyn Enricher>) -> Self {
        Self { enricher }
    }
}

impl StateNode for EnrichNode {
    fn name(&self) -> &'static str {
        "enrichment"
    }

    fn run<'a>(&'a self, state: &'a ProcessingState) -> BoxFuture<'a, StateUpdate> {
        Box::pin(async move {
            info!(lead_id = %state.lead_id, "Enriching lead data");

            match self.enricher.enrich(&state.profile).await {
                Ok(data) => {
                    let mut profile = state.profile.clone();
                    profile.absorb(&data);

                    StateUpdate {
                        profile: Some(profile),
                        enrichment_data: Some(data.clone()),
                        enrichment_error: Some(String::new()),
                        ..Default::default()
                    }
                    .log(
                        LogEntry::new("enrichment", "Data enrichment successful")
                            .with_detail(json!({ "data": data })),
                    )
                }
                Err(e) => {
                    error!(lead_id = %state.lead_id, error = %e, "Enrichment failed");
                    StateUpdate {
                        enrichment_error: Some(e.to_string()),
                        ..Default::default()
                    }
                    .log(
                        LogEntry::new("enrichment", "Data enrichment failed")
                            .with_detail(json!({ "error": e.to_string() })),
                    )
                }
            }
        })
    }
}

///// Terminal node: derives the run's final status from the accumulated
/// outcomes.
pub struct FinalizeNode;

impl StateNode for FinalizeNode {
    fn name(&self) -> &'static str {
        "finalize"
    }

    fn run<'a>(&'a self, state: &'a ProcessingState) -> BoxFuture<'a, StateUpdate> {
        Box::pin(async move {
            let (status, error_message) = if !state.validation.passed {
                (LeadStatus::Failed, state.validation.errors.join("; "))
            } else {
                match state.config.agent_type {
                    AgentType::Sms => {
                        if state.sms.sent {
                            (LeadStatus::Completed, String::new())
                        } else {
                            (LeadStatus::Failed, state.sms.error.clone())
                        }
                    }
                    AgentType::Voice => {
                        if state.voice.call_made {
                            (LeadStatus::Completed, String::new())
                        } else {
                            (LeadStatus::Failed, state.voice.error.clone())
                        }
                    }
                    AgentType::Both => {
                        if state.sms.sent && state.voice.call_made {
                            (LeadStatus::Completed, String::new())
                        } else {
                            let mut errors = Vec::new();
                            if !state.sms.sent {
                                errors.push(format!("SMS: {}", state.sms.error));
                            }
                            if !state.voice.call_made {
                                errors.push(format!("Voice: {}", state.voice.error));
                            }
                            (LeadStatus::Failed, errors.join("; "))
                        }
                    }
                }
            };

            info!(lead_id = %state.lead_id, status = %status, "Finalizing lead");

            StateUpdate {
                status: Some(status),
                error_message: Some(error_message),
                ..Default::default()
            }
            .log(
                LogEntry::new("finalize", format!("Processing {}", status))
                    .with_detail(json!({ "final_status": status.as_str() })),
            )
        })
    }
}

/// First `max` characters of a message, for log payloads.
pub(crate) fn preview(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
