//! Dual-agent (A2A) nodes: a creative agent that writes, a deterministic
//! agent that delivers and runs tools, and a handoff checkpoint between them.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::json;
use tracing::{error, info, warn};

use outreach_core::traits::{GenerationRequest, MessageGenerator, MessageSender};
use outreach_core::types::{HistoryEntry, LogEntry, Role};

use crate::state::{ProcessingState, StateUpdate};

use super::{preview, StateNode};

/// Generates the outreach message with the creative agent's own prompt,
/// model, and temperature, folding enrichment data and the conversation so
/// far into the request.
pub struct CreativeAgentNode {
    generator: Arc<dyn MessageGenerator>,
}

impl CreativeAgentNode {
    pub fn new(generator: Arc<dyn MessageGenerator>) -> Self {
        Self { generator }
    }
}

impl StateNode for CreativeAgentNode {
    fn name(&self) -> &'static str {
        "creative_agent"
    }

    fn run<'a>(&'a self, state: &'a ProcessingState) -> BoxFuture<'a, StateUpdate> {
        Box::pin(async move {
            if !state.config.use_a2a {
                warn!(lead_id = %state.lead_id, "A2A not enabled, skipping creative agent");
                return StateUpdate::default();
            }

            info!(
                lead_id = %state.lead_id,
                agent_id = %state.config.creative_agent_id,
                "Creative agent generating message"
            );

            // Enrichment output becomes additional context for the writer.
            let mut profile = state.profile.clone();
            profile.absorb(&state.enrichment.data);

            let request = GenerationRequest {
                system_prompt: state.config.creative_agent_prompt.clone(),
                model: state.config.creative_agent_model.clone(),
                temperature: state.config.sms_temperature,
                profile,
                history: state.history.clone(),
            };

            match self.generator.generate(request).await {
                Ok(generated) => StateUpdate {
                    sms_message: Some(generated.message.clone()),
                    sms_cost: Some(generated.cost),
                    ..Default::default()
                }
                .history(
                    HistoryEntry::new(Role::Assistant, generated.message.clone())
                        .tagged("creative", state.config.creative_agent_id.clone())
                        .with_metadata(json!({
                            "node": "creative_agent",
                            "cost": generated.cost,
                            "model": state.config.creative_agent_model,
                        })),
                )
                .log(
                    LogEntry::new("creative_agent", "Creative agent generated message")
                        .with_detail(json!({
                            "message_preview": preview(&generated.message, 100),
                        })),
                ),
                Err(e) => {
                    error!(lead_id = %state.lead_id, error = %e, "Creative agent failed");
                    StateUpdate {
                        sms_error: Some(e.to_string()),
                        ..Default::default()
                    }
                    .log(
                        LogEntry::new("creative_agent", "Creative agent failed")
                            .with_detail(json!({ "error": e.to_string() })),
                    )
                }
            }
        })
    }
}

/// Executes structured actions for the run: delivers the generated message
/// and surfaces every declared tool binding for future execution.
pub struct DeterministicAgentNode {
    sender: Arc<dyn MessageSender>,
}

impl DeterministicAgentNode {
    pub fn new(sender: Arc<dyn MessageSender>) -> Self {
        Self { sender }
    }
}

impl StateNode for DeterministicAgentNode {
    fn name(&self) -> &'static str {
        "deterministic_agent"
    }

    fn run<'a>(&'a self, state: &'a ProcessingState) -> BoxFuture<'a, StateUpdate> {
        Box::pin(async move {
            if !state.config.use_a2a {
                warn!(lead_id = %state.lead_id, "A2A not enabled, skipping deterministic agent");
                return StateUpdate::default();
            }

            info!(
                lead_id = %state.lead_id,
                agent_id = %state.config.deterministic_agent_id,
                "Deterministic agent executing"
            );

            let mut update = StateUpdate::default();

            if !state.sms.message.is_empty() {
                let (sent, error) = match self
                    .sender
                    .send(&state.profile.phone, &state.sms.message)
                    .await
                {
                    Ok(_) => (true, String::new()),
                    Err(e) => {
                        error!(lead_id = %state.lead_id, error = %e, "Deterministic delivery failed");
                        (false, e.to_string())
                    }
                };

                update.sms_sent = Some(sent);
                update.sms_error = Some(error.clone());

                update = update
                    .history(
                        HistoryEntry::new(
                            Role::Tool,
                            format!("SMS sent to {}", state.profile.phone),
                        )
                        .tagged("deterministic", state.config.deterministic_agent_id.clone())
                        .with_metadata(json!({
                            "node": "deterministic_agent",
                            "tool": "send_sms",
                            "success": sent,
                            "error": error,
                        })),
                    )
                    .log(
                        LogEntry::new(
                            "deterministic_agent",
                            if sent { "SMS sent" } else { "SMS failed" },
                        )
                        .with_detail(json!({ "tool": "send_sms", "success": sent })),
                    );
            }

            // Declared tools are surfaced for audit; execution is wired in
            // by the deployment.
            for tool in &state.config.deterministic_agent_tools {
                info!(lead_id = %state.lead_id, tool = %tool.name, "Tool available");
                update = update.log(
                    LogEntry::new(
                        "deterministic_agent",
                        format!("Tool available: {}", tool.name),
                    )
                    .with_detail(json!({ "tool": tool.name })),
                );
            }

            update
        })
    }
}

/// Audit checkpoint between the two agents; records which halves of the
/// collaboration have completed.
pub struct HandoffNode;

impl StateNode for HandoffNode {
    fn name(&self) -> &'static str {
        "handoff"
    }

    fn run<'a>(&'a self, state: &'a ProcessingState) -> BoxFuture<'a, StateUpdate> {
        Box::pin(async move {
            info!(lead_id = %state.lead_id, "Agent handoff coordination");

            StateUpdate::default().log(
                LogEntry::new("handoff", "Agent handoff coordination").with_detail(json!({
                    "creative_complete": !state.sms.message.is_empty(),
                    "deterministic_complete": state.sms.sent,
                })),
            )
        })
    }
}
