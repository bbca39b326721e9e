//! Router library — pure functions from state to a next-step label.
//!
//! Routers never touch the state; the graph maps the returned label onto a
//! concrete node per topology.

use tracing::debug;

use outreach_core::types::AgentType;

use crate::state::ProcessingState;

/// After validation: bail to finalize on failure, otherwise pick the channel
/// path from the campaign's agent type.
pub fn route_after_validation(state: &ProcessingState) -> &'static str {
    if !state.validation.passed {
        debug!("Validation failed, skipping to finalize");
        return "finalize";
    }

    match state.config.agent_type {
        AgentType::Sms => "sms_only",
        AgentType::Voice => "voice_only",
        AgentType::Both => "sms_first",
    }
}

/// After the SMS leg: continue to voice only for dual-channel campaigns.
pub fn route_after_sms(state: &ProcessingState) -> &'static str {
    if state.config.agent_type == AgentType::Both {
        "voice"
    } else {
        "finalize"
    }
}

/// A2A router, used both after validation and after the handoff node.
///
/// Depends only on the state, so it yields the same label at either point:
/// no message yet → creative; message but not sent → deterministic; both
/// done (or validation failed) → finalize.
pub fn route_a2a(state: &ProcessingState) -> &'static str {
    if !state.validation.passed {
        debug!("Validation failed, skipping to finalize");
        return "finalize";
    }

    if state.sms.message.is_empty() {
        return "creative";
    }

    if !state.sms.sent {
        return "deterministic";
    }

    "finalize"
}
