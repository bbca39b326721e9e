//! Shared fixtures and scripted capabilities for unit tests.

use std::sync::Mutex;

use futures::future::BoxFuture;

use outreach_core::error::{OutreachError, Result};
use outreach_core::traits::{
    CallPlacer, CallReceipt, DeliveryReceipt, Enricher, GeneratedMessage, GenerationRequest,
    MessageGenerator, MessageSender,
};
use outreach_core::types::{AgentType, LeadProfile, LeadStatus};

use crate::state::{
    CampaignSnapshot, EnrichmentResult, ProcessingState, SmsOutcome, ValidationResult,
    VoiceOutcome,
};

pub fn snapshot(agent_type: AgentType) -> CampaignSnapshot {
    CampaignSnapshot {
        agent_type,
        use_a2a: false,
        creative_agent_id: String::new(),
        creative_agent_prompt: String::new(),
        creative_agent_model: String::new(),
        deterministic_agent_id: String::new(),
        deterministic_agent_prompt: String::new(),
        deterministic_agent_model: String::new(),
        deterministic_agent_tools: vec![],
        sms_system_prompt: "You are a helpful sales assistant.".into(),
        sms_model: "gpt-4o-mini".into(),
        sms_temperature: 0.7,
    }
}

pub fn base_state(agent_type: AgentType) -> ProcessingState {
    ProcessingState {
        campaign_lead_id: "cl-1".into(),
        campaign_id: "c-1".into(),
        lead_id: "l-1".into(),
        profile: LeadProfile {
            name: "Jane Doe".into(),
            phone: "+15550100".into(),
            email: "jane@example.com".into(),
            company: "Acme".into(),
            notes: String::new(),
            extra: serde_json::Map::new(),
        },
        config: snapshot(agent_type),
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

pub fn a2a_state() -> ProcessingState {
    let mut state = base_state(AgentType::Sms);
    state.config.use_a2a = true;
    state.config.creative_agent_id = "agent-creative".into();
    state.config.creative_agent_prompt = "You are a creative sales assistant.".into();
    state.config.creative_agent_model = "gpt-4o".into();
    state.config.deterministic_agent_id = "agent-deterministic".into();
    state.config.deterministic_agent_prompt = "You execute tools.".into();
    state.config.deterministic_agent_model = "gpt-4o".into();
    state.validation.passed = true;
    state
}

/// Generator that always returns the same message and records its requests.
pub struct StaticGenerator {
    message: String,
    cost: f64,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl StaticGenerator {
    pub fn new(message: impl Into<String>, cost: f64) -> Self {
        Self {
            message: message.into(),
            cost,
            requests: Mutex::new(vec![]),
        }
    }
}

impl MessageGenerator for StaticGenerator {
    fn generate(&self, request: GenerationRequest) -> BoxFuture<'_, Result<GeneratedMessage>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request);
            Ok(GeneratedMessage {
                message: self.message.clone(),
                cost: self.cost,
            })
        })
    }
}

/// Generator that always fails with the given error.
pub struct FailingGenerator {
    error: String,
    pub calls: Mutex<usize>,
}

impl FailingGenerator {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            calls: Mutex::new(0),
        }
    }
}

impl MessageGenerator for FailingGenerator {
    fn generate(&self, _request: GenerationRequest) -> BoxFuture<'_, Result<GeneratedMessage>> {
        Box::pin(async move {
            *self.calls.lock().unwrap() += 1;
            Err(OutreachError::Generation(self.error.clone()))
        })
    }
}

/// Sender that records every (to, message) pair it delivers.
pub struct StaticSender {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl StaticSender {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(vec![]),
        }
    }
}

impl Default for StaticSender {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageSender for StaticSender {
    fn send(&self, to: &str, message: &str) -> BoxFuture<'_, Result<DeliveryReceipt>> {
        let to = to.to_string();
        let message = message.to_string();
        Box::pin(async move {
            self.sent.lock().unwrap().push((to.clone(), message));
            Ok(DeliveryReceipt {
                delivery_id: format!("test_{}", to),
            })
        })
    }
}

/// Sender that always fails with the given error.
pub struct FailingSender {
    error: String,
}

impl FailingSender {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl MessageSender for FailingSender {
    fn send(&self, _to: &str, _message: &str) -> BoxFuture<'_, Result<DeliveryReceipt>> {
        Box::pin(async move { Err(OutreachError::Delivery(self.error.clone())) })
    }
}

/// Deterministic mock call placer mirroring the bundled implementation.
pub struct StaticPlacer;

impl CallPlacer for StaticPlacer {
    fn place(&self, lead_id: &str, _profile: &LeadProfile) -> BoxFuture<'_, Result<CallReceipt>> {
        let call_id = format!("mock_call_{}", lead_id);
        Box::pin(async move { Ok(CallReceipt { call_id }) })
    }
}

/// Call placer that always fails.
pub struct FailingPlacer {
    error: String,
}

impl FailingPlacer {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl CallPlacer for FailingPlacer {
    fn place(&self, _lead_id: &str, _profile: &LeadProfile) -> BoxFuture<'_, Result<CallReceipt>> {
        Box::pin(async move { Err(OutreachError::Telephony(self.error.clone())) })
    }
}

/// Enricher returning a fixed attribute map.
pub struct StaticEnricher {
    data: serde_json::Map<String, serde_json::Value>,
}

impl StaticEnricher {
    pub fn technology() -> Self {
        let mut data = serde_json::Map::new();
        data.insert("industry".into(), serde_json::json!("Technology"));
        data.insert("size".into(), serde_json::json!("100-500"));
        data.insert("location".into(), serde_json::json!("San Francisco, CA"));
        Self { data }
    }
}

impl Enricher for StaticEnricher {
    fn enrich(
        &self,
        _profile: &LeadProfile,
    ) -> BoxFuture<'_, Result<serde_json::Map<String, serde_json::Value>>> {
        Box::pin(async move { Ok(self.data.clone()) })
    }
}

/// Enricher that always fails.
pub struct FailingEnricher {
    error: String,
}

impl FailingEnricher {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl Enricher for FailingEnricher {
    fn enrich(
        &self,
        _profile: &LeadProfile,
    ) -> BoxFuture<'_, Result<serde_json::Map<String, serde_json::Value>>> {
        Box::pin(async move { Err(OutreachError::Enrichment(self.error.clone())) })
    }
}
