//! End-to-end run scenarios against an in-memory store and scripted
//! capabilities.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use outreach_core::config::WorkingHoursConfig;
use outreach_core::error::{OutreachError, Result};
use outreach_core::traits::{
    CallPlacer, CallReceipt, CampaignStore, DeliveryReceipt, Enricher, GeneratedMessage,
    GenerationRequest, MessageGenerator, MessageSender,
};
use outreach_core::types::{
    AgentProfile, AgentType, Campaign, CampaignStatus, LeadProfile, LeadStatus, LogLevel, Role,
    ToolBinding, WorkflowDescription, WorkflowEdge, WorkflowNode, WorkflowNodeKind,
};
use outreach_engine::{CampaignProcessor, Capabilities, GraphBuilder, RunCoordinator};
use outreach_store::SqliteStore;

struct ScriptedGenerator {
    message: String,
    fail_with: Option<String>,
    calls: Mutex<usize>,
}

impl ScriptedGenerator {
    fn ok(message: &str) -> Arc<Self> {
        Arc::new(Self {
            message: message.to_string(),
            fail_with: None,
            calls: Mutex::new(0),
        })
    }

    fn failing(error: &str) -> Arc<Self> {
        Arc::new(Self {
            message: String::new(),
            fail_with: Some(error.to_string()),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl MessageGenerator for ScriptedGenerator {
    fn generate(&self, _request: GenerationRequest) -> BoxFuture<'_, Result<GeneratedMessage>> {
        Box::pin(async move {
            *self.calls.lock().unwrap() += 1;
            match &self.fail_with {
                Some(error) => Err(OutreachError::Generation(error.clone())),
                None => Ok(GeneratedMessage {
                    message: self.message.clone(),
                    cost: 0.001,
                }),
            }
        })
    }
}

struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSender {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(vec![]),
        })
    }
}

impl MessageSender for RecordingSender {
    fn send(&self, to: &str, message: &str) -> BoxFuture<'_, Result<DeliveryReceipt>> {
        let to = to.to_string();
        let message = message.to_string();
        Box::pin(async move {
            self.sent.lock().unwrap().push((to, message));
            Ok(DeliveryReceipt {
                delivery_id: "scripted".to_string(),
            })
        })
    }
}

struct RejectingSender {
    error: String,
}

impl MessageSender for RejectingSender {
    fn send(&self, _to: &str, _message: &str) -> BoxFuture<'_, Result<DeliveryReceipt>> {
        Box::pin(async move { Err(OutreachError::Delivery(self.error.clone())) })
    }
}

struct ScriptedPlacer;

impl CallPlacer for ScriptedPlacer {
    fn place(&self, lead_id: &str, _profile: &LeadProfile) -> BoxFuture<'_, Result<CallReceipt>> {
        let call_id = format!("mock_call_{}", lead_id);
        Box::pin(async move { Ok(CallReceipt { call_id }) })
    }
}

struct NoEnricher;

impl Enricher for NoEnricher {
    fn enrich(
        &self,
        _profile: &LeadProfile,
    ) -> BoxFuture<'_, Result<serde_json::Map<String, serde_json::Value>>> {
        Box::pin(async move { Ok(serde_json::Map::new()) })
    }
}

struct Harness {
    store: Arc<SqliteStore>,
    generator: Arc<ScriptedGenerator>,
    sender: Arc<RecordingSender>,
    coordinator: RunCoordinator,
}

fn harness_with(generator: Arc<ScriptedGenerator>, working_hours: WorkingHoursConfig) -> Harness {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let sender = RecordingSender::new();
    let caps = Capabilities {
        generator: generator.clone(),
        sender: sender.clone(),
        placer: Arc::new(ScriptedPlacer),
        enricher: Arc::new(NoEnricher),
    };
    let builder = GraphBuilder::new(caps, working_hours);
    let coordinator = RunCoordinator::new(store.clone(), builder, true);
    Harness {
        store,
        generator,
        sender,
        coordinator,
    }
}

fn harness(generator: Arc<ScriptedGenerator>) -> Harness {
    harness_with(
        generator,
        WorkingHoursConfig {
            enforce: false,
            ..Default::default()
        },
    )
}

fn campaign(agent_type: AgentType) -> Campaign {
    Campaign {
        id: "c-1".into(),
        name: "Q3 outreach".into(),
        agent_type,
        status: CampaignStatus::Pending,
        creative_agent: None,
        deterministic_agent: None,
        agent: None,
        sms_system_prompt: Some("You are a helpful sales assistant.".into()),
        sms_temperature: 70,
        workflow: None,
    }
}

fn lead(id: &str, phone: &str) -> outreach_core::types::Lead {
    outreach_core::types::Lead {
        id: id.into(),
        name: "Jane Doe".into(),
        phone: phone.into(),
        email: "jane@example.com".into(),
        company: "Acme".into(),
        notes: String::new(),
    }
}

fn seed(harness: &Harness, campaign: &Campaign) {
    harness.store.insert_campaign(campaign).unwrap();
    harness.store.insert_lead(&lead("l-1", "+15550100")).unwrap();
    harness.store.attach_lead("cl-1", &campaign.id, "l-1").unwrap();
}

// Scenario: SMS-only campaign, everything succeeds.
#[tokio::test]
async fn test_sms_only_run_completes_and_persists_artifacts() {
    let h = harness(ScriptedGenerator::ok("Hi Jane, quick question about Acme."));
    seed(&h, &campaign(AgentType::Sms));

    let result = h.coordinator.run("cl-1").await.unwrap();
    assert!(result.success);
    assert_eq!(result.status, LeadStatus::Completed);
    assert!(result.sms_sent);
    assert!(!result.call_made);

    let row = h.store.campaign_lead("cl-1").await.unwrap().unwrap();
    assert_eq!(row.status, LeadStatus::Completed);
    assert!(row.sms_sent);
    assert_eq!(row.sms_message, "Hi Jane, quick question about Acme.");
    assert!(row.error_message.is_empty());
    assert!(!row.trace_id.is_empty());
    assert!(row.processed_at.is_some());

    // Conversation: system prompt + assistant message
    let conversation = h.store.conversation("cl-1").unwrap();
    assert_eq!(conversation.len(), 2);
    assert_eq!(conversation[0].role, Role::System);
    assert_eq!(conversation[1].role, Role::Assistant);

    // Completed run logs at INFO, one entry per visited node
    let logs = h.store.logs("cl-1").unwrap();
    let nodes: Vec<&str> = logs.iter().map(|(_, e)| e.node.as_str()).collect();
    assert_eq!(
        nodes,
        vec!["validate", "generate_message", "send_message", "finalize"]
    );
    assert!(logs.iter().all(|(level, _)| *level == LogLevel::Info));

    let sent = h.sender.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "+15550100");
}

// Scenario: dual-channel campaign orders SMS before voice.
#[tokio::test]
async fn test_both_channels_sms_then_voice() {
    let h = harness(ScriptedGenerator::ok("Hi Jane!"));
    seed(&h, &campaign(AgentType::Both));

    let result = h.coordinator.run("cl-1").await.unwrap();
    assert!(result.success);
    assert!(result.sms_sent);
    assert!(result.call_made);

    let logs = h.store.logs("cl-1").unwrap();
    let nodes: Vec<&str> = logs.iter().map(|(_, e)| e.node.as_str()).collect();
    assert_eq!(
        nodes,
        vec![
            "validate",
            "generate_message",
            "send_message",
            "voice_agent",
            "finalize"
        ]
    );
}

// Scenario: voice-only campaign places the mock call.
#[tokio::test]
async fn test_voice_only_uses_mock_call_id() {
    let h = harness(ScriptedGenerator::ok("unused"));
    seed(&h, &campaign(AgentType::Voice));

    let result = h.coordinator.run("cl-1").await.unwrap();
    assert!(result.success);
    assert!(result.call_made);
    assert!(!result.sms_sent);
    // The generator is never consulted on the voice-only path
    assert_eq!(h.generator.calls(), 0);
}

// Scenario: A2A campaign runs creative, handoff, deterministic.
#[tokio::test]
async fn test_a2a_run_tags_conversation_by_agent() {
    let h = harness(ScriptedGenerator::ok("Creative draft for Jane"));
    let mut c = campaign(AgentType::Sms);
    c.creative_agent = Some(AgentProfile {
        id: "a-c".into(),
        system_prompt: "Write engaging copy.".into(),
        model: "gpt-4o".into(),
        tools: vec![],
    });
    c.deterministic_agent = Some(AgentProfile {
        id: "a-d".into(),
        system_prompt: "Execute actions.".into(),
        model: "gpt-4o".into(),
        tools: vec![ToolBinding {
            name: "crm_update_lead".into(),
            config: serde_json::Value::Null,
        }],
    });
    seed(&h, &c);

    let result = h.coordinator.run("cl-1").await.unwrap();
    assert!(result.success);
    assert!(result.sms_sent);

    let logs = h.store.logs("cl-1").unwrap();
    let nodes: Vec<&str> = logs.iter().map(|(_, e)| e.node.as_str()).collect();
    assert!(nodes.contains(&"creative_agent"));
    assert!(nodes.contains(&"handoff"));
    assert!(nodes.contains(&"deterministic_agent"));

    let conversation = h.store.conversation("cl-1").unwrap();
    let creative: Vec<_> = conversation
        .iter()
        .filter(|e| e.agent.as_deref() == Some("creative"))
        .collect();
    let deterministic: Vec<_> = conversation
        .iter()
        .filter(|e| e.agent.as_deref() == Some("deterministic"))
        .collect();
    assert_eq!(creative.len(), 1);
    assert_eq!(creative[0].agent_id.as_deref(), Some("a-c"));
    assert_eq!(deterministic.len(), 1);
    assert_eq!(deterministic[0].role, Role::Tool);
}

// Scenario: A2A with a failing creative agent. The handoff router yields a
// label the graph has no mapping for, which is an engine failure; the row
// is still written back as failed.
#[tokio::test]
async fn test_a2a_creative_failure_marks_row_failed() {
    let h = harness(ScriptedGenerator::failing("quota exceeded"));
    let mut c = campaign(AgentType::Sms);
    c.creative_agent = Some(AgentProfile {
        id: "a-c".into(),
        system_prompt: "Write.".into(),
        model: "gpt-4o".into(),
        tools: vec![],
    });
    c.deterministic_agent = Some(AgentProfile {
        id: "a-d".into(),
        system_prompt: "Act.".into(),
        model: "gpt-4o".into(),
        tools: vec![],
    });
    seed(&h, &c);

    let result = h.coordinator.run("cl-1").await.unwrap();
    assert!(!result.success);
    assert_eq!(result.status, LeadStatus::Failed);
    assert!(result.error_message.contains("creative"));

    let row = h.store.campaign_lead("cl-1").await.unwrap().unwrap();
    assert_eq!(row.status, LeadStatus::Failed);
    assert!(!row.sms_sent);
}

// Scenario: A2A where the creative agent writes a draft but delivery fails.
// The run finishes through finalize as failed and the delivery error is the
// row's error message.
#[tokio::test]
async fn test_a2a_deterministic_failure_reports_delivery_error() {
    let h = harness(ScriptedGenerator::ok("Creative draft for Jane"));
    let coordinator = coordinator_for(
        &h,
        Arc::new(RejectingSender {
            error: "carrier rejected the message".into(),
        }),
    );
    let mut c = campaign(AgentType::Sms);
    c.creative_agent = Some(AgentProfile {
        id: "a-c".into(),
        system_prompt: "Write.".into(),
        model: "gpt-4o".into(),
        tools: vec![],
    });
    c.deterministic_agent = Some(AgentProfile {
        id: "a-d".into(),
        system_prompt: "Act.".into(),
        model: "gpt-4o".into(),
        tools: vec![],
    });
    seed(&h, &c);

    let result = coordinator.run("cl-1").await.unwrap();
    assert!(!result.success);
    assert_eq!(result.status, LeadStatus::Failed);
    assert!(result.error_message.contains("carrier rejected the message"));

    let row = h.store.campaign_lead("cl-1").await.unwrap().unwrap();
    assert_eq!(row.status, LeadStatus::Failed);
    assert!(!row.sms_sent);
    assert!(row.error_message.contains("carrier rejected the message"));

    // The creative half still ran; its draft is on the transcript
    let conversation = h.store.conversation("cl-1").unwrap();
    assert!(conversation
        .iter()
        .any(|e| e.agent.as_deref() == Some("creative")));
}

// Scenario: lead with no phone number never reaches a channel.
#[tokio::test]
async fn test_validation_failure_skips_channels_and_logs_error() {
    let h = harness(ScriptedGenerator::ok("unused"));
    h.store.insert_campaign(&campaign(AgentType::Sms)).unwrap();
    h.store.insert_lead(&lead("l-1", "")).unwrap();
    h.store.attach_lead("cl-1", "c-1", "l-1").unwrap();

    let result = h.coordinator.run("cl-1").await.unwrap();
    assert!(!result.success);
    assert_eq!(result.status, LeadStatus::Failed);
    assert_eq!(result.error_message, "Missing phone number");
    assert_eq!(h.generator.calls(), 0);
    assert!(h.sender.sent.lock().unwrap().is_empty());

    // Failed run logs at ERROR
    let logs = h.store.logs("cl-1").unwrap();
    assert!(logs.iter().all(|(level, _)| *level == LogLevel::Error));
    let nodes: Vec<&str> = logs.iter().map(|(_, e)| e.node.as_str()).collect();
    assert_eq!(nodes, vec!["validate", "finalize"]);
}

// Scenario: enforced working hours with an empty window always fail
// validation, regardless of the wall clock.
#[tokio::test]
async fn test_closed_working_hours_block_every_send() {
    let h = harness_with(
        ScriptedGenerator::ok("unused"),
        WorkingHoursConfig {
            enforce: true,
            start_hour: 0,
            end_hour: 0,
            allow_weekend: true,
        },
    );
    seed(&h, &campaign(AgentType::Sms));

    let result = h.coordinator.run("cl-1").await.unwrap();
    assert!(!result.success);
    assert!(result.error_message.contains("Outside working hours"));
    assert_eq!(h.generator.calls(), 0);
}

// Append-only accumulation across the whole run: every visited node
// contributes at least one log entry and none are lost or reordered.
#[tokio::test]
async fn test_log_accumulates_one_entry_per_node_in_order() {
    let h = harness(ScriptedGenerator::ok("Hi Jane!"));
    seed(&h, &campaign(AgentType::Both));

    h.coordinator.run("cl-1").await.unwrap();

    let logs = h.store.logs("cl-1").unwrap();
    assert_eq!(logs.len(), 5);
    for window in logs.windows(2) {
        assert!(window[0].1.timestamp <= window[1].1.timestamp);
    }
}

// Scenario: stored workflow with an unrecognized node builds with a warning
// and still runs the recognized part.
#[tokio::test]
async fn test_dynamic_workflow_with_unknown_node_still_runs() {
    let h = harness(ScriptedGenerator::ok("Hi Jane!"));
    let mut c = campaign(AgentType::Sms);
    c.workflow = Some(WorkflowDescription {
        nodes: vec![
            WorkflowNode {
                id: "n1".into(),
                label: "Start".into(),
                kind: Some(WorkflowNodeKind::Input),
            },
            WorkflowNode {
                id: "n2".into(),
                label: "Validate".into(),
                kind: Some(WorkflowNodeKind::Validate),
            },
            WorkflowNode {
                id: "n3".into(),
                label: "Send SMS".into(),
                kind: Some(WorkflowNodeKind::Sms),
            },
            WorkflowNode {
                id: "n4".into(),
                label: "Crystal Ball".into(),
                kind: None,
            },
        ],
        edges: vec![
            WorkflowEdge {
                source: "n1".into(),
                target: "n2".into(),
            },
            WorkflowEdge {
                source: "n2".into(),
                target: "n3".into(),
            },
        ],
    });
    seed(&h, &c);

    let result = h.coordinator.run("cl-1").await.unwrap();
    assert!(result.sms_sent);

    // The dropped node surfaces in the persisted log
    let logs = h.store.logs("cl-1").unwrap();
    assert!(logs
        .iter()
        .any(|(_, e)| e.node == "graph_builder" && e.message.contains("Crystal Ball")));
}

// Scenario: a workflow wired into a cycle aborts at the visit limit; the
// row is marked failed instead of keeping a non-terminal status.
#[tokio::test]
async fn test_cyclic_workflow_marks_row_failed() {
    let h = harness(ScriptedGenerator::ok("Hi Jane!"));
    let mut c = campaign(AgentType::Sms);
    c.workflow = Some(WorkflowDescription {
        nodes: vec![
            WorkflowNode {
                id: "n1".into(),
                label: "Start".into(),
                kind: Some(WorkflowNodeKind::Input),
            },
            WorkflowNode {
                id: "n2".into(),
                label: "Validate".into(),
                kind: Some(WorkflowNodeKind::Validate),
            },
            WorkflowNode {
                id: "n3".into(),
                label: "Send SMS".into(),
                kind: Some(WorkflowNodeKind::Sms),
            },
        ],
        edges: vec![
            WorkflowEdge {
                source: "n1".into(),
                target: "n2".into(),
            },
            WorkflowEdge {
                source: "n2".into(),
                target: "n3".into(),
            },
            // Self-edge on the SMS node wires a generate/send cycle
            WorkflowEdge {
                source: "n3".into(),
                target: "n3".into(),
            },
        ],
    });
    seed(&h, &c);

    let result = h.coordinator.run("cl-1").await.unwrap();
    assert!(!result.success);
    assert_eq!(result.status, LeadStatus::Failed);
    assert!(result.error_message.contains("visit limit"));

    let row = h.store.campaign_lead("cl-1").await.unwrap().unwrap();
    assert_eq!(row.status, LeadStatus::Failed);
}

#[tokio::test]
async fn test_missing_campaign_lead_is_an_error() {
    let h = harness(ScriptedGenerator::ok("unused"));
    let err = h.coordinator.run("missing").await.unwrap_err();
    assert!(matches!(err, OutreachError::CampaignLeadNotFound(_)));
}

fn coordinator_for(h: &Harness, sender: Arc<dyn MessageSender>) -> RunCoordinator {
    let caps = Capabilities {
        generator: h.generator.clone(),
        sender,
        placer: Arc::new(ScriptedPlacer),
        enricher: Arc::new(NoEnricher),
    };
    RunCoordinator::new(
        h.store.clone(),
        GraphBuilder::new(
            caps,
            WorkingHoursConfig {
                enforce: false,
                ..Default::default()
            },
        ),
        false,
    )
}

fn processor_for(h: &Harness, sender: Arc<dyn MessageSender>) -> CampaignProcessor {
    let coordinator = Arc::new(coordinator_for(h, sender));
    CampaignProcessor::new(h.store.clone(), coordinator)
}

// Sweep: processes pending leads in order and refreshes campaign stats.
#[tokio::test]
async fn test_sweep_processes_all_pending_leads() {
    let h = harness(ScriptedGenerator::ok("Hi!"));
    h.store.insert_campaign(&campaign(AgentType::Sms)).unwrap();
    for i in 0..3 {
        let lead_id = format!("l-{}", i);
        h.store.insert_lead(&lead(&lead_id, "+15550100")).unwrap();
        h.store
            .attach_lead(&format!("cl-{}", i), "c-1", &lead_id)
            .unwrap();
    }

    let processor = processor_for(&h, h.sender.clone());
    let outcome = processor.process_campaign("c-1").await.unwrap();
    assert_eq!(outcome.processed, 3);
    assert_eq!(outcome.succeeded, 3);
    assert_eq!(outcome.failed, 0);
    assert!(!outcome.paused);

    assert_eq!(
        h.store.campaign_status("c-1").await.unwrap(),
        CampaignStatus::Completed
    );
    let (total, processed, sent, failed) = h.store.campaign_counters("c-1").unwrap();
    assert_eq!((total, processed, sent, failed), (3, 3, 3, 0));
}

/// Sender that pauses the campaign as a side effect of its first delivery,
/// simulating an operator pausing mid-sweep.
struct PausingSender {
    store: Arc<SqliteStore>,
    campaign_id: String,
}

impl MessageSender for PausingSender {
    fn send(&self, _to: &str, _message: &str) -> BoxFuture<'_, Result<DeliveryReceipt>> {
        Box::pin(async move {
            self.store
                .set_campaign_status(&self.campaign_id, CampaignStatus::Paused)
                .await?;
            Ok(DeliveryReceipt {
                delivery_id: "paused".to_string(),
            })
        })
    }
}

// Sweep: a pause takes effect at the next lead boundary, not mid-run.
#[tokio::test]
async fn test_sweep_halts_at_lead_boundary_when_paused() {
    let h = harness(ScriptedGenerator::ok("Hi!"));
    h.store.insert_campaign(&campaign(AgentType::Sms)).unwrap();
    for i in 0..2 {
        let lead_id = format!("l-{}", i);
        h.store.insert_lead(&lead(&lead_id, "+15550100")).unwrap();
        h.store
            .attach_lead(&format!("cl-{}", i), "c-1", &lead_id)
            .unwrap();
    }

    let pausing = Arc::new(PausingSender {
        store: h.store.clone(),
        campaign_id: "c-1".into(),
    });
    let processor = processor_for(&h, pausing);

    let outcome = processor.process_campaign("c-1").await.unwrap();
    assert!(outcome.paused);
    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.succeeded, 1);

    // The first lead completed; the second was never touched
    let first = h.store.campaign_lead("cl-0").await.unwrap().unwrap();
    assert_eq!(first.status, LeadStatus::Completed);
    let second = h.store.campaign_lead("cl-1").await.unwrap().unwrap();
    assert_eq!(second.status, LeadStatus::Pending);

    assert_eq!(
        h.store.campaign_status("c-1").await.unwrap(),
        CampaignStatus::Paused
    );
}
