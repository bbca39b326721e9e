//! Topology selection and graph construction.
//!
//! Three shapes exist: the dual-agent (A2A) graph, a dynamic graph compiled
//! from a stored workflow description, and the static single-agent graph.
//! Selection happens once per run, before the first node executes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};

use outreach_core::config::WorkingHoursConfig;
use outreach_core::traits::{CallPlacer, Enricher, MessageGenerator, MessageSender};
use outreach_core::types::{WorkflowDescription, WorkflowNode, WorkflowNodeKind};

use crate::nodes::a2a::{CreativeAgentNode, DeterministicAgentNode, HandoffNode};
use crate::nodes::{
    EnrichNode, FinalizeNode, GenerateMessageNode, PlaceCallNode, SendMessageNode, ValidateNode,
};
use crate::routers::{route_a2a, route_after_sms, route_after_validation};

use super::StateGraph;

/// Which graph shape a run uses. A2A beats a stored workflow, which beats
/// the static default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    A2A,
    Dynamic,
    Static,
}

impl Topology {
    pub fn select(use_a2a: bool, workflow: Option<&WorkflowDescription>) -> Self {
        if use_a2a {
            Topology::A2A
        } else if workflow.is_some_and(|w| !w.nodes.is_empty()) {
            Topology::Dynamic
        } else {
            Topology::Static
        }
    }
}

/// The external capabilities nodes are wired to.
#[derive(Clone)]
pub struct Capabilities {
    pub generator: Arc<dyn MessageGenerator>,
    pub sender: Arc<dyn MessageSender>,
    pub placer: Arc<dyn CallPlacer>,
    pub enricher: Arc<dyn Enricher>,
}

/// A constructed graph plus any warnings raised while building it. Static
/// shapes never warn; dynamic builds report every workflow node they had to
/// drop.
pub struct BuiltGraph {
    pub graph: StateGraph,
    pub warnings: Vec<String>,
}

/// What a dynamic workflow node resolved to.
enum Resolved {
    /// Entry marker; carries no engine node.
    Input,
    /// Terminal marker; carries no engine node.
    Output,
    /// A single engine node.
    Node(&'static str),
    /// The SMS pair: edges in land on generate, edges out leave from send.
    SmsPair,
}

fn resolve_kind(kind: WorkflowNodeKind) -> Resolved {
    match kind {
        WorkflowNodeKind::Input => Resolved::Input,
        WorkflowNodeKind::Output => Resolved::Output,
        WorkflowNodeKind::Validate => Resolved::Node("validate"),
        WorkflowNodeKind::Sms => Resolved::SmsPair,
        WorkflowNodeKind::Voice => Resolved::Node("voice_agent"),
        WorkflowNodeKind::Enrich => Resolved::Node("enrichment"),
    }
}

/// Fallback for descriptions that predate the typed kind: match on the
/// label text.
fn resolve_label(label: &str) -> Option<Resolved> {
    let label = label.to_lowercase();
    if label.contains("input") || label.contains("start") {
        Some(Resolved::Input)
    } else if label.contains("output") || label.contains("end") {
        Some(Resolved::Output)
    } else if label.contains("valid") {
        Some(Resolved::Node("validate"))
    } else if label.contains("sms") {
        Some(Resolved::SmsPair)
    } else if label.contains("voice") {
        Some(Resolved::Node("voice_agent"))
    } else if label.contains("enrich") {
        Some(Resolved::Node("enrichment"))
    } else {
        None
    }
}

fn resolve(node: &WorkflowNode) -> Option<Resolved> {
    match node.kind {
        Some(kind) => Some(resolve_kind(kind)),
        None => resolve_label(&node.label),
    }
}

/// Builds executable graphs from a fixed capability set and working-hours
/// policy.
pub struct GraphBuilder {
    caps: Capabilities,
    working_hours: WorkingHoursConfig,
}

impl GraphBuilder {
    pub fn new(caps: Capabilities, working_hours: WorkingHoursConfig) -> Self {
        Self {
            caps,
            working_hours,
        }
    }

    pub fn build(&self, topology: Topology, workflow: Option<&WorkflowDescription>) -> BuiltGraph {
        match topology {
            Topology::A2A => BuiltGraph {
                graph: self.a2a(),
                warnings: vec![],
            },
            Topology::Dynamic => match workflow {
                Some(description) => self.dynamic(description),
                None => BuiltGraph {
                    graph: self.single_agent(),
                    warnings: vec![],
                },
            },
            Topology::Static => BuiltGraph {
                graph: self.single_agent(),
                warnings: vec![],
            },
        }
    }

    /// Static single-agent shape: validate, channel legs per agent type,
    /// finalize.
    pub fn single_agent(&self) -> StateGraph {
        let mut graph = StateGraph::new();
        graph.add_node(Arc::new(ValidateNode::new(self.working_hours.clone())));
        graph.add_node(Arc::new(GenerateMessageNode::new(self.caps.generator.clone())));
        graph.add_node(Arc::new(SendMessageNode::new(self.caps.sender.clone())));
        graph.add_node(Arc::new(PlaceCallNode::new(self.caps.placer.clone())));
        graph.add_node(Arc::new(FinalizeNode));

        graph.set_entry("validate");
        graph.add_conditional_edges(
            "validate",
            Arc::new(|state| route_after_validation(state).to_string()),
            &[
                ("sms_only", "generate_message"),
                ("sms_first", "generate_message"),
                ("voice_only", "voice_agent"),
                ("finalize", "finalize"),
            ],
        );
        graph.add_edge("generate_message", "send_message");
        graph.add_conditional_edges(
            "send_message",
            Arc::new(|state| route_after_sms(state).to_string()),
            &[("voice", "voice_agent"), ("finalize", "finalize")],
        );
        graph.add_edge("voice_agent", "finalize");
        graph.add_terminal_edge("finalize");
        graph
    }

    /// Dual-agent shape: the same router gates entry into the creative leg
    /// and, after the handoff, entry into the deterministic leg.
    pub fn a2a(&self) -> StateGraph {
        let mut graph = StateGraph::new();
        graph.add_node(Arc::new(ValidateNode::new(self.working_hours.clone())));
        graph.add_node(Arc::new(CreativeAgentNode::new(self.caps.generator.clone())));
        graph.add_node(Arc::new(HandoffNode));
        graph.add_node(Arc::new(DeterministicAgentNode::new(self.caps.sender.clone())));
        graph.add_node(Arc::new(FinalizeNode));

        graph.set_entry("validate");
        graph.add_conditional_edges(
            "validate",
            Arc::new(|state| route_a2a(state).to_string()),
            &[("creative", "creative_agent"), ("finalize", "finalize")],
        );
        graph.add_edge("creative_agent", "handoff");
        graph.add_conditional_edges(
            "handoff",
            Arc::new(|state| route_a2a(state).to_string()),
            &[
                ("deterministic", "deterministic_agent"),
                ("finalize", "finalize"),
            ],
        );
        graph.add_edge("deterministic_agent", "finalize");
        graph.add_terminal_edge("finalize");
        graph
    }

    /// Compile a stored workflow description into an executable graph.
    ///
    /// The typed `kind` on each node is authoritative; label matching is the
    /// fallback for untyped imports. Nodes that resolve to nothing are
    /// dropped and reported as warnings. Edges from an input marker set the
    /// entry; output markers resolve to the finalize node, so an edge into
    /// one routes its source there; a validate source becomes a conditional
    /// edge that still bails to finalize on failure.
    pub fn dynamic(&self, description: &WorkflowDescription) -> BuiltGraph {
        let mut graph = StateGraph::new();
        let mut warnings = Vec::new();

        // Where an edge into each visual node lands, and where an edge out
        // of it departs from. They differ only for the SMS pair.
        let mut incoming: HashMap<String, String> = HashMap::new();
        let mut outgoing: HashMap<String, String> = HashMap::new();
        let mut inputs: HashSet<String> = HashSet::new();

        for node in &description.nodes {
            match resolve(node) {
                Some(Resolved::Input) => {
                    inputs.insert(node.id.clone());
                }
                Some(Resolved::Output) => {
                    // Output markers are the finalize node itself, so any
                    // edge into one lands on finalize.
                    incoming.insert(node.id.clone(), "finalize".to_string());
                }
                Some(Resolved::Node(name)) => {
                    self.register(&mut graph, name);
                    incoming.insert(node.id.clone(), name.to_string());
                    outgoing.insert(node.id.clone(), name.to_string());
                }
                Some(Resolved::SmsPair) => {
                    self.register(&mut graph, "generate_message");
                    self.register(&mut graph, "send_message");
                    graph.add_edge("generate_message", "send_message");
                    incoming.insert(node.id.clone(), "generate_message".to_string());
                    outgoing.insert(node.id.clone(), "send_message".to_string());
                }
                None => {
                    let warning = format!(
                        "Workflow node '{}' (label '{}') is not recognized and was dropped",
                        node.id, node.label
                    );
                    warn!(node_id = %node.id, label = %node.label, "Dropping unrecognized workflow node");
                    warnings.push(warning);
                }
            }
        }

        // Finalize is always present and always terminal, whether or not
        // the description mentions it.
        graph.add_node(Arc::new(FinalizeNode));
        graph.add_terminal_edge("finalize");

        let mut entry: Option<String> = None;

        for edge in &description.edges {
            if inputs.contains(edge.source.as_str()) {
                if let Some(target) = incoming.get(&edge.target) {
                    entry = Some(target.clone());
                }
                continue;
            }

            let (Some(source), Some(target)) =
                (outgoing.get(&edge.source), incoming.get(&edge.target))
            else {
                continue; // one end was dropped
            };

            if source == "validate" {
                let target = target.clone();
                let pass_target = target.clone();
                graph.add_conditional_edges(
                    "validate",
                    Arc::new(move |state| {
                        if route_after_validation(state) == "finalize" {
                            "finalize".to_string()
                        } else {
                            pass_target.clone()
                        }
                    }),
                    &[(target.as_str(), target.as_str()), ("finalize", "finalize")],
                );
            } else {
                graph.add_edge(source.clone(), target.clone());
            }
        }

        match entry {
            Some(entry) => graph.set_entry(entry),
            None => {
                // Descriptions without an input marker start at validation.
                self.register(&mut graph, "validate");
                graph.set_entry("validate");
            }
        }

        info!(
            nodes = description.nodes.len(),
            edges = description.edges.len(),
            dropped = warnings.len(),
            "Built dynamic graph"
        );

        BuiltGraph { graph, warnings }
    }

    fn register(&self, graph: &mut StateGraph, name: &str) {
        if graph.has_node(name) {
            return;
        }
        match name {
            "validate" => graph.add_node(Arc::new(ValidateNode::new(self.working_hours.clone()))),
            "generate_message" => {
                graph.add_node(Arc::new(GenerateMessageNode::new(self.caps.generator.clone())))
            }
            "send_message" => graph.add_node(Arc::new(SendMessageNode::new(self.caps.sender.clone()))),
            "voice_agent" => graph.add_node(Arc::new(PlaceCallNode::new(self.caps.placer.clone()))),
            "enrichment" => graph.add_node(Arc::new(EnrichNode::new(self.caps.enricher.clone()))),
            _ => {}
        }
    }
}
