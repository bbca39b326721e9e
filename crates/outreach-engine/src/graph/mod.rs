//! Graph execution engine — a directed state machine over named nodes.
//!
//! A graph is a set of [`StateNode`]s plus one transition per node: an
//! unconditional edge, a conditional edge (a router mapping labels to
//! targets), or termination. The executor walks from the entry node,
//! applying each node's [`StateUpdate`] through the state's merge rules, and
//! follows transitions until a terminal node; runaway cycles abort the run.

pub mod builder;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use outreach_core::error::{OutreachError, Result};

use crate::nodes::StateNode;
use crate::state::ProcessingState;

pub use builder::{BuiltGraph, Capabilities, GraphBuilder, Topology};

/// Upper bound on visits to a single node; trips only on malformed dynamic
/// graphs that wire a cycle.
const MAX_NODE_VISITS: usize = 5;

/// Chooses the next-step label from the state. Wraps the pure router
/// functions so dynamic graphs can close over a parameterized target.
pub type RouterFn = Arc<dyn Fn(&ProcessingState) -> String + Send + Sync>;

/// Outgoing transition of a node.
pub enum Transition {
    /// Terminal node; execution stops after it runs.
    End,
    /// Unconditional edge.
    To(String),
    /// Conditional edge: the router's label is mapped onto a target node.
    Conditional {
        router: RouterFn,
        targets: HashMap<String, String>,
    },
}

/// An executable directed graph of state nodes.
pub struct StateGraph {
    nodes: HashMap<String, Arc<dyn StateNode>>,
    transitions: HashMap<String, Transition>,
    entry: String,
}

impl StateGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            transitions: HashMap::new(),
            entry: String::new(),
        }
    }

    pub fn add_node(&mut self, node: Arc<dyn StateNode>) {
        self.nodes.insert(node.name().to_string(), node);
    }

    pub fn set_entry(&mut self, name: impl Into<String>) {
        self.entry = name.into();
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Install an unconditional edge. A later edge from the same node
    /// replaces the earlier one.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.transitions.insert(from.into(), Transition::To(to.into()));
    }

    /// Mark a node terminal.
    pub fn add_terminal_edge(&mut self, from: impl Into<String>) {
        self.transitions.insert(from.into(), Transition::End);
    }

    /// Install a conditional edge: `router` yields a label, `targets` maps
    /// labels onto node names.
    pub fn add_conditional_edges(
        &mut self,
        from: impl Into<String>,
        router: RouterFn,
        targets: &[(&str, &str)],
    ) {
        self.transitions.insert(
            from.into(),
            Transition::Conditional {
                router,
                targets: targets
                    .iter()
                    .map(|(label, node)| (label.to_string(), node.to_string()))
                    .collect(),
            },
        );
    }

    /// Execute the graph to completion, threading the state through every
    /// visited node.
    ///
    /// Node failures never surface here — nodes are total and encode
    /// failures into the state. Errors from this method are engine
    /// failures: a missing node, a router label with no mapped target, or a
    /// cycle tripping the visit limit.
    pub async fn execute(&self, initial: ProcessingState) -> Result<ProcessingState> {
        let mut state = initial;
        let mut current = self.entry.clone();
        let mut visits: HashMap<String, usize> = HashMap::new();

        loop {
            let seen = visits.entry(current.clone()).or_insert(0);
            *seen += 1;
            if *seen > MAX_NODE_VISITS {
                warn!(node = %current, "Node visited more than {MAX_NODE_VISITS} times, aborting graph");
                return Err(OutreachError::CycleDetected(current));
            }

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| OutreachError::NodeNotFound(current.clone()))?;

            info!(node = %current, "Executing graph node");
            let update = node.run(&state).await;
            state.apply(update);

            match self.transitions.get(&current) {
                None | Some(Transition::End) => {
                    debug!(node = %current, "Graph complete");
                    break;
                }
                Some(Transition::To(next)) => {
                    current = next.clone();
                }
                Some(Transition::Conditional { router, targets }) => {
                    let label = router(&state);
                    match targets.get(&label) {
                        Some(next) => {
                            debug!(node = %current, label = %label, next = %next, "Routed");
                            current = next.clone();
                        }
                        None => {
                            return Err(OutreachError::UnmappedRoute {
                                router: current.clone(),
                                label,
                            });
                        }
                    }
                }
            }
        }

        Ok(state)
    }
}

impl Default for StateGraph {
    fn default() -> Self {
        Self::new()
    }
}
