//! Campaign run engine: per-lead state machine, graph topologies, and the
//! coordinators that drive them against the persistence boundary.

pub mod coordinator;
pub mod graph;
pub mod nodes;
pub mod routers;
pub mod state;
pub mod sweep;

#[cfg(test)]
pub(crate) mod test_support;

pub use coordinator::{initialize_state, RunCoordinator};
pub use graph::{BuiltGraph, Capabilities, GraphBuilder, StateGraph, Topology};
pub use state::{ProcessingState, StateUpdate};
pub use sweep::{CampaignProcessor, SweepOutcome};
