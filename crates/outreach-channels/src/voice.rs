//! Voice-call capability.
//!
//! Only the deterministic mock ships today; a telephony integration slots
//! in behind the same [`CallPlacer`] contract.

use futures::future::BoxFuture;
use tracing::info;

use outreach_core::error::Result;
use outreach_core::traits::{CallPlacer, CallReceipt};
use outreach_core::types::LeadProfile;

/// Pretends to place a call and returns a deterministic receipt derived
/// from the lead id.
pub struct MockCallPlacer;

impl CallPlacer for MockCallPlacer {
    fn place(&self, lead_id: &str, profile: &LeadProfile) -> BoxFuture<'_, Result<CallReceipt>> {
        let call_id = format!("mock_call_{}", lead_id);
        let to = profile.phone.clone();
        Box::pin(async move {
            info!(%to, call_id = %call_id, "Mock voice call placed");
            Ok(CallReceipt { call_id })
        })
    }
}
