//! Campaign sweep: sequential processing of every pending lead.

use std::sync::Arc;

use tracing::{error, info, warn};

use outreach_core::error::Result;
use outreach_core::traits::CampaignStore;
use outreach_core::types::CampaignStatus;

use crate::coordinator::RunCoordinator;

/// Totals for one sweep over a campaign's pending leads.
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// True when the sweep stopped early because the campaign was paused.
    pub paused: bool,
}

/// Drives a whole campaign through the coordinator, one lead at a time.
///
/// The campaign status is re-read between leads so an operator pause takes
/// effect at the next lead boundary. A lead that fails does not stop the
/// sweep.
pub struct CampaignProcessor {
    store: Arc<dyn CampaignStore>,
    coordinator: Arc<RunCoordinator>,
}

impl CampaignProcessor {
    pub fn new(store: Arc<dyn CampaignStore>, coordinator: Arc<RunCoordinator>) -> Self {
        Self { store, coordinator }
    }

    pub async fn process_campaign(&self, campaign_id: &str) -> Result<SweepOutcome> {
        match self.sweep(campaign_id).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(campaign_id, error = %e, "Campaign sweep failed");
                self.store
                    .set_campaign_status(campaign_id, CampaignStatus::Failed)
                    .await?;
                Err(e)
            }
        }
    }

    async fn sweep(&self, campaign_id: &str) -> Result<SweepOutcome> {
        let pending = self.store.pending_lead_ids(campaign_id).await?;
        info!(campaign_id, pending = pending.len(), "Starting campaign sweep");

        self.store
            .set_campaign_status(campaign_id, CampaignStatus::Processing)
            .await?;

        let mut outcome = SweepOutcome::default();

        for campaign_lead_id in pending {
            if self.store.campaign_status(campaign_id).await? == CampaignStatus::Paused {
                warn!(campaign_id, "Campaign paused, halting sweep");
                outcome.paused = true;
                return Ok(outcome);
            }

            outcome.processed += 1;
            match self.coordinator.run(&campaign_lead_id).await {
                Ok(result) if result.success => outcome.succeeded += 1,
                Ok(result) => {
                    warn!(
                        campaign_id,
                        campaign_lead_id = %campaign_lead_id,
                        error = %result.error_message,
                        "Lead run did not complete"
                    );
                    outcome.failed += 1;
                }
                Err(e) => {
                    // A broken row must not take the campaign down with it.
                    error!(
                        campaign_id,
                        campaign_lead_id = %campaign_lead_id,
                        error = %e,
                        "Lead run errored"
                    );
                    outcome.failed += 1;
                }
            }
        }

        self.store
            .set_campaign_status(campaign_id, CampaignStatus::Completed)
            .await?;
        self.store.refresh_campaign_stats(campaign_id).await?;

        info!(
            campaign_id,
            processed = outcome.processed,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "Campaign sweep complete"
        );

        Ok(outcome)
    }
}
