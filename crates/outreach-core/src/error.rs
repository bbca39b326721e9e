use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutreachError {
    // Capability errors
    #[error("Message generation failed: {0}")]
    Generation(String),

    #[error("Message delivery failed: {0}")]
    Delivery(String),

    #[error("Call placement failed: {0}")]
    Telephony(String),

    #[error("Enrichment failed: {0}")]
    Enrichment(String),

    // Graph errors
    #[error("Graph construction failed: {0}")]
    GraphBuild(String),

    #[error("Graph node not found: {0}")]
    NodeNotFound(String),

    #[error("Router '{router}' produced unmapped label: {label}")]
    UnmappedRoute { router: String, label: String },

    #[error("Graph node '{0}' exceeded the visit limit")]
    CycleDetected(String),

    // Coordinator errors
    #[error("Campaign lead not found: {0}")]
    CampaignLeadNotFound(String),

    #[error("Campaign not found: {0}")]
    CampaignNotFound(String),

    #[error("Lead not found: {0}")]
    LeadNotFound(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Storage errors
    #[error("Database error: {0}")]
    Database(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OutreachError>;
