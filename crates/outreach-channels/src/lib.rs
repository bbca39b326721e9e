//! Delivery channels: SMS transports, voice calls, and lead enrichment.

pub mod enrich;
pub mod sms;
pub mod voice;

pub use enrich::DomainEnricher;
pub use sms::{sender_from_config, MockSmsSender, TwilioSender};
pub use voice::MockCallPlacer;
