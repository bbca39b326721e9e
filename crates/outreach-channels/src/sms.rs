//! SMS transports.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::{info, warn};

use outreach_core::config::SmsConfig;
use outreach_core::error::{OutreachError, Result};
use outreach_core::traits::{DeliveryReceipt, MessageSender};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Logs instead of sending. The default transport for development and test.
pub struct MockSmsSender {
    counter: AtomicU64,
}

impl MockSmsSender {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for MockSmsSender {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageSender for MockSmsSender {
    fn send(&self, to: &str, message: &str) -> BoxFuture<'_, Result<DeliveryReceipt>> {
        let to = to.to_string();
        let length = message.len();
        Box::pin(async move {
            let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
            info!(%to, length, "Mock SMS delivered");
            Ok(DeliveryReceipt {
                delivery_id: format!("mock_sms_{}", n),
            })
        })
    }
}

/// Twilio REST transport.
pub struct TwilioSender {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

#[derive(Deserialize)]
struct TwilioResponse {
    #[serde(default)]
    sid: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl TwilioSender {
    pub fn new(config: &SmsConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_from_number.clone(),
        }
    }
}

impl MessageSender for TwilioSender {
    fn send(&self, to: &str, message: &str) -> BoxFuture<'_, Result<DeliveryReceipt>> {
        let to = to.to_string();
        let message = message.to_string();
        Box::pin(async move {
            let url = format!(
                "{}/Accounts/{}/Messages.json",
                TWILIO_API_BASE, self.account_sid
            );

            let response = self
                .http
                .post(&url)
                .basic_auth(&self.account_sid, Some(&self.auth_token))
                .form(&[
                    ("To", to.as_str()),
                    ("From", self.from_number.as_str()),
                    ("Body", message.as_str()),
                ])
                .send()
                .await
                .map_err(|e| OutreachError::Delivery(e.to_string()))?;

            let status = response.status();
            let parsed: TwilioResponse = response
                .json()
                .await
                .map_err(|e| OutreachError::Delivery(e.to_string()))?;

            if !status.is_success() {
                let detail = parsed.message.unwrap_or_else(|| "unknown".to_string());
                return Err(OutreachError::Delivery(format!(
                    "Twilio HTTP {}: {}",
                    status, detail
                )));
            }

            let sid = parsed
                .sid
                .ok_or_else(|| OutreachError::Delivery("Twilio response missing sid".to_string()))?;

            info!(%to, sid = %sid, "SMS delivered via Twilio");
            Ok(DeliveryReceipt { delivery_id: sid })
        })
    }
}

/// Build the configured transport. An unconfigured twilio provider falls
/// back to the mock so a half-filled config file still runs.
pub fn sender_from_config(config: &SmsConfig) -> Arc<dyn MessageSender> {
    match config.provider.as_str() {
        "twilio" => {
            if config.twilio_account_sid.is_empty()
                || config.twilio_auth_token.is_empty()
                || config.twilio_from_number.is_empty()
            {
                warn!("Twilio provider selected but not fully configured, using mock sender");
                Arc::new(MockSmsSender::new())
            } else {
                Arc::new(TwilioSender::new(config))
            }
        }
        "mock" => Arc::new(MockSmsSender::new()),
        other => {
            warn!(provider = %other, "Unknown SMS provider, using mock sender");
            Arc::new(MockSmsSender::new())
        }
    }
}
