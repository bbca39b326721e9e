//! LLM-backed message generation.
//!
//! One production implementation of the [`MessageGenerator`] capability,
//! speaking the OpenAI-compatible chat completions protocol. Works against
//! OpenAI itself or any compatible endpoint via `base_url`.

mod pricing;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use outreach_core::config::LlmConfig;
use outreach_core::error::{OutreachError, Result};
use outreach_core::traits::{GeneratedMessage, GenerationRequest, MessageGenerator};
use outreach_core::types::{LeadProfile, Role};

pub use pricing::compute_cost;

/// OpenAI-compatible chat completions generator.
pub struct OpenAiGenerator {
    http: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiGenerator {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            http: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Assemble the chat transcript: system prompt, prior conversation as
/// few-shot context (system entries excluded), then the lead context with
/// the SMS length constraint.
fn build_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage {
        role: "system",
        content: request.system_prompt.clone(),
    }];

    for entry in &request.history {
        let role = match entry.role {
            Role::System => continue,
            Role::User => "user",
            // Tool output reads as prior assistant turns to the model.
            Role::Assistant | Role::Tool => "assistant",
        };
        messages.push(ChatMessage {
            role,
            content: entry.content.clone(),
        });
    }

    messages.push(ChatMessage {
        role: "user",
        content: lead_context(&request.profile),
    });

    messages
}

fn lead_context(profile: &LeadProfile) -> String {
    let mut context = format!("Write an outreach SMS for this lead:\nName: {}", profile.name);
    if !profile.company.is_empty() {
        context.push_str(&format!("\nCompany: {}", profile.company));
    }
    if !profile.email.is_empty() {
        context.push_str(&format!("\nEmail: {}", profile.email));
    }
    if !profile.notes.is_empty() {
        context.push_str(&format!("\nNotes: {}", profile.notes));
    }
    if !profile.extra.is_empty() {
        context.push_str("\nEnriched Data:");
        for (key, value) in &profile.extra {
            context.push_str(&format!("\n- {}: {}", key, value));
        }
    }
    context.push_str("\n\nKeep the message under 160 characters, suitable for SMS.");
    context
}

impl MessageGenerator for OpenAiGenerator {
    fn generate(&self, request: GenerationRequest) -> BoxFuture<'_, Result<GeneratedMessage>> {
        Box::pin(async move {
            let body = ChatRequest {
                model: request.model.clone(),
                messages: build_messages(&request),
                temperature: request.temperature,
                max_tokens: 200,
            };

            debug!(model = %request.model, "Requesting message generation");

            let response = self
                .http
                .post(format!("{}/chat/completions", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await
                .map_err(|e| OutreachError::Generation(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let detail = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown".to_string());
                return Err(OutreachError::Generation(format!(
                    "HTTP {}: {}",
                    status, detail
                )));
            }

            let parsed: ChatResponse = response
                .json()
                .await
                .map_err(|e| OutreachError::Generation(e.to_string()))?;

            let message = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .map(|content| content.trim().to_string())
                .ok_or_else(|| {
                    OutreachError::Generation("response contained no message".to_string())
                })?;

            // Missing usage data yields a zero cost, never an error.
            let cost = match parsed.usage {
                Some(usage) => {
                    compute_cost(&request.model, usage.prompt_tokens, usage.completion_tokens)
                }
                None => {
                    warn!(model = %request.model, "No usage data in response, recording zero cost");
                    0.0
                }
            };

            Ok(GeneratedMessage { message, cost })
        })
    }
}
