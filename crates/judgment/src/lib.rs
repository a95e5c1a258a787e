//! LLM triage for ambiguous events.
//!
//! Works with any OpenAI-compatible `/chat/completions` endpoint (OpenAI,
//! OpenRouter, Ollama). One non-streaming call per ambiguous event with a
//! hard 15s deadline.
//!
//! The layer is deliberately fail-open: model misconfiguration, transport
//! errors, timeouts, empty output, and unparseable replies all resolve to
//! a push. The agent is the last line of defense; triage failure must
//! never suppress an event.

use async_trait::async_trait;
use betterclaw_core::context::DeviceContext;
use betterclaw_core::error::JudgmentError;
use betterclaw_core::event::DeviceEvent;
use betterclaw_core::judge::{Judge, Judgment};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Hard deadline for one judgment call.
const JUDGMENT_TIMEOUT_SECS: u64 = 15;

/// LLM-backed implementation of the [`Judge`] seam.
pub struct LlmJudge {
    /// Full model reference in `provider/model` form.
    model: String,
    api_key: Option<String>,
    push_budget: u32,
    client: reqwest::Client,
}

impl LlmJudge {
    pub fn new(model: impl Into<String>, api_key: Option<String>, push_budget: u32) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(JUDGMENT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self { model: model.into(), api_key, push_budget, client }
    }

    /// Split `provider/model` and resolve the provider's base URL.
    fn endpoint(&self) -> Result<(String, &str), JudgmentError> {
        let Some((provider, model)) = self.model.split_once('/') else {
            return Err(JudgmentError::NotConfigured(format!(
                "model '{}' is not in provider/model form",
                self.model
            )));
        };
        let base = match provider {
            "openai" => "https://api.openai.com/v1",
            "openrouter" => "https://openrouter.ai/api/v1",
            "ollama" => "http://localhost:11434/v1",
            other => {
                return Err(JudgmentError::NotConfigured(format!(
                    "unknown provider '{other}'"
                )))
            }
        };
        if provider != "ollama" && self.api_key.is_none() {
            return Err(JudgmentError::NotConfigured("no API key available".into()));
        }
        Ok((format!("{base}/chat/completions"), model))
    }

    async fn invoke(&self, prompt: &str) -> Result<String, JudgmentError> {
        let (url, model) = self.endpoint()?;

        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0,
            "stream": false,
        });

        debug!(model = %self.model, "Sending judgment request");

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    JudgmentError::Timeout(JUDGMENT_TIMEOUT_SECS)
                } else {
                    JudgmentError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(JudgmentError::ApiError { status_code: status.as_u16(), message });
        }

        let reply: Value =
            response.json().await.map_err(|e| JudgmentError::Network(e.to_string()))?;
        let content = reply["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .trim()
            .to_string();
        if content.is_empty() {
            return Err(JudgmentError::EmptyReply);
        }
        Ok(content)
    }
}

#[async_trait]
impl Judge for LlmJudge {
    async fn evaluate(&self, event: &DeviceEvent, context: &DeviceContext) -> Judgment {
        let prompt = build_prompt(event, context, self.push_budget);

        let deadline = std::time::Duration::from_secs(JUDGMENT_TIMEOUT_SECS);
        let outcome = match tokio::time::timeout(deadline, self.invoke(&prompt)).await {
            Err(_) => Err(JudgmentError::Timeout(JUDGMENT_TIMEOUT_SECS)),
            Ok(result) => result,
        };

        match outcome {
            Ok(text) => match parse_reply(&text) {
                Some(judgment) => judgment,
                None => {
                    warn!(reply = %text, "Unparseable judgment reply");
                    fail_open("unparseable reply")
                }
            },
            Err(e) => {
                warn!(error = %e, "Judgment call failed");
                fail_open(&e.to_string())
            }
        }
    }
}

fn fail_open(why: &str) -> Judgment {
    Judgment { push: true, reason: format!("{why} — fail open") }
}

/// Build the deterministic triage prompt.
///
/// The context is sanitized first: raw coordinates never reach the model,
/// only the location label and its timestamp.
pub fn build_prompt(event: &DeviceEvent, context: &DeviceContext, push_budget: u32) -> String {
    let sanitized = sanitize_context(context);
    let context_json =
        serde_json::to_string_pretty(&sanitized).unwrap_or_else(|_| "{}".into());
    let event_json = serde_json::to_string_pretty(event).unwrap_or_else(|_| "{}".into());
    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    format!(
        "You are triaging telemetry from a user's phone for their AI assistant.\n\
         Decide whether this event is worth pushing into the assistant's session\n\
         or should be silently dropped.\n\
         \n\
         Current time: {now}\n\
         \n\
         Device context:\n{context_json}\n\
         \n\
         Event:\n{event_json}\n\
         \n\
         Pushes already sent today: {pushes} of {push_budget}.\n\
         \n\
         Reply with a single JSON object: {{\"push\": true|false, \"reason\": \"...\"}}",
        pushes = context.meta.pushes_today,
    )
}

/// Reduce `device.location` to `{label, updatedAt}` before the context
/// leaves the process.
fn sanitize_context(context: &DeviceContext) -> Value {
    let mut value = serde_json::to_value(context).unwrap_or_else(|_| json!({}));
    if let Some(location) = value.pointer_mut("/device/location") {
        let label = location.get("label").cloned().unwrap_or(Value::Null);
        let updated_at = location.get("updatedAt").cloned().unwrap_or(Value::Null);
        *location = json!({ "label": label, "updatedAt": updated_at });
    }
    value
}

#[derive(Deserialize)]
struct JudgeReply {
    push: bool,
    #[serde(default)]
    reason: String,
}

/// Parse the model's `{push, reason}` reply, tolerating a triple-backtick
/// fence around the JSON.
pub fn parse_reply(text: &str) -> Option<Judgment> {
    let trimmed = text.trim();
    let body = if trimmed.starts_with("```") {
        let inner = trimmed.trim_start_matches("```json").trim_start_matches("```");
        inner.trim_end_matches("```").trim()
    } else {
        trimmed
    };
    let reply: JudgeReply = serde_json::from_str(body).ok()?;
    let reason = if reply.reason.is_empty() { "model gave no reason".into() } else { reply.reason };
    Some(Judgment { push: reply.push, reason })
}
