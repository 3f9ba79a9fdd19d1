//! Classifier adapter: one request/response primitive over an external model,
//! `classify(prompt, system) -> json text`, with Gemini and OpenAI providers
//! and a disabled client that forces the rule-based path.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Why a classifier call produced nothing usable. Every variant is absorbed
/// per batch; none reaches the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("no API credential configured")]
    MissingCredential,
    #[error("timed out")]
    Timeout,
    #[error("transport: {0}")]
    Transport(String),
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("empty response")]
    EmptyResponse,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ClassifyError {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifyError::MissingCredential => "missing_credential",
            ClassifyError::Timeout => "timeout",
            ClassifyError::Transport(_) => "transport",
            ClassifyError::HttpStatus(_) => "http_status",
            ClassifyError::EmptyResponse => "empty",
            ClassifyError::InvalidResponse(_) => "invalid_response",
        }
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// False when no credential is available; callers must not attempt I/O.
    fn is_configured(&self) -> bool;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
    async fn classify(&self, prompt: &str, system: &str) -> Result<String, ClassifyError>;
}

pub type DynClassifier = Arc<dyn Classifier>;

/// Factory: build a classifier according to config and environment.
///
/// * `provider = "disabled"` (or unknown) returns the disabled client.
/// * A provider without a resolvable key is built but reports itself as not
///   configured, so the pipeline runs in degraded mode.
pub fn build_classifier(cfg: &ClassifierConfig) -> Result<DynClassifier> {
    let key = cfg.resolve_api_key();
    match cfg.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiClassifier::new(
            key,
            cfg.model.as_deref(),
            cfg.temperature,
        )?)),
        "openai" => Ok(Arc::new(OpenAiClassifier::new(
            key,
            cfg.model.as_deref(),
            cfg.temperature,
        )?)),
        "disabled" => Ok(Arc::new(DisabledClassifier)),
        other => {
            tracing::warn!(target: "classifier", provider = other, "unknown classifier provider, running degraded");
            Ok(Arc::new(DisabledClassifier))
        }
    }
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("LastMile-HIV-Discovery-Monitor/1.0")
        .connect_timeout(Duration::from_secs(5))
        // Backstop only; batches race their own, shorter timer.
        .timeout(Duration::from_secs(60))
        .build()
        .context("building classifier http client")
}

fn transport_error(e: reqwest::Error) -> ClassifyError {
    if e.is_timeout() {
        ClassifyError::Timeout
    } else {
        ClassifyError::Transport(truncate(&e.to_string(), 120))
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn blank_to_none(key: Option<String>) -> Option<String> {
    key.filter(|k| !k.trim().is_empty())
}

// ------------------------------------------------------------
// Gemini (generateContent)
// ------------------------------------------------------------

pub struct GeminiClassifier {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl GeminiClassifier {
    pub const DEFAULT_MODEL: &'static str = "gemini-2.5-flash";

    pub fn new(api_key: Option<String>, model: Option<&str>, temperature: f32) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key: blank_to_none(api_key),
            model: model.unwrap_or(Self::DEFAULT_MODEL).to_string(),
            temperature,
        })
    }
}

#[async_trait]
impl Classifier for GeminiClassifier {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    async fn classify(&self, prompt: &str, system: &str) -> Result<String, ClassifyError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(ClassifyError::MissingCredential);
        };

        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: Option<Content>,
        }
        #[derive(Deserialize)]
        struct Content {
            #[serde(default)]
            parts: Vec<Part>,
        }
        #[derive(Deserialize)]
        struct Part {
            #[serde(default)]
            text: String,
        }

        let body = serde_json::json!({
            "systemInstruction": { "parts": [{ "text": system }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": self.temperature,
            },
        });

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        if !resp.status().is_success() {
            return Err(ClassifyError::HttpStatus(resp.status().as_u16()));
        }
        let parsed: Resp = resp
            .json()
            .await
            .map_err(|e| ClassifyError::InvalidResponse(truncate(&e.to_string(), 120)))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ClassifyError::EmptyResponse);
        }
        Ok(text)
    }
}

// ------------------------------------------------------------
// OpenAI (Chat Completions)
// ------------------------------------------------------------

pub struct OpenAiClassifier {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl OpenAiClassifier {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    pub fn new(api_key: Option<String>, model: Option<&str>, temperature: f32) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key: blank_to_none(api_key),
            model: model.unwrap_or(Self::DEFAULT_MODEL).to_string(),
            temperature,
        })
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }

    async fn classify(&self, prompt: &str, system: &str) -> Result<String, ClassifyError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(ClassifyError::MissingCredential);
        };

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct ResponseFormat<'a> {
            r#type: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            response_format: ResponseFormat<'a>,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            response_format: ResponseFormat {
                r#type: "json_object",
            },
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(key)
            .json(&req)
            .send()
            .await
            .map_err(transport_error)?;
        if !resp.status().is_success() {
            return Err(ClassifyError::HttpStatus(resp.status().as_u16()));
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| ClassifyError::InvalidResponse(truncate(&e.to_string(), 120)))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(ClassifyError::EmptyResponse);
        }
        Ok(content)
    }
}

// ------------------------------------------------------------
// Disabled
// ------------------------------------------------------------

/// Never configured; used when the classifier is switched off.
pub struct DisabledClassifier;

#[async_trait]
impl Classifier for DisabledClassifier {
    fn is_configured(&self) -> bool {
        false
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }

    async fn classify(&self, _prompt: &str, _system: &str) -> Result<String, ClassifyError> {
        Err(ClassifyError::MissingCredential)
    }
}
