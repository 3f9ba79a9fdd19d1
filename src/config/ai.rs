// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::env;

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_temperature() -> f32 {
    0.2
}

/// `[classifier]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// "gemini" | "openai" | "disabled" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Provider model id; each provider has its own default.
    #[serde(default)]
    pub model: Option<String>,
    /// "ENV" means: read from GEMINI_API_KEY / OPENAI_API_KEY (by provider)
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            api_key: default_api_key(),
            temperature: default_temperature(),
        }
    }
}

impl ClassifierConfig {
    pub fn normalize(&mut self) {
        self.provider = self.provider.trim().to_ascii_lowercase();
        if !(0.0..=2.0).contains(&self.temperature) {
            self.temperature = default_temperature();
        }
    }

    /// Env var holding the credential for the configured provider.
    pub fn key_env_var(&self) -> Option<&'static str> {
        match self.provider.as_str() {
            "gemini" => Some("GEMINI_API_KEY"),
            "openai" => Some("OPENAI_API_KEY"),
            _ => None,
        }
    }

    /// Resolve the credential. A missing or blank key is `None`, which puts the
    /// pipeline into degraded mode instead of failing startup.
    pub fn resolve_api_key(&self) -> Option<String> {
        let raw = if self.api_key.trim().eq_ignore_ascii_case("env") {
            env::var(self.key_env_var()?).ok()?
        } else {
            self.api_key.clone()
        };
        let key = raw.trim();
        if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }
}
