// src/analyze/evidence.rs
//! Free-text evidence analysis: a visitor submits scientific text and the model
//! structures it into timeline milestone cards. Responses are memoized per text
//! in a small in-process cache that evicts the oldest entry first.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analyze::ai_adapter::{truncate, ClassifyError, DynClassifier};
use crate::analyze::batch::strip_code_fences;
use crate::analyze::prompts::{build_evidence_prompt, EVIDENCE_SYSTEM_INSTRUCTION};
use crate::config::AnalyzeConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingMatch {
    pub existing_id: String,
    #[serde(default)]
    pub reason: String,
}

/// Model verdict on one submission. Card bodies pass through untouched; the
/// presentation layer owns their shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub rejected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches_existing: Vec<ExistingMatch>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub new_cards: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_plan: Option<serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("missing or empty text")]
    EmptyText,
    #[error(transparent)]
    Classify(#[from] ClassifyError),
}

impl AnalyzeError {
    pub fn kind(&self) -> &'static str {
        match self {
            AnalyzeError::EmptyText => "empty_text",
            AnalyzeError::Classify(e) => e.kind(),
        }
    }
}

/// Parse the model reply (optionally fenced) into an [`AnalysisResponse`].
pub fn parse_analysis(text: &str) -> Result<AnalysisResponse, ClassifyError> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return Err(ClassifyError::EmptyResponse);
    }
    serde_json::from_str(body).map_err(|e| ClassifyError::InvalidResponse(truncate(&e.to_string(), 120)))
}

fn cache_key(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug)]
struct ResponseCache {
    cap: usize,
    order: VecDeque<u64>,
    entries: HashMap<u64, AnalysisResponse>,
}

impl ResponseCache {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            order: VecDeque::with_capacity(cap.min(1_000)),
            entries: HashMap::new(),
        }
    }

    fn get(&self, key: u64) -> Option<AnalysisResponse> {
        self.entries.get(&key).cloned()
    }

    fn insert(&mut self, key: u64, value: AnalysisResponse) {
        if self.cap == 0 {
            return;
        }
        if self.entries.insert(key, value).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.entries.len() > self.cap {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

pub struct EvidenceAnalyzer {
    classifier: DynClassifier,
    timeout: Duration,
    cache: Mutex<ResponseCache>,
}

impl EvidenceAnalyzer {
    pub fn new(classifier: DynClassifier, cfg: &AnalyzeConfig) -> Self {
        Self {
            classifier,
            timeout: cfg.timeout(),
            cache: Mutex::new(ResponseCache::new(cfg.cache_capacity)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cached_len(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> MutexGuard<'_, ResponseCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Analyze trimmed `text`; identical submissions are answered from cache.
    /// Failures are not cached.
    pub async fn analyze(&self, text: &str) -> Result<AnalysisResponse, AnalyzeError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AnalyzeError::EmptyText);
        }

        let key = cache_key(text);
        let hit = self.lock().get(key);
        if let Some(hit) = hit {
            tracing::info!(target: "classifier", key = %format!("{key:016x}"), "analysis cache hit");
            counter!("discovery_analysis_total", "outcome" => "cache").increment(1);
            return Ok(hit);
        }

        if !self.classifier.is_configured() {
            return Err(ClassifyError::MissingCredential.into());
        }

        let prompt = build_evidence_prompt(text);
        let raw = tokio::time::timeout(
            self.timeout,
            self.classifier.classify(&prompt, EVIDENCE_SYSTEM_INSTRUCTION),
        )
        .await
        .map_err(|_| ClassifyError::Timeout)??;
        let parsed = parse_analysis(&raw)?;

        self.lock().insert(key, parsed.clone());
        counter!("discovery_analysis_total", "outcome" => "model").increment(1);
        tracing::info!(
            target: "classifier",
            key = %format!("{key:016x}"),
            rejected = parsed.rejected,
            new_cards = parsed.new_cards.len(),
            "analyzed submission"
        );
        Ok(parsed)
    }
}
