// src/analyze/batch.rs
//! Batch classifier client: one model call per batch of candidates, a hard
//! per-batch timeout, strict response validation. Every failure maps the whole
//! batch to "no card"; nothing is raised to the caller.

use std::time::Duration;

use metrics::counter;
use serde::Deserialize;

use crate::analyze::ai_adapter::{truncate, ClassifyError, DynClassifier};
use crate::analyze::limiter::run_in_waves;
use crate::analyze::prompts::{build_batch_prompt, BATCH_SYSTEM_INSTRUCTION};
use crate::card::RawCard;
use crate::config::PipelineConfig;
use crate::relevance::CandidateItem;

#[derive(Debug, Deserialize)]
struct BatchResponse {
    results: Vec<BatchEntry>,
}

// Exactly one of `{card}` or `{rejected: true, reason}`; anything else,
// including both at once, invalidates the response.
#[derive(Debug, Deserialize)]
struct BatchEntry {
    #[serde(default)]
    card: Option<RawCard>,
    #[serde(default)]
    rejected: Option<bool>,
    #[serde(default)]
    reason: Option<String>,
}

impl BatchEntry {
    fn into_card(self, position: usize) -> Result<Option<RawCard>, ClassifyError> {
        match (self.card, self.rejected) {
            (Some(card), None) => Ok(Some(card)),
            (None, Some(true)) => {
                tracing::debug!(
                    target: "classifier",
                    position,
                    reason = %truncate(self.reason.as_deref().unwrap_or("unspecified"), 120),
                    "item rejected"
                );
                Ok(None)
            }
            (Some(_), Some(_)) => Err(ClassifyError::InvalidResponse(format!(
                "result {position} is both a card and a rejection"
            ))),
            _ => Err(ClassifyError::InvalidResponse(format!(
                "result {position} is neither a card nor a rejection"
            ))),
        }
    }
}

/// Drop a surrounding markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(text: &str) -> &str {
    let t = text.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    // Skip the info string ("json") on the opening line.
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Validate a model response against `{ "results": [...] }` with exactly
/// `expected` elements. Rejected elements become `None`.
pub fn parse_batch_response(text: &str, expected: usize) -> Result<Vec<Option<RawCard>>, ClassifyError> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return Err(ClassifyError::EmptyResponse);
    }
    let parsed: BatchResponse = serde_json::from_str(body)
        .map_err(|e| ClassifyError::InvalidResponse(truncate(&e.to_string(), 120)))?;
    if parsed.results.len() != expected {
        return Err(ClassifyError::InvalidResponse(format!(
            "expected {expected} results, got {}",
            parsed.results.len()
        )));
    }

    parsed
        .results
        .into_iter()
        .enumerate()
        .map(|(i, entry)| entry.into_card(i))
        .collect()
}

pub struct BatchClassifier {
    classifier: DynClassifier,
    batch_size: usize,
    max_concurrent: usize,
    max_candidates: usize,
    timeout: Duration,
}

impl BatchClassifier {
    pub fn new(classifier: DynClassifier, cfg: &PipelineConfig) -> Self {
        Self {
            classifier,
            batch_size: cfg.batch_size.max(1),
            max_concurrent: cfg.max_concurrent_batches.max(1),
            max_candidates: cfg.max_candidates,
            timeout: cfg.batch_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// False means the whole feed goes through the rule-based path.
    pub fn is_available(&self) -> bool {
        self.classifier.is_configured()
    }

    pub fn provider_name(&self) -> &'static str {
        self.classifier.provider_name()
    }

    /// One model call for the batch; the result is aligned with `batch`.
    pub async fn classify_batch(&self, batch: &[CandidateItem]) -> Vec<Option<RawCard>> {
        let n = batch.len();
        if n == 0 {
            return Vec::new();
        }
        if !self.classifier.is_configured() {
            counter!("discovery_batch_failures_total", "reason" => ClassifyError::MissingCredential.kind())
                .increment(1);
            return vec![None; n];
        }

        counter!("discovery_batches_total").increment(1);
        let prompt = build_batch_prompt(batch);
        let outcome = match tokio::time::timeout(
            self.timeout,
            self.classifier.classify(&prompt, BATCH_SYSTEM_INSTRUCTION),
        )
        .await
        {
            Err(_) => Err(ClassifyError::Timeout),
            Ok(Err(e)) => Err(e),
            Ok(Ok(text)) => parse_batch_response(&text, n),
        };

        match outcome {
            Ok(cards) => {
                tracing::debug!(
                    target: "classifier",
                    size = n,
                    accepted = cards.iter().filter(|c| c.is_some()).count(),
                    "batch classified"
                );
                cards
            }
            Err(e) => {
                tracing::warn!(
                    target: "classifier",
                    kind = e.kind(),
                    size = n,
                    reason = %truncate(&e.to_string(), 120),
                    "batch yielded no cards"
                );
                counter!("discovery_batch_failures_total", "reason" => e.kind()).increment(1);
                vec![None; n]
            }
        }
    }

    /// Cap, chunk and classify in waves. Output keeps candidate order; each
    /// candidate is paired with its card (or `None`).
    pub async fn classify_all(
        &self,
        mut candidates: Vec<CandidateItem>,
    ) -> Vec<(CandidateItem, Option<RawCard>)> {
        candidates.truncate(self.max_candidates);

        let mut batches: Vec<Vec<CandidateItem>> = Vec::new();
        let mut it = candidates.into_iter().peekable();
        while it.peek().is_some() {
            batches.push(it.by_ref().take(self.batch_size).collect());
        }

        tracing::info!(
            target: "classifier",
            provider = self.provider_name(),
            batches = batches.len(),
            concurrency = self.max_concurrent,
            "classifying candidates"
        );

        run_in_waves(batches, self.max_concurrent, |batch| async move {
            let cards = self.classify_batch(&batch).await;
            batch.into_iter().zip(cards).collect::<Vec<_>>()
        })
        .await
        .into_iter()
        .flatten()
        .collect()
    }
}
