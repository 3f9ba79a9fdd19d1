// src/config/mod.rs
//! Monitor configuration: one TOML file plus a handful of env overrides.
//!
//! Resolution order:
//! 1) $DISCOVERY_CONFIG_PATH (must exist)
//! 2) config/monitor.toml
//! 3) built-in defaults
//!
//! After loading, `DISCOVERY_CACHE_PATH` / `DISCOVERY_CACHE_TTL_SECS` override
//! the `[cache]` section.

pub mod ai;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::sources::default_sources;
use crate::ingest::types::FeedSource;

pub use ai::ClassifierConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/monitor.toml";
pub const ENV_CONFIG_PATH: &str = "DISCOVERY_CONFIG_PATH";
pub const ENV_CACHE_PATH: &str = "DISCOVERY_CACHE_PATH";
pub const ENV_CACHE_TTL_SECS: &str = "DISCOVERY_CACHE_TTL_SECS";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub path: PathBuf,
    pub ttl_secs: u64,
    /// When true, a refresh that produced zero cards leaves the previous
    /// snapshot in place instead of overwriting it with an empty list.
    pub keep_snapshot_on_empty: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/discoveryCache.json"),
            ttl_secs: 3600,
            keep_snapshot_on_empty: false,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_items_per_source: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_items_per_source: 8,
            user_agent: "LastMile-HIV-Discovery-Monitor/1.0".to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upper bound on candidates sent to the classifier per run.
    pub max_candidates: usize,
    pub batch_size: usize,
    pub max_concurrent_batches: usize,
    pub batch_timeout_secs: u64,
    pub summary_max_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_candidates: 10,
            batch_size: 4,
            max_concurrent_batches: 2,
            batch_timeout_secs: 18,
            summary_max_chars: 400,
        }
    }
}

impl PipelineConfig {
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    pub refresh_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_interval_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    pub extra_keywords: Vec<String>,
    pub extra_reject_phrases: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub serve_seed_when_empty: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            serve_seed_when_empty: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzeConfig {
    /// Memoized analysis responses kept in process; 0 disables the cache.
    pub cache_capacity: usize,
    pub timeout_secs: u64,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 100,
            timeout_secs: 30,
        }
    }
}

impl AnalyzeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub cache: CacheConfig,
    pub fetch: FetchConfig,
    pub pipeline: PipelineConfig,
    pub classifier: ClassifierConfig,
    pub schedule: ScheduleConfig,
    pub relevance: RelevanceConfig,
    pub api: ApiConfig,
    pub analyze: AnalyzeConfig,
    pub sources: Vec<FeedSource>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            fetch: FetchConfig::default(),
            pipeline: PipelineConfig::default(),
            classifier: ClassifierConfig::default(),
            schedule: ScheduleConfig::default(),
            relevance: RelevanceConfig::default(),
            api: ApiConfig::default(),
            analyze: AnalyzeConfig::default(),
            sources: default_sources(),
        }
    }
}

impl MonitorConfig {
    /// Load using env var + fallbacks (see module docs), then apply env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                Self::load_from(&default_path)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading monitor config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing monitor config at {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: MonitorConfig = toml::from_str(s)?;
        cfg.sanitize();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(p) = std::env::var(ENV_CACHE_PATH) {
            if !p.trim().is_empty() {
                self.cache.path = PathBuf::from(p.trim());
            }
        }
        if let Some(ttl) = std::env::var(ENV_CACHE_TTL_SECS)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.cache.ttl_secs = ttl;
        }
    }

    /// Clamp values that would stall or break the pipeline.
    fn sanitize(&mut self) {
        self.pipeline.batch_size = self.pipeline.batch_size.max(1);
        self.pipeline.max_concurrent_batches = self.pipeline.max_concurrent_batches.max(1);
        self.fetch.max_items_per_source = self.fetch.max_items_per_source.max(1);
        self.schedule.refresh_interval_secs = self.schedule.refresh_interval_secs.max(60);
        self.classifier.normalize();

        let mut seen = HashSet::new();
        self.sources.retain(|s| {
            let name = s.name.trim();
            !name.is_empty() && !s.url.trim().is_empty() && seen.insert(name.to_string())
        });
        if self.sources.is_empty() {
            self.sources = default_sources();
        }
    }
}
