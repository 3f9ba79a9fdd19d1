// src/card.rs
//! Discovery card model shared by the pipeline, the snapshot file and the API.

use serde::{Deserialize, Serialize};

/// Category of an advance. Serialized with the human-readable labels the
/// presentation layer and the classifier prompt both use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DiscoveryType {
    #[serde(rename = "Public Health Impact")]
    PublicHealthImpact,
    #[serde(rename = "Clinical Trial")]
    ClinicalTrial,
    #[serde(rename = "Policy")]
    Policy,
    #[serde(rename = "Implementation")]
    Implementation,
    #[default]
    #[serde(rename = "Research")]
    Research,
}

impl DiscoveryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryType::PublicHealthImpact => "Public Health Impact",
            DiscoveryType::ClinicalTrial => "Clinical Trial",
            DiscoveryType::Policy => "Policy",
            DiscoveryType::Implementation => "Implementation",
            DiscoveryType::Research => "Research",
        }
    }

    /// Lenient label parsing for model output ("clinical trial", "Clinical-Trial", ...).
    pub fn from_label(label: &str) -> Option<Self> {
        let key: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "publichealthimpact" | "publichealth" => Some(DiscoveryType::PublicHealthImpact),
            "clinicaltrial" | "trial" => Some(DiscoveryType::ClinicalTrial),
            "policy" => Some(DiscoveryType::Policy),
            "implementation" => Some(DiscoveryType::Implementation),
            "research" => Some(DiscoveryType::Research),
            _ => None,
        }
    }
}

/// The persisted unit of the live feed.
///
/// Invariant (enforced by the normalizer): `source_labels.len() == sources.len()`
/// whenever `sources` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryCard {
    pub id: String,
    pub title: String,
    pub country_or_region: String,
    pub discovery_type: DiscoveryType,
    pub summary: String,
    pub why_this_matters: String,
    pub date_announced: String,
    pub sources: Vec<String>,
    #[serde(default)]
    pub source_labels: Vec<String>,
    pub confidence_basis: String,
}

impl DiscoveryCard {
    pub fn labels_aligned(&self) -> bool {
        self.sources.is_empty() || self.source_labels.len() == self.sources.len()
    }
}

/// A card as produced by the classifier (or the rule-based fallback) before
/// repair. Every field may be missing; types must still match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCard {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub country_or_region: Option<String>,
    #[serde(default)]
    pub discovery_type: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub why_this_matters: Option<String>,
    #[serde(default)]
    pub date_announced: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default)]
    pub source_labels: Option<Vec<String>>,
    #[serde(default)]
    pub confidence_basis: Option<String>,
}

/// Single persisted record: last discovery list plus the epoch-ms it was built at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: i64,
    pub discoveries: Vec<DiscoveryCard>,
}
