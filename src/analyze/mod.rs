// src/analyze/mod.rs
//! Classification stage: the model adapter, batch client and wave limiter,
//! the rule-based fallback, card repair, and free-text evidence analysis.

pub mod ai_adapter;
pub mod batch;
pub mod degraded;
pub mod evidence;
pub mod limiter;
pub mod normalize;
pub mod prompts;

pub use ai_adapter::{build_classifier, Classifier, ClassifyError, DynClassifier};
pub use batch::BatchClassifier;
pub use evidence::{AnalysisResponse, AnalyzeError, EvidenceAnalyzer};
pub use limiter::run_in_waves;
pub use normalize::CardNormalizer;
