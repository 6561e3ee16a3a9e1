//! Optimization artifacts
//!
//! Versioned JSON records of each run: per-signature status, before/after
//! scores and the extracted prompt program. Written as a timestamped archive
//! plus an overwritten `optimized_<agent>_latest.json` pointer.

pub mod storage;
pub mod types;

pub use storage::{ArtifactStore, SavedArtifact};
pub use types::{
    Artifact, FieldDoc, OptimizationResult, OptimizedPrompts, PredictorPrompt, ScoreDelta,
    SignatureStatus, StoredDemo, ARTIFACT_VERSION,
};
