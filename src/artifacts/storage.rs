//! File storage for optimization artifacts
//!
//! Every save writes two files: a timestamped archive and the per-agent
//! "latest" pointer. Each file is written to a temporary sibling, synced,
//! then renamed into place, so a reader never sees a partial artifact.

use super::types::Artifact;
use crate::error::{Result, TutorError};
use crate::types::AgentType;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const ARCHIVE_PREFIX: &str = "optimized_prompts_";

/// Paths written by one save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub archive: PathBuf,
    pub latest: PathBuf,
}

/// Artifact storage manager
pub struct ArtifactStore {
    base_path: PathBuf,
}

impl ArtifactStore {
    /// The directory is created on first save
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn archive_name(agent_type: AgentType, at: DateTime<Utc>) -> String {
        format!(
            "{}{}_{}.json",
            ARCHIVE_PREFIX,
            agent_type,
            at.format("%Y%m%d_%H%M%S")
        )
    }

    pub fn latest_name(agent_type: AgentType) -> String {
        format!("optimized_{}_latest.json", agent_type)
    }

    /// Durably write the archive copy and then the latest pointer
    pub async fn save(&self, artifact: &Artifact) -> Result<SavedArtifact> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            TutorError::Persistence(format!(
                "Failed to create directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let content = serde_json::to_string_pretty(artifact)?;

        let archive = self
            .base_path
            .join(Self::archive_name(artifact.agent_type, artifact.generated_at));
        self.write_durable(&archive, &content).await?;

        let latest = self.base_path.join(Self::latest_name(artifact.agent_type));
        self.write_durable(&latest, &content).await?;

        info!("Results saved to {}", archive.display());
        Ok(SavedArtifact { archive, latest })
    }

    async fn write_durable(&self, path: &Path, content: &str) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let persist_err = |action: &str, target: &Path, e: std::io::Error| {
            TutorError::Persistence(format!("Failed to {} {}: {}", action, target.display(), e))
        };

        let mut file = fs::File::create(&tmp)
            .await
            .map_err(|e| persist_err("create", &tmp, e))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| persist_err("write", &tmp, e))?;
        file.sync_all()
            .await
            .map_err(|e| persist_err("sync", &tmp, e))?;
        drop(file);

        fs::rename(&tmp, path)
            .await
            .map_err(|e| persist_err("rename into", path, e))?;

        // Directory sync makes the rename itself durable; not every platform allows it
        if let Ok(dir) = fs::File::open(&self.base_path).await {
            if let Err(e) = dir.sync_all().await {
                debug!("Directory sync skipped for {}: {}", self.base_path.display(), e);
            }
        }

        debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }

    pub async fn load(&self, path: &Path) -> Result<Artifact> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            TutorError::Persistence(format!("Failed to read artifact {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Latest artifact for an agent, if one has been written
    pub async fn load_latest(&self, agent_type: AgentType) -> Result<Option<Artifact>> {
        let path = self.base_path.join(Self::latest_name(agent_type));
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        self.load(&path).await.map(Some)
    }

    /// Archived artifacts, oldest first, optionally for one agent
    pub async fn list(&self, agent_type: Option<AgentType>) -> Result<Vec<PathBuf>> {
        if !fs::try_exists(&self.base_path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let prefix = match agent_type {
            Some(agent) => format!("{}{}_", ARCHIVE_PREFIX, agent),
            None => ARCHIVE_PREFIX.to_string(),
        };

        let mut entries = fs::read_dir(&self.base_path).await.map_err(|e| {
            TutorError::Persistence(format!(
                "Failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut archives = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_archive = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with(&prefix) && n.ends_with(".json"));
            if is_archive {
                archives.push(path);
            }
        }

        archives.sort();
        Ok(archives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::types::{OptimizationResult, OptimizedPrompts, ScoreDelta};
    use crate::optimizer::program::PromptProgram;
    use crate::signatures::{SignatureKind, MATHS_SOLVER};
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sample_artifact(agent: AgentType) -> Artifact {
        let results = BTreeMap::from([
            (
                SignatureKind::Maths,
                OptimizationResult::success(
                    SignatureKind::Maths,
                    ScoreDelta::new(0.55, 0.63),
                    15,
                    OptimizedPrompts::extract(&MATHS_SOLVER, &PromptProgram::default(), 5),
                ),
            ),
            (
                SignatureKind::Explain,
                OptimizationResult::skipped(SignatureKind::Explain, 3),
            ),
        ]);
        Artifact::new(agent, "gemini/gemini-1.5-flash-latest", results)
    }

    #[test]
    fn test_file_names() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            ArtifactStore::archive_name(AgentType::Sage, at),
            "optimized_prompts_sage_20240309_140507.json"
        );
        assert_eq!(
            ArtifactStore::latest_name(AgentType::Lexi),
            "optimized_lexi_latest.json"
        );
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path().join("output"));
        let artifact = sample_artifact(AgentType::Sage);

        let saved = store.save(&artifact).await.unwrap();
        assert!(saved.archive.exists());
        assert!(saved.latest.exists());
        assert!(!saved.latest.with_extension("json.tmp").exists());

        let loaded = store.load_latest(AgentType::Sage).await.unwrap().unwrap();
        let maths = &loaded.signatures[&SignatureKind::Maths];
        let original = &artifact.signatures[&SignatureKind::Maths];
        assert_eq!(maths.metrics, original.metrics);
        assert_eq!(maths.samples_used, 15);
        assert_eq!(loaded.signatures[&SignatureKind::Explain].samples_used, 3);
        assert_eq!(loaded.version, "1.0.0");
    }

    #[tokio::test]
    async fn test_artifact_json_shape() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path());
        let saved = store.save(&sample_artifact(AgentType::Lexi)).await.unwrap();

        let raw = std::fs::read_to_string(&saved.archive).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["agent_type"], "lexi");
        assert_eq!(json["signatures"]["maths"]["status"], "success");
        assert!(json["signatures"]["maths"]["metrics"]["improvement_pct"].is_number());
        assert_eq!(json["signatures"]["explain"]["status"], "skipped");
        assert!(json["signatures"]["explain"].get("metrics").is_none());
    }

    #[tokio::test]
    async fn test_latest_is_overwritten_and_list_filters_agent() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path());

        let mut first = sample_artifact(AgentType::Sage);
        first.generated_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut second = sample_artifact(AgentType::Sage);
        second.generated_at = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        second.model = "gemini/gemini-2.0-flash".to_string();

        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();
        store.save(&sample_artifact(AgentType::Lexi)).await.unwrap();

        let latest = store.load_latest(AgentType::Sage).await.unwrap().unwrap();
        assert_eq!(latest.model, "gemini/gemini-2.0-flash");

        let sage = store.list(Some(AgentType::Sage)).await.unwrap();
        assert_eq!(sage.len(), 2);
        assert!(sage[0].to_string_lossy().contains("20240101"));
        assert_eq!(store.list(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_latest_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path().join("never-created"));
        assert!(store.load_latest(AgentType::Sage).await.unwrap().is_none());
        assert!(store.list(None).await.unwrap().is_empty());
    }
}
