//! Configuration file handling for the enrollkit CLI.
//!
//! All fields have defaults, so an empty JSON object is a valid config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Where enrollkit keeps its files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrollkitConfig {
    /// Persisted enrollment progress
    pub state_file: PathBuf,
    /// Directory of `<id>.json` enrollment snapshots
    pub snapshot_dir: PathBuf,
    /// Root of the local proof archive
    pub proof_archive_root: PathBuf,
    /// Storage directory for payment proofs inside the archive
    pub proof_directory: String,
}

impl Default for EnrollkitConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("enrollkit-progress.json"),
            snapshot_dir: PathBuf::from("snapshots"),
            proof_archive_root: PathBuf::from("proof-archive"),
            proof_directory: "payment-proofs".to_string(),
        }
    }
}

impl EnrollkitConfig {
    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.state_file.as_os_str().is_empty() {
            anyhow::bail!("State file must be specified");
        }
        if self.snapshot_dir.as_os_str().is_empty() {
            anyhow::bail!("Snapshot directory must be specified");
        }
        if self.proof_archive_root.as_os_str().is_empty() {
            anyhow::bail!("Proof archive root must be specified");
        }

        // Proof directory is a single relative segment inside the archive
        let dir = Path::new(self.proof_directory.trim());
        let mut components = dir.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => anyhow::bail!(
                "Proof directory must be a single folder name, got {:?}",
                self.proof_directory
            ),
        }

        Ok(())
    }
}
