//! Durable local storage for enrollment progress.
//!
//! Only an explicit allow-list of fields ([`PersistedProgress`]) is written.
//! The pending proof attachment and the upload flag never leave memory.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::enrollment_state::{EnrollmentProgress, EnrollmentStatus, EnrollmentStep};
use crate::error::{EnrollError, Result};

const SCHEMA_VERSION: u32 = 1;

/// Serialized subset of [`EnrollmentProgress`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedProgress {
    pub version: u32,
    pub enrollment_id: Option<String>,
    pub current_step: u8,
    pub completed_steps: Vec<u8>,
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub remark_msg: Option<String>,
    #[serde(default)]
    pub has_payment_proof: bool,
    #[serde(default)]
    pub payment_proof_path: Option<String>,
}

impl From<&EnrollmentProgress> for PersistedProgress {
    fn from(progress: &EnrollmentProgress) -> Self {
        Self {
            version: SCHEMA_VERSION,
            enrollment_id: progress.enrollment_id.clone(),
            current_step: progress.current_step.number(),
            completed_steps: progress.completed_steps.iter().map(|s| s.number()).collect(),
            status: progress.status,
            remark_msg: progress.remark_msg.clone(),
            has_payment_proof: progress.has_payment_proof,
            payment_proof_path: progress.payment_proof_path.clone(),
        }
    }
}

impl TryFrom<PersistedProgress> for EnrollmentProgress {
    type Error = EnrollError;

    fn try_from(saved: PersistedProgress) -> Result<Self> {
        if saved.version != SCHEMA_VERSION {
            return Err(EnrollError::storage(format!(
                "unsupported progress schema version {}",
                saved.version
            )));
        }

        let current_step = EnrollmentStep::try_from(saved.current_step)?;
        let completed_steps: BTreeSet<EnrollmentStep> = saved
            .completed_steps
            .into_iter()
            .map(EnrollmentStep::try_from)
            .filter(|s| s.as_ref().map_or(true, |s| *s < current_step))
            .collect::<Result<_>>()?;

        Ok(Self {
            enrollment_id: saved.enrollment_id,
            current_step,
            completed_steps,
            status: saved.status,
            remark_msg: saved.remark_msg,
            has_payment_proof: saved.has_payment_proof,
            payment_proof_path: saved.payment_proof_path,
        })
    }
}

/// Key-value persistence for the progress record
pub trait ProgressStorage {
    /// Returns None when nothing has been saved yet
    fn load(&self) -> Result<Option<EnrollmentProgress>>;
    fn save(&self, progress: &EnrollmentProgress) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Stores progress as pretty JSON in a single file, replaced atomically.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<EnrollmentProgress>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let saved: PersistedProgress = serde_json::from_str(&content)?;
        let progress = EnrollmentProgress::try_from(saved)?;
        debug!(path = %self.path.display(), "loaded persisted progress");
        Ok(Some(progress))
    }

    fn save(&self, progress: &EnrollmentProgress) -> Result<()> {
        let json = serde_json::to_string_pretty(&PersistedProgress::from(progress))?;
        atomic_write(&self.path, json.as_bytes())?;
        debug!(path = %self.path.display(), "saved progress");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Temp file + rename so a crash never leaves a half-written record.
fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
