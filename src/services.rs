//! External collaborators of the enrollment store.
//!
//! The remote enrollment service and the file upload service are traits so
//! screens can inject real HTTP clients and tests can inject fakes. Local
//! directory-backed implementations are provided for the CLI.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::enrollment_state::EnrollmentSnapshot;
use crate::error::{EnrollError, Result};

/// How to look up an existing enrollment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackQuery {
    Id(String),
    Email(String),
}

// ============================================================================
// Enrollment Source Trait (for dependency injection)
// ============================================================================

/// Read side of the remote enrollment service
#[async_trait]
pub trait EnrollmentSource: Send + Sync {
    /// Fetch the authoritative record for a known enrollment
    async fn fetch_enrollment(&self, enrollment_id: &str) -> Result<EnrollmentSnapshot>;

    /// Find an enrollment by id or by the applicant's email
    async fn track_enrollment(&self, query: &TrackQuery) -> Result<EnrollmentSnapshot>;
}

// ============================================================================
// Proof Uploader Trait (for dependency injection)
// ============================================================================

/// Stores a proof of payment and links it to the enrollment record
#[async_trait]
pub trait ProofUploader: Send + Sync {
    /// Upload `file` into `directory` and return its durable URL
    async fn upload_payment_proof(
        &self,
        enrollment_id: &str,
        file: &Path,
        directory: &str,
    ) -> Result<String>;
}

// ============================================================================
// Snapshot Directory
// ============================================================================

/// Enrollment source backed by a directory of `<id>.json` snapshot files
#[derive(Debug, Clone)]
pub struct SnapshotDirectory {
    root: PathBuf,
}

impl SnapshotDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn read_snapshot(path: &Path) -> Result<EnrollmentSnapshot> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            EnrollError::remote(format!("failed to read {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl EnrollmentSource for SnapshotDirectory {
    async fn fetch_enrollment(&self, enrollment_id: &str) -> Result<EnrollmentSnapshot> {
        if enrollment_id.is_empty() || enrollment_id.contains(['/', '\\']) {
            return Err(EnrollError::remote(format!(
                "invalid enrollment id {:?}",
                enrollment_id
            )));
        }
        let path = self.root.join(format!("{}.json", enrollment_id));
        debug!(path = %path.display(), "fetching enrollment snapshot");
        Self::read_snapshot(&path).await
    }

    async fn track_enrollment(&self, query: &TrackQuery) -> Result<EnrollmentSnapshot> {
        let email = match query {
            TrackQuery::Id(id) => return self.fetch_enrollment(id).await,
            TrackQuery::Email(email) => email,
        };

        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            EnrollError::remote(format!("failed to list {}: {}", self.root.display(), e))
        })?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let snapshot = Self::read_snapshot(&path).await?;
            if snapshot
                .email
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case(email))
            {
                return Ok(snapshot);
            }
        }

        Err(EnrollError::remote(format!(
            "no enrollment found for {}",
            email
        )))
    }
}

// ============================================================================
// Local Proof Archive
// ============================================================================

/// Uploader that copies proofs into `<root>/<directory>/` and returns a
/// `file://` URL
#[derive(Debug, Clone)]
pub struct LocalProofArchive {
    root: PathBuf,
}

impl LocalProofArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ProofUploader for LocalProofArchive {
    async fn upload_payment_proof(
        &self,
        enrollment_id: &str,
        file: &Path,
        directory: &str,
    ) -> Result<String> {
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| EnrollError::upload(format!("{} has no file name", file.display())))?;

        let target_dir = self.root.join(directory);
        tokio::fs::create_dir_all(&target_dir).await?;

        let target = target_dir.join(format!("{}-{}", enrollment_id, file_name));
        tokio::fs::copy(file, &target).await.map_err(|e| {
            EnrollError::upload(format!("failed to copy {}: {}", file.display(), e))
        })?;

        let absolute = std::path::absolute(&target)?;
        info!(enrollment_id, target = %absolute.display(), "archived payment proof");
        Ok(format!("file://{}", absolute.display()))
    }
}
