//! Enrollment store
//!
//! Owns the [`ProgressTracker`] for one signed-in user together with its
//! collaborators, and is the only place that performs I/O on its behalf.
//!
//! - Every mutation is persisted; if the write fails the in-memory state is
//!   rolled back to what it was before the call.
//! - Remote snapshots always overwrite local optimistic state.
//! - The tracker lock is never held across an `.await`.
//! - At most one payment proof upload runs at a time; a second call fails
//!   with `UploadInFlight` instead of racing the first.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use tracing::{info, warn};

use crate::enrollment_state::{
    AdvanceOutcome, EnrollmentProgress, EnrollmentSnapshot, ProgressTracker,
};
use crate::error::{EnrollError, Result};
use crate::services::{EnrollmentSource, ProofUploader, TrackQuery};
use crate::storage::ProgressStorage;

pub struct EnrollmentStore<S, U, P> {
    tracker: Mutex<ProgressTracker>,
    source: S,
    uploader: U,
    storage: P,
    proof_directory: String,
}

impl<S, U, P> EnrollmentStore<S, U, P>
where
    S: EnrollmentSource,
    U: ProofUploader,
    P: ProgressStorage,
{
    /// Create a store, restoring any previously persisted progress.
    ///
    /// A record that cannot be read is logged and ignored so the app can
    /// still start; the next refresh or track replaces it.
    pub fn open(source: S, uploader: U, storage: P, proof_directory: impl Into<String>) -> Self {
        let tracker = match storage.load() {
            Ok(Some(progress)) => {
                info!(enrollment_id = ?progress.enrollment_id, "restored enrollment progress");
                ProgressTracker::from_progress(progress)
            }
            Ok(None) => ProgressTracker::new(),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable persisted progress");
                ProgressTracker::new()
            }
        };

        Self {
            tracker: Mutex::new(tracker),
            source,
            uploader,
            storage,
            proof_directory: proof_directory.into(),
        }
    }

    /// Copy of the current progress for rendering
    pub fn progress(&self) -> Result<EnrollmentProgress> {
        Ok(self.lock()?.progress().clone())
    }

    pub fn pending_proof(&self) -> Result<Option<PathBuf>> {
        Ok(self.lock()?.pending_proof().map(|p| p.to_path_buf()))
    }

    /// True while a payment proof upload is running
    pub fn is_uploading(&self) -> Result<bool> {
        Ok(self.lock()?.is_uploading())
    }

    /// Record a freshly created enrollment.
    pub fn start_enrollment(&self, enrollment_id: &str) -> Result<()> {
        self.mutate(|tracker| {
            tracker.start_enrollment(enrollment_id);
            Ok(())
        })
    }

    /// Re-fetch the known enrollment from the server.
    pub async fn refresh(&self) -> Result<EnrollmentProgress> {
        let enrollment_id = self
            .lock()?
            .enrollment_id()
            .map(str::to_string)
            .ok_or(EnrollError::MissingEnrollmentId)?;

        let snapshot = self.source.fetch_enrollment(&enrollment_id).await?;
        self.apply_remote_snapshot(&snapshot)
    }

    /// Look up an enrollment by id or email and make it the current one.
    pub async fn track(&self, query: &TrackQuery) -> Result<EnrollmentProgress> {
        let snapshot = self.source.track_enrollment(query).await?;
        self.apply_remote_snapshot(&snapshot)
    }

    /// Apply a server record (authoritative) and persist it.
    pub fn apply_remote_snapshot(
        &self,
        snapshot: &EnrollmentSnapshot,
    ) -> Result<EnrollmentProgress> {
        self.mutate(|tracker| {
            tracker.apply_remote_snapshot(snapshot)?;
            Ok(tracker.progress().clone())
        })
    }

    /// Optimistic local step advance.
    pub fn advance(&self) -> Result<AdvanceOutcome> {
        self.mutate(|tracker| Ok(tracker.advance()?))
    }

    pub fn set_payment_proof_attachment(&self, file: impl Into<PathBuf>) -> Result<()> {
        self.lock()?.set_payment_proof_attachment(file);
        Ok(())
    }

    /// Upload the attached proof of payment.
    ///
    /// On success the enrollment is marked as having a proof and moves to
    /// `PAYMENT_PENDING`. On failure nothing but the in-flight flag changes.
    pub async fn upload_payment_proof(&self) -> Result<String> {
        let ticket = self.lock()?.begin_upload()?;
        let _in_flight = InFlightGuard {
            tracker: &self.tracker,
            generation: ticket.generation,
        };
        info!(enrollment_id = %ticket.enrollment_id, "uploading payment proof");

        let url = match self
            .uploader
            .upload_payment_proof(&ticket.enrollment_id, &ticket.file, &self.proof_directory)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                warn!(
                    enrollment_id = %ticket.enrollment_id,
                    error = %e,
                    "payment proof upload failed"
                );
                return Err(e);
            }
        };

        self.mutate(|tracker| {
            if tracker.enrollment_id() != Some(ticket.enrollment_id.as_str()) {
                return Err(EnrollError::state(
                    "enrollment changed while the payment proof was uploading",
                ));
            }
            tracker.finish_upload(&ticket, url.clone())
        })?;

        info!(enrollment_id = %ticket.enrollment_id, "payment proof uploaded");
        Ok(url)
    }

    /// Forget the enrollment locally (logout or explicit reset).
    pub fn reset(&self) -> Result<()> {
        let mut tracker = self.lock()?;
        self.storage.clear()?;
        tracker.reset();
        info!("enrollment progress cleared");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, ProgressTracker>> {
        self.tracker
            .lock()
            .map_err(|e| EnrollError::state(format!("tracker lock poisoned: {}", e)))
    }

    /// Run `f` on the tracker and persist the result, rolling back if either
    /// step fails.
    fn mutate<T>(&self, f: impl FnOnce(&mut ProgressTracker) -> Result<T>) -> Result<T> {
        let mut tracker = self.lock()?;
        let before = tracker.clone();

        let value = match f(&mut *tracker) {
            Ok(value) => value,
            Err(e) => {
                *tracker = before;
                return Err(e);
            }
        };

        if let Err(e) = self.storage.save(tracker.progress()) {
            warn!(error = %e, "failed to persist progress; rolling back");
            *tracker = before;
            return Err(e);
        }

        Ok(value)
    }
}

/// Clears the upload flag when the upload finishes, fails, or its future is
/// dropped. Only ever releases its own generation.
struct InFlightGuard<'a> {
    tracker: &'a Mutex<ProgressTracker>,
    generation: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut tracker) = self.tracker.lock() {
            tracker.abort_upload(self.generation);
        }
    }
}
