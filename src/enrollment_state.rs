//! Enrollment Progress State Machine
//!
//! This module is the client-side source of truth for where an enrollment
//! stands. It answers step queries for the progress screen and applies the
//! two kinds of update the app receives.
//!
//! # Design Principles
//!
//! - **Server is authoritative**: `apply_remote_snapshot` overwrites local
//!   state unconditionally (after normalisation)
//! - **Optimistic local advance**: `advance` moves forward one step at a time
//!   and is gated at the payment step
//! - **No I/O**: uploads are split into `begin_upload`/`finish_upload` so the
//!   caller can await the network without holding the tracker
//!
//! # Step Flow
//!
//! ```text
//! Form (1)
//!     ↓
//! Verification (2)
//!     ↓
//! Payment (3)            ── requires proof of payment to leave
//!     ↓
//! PaymentVerification (4)
//!     ↓
//! Complete (5)           ── terminal
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{EnrollError, Result};

/// Enrollment steps in sequential order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EnrollmentStep {
    /// Enrollment form submitted
    Form = 1,
    /// Documents under verification
    Verification = 2,
    /// Waiting for the student's payment
    Payment = 3,
    /// Payment proof under review
    PaymentVerification = 4,
    /// Enrollment complete (terminal state)
    Complete = 5,
}

impl EnrollmentStep {
    /// Returns the step number (1-5)
    #[inline]
    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Returns true for the terminal step
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Returns the next step, or None at Complete
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Form => Some(Self::Verification),
            Self::Verification => Some(Self::Payment),
            Self::Payment => Some(Self::PaymentVerification),
            Self::PaymentVerification => Some(Self::Complete),
            Self::Complete => None,
        }
    }

    /// Title shown in the step list
    pub const fn title(self) -> &'static str {
        match self {
            Self::Form => "Enrollment Form",
            Self::Verification => "Verification",
            Self::Payment => "Payment",
            Self::PaymentVerification => "Payment Verification",
            Self::Complete => "Complete",
        }
    }

    /// Returns all steps in order
    pub const fn all_steps() -> &'static [Self] {
        &[
            Self::Form,
            Self::Verification,
            Self::Payment,
            Self::PaymentVerification,
            Self::Complete,
        ]
    }
}

impl fmt::Display for EnrollmentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

impl TryFrom<u8> for EnrollmentStep {
    type Error = EnrollError;

    fn try_from(n: u8) -> Result<Self> {
        match n {
            1 => Ok(Self::Form),
            2 => Ok(Self::Verification),
            3 => Ok(Self::Payment),
            4 => Ok(Self::PaymentVerification),
            5 => Ok(Self::Complete),
            other => Err(EnrollError::invalid_snapshot(format!(
                "step {} is outside 1-5",
                other
            ))),
        }
    }
}

/// Status label attached to an enrollment.
///
/// Spellings match the enrollment service's records exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString)]
pub enum EnrollmentStatus {
    #[default]
    #[serde(rename = "pending")]
    #[strum(serialize = "pending")]
    Pending,
    #[serde(rename = "VERIFIED")]
    #[strum(serialize = "VERIFIED")]
    Verified,
    #[serde(rename = "PAYMENT_PENDING")]
    #[strum(serialize = "PAYMENT_PENDING")]
    PaymentPending,
    #[serde(rename = "APPROVED")]
    #[strum(serialize = "APPROVED")]
    Approved,
    #[serde(rename = "COMPLETED")]
    #[strum(serialize = "COMPLETED")]
    Completed,
    #[serde(rename = "REJECTED")]
    #[strum(serialize = "REJECTED")]
    Rejected,
}

/// Display state of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Completed,
    Current,
    Pending,
}

/// Enrollment record as the progress screen sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentProgress {
    pub enrollment_id: Option<String>,
    pub current_step: EnrollmentStep,
    /// Always strictly below `current_step`
    pub completed_steps: BTreeSet<EnrollmentStep>,
    pub status: EnrollmentStatus,
    pub remark_msg: Option<String>,
    pub has_payment_proof: bool,
    pub payment_proof_path: Option<String>,
}

impl Default for EnrollmentProgress {
    fn default() -> Self {
        Self {
            enrollment_id: None,
            current_step: EnrollmentStep::Form,
            completed_steps: BTreeSet::new(),
            status: EnrollmentStatus::Pending,
            remark_msg: None,
            has_payment_proof: false,
            payment_proof_path: None,
        }
    }
}

impl EnrollmentProgress {
    #[inline]
    pub fn is_step_completed(&self, n: u8) -> bool {
        self.completed_steps.iter().any(|s| s.number() == n)
    }

    #[inline]
    pub fn is_step_current(&self, n: u8) -> bool {
        self.current_step.number() == n
    }

    #[inline]
    pub fn is_step_pending(&self, n: u8) -> bool {
        !self.is_step_completed(n) && !self.is_step_current(n)
    }

    pub fn step_state(&self, step: EnrollmentStep) -> StepState {
        if self.is_step_completed(step.number()) {
            StepState::Completed
        } else if self.is_step_current(step.number()) {
            StepState::Current
        } else {
            StepState::Pending
        }
    }
}

/// Enrollment record returned by the remote enrollment service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentSnapshot {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub current_step: u8,
    #[serde(default)]
    pub completed_steps: Vec<u8>,
    #[serde(default)]
    pub status: EnrollmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark_msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_proof_path: Option<String>,
}

/// Errors from a local `advance`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdvanceError {
    /// Leaving the payment step needs a proof of payment
    #[error(
        "Step {} requires a proof of payment before continuing",
        EnrollmentStep::Payment.number()
    )]
    PaymentProofRequired,

    /// No enrollment is loaded
    #[error("No enrollment id is known")]
    MissingEnrollmentId,
}

impl AdvanceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PaymentProofRequired => {
                "Please upload your proof of payment before proceeding."
            }
            Self::MissingEnrollmentId => {
                "No enrollment found. Submit or track an enrollment first."
            }
        }
    }
}

/// Result of a successful `advance`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Moved forward one step
    Advanced {
        from: EnrollmentStep,
        to: EnrollmentStep,
    },
    /// Moved from Payment Verification to Complete
    Completed,
    /// Already at Complete; nothing changed
    AlreadyComplete,
}

/// Work order for one payment proof upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTicket {
    pub enrollment_id: String,
    pub file: PathBuf,
    /// Identifies this attempt; stale once a reset or a newer upload happens
    pub generation: u64,
}

/// Status and remark applied when leaving a step through `advance`.
///
/// Keyed by the step being left.
fn transition_labels(from: EnrollmentStep) -> Option<(EnrollmentStatus, &'static str)> {
    match from {
        EnrollmentStep::Verification => Some((
            EnrollmentStatus::Verified,
            "Documents verified. Please proceed with payment.",
        )),
        EnrollmentStep::Payment => Some((
            EnrollmentStatus::PaymentPending,
            "Proof of payment submitted. Awaiting verification.",
        )),
        EnrollmentStep::PaymentVerification => Some((
            EnrollmentStatus::Approved,
            "Payment verified. Your enrollment is approved.",
        )),
        EnrollmentStep::Form | EnrollmentStep::Complete => None,
    }
}

/// Owns an [`EnrollmentProgress`] plus the local, never-persisted bits
/// (pending proof file, upload in flight).
///
/// # Example
///
/// ```
/// use enrollkit::enrollment_state::{AdvanceOutcome, EnrollmentStep, ProgressTracker};
///
/// let mut tracker = ProgressTracker::new();
/// tracker.start_enrollment("ENR-1");
/// let outcome = tracker.advance().unwrap();
/// assert!(matches!(outcome, AdvanceOutcome::Advanced { to: EnrollmentStep::Verification, .. }));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    progress: EnrollmentProgress,
    pending_proof: Option<PathBuf>,
    /// Generation of the running upload, if any
    upload_in_flight: Option<u64>,
    upload_generation: u64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from previously persisted progress.
    pub fn from_progress(progress: EnrollmentProgress) -> Self {
        Self {
            progress,
            pending_proof: None,
            upload_in_flight: None,
            upload_generation: 0,
        }
    }

    #[inline]
    pub fn progress(&self) -> &EnrollmentProgress {
        &self.progress
    }

    #[inline]
    pub fn current_step(&self) -> EnrollmentStep {
        self.progress.current_step
    }

    #[inline]
    pub fn status(&self) -> EnrollmentStatus {
        self.progress.status
    }

    #[inline]
    pub fn enrollment_id(&self) -> Option<&str> {
        self.progress.enrollment_id.as_deref()
    }

    #[inline]
    pub fn pending_proof(&self) -> Option<&Path> {
        self.pending_proof.as_deref()
    }

    #[inline]
    pub fn is_uploading(&self) -> bool {
        self.upload_in_flight.is_some()
    }

    pub fn is_step_completed(&self, n: u8) -> bool {
        self.progress.is_step_completed(n)
    }

    pub fn is_step_current(&self, n: u8) -> bool {
        self.progress.is_step_current(n)
    }

    pub fn is_step_pending(&self, n: u8) -> bool {
        self.progress.is_step_pending(n)
    }

    /// Record a freshly created enrollment at the Form step.
    pub fn start_enrollment(&mut self, enrollment_id: impl Into<String>) {
        self.progress = EnrollmentProgress {
            enrollment_id: Some(enrollment_id.into()),
            ..EnrollmentProgress::default()
        };
        self.pending_proof = None;
        info!(enrollment_id = ?self.progress.enrollment_id, "enrollment started");
    }

    /// Overwrite local state with the server's record.
    ///
    /// Step 1 is marked completed whenever a later step is current, and
    /// completed steps at or past the current one are dropped. Any pending
    /// local proof attachment is discarded.
    ///
    /// # Errors
    ///
    /// - `InvalidSnapshot` if any step number is outside 1-5 (state unchanged)
    pub fn apply_remote_snapshot(&mut self, snapshot: &EnrollmentSnapshot) -> Result<()> {
        let current_step = EnrollmentStep::try_from(snapshot.current_step)?;
        let mut completed_steps = snapshot
            .completed_steps
            .iter()
            .map(|&n| EnrollmentStep::try_from(n))
            .collect::<Result<BTreeSet<_>>>()?;

        if current_step >= EnrollmentStep::Verification {
            completed_steps.insert(EnrollmentStep::Form);
        }

        let before = completed_steps.len();
        completed_steps.retain(|s| *s < current_step);
        if completed_steps.len() != before {
            warn!(
                enrollment_id = %snapshot.id,
                current_step = current_step.number(),
                "snapshot listed completed steps at or past the current step; dropped"
            );
        }

        let proof_path = snapshot
            .payment_proof_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(str::to_string);

        self.progress = EnrollmentProgress {
            enrollment_id: Some(snapshot.id.clone()),
            current_step,
            completed_steps,
            status: snapshot.status,
            remark_msg: snapshot.remark_msg.clone(),
            has_payment_proof: proof_path.is_some(),
            payment_proof_path: proof_path,
        };
        self.pending_proof = None;

        info!(
            enrollment_id = %snapshot.id,
            step = current_step.number(),
            status = %snapshot.status,
            "applied remote snapshot"
        );
        Ok(())
    }

    /// Move forward one step locally.
    ///
    /// # Errors
    ///
    /// - `MissingEnrollmentId` if no enrollment is loaded
    /// - `PaymentProofRequired` when leaving Payment without a proof
    pub fn advance(&mut self) -> std::result::Result<AdvanceOutcome, AdvanceError> {
        let from = self.progress.current_step;
        let Some(to) = from.next() else {
            debug!("advance ignored: enrollment already complete");
            return Ok(AdvanceOutcome::AlreadyComplete);
        };

        if self.progress.enrollment_id.is_none() {
            return Err(AdvanceError::MissingEnrollmentId);
        }

        if from == EnrollmentStep::Payment
            && self.pending_proof.is_none()
            && !self.progress.has_payment_proof
        {
            warn!("advance blocked: proof of payment required");
            return Err(AdvanceError::PaymentProofRequired);
        }

        self.progress.completed_steps.insert(from);
        self.progress.current_step = to;
        if let Some((status, remark)) = transition_labels(from) {
            self.progress.status = status;
            self.progress.remark_msg = Some(remark.to_string());
        }

        info!(from = from.number(), to = to.number(), "advanced enrollment step");

        if to.is_terminal() {
            Ok(AdvanceOutcome::Completed)
        } else {
            Ok(AdvanceOutcome::Advanced { from, to })
        }
    }

    /// Remember a local proof file; nothing is sent yet.
    pub fn set_payment_proof_attachment(&mut self, file: impl Into<PathBuf>) {
        let file = file.into();
        debug!(file = %file.display(), "payment proof attached");
        self.pending_proof = Some(file);
    }

    /// Claim the pending proof for upload.
    ///
    /// # Errors
    ///
    /// - `UploadInFlight` if a previous upload has not finished
    /// - `MissingProofAttachment` if no file is attached
    /// - `MissingEnrollmentId` if no enrollment is loaded
    pub fn begin_upload(&mut self) -> Result<UploadTicket> {
        if self.upload_in_flight.is_some() {
            return Err(EnrollError::UploadInFlight);
        }
        let file = self
            .pending_proof
            .clone()
            .ok_or(EnrollError::MissingProofAttachment)?;
        let enrollment_id = self
            .progress
            .enrollment_id
            .clone()
            .ok_or(EnrollError::MissingEnrollmentId)?;

        self.upload_generation += 1;
        self.upload_in_flight = Some(self.upload_generation);
        Ok(UploadTicket {
            enrollment_id,
            file,
            generation: self.upload_generation,
        })
    }

    /// Commit a successful upload.
    ///
    /// # Errors
    ///
    /// `State` if the ticket no longer owns the in-flight slot (the tracker
    /// was reset after `begin_upload`).
    pub fn finish_upload(&mut self, ticket: &UploadTicket, url: impl Into<String>) -> Result<()> {
        if self.upload_in_flight != Some(ticket.generation) {
            return Err(EnrollError::state("payment proof upload was superseded"));
        }
        self.progress.has_payment_proof = true;
        self.progress.status = EnrollmentStatus::PaymentPending;
        self.progress.payment_proof_path = Some(url.into());
        self.pending_proof = None;
        self.upload_in_flight = None;
        Ok(())
    }

    /// Release the in-flight flag after a failed or cancelled upload.
    ///
    /// Does nothing if `generation` is not the running upload.
    pub fn abort_upload(&mut self, generation: u64) {
        if self.upload_in_flight == Some(generation) {
            self.upload_in_flight = None;
        }
    }

    /// Clear everything (logout or explicit reset).
    ///
    /// An upload still running is orphaned: its ticket can no longer finish
    /// or abort anything.
    pub fn reset(&mut self) {
        self.progress = EnrollmentProgress::default();
        self.pending_proof = None;
        self.upload_in_flight = None;
        self.upload_generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_at(step: u8, completed: &[u8]) -> ProgressTracker {
        let mut tracker = ProgressTracker::new();
        tracker
            .apply_remote_snapshot(&EnrollmentSnapshot {
                id: "ENR-1".to_string(),
                email: None,
                current_step: step,
                completed_steps: completed.to_vec(),
                status: EnrollmentStatus::Pending,
                remark_msg: None,
                payment_proof_path: None,
            })
            .expect("valid snapshot");
        tracker
    }

    // =========================================================================
    // EnrollmentStep Tests
    // =========================================================================

    #[test]
    fn test_step_next_forms_chain() {
        let mut current = EnrollmentStep::Form;
        let mut count = 0;
        while let Some(next) = current.next() {
            current = next;
            count += 1;
        }
        assert_eq!(current, EnrollmentStep::Complete);
        assert_eq!(count, 4);
    }

    #[test]
    fn test_step_numbers_are_sequential() {
        for (i, step) in EnrollmentStep::all_steps().iter().enumerate() {
            assert_eq!(step.number() as usize, i + 1);
            assert_eq!(EnrollmentStep::try_from(step.number()).ok(), Some(*step));
        }
        assert!(EnrollmentStep::try_from(0).is_err());
        assert!(EnrollmentStep::try_from(6).is_err());
    }

    #[test]
    fn test_status_spellings() {
        assert_eq!(EnrollmentStatus::Pending.to_string(), "pending");
        assert_eq!(EnrollmentStatus::PaymentPending.to_string(), "PAYMENT_PENDING");
        assert_eq!(
            serde_json::to_string(&EnrollmentStatus::Verified).expect("serialize"),
            "\"VERIFIED\""
        );
        assert_eq!(
            "REJECTED".parse::<EnrollmentStatus>().ok(),
            Some(EnrollmentStatus::Rejected)
        );
    }

    // =========================================================================
    // Tracker Tests
    // =========================================================================

    #[test]
    fn test_step_queries() {
        let tracker = tracker_at(3, &[1, 2]);
        assert!(tracker.is_step_completed(1));
        assert!(tracker.is_step_completed(2));
        assert!(tracker.is_step_current(3));
        assert!(tracker.is_step_pending(4));
        assert!(tracker.is_step_pending(5));
        assert_eq!(
            tracker.progress().step_state(EnrollmentStep::Payment),
            StepState::Current
        );
    }

    #[test]
    fn test_snapshot_forces_form_completed() {
        let tracker = tracker_at(3, &[]);
        assert!(tracker.is_step_completed(1));
        assert!(!tracker.is_step_completed(2));
    }

    #[test]
    fn test_snapshot_at_form_does_not_complete_form() {
        let tracker = tracker_at(1, &[]);
        assert!(tracker.is_step_current(1));
        assert!(tracker.progress().completed_steps.is_empty());
    }

    #[test]
    fn test_snapshot_drops_steps_past_current() {
        let tracker = tracker_at(2, &[1, 2, 4]);
        let completed: Vec<u8> = tracker
            .progress()
            .completed_steps
            .iter()
            .map(|s| s.number())
            .collect();
        assert_eq!(completed, vec![1]);
    }

    #[test]
    fn test_invalid_snapshot_leaves_state_unchanged() {
        let mut tracker = tracker_at(2, &[1]);
        let before = tracker.progress().clone();
        let err = tracker
            .apply_remote_snapshot(&EnrollmentSnapshot {
                id: "ENR-2".to_string(),
                email: None,
                current_step: 9,
                completed_steps: vec![],
                status: EnrollmentStatus::Pending,
                remark_msg: None,
                payment_proof_path: None,
            })
            .unwrap_err();
        assert!(matches!(err, EnrollError::InvalidSnapshot(_)));
        assert_eq!(tracker.progress(), &before);
    }

    #[test]
    fn test_snapshot_sets_proof_flag_and_clears_pending() {
        let mut tracker = tracker_at(3, &[1, 2]);
        tracker.set_payment_proof_attachment("/tmp/receipt.jpg");
        tracker
            .apply_remote_snapshot(&EnrollmentSnapshot {
                id: "ENR-1".to_string(),
                email: None,
                current_step: 3,
                completed_steps: vec![1, 2],
                status: EnrollmentStatus::PaymentPending,
                remark_msg: None,
                payment_proof_path: Some("https://files.example/receipt.jpg".to_string()),
            })
            .expect("valid snapshot");
        assert!(tracker.progress().has_payment_proof);
        assert!(tracker.pending_proof().is_none());
    }

    #[test]
    fn test_advance_blocked_without_proof() {
        let mut tracker = tracker_at(3, &[1, 2]);
        let err = tracker.advance().unwrap_err();
        assert_eq!(err, AdvanceError::PaymentProofRequired);
        assert_eq!(tracker.current_step(), EnrollmentStep::Payment);
    }

    #[test]
    fn test_advance_with_attachment_moves_to_payment_verification() {
        let mut tracker = tracker_at(3, &[1, 2]);
        tracker.set_payment_proof_attachment("/tmp/receipt.jpg");
        let outcome = tracker.advance().expect("Should advance");
        assert_eq!(
            outcome,
            AdvanceOutcome::Advanced {
                from: EnrollmentStep::Payment,
                to: EnrollmentStep::PaymentVerification,
            }
        );
        assert_eq!(tracker.status(), EnrollmentStatus::PaymentPending);
        assert!(tracker.is_step_completed(3));
    }

    #[test]
    fn test_advance_from_form_keeps_status() {
        let mut tracker = ProgressTracker::new();
        tracker.start_enrollment("ENR-9");
        tracker.advance().expect("Should advance");
        assert_eq!(tracker.current_step(), EnrollmentStep::Verification);
        assert_eq!(tracker.status(), EnrollmentStatus::Pending);
        assert!(tracker.progress().remark_msg.is_none());
    }

    #[test]
    fn test_advance_to_complete_signals_completion() {
        let mut tracker = tracker_at(4, &[1, 2, 3]);
        assert_eq!(tracker.advance(), Ok(AdvanceOutcome::Completed));
        assert_eq!(tracker.status(), EnrollmentStatus::Approved);
        assert_eq!(tracker.current_step(), EnrollmentStep::Complete);
    }

    #[test]
    fn test_advance_at_complete_is_noop() {
        let mut tracker = tracker_at(5, &[1, 2, 3, 4]);
        let before = tracker.progress().clone();
        assert_eq!(tracker.advance(), Ok(AdvanceOutcome::AlreadyComplete));
        assert_eq!(tracker.progress(), &before);
    }

    #[test]
    fn test_advance_without_enrollment_id_fails() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.advance(), Err(AdvanceError::MissingEnrollmentId));
        assert_eq!(tracker.current_step(), EnrollmentStep::Form);
    }

    #[test]
    fn test_upload_requires_attachment_and_single_flight() {
        let mut tracker = tracker_at(3, &[1, 2]);
        assert!(matches!(
            tracker.begin_upload(),
            Err(EnrollError::MissingProofAttachment)
        ));

        tracker.set_payment_proof_attachment("/tmp/receipt.jpg");
        let ticket = tracker.begin_upload().expect("first upload");
        assert_eq!(ticket.enrollment_id, "ENR-1");
        assert!(matches!(
            tracker.begin_upload(),
            Err(EnrollError::UploadInFlight)
        ));

        tracker
            .finish_upload(&ticket, "file:///archive/ENR-1-receipt.jpg")
            .expect("finish");
        assert!(!tracker.is_uploading());
        assert!(tracker.progress().has_payment_proof);
        assert_eq!(tracker.status(), EnrollmentStatus::PaymentPending);
        assert!(tracker.pending_proof().is_none());
    }

    #[test]
    fn test_abort_upload_keeps_attachment() {
        let mut tracker = tracker_at(3, &[1, 2]);
        tracker.set_payment_proof_attachment("/tmp/receipt.jpg");
        let ticket = tracker.begin_upload().expect("upload");
        tracker.abort_upload(ticket.generation);
        assert!(!tracker.is_uploading());
        assert!(tracker.pending_proof().is_some());
        assert!(!tracker.progress().has_payment_proof);
    }

    #[test]
    fn test_reset_orphans_running_upload() {
        let mut tracker = tracker_at(3, &[1, 2]);
        tracker.set_payment_proof_attachment("/tmp/old.jpg");
        let stale = tracker.begin_upload().expect("first upload");

        tracker.reset();
        tracker.start_enrollment("ENR-2");
        tracker.set_payment_proof_attachment("/tmp/new.jpg");
        let current = tracker.begin_upload().expect("second upload");
        assert_ne!(stale.generation, current.generation);

        // The orphaned attempt can neither release nor commit the new slot
        tracker.abort_upload(stale.generation);
        assert!(tracker.is_uploading());
        assert!(matches!(
            tracker.finish_upload(&stale, "file:///archive/old.jpg"),
            Err(EnrollError::State(_))
        ));
        assert!(!tracker.progress().has_payment_proof);
        assert!(matches!(
            tracker.begin_upload(),
            Err(EnrollError::UploadInFlight)
        ));

        tracker
            .finish_upload(&current, "file:///archive/new.jpg")
            .expect("finish");
        assert!(!tracker.is_uploading());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut tracker = tracker_at(4, &[1, 2, 3]);
        tracker.set_payment_proof_attachment("/tmp/receipt.jpg");
        tracker.reset();
        assert_eq!(tracker.progress(), &EnrollmentProgress::default());
        assert!(tracker.pending_proof().is_none());
    }

    #[test]
    fn test_advance_error_display() {
        let msg = AdvanceError::PaymentProofRequired.to_string();
        assert!(msg.contains("Step 3"));
    }
}
