//! enrollkit library
//!
//! Client-side enrollment logic: the co-requisite course selection engine and
//! the enrollment progress tracker, plus the store that persists progress and
//! talks to the enrollment and upload services.

pub mod cli;
pub mod config;
pub mod enrollment_state;
pub mod error;
pub mod logic;
pub mod services;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use config::EnrollkitConfig;
pub use enrollment_state::{
    AdvanceError, AdvanceOutcome, EnrollmentProgress, EnrollmentSnapshot, EnrollmentStatus,
    EnrollmentStep, ProgressTracker, StepState,
};
pub use error::EnrollError;
pub use logic::eligibility::{build_catalog, Course};
pub use logic::selection::{remove, toggle, Catalog, SelectableOption, SelectionSet};
pub use services::{
    EnrollmentSource, LocalProofArchive, ProofUploader, SnapshotDirectory, TrackQuery,
};
pub use storage::{JsonFileStorage, PersistedProgress, ProgressStorage};
pub use store::EnrollmentStore;
