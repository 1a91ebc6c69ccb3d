//! Logic modules — pure course-selection rules.
//!
//! # Modules
//!
//! - `selection` — co-requisite selection engine (toggle/remove)
//! - `eligibility` — prerequisite-driven catalog construction

pub mod eligibility;
pub mod selection;
