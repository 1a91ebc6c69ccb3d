//! Course eligibility
//!
//! Builds the picker's [`Catalog`] from course records and the student's
//! completed courses. Prerequisites are enforced here, upstream of the
//! selection engine, by marking options disabled with a helper text.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::selection::{Catalog, SelectableOption};

/// Course record as returned by the course/prerequisite API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub co_requisites: Vec<String>,
}

/// Build a catalog snapshot, disabling courses the student cannot take.
///
/// A course is disabled when it was already completed, or when any of its
/// prerequisites is missing from `completed`.
pub fn build_catalog(courses: &[Course], completed: &HashSet<String>) -> Catalog {
    courses
        .iter()
        .map(|course| {
            let missing: Vec<&str> = course
                .prerequisites
                .iter()
                .filter(|p| !completed.contains(*p))
                .map(String::as_str)
                .collect();

            let helper_text = if completed.contains(&course.id) {
                Some("Already completed".to_string())
            } else if !missing.is_empty() {
                Some(format!("Requires {}", missing.join(", ")))
            } else {
                None
            };

            SelectableOption {
                id: course.id.clone(),
                label: if course.label.is_empty() {
                    course.id.clone()
                } else {
                    course.label.clone()
                },
                disabled: helper_text.is_some(),
                helper_text,
                co_requisites: course.co_requisites.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(id: &str, prereqs: &[&str]) -> Course {
        Course {
            id: id.to_string(),
            label: String::new(),
            prerequisites: prereqs.iter().map(|s| s.to_string()).collect(),
            co_requisites: Vec::new(),
        }
    }

    #[test]
    fn test_missing_prerequisite_disables_course() {
        let courses = vec![course("CS201", &["CS101", "MATH101"])];
        let completed: HashSet<String> = ["CS101".to_string()].into_iter().collect();

        let catalog = build_catalog(&courses, &completed);
        let option = catalog.find("CS201").expect("CS201");
        assert!(option.disabled);
        assert_eq!(option.helper_text.as_deref(), Some("Requires MATH101"));
    }

    #[test]
    fn test_met_prerequisites_enable_course() {
        let courses = vec![course("CS201", &["CS101"])];
        let completed: HashSet<String> = ["CS101".to_string()].into_iter().collect();

        let catalog = build_catalog(&courses, &completed);
        let option = catalog.find("CS201").expect("CS201");
        assert!(!option.disabled);
        assert!(option.helper_text.is_none());
        assert_eq!(option.label, "CS201");
    }

    #[test]
    fn test_completed_course_is_disabled() {
        let courses = vec![course("CS101", &[])];
        let completed: HashSet<String> = ["CS101".to_string()].into_iter().collect();

        let catalog = build_catalog(&courses, &completed);
        assert!(catalog.find("CS101").is_some_and(|o| o.disabled));
    }
}
