//! Co-requisite Selection Engine
//!
//! Keeps a course selection closed under the co-requisite relation while
//! respecting per-option disablement.
//!
//! # Design
//!
//! - **Pure logic**: no I/O, no side effects. Every operation takes the
//!   catalog snapshot and the current selection and returns a new selection.
//! - **Never fails**: unknown ids and disabled additions degrade to a no-op.
//! - **Symmetric, one hop**: co-requisites are stored one-directionally per
//!   option, but the engine honours both directions. Only one level of direct
//!   lookup happens per action; chains such as A↔B↔C are not followed.
//!
//! # Rules
//!
//! | Action                   | Effect                                            |
//! |--------------------------|---------------------------------------------------|
//! | toggle unselected option | add it, listed partners, listers (skip disabled)  |
//! | toggle selected option   | remove it, listed partners, listers               |
//! | remove                   | removal path regardless of membership             |
//! | either, disabled + unset | no-op                                             |

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One entry of the course picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectableOption {
    /// Course identifier, unique within a catalog snapshot
    pub id: String,
    /// Display label
    #[serde(default)]
    pub label: String,
    /// Cannot be newly selected (e.g. unmet prerequisite)
    #[serde(default)]
    pub disabled: bool,
    /// Why the option is disabled, shown under the chip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper_text: Option<String>,
    /// Ids that must accompany this option when selected
    #[serde(default)]
    pub co_requisites: Vec<String>,
}

impl SelectableOption {
    /// Create an enabled option with no co-requisites.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            disabled: false,
            helper_text: None,
            co_requisites: Vec::new(),
        }
    }

    /// Builder: set the co-requisite list.
    pub fn with_co_requisites<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.co_requisites = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: mark the option disabled with an optional reason.
    pub fn disable(mut self, reason: Option<&str>) -> Self {
        self.disabled = true;
        self.helper_text = reason.map(str::to_string);
        self
    }

    /// Returns true if this option lists `id` as a co-requisite
    #[inline]
    pub fn lists(&self, id: &str) -> bool {
        self.co_requisites.iter().any(|c| c == id)
    }
}

/// Immutable catalog snapshot supplied by the hosting screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    options: Vec<SelectableOption>,
}

impl Catalog {
    pub fn new(options: Vec<SelectableOption>) -> Self {
        Self { options }
    }

    /// Look up an option by id
    pub fn find(&self, id: &str) -> Option<&SelectableOption> {
        self.options.iter().find(|o| o.id == id)
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    pub fn options(&self) -> &[SelectableOption] {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Options that list `id` in their own co-requisites (reverse direction)
    pub fn listing(&self, id: &str) -> impl Iterator<Item = &SelectableOption> {
        self.options.iter().filter(move |o| o.lists(id))
    }

    /// Load a catalog from a JSON array of options
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read catalog from {:?}", path.as_ref()))?;

        let catalog: Self =
            serde_json::from_str(&content).context("Failed to parse catalog JSON")?;

        Ok(catalog)
    }
}

impl FromIterator<SelectableOption> for Catalog {
    fn from_iter<T: IntoIterator<Item = SelectableOption>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Set of selected option ids.
///
/// Membership ignores order; insertion order is kept for display only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionSet {
    ids: Vec<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a selection. Duplicate ids are collapsed.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for id in ids {
            set.insert(id.into());
        }
        set
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Ids in insertion order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Listed co-requisites of selected options that are not selected.
    ///
    /// Returns `(selected id, missing partner id)` pairs. Non-empty results can
    /// happen after chained relations since propagation is single-hop.
    pub fn missing_co_requisites(&self, catalog: &Catalog) -> Vec<(String, String)> {
        let mut missing = Vec::new();
        for id in self.iter() {
            let Some(option) = catalog.find(id) else {
                continue;
            };
            for partner in &option.co_requisites {
                if !self.contains(partner) {
                    missing.push((id.to_string(), partner.clone()));
                }
            }
        }
        missing
    }

    fn insert(&mut self, id: String) {
        if !self.contains(&id) {
            self.ids.push(id);
        }
    }

    fn discard(&mut self, id: &str) {
        self.ids.retain(|s| s != id);
    }
}

impl PartialEq for SelectionSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|id| other.contains(id))
    }
}

impl Eq for SelectionSet {}

// ============================================================================
// Engine
// ============================================================================

/// Toggle `option_id` in `current`.
///
/// Unknown ids, and disabled options that are not already selected, leave the
/// selection unchanged.
pub fn toggle(option_id: &str, catalog: &Catalog, current: &SelectionSet) -> SelectionSet {
    let Some(option) = catalog.find(option_id) else {
        debug!(option_id, "toggle ignored: unknown option");
        return current.clone();
    };

    if current.contains(option_id) {
        return removal_path(option, catalog, current);
    }

    if option.disabled {
        debug!(option_id, "toggle ignored: option is disabled");
        return current.clone();
    }

    addition_path(option, catalog, current)
}

/// Remove `option_id` and its one-hop co-requisites from `current`.
///
/// Runs the removal path whether or not the option is selected, so calling it
/// twice is the same as calling it once. Unknown ids, and disabled options
/// that are not selected, are a no-op.
pub fn remove(option_id: &str, catalog: &Catalog, current: &SelectionSet) -> SelectionSet {
    let Some(option) = catalog.find(option_id) else {
        debug!(option_id, "remove ignored: unknown option");
        return current.clone();
    };

    if option.disabled && !current.contains(option_id) {
        debug!(option_id, "remove ignored: option is disabled");
        return current.clone();
    }

    removal_path(option, catalog, current)
}

fn removal_path(
    option: &SelectableOption,
    catalog: &Catalog,
    current: &SelectionSet,
) -> SelectionSet {
    let mut next = current.clone();

    // 1. The option itself
    next.discard(&option.id);

    // 2. Listed partners (one level; disablement does not protect them)
    for partner in &option.co_requisites {
        next.discard(partner);
    }

    // 3. Options that list this one
    for lister in catalog.listing(&option.id) {
        next.discard(&lister.id);
    }

    debug!(
        option_id = %option.id,
        before = current.len(),
        after = next.len(),
        "deselected option"
    );
    next
}

fn addition_path(
    option: &SelectableOption,
    catalog: &Catalog,
    current: &SelectionSet,
) -> SelectionSet {
    let mut next = current.clone();

    // 1. The option itself
    next.insert(option.id.clone());

    // 2. Listed partners that exist and are enabled
    for partner_id in &option.co_requisites {
        match catalog.find(partner_id) {
            Some(partner) if !partner.disabled => next.insert(partner.id.clone()),
            Some(_) => debug!(partner_id = %partner_id, "co-requisite not added: disabled"),
            None => debug!(partner_id = %partner_id, "co-requisite not added: not in catalog"),
        }
    }

    // 3. Enabled options that list this one
    for lister in catalog.listing(&option.id) {
        if !lister.disabled {
            next.insert(lister.id.clone());
        }
    }

    debug!(
        option_id = %option.id,
        before = current.len(),
        after = next.len(),
        "selected option"
    );
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_catalog() -> Catalog {
        Catalog::new(vec![
            SelectableOption::new("A1").with_co_requisites(["A2"]),
            SelectableOption::new("A2"),
            SelectableOption::new("B1").disable(Some("Requires MATH101")),
        ])
    }

    #[test]
    fn test_toggle_adds_listed_partner() {
        let catalog = scenario_catalog();
        let next = toggle("A1", &catalog, &SelectionSet::new());
        assert_eq!(next, SelectionSet::from_ids(["A1", "A2"]));
    }

    #[test]
    fn test_toggle_adds_reverse_partner() {
        let catalog = scenario_catalog();
        let next = toggle("A2", &catalog, &SelectionSet::new());
        assert_eq!(next, SelectionSet::from_ids(["A1", "A2"]));
    }

    #[test]
    fn test_toggle_disabled_unselected_is_noop() {
        let catalog = scenario_catalog();
        let start = SelectionSet::from_ids(["A1", "A2"]);
        assert_eq!(toggle("B1", &catalog, &start), start);
    }

    #[test]
    fn test_toggle_unknown_is_noop() {
        let catalog = scenario_catalog();
        let start = SelectionSet::from_ids(["A1", "A2"]);
        assert_eq!(toggle("ZZ9", &catalog, &start), start);
        assert_eq!(remove("ZZ9", &catalog, &start), start);
    }

    #[test]
    fn test_toggle_selected_disabled_option_deselects() {
        let catalog = scenario_catalog();
        let start = SelectionSet::from_ids(["B1"]);
        assert!(toggle("B1", &catalog, &start).is_empty());
    }

    #[test]
    fn test_remove_uses_reverse_scan() {
        let catalog = scenario_catalog();
        let start = SelectionSet::from_ids(["A1", "A2"]);
        assert!(remove("A2", &catalog, &start).is_empty());
    }

    #[test]
    fn test_addition_skips_disabled_partner() {
        let catalog = Catalog::new(vec![
            SelectableOption::new("C1").with_co_requisites(["C2"]),
            SelectableOption::new("C2").disable(None),
        ]);
        let next = toggle("C1", &catalog, &SelectionSet::new());
        assert_eq!(next, SelectionSet::from_ids(["C1"]));
    }

    #[test]
    fn test_addition_skips_partner_missing_from_catalog() {
        let catalog = Catalog::new(vec![SelectableOption::new("D1").with_co_requisites(["GONE"])]);
        let next = toggle("D1", &catalog, &SelectionSet::new());
        assert_eq!(next, SelectionSet::from_ids(["D1"]));
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let catalog = scenario_catalog();
        let next = toggle("A1", &catalog, &SelectionSet::new());
        assert_eq!(next.ids(), &["A1".to_string(), "A2".to_string()]);
    }

    #[test]
    fn test_from_ids_collapses_duplicates() {
        let set = SelectionSet::from_ids(["X", "Y", "X"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_missing_co_requisites_reports_gap() {
        let catalog = scenario_catalog();
        let set = SelectionSet::from_ids(["A1"]);
        assert_eq!(
            set.missing_co_requisites(&catalog),
            vec![("A1".to_string(), "A2".to_string())]
        );
        assert!(SelectionSet::from_ids(["A1", "A2"])
            .missing_co_requisites(&catalog)
            .is_empty());
    }

    #[test]
    fn test_catalog_json_uses_camel_case() {
        let json = r#"[
            {"id":"A1","coRequisites":["A2"]},
            {"id":"B1","disabled":true,"helperText":"Requires A1"}
        ]"#;
        let catalog: Catalog = serde_json::from_str(json).expect("Should parse");
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.find("A1").map(|o| o.co_requisites.len()), Some(1));
        let b1 = catalog.find("B1").expect("B1");
        assert!(b1.disabled);
        assert_eq!(b1.helper_text.as_deref(), Some("Requires A1"));
    }
}
