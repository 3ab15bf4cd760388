// 🏆 Exclusive Allow-List - Curated legacy items as data
// Ids and display names curated per category, loaded from JSON, never hard-coded in logic

use crate::catalog::CatalogRecord;
use crate::normalize::normalize;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

/// Table shipped with the crate
const DEFAULT_TABLE: &str = include_str!("../data/exclusives.json");

// ============================================================================
// CURATED GROUP
// ============================================================================

/// One curated group ("characters", "pickaxes", ...)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExclusiveGroup {
    /// Catalog ids (compared case-insensitively)
    #[serde(default)]
    pub ids: Vec<String>,

    /// Display names (compared after normalization)
    #[serde(default)]
    pub names: Vec<String>,
}

// ============================================================================
// EXCLUSIVE LIST
// ============================================================================

/// Membership sets built from the curated groups
#[derive(Debug, Clone, Default)]
pub struct ExclusiveList {
    /// Lower-cased ids
    ids: HashSet<String>,

    /// Normalized ids and names
    normalized: HashSet<String>,

    /// Group name → number of entries (for reporting)
    group_sizes: BTreeMap<String, usize>,
}

impl ExclusiveList {
    /// Empty list (nothing is allow-listed)
    pub fn new() -> Self {
        ExclusiveList::default()
    }

    /// The table embedded in the binary
    pub fn embedded() -> Result<Self> {
        ExclusiveList::from_json(DEFAULT_TABLE).context("Embedded exclusive table is invalid")
    }

    /// Load from a JSON file of `{ "<group>": { "ids": [...], "names": [...] } }`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read exclusives file: {:?}", path.as_ref()))?;

        ExclusiveList::from_json(&content)
            .with_context(|| format!("Failed to load exclusives file: {:?}", path.as_ref()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let groups: BTreeMap<String, ExclusiveGroup> =
            serde_json::from_str(json).context("Failed to parse exclusives JSON")?;

        Ok(ExclusiveList::from_groups(groups))
    }

    /// Build from already-parsed groups
    pub fn from_groups(groups: BTreeMap<String, ExclusiveGroup>) -> Self {
        let mut list = ExclusiveList::new();

        for (name, group) in groups {
            list.group_sizes.insert(name, group.ids.len() + group.names.len());

            for id in &group.ids {
                list.add_id(id);
            }
            for display_name in &group.names {
                list.add_name(display_name);
            }
        }

        list
    }

    /// Add a single id
    pub fn add_id(&mut self, id: &str) {
        let lowered = id.trim().to_lowercase();
        if lowered.is_empty() {
            return;
        }
        let normalized = normalize(&lowered);
        self.ids.insert(lowered);
        if !normalized.is_empty() {
            self.normalized.insert(normalized);
        }
    }

    /// Add a single display name
    pub fn add_name(&mut self, name: &str) {
        let normalized = normalize(name);
        if !normalized.is_empty() {
            self.normalized.insert(normalized);
        }
    }

    /// Exact id membership (case-insensitive)
    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains(&id.trim().to_lowercase())
    }

    /// Membership of the normalized form of `value`
    pub fn contains_normalized(&self, value: &str) -> bool {
        let key = normalize(value);
        !key.is_empty() && self.normalized.contains(&key)
    }

    /// Record id or normalized display name is allow-listed
    pub fn contains_record(&self, record: &CatalogRecord) -> bool {
        if self.contains_id(&record.id) {
            return true;
        }

        record
            .display_name
            .as_deref()
            .map_or(false, |name| self.contains_normalized(name))
    }

    /// Number of distinct ids
    pub fn id_count(&self) -> usize {
        self.ids.len()
    }

    pub fn group_sizes(&self) -> &BTreeMap<String, usize> {
        &self.group_sizes
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.normalized.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
