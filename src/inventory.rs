// 🎒 Inventory - Owned item tokens per category
// Applies the duplicate policy and keeps acquisition dates next to their tokens

use crate::catalog::Category;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

// ============================================================================
// OWNED ITEM TOKEN
// ============================================================================

/// Raw item identifier for one category, as extracted from the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedItemToken {
    /// Filler stripped, underscores already turned into hyphens
    pub raw: String,

    /// Acquisition date, when the report printed one
    pub acquired: Option<NaiveDate>,
}

impl OwnedItemToken {
    pub fn new(raw: impl Into<String>) -> Self {
        OwnedItemToken {
            raw: raw.into(),
            acquired: None,
        }
    }

    /// Builder pattern: add acquisition date
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.acquired = Some(date);
        self
    }
}

// ============================================================================
// INVENTORY
// ============================================================================

/// Ordered token lists per category
///
/// With `dedupe` on, a token already present in its category (compared
/// case-insensitively) is dropped; a date carried by the duplicate still
/// fills in a missing date on the kept token.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    dedupe: bool,
    items: BTreeMap<Category, Vec<OwnedItemToken>>,
    seen: BTreeMap<Category, HashSet<String>>,

    /// Tokens dropped by the duplicate policy
    duplicates_dropped: usize,
}

impl Inventory {
    pub fn new(dedupe: bool) -> Self {
        Inventory {
            dedupe,
            ..Inventory::default()
        }
    }

    /// Add a token; returns false when the duplicate policy dropped it
    pub fn push(&mut self, category: Category, token: OwnedItemToken) -> bool {
        let raw = token.raw.trim();
        if raw.is_empty() {
            return false;
        }
        let token = OwnedItemToken {
            raw: raw.to_string(),
            acquired: token.acquired,
        };

        let key = token.raw.to_lowercase();
        let list = self.items.entry(category).or_default();

        if self.dedupe {
            let seen = self.seen.entry(category).or_default();
            if !seen.insert(key.clone()) {
                if let Some(date) = token.acquired {
                    if let Some(existing) = list.iter_mut().find(|t| t.raw.to_lowercase() == key) {
                        existing.acquired.get_or_insert(date);
                    }
                }
                self.duplicates_dropped += 1;
                return false;
            }
        }

        list.push(token);
        true
    }

    /// Tokens of one category, in extraction order
    pub fn tokens(&self, category: Category) -> &[OwnedItemToken] {
        self.items.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, category: Category) -> usize {
        self.tokens(category).len()
    }

    pub fn total(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    /// Per-category counts for every recognized category (zeros included)
    pub fn category_counts(&self) -> BTreeMap<Category, usize> {
        Category::ALL.iter().map(|c| (*c, self.count(*c))).collect()
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Write one sorted `<Subfolder>/<Code>.txt` file per category
    pub fn write_token_files<P: AsRef<Path>>(&self, results_dir: P) -> Result<()> {
        for category in Category::ALL {
            let dir = results_dir.as_ref().join(category.subfolder());
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {:?}", dir))?;

            let mut lines: Vec<&str> = self.tokens(category).iter().map(|t| t.raw.as_str()).collect();
            lines.sort();

            let mut content = lines.join("\n");
            if !content.is_empty() {
                content.push('\n');
            }

            let path = dir.join(category.text_file());
            fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
