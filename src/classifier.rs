// 💎 Exclusivity Classifier - Is this item exclusive/legacy?
// Evaluated in order: seasonal window → shop absence → curated allow-list

use crate::catalog::{CatalogRecord, Category};
use crate::config::ClassifierConfig;
use crate::exclusives::ExclusiveList;
use crate::inventory::OwnedItemToken;
use crate::normalize::normalize;
use serde::{Deserialize, Serialize};

// ============================================================================
// CLASSIFICATION REASON
// ============================================================================

/// Why an item was classified exclusive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExclusiveReason {
    /// Legacy family acquired inside its historical window
    SeasonalWindow { family: String },

    /// Character last sold on or before the shop cutoff
    ShopAbsence { last_seen: chrono::NaiveDate },

    /// Id or name on the curated list
    AllowList,
}

// ============================================================================
// EXCLUSIVITY CLASSIFIER
// ============================================================================

pub struct ExclusivityClassifier<'a> {
    exclusives: &'a ExclusiveList,
    config: ClassifierConfig,
}

impl<'a> ExclusivityClassifier<'a> {
    /// Create classifier with the default windows and cutoff
    pub fn new(exclusives: &'a ExclusiveList) -> Self {
        ExclusivityClassifier::with_config(exclusives, ClassifierConfig::default())
    }

    pub fn with_config(exclusives: &'a ExclusiveList, config: ClassifierConfig) -> Self {
        ExclusivityClassifier { exclusives, config }
    }

    pub fn classify(
        &self,
        token: &OwnedItemToken,
        record: Option<&CatalogRecord>,
        category: Category,
    ) -> bool {
        self.explain(token, record, category).is_some()
    }

    /// Reason the item is exclusive, `None` when it is not
    pub fn explain(
        &self,
        token: &OwnedItemToken,
        record: Option<&CatalogRecord>,
        category: Category,
    ) -> Option<ExclusiveReason> {
        let raw = token.raw.trim();
        if raw.is_empty() {
            return None;
        }

        // Rule 1: a recognized legacy character family is decided by its window alone
        if category == Category::Character {
            if let Some(reason) = self.seasonal(token, raw) {
                return reason;
            }
        }

        // Rule 2: characters that have not been back in the shop since the cutoff
        if category == Category::Character {
            if let Some(record) = record {
                match record.latest_history_date() {
                    None => {
                        return self
                            .on_allow_list(raw, Some(record))
                            .then_some(ExclusiveReason::AllowList);
                    }
                    Some(last_seen) if last_seen <= self.config.shop_cutoff => {
                        return Some(ExclusiveReason::ShopAbsence { last_seen });
                    }
                    Some(_) => {}
                }
            }
        }

        // Rule 3: curated allow-list
        self.on_allow_list(raw, record)
            .then_some(ExclusiveReason::AllowList)
    }

    /// `Some(decision)` when the token belongs to a seasonal family
    fn seasonal(&self, token: &OwnedItemToken, raw: &str) -> Option<Option<ExclusiveReason>> {
        let lowered = raw.to_lowercase();
        let normalized = normalize(raw);
        let family = self.config.seasonal_families.iter().find(|family| {
            family.markers.iter().any(|marker| {
                let marker_key = normalize(marker);
                lowered.contains(&marker.to_lowercase())
                    || (!marker_key.is_empty() && normalized.contains(&marker_key))
            })
        })?;

        Some(match token.acquired {
            Some(date) if family.contains(date) => Some(ExclusiveReason::SeasonalWindow {
                family: family.name.clone(),
            }),
            _ => None,
        })
    }

    fn on_allow_list(&self, raw: &str, record: Option<&CatalogRecord>) -> bool {
        self.exclusives.contains_id(raw)
            || self.exclusives.contains_normalized(raw)
            || record.map_or(false, |r| self.exclusives.contains_record(r))
    }
}

// ============================================================================
// TESTS
// ============================================================================
