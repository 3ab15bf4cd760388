// 🏅 Display Sorter - Match results in sheet order
// Rank descending (exclusives on top), then name ascending

use crate::catalog::{CatalogRecord, Category, Rarity};
use crate::classifier::ExclusiveReason;
use crate::inventory::OwnedItemToken;
use crate::resolver::{MatchTier, Resolution};
use std::cmp::Ordering;
use std::sync::Arc;

/// Rank given to exclusive items, one above mythic
pub const EXCLUSIVE_RANK: u8 = 7;

// ============================================================================
// MATCH RESULT
// ============================================================================

/// One token after resolution and classification
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub token: OwnedItemToken,
    pub category: Category,
    pub record: Option<Arc<CatalogRecord>>,

    /// Tier that produced the record
    pub tier: Option<MatchTier>,

    pub is_exclusive: bool,
    pub exclusive_reason: Option<ExclusiveReason>,

    /// Derived once from record and exclusivity
    pub rarity_rank: u8,
}

impl MatchResult {
    pub fn new(
        token: OwnedItemToken,
        category: Category,
        resolution: Option<Resolution>,
        exclusive_reason: Option<ExclusiveReason>,
    ) -> Self {
        let (record, tier) = match resolution {
            Some(r) => (Some(r.record), Some(r.tier)),
            None => (None, None),
        };
        let is_exclusive = exclusive_reason.is_some();
        let rarity_rank = effective_rank(record.as_deref(), is_exclusive);

        MatchResult {
            token,
            category,
            record,
            tier,
            is_exclusive,
            exclusive_reason,
            rarity_rank,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.record.is_some()
    }

    /// Catalog rarity; unresolved and unrated items count as common
    pub fn rarity(&self) -> Rarity {
        self.record
            .as_deref()
            .map_or(Rarity::Common, CatalogRecord::rarity_or_default)
    }

    /// Catalog display name, raw token as fallback
    pub fn display_name(&self) -> &str {
        self.record
            .as_deref()
            .and_then(|r| r.display_name.as_deref())
            .unwrap_or(&self.token.raw)
    }
}

/// Rank used for ordering: exclusives on top, unresolved = common
pub fn effective_rank(record: Option<&CatalogRecord>, is_exclusive: bool) -> u8 {
    if is_exclusive {
        return EXCLUSIVE_RANK;
    }

    record.map_or(Rarity::Common.rank(), |r| r.rarity_or_default().rank())
}

// ============================================================================
// SORTING
// ============================================================================

/// Case-insensitive name order, ordinal as tie-break
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Display order: rank descending, then name ascending
pub fn display_order(a: &MatchResult, b: &MatchResult) -> Ordering {
    b.rarity_rank
        .cmp(&a.rarity_rank)
        .then_with(|| compare_names(a.display_name(), b.display_name()))
}

/// Stable in-place sort for display
pub fn sort_for_display(items: &mut [MatchResult]) {
    items.sort_by(display_order);
}

/// Owned variant of [`sort_for_display`]
pub fn sorted_for_display(mut items: Vec<MatchResult>) -> Vec<MatchResult> {
    sort_for_display(&mut items);
    items
}

// ============================================================================
// TESTS
// ============================================================================
