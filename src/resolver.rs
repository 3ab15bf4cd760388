// 🔍 Match Resolver - Raw token → catalog record
// Eight tiers tried in order, first hit wins; the last tier is a rate-limited fuzzy scan

use crate::catalog::{CatalogRecord, Category};
use crate::config::ResolverConfig;
use crate::exclusives::ExclusiveList;
use crate::index::{CatalogIndex, UMBRELLA_KEY};
use crate::normalize::normalize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Marker shared by every pet-carrier backpack id
pub const PET_CARRIER_MARKER: &str = "petcarrier-";

// ============================================================================
// ERRORS
// ============================================================================

/// Non-fatal resolution failure; the caller treats the item as unresolved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unrecognized category: {0}")]
    UnrecognizedCategory(String),
}

// ============================================================================
// MATCH TIER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchTier {
    /// Allow-listed id present in the category's variant map
    CuratedExclusive,

    /// Primary id map, same category
    PrimaryId,

    /// Any variant key of the category
    Variant,

    /// Pet-carrier modifiers in a different order
    PetCarrier,

    /// First hyphen-delimited segment removed
    PrefixStripped,

    /// Hyphens swapped for underscores
    SeparatorSwap,

    /// Glider umbrella alias
    UmbrellaAlias,

    /// Position-aligned similarity above threshold
    Fuzzy,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::CuratedExclusive => "curated_exclusive",
            MatchTier::PrimaryId => "primary_id",
            MatchTier::Variant => "variant",
            MatchTier::PetCarrier => "pet_carrier",
            MatchTier::PrefixStripped => "prefix_stripped",
            MatchTier::SeparatorSwap => "separator_swap",
            MatchTier::UmbrellaAlias => "umbrella_alias",
            MatchTier::Fuzzy => "fuzzy",
        }
    }
}

/// A successful resolution
#[derive(Debug, Clone)]
pub struct Resolution {
    pub record: Arc<CatalogRecord>,
    pub tier: MatchTier,

    /// Similarity score (fuzzy tier only)
    pub score: Option<f64>,
}

impl Resolution {
    fn exact(record: &Arc<CatalogRecord>, tier: MatchTier) -> Self {
        Resolution {
            record: Arc::clone(record),
            tier,
            score: None,
        }
    }
}

// ============================================================================
// FUZZY QUOTA
// ============================================================================

/// Per-category fuzzy attempt counters, shared by every concurrent resolution
#[derive(Debug)]
pub struct FuzzyQuota {
    limit: usize,
    used: HashMap<Category, AtomicUsize>,
}

impl FuzzyQuota {
    pub fn new(limit: usize) -> Self {
        FuzzyQuota {
            limit,
            used: Category::ALL.iter().map(|c| (*c, AtomicUsize::new(0))).collect(),
        }
    }

    /// Take one attempt; false once the category's quota is spent
    pub fn try_acquire(&self, category: Category) -> bool {
        let Some(counter) = self.used.get(&category) else {
            return false;
        };

        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.limit).then_some(n + 1)
            })
            .is_ok()
    }

    pub fn used(&self, category: Category) -> usize {
        self.used
            .get(&category)
            .map_or(0, |c| c.load(Ordering::SeqCst))
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

// ============================================================================
// MATCH RESOLVER
// ============================================================================

pub struct MatchResolver<'a> {
    index: &'a CatalogIndex,
    exclusives: &'a ExclusiveList,
    config: ResolverConfig,
    quota: FuzzyQuota,
}

impl<'a> MatchResolver<'a> {
    /// Create resolver with default thresholds
    pub fn new(index: &'a CatalogIndex, exclusives: &'a ExclusiveList) -> Self {
        MatchResolver::with_config(index, exclusives, ResolverConfig::default())
    }

    pub fn with_config(
        index: &'a CatalogIndex,
        exclusives: &'a ExclusiveList,
        config: ResolverConfig,
    ) -> Self {
        MatchResolver {
            index,
            exclusives,
            quota: FuzzyQuota::new(config.fuzzy_quota),
            config,
        }
    }

    /// Resolve a token against a category given by its backend code
    pub fn resolve(
        &self,
        token: &str,
        category_code: &str,
    ) -> Result<Option<Arc<CatalogRecord>>, ResolveError> {
        Ok(self.resolve_detailed(token, category_code)?.map(|r| r.record))
    }

    /// Same as [`MatchResolver::resolve`], keeping the tier that matched
    pub fn resolve_detailed(
        &self,
        token: &str,
        category_code: &str,
    ) -> Result<Option<Resolution>, ResolveError> {
        let category = Category::from_code(category_code)
            .ok_or_else(|| ResolveError::UnrecognizedCategory(category_code.to_string()))?;

        Ok(self.resolve_in(token, category))
    }

    /// Resolve a token in an already-validated category
    pub fn resolve_in(&self, token: &str, category: Category) -> Option<Resolution> {
        let token = token.trim().to_lowercase();
        if token.is_empty() {
            return None;
        }

        let resolution = self
            .exact_tiers(&token, category)
            .or_else(|| self.fuzzy_tier(&token, category));

        match &resolution {
            Some(hit) => log::debug!(
                "{} '{}' → {} via {}",
                category,
                token,
                hit.record.id,
                hit.tier.as_str()
            ),
            None => log::debug!("{} '{}' unresolved", category, token),
        }

        resolution
    }

    /// Fuzzy attempts already spent for a category
    pub fn fuzzy_attempts(&self, category: Category) -> usize {
        self.quota.used(category)
    }

    /// Tiers 1-7: exact lookups under the various spellings
    fn exact_tiers(&self, token: &str, category: Category) -> Option<Resolution> {
        // Tier 1: allow-listed ids win ties against any other reading of the same id
        if self.exclusives.contains_id(token) {
            if let Some(record) = self.index.get_variant(category, token) {
                return Some(Resolution::exact(record, MatchTier::CuratedExclusive));
            }
        }

        // Tier 2: primary id map, only if the record belongs to this category
        if let Some(record) = self.index.get_by_id(token) {
            if record.category() == Some(category) {
                return Some(Resolution::exact(record, MatchTier::PrimaryId));
            }
        }

        // Tier 3: any variant key
        if let Some(record) = self.index.get_variant(category, token) {
            return Some(Resolution::exact(record, MatchTier::Variant));
        }

        // Tier 4: pet carriers list their modifiers in no particular order
        if category == Category::Backpack && token.contains(PET_CARRIER_MARKER) {
            if let Some(record) = self.pet_carrier_match(token) {
                return Some(Resolution::exact(record, MatchTier::PetCarrier));
            }
        }

        // Tier 5: drop the first hyphen-delimited segment
        if let Some((_, without_prefix)) = token.split_once('-') {
            if let Some(record) = self.index.get_variant(category, without_prefix) {
                return Some(Resolution::exact(record, MatchTier::PrefixStripped));
            }
        }

        // Tier 6: the report swaps underscores for hyphens, swap them back
        let swapped = token.replace('-', "_");
        if let Some(record) = self.index.get_variant(category, &swapped) {
            return Some(Resolution::exact(record, MatchTier::SeparatorSwap));
        }

        // Tier 7: every umbrella glider token maps to the registered umbrella
        if category == Category::Glider && token.contains(UMBRELLA_KEY) {
            if let Some(record) = self.index.get_variant(category, UMBRELLA_KEY) {
                return Some(Resolution::exact(record, MatchTier::UmbrellaAlias));
            }
        }

        None
    }

    fn pet_carrier_match(&self, token: &str) -> Option<&'a Arc<CatalogRecord>> {
        let token_tail = after_marker(token, PET_CARRIER_MARKER).filter(|t| !t.is_empty())?;

        self.index
            .variants(Category::Backpack)
            .find(|(key, _)| match after_marker(key, PET_CARRIER_MARKER) {
                Some(key_tail) if !key_tail.is_empty() => {
                    key_tail.contains(token_tail) || token_tail.contains(key_tail)
                }
                _ => false,
            })
            .map(|(_, record)| record)
    }

    /// Tier 8: bounded position-aligned similarity scan
    fn fuzzy_tier(&self, token: &str, category: Category) -> Option<Resolution> {
        if !self.quota.try_acquire(category) {
            log::debug!("{} fuzzy quota exhausted, '{}' left unresolved", category, token);
            return None;
        }

        let normalized_token = normalize(token);
        if normalized_token.is_empty() {
            return None;
        }

        let mut best: Option<(&Arc<CatalogRecord>, f64)> = None;

        for (key, record) in self.index.variants(category) {
            // Length is checked on the key as registered, before normalizing
            if key.chars().count() < self.config.fuzzy_min_key_len {
                continue;
            }
            let normalized_key = normalize(key);
            if normalized_key.is_empty() {
                continue;
            }

            let score = positional_similarity(&normalized_key, &normalized_token);
            let to_beat = best.map_or(self.config.fuzzy_threshold, |(_, s)| s);
            if score > to_beat {
                best = Some((record, score));
            }
        }

        best.map(|(record, score)| Resolution {
            record: Arc::clone(record),
            tier: MatchTier::Fuzzy,
            score: Some(score),
        })
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Text after the first occurrence of `marker`
fn after_marker<'s>(s: &'s str, marker: &str) -> Option<&'s str> {
    s.find(marker).map(|pos| &s[pos + marker.len()..])
}

/// Index-aligned character matches divided by the longer length
///
/// Example:
/// - positional_similarity("renegaderaider", "renegaderaidr") = 12/14
/// - positional_similarity("abc", "xabc") = 0.0 (shifted, no aligned matches)
pub fn positional_similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }

    let matches = a.chars().zip(b.chars()).filter(|(x, y)| x == y).count();
    matches as f64 / longest as f64
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> CatalogIndex {
        CatalogIndex::build(vec![
            CatalogRecord::new("CID_013_Athena_Commando_F", "AthenaCharacter")
                .with_name("Renegade Raider"),
            CatalogRecord::new("CID_017_Athena_Commando_M", "AthenaCharacter")
                .with_name("Aerial Assault Trooper"),
            CatalogRecord::new("Pickaxe_ID_029_Assassin", "AthenaPickaxe").with_name("Pinpoint"),
            CatalogRecord::new("BID_PetCarrier-Dog-Gold", "AthenaBackpack").with_name("Bonesy Carrier"),
            CatalogRecord::new("Umbrella_Season_03", "AthenaGlider").with_name("Victory Umbrella"),
            CatalogRecord::new("Glider_ID_013_PSBlue", "AthenaGlider").with_name("Blue Streak"),
            CatalogRecord::new("EID_Floss", "AthenaDance").with_name("Floss"),
        ])
    }

    fn resolver<'a>(index: &'a CatalogIndex, exclusives: &'a ExclusiveList) -> MatchResolver<'a> {
        MatchResolver::new(index, exclusives)
    }

    #[test]
    fn test_unrecognized_category() {
        let index = sample_index();
        let exclusives = ExclusiveList::new();
        let resolver = resolver(&index, &exclusives);

        let err = resolver.resolve("anything", "AthenaLoadingScreen").unwrap_err();
        assert_eq!(err, ResolveError::UnrecognizedCategory("AthenaLoadingScreen".to_string()));
    }

    #[test]
    fn test_primary_id_requires_same_category() {
        let index = sample_index();
        let exclusives = ExclusiveList::new();
        let resolver = resolver(&index, &exclusives);

        let hit = resolver
            .resolve_detailed("  CID_013_Athena_Commando_F ", "AthenaCharacter")
            .unwrap()
            .unwrap();
        assert_eq!(hit.record.id, "CID_013_Athena_Commando_F");
        assert_eq!(hit.tier, MatchTier::PrimaryId);

        // Same id asked for under another category: tiers 2-7 miss
        let miss = resolver.resolve_in("EID_Floss", Category::Pickaxe);
        assert!(miss.map_or(true, |r| r.tier == MatchTier::Fuzzy));
    }

    #[test]
    fn test_variant_name_match() {
        let index = sample_index();
        let exclusives = ExclusiveList::new();
        let resolver = resolver(&index, &exclusives);

        let hit = resolver.resolve_in("renegaderaider", Category::Character).unwrap();
        assert_eq!(hit.record.id, "CID_013_Athena_Commando_F");
        assert_eq!(hit.tier, MatchTier::Variant);
    }

    #[test]
    fn test_every_variant_key_resolves_to_its_record() {
        let index = sample_index();
        let exclusives = ExclusiveList::new();
        let resolver = resolver(&index, &exclusives);

        for category in Category::ALL {
            for (key, record) in index.variants(category) {
                let hit = resolver.resolve_in(key, category).unwrap();
                assert_eq!(hit.record.id, record.id, "key {:?} in {}", key, category);
                assert_ne!(hit.tier, MatchTier::Fuzzy);
            }
        }
    }

    #[test]
    fn test_separator_swap() {
        let index = sample_index();
        let exclusives = ExclusiveList::new();
        let resolver = resolver(&index, &exclusives);

        let hit = resolver.resolve_in("cid-017-athena-commando-m", Category::Character).unwrap();
        assert_eq!(hit.record.id, "CID_017_Athena_Commando_M");
        assert_eq!(hit.tier, MatchTier::SeparatorSwap);
    }

    #[test]
    fn test_prefix_stripped() {
        let index = sample_index();
        let exclusives = ExclusiveList::new();
        let resolver = resolver(&index, &exclusives);

        // "xyz-" + normalized name
        let hit = resolver.resolve_in("xyz-pinpoint", Category::Pickaxe).unwrap();
        assert_eq!(hit.record.id, "Pickaxe_ID_029_Assassin");
        assert_eq!(hit.tier, MatchTier::PrefixStripped);
    }

    #[test]
    fn test_pet_carrier_heuristic() {
        let index = sample_index();
        let exclusives = ExclusiveList::new();
        let resolver = resolver(&index, &exclusives);

        // Token tail "dog" is contained in key tail "dog-gold"
        let hit = resolver.resolve_in("bid-petcarrier-dog", Category::Backpack).unwrap();
        assert_eq!(hit.record.id, "BID_PetCarrier-Dog-Gold");
        assert_eq!(hit.tier, MatchTier::PetCarrier);

        // Not applied outside backpacks
        let other = resolver.resolve_in("bid-petcarrier-dog", Category::Pickaxe);
        assert!(other.map_or(true, |r| r.tier != MatchTier::PetCarrier));
    }

    #[test]
    fn test_umbrella_alias() {
        let index = sample_index();
        let exclusives = ExclusiveList::new();
        let resolver = resolver(&index, &exclusives);

        let hit = resolver.resolve_in("umbrella-season-09", Category::Glider).unwrap();
        assert_eq!(hit.record.id, "Umbrella_Season_03");
        assert_eq!(hit.tier, MatchTier::UmbrellaAlias);
    }

    #[test]
    fn test_fuzzy_fallback_above_threshold() {
        let index = sample_index();
        let exclusives = ExclusiveList::new();
        let resolver = resolver(&index, &exclusives);

        let hit = resolver.resolve_in("renegaderaidr", Category::Character).unwrap();
        assert_eq!(hit.record.id, "CID_013_Athena_Commando_F");
        assert_eq!(hit.tier, MatchTier::Fuzzy);
        assert!(hit.score.unwrap() > 0.65);
        assert_eq!(resolver.fuzzy_attempts(Category::Character), 1);

        assert!(resolver.resolve_in("zzzzzzzzzzzz", Category::Character).is_none());
        assert_eq!(resolver.fuzzy_attempts(Category::Character), 2);
    }

    #[test]
    fn test_fuzzy_key_length_counts_separators() {
        let index = CatalogIndex::build(vec![CatalogRecord::new("A_B", "AthenaItemWrap")]);
        let exclusives = ExclusiveList::new();
        let resolver = resolver(&index, &exclusives);

        // "a_b" is three characters long even though it normalizes to "ab"
        let hit = resolver.resolve_in("a-bx", Category::ItemWrap).unwrap();
        assert_eq!(hit.record.id, "A_B");
        assert_eq!(hit.tier, MatchTier::Fuzzy);

        let short = CatalogIndex::build(vec![CatalogRecord::new("AB", "AthenaItemWrap")]);
        let resolver = MatchResolver::new(&short, &exclusives);
        assert!(resolver.resolve_in("abx", Category::ItemWrap).is_none());
    }

    #[test]
    fn test_curated_exclusive_wins_over_other_tiers() {
        // "floss" is the id of one dance and the normalized name of another;
        // the variant map holds the later record, the primary map the earlier one
        let index = CatalogIndex::build(vec![
            CatalogRecord::new("Floss", "AthenaDance").with_name("Original Floss"),
            CatalogRecord::new("EID_Floss_Remix", "AthenaDance").with_name("Floss"),
        ]);
        let mut exclusives = ExclusiveList::new();
        exclusives.add_id("floss");
        let resolver = resolver(&index, &exclusives);

        let hit = resolver.resolve_in("FLOSS", Category::Dance).unwrap();
        assert_eq!(hit.tier, MatchTier::CuratedExclusive);
        assert_eq!(hit.record.id, "EID_Floss_Remix");
        assert_eq!(resolver.fuzzy_attempts(Category::Dance), 0);

        // Without the allow-list the primary map answers first
        let plain = ExclusiveList::new();
        let resolver = MatchResolver::new(&index, &plain);
        let hit = resolver.resolve_in("FLOSS", Category::Dance).unwrap();
        assert_eq!(hit.tier, MatchTier::PrimaryId);
        assert_eq!(hit.record.id, "Floss");
    }

    #[test]
    fn test_fuzzy_quota_caps_attempts_per_category() {
        let index = sample_index();
        let exclusives = ExclusiveList::new();
        let resolver = resolver(&index, &exclusives);

        for i in 0..10 {
            let token = format!("qqqqqqqqqqqq{}", i);
            assert!(resolver.resolve_in(&token, Category::Character).is_none());
        }
        assert_eq!(resolver.fuzzy_attempts(Category::Character), 10);

        // Would fuzzy-match on a fresh resolver, but the quota is spent
        assert!(resolver.resolve_in("renegaderaidr", Category::Character).is_none());
        assert_eq!(resolver.fuzzy_attempts(Category::Character), 10);

        // Exact tiers still run
        assert!(resolver.resolve_in("renegaderaider", Category::Character).is_some());

        // Other categories keep their own quota
        assert!(resolver.resolve_in("bluestreek", Category::Glider).is_some());
        assert_eq!(resolver.fuzzy_attempts(Category::Glider), 1);

        let fresh = MatchResolver::new(&index, &exclusives);
        assert!(fresh.resolve_in("renegaderaidr", Category::Character).is_some());
    }

    #[test]
    fn test_fuzzy_quota_is_shared_across_threads() {
        let quota = FuzzyQuota::new(10);

        let granted: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| (0..5).filter(|_| quota.try_acquire(Category::Pickaxe)).count())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(granted, 10);
        assert_eq!(quota.used(Category::Pickaxe), 10);
        assert_eq!(quota.used(Category::Glider), 0);
    }

    #[test]
    fn test_positional_similarity() {
        assert_eq!(positional_similarity("abc", "abc"), 1.0);
        assert_eq!(positional_similarity("abc", "xabc"), 0.0);
        assert_eq!(positional_similarity("abcd", "abxx"), 0.5);
        assert_eq!(positional_similarity("ab", "abcd"), 0.5);
        assert_eq!(positional_similarity("", ""), 0.0);
    }
}
