// 🗂️ Catalog Index - Keyed views over the flat catalog
//
// Problem solved:
// - "CID_013_Athena_Commando_F", "cid-013-athena-commando-f", "Renegade Raider"
//   → all reach the same catalog record
// - One primary map by id, plus one variant map per category holding every
//   spelling we know how to derive from a record

use crate::catalog::{CatalogRecord, Category};
use crate::normalize::normalize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Key under which the glider umbrella alias is registered
pub const UMBRELLA_KEY: &str = "umbrella";

// ============================================================================
// CATALOG INDEX
// ============================================================================

/// Immutable lookup structure built once from the catalog
///
/// Variant maps are ordered so that scans over them (pet carriers, fuzzy
/// fallback) visit keys in the same order on every run.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    /// Lower-cased id → record, across all categories
    by_id: HashMap<String, Arc<CatalogRecord>>,

    /// Category → (variant key → record)
    variants: HashMap<Category, BTreeMap<String, Arc<CatalogRecord>>>,
}

impl CatalogIndex {
    /// Build the index. Later records win on key collisions.
    pub fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = CatalogRecord>,
    {
        let mut index = CatalogIndex {
            by_id: HashMap::new(),
            variants: Category::ALL
                .iter()
                .map(|c| (*c, BTreeMap::new()))
                .collect(),
        };

        for record in records {
            index.insert(Arc::new(record));
        }

        log::debug!(
            "Catalog index built: {} ids, {} variant keys",
            index.by_id.len(),
            index.variants.values().map(BTreeMap::len).sum::<usize>()
        );

        index
    }

    fn insert(&mut self, record: Arc<CatalogRecord>) {
        let id = record.id.to_lowercase();
        self.by_id.insert(id.clone(), Arc::clone(&record));

        // Unrecognized categories live in the primary map only
        let Some(category) = record.category() else {
            return;
        };
        let Some(variants) = self.variants.get_mut(&category) else {
            return;
        };

        variants.insert(id.clone(), Arc::clone(&record));

        if let Some(name) = record.display_name.as_deref() {
            let normalized = normalize(name);
            if !normalized.is_empty() {
                variants.insert(normalized, Arc::clone(&record));
            }
        }

        if category == Category::Glider && id.contains(UMBRELLA_KEY) {
            variants.insert(UMBRELLA_KEY.to_string(), Arc::clone(&record));
        }

        if let Some((_, without_prefix)) = id.split_once('-') {
            variants.insert(without_prefix.to_string(), Arc::clone(&record));
        }
    }

    /// Primary-map lookup (case-insensitive)
    pub fn get_by_id(&self, id: &str) -> Option<&Arc<CatalogRecord>> {
        self.by_id.get(&id.to_lowercase())
    }

    /// Variant-map lookup; `key` is used as-is
    pub fn get_variant(&self, category: Category, key: &str) -> Option<&Arc<CatalogRecord>> {
        self.variants.get(&category).and_then(|m| m.get(key))
    }

    /// All variant keys of a category, in key order
    pub fn variants(&self, category: Category) -> impl Iterator<Item = (&String, &Arc<CatalogRecord>)> {
        self.variants.get(&category).into_iter().flat_map(|m| m.iter())
    }

    /// Number of variant keys registered for a category
    pub fn variant_count(&self, category: Category) -> usize {
        self.variants.get(&category).map_or(0, BTreeMap::len)
    }

    /// Number of distinct ids
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
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
            CatalogRecord::new("Umbrella_Season_03", "AthenaGlider").with_name("Victory Umbrella"),
            CatalogRecord::new("Glider-Founder-Gold", "AthenaGlider").with_name("Founder's Glider"),
            CatalogRecord::new("LoadingScreen_001", "AthenaLoadingScreen").with_name("Loading"),
        ])
    }

    #[test]
    fn test_primary_map_is_case_insensitive() {
        let index = sample_index();

        assert_eq!(index.len(), 4);
        assert!(index.get_by_id("cid_013_athena_commando_f").is_some());
        assert!(index.get_by_id("CID_013_ATHENA_COMMANDO_F").is_some());
    }

    #[test]
    fn test_variant_keys() {
        let index = sample_index();

        let by_id = index.get_variant(Category::Character, "cid_013_athena_commando_f").unwrap();
        let by_name = index.get_variant(Category::Character, "renegaderaider").unwrap();
        assert_eq!(by_id.id, by_name.id);

        // Umbrella alias only for gliders whose id mentions it
        let umbrella = index.get_variant(Category::Glider, UMBRELLA_KEY).unwrap();
        assert_eq!(umbrella.id, "Umbrella_Season_03");

        // Prefix-stripped id
        let founder = index.get_variant(Category::Glider, "founder-gold").unwrap();
        assert_eq!(founder.id, "Glider-Founder-Gold");
        assert!(index.get_variant(Category::Glider, "foundersglider").is_some());
    }

    #[test]
    fn test_unrecognized_category_only_in_primary_map() {
        let index = sample_index();

        assert!(index.get_by_id("loadingscreen_001").is_some());
        for category in Category::ALL {
            assert!(index.get_variant(category, "loadingscreen_001").is_none());
        }
    }

    #[test]
    fn test_last_write_wins_on_collision() {
        let index = CatalogIndex::build(vec![
            CatalogRecord::new("Pickaxe_A", "AthenaPickaxe").with_name("Shared Name"),
            CatalogRecord::new("Pickaxe_B", "AthenaPickaxe").with_name("Shared Name"),
        ]);

        let hit = index.get_variant(Category::Pickaxe, "sharedname").unwrap();
        assert_eq!(hit.id, "Pickaxe_B");
        assert_eq!(index.variant_count(Category::Pickaxe), 3);
    }

    #[test]
    fn test_variants_iterate_in_key_order() {
        let index = sample_index();
        let keys: Vec<&String> = index.variants(Category::Glider).map(|(k, _)| k).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}
