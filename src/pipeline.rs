// 🔄 Locker Pipeline - Inventory → resolved, classified, sorted, laid-out sheets
// Categories run in parallel; items inside a category run in order

use crate::catalog::Category;
use crate::classifier::ExclusivityClassifier;
use crate::config::LockerConfig;
use crate::exclusives::ExclusiveList;
use crate::index::CatalogIndex;
use crate::inventory::Inventory;
use crate::layout::{category_title, combined_title, GridGeometry, LayoutPlan, LayoutPlanner, PlacementRecord};
use crate::resolver::MatchResolver;
use crate::sorter::{display_order, sort_for_display, MatchResult};
use crate::thumbnails::{ImageHandle, ThumbnailLoader, ThumbnailRequest};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

// ============================================================================
// SHEETS
// ============================================================================

/// One grid cell with its thumbnail outcome
#[derive(Debug, Clone)]
pub struct SheetCell {
    pub placement: PlacementRecord,
    pub thumbnail: Option<ImageHandle>,
    pub found: bool,
}

/// A laid-out grid ready for rendering (one category, or every category)
#[derive(Debug, Clone)]
pub struct LockerSheet {
    /// `None` for the combined sheet
    pub category: Option<Category>,
    pub title: String,
    pub geometry: GridGeometry,
    pub cells: Vec<SheetCell>,
    pub found: usize,
    pub not_found: usize,
    pub elapsed: Duration,
}

impl LockerSheet {
    fn assemble(
        plan: LayoutPlan,
        category: Option<Category>,
        outcomes: Vec<(Option<ImageHandle>, bool)>,
        elapsed: Duration,
    ) -> Self {
        let cells: Vec<SheetCell> = plan
            .placements
            .into_iter()
            .zip(outcomes)
            .map(|(placement, (thumbnail, found))| SheetCell {
                placement,
                thumbnail,
                found,
            })
            .collect();

        let found = cells.iter().filter(|c| c.found).count();
        let not_found = cells.len() - found;

        LockerSheet {
            category,
            title: plan.title,
            geometry: plan.geometry,
            cells,
            found,
            not_found,
            elapsed,
        }
    }

    /// Base file name for this sheet's outputs
    pub fn file_stem(&self) -> String {
        match self.category {
            Some(category) => category.code().to_string(),
            None => "AllCosmetics".to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ============================================================================
// RUN REPORT
// ============================================================================

/// Per-category counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: String,
    pub tokens: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub exclusive: usize,

    /// Tier name → hits
    pub tiers: BTreeMap<String, usize>,

    pub fuzzy_attempts: usize,
    pub found: usize,
    pub not_found: usize,
    pub elapsed_ms: u64,
}

/// Summary of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub catalog_records: usize,
    pub total_tokens: usize,
    pub duplicates_dropped: usize,
    pub resolved: usize,
    pub exclusive: usize,
    pub found: usize,
    pub not_found: usize,
    pub categories: Vec<CategoryStats>,
    pub elapsed_ms: u64,
}

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Non-empty categories, in category order
    pub sheets: Vec<LockerSheet>,
    pub combined: LockerSheet,
    pub report: RunReport,
}

// ============================================================================
// LOCKER PIPELINE
// ============================================================================

pub struct LockerPipeline<'a> {
    index: &'a CatalogIndex,
    exclusives: &'a ExclusiveList,
    config: &'a LockerConfig,
}

/// Classified results of one category, before layout
struct CategoryRun {
    category: Category,
    results: Vec<MatchResult>,
    elapsed: Duration,
}

impl<'a> LockerPipeline<'a> {
    pub fn new(index: &'a CatalogIndex, exclusives: &'a ExclusiveList, config: &'a LockerConfig) -> Self {
        LockerPipeline {
            index,
            exclusives,
            config,
        }
    }

    /// Resolve and classify every token, categories in parallel
    ///
    /// Results come back sorted for display, one entry per non-empty category.
    pub fn classify(&self, inventory: &Inventory) -> Vec<(Category, Vec<MatchResult>)> {
        let resolver = MatchResolver::with_config(self.index, self.exclusives, self.config.resolver.clone());
        self.classify_with(&resolver, inventory)
            .into_iter()
            .map(|run| (run.category, run.results))
            .collect()
    }

    fn classify_with(&self, resolver: &MatchResolver<'_>, inventory: &Inventory) -> Vec<CategoryRun> {
        let classifier = ExclusivityClassifier::with_config(self.exclusives, self.config.classifier.clone());

        Category::ALL
            .par_iter()
            .filter(|category| inventory.count(**category) > 0)
            .map(|&category| {
                let start = Instant::now();

                let mut results: Vec<MatchResult> = inventory
                    .tokens(category)
                    .iter()
                    .map(|token| {
                        let resolution = resolver.resolve_in(&token.raw, category);
                        let record = resolution.as_ref().map(|r| r.record.as_ref());
                        let reason = classifier.explain(token, record, category);
                        MatchResult::new(token.clone(), category, resolution, reason)
                    })
                    .collect();

                sort_for_display(&mut results);

                log::info!(
                    "{}: {} items classified in {:.2}s",
                    category,
                    results.len(),
                    start.elapsed().as_secs_f64()
                );

                CategoryRun {
                    category,
                    results,
                    elapsed: start.elapsed(),
                }
            })
            .collect()
    }

    /// Full run: classify, lay out, load thumbnails, build the combined sheet
    pub fn run(&self, inventory: &Inventory, loader: Option<&ThumbnailLoader>) -> Result<PipelineOutput> {
        let run_start = Instant::now();
        let resolver = MatchResolver::with_config(self.index, self.exclusives, self.config.resolver.clone());
        let planner = LayoutPlanner::new(self.config.layout.clone());

        let runtime = match loader {
            Some(_) => Some(
                tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .build()
                    .context("Failed to start thumbnail runtime")?,
            ),
            None => None,
        };

        let runs = self.classify_with(&resolver, inventory);

        let mut sheets = Vec::with_capacity(runs.len());
        let mut stats = Vec::with_capacity(runs.len());

        for run in runs {
            let start = Instant::now();
            let plan = planner.plan(category_title(run.category, run.results.len()), run.results);

            let outcomes: Vec<(Option<ImageHandle>, bool)> = match (loader, &runtime) {
                (Some(loader), Some(runtime)) => {
                    let requests = plan.placements.iter().map(thumbnail_request).collect();
                    let handles = runtime.block_on(loader.load_all(requests));
                    handles
                        .into_iter()
                        .zip(&plan.placements)
                        .map(|(handle, placement)| {
                            let found = placement.match_result.is_resolved() && handle.is_some();
                            (handle, found)
                        })
                        .collect()
                }
                _ => plan
                    .placements
                    .iter()
                    .map(|p| (None, p.match_result.is_resolved()))
                    .collect(),
            };

            let sheet = LockerSheet::assemble(plan, Some(run.category), outcomes, run.elapsed + start.elapsed());
            log::info!(
                "Created sheet for {}: [{}] items found, [{}] not found",
                run.category,
                sheet.found,
                sheet.not_found
            );

            stats.push(category_stats(&sheet, resolver.fuzzy_attempts(run.category)));
            sheets.push(sheet);
        }

        let combined = combine(&planner, &sheets, run_start.elapsed());

        let report = RunReport {
            generated_at: Utc::now(),
            catalog_records: self.index.len(),
            total_tokens: inventory.total(),
            duplicates_dropped: inventory.duplicates_dropped(),
            resolved: stats.iter().map(|s| s.resolved).sum(),
            exclusive: stats.iter().map(|s| s.exclusive).sum(),
            found: combined.found,
            not_found: combined.not_found,
            categories: stats,
            elapsed_ms: run_start.elapsed().as_millis() as u64,
        };

        Ok(PipelineOutput {
            sheets,
            combined,
            report,
        })
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn thumbnail_request(placement: &PlacementRecord) -> ThumbnailRequest {
    ThumbnailRequest {
        url: placement
            .match_result
            .record
            .as_ref()
            .and_then(|r| r.preferred_image())
            .map(str::to_string),
        size: (placement.cell_size, placement.cell_size),
    }
}

/// Every category on one sheet, re-sorted as a whole; thumbnails are reused
fn combine(planner: &LayoutPlanner, sheets: &[LockerSheet], elapsed: Duration) -> LockerSheet {
    let mut items: Vec<(MatchResult, Option<ImageHandle>, bool)> = sheets
        .iter()
        .flat_map(|sheet| sheet.cells.iter())
        .map(|cell| (cell.placement.match_result.clone(), cell.thumbnail.clone(), cell.found))
        .collect();

    items.sort_by(|a, b| display_order(&a.0, &b.0));

    let mut results = Vec::with_capacity(items.len());
    let mut outcomes = Vec::with_capacity(items.len());
    for (result, thumbnail, found) in items {
        results.push(result);
        outcomes.push((thumbnail, found));
    }

    let plan = planner.plan(combined_title(results.len()), results);
    LockerSheet::assemble(plan, None, outcomes, elapsed)
}

fn category_stats(sheet: &LockerSheet, fuzzy_attempts: usize) -> CategoryStats {
    let mut stats = CategoryStats {
        category: sheet.category.map(|c| c.code().to_string()).unwrap_or_default(),
        tokens: sheet.len(),
        fuzzy_attempts,
        found: sheet.found,
        not_found: sheet.not_found,
        elapsed_ms: sheet.elapsed.as_millis() as u64,
        ..CategoryStats::default()
    };

    for cell in &sheet.cells {
        let result = &cell.placement.match_result;
        match result.tier {
            Some(tier) => {
                stats.resolved += 1;
                *stats.tiers.entry(tier.as_str().to_string()).or_insert(0) += 1;
            }
            None => stats.unresolved += 1,
        }
        if result.is_exclusive {
            stats.exclusive += 1;
        }
    }

    stats
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogRecord, Rarity};
    use crate::inventory::OwnedItemToken;
    use crate::thumbnails::ImageSource;
    use std::sync::Arc;

    fn index() -> CatalogIndex {
        CatalogIndex::build(vec![
            CatalogRecord::new("CID_013_Athena_Commando_F", "AthenaCharacter").with_name("Renegade Raider"),
            CatalogRecord::new("CID_175_Athena_Commando_M_Celestial", "AthenaCharacter")
                .with_name("Galaxy")
                .with_rarity(Rarity::Legendary)
                .with_image("icon", "https://img/galaxy.png"),
            CatalogRecord::new("Pickaxe_ID_013_Teslacoil", "AthenaPickaxe")
                .with_name("Pulse Axe")
                .with_rarity(Rarity::Rare)
                .with_image("icon", "https://img/pulse.png"),
        ])
    }

    fn allow_list() -> ExclusiveList {
        let mut list = ExclusiveList::new();
        list.add_id("cid_013_athena_commando_f");
        list
    }

    fn inventory() -> Inventory {
        let mut inventory = Inventory::new(true);
        inventory.push(Category::Character, OwnedItemToken::new("CID-175-Athena-Commando-M-Celestial"));
        inventory.push(Category::Character, OwnedItemToken::new("CID_013_Athena_Commando_F"));
        inventory.push(Category::Character, OwnedItemToken::new("cid-999-nobody"));
        inventory.push(Category::Pickaxe, OwnedItemToken::new("pickaxe-id-013-teslacoil"));
        inventory
    }

    #[test]
    fn test_allow_listed_item_without_rarity_ranks_above_legendary() {
        let index = index();
        let list = allow_list();
        let config = LockerConfig::default();
        let pipeline = LockerPipeline::new(&index, &list, &config);

        let classified = pipeline.classify(&inventory());
        let (category, characters) = &classified[0];
        assert_eq!(*category, Category::Character);

        let raider = &characters[0];
        assert_eq!(raider.token.raw, "CID_013_Athena_Commando_F");
        assert!(raider.is_resolved());
        assert!(raider.is_exclusive);
        assert_eq!(raider.display_name(), "Renegade Raider");

        let galaxy = &characters[1];
        assert_eq!(galaxy.display_name(), "Galaxy");
        assert!(!galaxy.is_exclusive);
        assert!(raider.rarity_rank > galaxy.rarity_rank);
    }

    #[test]
    fn test_run_without_loader() {
        let index = index();
        let list = allow_list();
        let config = LockerConfig::default();
        let pipeline = LockerPipeline::new(&index, &list, &config);

        let output = pipeline.run(&inventory(), None).unwrap();

        assert_eq!(output.sheets.len(), 2);
        let characters = &output.sheets[0];
        assert_eq!(characters.title, "Character (3 ITEMS)");
        assert_eq!(characters.found, 2);
        assert_eq!(characters.not_found, 1);
        assert_eq!(characters.file_stem(), "AthenaCharacter");

        assert_eq!(output.combined.len(), 4);
        assert_eq!(output.combined.title, "All Cosmetics (4 Items)");
        assert_eq!(output.combined.file_stem(), "AllCosmetics");
        let combined_names: Vec<&str> = output
            .combined
            .cells
            .iter()
            .map(|c| c.placement.match_result.display_name())
            .collect();
        assert_eq!(combined_names, vec!["Renegade Raider", "Galaxy", "Pulse Axe", "cid-999-nobody"]);

        let report = &output.report;
        assert_eq!(report.total_tokens, 4);
        assert_eq!(report.resolved, 3);
        assert_eq!(report.exclusive, 1);
        assert_eq!(report.found, 3);
        assert_eq!(report.not_found, 1);
        assert_eq!(report.categories[0].tiers.get("curated_exclusive"), Some(&1));
        assert_eq!(report.categories[0].unresolved, 1);
    }

    struct FixedSource;

    impl ImageSource for FixedSource {
        fn fetch(&self, url: &str, size: (u32, u32)) -> anyhow::Result<ImageHandle> {
            if url.contains("pulse") {
                anyhow::bail!("timed out");
            }
            Ok(ImageHandle {
                url: url.to_string(),
                path: std::path::PathBuf::from("/cache/x.png"),
                width: size.0,
                height: size.1,
            })
        }
    }

    #[test]
    fn test_run_with_loader_degrades_failed_images() {
        let index = index();
        let list = allow_list();
        let config = LockerConfig::default();
        let pipeline = LockerPipeline::new(&index, &list, &config);
        let loader = ThumbnailLoader::new(Arc::new(FixedSource), 2);

        let output = pipeline.run(&inventory(), Some(&loader)).unwrap();

        // Only Galaxy has an image that loads
        let characters = &output.sheets[0];
        assert_eq!(characters.found, 1);
        assert_eq!(characters.not_found, 2);

        let pickaxes = &output.sheets[1];
        assert_eq!(pickaxes.found, 0);
        assert!(pickaxes.cells[0].thumbnail.is_none());

        assert_eq!(output.combined.found, 1);
        assert_eq!(output.report.not_found, 3);
    }

    #[test]
    fn test_empty_inventory() {
        let index = index();
        let list = ExclusiveList::new();
        let config = LockerConfig::default();
        let pipeline = LockerPipeline::new(&index, &list, &config);

        let output = pipeline.run(&Inventory::new(true), None).unwrap();
        assert!(output.sheets.is_empty());
        assert!(output.combined.is_empty());
        assert_eq!(output.report.total_tokens, 0);
    }

    #[test]
    fn test_fuzzy_quota_is_per_category_in_parallel_runs() {
        let records = (0..30).map(|i| {
            CatalogRecord::new(format!("Glider_ID_{:03}_Aurora", i), "AthenaGlider")
                .with_name(format!("Aurora {}", i))
        });
        let index = CatalogIndex::build(records);
        let list = ExclusiveList::new();
        let mut config = LockerConfig::default();
        config.resolver.fuzzy_quota = 2;
        let pipeline = LockerPipeline::new(&index, &list, &config);

        let mut inventory = Inventory::new(true);
        for i in 0..5 {
            inventory.push(Category::Glider, OwnedItemToken::new(format!("glider-id-{:03}-aurorx", i)));
        }

        let output = pipeline.run(&inventory, None).unwrap();
        let gliders = &output.report.categories[0];
        assert_eq!(gliders.fuzzy_attempts, 2);
        assert_eq!(gliders.tiers.get("fuzzy").copied().unwrap_or(0), 2);
        assert_eq!(gliders.unresolved, 3);
    }
}
