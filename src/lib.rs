// Locker Checker - Core Library
// Catalog resolution, exclusivity classification and sheet layout for locker reports

pub mod normalize;
pub mod catalog;
pub mod index;
pub mod exclusives;
pub mod config;
pub mod inventory;
pub mod extract;     // Report text → tokens, account summary
pub mod resolver;    // Eight-tier token → record resolution
pub mod classifier;
pub mod sorter;
pub mod layout;
pub mod thumbnails;
pub mod pipeline;
pub mod export;

// Re-export commonly used types
pub use normalize::normalize;
pub use catalog::{
    Category, Rarity, CatalogRecord,
    load_catalog, parse_catalog,
};
pub use index::CatalogIndex;
pub use exclusives::{ExclusiveGroup, ExclusiveList};
pub use config::{
    LockerConfig, ResolverConfig, ClassifierConfig, LayoutConfig,
    ThumbnailConfig, InventoryConfig, SeasonalFamily,
};
pub use inventory::{Inventory, OwnedItemToken};
pub use extract::{
    TokenExtractor, ReportTokenExtractor, ExtractedToken, AccountSummary,
    read_text_blocks,
};
pub use resolver::{MatchResolver, MatchTier, Resolution, ResolveError, FuzzyQuota};
pub use classifier::{ExclusivityClassifier, ExclusiveReason};
pub use sorter::{MatchResult, sort_for_display, sorted_for_display, EXCLUSIVE_RANK};
pub use layout::{LayoutPlanner, LayoutPlan, PlacementRecord, GridGeometry, ColorKey, truncate_label};
pub use thumbnails::{ImageSource, ImageHandle, CacheDirImageSource, ThumbnailLoader, ThumbnailRequest};
pub use pipeline::{LockerPipeline, LockerSheet, SheetCell, PipelineOutput, RunReport, CategoryStats};
pub use export::{PlacementRow, write_outputs, write_placements_csv, write_run_report};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Folder created next to the input for every output file
pub const RESULTS_FOLDER: &str = "Checker Results";
