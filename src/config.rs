// ⚙️ Configuration - Every tunable with its documented default
// Loaded from JSON the same way the allow-list is; a missing section means defaults

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// ROOT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockerConfig {
    pub resolver: ResolverConfig,
    pub classifier: ClassifierConfig,
    pub layout: LayoutConfig,
    pub thumbnails: ThumbnailConfig,
    pub inventory: InventoryConfig,
}

impl LockerConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => LockerConfig::from_file(path),
            None => Ok(LockerConfig::default()),
        }
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// A fuzzy candidate must score strictly above this (default: 0.65)
    pub fuzzy_threshold: f64,

    /// Fuzzy attempts allowed per category per run (default: 10)
    pub fuzzy_quota: usize,

    /// Variant keys shorter than this are never fuzzy candidates (default: 3)
    pub fuzzy_min_key_len: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            fuzzy_threshold: 0.65,
            fuzzy_quota: 10,
            fuzzy_min_key_len: 3,
        }
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// A legacy item family only counted as exclusive when acquired inside a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalFamily {
    pub name: String,

    /// Substrings (case-insensitive) identifying the family in a token
    pub markers: Vec<String>,

    /// First day of the window (inclusive)
    pub window_start: NaiveDate,

    /// Last day of the window (inclusive)
    pub window_end: NaiveDate,
}

impl SeasonalFamily {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.window_start && date <= self.window_end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub seasonal_families: Vec<SeasonalFamily>,

    /// Characters last seen in the shop on or before this date are exclusive
    pub shop_cutoff: NaiveDate,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let window_start = NaiveDate::from_ymd_opt(2017, 10, 26).unwrap_or_default();
        let window_end = NaiveDate::from_ymd_opt(2017, 12, 13).unwrap_or_default();

        ClassifierConfig {
            seasonal_families: vec![
                SeasonalFamily {
                    name: "Ghoul Trooper".to_string(),
                    markers: vec![
                        "cid_028_athena_commando_f_halloween".to_string(),
                        "ghoultrooper".to_string(),
                    ],
                    window_start,
                    window_end,
                },
                SeasonalFamily {
                    name: "Skull Trooper".to_string(),
                    markers: vec![
                        "cid_029_athena_commando_m_halloween".to_string(),
                        "skulltrooper".to_string(),
                    ],
                    window_start,
                    window_end,
                },
            ],
            shop_cutoff: NaiveDate::from_ymd_opt(2022, 7, 11).unwrap_or_default(),
        }
    }
}

// ============================================================================
// LAYOUT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Width budget divided among columns (default: 1200)
    pub target_width: u32,

    pub min_cell: u32,
    pub max_cell: u32,

    /// Outer margin on every side (default: 60)
    pub margin: u32,

    /// Title band above the first row (default: 60)
    pub header_height: u32,

    /// Columns ≈ sqrt(n * aspect_bias) (default: 1.5)
    pub aspect_bias: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            target_width: 1200,
            min_cell: 80,
            max_cell: 200,
            margin: 60,
            header_height: 60,
            aspect_bias: 1.5,
        }
    }
}

// ============================================================================
// THUMBNAILS / INVENTORY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Concurrent image fetches (default: 15)
    pub max_concurrent: usize,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        ThumbnailConfig { max_concurrent: 15 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Drop repeated tokens within a category (default: true)
    pub dedupe: bool,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        InventoryConfig { dedupe: true }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = LockerConfig::default();

        assert_eq!(config.resolver.fuzzy_threshold, 0.65);
        assert_eq!(config.resolver.fuzzy_quota, 10);
        assert_eq!(config.classifier.seasonal_families.len(), 2);
        assert_eq!(
            config.classifier.shop_cutoff,
            NaiveDate::from_ymd_opt(2022, 7, 11).unwrap()
        );
        assert_eq!(config.layout.margin, 60);
        assert_eq!(config.thumbnails.max_concurrent, 15);
        assert!(config.inventory.dedupe);
    }

    #[test]
    fn test_seasonal_window_is_inclusive() {
        let family = &ClassifierConfig::default().seasonal_families[0];

        assert!(family.contains(NaiveDate::from_ymd_opt(2017, 10, 26).unwrap()));
        assert!(family.contains(NaiveDate::from_ymd_opt(2017, 12, 13).unwrap()));
        assert!(!family.contains(NaiveDate::from_ymd_opt(2017, 10, 25).unwrap()));
        assert!(!family.contains(NaiveDate::from_ymd_opt(2017, 12, 14).unwrap()));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "resolver": {{ "fuzzy_quota": 3 }}, "inventory": {{ "dedupe": false }} }}"#
        )
        .unwrap();

        let config = LockerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.resolver.fuzzy_quota, 3);
        assert_eq!(config.resolver.fuzzy_threshold, 0.65);
        assert!(!config.inventory.dedupe);
        assert_eq!(config.layout, LayoutConfig::default());
    }

    #[test]
    fn test_load_or_default() {
        let config = LockerConfig::load_or_default(None).unwrap();
        assert_eq!(config, LockerConfig::default());
        assert!(LockerConfig::load_or_default(Some(Path::new("/nope/config.json"))).is_err());
    }
}
