// 📚 Catalog - Item categories, rarities and catalog records
// Records are built once from the external catalog payload and never mutated

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

// ============================================================================
// CATEGORY
// ============================================================================

/// Category - The fixed set of locker slots an item can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Character,
    Backpack,
    Pickaxe,
    Glider,
    Contrail,
    Dance,
    MusicPack,
    ItemWrap,
}

impl Category {
    /// Every recognized category, in report order
    pub const ALL: [Category; 8] = [
        Category::Character,
        Category::Backpack,
        Category::Pickaxe,
        Category::Glider,
        Category::Contrail,
        Category::Dance,
        Category::MusicPack,
        Category::ItemWrap,
    ];

    /// Backend code as it appears in the account report and the catalog payload
    pub fn code(&self) -> &'static str {
        match self {
            Category::Character => "AthenaCharacter",
            Category::Backpack => "AthenaBackpack",
            Category::Pickaxe => "AthenaPickaxe",
            Category::Glider => "AthenaGlider",
            Category::Contrail => "AthenaSkyDiveContrail",
            Category::Dance => "AthenaDance",
            Category::MusicPack => "AthenaMusicPack",
            Category::ItemWrap => "AthenaItemWrap",
        }
    }

    /// Parse a backend code (exact match, the codes are case-sensitive upstream)
    pub fn from_code(code: &str) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Output subfolder for this category's files
    pub fn subfolder(&self) -> &'static str {
        match self {
            Category::Character => "Characters",
            Category::Backpack => "Backpacks",
            Category::Pickaxe => "Pickaxes",
            Category::Glider => "Gliders",
            Category::Contrail => "Contrails",
            Category::Dance => "Emotes",
            Category::MusicPack => "Music",
            Category::ItemWrap => "Wraps",
        }
    }

    pub fn text_file(&self) -> String {
        format!("{}.txt", self.code())
    }

    pub fn image_file(&self) -> String {
        format!("{}.png", self.code())
    }

    /// Title used on the locker sheet ("Character", "SkyDiveContrail", ...)
    pub fn title(&self) -> &'static str {
        self.code().trim_start_matches("Athena")
    }

    /// Counter label used in the account summary
    pub fn count_label(&self) -> &'static str {
        match self {
            Category::Character => "Total Skins",
            Category::Backpack => "Total Backblings",
            Category::Pickaxe => "Total Pickaxes",
            Category::Glider => "Total Gliders",
            Category::Contrail => "Total Contrails",
            Category::Dance => "Total Emotes",
            Category::MusicPack => "Total Music Packs",
            Category::ItemWrap => "Total Wraps",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// RARITY
// ============================================================================

/// Rarity tier of a catalog item
///
/// Crossover series (Marvel, DC, Icon, Star Wars) rank below common on
/// purpose: they sort last on the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Mythic,
    Marvel,
    Dc,
    Icon,
    StarWars,
    /// Any value the rank table does not know about
    Other(String),
}

impl Rarity {
    /// Parse a catalog rarity value (case-insensitive)
    pub fn from_value(value: &str) -> Rarity {
        match value.trim().to_lowercase().as_str() {
            "common" => Rarity::Common,
            "uncommon" => Rarity::Uncommon,
            "rare" => Rarity::Rare,
            "epic" => Rarity::Epic,
            "legendary" => Rarity::Legendary,
            "mythic" => Rarity::Mythic,
            "marvel" => Rarity::Marvel,
            "dc" => Rarity::Dc,
            "icon" => Rarity::Icon,
            "starwars" => Rarity::StarWars,
            other => Rarity::Other(other.to_string()),
        }
    }

    /// Rank used for display ordering (mythic=6 down to common=1, everything else 0)
    pub fn rank(&self) -> u8 {
        match self {
            Rarity::Mythic => 6,
            Rarity::Legendary => 5,
            Rarity::Epic => 4,
            Rarity::Rare => 3,
            Rarity::Uncommon => 2,
            Rarity::Common => 1,
            Rarity::Marvel | Rarity::Dc | Rarity::Icon | Rarity::StarWars => 0,
            Rarity::Other(_) => 0,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
            Rarity::Mythic => "mythic",
            Rarity::Marvel => "marvel",
            Rarity::Dc => "dc",
            Rarity::Icon => "icon",
            Rarity::StarWars => "starwars",
            Rarity::Other(value) => value,
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CATALOG RECORD
// ============================================================================

/// Image kinds in the order a thumbnail is picked from them
pub const IMAGE_PREFERENCE: [&str; 5] = ["icon", "smallIcon", "featured", "lego.large", "lego.small"];

/// One catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Catalog-unique id (compared case-insensitively)
    pub id: String,

    /// Display name, if the catalog has one
    pub display_name: Option<String>,

    /// Raw backend category code (may be outside the recognized set)
    pub category_code: String,

    /// Rarity; absent means common
    pub rarity: Option<Rarity>,

    /// Historical shop appearances, ascending
    pub history_dates: Vec<NaiveDate>,

    /// Image kind → URL
    pub image_refs: BTreeMap<String, String>,
}

impl CatalogRecord {
    /// Create a record with only the required fields
    pub fn new(id: impl Into<String>, category_code: impl Into<String>) -> Self {
        CatalogRecord {
            id: id.into(),
            display_name: None,
            category_code: category_code.into(),
            rarity: None,
            history_dates: Vec::new(),
            image_refs: BTreeMap::new(),
        }
    }

    /// Builder pattern: add display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Builder pattern: add rarity
    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = Some(rarity);
        self
    }

    /// Builder pattern: add shop history (sorted on insert)
    pub fn with_history(mut self, mut dates: Vec<NaiveDate>) -> Self {
        dates.sort();
        self.history_dates = dates;
        self
    }

    /// Builder pattern: add an image reference
    pub fn with_image(mut self, kind: impl Into<String>, url: impl Into<String>) -> Self {
        self.image_refs.insert(kind.into(), url.into());
        self
    }

    /// Recognized category, if any
    pub fn category(&self) -> Option<Category> {
        Category::from_code(&self.category_code)
    }

    /// Rarity with the documented default
    pub fn rarity_or_default(&self) -> Rarity {
        self.rarity.clone().unwrap_or(Rarity::Common)
    }

    /// Most recent shop appearance
    pub fn latest_history_date(&self) -> Option<NaiveDate> {
        self.history_dates.iter().max().copied()
    }

    /// Thumbnail URL following [`IMAGE_PREFERENCE`]
    pub fn preferred_image(&self) -> Option<&str> {
        IMAGE_PREFERENCE
            .iter()
            .find_map(|kind| self.image_refs.get(*kind))
            .map(String::as_str)
    }
}

// ============================================================================
// PAYLOAD LOADING
// ============================================================================

/// Catalog payload - either the API envelope or a bare list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogPayload {
    Envelope { data: Vec<RawCatalogItem> },
    List(Vec<RawCatalogItem>),
}

#[derive(Debug, Deserialize)]
struct RawCatalogItem {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    item_type: Option<RawTagged>,
    #[serde(default)]
    rarity: Option<RawTagged>,
    #[serde(default, rename = "shopHistory")]
    shop_history: Option<Vec<String>>,
    #[serde(default)]
    images: Option<RawImages>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTagged {
    #[serde(default)]
    value: Option<String>,
    #[serde(default, rename = "backendValue")]
    backend_value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawImages {
    #[serde(default)]
    icon: Option<String>,
    #[serde(default, rename = "smallIcon")]
    small_icon: Option<String>,
    #[serde(default)]
    featured: Option<String>,
    #[serde(default)]
    lego: Option<RawLegoImages>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLegoImages {
    #[serde(default)]
    large: Option<String>,
    #[serde(default)]
    small: Option<String>,
}

impl From<RawCatalogItem> for CatalogRecord {
    fn from(raw: RawCatalogItem) -> Self {
        let category_code = raw
            .item_type
            .and_then(|t| t.backend_value)
            .unwrap_or_default();

        let rarity = raw
            .rarity
            .and_then(|r| r.value)
            .filter(|v| !v.trim().is_empty())
            .map(|v| Rarity::from_value(&v));

        let mut history_dates: Vec<NaiveDate> = raw
            .shop_history
            .unwrap_or_default()
            .iter()
            .filter_map(|d| parse_history_date(d))
            .collect();
        history_dates.sort();

        let mut image_refs = BTreeMap::new();
        if let Some(images) = raw.images {
            let lego = images.lego.unwrap_or_default();
            let entries = [
                ("icon", images.icon),
                ("smallIcon", images.small_icon),
                ("featured", images.featured),
                ("lego.large", lego.large),
                ("lego.small", lego.small),
            ];
            for (kind, url) in entries {
                if let Some(url) = url.filter(|u| !u.is_empty()) {
                    image_refs.insert(kind.to_string(), url);
                }
            }
        }

        CatalogRecord {
            id: raw.id,
            display_name: raw.name.filter(|n| !n.is_empty()),
            category_code,
            rarity,
            history_dates,
            image_refs,
        }
    }
}

/// Parse a shop-history entry ("2019-03-14T00:00:00Z" or "2019-03-14")
pub fn parse_history_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }

    // Timestamps without an offset: keep the date part
    value
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Parse a catalog payload from a JSON string
pub fn parse_catalog(json: &str) -> Result<Vec<CatalogRecord>> {
    let payload: CatalogPayload =
        serde_json::from_str(json).context("Failed to parse catalog JSON")?;

    let items = match payload {
        CatalogPayload::Envelope { data } => data,
        CatalogPayload::List(items) => items,
    };

    Ok(items.into_iter().map(CatalogRecord::from).collect())
}

/// Load a catalog payload file
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Vec<CatalogRecord>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read catalog file: {:?}", path.as_ref()))?;

    let records = parse_catalog(&content)?;
    log::info!("Loaded {} catalog records from {:?}", records.len(), path.as_ref());
    Ok(records)
}

// ============================================================================
// TESTS
// ============================================================================
