// 🧮 Layout Planner - Grid geometry and per-item placement
// Computes where each item goes and what label/color it gets; never touches pixels

use crate::catalog::{Category, Rarity};
use crate::config::LayoutConfig;
use crate::sorter::MatchResult;
use serde::{Deserialize, Serialize};

// ============================================================================
// COLOR KEY
// ============================================================================

/// What the renderer looks up in its color table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorKey {
    Rarity(Rarity),
    Exclusive,
    NotFound,
}

impl ColorKey {
    pub fn for_result(result: &MatchResult) -> ColorKey {
        if result.is_exclusive {
            ColorKey::Exclusive
        } else if !result.is_resolved() {
            ColorKey::NotFound
        } else {
            ColorKey::Rarity(result.rarity())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ColorKey::Rarity(rarity) => rarity.as_str(),
            ColorKey::Exclusive => "exclusive",
            ColorKey::NotFound => "not_found",
        }
    }

    /// Background color of the thumbnail cell
    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            ColorKey::Exclusive => (235, 227, 88),
            ColorKey::NotFound => (40, 40, 40),
            ColorKey::Rarity(rarity) => match rarity {
                Rarity::Common => (150, 150, 150),
                Rarity::Uncommon => (96, 170, 58),
                Rarity::Rare => (73, 172, 242),
                Rarity::Epic => (177, 91, 226),
                Rarity::Legendary => (211, 120, 65),
                Rarity::Mythic => (235, 227, 88),
                Rarity::Marvel => (197, 51, 52),
                Rarity::Dc => (84, 117, 199),
                Rarity::Icon => (63, 181, 181),
                Rarity::StarWars => (32, 85, 128),
                Rarity::Other(_) => (100, 100, 100),
            },
        }
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub cols: u32,
    pub rows: u32,
    pub cell_size: u32,
    pub vertical_spacing: u32,
    pub text_height: u32,

    /// cell + vertical spacing + text height
    pub row_pitch: u32,

    pub margin: u32,
    pub header_height: u32,

    /// Canvas size
    pub width: u32,
    pub height: u32,

    pub base_font_size: u32,
    pub title_font_size: u32,

    /// Labels longer than this many characters are truncated
    pub max_label_chars: usize,
}

impl GridGeometry {
    /// Top-left corner of cell `index`
    pub fn position(&self, index: usize) -> (u32, u32, u32, u32) {
        let cols = self.cols.max(1) as usize;
        let row = (index / cols) as u32;
        let col = (index % cols) as u32;

        let x = self.margin + col * self.cell_size;
        let y = self.margin + self.header_height + row * self.row_pitch;
        (col, row, x, y)
    }
}

// ============================================================================
// PLACEMENT
// ============================================================================

/// One item on the grid, handed to the renderer
#[derive(Debug, Clone)]
pub struct PlacementRecord {
    pub match_result: MatchResult,
    pub index: usize,
    pub col: u32,
    pub row: u32,
    pub pixel_x: u32,
    pub pixel_y: u32,
    pub cell_size: u32,
    pub display_label: String,
    pub color_key: ColorKey,
}

/// A fully planned grid
#[derive(Debug, Clone)]
pub struct LayoutPlan {
    pub title: String,
    pub geometry: GridGeometry,
    pub placements: Vec<PlacementRecord>,
}

impl LayoutPlan {
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

// ============================================================================
// LAYOUT PLANNER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LayoutPlanner {
    config: LayoutConfig,
}

impl LayoutPlanner {
    pub fn new(config: LayoutConfig) -> Self {
        LayoutPlanner { config }
    }

    /// Grid sizing for `n` items
    ///
    /// `n = 0` yields an empty grid (no columns, no rows) sized to the margins.
    pub fn geometry(&self, n: usize) -> GridGeometry {
        let c = &self.config;

        let cols = if n == 0 {
            0
        } else {
            ((n as f64 * c.aspect_bias).sqrt().ceil() as u32).max(1)
        };
        let rows = if cols == 0 {
            0
        } else {
            ((n as u32) + cols - 1) / cols
        };

        let cell_size = (c.target_width / cols.max(1)).min(c.max_cell).max(c.min_cell);
        let vertical_spacing = (cell_size / 2).max(40);
        let text_height = (cell_size / 6).max(16);
        let row_pitch = cell_size + vertical_spacing + text_height;

        let base_font_size = (cell_size / 8).max(12);
        let title_font_size = ((base_font_size as f64 * 1.8) as u32).max(24);

        GridGeometry {
            cols,
            rows,
            cell_size,
            vertical_spacing,
            text_height,
            row_pitch,
            margin: c.margin,
            header_height: c.header_height,
            width: c.margin * 2 + cols * cell_size,
            height: c.margin * 2 + c.header_height + rows * row_pitch,
            base_font_size,
            title_font_size,
            max_label_chars: ((cell_size / base_font_size) * 2) as usize,
        }
    }

    /// Place already-sorted items, index `i` at row `i / cols`, column `i % cols`
    pub fn plan(&self, title: impl Into<String>, sorted: Vec<MatchResult>) -> LayoutPlan {
        let geometry = self.geometry(sorted.len());

        let placements = sorted
            .into_iter()
            .enumerate()
            .map(|(index, match_result)| {
                let (col, row, pixel_x, pixel_y) = geometry.position(index);
                let display_label = truncate_label(match_result.display_name(), geometry.max_label_chars);
                let color_key = ColorKey::for_result(&match_result);

                PlacementRecord {
                    match_result,
                    index,
                    col,
                    row,
                    pixel_x,
                    pixel_y,
                    cell_size: geometry.cell_size,
                    display_label,
                    color_key,
                }
            })
            .collect();

        LayoutPlan {
            title: title.into(),
            geometry,
            placements,
        }
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Cut `label` to `max_chars` characters, the last three becoming "..."
pub fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_string();
    }

    let kept: String = label.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Sheet title for one category
pub fn category_title(category: Category, count: usize) -> String {
    format!("{} ({} ITEMS)", category.title(), count)
}

/// Sheet title for the all-categories sheet
pub fn combined_title(count: usize) -> String {
    format!("All Cosmetics ({} Items)", count)
}

// ============================================================================
// TESTS
// ============================================================================
