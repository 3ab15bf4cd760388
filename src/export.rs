// 📤 Export - Placements as CSV, run report as JSON
// The renderer (or a spreadsheet) reads these; nothing here draws pixels

use crate::classifier::ExclusiveReason;
use crate::pipeline::{LockerSheet, PipelineOutput, RunReport};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Report file written at the top of the results directory
pub const RUN_REPORT_FILE: &str = "run_report.json";

// ============================================================================
// PLACEMENT ROW
// ============================================================================

/// One CSV row per sheet cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRow {
    pub index: usize,
    pub row: u32,
    pub col: u32,
    pub pixel_x: u32,
    pub pixel_y: u32,
    pub cell_size: u32,
    pub category: String,
    pub token: String,
    pub record_id: Option<String>,
    pub label: String,
    pub rarity: String,
    pub rarity_rank: u8,
    pub color_key: String,

    /// "#rrggbb"
    pub color: String,

    pub exclusive: bool,
    pub exclusive_reason: Option<String>,
    pub tier: Option<String>,
    pub acquired: Option<String>,
    pub found: bool,
    pub thumbnail: Option<String>,
}

impl PlacementRow {
    pub fn from_sheet(sheet: &LockerSheet) -> Vec<PlacementRow> {
        sheet
            .cells
            .iter()
            .map(|cell| {
                let p = &cell.placement;
                let m = &p.match_result;
                let (r, g, b) = p.color_key.rgb();

                PlacementRow {
                    index: p.index,
                    row: p.row,
                    col: p.col,
                    pixel_x: p.pixel_x,
                    pixel_y: p.pixel_y,
                    cell_size: p.cell_size,
                    category: m.category.code().to_string(),
                    token: m.token.raw.clone(),
                    record_id: m.record.as_ref().map(|r| r.id.clone()),
                    label: p.display_label.clone(),
                    rarity: m.rarity().to_string(),
                    rarity_rank: m.rarity_rank,
                    color_key: p.color_key.as_str().to_string(),
                    color: format!("#{:02x}{:02x}{:02x}", r, g, b),
                    exclusive: m.is_exclusive,
                    exclusive_reason: m.exclusive_reason.as_ref().map(describe_reason),
                    tier: m.tier.map(|t| t.as_str().to_string()),
                    acquired: m.token.acquired.map(|d| d.to_string()),
                    found: cell.found,
                    thumbnail: cell.thumbnail.as_ref().map(|t| t.path.display().to_string()),
                }
            })
            .collect()
    }
}

fn describe_reason(reason: &ExclusiveReason) -> String {
    match reason {
        ExclusiveReason::SeasonalWindow { family } => format!("seasonal window ({})", family),
        ExclusiveReason::ShopAbsence { last_seen } => format!("not in shop since {}", last_seen),
        ExclusiveReason::AllowList => "allow-list".to_string(),
    }
}

// ============================================================================
// WRITERS
// ============================================================================

/// Write one sheet's placements; returns the row count
pub fn write_placements_csv<P: AsRef<Path>>(sheet: &LockerSheet, path: P) -> Result<usize> {
    let path = path.as_ref();
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create CSV file: {:?}", path))?;

    let rows = PlacementRow::from_sheet(sheet);
    for row in &rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write placement row to {:?}", path))?;
    }
    writer.flush().with_context(|| format!("Failed to flush {:?}", path))?;

    Ok(rows.len())
}

pub fn write_run_report<P: AsRef<Path>>(report: &RunReport, path: P) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))
}

/// Write every sheet's CSV and the run report under `results_dir`
///
/// Category sheets go to `<Subfolder>/<Code>.csv`, the combined sheet to
/// `AllCosmetics.csv` (skipped when empty).
pub fn write_outputs<P: AsRef<Path>>(output: &PipelineOutput, results_dir: P) -> Result<Vec<PathBuf>> {
    let results_dir = results_dir.as_ref();
    let mut written = Vec::new();

    for sheet in &output.sheets {
        let Some(category) = sheet.category else {
            continue;
        };

        let dir = results_dir.join(category.subfolder());
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create directory: {:?}", dir))?;

        let path = dir.join(format!("{}.csv", sheet.file_stem()));
        write_placements_csv(sheet, &path)?;
        written.push(path);
    }

    fs::create_dir_all(results_dir)
        .with_context(|| format!("Failed to create directory: {:?}", results_dir))?;

    if !output.combined.is_empty() {
        let path = results_dir.join(format!("{}.csv", output.combined.file_stem()));
        write_placements_csv(&output.combined, &path)?;
        written.push(path);
    }

    let report_path = results_dir.join(RUN_REPORT_FILE);
    write_run_report(&output.report, &report_path)?;
    written.push(report_path);

    log::info!("Wrote {} output files to {:?}", written.len(), results_dir);
    Ok(written)
}

// ============================================================================
// TESTS
// ============================================================================
