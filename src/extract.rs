// 📝 Report Extraction - Text blocks → (category, token) pairs and account details
// Pattern-based: one "AthenaXxx: <id> [date]" entry per line

use crate::catalog::Category;
use crate::inventory::{Inventory, OwnedItemToken};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Emotes not carrying this prefix are skipped (sprays, toys, emoji share the code)
pub const EMOTE_PREFIX: &str = "eid-";

/// Summary file written next to the category folders
pub const SUMMARY_FILE: &str = "extracted_info.txt";

// ============================================================================
// TOKEN EXTRACTION
// ============================================================================

/// One entry pulled out of a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedToken {
    pub category: Category,
    pub token: OwnedItemToken,
}

/// Turns a block of report text into category/token pairs
pub trait TokenExtractor {
    fn extract(&self, text: &str) -> Vec<ExtractedToken>;

    /// Run every block through the extractor into one inventory
    fn extract_inventory<S: AsRef<str>>(&self, blocks: &[S], dedupe: bool) -> Inventory
    where
        Self: Sized,
    {
        let mut inventory = Inventory::new(dedupe);

        for block in blocks {
            for entry in self.extract(block.as_ref()) {
                inventory.push(entry.category, entry.token);
            }
        }

        log::debug!(
            "Extracted {} tokens ({} duplicates dropped)",
            inventory.total(),
            inventory.duplicates_dropped()
        );
        inventory
    }
}

/// Default extractor for the plain-text account report
pub struct ReportTokenExtractor {
    entry: Regex,
    date: Regex,
    date_strip: Regex,
}

impl ReportTokenExtractor {
    pub fn new() -> Result<Self> {
        Ok(ReportTokenExtractor {
            entry: Regex::new(r"(?i)(\bAthena\w+):\s*(.+)").context("Invalid entry pattern")?,
            date: Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b|\[(\d{4}-\d{2}-\d{2})\]|\((\d{4}-\d{2}-\d{2})\)")
                .context("Invalid date pattern")?,
            date_strip: Regex::new(r"\s*\[?\(?\d{4}-\d{2}-\d{2}\)?\]?\s*")
                .context("Invalid date strip pattern")?,
        })
    }

    /// First parseable date in `details`
    fn find_date(&self, details: &str) -> Option<NaiveDate> {
        let caps = self.date.captures(details)?;
        let text = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
        NaiveDate::parse_from_str(text.as_str(), "%Y-%m-%d").ok()
    }

    /// Clean one entry's details into a token
    ///
    /// The date goes first so a date ending in "1" is not mistaken for the
    /// trailing filler character.
    fn clean(&self, details: &str, date: Option<NaiveDate>) -> String {
        let without_date = match date {
            Some(_) => self.date_strip.replace_all(details, "").trim().to_string(),
            None => details.trim().to_string(),
        };

        let without_filler = without_date.strip_suffix('1').unwrap_or(&without_date);
        without_filler.trim().replace('_', "-")
    }
}

impl TokenExtractor for ReportTokenExtractor {
    fn extract(&self, text: &str) -> Vec<ExtractedToken> {
        let mut out = Vec::new();

        for caps in self.entry.captures_iter(text) {
            let (Some(code), Some(details)) = (caps.get(1), caps.get(2)) else {
                continue;
            };

            let Some(category) = Category::from_code(code.as_str()) else {
                log::debug!("Skipping unrecognized category {}", code.as_str());
                continue;
            };

            let details = details.as_str().trim();
            let date = self.find_date(details);
            let raw = self.clean(details, date);

            if raw.is_empty() {
                continue;
            }
            if category == Category::Dance && !raw.to_lowercase().starts_with(EMOTE_PREFIX) {
                continue;
            }

            // Acquisition dates only matter for characters
            let token = match (category, date) {
                (Category::Character, Some(date)) => OwnedItemToken::new(raw).with_date(date),
                _ => OwnedItemToken::new(raw),
            };
            out.push(ExtractedToken { category, token });
        }

        out
    }
}

// ============================================================================
// ACCOUNT SUMMARY
// ============================================================================

/// Keywords listed under "Account Details"
pub const ACCOUNT_KEYWORDS: [&str; 5] = [
    "Account Id",
    "Display Name",
    "Created",
    "Last Failed Login",
    "Country",
];

/// Keywords listed under "More Account Details"
pub const MORE_ACCOUNT_KEYWORDS: [&str; 3] = [
    "Communication Language",
    "Headless: false",
    "Number Of Display Name Changed",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSummary {
    pub account_details: Vec<String>,
    pub more_details: Vec<String>,
    pub cosmetic_counts: Vec<String>,
}

impl AccountSummary {
    /// Collect keyword lines from every block, plus count lines when counts are given
    pub fn from_blocks<S: AsRef<str>>(
        blocks: &[S],
        counts: Option<&BTreeMap<Category, usize>>,
    ) -> Result<Self> {
        let mut summary = AccountSummary::default();

        for (keywords, lines) in [
            (&ACCOUNT_KEYWORDS[..], &mut summary.account_details),
            (&MORE_ACCOUNT_KEYWORDS[..], &mut summary.more_details),
        ] {
            for keyword in keywords {
                let pattern = format!(r"(?i)\b{} *: *([^\n\r]+)", regex::escape(keyword));
                let re = Regex::new(&pattern)
                    .with_context(|| format!("Invalid keyword pattern for {:?}", keyword))?;

                for block in blocks {
                    for caps in re.captures_iter(block.as_ref()) {
                        if let Some(value) = caps.get(1) {
                            lines.push(format!(" | {} : {}", keyword, value.as_str().trim()));
                        }
                    }
                }
            }
            lines.sort();
        }

        if let Some(counts) = counts {
            let total: usize = counts.values().sum();
            summary.cosmetic_counts.push(format!(" | Total Cosmetics : {}", total));

            for category in Category::ALL {
                let count = counts.get(&category).copied().unwrap_or(0);
                summary
                    .cosmetic_counts
                    .push(format!(" | {} : {}", category.count_label(), count));
            }
        }

        Ok(summary)
    }

    pub fn is_empty(&self) -> bool {
        self.account_details.is_empty() && self.more_details.is_empty() && self.cosmetic_counts.is_empty()
    }

    /// Section headers followed by their lines; empty sections are left out
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();

        for (header, lines) in [
            ("----- Account Details -----", &self.account_details),
            ("----- More Account Details -----", &self.more_details),
            ("----- Cosmetic Counts -----", &self.cosmetic_counts),
        ] {
            if !lines.is_empty() {
                out.push(header.to_string());
                out.extend(lines.iter().cloned());
            }
        }

        out
    }

    /// Write the summary file; nothing is written when there is nothing to say
    pub fn write_to<P: AsRef<Path>>(&self, results_dir: P) -> Result<Option<PathBuf>> {
        if self.is_empty() {
            return Ok(None);
        }

        let dir = results_dir.as_ref();
        fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {:?}", dir))?;

        let path = dir.join(SUMMARY_FILE);
        let mut content = self.lines().join("\n");
        content.push('\n');
        fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(Some(path))
    }
}

// ============================================================================
// INPUT
// ============================================================================

/// Read report text files, one block per file
pub fn read_text_blocks<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<String>> {
    paths
        .iter()
        .map(|path| {
            fs::read_to_string(path.as_ref())
                .with_context(|| format!("Failed to read report text: {:?}", path.as_ref()))
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
