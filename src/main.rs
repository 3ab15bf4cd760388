use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use locker_checker::{
    load_catalog, read_text_blocks, write_outputs, AccountSummary, CacheDirImageSource, CatalogIndex,
    ExclusiveList, Inventory, LockerConfig, LockerPipeline, MatchResolver, ReportTokenExtractor,
    ThumbnailLoader, TokenExtractor, RESULTS_FOLDER,
};

#[derive(Debug, Parser)]
#[command(name = "locker-checker", version, about = "Resolve, classify and lay out locker cosmetics")]
struct Args {
    /// Debug logging (RUST_LOG still wins when set)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Full run: tokens, account summary, sheets, placements and run report
    Scan {
        /// Report text files (one block per file)
        #[arg(long = "text", required = true, num_args = 1..)]
        text: Vec<PathBuf>,

        /// Catalog payload (JSON)
        #[arg(long)]
        catalog: PathBuf,

        /// Allow-list table; the embedded one is used when omitted
        #[arg(long)]
        exclusives: Option<PathBuf>,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory of cached thumbnails
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Token lists and account summary only
    Info {
        #[arg(long = "text", required = true, num_args = 1..)]
        text: Vec<PathBuf>,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Resolve ad-hoc tokens and print the tier that matched
    Resolve {
        #[arg(long)]
        catalog: PathBuf,

        /// Backend category code, e.g. AthenaCharacter
        #[arg(long)]
        category: String,

        #[arg(long)]
        exclusives: Option<PathBuf>,

        #[arg(required = true)]
        tokens: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();

    match args.command {
        Command::Scan {
            text,
            catalog,
            exclusives,
            config,
            cache_dir,
            out,
        } => run_scan(&text, &catalog, exclusives.as_deref(), config.as_deref(), cache_dir.as_deref(), out),
        Command::Info { text, config, out } => run_info(&text, config.as_deref(), out),
        Command::Resolve {
            catalog,
            category,
            exclusives,
            tokens,
        } => run_resolve(&catalog, &category, exclusives.as_deref(), &tokens),
    }
}

fn load_exclusives(path: Option<&Path>) -> Result<ExclusiveList> {
    match path {
        Some(path) => ExclusiveList::from_file(path),
        None => ExclusiveList::embedded(),
    }
}

/// Extract tokens, write per-category lists and the account summary
fn extract_inventory(text: &[PathBuf], config: &LockerConfig, results_dir: &Path) -> Result<Inventory> {
    println!("\n📂 Reading report text...");
    let blocks = read_text_blocks(text)?;
    let extractor = ReportTokenExtractor::new()?;
    let inventory = extractor.extract_inventory(&blocks, config.inventory.dedupe);
    println!(
        "✓ Extracted {} items ({} duplicates dropped)",
        inventory.total(),
        inventory.duplicates_dropped()
    );

    for (category, count) in inventory.category_counts() {
        if count > 0 {
            println!("   {}: {} items", category, count);
        }
    }

    inventory.write_token_files(results_dir)?;

    let counts = inventory.category_counts();
    let summary = AccountSummary::from_blocks(&blocks, Some(&counts))?;
    match summary.write_to(results_dir)? {
        Some(path) => println!("✓ Account summary saved to {:?}", path),
        None => println!("⚠️  No account details found"),
    }

    Ok(inventory)
}

fn run_scan(
    text: &[PathBuf],
    catalog: &Path,
    exclusives: Option<&Path>,
    config: Option<&Path>,
    cache_dir: Option<&Path>,
    out: Option<PathBuf>,
) -> Result<()> {
    println!("🎒 Locker Checker - Scan");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    let start = Instant::now();

    let config = LockerConfig::load_or_default(config)?;
    let results_dir = out.unwrap_or_else(|| PathBuf::from(RESULTS_FOLDER));

    // 1. Tokens
    let inventory = extract_inventory(text, &config, &results_dir)?;

    // 2. Catalog + allow-list
    println!("\n📚 Loading catalog...");
    let records = load_catalog(catalog)?;
    let index = CatalogIndex::build(records);
    let exclusives = load_exclusives(exclusives)?;
    println!(
        "✓ {} catalog records, {} allow-listed ids",
        index.len(),
        exclusives.id_count()
    );

    // 3. Resolve, classify, lay out
    println!("\n🔍 Resolving items...");
    let loader = cache_dir.map(|dir| {
        ThumbnailLoader::new(
            Arc::new(CacheDirImageSource::new(dir)),
            config.thumbnails.max_concurrent,
        )
    });
    let pipeline = LockerPipeline::new(&index, &exclusives, &config);
    let output = pipeline.run(&inventory, loader.as_ref())?;

    for sheet in &output.sheets {
        println!(
            "✓ {}: [{}] items found, [{}] not found",
            sheet.title, sheet.found, sheet.not_found
        );
    }

    // 4. Outputs
    println!("\n💾 Writing results...");
    let written = write_outputs(&output, &results_dir)?;
    println!("✓ {} files written to {:?}", written.len(), results_dir);

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📊 Summary");
    for stats in &output.report.categories {
        println!(
            "  {}: [{}] found, [{}] not found, [{:.2}s]",
            stats.category,
            stats.found,
            stats.not_found,
            stats.elapsed_ms as f64 / 1000.0
        );
    }
    println!(
        "✅ {} items, {} exclusive, done in {:.2}s",
        output.report.total_tokens,
        output.report.exclusive,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

fn run_info(text: &[PathBuf], config: Option<&Path>, out: Option<PathBuf>) -> Result<()> {
    println!("🎒 Locker Checker - Account Info");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = LockerConfig::load_or_default(config)?;
    let results_dir = out.unwrap_or_else(|| PathBuf::from(RESULTS_FOLDER));

    let inventory = extract_inventory(text, &config, &results_dir)?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ {} items written to {:?}", inventory.total(), results_dir);
    Ok(())
}

fn run_resolve(catalog: &Path, category: &str, exclusives: Option<&Path>, tokens: &[String]) -> Result<()> {
    let records = load_catalog(catalog)?;
    let index = CatalogIndex::build(records);
    let exclusives = load_exclusives(exclusives)?;
    let resolver = MatchResolver::new(&index, &exclusives);

    for token in tokens {
        let resolution = resolver
            .resolve_detailed(token, category)
            .with_context(|| format!("Cannot resolve {:?}", token))?;

        match resolution {
            Some(hit) => {
                let name = hit.record.display_name.as_deref().unwrap_or("-");
                let score = hit.score.map(|s| format!(" (score {:.3})", s)).unwrap_or_default();
                println!(
                    "✓ {} → {} \"{}\" [{}] via {}{}",
                    token,
                    hit.record.id,
                    name,
                    hit.record.rarity_or_default(),
                    hit.tier.as_str(),
                    score
                );
            }
            None => println!("❌ {} → not found", token),
        }
    }

    Ok(())
}
