//! StockLab CLI — download, dataset build, and cache management commands.
//!
//! Commands:
//! - `download` — fetch daily bars for a symbol universe and cache as Parquet
//! - `sample` — build a rolling-window dataset from a TOML config
//! - `split` — build the above-mean feature/label dataset from a TOML config
//! - `cache status` — report cached symbols, date ranges and sizes
//! - `universe` — print the built-in symbol universe as TOML

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use stocklab_core::data::{
    download_universe, DataProvider, DateRange, LogProgress, SeriesCache, SymbolUniverse,
    SyntheticProvider, YahooProvider, DEFAULT_WORKERS,
};
use stocklab_core::sampling::TensorLayout;
use stocklab_runner::{
    build_rolling, build_split, load_universe, write_rolling, write_split, DatasetConfig,
    LoadOptions, LoadedUniverse, UniverseSource,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stocklab",
    about = "StockLab CLI — stock universe download and training-set builder"
)]
struct Cli {
    /// Append logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download daily bars and cache them as Parquet.
    Download {
        /// Symbols to download (e.g., 600000.SS 000001.SZ). Defaults to the universe.
        symbols: Vec<String>,

        /// Universe TOML to take symbols from when none are given.
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Only take symbols from this universe group (e.g., Shenzhen).
        #[arg(long)]
        group: Option<String>,

        /// First trading day (YYYY-MM-DD).
        #[arg(long, default_value = "2018-01-03")]
        start: NaiveDate,

        /// Last trading day (YYYY-MM-DD).
        #[arg(long, default_value = "2018-05-26")]
        end: NaiveDate,

        /// Concurrent download workers.
        #[arg(long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,

        /// Generate synthetic bars instead of calling Yahoo Finance.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Build a rolling-window dataset (windows + next-day close).
    Sample {
        /// Path to a TOML dataset config.
        #[arg(long)]
        config: PathBuf,

        /// Offline mode: skip downloading and use the cache.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Use synthetic bars instead of Yahoo Finance.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Output directory for features.csv, labels.csv and manifest.json.
        #[arg(long, default_value = "datasets/rolling")]
        output_dir: PathBuf,
    },
    /// Build the above-mean classification dataset.
    Split {
        /// Path to a TOML dataset config.
        #[arg(long)]
        config: PathBuf,

        /// Feature tensor layout: batch_major or time_major. Overrides the config.
        #[arg(long)]
        layout: Option<TensorLayout>,

        /// Offline mode: skip downloading and use the cache.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Use synthetic bars instead of Yahoo Finance.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Output directory for features.csv, labels.csv and manifest.json.
        #[arg(long, default_value = "datasets/split")]
        output_dir: PathBuf,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Print the built-in universe as TOML.
    Universe {
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached symbols, date ranges and sizes.
    Status {
        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Download {
            symbols,
            universe,
            group,
            start,
            end,
            workers,
            synthetic,
            cache_dir,
        } => run_download(
            symbols,
            universe.as_deref(),
            group.as_deref(),
            DateRange { start, end },
            workers,
            synthetic,
            cache_dir,
        ),
        Commands::Sample {
            config,
            offline,
            synthetic,
            output_dir,
        } => run_sample(&config, offline, synthetic, &output_dir),
        Commands::Split {
            config,
            layout,
            offline,
            synthetic,
            output_dir,
        } => run_split(&config, layout, offline, synthetic, &output_dir),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
        },
        Commands::Universe { output } => run_universe(output.as_deref()),
    }
}

/// `RUST_LOG` filters; the default level is `info`.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
    }
    Ok(())
}

fn make_provider(synthetic: bool) -> Result<Box<dyn DataProvider>> {
    if synthetic {
        tracing::warn!("using synthetic bars; datasets will not reflect real prices");
        return Ok(Box::new(SyntheticProvider::new()));
    }
    Ok(Box::new(YahooProvider::new()?))
}

fn resolve_universe(file: Option<&Path>) -> Result<SymbolUniverse> {
    match file {
        Some(path) => SymbolUniverse::from_file(path)
            .with_context(|| format!("failed to load universe {}", path.display())),
        None => Ok(SymbolUniverse::default_csi300_sample()),
    }
}

fn run_download(
    symbols: Vec<String>,
    universe_file: Option<&Path>,
    group: Option<&str>,
    range: DateRange,
    workers: usize,
    synthetic: bool,
    cache_dir: PathBuf,
) -> Result<()> {
    if range.start > range.end {
        bail!("--start {} is after --end {}", range.start, range.end);
    }

    let universe;
    let sym_refs: Vec<&str> = if symbols.is_empty() {
        universe = resolve_universe(universe_file)?;
        universe.select(group)?
    } else {
        if group.is_some() {
            bail!("--group only applies when no symbols are given");
        }
        symbols.iter().map(|s| s.as_str()).collect()
    };

    let provider = make_provider(synthetic)?;
    let cache = SeriesCache::new(cache_dir);
    let summary = download_universe(
        provider.as_ref(),
        &cache,
        &sym_refs,
        range,
        workers,
        &LogProgress,
    )?;

    println!(
        "Downloaded: {}  Already cached: {}  Failed: {}  (of {})",
        summary.downloaded_count(),
        summary.cached_count(),
        summary.failed_count(),
        summary.total()
    );
    for (sym, err) in summary.failures() {
        eprintln!("Error for {sym}: {err}");
    }
    if summary.all_failed() {
        bail!("every symbol failed to download");
    }

    Ok(())
}

/// Load config, universe and series; shared by `sample` and `split`.
fn load_for_config(
    config_path: &Path,
    offline: bool,
    synthetic: bool,
) -> Result<(DatasetConfig, LoadedUniverse)> {
    let config = DatasetConfig::from_file(config_path)?;
    let universe = resolve_universe(config.data.universe_file.as_deref())?;
    let symbols = universe.all_symbols();

    let provider = make_provider(synthetic)?;
    let cache = SeriesCache::new(&config.data.cache_dir);
    let opts = LoadOptions::new(config.date_range())
        .with_workers(config.data.workers)
        .offline(offline);

    let loaded = load_universe(provider.as_ref(), &cache, &symbols, &opts, &LogProgress)?;
    if loaded.source == UniverseSource::Cache {
        println!(
            "Using cached universe ({} series) from {}",
            loaded.series.len(),
            config.data.cache_dir.display()
        );
    }
    for (sym, err) in &loaded.failed {
        eprintln!("Error for {sym}: {err}");
    }
    Ok((config, loaded))
}

fn run_sample(config_path: &Path, offline: bool, synthetic: bool, output_dir: &Path) -> Result<()> {
    let (config, loaded) = load_for_config(config_path, offline, synthetic)?;

    let dataset = build_rolling(&loaded.series, &config.sampling)?;
    if dataset.is_empty() {
        tracing::warn!(
            expected_series_len = config.sampling.expected_series_len,
            "no series has exactly the expected length; dataset is empty"
        );
    }
    let manifest = write_rolling(&dataset, &loaded.dataset_hash, output_dir)?;

    println!();
    println!("=== Rolling Dataset ===");
    println!("Series loaded:  {} ({})", loaded.series.len(), loaded.source.as_str());
    println!("Samples:        {}", manifest.samples);
    println!("Features:       {:?}", manifest.feature_shape);
    println!("Window length:  {}", dataset.window_length);
    println!("Dataset hash:   {}", manifest.dataset_hash);
    println!("Written to:     {}", output_dir.display());
    Ok(())
}

fn run_split(
    config_path: &Path,
    layout: Option<TensorLayout>,
    offline: bool,
    synthetic: bool,
    output_dir: &Path,
) -> Result<()> {
    let (config, loaded) = load_for_config(config_path, offline, synthetic)?;
    let layout = layout.unwrap_or(config.split.layout);

    let dataset = build_split(&loaded.series, layout)?;
    let manifest = write_split(&dataset, &loaded.dataset_hash, output_dir)?;

    let above = dataset.labels.column(1).sum() as usize;
    println!();
    println!("=== Split Dataset ===");
    println!("Series loaded:  {} ({})", loaded.series.len(), loaded.source.as_str());
    println!("Samples:        {}", manifest.samples);
    println!("Features:       {:?} ({layout})", manifest.feature_shape);
    match dataset.threshold {
        Some(t) => println!("Threshold:      {t:.4} ({above} above mean)"),
        None => println!("Threshold:      (no qualifying series)"),
    }
    println!("Dataset hash:   {}", manifest.dataset_hash);
    println!("Written to:     {}", output_dir.display());
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = SeriesCache::new(cache_dir);
    let symbols = cache.symbols()?;
    if symbols.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let mut total_size: u64 = 0;
    let mut rows: Vec<(String, String, String, String, u64)> = Vec::new();
    for symbol in &symbols {
        let (date_range, bars, source) = match cache.get_meta(symbol) {
            Some(meta) => (
                format!("{} to {}", meta.start_date, meta.end_date),
                format!("{} bars", meta.bar_count),
                meta.source.as_str().to_string(),
            ),
            None => ("(no meta)".into(), "-".into(), "-".into()),
        };
        let size = file_size(&cache_dir.join(format!("{symbol}.parquet")))
            + file_size(&cache_dir.join(format!("{symbol}.meta.json")));
        total_size += size;
        rows.push((symbol.clone(), date_range, bars, source, size));
    }

    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", rows.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!(
        "{:<11} {:<25} {:<10} {:<14} {:>10}",
        "Symbol", "Date Range", "Bars", "Source", "Size"
    );
    println!("{}", "-".repeat(74));
    for (sym, range, bars, source, size) in &rows {
        println!(
            "{:<11} {:<25} {:<10} {:<14} {:>10}",
            sym,
            range,
            bars,
            source,
            format_size(*size)
        );
    }

    Ok(())
}

fn run_universe(output: Option<&Path>) -> Result<()> {
    let universe = SymbolUniverse::default_csi300_sample();
    for name in universe.group_names() {
        let count = universe.group_symbols(name).map_or(0, <[String]>::len);
        eprintln!("{name}: {count} symbols");
    }
    let toml = universe.to_toml()?;
    match output {
        Some(path) => {
            std::fs::write(path, toml)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote universe to {}", path.display());
        }
        None => print!("{toml}"),
    }
    Ok(())
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
