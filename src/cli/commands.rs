//! CLI commands implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;

use crate::cli::helpers::{build_context, load_cookie_file, TallySink};
use crate::config::{config_path, FilterConfig, JobScoutConfig};
use crate::manager::ScraperManager;
use crate::models::Platform;
use crate::notify::{ConsoleSink, LogSink};
use crate::scrapers::platforms::driver_for;
use crate::scrapers::{DriverTuning, PlatformDriver};
use crate::store::load_filter_settings;

#[derive(Parser)]
#[command(name = "jobscout")]
#[command(about = "Remote software job discovery and scraping daemon")]
#[command(version)]
pub struct Cli {
    /// Config file path (default: ~/.config/jobscout/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Run scrape cycles over all enabled platforms until interrupted
    Run,

    /// Scrape a single platform once
    Scrape {
        /// Platform name (linkedin, indeed, glassdoor, ziprecruiter, dice)
        platform: Platform,
        /// Override the configured page budget
        #[arg(long)]
        max_pages: Option<u32>,
    },

    /// List known platforms with enabled state and cookie sets
    Platforms,

    /// Show effective filter settings
    Settings {
        /// Write KEY=VALUE into the config file (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// Manage stored cookie sets
    Cookies {
        #[command(subcommand)]
        command: CookieCommands,
    },

    /// Today's posting counts per platform
    Status,
}

#[derive(Subcommand)]
enum CookieCommands {
    /// List cookie sets, optionally for one platform
    List { platform: Option<Platform> },

    /// Import a cookie-set JSON file and register it in the config
    Import {
        platform: Platform,
        /// JSON file: an array of cookies or a browser-extension export
        file: PathBuf,
        /// Label shown in listings (default: the file name)
        #[arg(long)]
        label: Option<String>,
    },
}

/// Run the CLI.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_override = cli.config.clone();
    let config = match &config_override {
        Some(path) => JobScoutConfig::load_from(path)?,
        None => JobScoutConfig::load()?,
    };

    match cli.command {
        Commands::Run => cmd_run(config).await,
        Commands::Scrape {
            platform,
            max_pages,
        } => cmd_scrape_once(config, platform, max_pages).await,
        Commands::Platforms => cmd_platforms(config).await,
        Commands::Settings { set } => {
            cmd_settings(config_override.as_deref(), config, &set).await
        }
        Commands::Cookies { command } => match command {
            CookieCommands::List { platform } => cmd_cookies_list(config, platform).await,
            CookieCommands::Import {
                platform,
                file,
                label,
            } => cmd_cookies_import(config_override.as_deref(), config, platform, &file, label).await,
        },
        Commands::Status => cmd_status(config).await,
    }
}

fn build_drivers(config: &JobScoutConfig) -> Vec<Box<dyn PlatformDriver>> {
    config
        .enabled_platforms()
        .into_iter()
        .map(|platform| {
            let section = config.platform(platform);
            driver_for(
                platform,
                DriverTuning {
                    query: section.query,
                    max_pages: section.max_pages,
                },
            )
        })
        .collect()
}

async fn cmd_run(config: JobScoutConfig) -> Result<()> {
    let ctx = build_context(&config, Arc::new(ConsoleSink)).await?;
    let drivers = build_drivers(&config);
    if drivers.is_empty() {
        println!(
            "{} All platforms are disabled in the config.",
            style("✗").red()
        );
        return Ok(());
    }

    println!(
        "{} Scraping {} platform{} every cycle. Press Ctrl-C to stop.",
        style("→").cyan(),
        drivers.len(),
        if drivers.len() == 1 { "" } else { "s" }
    );

    let manager = ScraperManager::new(drivers, ctx.clone(), config.schedule.clone());

    let stop = manager.stop_flag();
    let classifier = ctx.classifier.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!(
                "\n{} Stopping after the current operation...",
                style("→").yellow()
            );
            stop.trigger();
            classifier.release().await;
        }
    });

    manager.run().await;
    Ok(())
}

async fn cmd_scrape_once(
    config: JobScoutConfig,
    platform: Platform,
    max_pages: Option<u32>,
) -> Result<()> {
    let tally = Arc::new(TallySink::new());
    let ctx = build_context(&config, tally.clone()).await?;

    let section = config.platform(platform);
    let driver = driver_for(
        platform,
        DriverTuning {
            query: section.query,
            max_pages: max_pages.unwrap_or(section.max_pages),
        },
    );

    println!(
        "{} Scraping {}...",
        style("→").cyan(),
        platform.display_name()
    );
    let new_jobs = driver.scrape(&ctx).await?;

    println!(
        "\n{} {} new job{} on {}",
        style("✓").green(),
        new_jobs,
        if new_jobs == 1 { "" } else { "s" },
        platform.display_name()
    );
    let skips = tally.skip_summary();
    if !skips.is_empty() {
        println!("  Skipped:");
        for (reason, count) in skips {
            println!("    {count:>4}  {reason}");
        }
    }
    Ok(())
}

async fn cmd_platforms(config: JobScoutConfig) -> Result<()> {
    let ctx = build_context(&config, Arc::new(LogSink)).await?;

    println!("{:<14} {:<9} {:>11}", "PLATFORM", "ENABLED", "COOKIE SETS");
    for platform in Platform::ALL {
        let enabled = config.platform(platform).enabled;
        let sets = ctx.store.get_cookie_sets(platform).await?.len();
        println!(
            "{:<14} {:<9} {:>11}",
            platform.display_name(),
            if enabled { "yes" } else { "no" },
            sets
        );
    }
    Ok(())
}

async fn cmd_settings(
    config_override: Option<&Path>,
    mut config: JobScoutConfig,
    assignments: &[String],
) -> Result<()> {
    if !assignments.is_empty() {
        for pair in assignments {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("Expected KEY=VALUE, got \"{pair}\""))?;
            apply_filter_setting(&mut config.filters, key.trim(), value.trim())?;
        }
        let path = config_override
            .map(Path::to_path_buf)
            .unwrap_or_else(config_path);
        config.save_to(&path)?;
        println!("{} Updated {}", style("✓").green(), path.display());
    }

    let store = crate::store::MemoryStore::new();
    crate::cli::helpers::seed_store(&config, &store).await?;
    let filters = load_filter_settings(&store).await?;

    println!("Salary floor:");
    println!("  annual:  {}", format_floor(filters.salary_floor.annual));
    println!("  monthly: {}", format_floor(filters.salary_floor.monthly));
    println!("  hourly:  {}", format_floor(filters.salary_floor.hourly));
    println!("Stale after: {} days", filters.stale_after_days);
    println!("Ignored keywords: {}", format_list(&filters.ignore_keywords));
    println!("Ignored domains: {}", format_list(&filters.ignore_domains));
    println!(
        "Enabled platforms: {}",
        filters
            .enabled_platforms
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}

fn apply_filter_setting(filters: &mut FilterConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "min_salary_annual" => filters.min_salary_annual = Some(parse_number(key, value)?),
        "min_salary_monthly" => filters.min_salary_monthly = Some(parse_number(key, value)?),
        "min_salary_hourly" => filters.min_salary_hourly = Some(parse_number(key, value)?),
        "stale_after_days" => {
            filters.stale_after_days = value
                .parse()
                .with_context(|| format!("{key} must be a whole number of days"))?;
        }
        "ignore_keywords" => filters.ignore_keywords = parse_list(value),
        "ignore_domains" => filters.ignore_domains = parse_list(value),
        _ => anyhow::bail!(
            "Unknown setting \"{key}\" (known: min_salary_annual, min_salary_monthly, \
             min_salary_hourly, stale_after_days, ignore_keywords, ignore_domains)"
        ),
    }
    Ok(())
}

fn parse_number(key: &str, value: &str) -> Result<f64> {
    value
        .replace([',', '$'], "")
        .parse()
        .with_context(|| format!("{key} must be numeric"))
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn format_floor(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("${v:.0}"),
        None => "(unset)".to_string(),
    }
}

fn format_list(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

async fn cmd_cookies_list(config: JobScoutConfig, platform: Option<Platform>) -> Result<()> {
    let ctx = build_context(&config, Arc::new(LogSink)).await?;

    let platforms: Vec<Platform> = match platform {
        Some(p) => vec![p],
        None => Platform::ALL.to_vec(),
    };

    let mut any = false;
    for platform in platforms {
        let sets = ctx.store.get_cookie_sets(platform).await?;
        if sets.is_empty() {
            continue;
        }
        any = true;
        println!("{}:", platform.display_name());
        for set in sets {
            let last_used = set
                .last_used
                .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string());
            println!(
                "  [{}] {} ({} cookies, last used {})",
                set.id,
                set.label,
                set.records.len(),
                last_used
            );
        }
    }
    if !any {
        println!(
            "No cookie sets configured. Import one with: jobscout cookies import <platform> <file>"
        );
    }
    Ok(())
}

async fn cmd_cookies_import(
    config_override: Option<&Path>,
    mut config: JobScoutConfig,
    platform: Platform,
    file: &Path,
    label: Option<String>,
) -> Result<()> {
    let records = load_cookie_file(file)?;
    anyhow::ensure!(!records.is_empty(), "Cookie file contains no cookies");

    let label = label.unwrap_or_else(|| {
        file.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "imported".to_string())
    });

    let path = config_override
        .map(Path::to_path_buf)
        .unwrap_or_else(config_path);
    let cookie_dir = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("cookies");
    std::fs::create_dir_all(&cookie_dir)
        .with_context(|| format!("Failed to create {}", cookie_dir.display()))?;

    let slug: String = label
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let dest = cookie_dir.join(format!("{}-{}.json", platform.as_str(), slug.to_lowercase()));
    std::fs::write(&dest, serde_json::to_string_pretty(&records)?)
        .with_context(|| format!("Failed to write {}", dest.display()))?;

    let section = config
        .platforms
        .entry(platform.as_str().to_string())
        .or_default();
    if !section.cookie_files.contains(&dest) {
        section.cookie_files.push(dest.clone());
    }
    config.save_to(&path)?;

    println!(
        "{} Imported {} cookie{} for {} as \"{}\" ({})",
        style("✓").green(),
        records.len(),
        if records.len() == 1 { "" } else { "s" },
        platform.display_name(),
        label,
        dest.display()
    );
    Ok(())
}

async fn cmd_status(config: JobScoutConfig) -> Result<()> {
    let ctx = build_context(&config, Arc::new(LogSink)).await?;
    let today = ctx.store.postings_today().await?;

    let mut per_platform: HashMap<Platform, u32> = HashMap::new();
    for posting in &today {
        *per_platform.entry(posting.platform).or_insert(0) += 1;
    }

    println!("Postings found today:");
    for platform in Platform::ALL {
        println!(
            "  {:<14} {}",
            platform.display_name(),
            per_platform.get(&platform).copied().unwrap_or(0)
        );
    }
    println!("  {:<14} {}", "total", today.len());
    Ok(())
}
