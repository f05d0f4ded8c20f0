//! CLI commands implementation.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use crate::config::{self, Config};
use crate::repository::Hotel;
use crate::services::{self, AppContext};

#[derive(Parser)]
#[command(name = "hotelintel")]
#[command(about = "Hotel website ingestion and market-data distillation")]
#[command(version)]
pub struct Cli {
    /// Data directory (default: ./data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

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
    /// Initialize the data directory and database
    Init,

    /// Register a hotel in the directory
    AddHotel {
        /// Opaque hotel identifier
        id: String,
        /// Human-facing hotel name
        name: String,
        /// Seed URL of the hotel's public website
        url: String,
    },

    /// Crawl one hotel's website into the page store
    Scrape {
        /// Hotel identifier (looked up in the directory unless --url is given)
        hotel_id: String,
        /// Seed URL override
        #[arg(long)]
        url: Option<String>,
        /// Hotel name override
        #[arg(long)]
        name: Option<String>,
    },

    /// Distill changed pages into the hotel's market-data record
    Aggregate {
        /// Hotel identifier
        hotel_id: String,
    },

    /// Process every active hotel: scrape, then aggregate
    Run,

    /// Show per-hotel page and record status
    Status,
}

/// Parse arguments and dispatch.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = cli.data_dir.unwrap_or_else(|| PathBuf::from("data"));
    let config = Config::from_env(&data_dir);
    let ctx = AppContext::initialize(config)?;

    match cli.command {
        Commands::Init => {
            println!(
                "{} initialized database at {}",
                style("✓").green(),
                ctx.config.database_path().display()
            );
            Ok(())
        }
        Commands::AddHotel { id, name, url } => {
            services::require_hotel_url(&url)?;
            ctx.hotels.add(&id, &name, &url)?;
            println!("{} registered hotel {} ({})", style("✓").green(), id, name);
            Ok(())
        }
        Commands::Scrape { hotel_id, url, name } => {
            let hotel = resolve_hotel(&ctx, &hotel_id, url, name)?;
            scrape_one(&ctx, &hotel).await
        }
        Commands::Aggregate { hotel_id } => {
            let known = ctx.hotels.get(&hotel_id)?;
            let hotel = Hotel {
                id: hotel_id.clone(),
                name: known.map(|h| h.name).unwrap_or_else(|| hotel_id.clone()),
                url: String::new(),
                active: true,
            };
            aggregate_one(&ctx, &hotel).await
        }
        Commands::Run => run_driver_loop(&ctx).await,
        Commands::Status => show_status(&ctx),
    }
}

/// Resolve a hotel from the directory, honoring CLI overrides.
fn resolve_hotel(
    ctx: &AppContext,
    hotel_id: &str,
    url: Option<String>,
    name: Option<String>,
) -> Result<Hotel> {
    let known = ctx.hotels.get(hotel_id)?;
    let url = url
        .or_else(|| known.as_ref().map(|h| h.url.clone()))
        .ok_or_else(|| anyhow::anyhow!("hotel {hotel_id} is not registered; pass --url"))?;
    let name = name
        .or_else(|| known.as_ref().map(|h| h.name.clone()))
        .unwrap_or_else(|| hotel_id.to_string());
    Ok(Hotel {
        id: hotel_id.to_string(),
        name,
        url,
        active: true,
    })
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("static template"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(message);
    pb
}

async fn scrape_one(ctx: &AppContext, hotel: &Hotel) -> Result<()> {
    let pb = spinner(format!("Crawling {} ({})", hotel.name, hotel.url));
    let result = services::scrape(ctx, &hotel.url, &hotel.id, &hotel.name).await;
    pb.finish_and_clear();

    let report = result?;
    println!(
        "{} {}: {} pages ({} changed, {} errors, {} retired)",
        style("✓").green(),
        hotel.name,
        report.saved,
        report.changed,
        report.errors,
        report.deactivated
    );
    Ok(())
}

async fn aggregate_one(ctx: &AppContext, hotel: &Hotel) -> Result<()> {
    let pb = spinner(format!("Aggregating {}", hotel.name));
    let result = services::aggregate(ctx, &hotel.id, &hotel.name).await;
    pb.finish_and_clear();

    let report = result?;
    if report.wrote_record {
        println!(
            "{} {}: {} fields updated from {} changed pages",
            style("✓").green(),
            hotel.name,
            report.updated_fields,
            report.dirty_pages
        );
    } else {
        println!("{} {}: no changes", style("·").dim(), hotel.name);
    }
    Ok(())
}

/// The driver loop: process every active hotel, scrape then aggregate.
///
/// An interrupt stops the loop between hotels; in-flight work completes.
/// Any single hotel's failure is logged and the loop continues.
async fn run_driver_loop(ctx: &AppContext) -> Result<()> {
    let hotels = ctx.hotels.list_active()?;
    if hotels.is_empty() {
        println!("{} no active hotels; use add-hotel first", style("!").yellow());
        return Ok(());
    }

    let phase = config::unit_test_module();
    if let Some(ref phase) = phase {
        info!(phase = %phase, "single-phase execution selected");
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; finishing in-flight work");
                shutdown.store(true, Ordering::SeqCst);
            }
        });
    }

    for hotel in hotels {
        if shutdown.load(Ordering::SeqCst) {
            info!("shutdown requested, stopping before next hotel");
            break;
        }

        let run_scrape = phase.as_deref().map_or(true, |p| p == "scrape");
        let run_aggregate = phase.as_deref().map_or(true, |p| p == "aggregate");

        if run_scrape {
            if let Err(e) = scrape_one(ctx, &hotel).await {
                error!(hotel_id = %hotel.id, error = %e, "scrape failed, skipping hotel");
                eprintln!("{} {}: {}", style("✗").red(), hotel.name, e);
                continue;
            }
        }
        if shutdown.load(Ordering::SeqCst) {
            info!("shutdown requested, skipping aggregation");
            break;
        }
        if run_aggregate {
            if let Err(e) = aggregate_one(ctx, &hotel).await {
                error!(hotel_id = %hotel.id, error = %e, "aggregation failed");
                eprintln!("{} {}: {}", style("✗").red(), hotel.name, e);
            }
        }
    }
    Ok(())
}

fn show_status(ctx: &AppContext) -> Result<()> {
    let hotels = ctx.hotels.list_active()?;
    println!("{}", style("Hotels").bold());
    for hotel in hotels {
        let (active, total) = ctx.pages.page_counts(&hotel.id)?;
        let record = ctx.market.get(&hotel.id)?;
        let fields = record.map(|r| r.fields.len()).unwrap_or(0);
        println!(
            "  {} ({}): {} active / {} known pages, {} record fields",
            style(&hotel.name).cyan(),
            hotel.id,
            active,
            total,
            fields
        );
    }
    Ok(())
}
