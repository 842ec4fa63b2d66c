use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;

use teatrade_consolidator::config::{EmptyReportPolicy, PipelineConfig, PipelineContext};
use teatrade_consolidator::error::Result;
use teatrade_consolidator::logging;
use teatrade_consolidator::pipeline::{Pipeline, RunSummary};

#[derive(Parser)]
#[command(name = "teatrade_consolidator")]
#[command(about = "Tea market multi-source consolidation and quality pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    /// Optional TOML config file; CLI flags override it
    #[arg(long)]
    config: Option<String>,

    /// Staging root containing <location>/<document> trees
    #[arg(long, default_value = "staging")]
    staging_root: PathBuf,

    /// Output directory for consolidated reports and the library catalog
    #[arg(long, default_value = "Data/Consolidated")]
    output_root: PathBuf,

    /// Skip writing reports for (location, period) scopes with no records
    #[arg(long)]
    skip_empty: bool,

    /// Quality strategy id (standard_v1 or volume_heuristic_v1)
    #[arg(long, default_value = "standard_v1")]
    quality_strategy: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run consolidation and rebuild the library catalog
    Run,
    /// Run consolidation only
    Consolidate,
    /// Rebuild the library catalog from reports already on disk
    Index,
}

fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig {
            staging_root: cli.staging_root.clone(),
            output_root: cli.output_root.clone(),
            empty_report_policy: EmptyReportPolicy::Emit,
            quality_strategy: cli.quality_strategy.clone(),
        },
    };
    if cli.skip_empty {
        config.empty_report_policy = EmptyReportPolicy::Skip;
    }
    Ok(config)
}

fn print_summary(summary: &RunSummary) {
    println!("\n📊 Consolidation Results:");
    println!("   Documents discovered: {}", summary.documents_discovered);
    println!(
        "   Scopes processed: {} ({} failed, {} skipped empty)",
        summary.scopes_processed, summary.scopes_failed, summary.scopes_skipped_empty
    );
    println!("   Auction records: {}", summary.auction_records);
    println!("   News records: {}", summary.news_records);
    println!("   Duplicates dropped: {}", summary.duplicates_dropped);
    println!("   Reports written: {}", summary.reports_written);
    println!("   Library entries: {}", summary.library_entries);

    if !summary.errors.is_empty() {
        println!("\n⚠️  Errors encountered:");
        for error in &summary.errors {
            println!("   - {error}");
        }
    }
}

fn main() -> std::process::ExitCode {
    logging::init_logging();

    let cli = Cli::parse();
    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            eprintln!("Configuration error: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };
    let ctx = PipelineContext::new(config);

    let outcome = match &cli.command {
        Commands::Run | Commands::Consolidate => {
            println!("🔄 Running consolidation pipeline...");
            let result = if matches!(cli.command, Commands::Run) {
                Pipeline::run(&ctx)
            } else {
                Pipeline::consolidate(&ctx)
            };
            match result {
                Ok(summary) => {
                    print_summary(&summary);
                    summary.scopes_failed == 0
                }
                Err(e) => {
                    error!("Pipeline failed: {}", e);
                    eprintln!("Pipeline failed: {e}");
                    false
                }
            }
        }
        Commands::Index => {
            println!("🔄 Rebuilding library catalog...");
            match Pipeline::rebuild_index(&ctx) {
                Ok(count) => {
                    println!("✅ Library rebuilt with {count} entries");
                    true
                }
                Err(e) => {
                    error!("Index rebuild failed: {}", e);
                    eprintln!("Index rebuild failed: {e}");
                    false
                }
            }
        }
    };

    if outcome {
        std::process::ExitCode::SUCCESS
    } else {
        std::process::ExitCode::FAILURE
    }
}
