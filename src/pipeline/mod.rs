pub mod aggregate;
pub mod classify;
pub mod dedup;
pub mod discovery;
pub mod library;
pub mod normalize;
pub mod quality;

use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use tracing::{error, info, instrument, warn};

use crate::config::{EmptyReportPolicy, PipelineContext};
use crate::domain::{Period, RawDocument};
use crate::error::{ConsolidatorError, Result};
use crate::pipeline::classify::determine_source_type;
use crate::pipeline::discovery::Candidate;
use crate::pipeline::normalize::RecordNormalizer;
use crate::pipeline::quality::{QualityStrategy, StandardAssessor};
use chrono::Datelike;

/// Result of a complete pipeline run, always reported even under partial
/// failure.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub documents_discovered: usize,
    pub scopes_processed: usize,
    pub scopes_failed: usize,
    pub scopes_skipped_empty: usize,
    pub auction_records: usize,
    pub news_records: usize,
    pub duplicates_dropped: usize,
    pub reports_written: usize,
    pub library_entries: usize,
    pub errors: Vec<String>,
}

struct ScopeOutcome {
    auction_records: usize,
    news_records: usize,
    duplicates_dropped: usize,
    report_written: bool,
}

pub struct Pipeline;

impl Pipeline {
    /// Run the full consolidation pass: discover, consolidate every
    /// (location, period) scope, then rebuild the library catalog.
    ///
    /// Per-scope failures are absorbed and counted; only pipeline-wide
    /// conditions (an unusable output root) propagate as a run failure.
    pub fn run(ctx: &PipelineContext) -> Result<RunSummary> {
        Self::execute(ctx, true)
    }

    /// Consolidate without touching the library catalog.
    pub fn consolidate(ctx: &PipelineContext) -> Result<RunSummary> {
        Self::execute(ctx, false)
    }

    #[instrument(skip(ctx))]
    fn execute(ctx: &PipelineContext, rebuild_index: bool) -> Result<RunSummary> {
        let t_run = std::time::Instant::now();
        counter!("teatrade_pipeline_runs_total").increment(1);
        info!("Starting consolidation run");

        // An unusable output root is the one fatal condition.
        fs::create_dir_all(&ctx.config.output_root).map_err(|e| {
            ConsolidatorError::OutputDir {
                path: ctx.config.output_root.display().to_string(),
                source: e,
            }
        })?;

        let now = ctx.clock.now();
        let candidates = discovery::discover(&ctx.config.staging_root, now.year());
        counter!("teatrade_documents_discovered_total").increment(candidates.len() as u64);

        // Group per scope; BTreeMap keeps scope iteration deterministic.
        let mut scopes: BTreeMap<(String, Period), Vec<Candidate>> = BTreeMap::new();
        for candidate in &candidates {
            scopes
                .entry((candidate.location.clone(), candidate.period))
                .or_default()
                .push(candidate.clone());
        }

        let mut summary = RunSummary {
            documents_discovered: candidates.len(),
            scopes_processed: 0,
            scopes_failed: 0,
            scopes_skipped_empty: 0,
            auction_records: 0,
            news_records: 0,
            duplicates_dropped: 0,
            reports_written: 0,
            library_entries: 0,
            errors: Vec::new(),
        };

        for ((location, period), scope_candidates) in &scopes {
            match Self::consolidate_scope(ctx, location, *period, scope_candidates) {
                Ok(outcome) => {
                    summary.scopes_processed += 1;
                    summary.auction_records += outcome.auction_records;
                    summary.news_records += outcome.news_records;
                    summary.duplicates_dropped += outcome.duplicates_dropped;
                    if outcome.report_written {
                        summary.reports_written += 1;
                    } else {
                        summary.scopes_skipped_empty += 1;
                    }
                }
                Err(e) => {
                    // A failed scope leaves every other scope's output alone.
                    error!("Scope {}/{} failed: {}", location, period, e);
                    summary.scopes_failed += 1;
                    summary.errors.push(format!("{location}/{period}: {e}"));
                }
            }
        }

        counter!("teatrade_records_consolidated_total")
            .increment((summary.auction_records + summary.news_records) as u64);
        counter!("teatrade_duplicates_dropped_total")
            .increment(summary.duplicates_dropped as u64);

        if rebuild_index {
            let entries = library::write_library(&ctx.config.output_root)?;
            summary.library_entries = entries.len();
        }

        histogram!("teatrade_pipeline_duration_seconds").record(t_run.elapsed().as_secs_f64());
        info!(
            "Run complete: {} scope(s) processed, {} failed, {} report(s) written",
            summary.scopes_processed, summary.scopes_failed, summary.reports_written
        );
        Ok(summary)
    }

    /// Consolidate one (location, period) scope end to end.
    #[instrument(skip(ctx, candidates), fields(location = %location, period = %period))]
    fn consolidate_scope(
        ctx: &PipelineContext,
        location: &str,
        period: Period,
        candidates: &[Candidate],
    ) -> Result<ScopeOutcome> {
        let now = ctx.clock.now();
        let mut validation_errors = Vec::new();

        // Read documents; unreadable ones are absorbed into validation_errors.
        let mut documents = Vec::new();
        for candidate in candidates {
            let payload = match fs::read_to_string(&candidate.path)
                .map_err(ConsolidatorError::from)
                .and_then(|content| {
                    serde_json::from_str::<serde_json::Value>(&content)
                        .map_err(ConsolidatorError::from)
                }) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Unreadable document {}: {}", candidate.path.display(), e);
                    validation_errors.push(format!(
                        "Unreadable document {}: {e}",
                        candidate.path.display()
                    ));
                    continue;
                }
            };

            let filename = candidate
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            documents.push(RawDocument {
                source_type: determine_source_type(&filename),
                location: location.to_string(),
                period,
                payload,
                origin_path: candidate.path.clone(),
                discovered_at: now,
            });
        }
        let total_sources = documents.len();

        // Classify and normalize in discovery order.
        let normalizer = RecordNormalizer::new(now);
        let mut auction = Vec::new();
        let mut news = Vec::new();
        let mut dates_defaulted = 0;
        for document in &documents {
            let classified = classify::classify_document(document);
            let batch = normalizer.normalize_all(&classified);
            dates_defaulted += batch.dates_defaulted;
            if batch.rejected > 0 {
                validation_errors.push(format!(
                    "{}: {} record(s) lacked an identity field",
                    document.origin_path.display(),
                    batch.rejected
                ));
            }
            auction.extend(batch.auction);
            news.extend(batch.news);
        }
        if dates_defaulted > 0 {
            validation_errors.push(format!(
                "{dates_defaulted} record date(s) defaulted to ingestion time"
            ));
        }

        let (auction, auction_dropped) = dedup::dedup_auction(auction);
        let (news, news_dropped) = dedup::dedup_news(news);
        let duplicates_dropped = auction_dropped + news_dropped;

        let strategy: Box<dyn QualityStrategy> =
            match quality::strategy_by_id(&ctx.config.quality_strategy) {
                Some(strategy) => strategy,
                None => {
                    warn!(
                        "Unknown quality strategy '{}'; using standard_v1",
                        ctx.config.quality_strategy
                    );
                    Box::new(StandardAssessor)
                }
            };
        let metrics = strategy.assess(&auction, &news, validation_errors, now);

        let empty_scope = auction.is_empty() && news.is_empty();
        if empty_scope && ctx.config.empty_report_policy == EmptyReportPolicy::Skip {
            info!("Scope {}/{} is empty; skipping per policy", location, period);
            return Ok(ScopeOutcome {
                auction_records: 0,
                news_records: 0,
                duplicates_dropped,
                report_written: false,
            });
        }

        let report = aggregate::build_report(
            location,
            period,
            &auction,
            &news,
            metrics,
            total_sources,
            duplicates_dropped,
            now,
        );
        library::persist_report(&ctx.config.output_root, &report)?;

        Ok(ScopeOutcome {
            auction_records: auction.len(),
            news_records: news.len(),
            duplicates_dropped,
            report_written: true,
        })
    }

    /// Rebuild only the library catalog from whatever reports are on disk.
    pub fn rebuild_index(ctx: &PipelineContext) -> Result<usize> {
        let entries = library::write_library(&ctx.config.output_root)?;
        Ok(entries.len())
    }
}
