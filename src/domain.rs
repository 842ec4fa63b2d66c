use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One trading cycle at an auction centre, keyed `S<week>_<year>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub week: u32,
}

impl Period {
    pub fn key(&self) -> String {
        format!("S{}_{}", self.week, self.year)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// An unvalidated document deposited by a collector, read-only to the
/// pipeline. The payload keeps whatever shape the collector produced.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub source_type: String,
    pub location: String,
    pub period: Period,
    pub payload: serde_json::Value,
    pub origin_path: PathBuf,
    pub discovered_at: DateTime<Utc>,
}

/// A normalized auction lot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalAuctionRecord {
    pub lot_no: Option<String>,
    pub garden: Option<String>,
    pub location: String,
    pub grade: String,
    pub quantity_kg: f64,
    pub price_per_unit: f64,
    /// Whether the source record carried any price field at all; accuracy
    /// scoring only counts price-bearing records.
    pub carries_price: bool,
    pub currency: String,
    /// Approximate USD price from the static conversion table, not live FX.
    pub price_usd: f64,
    pub auction_date: NaiveDate,
    pub source: String,
    pub dedup_key: String,
}

impl CanonicalAuctionRecord {
    /// Identity used for completeness scoring: a lot number or garden name.
    pub fn has_identity(&self) -> bool {
        self.lot_no.is_some() || self.garden.is_some()
    }
}

/// A normalized market news/commentary item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalNewsRecord {
    pub title: String,
    pub source: String,
    pub url: String,
    pub summary: String,
    pub publish_date: NaiveDate,
    pub category: String,
    pub dedup_key: String,
}

/// Structural quality metrics for one (location, period) scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub completeness_score: f64,
    pub accuracy_score: f64,
    pub consistency_score: f64,
    /// Hours since the most recent parseable record date; 999.0 is the
    /// sentinel for "no valid dates found", distinct from very fresh data.
    pub freshness_hours: f64,
    pub total_records: usize,
    pub validation_errors: Vec<String>,
    /// Id of the strategy that produced these metrics.
    pub strategy: String,
}

pub const FRESHNESS_SENTINEL_HOURS: f64 = 999.0;

/// One row of a grade or source breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownRow {
    pub key: String,
    pub lot_count: usize,
    pub volume_kg: f64,
    pub average_price: f64,
    pub volume_share_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub location: String,
    pub display_name: String,
    pub region: String,
    pub period: String,
    pub week_number: u32,
    pub year: i32,
    pub report_title: String,
    pub data_quality: String,
    pub total_sources: usize,
    /// Only field allowed to differ between runs over unchanged input.
    pub generated_at: DateTime<Utc>,
    /// Names every approximation applied (assumed sold rate, static FX).
    pub approximations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_lots: usize,
    pub total_volume_kg: f64,
    pub average_price: f64,
    pub highest_price: f64,
    pub sold_percentage: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeAnalysis {
    pub total_offered_kg: f64,
    pub total_sold_kg: f64,
    pub sold_percentage: f64,
    pub by_grade: Vec<BreakdownRow>,
    pub by_source: Vec<BreakdownRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceAnalysis {
    pub average_price: f64,
    pub highest_price: f64,
    pub lowest_price: f64,
    pub price_range: String,
}

/// Lightweight projection of a news item carried inside the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsHighlight {
    pub title: String,
    pub source: String,
    pub url: String,
    pub summary: String,
    pub publish_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketIntelligence {
    /// Threshold-template text over the numeric summary. Templated, never
    /// model-generated.
    pub market_synopsis: String,
    pub key_trends: Vec<String>,
    pub news: Vec<NewsHighlight>,
}

/// The single per-(location, period) output artifact. Fully derived from the
/// staging tree; overwritten each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedReport {
    pub metadata: ReportMetadata,
    pub summary: ReportSummary,
    pub volume_analysis: VolumeAnalysis,
    pub price_analysis: PriceAnalysis,
    pub market_intelligence: MarketIntelligence,
    pub quality: QualityMetrics,
}

/// One library catalog entry, projected from a persisted report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub title: String,
    pub description: String,
    pub location: String,
    pub display_name: String,
    pub period: String,
    pub week_number: u32,
    pub year: i32,
    /// Dataset id: the report filename without extension.
    pub report_reference: String,
    pub quality_flag: String,
    pub highlight: bool,
}
