use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::config::ASSUMED_SOLD_RATE;
use crate::domain::{
    BreakdownRow, CanonicalAuctionRecord, CanonicalNewsRecord, ConsolidatedReport,
    MarketIntelligence, NewsHighlight, Period, PriceAnalysis, QualityMetrics, ReportMetadata,
    ReportSummary, VolumeAnalysis,
};
use crate::locations;
use crate::pipeline::quality;

/// Synopsis template bands over the volume-weighted average USD price.
/// The synopsis is assembled from these fixed templates and the numeric
/// summary only; it is documented as templated text, not generated prose.
const STRONG_MARKET_USD: f64 = 2.5;
const STEADY_MARKET_USD: f64 = 1.0;

/// How many news items are projected into the report.
const NEWS_HIGHLIGHT_LIMIT: usize = 5;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Weighted average price: Σ price·qty / Σ qty, 0 when no volume.
fn weighted_average(records: &[&CanonicalAuctionRecord]) -> f64 {
    let volume: f64 = records.iter().map(|r| r.quantity_kg).sum();
    if volume <= 0.0 {
        return 0.0;
    }
    let value: f64 = records
        .iter()
        .map(|r| r.price_per_unit * r.quantity_kg)
        .sum();
    round2(value / volume)
}

/// Group records by a key and compute count, volume, weighted average, and
/// share of total volume per group. BTreeMap keeps the grouping order
/// deterministic; rows then sort by volume descending with key as tiebreak.
fn breakdown<F>(records: &[CanonicalAuctionRecord], total_volume: f64, key_fn: F) -> Vec<BreakdownRow>
where
    F: Fn(&CanonicalAuctionRecord) -> String,
{
    let mut groups: BTreeMap<String, Vec<&CanonicalAuctionRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(key_fn(record)).or_default().push(record);
    }

    let mut rows: Vec<BreakdownRow> = groups
        .into_iter()
        .map(|(key, members)| {
            let volume_kg: f64 = members.iter().map(|r| r.quantity_kg).sum();
            let share = if total_volume > 0.0 {
                round2(volume_kg / total_volume * 100.0)
            } else {
                0.0
            };
            BreakdownRow {
                key,
                lot_count: members.len(),
                volume_kg: round2(volume_kg),
                average_price: weighted_average(&members),
                volume_share_pct: share,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.volume_kg
            .partial_cmp(&a.volume_kg)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });
    rows
}

/// Most common currency among the records, falling back to the location
/// default for an empty scope.
fn dominant_currency(records: &[CanonicalAuctionRecord], location: &str) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.currency.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(currency, _)| currency.to_string())
        .unwrap_or_else(|| locations::default_currency(location).to_string())
}

fn synopsis(
    display_name: &str,
    period: Period,
    total_lots: usize,
    total_volume: f64,
    average_usd: f64,
) -> String {
    if total_lots == 0 {
        return format!(
            "No auction activity recorded for {display_name} in week {}, {}.",
            period.week, period.year
        );
    }
    let band = if average_usd >= STRONG_MARKET_USD {
        "Market showing strong performance with premium pricing achieved across quality grades."
    } else if average_usd >= STEADY_MARKET_USD {
        "Market conditions remain steady with regular trading activity and consistent buyer participation."
    } else {
        "Market activity subdued with modest price levels across the catalogue."
    };
    format!(
        "{band} {display_name} offered {total_lots} lots totalling {:.0} kg in week {}, {}.",
        total_volume, period.week, period.year
    )
}

fn key_trends(
    by_grade: &[BreakdownRow],
    by_source: &[BreakdownRow],
    duplicates_dropped: usize,
) -> Vec<String> {
    let mut trends = Vec::new();
    if let Some(top) = by_grade.first() {
        trends.push(format!(
            "{} leads volume at {:.1}% of the offering",
            top.key, top.volume_share_pct
        ));
    }
    if by_source.len() > 1 {
        trends.push(format!(
            "Records consolidated across {} independent sources",
            by_source.len()
        ));
    }
    if duplicates_dropped > 0 {
        trends.push(format!(
            "{duplicates_dropped} duplicate record(s) collapsed during consolidation"
        ));
    }
    if trends.is_empty() {
        trends.push("Awaiting richer source coverage for this period".to_string());
    }
    trends
}

/// Build the consolidated report for one (location, period) scope.
///
/// Everything but `generated_at` derives deterministically from the inputs,
/// which is what makes repeated runs byte-identical on unchanged staging
/// trees.
pub fn build_report(
    location: &str,
    period: Period,
    auction: &[CanonicalAuctionRecord],
    news: &[CanonicalNewsRecord],
    metrics: QualityMetrics,
    total_sources: usize,
    duplicates_dropped: usize,
    generated_at: DateTime<Utc>,
) -> ConsolidatedReport {
    let display_name = locations::display_name(location);
    let region = locations::region(location);

    let total_lots = auction.len();
    let total_volume: f64 = round2(auction.iter().map(|r| r.quantity_kg).sum());
    let all: Vec<&CanonicalAuctionRecord> = auction.iter().collect();
    let average_price = weighted_average(&all);
    let highest_price = auction
        .iter()
        .map(|r| r.price_per_unit)
        .fold(0.0_f64, f64::max);
    let lowest_price = auction
        .iter()
        .map(|r| r.price_per_unit)
        .filter(|p| *p > 0.0)
        .fold(f64::INFINITY, f64::min);
    let lowest_price = if lowest_price.is_finite() {
        lowest_price
    } else {
        0.0
    };

    // Sold/unsold detail is absent from every current source, so the sold
    // figure is an assumed-rate estimate and is labelled as such below.
    let (total_sold, sold_percentage) = if total_volume > 0.0 {
        (
            round2(total_volume * ASSUMED_SOLD_RATE),
            round2(ASSUMED_SOLD_RATE * 100.0),
        )
    } else {
        (0.0, 0.0)
    };

    let by_grade = breakdown(auction, total_volume, |r| r.grade.clone());
    let by_source = breakdown(auction, total_volume, |r| r.source.clone());

    let average_usd = if total_volume > 0.0 {
        auction
            .iter()
            .map(|r| r.price_usd * r.quantity_kg)
            .sum::<f64>()
            / total_volume
    } else {
        0.0
    };

    let mut sorted_news: Vec<&CanonicalNewsRecord> = news.iter().collect();
    sorted_news.sort_by(|a, b| {
        b.publish_date
            .cmp(&a.publish_date)
            .then_with(|| a.title.cmp(&b.title))
    });
    let highlights: Vec<NewsHighlight> = sorted_news
        .into_iter()
        .take(NEWS_HIGHLIGHT_LIMIT)
        .map(|n| NewsHighlight {
            title: n.title.clone(),
            source: n.source.clone(),
            url: n.url.clone(),
            summary: n.summary.clone(),
            publish_date: n.publish_date,
        })
        .collect();

    let mut approximations = vec![
        "price_usd derived from a static approximate conversion table, not live FX".to_string(),
    ];
    if total_volume > 0.0 {
        approximations.push(format!(
            "sold volume estimated at {:.0}% of offered volume (assumed rate, no sold/unsold detail in sources)",
            ASSUMED_SOLD_RATE * 100.0
        ));
    }

    let data_quality = quality::quality_label(&metrics);
    let market_synopsis = synopsis(&display_name, period, total_lots, total_volume, average_usd);
    let trends = key_trends(&by_grade, &by_source, duplicates_dropped);
    let currency = dominant_currency(auction, location);

    ConsolidatedReport {
        metadata: ReportMetadata {
            location: location.to_string(),
            display_name: display_name.clone(),
            region,
            period: period.key(),
            week_number: period.week,
            year: period.year,
            report_title: format!(
                "{} Market Report - Week {}, {}",
                display_name, period.week, period.year
            ),
            data_quality,
            total_sources,
            generated_at,
            approximations,
        },
        summary: ReportSummary {
            total_lots,
            total_volume_kg: total_volume,
            average_price,
            highest_price,
            sold_percentage,
            currency,
        },
        volume_analysis: VolumeAnalysis {
            total_offered_kg: total_volume,
            total_sold_kg: total_sold,
            sold_percentage,
            by_grade,
            by_source,
        },
        price_analysis: PriceAnalysis {
            average_price,
            highest_price,
            lowest_price,
            price_range: format!("{lowest_price:.2} - {highest_price:.2}"),
        },
        market_intelligence: MarketIntelligence {
            market_synopsis,
            key_trends: trends,
            news: highlights,
        },
        quality: metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::dedup;
    use chrono::{NaiveDate, TimeZone};

    fn lot(lot_no: &str, grade: &str, qty: f64, price: f64) -> CanonicalAuctionRecord {
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        CanonicalAuctionRecord {
            lot_no: Some(lot_no.to_string()),
            garden: None,
            location: "kolkata".to_string(),
            grade: grade.to_string(),
            quantity_kg: qty,
            price_per_unit: price,
            carries_price: true,
            currency: "INR".to_string(),
            price_usd: price * 0.012,
            auction_date: date,
            source: "J.Thomas & Co".to_string(),
            dedup_key: dedup::make_key(lot_no, "kolkata", date),
        }
    }

    fn metrics(total: usize) -> QualityMetrics {
        QualityMetrics {
            completeness_score: 90.0,
            accuracy_score: 100.0,
            consistency_score: 85.0,
            freshness_hours: 24.0,
            total_records: total,
            validation_errors: vec![],
            strategy: "standard_v1".to_string(),
        }
    }

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 15, 9, 0, 0).unwrap()
    }

    #[test]
    fn weighted_summary_matches_hand_calculation() {
        // quantities [100, 200, 300], prices [10, 20, 30]
        let records = vec![
            lot("1", "BOPF", 100.0, 10.0),
            lot("2", "BOPF", 200.0, 20.0),
            lot("3", "PEKOE", 300.0, 30.0),
        ];
        let period = Period { year: 2025, week: 28 };
        let report = build_report(
            "kolkata",
            period,
            &records,
            &[],
            metrics(3),
            1,
            0,
            generated_at(),
        );

        assert_eq!(report.summary.total_lots, 3);
        assert_eq!(report.summary.total_volume_kg, 600.0);
        // (100*10 + 200*20 + 300*30) / 600 = 23.33
        assert_eq!(report.summary.average_price, 23.33);
        assert_eq!(report.summary.highest_price, 30.0);
    }

    #[test]
    fn empty_scope_degrades_to_zeroed_summary() {
        let period = Period { year: 2025, week: 28 };
        let report = build_report(
            "kolkata",
            period,
            &[],
            &[],
            metrics(0),
            0,
            0,
            generated_at(),
        );
        assert_eq!(report.summary.total_lots, 0);
        assert_eq!(report.summary.total_volume_kg, 0.0);
        assert_eq!(report.summary.average_price, 0.0);
        assert_eq!(report.volume_analysis.total_sold_kg, 0.0);
        assert_eq!(report.price_analysis.lowest_price, 0.0);
        assert!(report
            .market_intelligence
            .market_synopsis
            .starts_with("No auction activity"));
    }

    #[test]
    fn sold_volume_is_labelled_as_assumed() {
        let records = vec![lot("1", "BOPF", 1000.0, 240.0)];
        let period = Period { year: 2025, week: 28 };
        let report = build_report(
            "kolkata",
            period,
            &records,
            &[],
            metrics(1),
            1,
            0,
            generated_at(),
        );
        assert_eq!(report.volume_analysis.total_sold_kg, 870.0);
        assert_eq!(report.volume_analysis.sold_percentage, 87.0);
        assert!(report
            .metadata
            .approximations
            .iter()
            .any(|a| a.contains("assumed rate")));
    }

    #[test]
    fn breakdowns_cover_grade_and_source_with_shares() {
        let mut records = vec![
            lot("1", "BOPF", 300.0, 10.0),
            lot("2", "PEKOE", 100.0, 20.0),
        ];
        records[1].source = "Forbes & Walker".to_string();
        let period = Period { year: 2025, week: 28 };
        let report = build_report(
            "kolkata",
            period,
            &records,
            &[],
            metrics(2),
            2,
            0,
            generated_at(),
        );

        let grades = &report.volume_analysis.by_grade;
        assert_eq!(grades.len(), 2);
        assert_eq!(grades[0].key, "BOPF");
        assert_eq!(grades[0].volume_share_pct, 75.0);
        assert_eq!(grades[1].volume_share_pct, 25.0);

        let sources = &report.volume_analysis.by_source;
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].key, "J.Thomas & Co");
    }

    #[test]
    fn synopsis_band_follows_average_usd_price() {
        let premium = vec![lot("1", "BOPF", 100.0, 300.0)]; // 3.6 USD avg
        let period = Period { year: 2025, week: 28 };
        let report = build_report(
            "kolkata",
            period,
            &premium,
            &[],
            metrics(1),
            1,
            0,
            generated_at(),
        );
        assert!(report
            .market_intelligence
            .market_synopsis
            .contains("strong performance"));

        let modest = vec![lot("1", "BOPF", 100.0, 40.0)]; // 0.48 USD avg
        let report = build_report(
            "kolkata",
            period,
            &modest,
            &[],
            metrics(1),
            1,
            0,
            generated_at(),
        );
        assert!(report.market_intelligence.market_synopsis.contains("subdued"));
    }

    #[test]
    fn identical_inputs_produce_identical_reports_apart_from_timestamp() {
        let records = vec![
            lot("1", "BOPF", 100.0, 10.0),
            lot("2", "PEKOE", 200.0, 20.0),
        ];
        let period = Period { year: 2025, week: 28 };
        let a = build_report("kolkata", period, &records, &[], metrics(2), 1, 0, generated_at());
        let later = Utc.with_ymd_and_hms(2025, 7, 16, 9, 0, 0).unwrap();
        let b = build_report("kolkata", period, &records, &[], metrics(2), 1, 0, later);

        let mut a_json = serde_json::to_value(&a).unwrap();
        let mut b_json = serde_json::to_value(&b).unwrap();
        a_json["metadata"]["generated_at"] = serde_json::Value::Null;
        b_json["metadata"]["generated_at"] = serde_json::Value::Null;
        assert_eq!(a_json, b_json);
    }
}
