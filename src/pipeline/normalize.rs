use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use tracing::debug;

use crate::currency;
use crate::domain::{CanonicalAuctionRecord, CanonicalNewsRecord};
use crate::locations;
use crate::pipeline::classify::{broker_name, ClassifiedRecord, RecordKind};
use crate::pipeline::dedup;

/// Ordered alias lists for canonical auction fields; the first non-empty
/// value wins.
const LOT_ALIASES: &[&str] = &["lot_no", "lot_number", "lot", "invoice"];
const GARDEN_ALIASES: &[&str] = &["garden_name", "garden", "estate"];
const GRADE_ALIASES: &[&str] = &["grade", "tea_grade"];
const QUANTITY_ALIASES: &[&str] = &["quantity", "qty", "volume", "weight", "packages"];
const PRICE_ALIASES: &[&str] = &["price", "selling_price", "price_inr", "avg_price"];
const AUCTION_DATE_ALIASES: &[&str] = &["auction_date", "sale_date", "date"];

const TITLE_ALIASES: &[&str] = &["title", "headline"];
const URL_ALIASES: &[&str] = &["url", "link"];
const NEWS_DATE_ALIASES: &[&str] = &["publish_date", "date"];

/// Date formats attempted in order; total failure falls back to ingestion
/// time and is counted as a quality concern.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y-%m-%dT%H:%M:%S"];

/// Everything one normalization pass produced for a scope.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub auction: Vec<CanonicalAuctionRecord>,
    pub news: Vec<CanonicalNewsRecord>,
    /// Records that matched an indicator set but carried no identity field.
    pub rejected: usize,
    /// Records whose date failed every format and defaulted to now.
    pub dates_defaulted: usize,
    /// Unknown-kind records silently dropped (counted, never an error).
    pub dropped_unknown: usize,
}

/// Alias-driven normalizer. All per-field failures default; this type never
/// returns an error to its caller.
pub struct RecordNormalizer {
    now: DateTime<Utc>,
}

impl RecordNormalizer {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn normalize_all(&self, records: &[ClassifiedRecord]) -> NormalizedBatch {
        let mut batch = NormalizedBatch::default();
        for record in records {
            match record.kind {
                RecordKind::Auction => match self.normalize_auction(record) {
                    Some((canonical, date_defaulted)) => {
                        if date_defaulted {
                            batch.dates_defaulted += 1;
                        }
                        batch.auction.push(canonical);
                    }
                    None => batch.rejected += 1,
                },
                RecordKind::News => match self.normalize_news(record) {
                    Some((canonical, date_defaulted)) => {
                        if date_defaulted {
                            batch.dates_defaulted += 1;
                        }
                        batch.news.push(canonical);
                    }
                    None => batch.rejected += 1,
                },
                RecordKind::Unknown => batch.dropped_unknown += 1,
            }
        }
        debug!(
            "Normalized {} auction / {} news records ({} rejected, {} unknown dropped)",
            batch.auction.len(),
            batch.news.len(),
            batch.rejected,
            batch.dropped_unknown
        );
        batch
    }

    fn normalize_auction(
        &self,
        record: &ClassifiedRecord,
    ) -> Option<(CanonicalAuctionRecord, bool)> {
        let data = &record.record;

        let lot_no = resolve_string(data, LOT_ALIASES);
        let garden = resolve_string(data, GARDEN_ALIASES);
        // A lot must be identifiable by number or garden.
        if lot_no.is_none() && garden.is_none() {
            return None;
        }

        let grade = resolve_string(data, GRADE_ALIASES).unwrap_or_else(|| "Unknown".to_string());
        let quantity_kg = resolve_numeric(data, QUANTITY_ALIASES).unwrap_or(0.0);
        let price = resolve_numeric(data, PRICE_ALIASES);
        let carries_price = price.is_some();
        let price_per_unit = price.unwrap_or(0.0);

        let currency = resolve_string(data, &["currency"])
            .unwrap_or_else(|| locations::default_currency(&record.location).to_string());
        let price_usd = currency::to_approx_usd(price_per_unit, &currency);

        let (auction_date, date_defaulted) =
            self.resolve_date(data, AUCTION_DATE_ALIASES);

        let source = resolve_string(data, &["broker", "source"])
            .unwrap_or_else(|| broker_name(&record.source_type).to_string());

        let identity = lot_no
            .clone()
            .or_else(|| garden.clone())
            .unwrap_or_default();
        let dedup_key = dedup::make_key(&identity, &record.location, auction_date);

        Some((
            CanonicalAuctionRecord {
                lot_no,
                garden,
                location: record.location.clone(),
                grade,
                quantity_kg,
                price_per_unit,
                carries_price,
                currency,
                price_usd,
                auction_date,
                source,
                dedup_key,
            },
            date_defaulted,
        ))
    }

    fn normalize_news(&self, record: &ClassifiedRecord) -> Option<(CanonicalNewsRecord, bool)> {
        let data = &record.record;

        // News without a title has no identity.
        let title = resolve_string(data, TITLE_ALIASES)?;

        let source = resolve_string(data, &["source"])
            .unwrap_or_else(|| broker_name(&record.source_type).to_string());
        let url = resolve_string(data, URL_ALIASES).unwrap_or_else(|| "#".to_string());
        let summary = resolve_string(data, &["summary"]).unwrap_or_else(|| {
            resolve_string(data, &["content"])
                .map(|c| truncate_summary(&c))
                .unwrap_or_default()
        });
        let category =
            resolve_string(data, &["category"]).unwrap_or_else(|| "general".to_string());

        let (publish_date, date_defaulted) = self.resolve_date(data, NEWS_DATE_ALIASES);

        let dedup_key = dedup::make_key(&title, &source, publish_date);

        Some((
            CanonicalNewsRecord {
                title,
                source,
                url,
                summary,
                publish_date,
                category,
                dedup_key,
            },
            date_defaulted,
        ))
    }

    /// Resolve a date through the alias list and format list; returns the
    /// parsed date and whether it fell back to ingestion time.
    fn resolve_date(&self, data: &Value, aliases: &[&str]) -> (NaiveDate, bool) {
        for alias in aliases {
            if let Some(raw) = data.get(*alias).and_then(value_to_string) {
                if let Some(date) = parse_date(&raw) {
                    return (date, false);
                }
            }
        }
        (self.now.date_naive(), true)
    }
}

/// First non-empty string value among the aliases. Numbers stringify so that
/// `"lot_no": 5` and `"lot_no": "5"` resolve identically.
fn resolve_string(data: &Value, aliases: &[&str]) -> Option<String> {
    for alias in aliases {
        if let Some(s) = data.get(*alias).and_then(value_to_string) {
            return Some(s);
        }
    }
    None
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric value for the first present alias, or `None` when no alias is
/// present at all. Unparsable values are 0, never an error, and negatives
/// clamp to 0.
fn resolve_numeric(data: &Value, aliases: &[&str]) -> Option<f64> {
    for alias in aliases {
        match data.get(*alias) {
            Some(Value::Number(n)) => {
                return Some(n.as_f64().unwrap_or(0.0).max(0.0));
            }
            Some(Value::String(s)) => {
                return Some(parse_numeric_str(s));
            }
            _ => continue,
        }
    }
    None
}

/// Strip currency symbols, separators, and units, then parse. `"₹1,234.50/kg"`
/// becomes 1234.5; garbage becomes 0.
fn parse_numeric_str(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse::<f64>().unwrap_or(0.0).max(0.0)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    // ISO datetimes carry their date before the 'T'
    let date_part = raw.split('T').next().unwrap_or(raw);
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
            return Some(date);
        }
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive())
}

fn truncate_summary(content: &str) -> String {
    if content.chars().count() <= 200 {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(200).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::classify::classify_object;
    use chrono::TimeZone;
    use serde_json::json;

    fn classified(value: Value) -> ClassifiedRecord {
        ClassifiedRecord {
            kind: classify_object(&value),
            record: value,
            source_type: "JT_auction_lots".to_string(),
            location: "kolkata".to_string(),
        }
    }

    fn normalizer() -> RecordNormalizer {
        RecordNormalizer::new(Utc.with_ymd_and_hms(2025, 7, 15, 9, 0, 0).unwrap())
    }

    #[test]
    fn aliases_resolve_first_non_empty() {
        let batch = normalizer().normalize_all(&[classified(json!({
            "lot_number": "101",
            "estate": "Margaret's Hope",
            "qty": "1,200 kg",
            "selling_price": "₹245.50/kg",
            "auction_date": "2025-07-01"
        }))]);
        assert_eq!(batch.auction.len(), 1);
        let rec = &batch.auction[0];
        assert_eq!(rec.lot_no.as_deref(), Some("101"));
        assert_eq!(rec.garden.as_deref(), Some("Margaret's Hope"));
        assert_eq!(rec.quantity_kg, 1200.0);
        assert_eq!(rec.price_per_unit, 245.5);
        assert_eq!(rec.currency, "INR");
        assert_eq!(rec.auction_date, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
    }

    #[test]
    fn record_without_identity_is_rejected() {
        let batch = normalizer().normalize_all(&[classified(json!({
            "price": 200,
            "quantity": 500
        }))]);
        assert!(batch.auction.is_empty());
        assert_eq!(batch.rejected, 1);
    }

    #[test]
    fn unparsable_numerics_default_to_zero_and_never_go_negative() {
        let batch = normalizer().normalize_all(&[classified(json!({
            "lot_no": 7,
            "quantity": "n/a",
            "price": -40
        }))]);
        let rec = &batch.auction[0];
        assert_eq!(rec.quantity_kg, 0.0);
        assert_eq!(rec.price_per_unit, 0.0);
        assert_eq!(rec.price_usd, 0.0);
    }

    #[test]
    fn unparsable_date_defaults_to_ingestion_day_and_is_counted() {
        let batch = normalizer().normalize_all(&[classified(json!({
            "lot_no": 1,
            "auction_date": "sometime in July"
        }))]);
        assert_eq!(batch.dates_defaulted, 1);
        assert_eq!(
            batch.auction[0].auction_date,
            NaiveDate::from_ymd_opt(2025, 7, 15).unwrap()
        );
    }

    #[test]
    fn slash_dates_parse_day_first() {
        let batch = normalizer().normalize_all(&[classified(json!({
            "lot_no": 1,
            "date": "01/07/2025"
        }))]);
        assert_eq!(
            batch.auction[0].auction_date,
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
        );
        assert_eq!(batch.dates_defaulted, 0);
    }

    #[test]
    fn location_default_currency_applies_and_converts() {
        let mut record = classified(json!({"lot_no": 1, "price": 1000}));
        record.location = "colombo".to_string();
        let batch = normalizer().normalize_all(&[record]);
        let rec = &batch.auction[0];
        assert_eq!(rec.currency, "LKR");
        assert_eq!(rec.price_usd, 3.0);
    }

    #[test]
    fn news_normalizes_with_content_fallback_summary() {
        let long_content = "x".repeat(250);
        let batch = normalizer().normalize_all(&[classified(json!({
            "headline": "Strong demand at Mombasa",
            "content": long_content,
            "publish_date": "2025-07-10"
        }))]);
        assert_eq!(batch.news.len(), 1);
        let news = &batch.news[0];
        assert_eq!(news.title, "Strong demand at Mombasa");
        assert_eq!(news.summary.chars().count(), 203);
        assert_eq!(news.url, "#");
        assert_eq!(news.category, "general");
    }

    #[test]
    fn unknown_records_drop_silently() {
        let batch = normalizer().normalize_all(&[classified(json!({"color": "green"}))]);
        assert_eq!(batch.dropped_unknown, 1);
        assert_eq!(batch.rejected, 0);
        assert!(batch.auction.is_empty() && batch.news.is_empty());
    }
}
