use serde_json::Value;
use tracing::debug;

use crate::domain::RawDocument;

/// Record classification, decided once up front so later stages never branch
/// on field presence again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Auction,
    News,
    Unknown,
}

/// A single flattened record lifted out of a raw payload, tagged with its
/// classification and the document it came from.
#[derive(Debug, Clone)]
pub struct ClassifiedRecord {
    pub kind: RecordKind,
    pub record: Value,
    pub source_type: String,
    pub location: String,
}

/// Keys whose presence marks a record as auction-like.
const AUCTION_INDICATORS: &[&str] = &[
    "lot_no",
    "lot_number",
    "lot",
    "invoice",
    "grade",
    "tea_grade",
    "garden",
    "garden_name",
    "estate",
    "price",
    "selling_price",
    "price_inr",
    "quantity",
    "qty",
    "packages",
];

/// Keys whose presence marks a record as news-like.
const NEWS_INDICATORS: &[&str] = &["title", "headline", "summary", "content", "source", "url"];

/// Conventional keys under which collectors nest their record lists.
const LIST_KEYS: &[&str] = &[
    "auctions",
    "auction_lots",
    "lots",
    "records",
    "data",
    "items",
    "news",
    "articles",
];

/// Classify one object. Auction indicators take precedence so a lot listing
/// that also carries a `source` field does not become news.
pub fn classify_object(obj: &Value) -> RecordKind {
    let Some(map) = obj.as_object() else {
        return RecordKind::Unknown;
    };
    if AUCTION_INDICATORS.iter().any(|k| map.contains_key(*k)) {
        return RecordKind::Auction;
    }
    if NEWS_INDICATORS.iter().any(|k| map.contains_key(*k)) {
        return RecordKind::News;
    }
    RecordKind::Unknown
}

/// Flatten a payload into candidate record objects. Supported shapes: a
/// single object, an array of objects, or an object whose list lives under
/// one of the conventional keys. The first populated list key wins.
fn flatten_payload(payload: &Value) -> Vec<Value> {
    match payload {
        Value::Array(items) => items.iter().filter(|v| v.is_object()).cloned().collect(),
        Value::Object(map) => {
            for key in LIST_KEYS {
                if let Some(Value::Array(items)) = map.get(*key) {
                    if !items.is_empty() {
                        return items.iter().filter(|v| v.is_object()).cloned().collect();
                    }
                }
            }
            vec![payload.clone()]
        }
        _ => Vec::new(),
    }
}

/// Flatten and classify every record in a raw document. Unknown records are
/// kept here (tagged) so the caller can count them; dropping them silently is
/// the normalizer's job.
pub fn classify_document(doc: &RawDocument) -> Vec<ClassifiedRecord> {
    let records = flatten_payload(&doc.payload);
    debug!(
        "Classifying {} record(s) from {}",
        records.len(),
        doc.origin_path.display()
    );

    records
        .into_iter()
        .map(|record| ClassifiedRecord {
            kind: classify_object(&record),
            record,
            source_type: doc.source_type.clone(),
            location: doc.location.clone(),
        })
        .collect()
}

/// Source type tag inferred from a staging filename.
pub fn determine_source_type(filename: &str) -> String {
    let lower = filename.to_ascii_lowercase();
    if lower.contains("fw_") || lower.contains("forbes") {
        "FW_report"
    } else if lower.contains("jt_auction_lots") {
        "JT_auction_lots"
    } else if lower.contains("jt_market_report") {
        "JT_market_report"
    } else if lower.contains("jt_synopsis") {
        "JT_synopsis"
    } else if lower.contains("ctb_") || lower.contains("ceylon") {
        "CTB_report"
    } else if lower.contains("atb") {
        "ATB_report"
    } else if lower.contains("tbea") {
        "TBEA_report"
    } else if lower.contains("news") {
        "news_feed"
    } else {
        "other"
    }
    .to_string()
}

/// Broker display name for a source type, used as the default record source.
pub fn broker_name(source_type: &str) -> &'static str {
    match source_type {
        "FW_report" => "Forbes & Walker",
        "JT_auction_lots" | "JT_market_report" | "JT_synopsis" => "J.Thomas & Co",
        "CTB_report" => "Ceylon Tea Brokers",
        "ATB_report" => "African Tea Brokers",
        "TBEA_report" => "Tea Brokers East Africa",
        _ => "Unknown Source",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Period;
    use chrono::Utc;
    use serde_json::json;

    fn doc(payload: Value) -> RawDocument {
        RawDocument {
            source_type: "JT_auction_lots".to_string(),
            location: "kolkata".to_string(),
            period: Period { year: 2025, week: 28 },
            payload,
            origin_path: "staging/kolkata/JT_auction_lots_S28_2025.json".into(),
            discovered_at: Utc::now(),
        }
    }

    #[test]
    fn single_auction_object_classifies() {
        let records = classify_document(&doc(json!({"lot_no": 5, "price": 240})));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, RecordKind::Auction);
    }

    #[test]
    fn array_payload_flattens() {
        let records = classify_document(&doc(json!([
            {"lot_no": 1},
            {"headline": "Strong week"},
            {"color": "green"}
        ])));
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].kind, RecordKind::Auction);
        assert_eq!(records[1].kind, RecordKind::News);
        assert_eq!(records[2].kind, RecordKind::Unknown);
    }

    #[test]
    fn nested_list_key_flattens() {
        let records = classify_document(&doc(json!({
            "generated": "2025-07-01",
            "auction_lots": [{"lot_no": 1}, {"lot_no": 2}]
        })));
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.kind == RecordKind::Auction));
    }

    #[test]
    fn auction_indicators_win_over_news() {
        // `source` alone is a news indicator, but `grade` makes it a lot.
        let kind = classify_object(&json!({"grade": "BOPF", "source": "ATB"}));
        assert_eq!(kind, RecordKind::Auction);
    }

    #[test]
    fn scalar_payload_yields_nothing() {
        let records = classify_document(&doc(json!("just a string")));
        assert!(records.is_empty());
    }

    #[test]
    fn source_type_inference() {
        assert_eq!(determine_source_type("FW_report_S28.json"), "FW_report");
        assert_eq!(determine_source_type("JT_auction_lots_S28_2025.json"), "JT_auction_lots");
        assert_eq!(determine_source_type("weird_S1.json"), "other");
        assert_eq!(broker_name("FW_report"), "Forbes & Walker");
    }
}
