use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::debug;

use crate::domain::{CanonicalAuctionRecord, CanonicalNewsRecord};

/// Build the composite dedup key: (lot-or-title, location-or-source, date),
/// case-folded with whitespace collapsed. Exact-key matching only; near
/// duplicates with textual variants stay distinct.
pub fn make_key(identity: &str, scope: &str, date: NaiveDate) -> String {
    format!(
        "{}|{}|{}",
        fold(identity),
        fold(scope),
        date.format("%Y-%m-%d")
    )
}

fn fold(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse duplicate auction records, keeping the first-encountered record
/// per key. Input order comes from discovery (mtime ascending), so "first"
/// means first-discovered; callers wanting most-recent-wins pre-sort.
pub fn dedup_auction(records: Vec<CanonicalAuctionRecord>) -> (Vec<CanonicalAuctionRecord>, usize) {
    let mut seen = HashSet::new();
    let total = records.len();
    let kept: Vec<_> = records
        .into_iter()
        .filter(|r| seen.insert(r.dedup_key.clone()))
        .collect();
    let dropped = total - kept.len();
    if dropped > 0 {
        debug!("Dropped {} duplicate auction record(s)", dropped);
    }
    (kept, dropped)
}

/// Collapse duplicate news records, first-encountered wins.
pub fn dedup_news(records: Vec<CanonicalNewsRecord>) -> (Vec<CanonicalNewsRecord>, usize) {
    let mut seen = HashSet::new();
    let total = records.len();
    let kept: Vec<_> = records
        .into_iter()
        .filter(|r| seen.insert(r.dedup_key.clone()))
        .collect();
    let dropped = total - kept.len();
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot(lot_no: &str, price: f64, key: &str) -> CanonicalAuctionRecord {
        CanonicalAuctionRecord {
            lot_no: Some(lot_no.to_string()),
            garden: Some("X".to_string()),
            location: "kolkata".to_string(),
            grade: "BOPF".to_string(),
            quantity_kg: 100.0,
            price_per_unit: price,
            carries_price: true,
            currency: "INR".to_string(),
            price_usd: 0.0,
            auction_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            source: "J.Thomas & Co".to_string(),
            dedup_key: key.to_string(),
        }
    }

    #[test]
    fn key_folds_case_and_whitespace() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(
            make_key("Lot  5", "Kolkata", date),
            make_key("lot 5", " kolkata ", date)
        );
    }

    #[test]
    fn first_encountered_record_wins() {
        let key = make_key("5", "kolkata", NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let (kept, dropped) = dedup_auction(vec![
            lot("5", 240.0, &key),
            lot("5", 999.0, &key),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(dropped, 1);
        assert_eq!(kept[0].price_per_unit, 240.0);
    }

    #[test]
    fn distinct_keys_all_survive() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let (kept, dropped) = dedup_auction(vec![
            lot("5", 240.0, &make_key("5", "kolkata", d)),
            lot("6", 250.0, &make_key("6", "kolkata", d)),
        ]);
        assert_eq!(kept.len(), 2);
        assert_eq!(dropped, 0);
    }
}
