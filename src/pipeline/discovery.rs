use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::domain::Period;

/// A staging file eligible for consolidation.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: PathBuf,
    pub location: String,
    pub period: Period,
    pub modified: SystemTime,
}

/// Ordered filename patterns for period extraction; the first match wins.
/// `S<n>[_<year>]` is the sale-number convention, `W<n>[_<year>]` the week
/// convention used by some collectors.
static PERIOD_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"S(\d{1,2})(?:_(\d{4}))?").unwrap(),
        Regex::new(r"W(\d{1,2})(?:_(\d{4}))?").unwrap(),
    ]
});

/// Extract the trading period from a filename. A missing year defaults to
/// `current_year`.
pub fn extract_period(filename: &str, current_year: i32) -> Option<Period> {
    for pattern in PERIOD_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(filename) {
            let week: u32 = caps.get(1)?.as_str().parse().ok()?;
            let year = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(current_year);
            return Some(Period { year, week });
        }
    }
    None
}

/// Per-location manifest files are cross-reference metadata, not data.
fn is_manifest(filename: &str) -> bool {
    filename.to_ascii_lowercase().contains("manifest")
}

/// Enumerate staging files under `<staging_root>/<location>/<document>`.
///
/// Candidates come back sorted by modification time ascending with path as
/// tiebreak; that order defines "first-discovered" for deduplication. A
/// missing staging root is an empty result, not an error.
pub fn discover(staging_root: &Path, current_year: i32) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    let locations = match fs::read_dir(staging_root) {
        Ok(entries) => entries,
        Err(e) => {
            info!(
                "Staging root {} not readable ({}); nothing to discover",
                staging_root.display(),
                e
            );
            return candidates;
        }
    };

    for location_entry in locations.flatten() {
        let location_path = location_entry.path();
        if !location_path.is_dir() {
            continue;
        }
        let location = location_entry.file_name().to_string_lossy().to_lowercase();

        let files = match fs::read_dir(&location_path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot read location directory {}: {}", location_path.display(), e);
                continue;
            }
        };

        for file_entry in files.flatten() {
            let path = file_entry.path();
            if !path.is_file() {
                continue;
            }
            let filename = file_entry.file_name().to_string_lossy().to_string();
            if is_manifest(&filename) {
                debug!("Excluding manifest file {}", path.display());
                continue;
            }

            let Some(period) = extract_period(&filename, current_year) else {
                debug!("No period in filename {}; skipping", filename);
                continue;
            };

            let modified = file_entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);

            candidates.push(Candidate {
                path,
                location: location.clone(),
                period,
                modified,
            });
        }
    }

    candidates.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
    info!("Discovered {} candidate documents", candidates.len());
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn extracts_sale_period_with_year() {
        let p = extract_period("JT_auction_lots_S28_2025.json", 2026).unwrap();
        assert_eq!(p, Period { year: 2025, week: 28 });
    }

    #[test]
    fn missing_year_defaults_to_current() {
        let p = extract_period("FW_report_S31.json", 2025).unwrap();
        assert_eq!(p, Period { year: 2025, week: 31 });
    }

    #[test]
    fn week_pattern_is_second_choice() {
        let p = extract_period("mombasa_W12_2024.json", 2025).unwrap();
        assert_eq!(p, Period { year: 2024, week: 12 });
    }

    #[test]
    fn no_period_means_no_candidate() {
        assert!(extract_period("notes.json", 2025).is_none());
    }

    #[test]
    fn missing_root_yields_empty() {
        let candidates = discover(Path::new("/definitely/not/here"), 2025);
        assert!(candidates.is_empty());
    }

    #[test]
    fn manifest_files_are_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let loc = dir.path().join("kolkata");
        fs::create_dir(&loc).unwrap();

        for name in ["a_S28_2025.json", "manifest.json", "sources_manifest.json"] {
            let mut f = File::create(loc.join(name)).unwrap();
            f.write_all(b"{}").unwrap();
        }

        let candidates = discover(dir.path(), 2025);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].location, "kolkata");
    }

    #[test]
    fn discovery_order_follows_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        let loc = dir.path().join("colombo");
        fs::create_dir(&loc).unwrap();

        for name in ["older_S5_2025.json", "newer_S5_2025.json"] {
            let mut f = File::create(loc.join(name)).unwrap();
            f.write_all(b"{}").unwrap();
            std::thread::sleep(std::time::Duration::from_millis(20));
        }

        let candidates = discover(dir.path(), 2025);
        let names: Vec<_> = candidates
            .iter()
            .map(|c| c.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["older_S5_2025.json", "newer_S5_2025.json"]);
    }
}
