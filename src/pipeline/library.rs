use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::domain::{ConsolidatedReport, LibraryEntry};
use crate::error::{ConsolidatorError, Result};
use crate::pipeline::quality;

pub const LIBRARY_FILENAME: &str = "market_library.json";
const REPORT_SUFFIX: &str = "_consolidated.json";

/// Persist one consolidated report as pretty-printed JSON under
/// `<output_root>/<DisplayName>_<period>_consolidated.json`.
pub fn persist_report(output_root: &Path, report: &ConsolidatedReport) -> Result<PathBuf> {
    fs::create_dir_all(output_root).map_err(|e| ConsolidatorError::OutputDir {
        path: output_root.display().to_string(),
        source: e,
    })?;

    let filename = format!(
        "{}_{}{}",
        report.metadata.display_name, report.metadata.period, REPORT_SUFFIX
    );
    let path = output_root.join(&filename);
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, json)?;
    debug!("Wrote consolidated report {}", path.display());
    Ok(path)
}

/// Read a persisted report back; used by the indexer and by round-trip tests.
pub fn read_report(path: &Path) -> Result<ConsolidatedReport> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn project_entry(report: &ConsolidatedReport, path: &Path) -> LibraryEntry {
    let reference = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let highlight = quality::is_highlight(&report.metadata.data_quality);
    let description = format!(
        "{}. Volume: {:.0} kg, Average price: {:.2} {}. Quality: {}",
        report.metadata.report_title,
        report.summary.total_volume_kg,
        report.summary.average_price,
        report.summary.currency,
        report.metadata.data_quality
    );

    LibraryEntry {
        title: report.metadata.report_title.clone(),
        description,
        location: report.metadata.location.clone(),
        display_name: report.metadata.display_name.clone(),
        period: report.metadata.period.clone(),
        week_number: report.metadata.week_number,
        year: report.metadata.year,
        report_reference: reference,
        quality_flag: report.metadata.data_quality.clone(),
        highlight,
    }
}

/// Rebuild the library catalog from whatever consolidated reports exist on
/// disk. Malformed or partially-written files are skipped with a warning;
/// a single bad file never aborts the build.
pub fn build_library(output_root: &Path) -> Result<Vec<LibraryEntry>> {
    let mut entries = Vec::new();

    let dir = match fs::read_dir(output_root) {
        Ok(dir) => dir,
        Err(e) => {
            info!(
                "Output root {} not readable ({}); library will be empty",
                output_root.display(),
                e
            );
            return Ok(entries);
        }
    };

    for entry in dir.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.ends_with(REPORT_SUFFIX) {
            continue;
        }
        match read_report(&path) {
            Ok(report) => entries.push(project_entry(&report, &path)),
            Err(e) => {
                warn!("Skipping malformed report {}: {}", path.display(), e);
            }
        }
    }

    // Newest period first, location display name as tiebreak
    entries.sort_by(|a, b| {
        b.year
            .cmp(&a.year)
            .then_with(|| b.week_number.cmp(&a.week_number))
            .then_with(|| a.display_name.cmp(&b.display_name))
    });

    Ok(entries)
}

/// Rebuild and write the catalog artifact, returning the entries.
pub fn write_library(output_root: &Path) -> Result<Vec<LibraryEntry>> {
    let entries = build_library(output_root)?;
    fs::create_dir_all(output_root).map_err(|e| ConsolidatorError::OutputDir {
        path: output_root.display().to_string(),
        source: e,
    })?;
    let path = output_root.join(LIBRARY_FILENAME);
    fs::write(&path, serde_json::to_string_pretty(&entries)?)?;
    info!("Wrote library catalog with {} entries", entries.len());
    Ok(entries)
}
