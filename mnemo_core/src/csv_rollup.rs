//! CSV rollup for archiving journaled sessions.
//!
//! Moves the session journal into an append-only CSV archive without
//! losing records if the process dies halfway.

use crate::{Result, SessionRecord};
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV archive
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub(crate) struct CsvRow {
    pub id: String,
    pub user: String,
    pub module: Option<String>,
    pub points: u64,
    pub correct: u64,
    pub total: u64,
    pub completed_at: String,
}

impl From<&SessionRecord> for CsvRow {
    fn from(record: &SessionRecord) -> Self {
        CsvRow {
            id: record.id.to_string(),
            user: record.user.to_string(),
            module: record.module.map(|m| m.as_str().to_string()),
            points: record.points,
            correct: record.correct,
            total: record.total,
            completed_at: record.completed_at.to_rfc3339(),
        }
    }
}

/// Roll journal sessions into the CSV archive and retire the journal
///
/// 1. Read every session from the journal
/// 2. Append them to the CSV (writing headers on a new file)
/// 3. Sync the CSV to disk
/// 4. Rename the journal to `.wal.processed`
///
/// The journal is renamed rather than deleted so it can be recovered by
/// hand; [`cleanup_processed_journals`] removes it later.
pub fn journal_to_csv_and_archive(journal_path: &Path, csv_path: &Path) -> Result<usize> {
    let records = crate::wal::read_sessions(journal_path)?;

    if records.is_empty() {
        tracing::info!("No sessions in journal to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for record in &records {
        writer.serialize(CsvRow::from(record))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Wrote {} sessions to CSV", records.len());

    let processed_path = journal_path.with_extension("wal.processed");
    std::fs::rename(journal_path, &processed_path)?;

    tracing::info!("Archived journal to {:?}", processed_path);

    Ok(records.len())
}

/// Remove all `.processed` journal files in `dir`
pub fn cleanup_processed_journals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed journal: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed journal files", count);
    }

    Ok(count)
}
