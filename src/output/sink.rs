//! Incremental dataset sink
//!
//! Records accumulate in memory and are published to disk in two ways:
//!
//! - `publish_partial` writes the in-progress dataset to `<dataset>.partial`.
//!   It is safe to call repeatedly and is invoked on the periodic cadence and
//!   unconditionally during shutdown, so an abrupt kill loses at most the
//!   records captured since the last partial publish.
//! - `publish_final` writes the completed dataset to the canonical path.
//!
//! Every write goes to a temporary file first and is renamed into place
//! (copy-then-delete where rename cannot replace), so no reader ever
//! observes a half-written file.

use crate::output::schema::{ItemRecord, CSV_HEADERS};
use crate::{Result, StocktakeError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Accumulates extracted records and publishes them as a CSV dataset
#[derive(Debug)]
pub struct DatasetSink {
    records: Vec<ItemRecord>,
    dataset_path: PathBuf,
    partial_path: PathBuf,
    baseline_path: PathBuf,
    has_baseline: bool,
}

impl DatasetSink {
    /// Creates a sink publishing to the given canonical dataset path
    pub fn new(dataset_path: impl Into<PathBuf>) -> Self {
        let dataset_path = dataset_path.into();
        let partial_path = sibling_path(&dataset_path, "partial");
        let baseline_path = sibling_path(&dataset_path, "baseline");
        Self {
            records: Vec::new(),
            dataset_path,
            partial_path,
            baseline_path,
            has_baseline: false,
        }
    }

    /// Adopts the previous run's dataset file as a baseline to extend
    ///
    /// Picks the partial file if the prior run was interrupted, otherwise
    /// the canonical file. The chosen file is copied aside so later partial
    /// publishes cannot clobber it, and its identifiers are returned for
    /// seeding the dedup ledger. The baseline rows are preserved in every
    /// subsequent publish but are never replayed into memory.
    pub fn adopt_baseline(&mut self) -> Result<Vec<String>> {
        let source = if self.partial_path.exists() {
            Some(self.partial_path.clone())
        } else if self.dataset_path.exists() {
            Some(self.dataset_path.clone())
        } else {
            None
        };

        let Some(source) = source else {
            tracing::info!("No previous dataset file found, nothing to extend");
            return Ok(Vec::new());
        };

        std::fs::copy(&source, &self.baseline_path)?;
        self.has_baseline = true;

        let ids = read_identifiers(&self.baseline_path)?;
        tracing::info!(
            "Adopted baseline {:?} with {} existing records",
            source,
            ids.len()
        );
        Ok(ids)
    }

    /// Appends a record to the in-memory dataset
    pub fn append(&mut self, record: ItemRecord) {
        self.records.push(record);
    }

    /// Number of records appended this run (baseline rows excluded)
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records have been appended this run
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Best-effort durable write of the in-progress dataset
    ///
    /// Does not touch the canonical path. Safe to call repeatedly.
    pub fn publish_partial(&self) -> Result<()> {
        self.write_atomic(&self.partial_path)?;
        tracing::debug!(
            "Partial dataset published: {} new records -> {:?}",
            self.records.len(),
            self.partial_path
        );
        Ok(())
    }

    /// Atomically publishes the completed dataset to the canonical path
    ///
    /// Also removes the partial and baseline artifacts, which the final
    /// file supersedes.
    pub fn publish_final(&self) -> Result<()> {
        self.write_atomic(&self.dataset_path)?;
        tracing::info!(
            "Final dataset published: {} new records -> {:?}",
            self.records.len(),
            self.dataset_path
        );

        // The canonical file now carries everything
        let _ = std::fs::remove_file(&self.partial_path);
        if self.has_baseline {
            let _ = std::fs::remove_file(&self.baseline_path);
        }
        Ok(())
    }

    /// Path of the canonical dataset file
    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    /// Path of the interruption-safe partial file
    pub fn partial_path(&self) -> &Path {
        &self.partial_path
    }

    /// Writes headers, baseline rows, and in-memory records to a temporary
    /// file, then renames it over the target
    fn write_atomic(&self, target: &Path) -> Result<()> {
        let tmp_path = sibling_path(target, "tmp");

        {
            let mut writer = csv::Writer::from_path(&tmp_path)?;
            writer.write_record(CSV_HEADERS)?;

            if self.has_baseline {
                let mut reader = csv::Reader::from_path(&self.baseline_path)?;
                for row in reader.records() {
                    writer.write_record(&row?)?;
                }
            }

            for record in &self.records {
                writer.write_record(record.to_row())?;
            }

            writer.flush()?;
        }

        replace_file(&tmp_path, target)?;
        Ok(())
    }
}

/// Derives `<path>.<suffix>` next to the given path
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{}", suffix));
    PathBuf::from(name)
}

/// Renames `from` over `to`, falling back to copy-then-delete on
/// filesystems where rename cannot replace the target
fn replace_file(from: &Path, to: &Path) -> Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            tracing::debug!(
                "Atomic rename {:?} -> {:?} failed ({}), copying instead",
                from,
                to,
                rename_err
            );
            std::fs::copy(from, to).map_err(|e| {
                StocktakeError::Persistence(format!("Failed to publish {:?}: {}", to, e))
            })?;
            let _ = std::fs::remove_file(from);
            Ok(())
        }
    }
}

/// Reads the identifier column of an existing dataset file
fn read_identifiers(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for row in reader.records() {
        let row = row?;
        if let Some(id) = row.get(0) {
            if seen.insert(id.to_string()) {
                ids.push(id.to_string());
            }
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_record(id: &str) -> ItemRecord {
        ItemRecord {
            id: id.to_string(),
            name: format!("Item {}", id),
            price: Some(9.99),
            stock_quantity: 1,
            image: None,
            categories: vec![],
            tags: vec![],
            short_description: None,
            brand: None,
            grade: None,
            packaging: None,
            color: None,
            model: None,
            compatibility: None,
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(|f| f.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_partial_publish_writes_rows() {
        let dir = TempDir::new().unwrap();
        let mut sink = DatasetSink::new(dir.path().join("dataset.csv"));

        sink.append(create_test_record("A"));
        sink.append(create_test_record("B"));
        sink.publish_partial().unwrap();

        let rows = read_rows(sink.partial_path());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "A");
        assert_eq!(rows[1][0], "B");

        // Canonical path untouched
        assert!(!sink.dataset_path().exists());
    }

    #[test]
    fn test_final_publish_replaces_canonical() {
        let dir = TempDir::new().unwrap();
        let mut sink = DatasetSink::new(dir.path().join("dataset.csv"));

        sink.append(create_test_record("A"));
        sink.publish_partial().unwrap();
        sink.append(create_test_record("B"));
        sink.publish_final().unwrap();

        let rows = read_rows(sink.dataset_path());
        assert_eq!(rows.len(), 2);

        // Final publish cleans up the partial artifact
        assert!(!sink.partial_path().exists());
    }

    #[test]
    fn test_repeated_partial_publish_is_stable() {
        let dir = TempDir::new().unwrap();
        let mut sink = DatasetSink::new(dir.path().join("dataset.csv"));

        sink.append(create_test_record("A"));
        sink.publish_partial().unwrap();
        sink.publish_partial().unwrap();
        sink.append(create_test_record("B"));
        sink.publish_partial().unwrap();

        let rows = read_rows(sink.partial_path());
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_published_file_never_shrinks() {
        let dir = TempDir::new().unwrap();
        let mut sink = DatasetSink::new(dir.path().join("dataset.csv"));

        for i in 0..10 {
            sink.append(create_test_record(&format!("SKU-{}", i)));
        }
        sink.publish_partial().unwrap();
        let first_size = std::fs::metadata(sink.partial_path()).unwrap().len();

        sink.append(create_test_record("SKU-10"));
        sink.publish_partial().unwrap();
        let second_size = std::fs::metadata(sink.partial_path()).unwrap().len();

        assert!(second_size >= first_size);
    }

    #[test]
    fn test_adopt_baseline_from_partial() {
        let dir = TempDir::new().unwrap();
        let dataset = dir.path().join("dataset.csv");

        // A previous interrupted run left a partial file behind
        {
            let mut prior = DatasetSink::new(&dataset);
            prior.append(create_test_record("OLD-1"));
            prior.append(create_test_record("OLD-2"));
            prior.publish_partial().unwrap();
        }

        let mut sink = DatasetSink::new(&dataset);
        let ids = sink.adopt_baseline().unwrap();
        assert_eq!(ids, vec!["OLD-1".to_string(), "OLD-2".to_string()]);

        // New records extend the baseline, in order, without duplication
        sink.append(create_test_record("NEW-1"));
        sink.publish_partial().unwrap();
        sink.publish_partial().unwrap();

        let rows = read_rows(sink.partial_path());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], "OLD-1");
        assert_eq!(rows[2][0], "NEW-1");

        sink.publish_final().unwrap();
        let rows = read_rows(sink.dataset_path());
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_adopt_baseline_prefers_partial_over_final() {
        let dir = TempDir::new().unwrap();
        let dataset = dir.path().join("dataset.csv");

        {
            let mut complete = DatasetSink::new(&dataset);
            complete.append(create_test_record("FINAL-1"));
            complete.publish_final().unwrap();
        }
        {
            let mut interrupted = DatasetSink::new(&dataset);
            interrupted.append(create_test_record("PARTIAL-1"));
            interrupted.append(create_test_record("PARTIAL-2"));
            interrupted.publish_partial().unwrap();
        }

        let mut sink = DatasetSink::new(&dataset);
        let ids = sink.adopt_baseline().unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"PARTIAL-1".to_string()));
    }

    #[test]
    fn test_adopt_baseline_with_nothing_present() {
        let dir = TempDir::new().unwrap();
        let mut sink = DatasetSink::new(dir.path().join("dataset.csv"));
        let ids = sink.adopt_baseline().unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_header_row_present() {
        let dir = TempDir::new().unwrap();
        let mut sink = DatasetSink::new(dir.path().join("dataset.csv"));
        sink.append(create_test_record("A"));
        sink.publish_final().unwrap();

        let mut reader = csv::Reader::from_path(sink.dataset_path()).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, CSV_HEADERS);
    }
}
