use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde_json::{Map, Value};

use branchtag_core::error::TaggerError;
use branchtag_core::models::ledger::{ErrorKind, ErrorRecord, RecordContext};

/// Result of persisting the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was recorded; no file is written.
    Clean,
    Written { path: PathBuf, count: usize },
}

/// Append-only record of entities that could not be fully processed.
///
/// Shared between concurrent target workers; recording never fails.
#[derive(Debug)]
pub struct ErrorLedger {
    path: PathBuf,
    records: Mutex<Vec<ErrorRecord>>,
}

impl ErrorLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ErrorRecord>> {
        self.records.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Append a record.
    pub fn record(&self, kind: ErrorKind, details: Map<String, Value>, context: Option<RecordContext>) {
        tracing::warn!("error logged: {kind}");
        self.lock().push(ErrorRecord::new(kind, details, context));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of every record in the order they were appended.
    pub fn records(&self) -> Vec<ErrorRecord> {
        self.lock().clone()
    }

    /// Count of records per kind.
    pub fn summary(&self) -> BTreeMap<ErrorKind, usize> {
        let mut summary = BTreeMap::new();
        for record in self.lock().iter() {
            *summary.entry(record.kind).or_insert(0) += 1;
        }
        summary
    }

    /// Write all records as a pretty-printed JSON array.
    pub fn flush(&self) -> Result<FlushOutcome, TaggerError> {
        let records = self.records();
        if records.is_empty() {
            return Ok(FlushOutcome::Clean);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&records)
            .map_err(|e| TaggerError::Serialization(e.to_string()))?;
        std::fs::write(&self.path, json)?;

        tracing::info!(
            "error log saved to {} ({} record(s))",
            self.path.display(),
            records.len()
        );
        Ok(FlushOutcome::Written {
            path: self.path.clone(),
            count: records.len(),
        })
    }
}

/// Build a details mapping from key/value pairs.
pub fn details<I, K>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
