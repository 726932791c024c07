//! Result cache collaborator.
//!
//! Evaluations are keyed by their `EvaluationKey` (BLAKE3 over dataset hash,
//! policy, plan and seed). `JsonlResultCache` persists one JSON object per
//! line; `NoopSink` stands in when no cache is configured.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use ratelab_core::domain::DatasetHash;
use ratelab_core::fingerprint::EvaluationKey;
use ratelab_core::{BacktestPlan, RatingPolicy};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O: {0}")]
    Io(#[from] io::Error),

    #[error("cache serialization: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("cache lock poisoned")]
    Poisoned,
}

/// One evaluated parameter set and its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub key: EvaluationKey,
    pub dataset_hash: DatasetHash,
    pub seed: u64,
    pub policy: RatingPolicy,
    pub plan: BacktestPlan,
    pub errors: Vec<f64>,
    pub fitness: f64,
    pub recorded_at: DateTime<Utc>,
}

impl CacheRecord {
    /// Flat row: policy genome, plan genome, then the per-season errors.
    pub fn to_row(&self) -> Vec<f64> {
        let mut row = self.policy.encode();
        row.extend(self.plan.encode());
        row.extend_from_slice(&self.errors);
        row
    }
}

/// Where evaluation results go. Implementations must tolerate concurrent
/// calls from a thread pool.
pub trait ResultSink: Send + Sync {
    fn lookup(&self, key: &EvaluationKey) -> Result<Option<CacheRecord>, CacheError>;
    fn insert(&self, record: &CacheRecord) -> Result<(), CacheError>;
}

/// Cache that stores nothing and never hits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ResultSink for NoopSink {
    fn lookup(&self, _key: &EvaluationKey) -> Result<Option<CacheRecord>, CacheError> {
        Ok(None)
    }

    fn insert(&self, _record: &CacheRecord) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Append-only JSONL cache with an in-memory index.
#[derive(Debug)]
pub struct JsonlResultCache {
    path: PathBuf,
    index: Mutex<HashMap<EvaluationKey, CacheRecord>>,
}

impl JsonlResultCache {
    /// Open (or create on first insert) the cache at `path`, indexing any
    /// existing records. Malformed lines are skipped.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        let mut index = HashMap::new();

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let mut skipped = 0usize;
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<CacheRecord>(&line) {
                    Ok(record) => {
                        index.insert(record.key.clone(), record);
                    }
                    Err(_) => skipped += 1,
                }
            }
            if skipped > 0 {
                warn!(path = %path.display(), skipped, "skipped malformed cache lines");
            }
        }
        debug!(path = %path.display(), records = index.len(), "result cache opened");

        Ok(Self {
            path,
            index: Mutex::new(index),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.index.lock().map(|index| index.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All indexed records, ordered by time recorded.
    pub fn records(&self) -> Result<Vec<CacheRecord>, CacheError> {
        let index = self.index.lock().map_err(|_| CacheError::Poisoned)?;
        let mut records: Vec<CacheRecord> = index.values().cloned().collect();
        records.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then(a.key.0.cmp(&b.key.0)));
        Ok(records)
    }
}

impl ResultSink for JsonlResultCache {
    fn lookup(&self, key: &EvaluationKey) -> Result<Option<CacheRecord>, CacheError> {
        let index = self.index.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(index.get(key).cloned())
    }

    fn insert(&self, record: &CacheRecord) -> Result<(), CacheError> {
        let json = serde_json::to_string(record)?;
        // The lock also serialises appends to the file.
        let mut index = self.index.lock().map_err(|_| CacheError::Poisoned)?;
        if index.contains_key(&record.key) {
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{json}")?;
        file.flush()?;

        index.insert(record.key.clone(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(seed: u64) -> CacheRecord {
        let dataset_hash = DatasetHash::from_hash("dataset");
        let policy = RatingPolicy::default();
        let plan = BacktestPlan::default();
        CacheRecord {
            key: EvaluationKey::compute(&dataset_hash, &policy, &plan, seed),
            dataset_hash,
            seed,
            policy,
            plan,
            errors: vec![0.61, 0.59],
            fitness: 0.6,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn noop_never_hits() {
        let sink = NoopSink;
        let r = record(1);
        sink.insert(&r).unwrap();
        assert!(sink.lookup(&r.key).unwrap().is_none());
    }

    #[test]
    fn insert_then_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.jsonl");

        let cache = JsonlResultCache::open(&path).unwrap();
        assert!(cache.is_empty());
        let r = record(1);
        cache.insert(&r).unwrap();
        cache.insert(&r).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup(&r.key).unwrap(), Some(r.clone()));

        let reopened = JsonlResultCache::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.lookup(&r.key).unwrap(), Some(r));
    }

    #[test]
    fn records_come_back_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let cache = JsonlResultCache::open(&path).unwrap();
        assert!(cache.records().unwrap().is_empty());

        let newer = record(1);
        let older = CacheRecord {
            recorded_at: newer.recorded_at - chrono::Duration::seconds(60),
            ..record(2)
        };
        cache.insert(&newer).unwrap();
        cache.insert(&older).unwrap();

        let seeds: Vec<u64> = cache.records().unwrap().iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![2, 1]);

        let reopened = JsonlResultCache::open(&path).unwrap();
        assert_eq!(reopened.records().unwrap(), cache.records().unwrap());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let good = serde_json::to_string(&record(3)).unwrap();
        fs::write(&path, format!("not json\n\n{good}\n")).unwrap();

        let cache = JsonlResultCache::open(&path).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn row_is_flat_parameters_then_errors() {
        let r = record(1);
        let row = r.to_row();
        assert_eq!(row.len(), 7 + 9 + 2);
        assert_eq!(row[0], r.policy.k_factor);
        assert_eq!(row[row.len() - 1], 0.59);
    }
}
