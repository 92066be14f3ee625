//! Partition-addressed measurement records.
//!
//! Each partition index owns one logical record set. Workers write to their
//! own partition only, so the store needs no cross-partition locking; readers
//! walk partitions in index order regardless of the order they completed in.
//! A scheduler run replaces a partition's set, so re-running a partition never
//! duplicates its records.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::domain::BoulderMeasurement;
use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record store I/O on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt record at '{}' line {line}: {reason}", path.display())]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::new(2, err.to_string())
    }
}

/// Appendable per-partition storage for boulder measurements.
pub trait MeasurementStore: Send + Sync {
    /// Append records to `partition`'s set.
    fn append(&self, partition: usize, records: &[BoulderMeasurement]) -> Result<(), StoreError>;

    /// Make `records` the whole of `partition`'s set. An empty slice removes it.
    fn replace(&self, partition: usize, records: &[BoulderMeasurement]) -> Result<(), StoreError>;

    /// Records of one partition, in append order. Unknown partitions are empty.
    fn read_partition(&self, partition: usize) -> Result<Vec<BoulderMeasurement>, StoreError>;

    /// Indices that have at least one record set, ascending.
    fn partitions(&self) -> Result<Vec<usize>, StoreError>;

    /// Every record, partition by partition in index order.
    fn read_all(&self) -> Result<Vec<BoulderMeasurement>, StoreError> {
        let mut out = Vec::new();
        for p in self.partitions()? {
            out.extend(self.read_partition(p)?);
        }
        Ok(out)
    }
}

/// JSON-lines files under one directory: `partition_000042.jsonl`.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

const PREFIX: &str = "partition_";
const SUFFIX: &str = ".jsonl";

impl DirectoryStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn partition_path(&self, partition: usize) -> PathBuf {
        self.root.join(format!("{PREFIX}{partition:06}{SUFFIX}"))
    }

    fn write_lines(path: &Path, file: File, records: &[BoulderMeasurement]) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut w = BufWriter::new(file);
        for r in records {
            let line = serde_json::to_string(r).map_err(|e| StoreError::Corrupt {
                path: path.to_path_buf(),
                line: 0,
                reason: e.to_string(),
            })?;
            writeln!(w, "{line}").map_err(io_err)?;
        }
        w.flush().map_err(io_err)
    }
}

impl MeasurementStore for DirectoryStore {
    fn append(&self, partition: usize, records: &[BoulderMeasurement]) -> Result<(), StoreError> {
        let path = self.partition_path(partition);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        Self::write_lines(&path, file, records)
    }

    fn replace(&self, partition: usize, records: &[BoulderMeasurement]) -> Result<(), StoreError> {
        let path = self.partition_path(partition);
        if records.is_empty() {
            return match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(StoreError::Io { path, source }),
            };
        }

        // Written beside the target and renamed, so readers never see a half set.
        let tmp = path.with_extension("jsonl.tmp");
        let file = File::create(&tmp).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        Self::write_lines(&tmp, file, records)?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io { path, source })
    }

    fn read_partition(&self, partition: usize) -> Result<Vec<BoulderMeasurement>, StoreError> {
        let path = self.partition_path(partition);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let mut out = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| StoreError::Corrupt {
                path: path.clone(),
                line: idx + 1,
                reason: e.to_string(),
            })?;
            out.push(record);
        }
        Ok(out)
    }

    fn partitions(&self) -> Result<Vec<usize>, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|source| StoreError::Io {
            path: self.root.clone(),
            source,
        })?;
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: self.root.clone(),
                source,
            })?;
            let name = entry.file_name();
            let index = name
                .to_str()
                .and_then(|n| n.strip_prefix(PREFIX))
                .and_then(|n| n.strip_suffix(SUFFIX))
                .and_then(|n| n.parse::<usize>().ok());
            if let Some(i) = index {
                out.push(i);
            }
        }
        out.sort_unstable();
        Ok(out)
    }
}

/// In-process store, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<BTreeMap<usize, Vec<BoulderMeasurement>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MeasurementStore for MemoryStore {
    fn append(&self, partition: usize, records: &[BoulderMeasurement]) -> Result<(), StoreError> {
        self.inner
            .lock()
            .entry(partition)
            .or_default()
            .extend_from_slice(records);
        Ok(())
    }

    fn replace(&self, partition: usize, records: &[BoulderMeasurement]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if records.is_empty() {
            inner.remove(&partition);
        } else {
            inner.insert(partition, records.to_vec());
        }
        Ok(())
    }

    fn read_partition(&self, partition: usize) -> Result<Vec<BoulderMeasurement>, StoreError> {
        Ok(self.inner.lock().get(&partition).cloned().unwrap_or_default())
    }

    fn partitions(&self) -> Result<Vec<usize>, StoreError> {
        Ok(self.inner.lock().keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: u64, partition: usize, d: f64) -> BoulderMeasurement {
        BoulderMeasurement {
            id,
            partition,
            x: id as f64,
            y: 0.5,
            diameter: d,
            flag: 1.0,
        }
    }

    fn exercise(store: &dyn MeasurementStore) {
        store.append(7, &[rec(1, 7, 1.25)]).unwrap();
        store.append(2, &[rec(2, 2, 0.5), rec(3, 2, 0.75)]).unwrap();
        store.append(7, &[rec(4, 7, 2.0)]).unwrap();

        assert_eq!(store.partitions().unwrap(), vec![2, 7]);
        assert!(store.read_partition(99).unwrap().is_empty());

        let ids: Vec<u64> = store.read_all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3, 1, 4]);

        store.replace(7, &[rec(9, 7, 3.0)]).unwrap();
        assert_eq!(store.read_partition(7).unwrap(), vec![rec(9, 7, 3.0)]);
        store.replace(7, &[rec(9, 7, 3.0)]).unwrap();
        assert_eq!(store.read_partition(7).unwrap().len(), 1);

        store.replace(2, &[]).unwrap();
        store.replace(40, &[]).unwrap();
        assert_eq!(store.partitions().unwrap(), vec![7]);
    }

    #[test]
    fn directory_store_reads_back_in_index_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::create(dir.path().join("frac_15")).unwrap();
        exercise(&store);

        let reopened = DirectoryStore::create(store.root()).unwrap();
        assert_eq!(reopened.read_partition(7).unwrap()[1], rec(4, 7, 2.0));
    }

    #[test]
    fn memory_store_reads_back_in_index_order() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn corrupt_lines_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::create(dir.path()).unwrap();
        fs::write(store.partition_path(3), "{\"id\": 1}\n").unwrap();
        let err = store.read_partition(3).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { line: 1, .. }));
    }
}
