//! Bounded-concurrency partition scheduler.
//!
//! One OS thread per partition, with two bounds:
//!
//! - at most `thread_limit` workers hold a [`Permit`] at any instant; the
//!   dispatcher blocks on the semaphore rather than polling
//! - after dispatching offset `i > thread_limit` the dispatcher joins offset
//!   `i - thread_limit`, so dispatch never runs far ahead of completion
//!
//! Workers share exactly one lock, around the [`OverlapLedger`]. Segmentation
//! and detection run outside it.

pub mod context;
pub mod detector;
pub mod ledger;
pub mod params;
pub mod permits;

pub use context::*;
pub use detector::*;
pub use ledger::*;
pub use params::*;
pub use permits::*;

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{BoulderMeasurement, ImagePartition, SchedulerConfig};
use crate::error::AppError;
use crate::io::MeasurementStore;

/// Progress is logged every this many partitions.
const PROGRESS_EVERY: usize = 200;

pub struct PartitionScheduler<D: PartitionDetector> {
    config: SchedulerConfig,
    detector: Arc<D>,
    store: Arc<dyn MeasurementStore>,
}

impl<D: PartitionDetector> PartitionScheduler<D> {
    /// Fails with exit code 2 on a malformed config.
    pub fn new(
        config: SchedulerConfig,
        detector: Arc<D>,
        store: Arc<dyn MeasurementStore>,
    ) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self {
            config,
            detector,
            store,
        })
    }

    /// Process partitions `start_at..params.partitions`, each exactly once.
    ///
    /// Returns after every dispatched worker has finished. Partition-level
    /// failures are counted in the report, never returned; only an unreadable
    /// record store fails the run, before anything is dispatched.
    ///
    /// Each processed partition's record set is replaced, so running over a
    /// store again leaves one copy of every measurement.
    pub fn run(&self, params: &RunParams) -> Result<RunReport, AppError> {
        let limit = self.config.thread_limit;
        let start = self.config.start_at;
        let total = params.partitions.saturating_sub(start);
        info!(
            name = %params.file_name,
            partitions = total,
            start_at = start,
            thread_limit = limit,
            boundary_fraction = self.config.boundary_fraction,
            "starting partition run"
        );

        let ledger = Arc::new(Mutex::new(self.seeded_ledger(params)?));
        let permits = WorkerPermits::new(limit);
        let mut ctx = RunContext::new(total);

        for (offset, index) in (start..params.partitions).enumerate() {
            let permit = permits.acquire();
            let worker = Worker {
                detector: Arc::clone(&self.detector),
                store: Arc::clone(&self.store),
                ledger: Arc::clone(&ledger),
                boundary_fraction: self.config.boundary_fraction,
            };
            let partition = params.partition(index);

            let spawned = thread::Builder::new()
                .name(format!("partition-{index}"))
                .spawn(move || {
                    let _permit = permit;
                    worker.process(&partition)
                });
            match spawned {
                Ok(handle) => ctx.push(handle),
                Err(e) => {
                    warn!(partition = index, error = %e, "failed to spawn worker");
                    ctx.push_failed();
                }
            }

            if offset > limit {
                let lagging = offset - limit;
                ctx.join(lagging);
                if lagging % PROGRESS_EVERY == 0 {
                    info!(partition = start + lagging, "completed partition");
                }
            }
        }

        let report = ctx.finish(ledger.lock().duplicates());
        info!(
            completed = report.completed,
            blank = report.blank,
            failed = report.failed,
            measurements = report.measurements,
            duplicates = report.duplicates,
            hours = report.elapsed_hours(),
            "partition run finished"
        );
        Ok(report)
    }

    /// Fresh ledger for one run. Records already in the store keep their ids
    /// reserved; those outside the re-run range also keep their claims.
    fn seeded_ledger(&self, params: &RunParams) -> Result<OverlapLedger, AppError> {
        let mut ledger = OverlapLedger::new(self.config.overlap_tolerance);
        let rerun = self.config.start_at..params.partitions;
        let existing = self.store.read_all()?;
        for record in &existing {
            ledger.restore(record, !rerun.contains(&record.partition));
        }
        if !existing.is_empty() {
            info!(
                records = existing.len(),
                next_id = ledger.issued(),
                "store already holds records"
            );
        }
        Ok(ledger)
    }
}

/// What one worker thread needs, cloned per dispatch.
struct Worker<D> {
    detector: Arc<D>,
    store: Arc<dyn MeasurementStore>,
    ledger: Arc<Mutex<OverlapLedger>>,
    boundary_fraction: f64,
}

impl<D: PartitionDetector> Worker<D> {
    fn process(&self, partition: &ImagePartition) -> PartitionStatus {
        let (status, records) = match self.segment_and_detect(partition) {
            Ok(records) => (
                PartitionStatus::Completed {
                    measurements: records.len(),
                },
                records,
            ),
            Err(status) => (status, Vec::new()),
        };

        // Blank and failed partitions clear whatever an earlier run left.
        let status = match self.store.replace(partition.index, &records) {
            Ok(()) => status,
            Err(e) => {
                warn!(partition = partition.index, error = %e, "failed to persist measurements");
                PartitionStatus::Failed
            }
        };
        if partition.index % PROGRESS_EVERY == 0 {
            info!(partition = partition.index, ?status, "done with partition");
        }
        status
    }

    fn segment_and_detect(
        &self,
        partition: &ImagePartition,
    ) -> Result<Vec<BoulderMeasurement>, PartitionStatus> {
        let segment = match self.detector.segment(partition, self.boundary_fraction) {
            SegmentOutcome::Ready(s) => s,
            SegmentOutcome::Blank => return Err(PartitionStatus::Blank),
            SegmentOutcome::Failed(reason) => {
                warn!(partition = partition.index, %reason, "segmentation failed, skipping");
                return Err(PartitionStatus::Failed);
            }
        };

        let candidates = self.detector.detect(partition, segment).map_err(|reason| {
            warn!(partition = partition.index, %reason, "detection failed, skipping");
            PartitionStatus::Failed
        })?;

        let records = self.ledger.lock().resolve(partition.index, &candidates);
        debug!(
            partition = partition.index,
            candidates = candidates.len(),
            kept = records.len(),
            "overlap resolved"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryStore;
    use std::path::PathBuf;

    /// Partition `i` yields one boulder at `(i, 0)`; every fifth fails to segment.
    struct GridDetector;

    impl PartitionDetector for GridDetector {
        type Segment = usize;

        fn segment(&self, p: &ImagePartition, _frac: f64) -> SegmentOutcome<usize> {
            match p.index % 5 {
                4 => SegmentOutcome::Failed("bad panel".into()),
                3 => SegmentOutcome::Blank,
                _ => SegmentOutcome::Ready(p.index),
            }
        }

        fn detect(&self, _p: &ImagePartition, i: usize) -> Result<Vec<ShadowCandidate>, String> {
            Ok(vec![ShadowCandidate {
                x: i as f64 * 10.0,
                y: 0.0,
                diameter: 1.0 + i as f64 / 100.0,
                flag: 1.0,
            }])
        }
    }

    fn params(partitions: usize) -> RunParams {
        RunParams {
            file_name: "T".into(),
            image_id: "T".into(),
            root: PathBuf::from("/tmp"),
            partitions,
            partition_area: Some(1.0),
        }
    }

    #[test]
    fn failures_are_counted_not_fatal() {
        let store = Arc::new(MemoryStore::new());
        let config = SchedulerConfig {
            thread_limit: 3,
            ..Default::default()
        };
        let sched = PartitionScheduler::new(config, Arc::new(GridDetector), store.clone()).unwrap();
        let report = sched.run(&params(20)).unwrap();

        assert_eq!(report.dispatched, 20);
        assert_eq!(report.failed, 4);
        assert_eq!(report.blank, 4);
        assert_eq!(report.completed, 12);
        assert_eq!(report.measurements, 12);

        let all = store.read_all().unwrap();
        assert_eq!(all.len(), 12);
        let mut ids: Vec<u64> = all.iter().map(|m| m.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..12).collect::<Vec<u64>>());
        assert!(all.windows(2).all(|w| w[0].partition < w[1].partition));
    }

    #[test]
    fn start_at_skips_earlier_partitions() {
        let store = Arc::new(MemoryStore::new());
        let config = SchedulerConfig {
            thread_limit: 2,
            start_at: 15,
            ..Default::default()
        };
        let sched = PartitionScheduler::new(config, Arc::new(GridDetector), store.clone()).unwrap();
        let report = sched.run(&params(20)).unwrap();
        assert_eq!(report.dispatched, 5);
        assert_eq!(store.partitions().unwrap(), vec![15, 16, 17]);
    }

    #[test]
    fn rerunning_replaces_records_and_keeps_ids_unique() {
        let store = Arc::new(MemoryStore::new());
        let config = SchedulerConfig {
            thread_limit: 3,
            ..Default::default()
        };
        let sched = PartitionScheduler::new(config, Arc::new(GridDetector), store.clone()).unwrap();
        sched.run(&params(20)).unwrap();
        let first = store.read_all().unwrap();

        let report = sched.run(&params(20)).unwrap();
        assert_eq!(report.measurements, 12);
        let second = store.read_all().unwrap();
        assert_eq!(second.len(), first.len());
        assert!(second.iter().all(|m| m.id >= 12));

        let resume = SchedulerConfig {
            start_at: 10,
            ..config
        };
        let resumed = PartitionScheduler::new(resume, Arc::new(GridDetector), store.clone()).unwrap();
        resumed.run(&params(20)).unwrap();
        let third = store.read_all().unwrap();
        assert_eq!(third.len(), 12);
        let ids: std::collections::HashSet<u64> = third.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), 12);
    }

    #[test]
    fn zero_thread_limit_is_fatal() {
        let config = SchedulerConfig {
            thread_limit: 0,
            ..Default::default()
        };
        let err = PartitionScheduler::new(config, Arc::new(GridDetector), Arc::new(MemoryStore::new()))
            .err()
            .unwrap();
        assert_eq!(err.exit_code(), 2);
    }
}
