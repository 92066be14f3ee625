//! Mutable state of one scheduler run.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::warn;

/// How one partition ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionStatus {
    Completed { measurements: usize },
    Blank,
    Failed,
}

/// Counters and timing of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub dispatched: usize,
    pub completed: usize,
    pub blank: usize,
    pub failed: usize,
    pub measurements: usize,
    /// Candidates dropped as cross-partition duplicates.
    pub duplicates: usize,
    pub started: DateTime<Local>,
    pub finished: DateTime<Local>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn elapsed_hours(&self) -> f64 {
        self.elapsed.as_secs_f64() / 3600.0
    }
}

/// Owned by the scheduler for the duration of one run and dropped with it.
///
/// Worker handles are kept by dispatch offset so the lagging partition can be
/// joined while later ones are still running.
#[derive(Debug)]
pub struct RunContext {
    started: DateTime<Local>,
    clock: Instant,
    handles: Vec<Option<JoinHandle<PartitionStatus>>>,
    completed: usize,
    blank: usize,
    failed: usize,
    measurements: usize,
}

impl RunContext {
    pub fn new(expected: usize) -> Self {
        Self {
            started: Local::now(),
            clock: Instant::now(),
            handles: Vec::with_capacity(expected),
            completed: 0,
            blank: 0,
            failed: 0,
            measurements: 0,
        }
    }

    /// Record a dispatched worker at the next offset.
    pub fn push(&mut self, handle: JoinHandle<PartitionStatus>) {
        self.handles.push(Some(handle));
    }

    /// Record a partition that never got a worker.
    pub fn push_failed(&mut self) {
        self.handles.push(None);
        self.failed += 1;
    }

    pub fn dispatched(&self) -> usize {
        self.handles.len()
    }

    /// Block until the worker at `offset` is done. Joining twice is a no-op.
    pub fn join(&mut self, offset: usize) {
        let Some(handle) = self.handles.get_mut(offset).and_then(Option::take) else {
            return;
        };
        let name = handle.thread().name().unwrap_or("partition").to_string();
        match handle.join() {
            Ok(status) => self.record(status),
            Err(_) => {
                warn!(worker = %name, "partition worker panicked");
                self.failed += 1;
            }
        }
    }

    pub fn join_all(&mut self) {
        for offset in 0..self.handles.len() {
            self.join(offset);
        }
    }

    fn record(&mut self, status: PartitionStatus) {
        match status {
            PartitionStatus::Completed { measurements } => {
                self.completed += 1;
                self.measurements += measurements;
            }
            PartitionStatus::Blank => self.blank += 1,
            PartitionStatus::Failed => self.failed += 1,
        }
    }

    /// Join anything still outstanding and close the run.
    pub fn finish(mut self, duplicates: usize) -> RunReport {
        self.join_all();
        RunReport {
            dispatched: self.handles.len(),
            completed: self.completed,
            blank: self.blank,
            failed: self.failed,
            measurements: self.measurements,
            duplicates,
            started: self.started,
            finished: Local::now(),
            elapsed: self.clock.elapsed(),
        }
    }
}
