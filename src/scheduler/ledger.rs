//! Cross-partition bookkeeping: the only state workers share.
//!
//! Held behind one run-wide lock. Workers take it only for overlap
//! resolution, after their own detection has finished.

use std::collections::HashMap;

use crate::domain::BoulderMeasurement;
use crate::scheduler::detector::ShadowCandidate;

#[derive(Debug, Clone, Copy)]
struct Claim {
    partition: usize,
    x: f64,
    y: f64,
}

/// Global id counter plus the centres already claimed by some partition.
#[derive(Debug)]
pub struct OverlapLedger {
    next_id: u64,
    tolerance: f64,
    cell: f64,
    claims: HashMap<(i64, i64), Vec<Claim>>,
    duplicates: usize,
}

impl OverlapLedger {
    /// `tolerance` is the largest centre distance (m) at which detections
    /// from two different partitions count as the same boulder.
    pub fn new(tolerance: f64) -> Self {
        Self {
            next_id: 0,
            tolerance,
            cell: tolerance.max(1e-6),
            claims: HashMap::new(),
            duplicates: 0,
        }
    }

    /// Next globally unique boulder id.
    pub fn assign_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.next_id
    }

    /// Candidates dropped as duplicates so far.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Register a record persisted by an earlier run. Its id is never issued
    /// again; with `claim` set its centre keeps blocking duplicates.
    pub fn restore(&mut self, record: &BoulderMeasurement, claim: bool) {
        self.next_id = self.next_id.max(record.id + 1);
        if claim {
            self.add_claim(record.partition, record.x, record.y);
        }
    }

    /// Keep the candidates no other partition has claimed, giving each an id.
    ///
    /// Detections within one partition never deduplicate each other.
    pub fn resolve(
        &mut self,
        partition: usize,
        candidates: &[ShadowCandidate],
    ) -> Vec<BoulderMeasurement> {
        let mut kept = Vec::with_capacity(candidates.len());
        for c in candidates {
            if self.claimed_elsewhere(partition, c.x, c.y) {
                self.duplicates += 1;
                continue;
            }
            self.add_claim(partition, c.x, c.y);
            kept.push(BoulderMeasurement {
                id: self.assign_id(),
                partition,
                x: c.x,
                y: c.y,
                diameter: c.diameter,
                flag: c.flag,
            });
        }
        kept
    }

    fn add_claim(&mut self, partition: usize, x: f64, y: f64) {
        let key = self.key(x, y);
        self.claims.entry(key).or_default().push(Claim { partition, x, y });
    }

    fn key(&self, x: f64, y: f64) -> (i64, i64) {
        ((x / self.cell).floor() as i64, (y / self.cell).floor() as i64)
    }

    fn claimed_elsewhere(&self, partition: usize, x: f64, y: f64) -> bool {
        let (cx, cy) = self.key(x, y);
        let tol2 = self.tolerance * self.tolerance;
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(cell) = self.claims.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                let hit = cell.iter().any(|c| {
                    c.partition != partition && (c.x - x).powi(2) + (c.y - y).powi(2) <= tol2
                });
                if hit {
                    return true;
                }
            }
        }
        false
    }
}
