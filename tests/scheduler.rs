mod common;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::sites::write_shadows;
use parking_lot::Mutex;
use rock_abundance::app::pipeline::{run_partitions, PartitionRunConfig};
use rock_abundance::domain::{ImagePartition, LoadOptions, SchedulerConfig};
use rock_abundance::io::{load_dataset, DirectoryStore, MeasurementStore, MemoryStore};
use rock_abundance::scheduler::{
    DirectoryRunParams, FileDetector, PartitionDetector, PartitionScheduler, RunParams,
    SegmentOutcome, ShadowCandidate,
};

const LIMIT: usize = 4;

/// Records how many partitions are in flight and which have finished.
#[derive(Default)]
struct Instrumented {
    active: AtomicUsize,
    max_active: AtomicUsize,
    done: Mutex<HashSet<usize>>,
    violations: Mutex<Vec<String>>,
}

impl PartitionDetector for Instrumented {
    type Segment = ();

    fn segment(&self, partition: &ImagePartition, _boundary_fraction: f64) -> SegmentOutcome<()> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        let j = partition.index;
        // Dispatching j follows the join of j - LIMIT - 1 once j > LIMIT + 1.
        if j > LIMIT + 1 && !self.done.lock().contains(&(j - LIMIT - 1)) {
            self.violations
                .lock()
                .push(format!("partition {j} started before {} finished", j - LIMIT - 1));
        }
        thread::sleep(Duration::from_millis(2 + (j % 3) as u64));
        SegmentOutcome::Ready(())
    }

    fn detect(&self, partition: &ImagePartition, _segment: ()) -> Result<Vec<ShadowCandidate>, String> {
        let candidate = ShadowCandidate {
            x: partition.index as f64 * 100.0,
            y: 0.0,
            diameter: 1.0,
            flag: 1.0,
        };
        self.done.lock().insert(partition.index);
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![candidate])
    }
}

#[test]
fn dispatch_stays_within_the_window() {
    let detector = Arc::new(Instrumented::default());
    let store = Arc::new(MemoryStore::new());
    let config = SchedulerConfig {
        thread_limit: LIMIT,
        ..Default::default()
    };
    let scheduler = PartitionScheduler::new(
        config,
        Arc::clone(&detector),
        Arc::clone(&store) as Arc<dyn MeasurementStore>,
    )
    .unwrap();
    let params = RunParams {
        file_name: "P".into(),
        image_id: "P".into(),
        root: "unused".into(),
        partitions: 50,
        partition_area: Some(1.0),
    };

    let report = scheduler.run(&params).unwrap();

    assert_eq!(report.dispatched, 50);
    assert_eq!(report.completed, 50);
    assert_eq!(report.measurements, 50);
    assert!(detector.max_active.load(Ordering::SeqCst) <= LIMIT);
    assert_eq!(detector.active.load(Ordering::SeqCst), 0);
    let violations = detector.violations.lock().clone();
    assert!(violations.is_empty(), "{violations:?}");

    let records = store.read_all().unwrap();
    let ids: HashSet<u64> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids.len(), 50);
    assert_eq!(store.partitions().unwrap(), (0..50).collect::<Vec<_>>());
}

/// Three partitions under `<dir>/images/ESP`; the middle one is blank and
/// the outer two share one boulder across their boundary.
fn esp_images(dir: &Path) -> PathBuf {
    let images = dir.join("images");
    let root = images.join("ESP");
    fs::create_dir_all(&root).unwrap();

    write_shadows(&root, "ESP0", &[(10.0, 10.0, 1.0), (40.0, 5.0, 0.8)]);
    write_shadows(&root, "ESP1", &[]);
    write_shadows(&root, "ESP2", &[(10.2, 10.0, 1.1), (90.0, 90.0, 2.0)]);
    fs::write(
        root.join("ESP_params.json"),
        r#"{"image_id": "ESP_011605_1170", "partition_area": 100.0}"#,
    )
    .unwrap();
    images
}

fn esp_config(dir: &Path, gis: &Path) -> PartitionRunConfig {
    PartitionRunConfig {
        name: "ESP".into(),
        store_root: dir.join("store"),
        scheduler: SchedulerConfig::default(),
        fracs: vec![15.0],
        export_gis: Some(gis.to_path_buf()),
    }
}

#[test]
fn directory_run_merges_overlaps_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let images = esp_images(dir.path());
    let gis = dir.path().join("gis.csv");
    let cfg = esp_config(dir.path(), &gis);
    let runs = run_partitions(&cfg, &DirectoryRunParams::new(&images), Arc::new(FileDetector)).unwrap();
    assert_eq!(runs.len(), 1);

    let run = &runs[0];
    assert_eq!(run.params.image_id, "ESP_011605_1170");
    assert_eq!((run.report.completed, run.report.blank, run.report.failed), (2, 1, 0));
    assert_eq!(run.report.measurements, 3);
    assert_eq!(run.report.duplicates, 1);
    assert_eq!(run.store_dir, dir.path().join("store").join("frac_15"));
    let info = fs::read_to_string(&run.run_info).unwrap();
    assert!(info.contains("Image ID: ESP_011605_1170"));
    assert!(info.contains("Overlap duplicates dropped: 1"));
    assert_eq!(run.gis, Some((gis.clone(), 3)));

    let exported = load_dataset(&gis, &LoadOptions::default()).unwrap();
    assert_eq!(exported.len(), 3);
    assert_eq!(exported.area, 300.0);
}

#[test]
fn running_into_the_same_store_twice_keeps_one_copy() {
    let dir = tempfile::tempdir().unwrap();
    let images = esp_images(dir.path());
    let gis = dir.path().join("gis.csv");
    let cfg = esp_config(dir.path(), &gis);
    let source = DirectoryRunParams::new(&images);

    let first = run_partitions(&cfg, &source, Arc::new(FileDetector)).unwrap();
    let before = load_dataset(&gis, &LoadOptions::default()).unwrap();

    let second = run_partitions(&cfg, &source, Arc::new(FileDetector)).unwrap();
    let after = load_dataset(&gis, &LoadOptions::default()).unwrap();

    assert_eq!(first[0].gis.as_ref().map(|g| g.1), Some(3));
    assert_eq!(second[0].gis.as_ref().map(|g| g.1), Some(3));
    assert_eq!(before.len(), after.len());
    // Which side of the shared boulder survives depends on worker timing.
    for d in [0.8, 2.0] {
        assert_eq!(after.diameters.iter().filter(|&&x| x == d).count(), 1);
    }

    let store = DirectoryStore::create(&second[0].store_dir).unwrap();
    let ids: HashSet<u64> = store.read_all().unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids.len(), 3);
}
