use std::fs;
use std::path::{Path, PathBuf};

/// Writes a `diameter,flag,area` site file with the area repeated per row.
pub fn write_site(dir: &Path, name: &str, diameters: &[f64], area: f64) -> PathBuf {
    let mut body = String::from("diameter,flag,area\n");
    for d in diameters {
        body.push_str(&format!("{d},1,{area}\n"));
    }
    let path = dir.join(name);
    fs::write(&path, body).expect("write site csv");
    path
}

/// Writes a precomputed shadow file `<root>/<stem>_shadows.csv`.
pub fn write_shadows(root: &Path, stem: &str, rows: &[(f64, f64, f64)]) -> PathBuf {
    let mut body = String::from("x,y,diameter\n");
    for (x, y, d) in rows {
        body.push_str(&format!("{x},{y},{d}\n"));
    }
    let path = root.join(format!("{stem}_shadows.csv"));
    fs::write(&path, body).expect("write shadow csv");
    path
}

/// Diameters whose cumulative area roughly follows an exponential CFA.
pub fn graded_diameters(count: usize, largest: f64) -> Vec<f64> {
    (0..count)
        .map(|i| 0.45 + (largest - 0.45) * ((i as f64 + 1.0) / count as f64).powi(3))
        .collect()
}
