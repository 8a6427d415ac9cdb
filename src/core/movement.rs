use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::frame_table::{FrameTable, Hand};
use crate::mesh::{self, obj, Vertex};
use crate::shared::constants;

/// `<frame_i>_<frame_i+1>.txt`
pub fn pair_file_name(first: &str, second: &str) -> String {
    format!("{}_{}.{}", first, second, constants::PAIR_EXTENSION)
}

#[derive(Debug, Clone, Serialize)]
pub struct MovementSummary {
    pub frames: usize,
    pub skipped_frames: Vec<String>,
    pub pair_files: Vec<PathBuf>,
}

/// Parsed meshes keyed by frame index and hand.
///
/// Pairs walk the table front to back, so entries below the current pair are
/// evicted as it advances.
#[derive(Default)]
struct MeshCache {
    loaded: HashMap<(usize, Hand), Rc<[Vertex]>>,
}

impl MeshCache {
    fn get(&mut self, index: usize, hand: Hand, path: &Path) -> Result<Rc<[Vertex]>> {
        if let Some(vertices) = self.loaded.get(&(index, hand)) {
            return Ok(Rc::clone(vertices));
        }
        let vertices: Rc<[Vertex]> = obj::load_vertices(path)?.into();
        self.loaded.insert((index, hand), Rc::clone(&vertices));
        Ok(vertices)
    }

    fn evict_before(&mut self, index: usize) {
        self.loaded.retain(|&(i, _), _| i >= index);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.loaded.len()
    }
}

/// Delete pair files left in `dir` by an earlier run.
fn remove_stale_pairs(dir: &Path) -> Result<()> {
    let stale = super::tensor::list_pair_files(dir)?;
    for path in &stale {
        fs::remove_file(path).with_context(|| format!("Failed to remove stale pair file {:?}", path))?;
    }
    if !stale.is_empty() {
        crate::utils::logger::debug(&format!("removed {} stale pair file(s) from {:?}", stale.len(), dir));
    }
    Ok(())
}

/// Write one displacement file per adjacent frame pair of `source_dir` into `output_dir`.
pub fn calculate_movement_vectors(source_dir: &Path, output_dir: &Path) -> Result<MovementSummary> {
    let table = FrameTable::scan(source_dir)?;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;
    remove_stale_pairs(output_dir)?;

    crate::utils::logger::info(&format!(
        "building movement vectors: {} usable frame(s) in {:?}",
        table.len(),
        source_dir
    ));
    crate::utils::logger::debug(&format!("frame order: {:?}", table.numbers().collect::<Vec<_>>()));

    let mut cache = MeshCache::default();
    let mut pair_files = Vec::with_capacity(table.len().saturating_sub(1));

    for (i, pair) in table.frames().windows(2).enumerate() {
        let vectors = pair_vectors(&table, i, &mut cache)?;
        let path = output_dir.join(pair_file_name(&pair[0].number, &pair[1].number));
        write_vectors(&path, &vectors)?;
        crate::utils::logger::debug(&format!("{:?}: {} vectors", path, vectors.len()));
        pair_files.push(path);
        cache.evict_before(i + 1);
    }

    Ok(MovementSummary {
        frames: table.len(),
        skipped_frames: table.skipped().to_vec(),
        pair_files,
    })
}

/// Displacements from frame `index` to `index + 1`, right hand then left.
fn pair_vectors(table: &FrameTable, index: usize, cache: &mut MeshCache) -> Result<Vec<Vertex>> {
    let mut vectors = Vec::new();

    for hand in Hand::PAIR_ORDER {
        let (from_idx, from_path) = table.nearest_mesh(index, hand)?;
        let (to_idx, to_path) = table.nearest_mesh(index + 1, hand)?;
        if from_idx != index || to_idx != index + 1 {
            crate::utils::logger::debug(&format!(
                "{} hand for pair {}->{} borrowed from frames {}->{}",
                hand,
                index,
                index + 1,
                from_idx,
                to_idx
            ));
        }

        let from = cache.get(from_idx, hand, from_path)?;
        let to = cache.get(to_idx, hand, to_path)?;
        vectors.extend(mesh::displacements(&from, &to));
    }

    Ok(vectors)
}

fn write_vectors(path: &Path, vectors: &[Vertex]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut out = BufWriter::new(file);
    for [dx, dy, dz] in vectors {
        writeln!(out, "{:?} {:?} {:?}", dx, dy, dz)?;
    }
    out.flush().with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MotionError;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hand_motion_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_mesh(dir: &Path, stem: &str, vertices: &[Vertex]) {
        let mut text = String::from("# test mesh\n");
        for [x, y, z] in vertices {
            text.push_str(&format!("v {} {} {}\n", x, y, z));
        }
        text.push_str("f 1 2 3\n");
        fs::write(dir.join(format!("{}.obj", stem)), text).unwrap();
    }

    fn shifted(base: f64) -> Vec<Vertex> {
        (0..4).map(|i| [base + i as f64, base * 2.0, -base]).collect()
    }

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
    }

    #[test]
    fn pair_names_join_frame_numbers() {
        assert_eq!(pair_file_name("0001", "0002"), "0001_0002.txt");
    }

    #[test]
    fn full_frames_give_two_hands_of_vectors() {
        let dir = scratch("full");
        for (frame, base) in [("0001", 0.0), ("0002", 1.0), ("0003", 3.0)] {
            write_mesh(&dir, &format!("frame-{}_0", frame), &shifted(base));
            write_mesh(&dir, &format!("frame-{}_1", frame), &shifted(base * 10.0));
        }

        let summary = calculate_movement_vectors(&dir, &dir).unwrap();
        assert_eq!(summary.frames, 3);
        let names: Vec<String> = summary
            .pair_files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["0001_0002.txt", "0002_0003.txt"]);

        let lines = read_lines(&dir.join("0001_0002.txt"));
        assert_eq!(lines.len(), 2 * 4);
        // right hand first: base 0 -> 10
        assert_eq!(lines[0], "10.0 20.0 -10.0");
        // then left hand: base 0 -> 1
        assert_eq!(lines[4], "1.0 2.0 -1.0");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_hand_is_borrowed_from_neighbour() {
        let dir = scratch("borrow");
        write_mesh(&dir, "frame-0001_0", &shifted(0.0));
        write_mesh(&dir, "frame-0001_1", &shifted(0.0));
        write_mesh(&dir, "frame-0002_1", &shifted(1.0));

        calculate_movement_vectors(&dir, &dir).unwrap();
        let lines = read_lines(&dir.join("0001_0002.txt"));
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "1.0 2.0 -1.0");
        // left hand of 0002 comes from 0001, so it did not move
        for line in &lines[4..] {
            assert_eq!(line, "0.0 0.0 0.0");
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn forward_neighbour_wins_tie() {
        let dir = scratch("tie");
        // left hand missing at 0002; 0001 and 0003 are both one step away
        write_mesh(&dir, "frame-0001_0", &shifted(0.0));
        write_mesh(&dir, "frame-0001_1", &shifted(0.0));
        write_mesh(&dir, "frame-0002_1", &shifted(0.0));
        write_mesh(&dir, "frame-0003_0", &shifted(5.0));
        write_mesh(&dir, "frame-0003_1", &shifted(0.0));

        calculate_movement_vectors(&dir, &dir).unwrap();
        let first = read_lines(&dir.join("0001_0002.txt"));
        assert_eq!(first[4], "5.0 10.0 -5.0");
        let second = read_lines(&dir.join("0002_0003.txt"));
        assert_eq!(second[4], "0.0 0.0 0.0");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn hand_missing_two_frames_ahead_is_found() {
        let dir = scratch("ahead");
        write_mesh(&dir, "frame-0001_1", &shifted(0.0));
        write_mesh(&dir, "frame-0002_1", &shifted(0.0));
        write_mesh(&dir, "frame-0003_0", &shifted(2.0));
        write_mesh(&dir, "frame-0003_1", &shifted(0.0));

        calculate_movement_vectors(&dir, &dir).unwrap();
        // both ends of 0001_0002 borrow the left hand of 0003
        let lines = read_lines(&dir.join("0001_0002.txt"));
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[4], "0.0 0.0 0.0");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn faulty_frame_is_not_paired() {
        let dir = scratch("faulty");
        for frame in ["0001", "0002", "0003"] {
            write_mesh(&dir, &format!("frame-{}_0", frame), &shifted(0.0));
            write_mesh(&dir, &format!("frame-{}_1", frame), &shifted(0.0));
        }
        write_mesh(&dir, "frame-0002_2", &shifted(0.0));

        let summary = calculate_movement_vectors(&dir, &dir).unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.skipped_frames, vec!["0002".to_string()]);
        assert!(dir.join("0001_0003.txt").exists());
        assert!(!dir.join("0001_0002.txt").exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn hand_absent_everywhere_is_an_error() {
        let dir = scratch("absent");
        write_mesh(&dir, "frame-0001_1", &shifted(0.0));
        write_mesh(&dir, "frame-0002_1", &shifted(1.0));

        let err = calculate_movement_vectors(&dir, &dir).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MotionError>(),
            Some(MotionError::NoHandData { hand: Hand::Left, .. })
        ));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn single_frame_writes_nothing() {
        let dir = scratch("single");
        write_mesh(&dir, "frame-0001_0", &shifted(0.0));

        let summary = calculate_movement_vectors(&dir, &dir).unwrap();
        assert_eq!(summary.frames, 1);
        assert!(summary.pair_files.is_empty());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rerun_is_byte_identical() {
        let dir = scratch("rerun");
        let out = dir.join("vectors");
        for (frame, base) in [("0001", 0.1), ("0002", 0.7), ("0003", 1.3)] {
            write_mesh(&dir, &format!("frame-{}_0", frame), &shifted(base));
            write_mesh(&dir, &format!("frame-{}_1", frame), &shifted(base * 3.0));
        }

        calculate_movement_vectors(&dir, &out).unwrap();
        let first = fs::read(out.join("0002_0003.txt")).unwrap();
        calculate_movement_vectors(&dir, &out).unwrap();
        let second = fs::read(out.join("0002_0003.txt")).unwrap();
        assert_eq!(first, second);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rerun_drops_pairs_of_newly_faulty_frames() {
        let dir = scratch("stale");
        for frame in ["0001", "0002", "0003"] {
            write_mesh(&dir, &format!("frame-{}_0", frame), &shifted(1.0));
            write_mesh(&dir, &format!("frame-{}_1", frame), &shifted(2.0));
        }
        calculate_movement_vectors(&dir, &dir).unwrap();
        assert!(dir.join("0001_0002.txt").exists());

        write_mesh(&dir, "frame-0002_2", &shifted(0.0));
        let summary = calculate_movement_vectors(&dir, &dir).unwrap();
        assert_eq!(summary.pair_files, vec![dir.join("0001_0003.txt")]);
        assert!(!dir.join("0001_0002.txt").exists());
        assert!(!dir.join("0002_0003.txt").exists());

        let tensor = crate::core::tensor::pack_motion_tensor(&dir).unwrap();
        assert_eq!(tensor.dim(), (1, 8, 3));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn mesh_cache_stays_small_on_long_sequences() {
        let dir = scratch("cache");
        let mut stems = Vec::new();
        for frame in 1..=40 {
            let number = format!("{:04}", frame);
            write_mesh(&dir, &format!("frame-{}_1", number), &shifted(frame as f64));
            stems.push(format!("frame-{}_1", number));
            if frame % 3 != 0 {
                write_mesh(&dir, &format!("frame-{}_0", number), &shifted(-(frame as f64)));
                stems.push(format!("frame-{}_0", number));
            }
        }

        let table = FrameTable::from_stems(&dir, &stems).unwrap();
        let mut cache = MeshCache::default();
        for i in 0..table.len() - 1 {
            let vectors = pair_vectors(&table, i, &mut cache).unwrap();
            assert_eq!(vectors.len(), 8);
            assert!(cache.len() <= 4, "cache holds {} meshes at pair {}", cache.len(), i);
            cache.evict_before(i + 1);
        }
        assert!(cache.len() <= 2);

        fs::remove_dir_all(&dir).unwrap();
    }
}
