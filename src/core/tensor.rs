use anyhow::{Context, Result};
use ndarray::Array3;
use std::fs;
use std::path::{Path, PathBuf};

use super::frame_table::numeric_order;
use crate::error::MotionError;
use crate::shared::constants;

/// `(first, second)` frame numbers of a pair file name such as `0001_0002.txt`.
pub fn parse_pair_name(path: &Path) -> Option<(String, String)> {
    if path.extension().map_or(true, |ext| ext != constants::PAIR_EXTENSION) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (first, second) = stem.split_once('_')?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !(digits(first) && digits(second)) {
        return None;
    }
    Some((first.to_string(), second.to_string()))
}

/// Pair files (`<a>_<b>.txt`) in `dir`, ordered by first then second frame.
pub fn list_pair_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pairs: Vec<((String, String), PathBuf)> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {:?}", dir))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter_map(|path| Some((parse_pair_name(&path)?, path)))
        .collect();

    pairs.sort_by(|(a, _), (b, _)| {
        numeric_order(&a.0, &b.0).then_with(|| numeric_order(&a.1, &b.1))
    });
    Ok(pairs.into_iter().map(|(_, path)| path).collect())
}

pub fn read_pair_file(path: &Path) -> Result<Vec<[f64; 3]>> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let mut vectors = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let bad = || MotionError::BadVector { path: path.to_path_buf(), line: idx + 1 };
        let mut parts = line.split_whitespace();
        let mut vector = [0.0f64; 3];
        for slot in vector.iter_mut() {
            *slot = parts.next().ok_or_else(bad)?.parse::<f64>().map_err(|_| bad())?;
        }
        if parts.next().is_some() {
            return Err(bad().into());
        }
        vectors.push(vector);
    }

    Ok(vectors)
}

/// Stack `files`, in the given order, into a `(pairs, vectors, 3)` array.
///
/// Values stay `f64`, the precision the pair files are written with.
pub fn pack_pair_files(files: &[PathBuf]) -> Result<Array3<f64>> {
    if files.is_empty() {
        return Err(MotionError::NoPairs.into());
    }

    let mut expected = None;
    let mut flat = Vec::new();
    for path in files {
        let vectors = read_pair_file(path)?;
        let count = *expected.get_or_insert(vectors.len());
        if vectors.len() != count {
            return Err(MotionError::RaggedPairs {
                path: path.clone(),
                expected: count,
                found: vectors.len(),
            }
            .into());
        }
        flat.extend(vectors.into_iter().flatten());
    }

    let per_pair = expected.unwrap_or(0);
    let tensor = Array3::from_shape_vec((files.len(), per_pair, 3), flat)
        .context("Pair vectors do not fill the tensor shape")?;
    Ok(tensor)
}

/// Stack every pair file found in `dir`.
pub fn pack_motion_tensor(dir: &Path) -> Result<Array3<f64>> {
    let files = list_pair_files(dir)?;
    pack_pair_files(&files).with_context(|| format!("Failed to pack pair files in {:?}", dir))
}

/// Pack `files` and persist the result as a `.npy` file at `output`.
pub fn save_pair_tensor(files: &[PathBuf], output: &Path) -> Result<[usize; 3]> {
    let tensor = pack_pair_files(files)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    ndarray_npy::write_npy(output, &tensor)
        .with_context(|| format!("Failed to write tensor: {:?}", output))?;

    let shape = tensor.dim();
    crate::utils::logger::info(&format!("saved motion tensor {:?} to {:?}", shape, output));
    Ok([shape.0, shape.1, shape.2])
}

/// Pack every pair file of `dir` into `output`.
pub fn save_motion_tensor(dir: &Path, output: &Path) -> Result<[usize; 3]> {
    let files = list_pair_files(dir)?;
    save_pair_tensor(&files, output).with_context(|| format!("Failed to pack pair files in {:?}", dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_npy::read_npy;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hand_motion_tensor_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn lists_only_pair_files_in_frame_order() {
        let dir = scratch("list");
        for name in ["0002_0003.txt", "0001_0002.txt", "notes.txt", "0001_0002.obj", "a_b.txt"] {
            fs::write(dir.join(name), "").unwrap();
        }

        let names: Vec<String> = list_pair_files(&dir)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["0001_0002.txt", "0002_0003.txt"]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn stacks_pairs_in_order() {
        let dir = scratch("stack");
        fs::write(dir.join("0001_0002.txt"), "1.0 2.0 3.0\n4.0 5.0 6.0\n").unwrap();
        fs::write(dir.join("0002_0003.txt"), "-1.0 -2.0 -3.0\n0.5 0.0 0.25\n").unwrap();

        let tensor = pack_motion_tensor(&dir).unwrap();
        assert_eq!(tensor.dim(), (2, 2, 3));
        assert_eq!(tensor[[0, 1, 2]], 6.0);
        assert_eq!(tensor[[1, 0, 0]], -1.0);
        assert_eq!(tensor[[1, 1, 2]], 0.25);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn ragged_pairs_are_rejected() {
        let dir = scratch("ragged");
        fs::write(dir.join("0001_0002.txt"), "1 2 3\n4 5 6\n").unwrap();
        fs::write(dir.join("0002_0003.txt"), "1 2 3\n").unwrap();

        let err = pack_motion_tensor(&dir).unwrap_err();
        match err.downcast_ref::<MotionError>() {
            Some(MotionError::RaggedPairs { expected, found, .. }) => {
                assert_eq!((*expected, *found), (2, 1));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn malformed_vector_line_is_rejected() {
        let dir = scratch("malformed");
        fs::write(dir.join("0001_0002.txt"), "1 2 3\n1 2\n").unwrap();
        assert!(matches!(
            pack_motion_tensor(&dir).unwrap_err().downcast_ref::<MotionError>(),
            Some(MotionError::BadVector { line: 2, .. })
        ));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn empty_directory_has_no_tensor() {
        let dir = scratch("empty");
        assert!(matches!(
            pack_motion_tensor(&dir).unwrap_err().downcast_ref::<MotionError>(),
            Some(MotionError::NoPairs)
        ));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn saved_npy_reads_back() {
        let dir = scratch("save");
        fs::write(dir.join("0001_0002.txt"), "1 2 3\n").unwrap();
        fs::write(dir.join("0002_0003.txt"), "4 5 6\n").unwrap();
        let output = dir.join("out").join("motion.npy");

        let shape = save_motion_tensor(&dir, &output).unwrap();
        assert_eq!(shape, [2, 1, 3]);
        let loaded: Array3<f64> = read_npy(&output).unwrap();
        assert_eq!(loaded, pack_motion_tensor(&dir).unwrap());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn pairs_sharing_a_first_frame_order_by_second() {
        let dir = scratch("second");
        for name in ["0001_0003.txt", "0002_0003.txt", "0001_0002.txt"] {
            fs::write(dir.join(name), "").unwrap();
        }

        let names: Vec<String> = list_pair_files(&dir)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["0001_0002.txt", "0001_0003.txt", "0002_0003.txt"]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn packs_only_the_given_files() {
        let dir = scratch("given");
        fs::write(dir.join("0001_0002.txt"), "1 1 1\n").unwrap();
        fs::write(dir.join("0001_0003.txt"), "2 2 2\n").unwrap();

        let tensor = pack_pair_files(&[dir.join("0001_0003.txt")]).unwrap();
        assert_eq!(tensor.dim(), (1, 1, 3));
        assert_eq!(tensor[[0, 0, 0]], 2.0);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn keeps_double_precision() {
        let dir = scratch("precision");
        fs::write(dir.join("0001_0002.txt"), "0.1 1.0000000001 -3.3333333333333335\n").unwrap();

        let tensor = pack_motion_tensor(&dir).unwrap();
        assert_eq!(tensor[[0, 0, 0]], 0.1);
        assert_eq!(tensor[[0, 0, 1]], 1.0000000001);
        assert_eq!(tensor[[0, 0, 2]], -3.3333333333333335);

        fs::remove_dir_all(&dir).unwrap();
    }
}
