use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Files in `dir` whose extension is one of `extensions` (case-insensitive), sorted by path.
pub fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {:?}", dir))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map_or(false, |ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        })
        .collect();

    files.sort();

    if files.is_empty() {
        anyhow::bail!("No files with extension {:?} found in {:?}", extensions, dir);
    }

    Ok(files)
}

/// File name without extension, e.g. `p046_suture` for `videos/p046_suture.mp4`.
pub fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .with_context(|| format!("Path has no usable file name: {:?}", path))
}
