use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::MotionError;
use crate::shared::constants;

/// Hand slot written by the reconstruction model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hand {
    Left,
    Right,
    /// Marks an unreliable detection; the whole frame is discarded.
    Faulty,
}

impl Hand {
    /// Output order of a pair file: right hand first.
    pub const PAIR_ORDER: [Hand; 2] = [Hand::Right, Hand::Left];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "0" => Some(Hand::Left),
            "1" => Some(Hand::Right),
            "2" => Some(Hand::Faulty),
            _ => None,
        }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hand::Left => write!(f, "left"),
            Hand::Right => write!(f, "right"),
            Hand::Faulty => write!(f, "faulty"),
        }
    }
}

/// Split a mesh file stem such as `frame-0001_1` into frame number and hand.
pub fn parse_mesh_stem(stem: &str) -> Result<(String, Hand), MotionError> {
    let malformed = || MotionError::MalformedName(stem.to_string());

    let rest = stem.strip_prefix(constants::FRAME_PREFIX).ok_or_else(malformed)?;
    let (frame, hand) = rest.split_once('_').ok_or_else(malformed)?;
    if frame.is_empty() || !frame.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    let hand = Hand::parse(hand).ok_or_else(|| MotionError::UnknownHand {
        file: stem.to_string(),
        hand: hand.to_string(),
    })?;

    Ok((frame.to_string(), hand))
}

#[derive(Debug, Clone)]
pub struct FrameEntry {
    pub number: String,
    pub meshes: BTreeMap<Hand, PathBuf>,
}

/// Usable frames of a mesh directory, in temporal order.
#[derive(Debug, Clone, Default)]
pub struct FrameTable {
    frames: Vec<FrameEntry>,
    skipped: Vec<String>,
}

impl FrameTable {
    pub fn scan(dir: &Path) -> Result<Self> {
        let mut stems = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("Failed to read directory: {:?}", dir))? {
            let path = entry?.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != constants::MESH_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.starts_with(constants::FRAME_PREFIX) {
                stems.push(stem.to_string());
            }
        }

        Self::from_stems(dir, &stems)
    }

    /// Build the table from mesh file stems that live in `dir`.
    pub fn from_stems<S: AsRef<str>>(dir: &Path, stems: &[S]) -> Result<Self> {
        let mut grouped: BTreeMap<String, BTreeMap<Hand, PathBuf>> = BTreeMap::new();
        let mut faulty = BTreeSet::new();

        for stem in stems {
            let stem = stem.as_ref();
            let (frame, hand) = parse_mesh_stem(stem)?;
            if hand == Hand::Faulty {
                faulty.insert(frame.clone());
            }
            let path = dir.join(format!("{}.{}", stem, constants::MESH_EXTENSION));
            grouped.entry(frame).or_default().insert(hand, path);
        }

        let mut frames: Vec<FrameEntry> = grouped
            .into_iter()
            .filter(|(number, _)| !faulty.contains(number))
            .map(|(number, meshes)| FrameEntry { number, meshes })
            .collect();

        let widths: BTreeSet<usize> = frames.iter().map(|f| f.number.len()).collect();
        if widths.len() > 1 {
            crate::utils::logger::warn(&format!(
                "frame numbers in {:?} are not zero-padded to one width {:?}; ordering numerically",
                dir, widths
            ));
            frames.sort_by(|a, b| numeric_order(&a.number, &b.number));
        }

        if !faulty.is_empty() {
            crate::utils::logger::info(&format!(
                "skipped {} faulty frame(s) in {:?}: {:?}",
                faulty.len(),
                dir,
                faulty
            ));
        }

        Ok(Self {
            frames,
            skipped: faulty.into_iter().collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[FrameEntry] {
        &self.frames
    }

    pub fn numbers(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().map(|f| f.number.as_str())
    }

    /// Frames dropped because a hand index 2 mesh was present.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn mesh(&self, index: usize, hand: Hand) -> Option<&Path> {
        self.frames.get(index)?.meshes.get(&hand).map(PathBuf::as_path)
    }

    /// Mesh for `hand` at `index`, or from the first neighbour found by
    /// scanning `index+1, index-1, index+2, index-2, ...` within the table.
    pub fn nearest_mesh(&self, index: usize, hand: Hand) -> Result<(usize, &Path), MotionError> {
        if let Some(path) = self.mesh(index, hand) {
            return Ok((index, path));
        }

        let len = self.frames.len();
        for step in 1..len {
            let forward = index.checked_add(step).filter(|&i| i < len);
            let backward = index.checked_sub(step);
            if forward.is_none() && backward.is_none() {
                break;
            }
            for candidate in [forward, backward].into_iter().flatten() {
                if let Some(path) = self.mesh(candidate, hand) {
                    return Ok((candidate, path));
                }
            }
        }

        Err(MotionError::NoHandData {
            frame: self
                .frames
                .get(index)
                .map(|f| f.number.clone())
                .unwrap_or_default(),
            hand,
        })
    }
}

/// Digit strings compared by value, then by text so `01` and `1` stay distinct.
pub(crate) fn numeric_order(a: &str, b: &str) -> Ordering {
    let ta = a.trim_start_matches('0');
    let tb = b.trim_start_matches('0');
    ta.len()
        .cmp(&tb.len())
        .then_with(|| ta.cmp(tb))
        .then_with(|| a.cmp(b))
}
