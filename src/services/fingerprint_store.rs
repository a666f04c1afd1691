use crate::error::RecognitionError;
use crate::models::frame::Fingerprint;
use crate::models::region::{RegionId, Resolution};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const FINGERPRINT_EXTENSION: &str = "fingerprint";

type RegionMap = HashMap<RegionId, HashMap<String, Fingerprint>>;

/// Persistent cache of learned fingerprints, keyed by
/// `resolution / region / name`.
///
/// Layout on disk: `<base>/<WxH>/<region>/<name>.fingerprint`, one `"x y"`
/// line per ink pixel. The whole store sits behind a single mutex.
pub struct FingerprintStore {
    base_path: PathBuf,
    entries: Mutex<HashMap<Resolution, RegionMap>>,
}

impl FingerprintStore {
    /// Empty store persisting under `base_path`, without reading the disk
    pub fn empty<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Eagerly load every fingerprint under `base_path`.
    ///
    /// Unparseable files and files under the pixel floor are skipped. A
    /// missing directory yields an empty store.
    pub fn load<P: AsRef<Path>>(base_path: P) -> Result<Self, RecognitionError> {
        let store = Self::empty(base_path);
        if !store.base_path.exists() {
            info!(path = %store.base_path.display(), "no fingerprint cache yet");
            return Ok(store);
        }

        let files = collect_fingerprint_files(&store.base_path)?;
        let parsed: Vec<(Resolution, RegionId, String, Fingerprint)> = files
            .par_iter()
            .filter_map(|(resolution, region, name, path)| {
                match read_fingerprint(path) {
                    Some(fp) if fp.is_trustworthy() => {
                        Some((*resolution, region.clone(), name.clone(), fp))
                    }
                    Some(fp) => {
                        debug!(path = %path.display(), points = fp.len(), "skipping fingerprint under pixel floor");
                        None
                    }
                    None => {
                        debug!(path = %path.display(), "skipping malformed fingerprint");
                        None
                    }
                }
            })
            .collect();

        let count = parsed.len();
        {
            let mut entries = store.entries.lock();
            for (resolution, region, name, fp) in parsed {
                entries
                    .entry(resolution)
                    .or_default()
                    .entry(region)
                    .or_default()
                    .insert(name, fp);
            }
        }

        info!(path = %store.base_path.display(), count, "fingerprint cache loaded");
        Ok(store)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn get(&self, resolution: Resolution, region: &RegionId, name: &str) -> Option<Fingerprint> {
        self.entries
            .lock()
            .get(&resolution)
            .and_then(|regions| regions.get(region))
            .and_then(|names| names.get(name))
            .cloned()
    }

    /// Every fingerprint known for a resolution and region
    pub fn get_all(&self, resolution: Resolution, region: &RegionId) -> HashMap<String, Fingerprint> {
        self.entries
            .lock()
            .get(&resolution)
            .and_then(|regions| regions.get(region))
            .cloned()
            .unwrap_or_default()
    }

    /// Write a fingerprint to disk, then upsert it in memory.
    ///
    /// Returns `Ok(false)` without touching anything when the fingerprint is
    /// under the pixel floor.
    pub fn save(
        &self,
        resolution: Resolution,
        region: &RegionId,
        name: &str,
        fingerprint: &Fingerprint,
    ) -> Result<bool, RecognitionError> {
        if !fingerprint.is_trustworthy() {
            return Ok(false);
        }

        let dir = self
            .base_path
            .join(resolution.to_string())
            .join(region.as_str());
        let path = dir.join(format!("{}.{}", file_stem_for(name)?, FINGERPRINT_EXTENSION));

        // Memory only ever holds what made it to disk
        let mut entries = self.entries.lock();
        fs::create_dir_all(&dir).map_err(|source| RecognitionError::Io {
            path: dir.clone(),
            source,
        })?;
        fs::write(&path, serialize(fingerprint)).map_err(|source| RecognitionError::Io {
            path: path.clone(),
            source,
        })?;

        entries
            .entry(resolution)
            .or_default()
            .entry(region.clone())
            .or_default()
            .insert(name.to_string(), fingerprint.clone());

        debug!(%resolution, %region, name, points = fingerprint.len(), "fingerprint saved");
        Ok(true)
    }

    /// Whether every required name already has a learned fingerprint
    pub fn has_all_known<S: AsRef<str>>(
        &self,
        resolution: Resolution,
        region: &RegionId,
        required_names: &[S],
    ) -> bool {
        let entries = self.entries.lock();
        let known = entries.get(&resolution).and_then(|regions| regions.get(region));
        required_names.iter().all(|name| {
            known
                .map(|names| names.contains_key(name.as_ref()))
                .unwrap_or(false)
        })
    }
}

/// Directory holding the fingerprints of one cache version
pub fn versioned_root(root: &Path, version: u32) -> PathBuf {
    root.join(format!("v{}", version))
}

/// Delete whole cache directories older than `current_version`.
///
/// Old caches are discarded rather than migrated.
pub fn prune_stale_versions(root: &Path, current_version: u32) -> Result<Vec<PathBuf>, RecognitionError> {
    let mut removed = Vec::new();
    if !root.exists() {
        return Ok(removed);
    }

    let entries = fs::read_dir(root).map_err(|source| RecognitionError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let version = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix('v'))
            .and_then(|v| v.parse::<u32>().ok());

        if let Some(version) = version {
            if version < current_version {
                fs::remove_dir_all(&path).map_err(|source| RecognitionError::Io {
                    path: path.clone(),
                    source,
                })?;
                warn!(path = %path.display(), version, current_version, "discarded stale fingerprint cache");
                removed.push(path);
            }
        }
    }

    Ok(removed)
}

fn file_stem_for(name: &str) -> Result<&str, RecognitionError> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(RecognitionError::Io {
            path: PathBuf::from(name),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "fingerprint name is not a valid file name",
            ),
        });
    }
    Ok(name)
}

fn collect_fingerprint_files(
    base: &Path,
) -> Result<Vec<(Resolution, RegionId, String, PathBuf)>, RecognitionError> {
    let read = |path: &Path| {
        fs::read_dir(path).map_err(|source| RecognitionError::Io {
            path: path.to_path_buf(),
            source,
        })
    };

    let mut files = Vec::new();
    for res_entry in read(base)?.flatten() {
        let res_path = res_entry.path();
        let Some(resolution) = res_path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(Resolution::parse)
        else {
            continue;
        };
        if !res_path.is_dir() {
            continue;
        }

        for region_entry in read(&res_path)?.flatten() {
            let region_path = region_entry.path();
            if !region_path.is_dir() {
                continue;
            }
            let Some(region) = region_path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            for file_entry in read(&region_path)?.flatten() {
                let path = file_entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(FINGERPRINT_EXTENSION) {
                    continue;
                }
                if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                    files.push((resolution, RegionId::from(region), name.to_string(), path.clone()));
                }
            }
        }
    }

    Ok(files)
}

fn read_fingerprint(path: &Path) -> Option<Fingerprint> {
    let content = fs::read_to_string(path).ok()?;
    parse(&content)
}

/// Parse one `"x y"` pair per line; any malformed line rejects the file
pub fn parse(content: &str) -> Option<Fingerprint> {
    let mut points = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let x = parts.next()?.parse::<u32>().ok()?;
        let y = parts.next()?.parse::<u32>().ok()?;
        if parts.next().is_some() {
            return None;
        }
        points.push((x, y));
    }
    Some(Fingerprint::from_points(points))
}

pub fn serialize(fingerprint: &Fingerprint) -> String {
    let mut out = String::with_capacity(fingerprint.len() * 8);
    for (x, y) in fingerprint.points() {
        out.push_str(&format!("{} {}\n", x, y));
    }
    out
}
