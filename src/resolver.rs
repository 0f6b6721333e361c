//! Picks the single video file a request operates on.
//!
//! A file path is accepted as-is when its extension is a known video
//! container. A directory is walked recursively: if any file name carries
//! a season/episode marker the lexically first path wins (first episode),
//! otherwise the largest file wins (the feature, not the extras).

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{ProxyError, Result};

pub const VIDEO_EXTENSIONS: [&str; 8] = ["mkv", "mp4", "ts", "avi", "wmv", "mov", "flv", "m2ts"];

static SERIES_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[._\s-](S\d{1,2}E\d{1,3}|Season[._\s-]?\d{1,2}|E\d{1,3})[._\s-]")
        .expect("series pattern is valid")
});

/// Whether the path has a recognised video extension (case-insensitive)
pub fn is_video_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Whether the file name looks like part of a TV series
pub fn is_series_name<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .file_name()
        .map(|name| SERIES_PATTERN.is_match(&name.to_string_lossy()))
        .unwrap_or(false)
}

/// Resolve `path` to exactly one video file
pub fn resolve_video<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    info!("Resolving target video under {}", path.display());

    if path.as_os_str().is_empty() {
        return Err(ProxyError::InvalidInput("remote_path must not be empty".to_string()));
    }

    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProxyError::InvalidInput(format!("Path does not exist: {}", path.display())));
        }
        Err(e) => {
            return Err(ProxyError::InvalidInput(format!(
                "Cannot access path {}: {}",
                path.display(),
                e
            )));
        }
    };

    if !metadata.is_dir() {
        if is_video_file(path) {
            info!("Path is a video file, using it directly");
            return Ok(path.to_path_buf());
        }
        return Err(ProxyError::UnsupportedFormat(format!(
            "Path is a file but not a supported video format: {}",
            path.display()
        )));
    }

    let candidates = collect_videos(path)?;
    if candidates.is_empty() {
        return Err(ProxyError::NoVideoFound(path.display().to_string()));
    }

    select_candidate(path, candidates)
}

fn collect_videos(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut videos = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            ProxyError::InvalidInput(format!("Failed to walk directory {}: {}", dir.display(), e))
        })?;
        if entry.file_type().is_file() && is_video_file(entry.path()) {
            videos.push(entry.into_path());
        }
    }
    Ok(videos)
}

fn select_candidate(dir: &Path, mut candidates: Vec<PathBuf>) -> Result<PathBuf> {
    if candidates.iter().any(|c| is_series_name(c)) {
        info!("Series naming detected across {} files, picking the first episode", candidates.len());
        // plain string order, so "Season 1 Extras/..." sorts before "Season 1/..."
        candidates.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        let first = candidates.swap_remove(0);
        info!("Selected episode: {}", first.display());
        return Ok(first);
    }

    info!("No series naming detected, picking the largest of {} files", candidates.len());
    let mut largest: Option<(PathBuf, u64)> = None;
    for candidate in candidates {
        let size = match std::fs::metadata(&candidate) {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                warn!("Cannot read size of {}: {}", candidate.display(), e);
                continue;
            }
        };
        // strict comparison keeps the first-seen file on ties
        if largest.as_ref().is_none_or(|(_, max)| size > *max) {
            largest = Some((candidate, size));
        }
    }

    let (file, size) = largest.ok_or_else(|| ProxyError::AmbiguousSelection(dir.display().to_string()))?;
    info!(
        "Selected largest file ({:.2} GB): {}",
        size as f64 / 1024.0 / 1024.0 / 1024.0,
        file.display()
    );
    Ok(file)
}
