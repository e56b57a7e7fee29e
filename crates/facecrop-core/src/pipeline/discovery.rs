//! File discovery for finding photos in an input directory.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;

/// Discovers image files in directories.
pub struct FileDiscovery {
    config: ProcessingConfig,
    excluded: Option<PathBuf>,
}

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// Path relative to the discovery root, used to place the output
    pub relative: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl FileDiscovery {
    pub fn new(config: ProcessingConfig) -> Self {
        Self {
            config,
            excluded: None,
        }
    }

    /// Skip everything under `dir` while walking.
    ///
    /// Used for an output directory nested inside the input directory, so
    /// earlier crops are not picked up as new sources. A directory that does
    /// not exist yet excludes nothing.
    pub fn exclude(mut self, dir: &Path) -> Self {
        self.excluded = dir.canonicalize().ok();
        self
    }

    /// Discover supported image files at a path.
    ///
    /// A file path is returned as-is if supported. A directory is listed one
    /// level deep, or walked fully when `recursive` is set. Results are sorted
    /// by path.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        if path.is_file() {
            if self.is_supported(path) {
                if let Ok(meta) = std::fs::metadata(path) {
                    let relative = path
                        .file_name()
                        .map(PathBuf::from)
                        .unwrap_or_else(|| path.to_path_buf());
                    return vec![DiscoveredFile {
                        path: path.to_path_buf(),
                        relative,
                        size: meta.len(),
                    }];
                }
            }
            return vec![];
        }

        let mut walker = WalkDir::new(path).follow_links(true);
        if !self.config.recursive {
            walker = walker.max_depth(1);
        }

        let mut files = Vec::new();
        let walk = walker
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded(e));
        for entry in walk.filter_map(|e| e.ok()) {
            let entry_path = entry.path();
            if !entry.file_type().is_file() || !self.is_supported(entry_path) {
                continue;
            }
            if is_hidden(entry_path) {
                continue;
            }
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            let relative = entry_path
                .strip_prefix(path)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| entry_path.to_path_buf());
            files.push(DiscoveredFile {
                path: entry_path.to_path_buf(),
                relative,
                size: meta.len(),
            });
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    fn is_excluded(&self, entry: &walkdir::DirEntry) -> bool {
        let Some(excluded) = &self.excluded else {
            return false;
        };
        entry.file_type().is_dir()
            && entry
                .path()
                .canonicalize()
                .is_ok_and(|p| p.starts_with(excluded))
    }

    /// Check if a file has a supported extension (case-insensitive).
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    /// Total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}

// Leftover temp files from an interrupted run start with a dot.
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}
