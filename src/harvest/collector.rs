//! Directory-driven caption collection.
//!
//! This module provides the [`CaptionCollector`] that walks a dataset tree,
//! routes each recognised file to its extractor with the right image
//! directory, and merges the per-file results:
//! - File classification via [`Route`]
//! - Image-root lookup with per-route fallbacks
//! - Last-writer-wins merge into one [`CaptionMapping`]
//! - Structured logging via `tracing`
//!
//! Files are processed in directory-walk order, which the filesystem decides.
//! When two files describe the same image the later one replaces the earlier
//! entry, so the result for such keys depends on that order unless
//! [`CaptionCollector::with_sorted_walk`] is enabled.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::harvest::formats::{
    DelimitedExtractor, Extractor, RecordExtractor, SpreadsheetExtractor,
};
use crate::harvest::traits::CaptionExtractor;
use crate::model::CaptionMapping;

/// BanglaView ships one header-less workbook under this name.
pub const BANGLAVIEW_FILE: &str = "banglaview_dataset.xlsx";

// ============================================================================
// Routing
// ============================================================================

/// Classification of a caption source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `*captioning*.xlsx`, header row, images in `./image`
    CaptioningWorkbook,

    /// `*ban-cap*.csv`, images under the Flickr 8k tree
    BanCapCsv,

    /// `banglaview_dataset.xlsx`, no header, Flickr 30k images
    BanglaViewWorkbook,

    /// `*captions*.json` record lists, images in `./images`
    CaptionRecords,
}

impl Route {
    /// Classifies a file by name, case-insensitively. First match wins;
    /// `None` means the file is not a caption source.
    pub fn classify(file_name: &str) -> Option<Route> {
        let lower = file_name.to_lowercase();
        if lower.ends_with(".xlsx") && lower.contains("captioning") {
            Some(Route::CaptioningWorkbook)
        } else if lower.ends_with(".csv") && lower.contains("ban-cap") {
            Some(Route::BanCapCsv)
        } else if lower == BANGLAVIEW_FILE {
            Some(Route::BanglaViewWorkbook)
        } else if lower.ends_with(".json") && lower.contains("captions") {
            Some(Route::CaptionRecords)
        } else {
            None
        }
    }

    pub fn extractor(self) -> Extractor {
        match self {
            Route::CaptioningWorkbook => Extractor::Spreadsheet(SpreadsheetExtractor::new(true)),
            Route::BanCapCsv => Extractor::Delimited(DelimitedExtractor),
            Route::BanglaViewWorkbook => Extractor::Spreadsheet(SpreadsheetExtractor::new(false)),
            Route::CaptionRecords => Extractor::Records(RecordExtractor),
        }
    }

    /// Resolves the image directory for a file of this route.
    ///
    /// # Arguments
    ///
    /// * `file_dir` - Directory containing the caption file
    /// * `base_dir` - Root of the collection walk
    ///
    /// # Returns
    ///
    /// `None` when the route has no fallback and its directory is missing;
    /// the file must then be skipped.
    pub fn image_root(self, file_dir: &Path, base_dir: &Path) -> Option<PathBuf> {
        match self {
            Route::CaptioningWorkbook => {
                Some(existing_or(file_dir.join("image"), file_dir.to_path_buf()))
            }
            Route::BanCapCsv => Some(existing_or(
                base_dir.join("Flickr 8k Dataset").join("Images"),
                base_dir.to_path_buf(),
            )),
            Route::BanglaViewWorkbook => {
                let dir = base_dir.join("flickr30k_images").join("flickr30k_images");
                dir.exists().then_some(dir)
            }
            Route::CaptionRecords => Some(existing_or(
                file_dir.join("images"),
                base_dir.join("rxxch9vw59.2").join("images"),
            )),
        }
    }
}

fn existing_or(preferred: PathBuf, fallback: PathBuf) -> PathBuf {
    if preferred.exists() {
        preferred
    } else {
        fallback
    }
}

// ============================================================================
// Collector
// ============================================================================

/// Statistics about a collection run.
#[derive(Debug, Default, Clone)]
pub struct CollectionStats {
    /// Regular files found under the base directory
    pub files_scanned: usize,

    /// Files routed to an extractor
    pub files_matched: usize,

    /// Recognised files skipped because their image directory is missing
    pub files_skipped: usize,

    /// Distinct image paths in the merged mapping
    pub entries: usize,

    /// Wall time of the whole run (milliseconds)
    pub duration_ms: u64,
}

/// Walks a dataset tree and merges every recognised caption file.
///
/// # Example
///
/// ```ignore
/// use caption_harvester::harvest::CaptionCollector;
///
/// let captions = CaptionCollector::new("/data/bangla")
///     .with_validation(false)
///     .collect();
/// println!("{} images", captions.len());
/// ```
#[derive(Debug, Clone)]
pub struct CaptionCollector {
    base_dir: PathBuf,

    /// Passed to every extractor (default: true)
    validate_images: bool,

    /// Sort discovered files by full path before processing (default: false)
    sorted_walk: bool,
}

impl CaptionCollector {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            validate_images: true,
            sorted_walk: false,
        }
    }

    /// Enables or disables image existence checks.
    pub fn with_validation(mut self, validate_images: bool) -> Self {
        self.validate_images = validate_images;
        self
    }

    /// Processes files in full-path order instead of walk order, making the
    /// outcome for images described by several files deterministic.
    pub fn with_sorted_walk(mut self, sorted: bool) -> Self {
        self.sorted_walk = sorted;
        self
    }

    /// Collects and merges captions from every recognised file.
    pub fn collect(&self) -> CaptionMapping {
        self.collect_with_stats().0
    }

    /// Same as [`CaptionCollector::collect`], also returning run statistics.
    pub fn collect_with_stats(&self) -> (CaptionMapping, CollectionStats) {
        let start = Instant::now();
        let mut stats = CollectionStats::default();
        let mut all_captions = CaptionMapping::new();

        info!(base_dir = %self.base_dir.display(), "Scanning for caption files");

        let mut files = Vec::new();
        discover_files(&self.base_dir, &mut files);
        if self.sorted_walk {
            files.sort();
        }

        for path in files {
            stats.files_scanned += 1;

            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let Some(route) = Route::classify(&file_name) else {
                continue;
            };

            let file_dir = path.parent().unwrap_or(self.base_dir.as_path());
            let Some(image_root) = route.image_root(file_dir, &self.base_dir) else {
                warn!(
                    file = %path.display(),
                    route = ?route,
                    "Image directory not found, skipping file"
                );
                stats.files_skipped += 1;
                continue;
            };

            stats.files_matched += 1;
            let extractor = route.extractor();
            let captions = extractor.extract(&path, &image_root, self.validate_images);
            debug!(
                file = %path.display(),
                format = extractor.name(),
                image_root = %image_root.display(),
                entries = captions.len(),
                "Merging captions"
            );
            all_captions.merge_overwrite(captions);
        }

        stats.entries = all_captions.len();
        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            files_scanned = stats.files_scanned,
            files_matched = stats.files_matched,
            files_skipped = stats.files_skipped,
            entries = stats.entries,
            duration_ms = stats.duration_ms,
            "Caption collection completed"
        );

        (all_captions, stats)
    }
}

/// Collects captions under `base_dir` in walk order.
pub fn collect_all_caption_data(base_dir: &Path, validate_images: bool) -> CaptionMapping {
    CaptionCollector::new(base_dir)
        .with_validation(validate_images)
        .collect()
}

/// Appends regular files under `dir` to `files`, top-down: a directory's own
/// files come before those of its subdirectories. Symlinked directories are
/// not followed.
fn discover_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("Cannot read directory {:?}: {}", dir, e);
            return;
        }
    };

    let mut subdirs = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Cannot read entry in {:?}: {}", dir, e);
                continue;
            }
        };
        let path = entry.path();
        match entry.file_type() {
            Ok(ft) if ft.is_dir() => subdirs.push(path),
            Ok(_) if path.is_file() => files.push(path),
            _ => {}
        }
    }

    for subdir in subdirs {
        discover_files(&subdir, files);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_classify_routes() {
        assert_eq!(
            Route::classify("Bangla_Captioning_v2.XLSX"),
            Some(Route::CaptioningWorkbook)
        );
        assert_eq!(Route::classify("BAN-Cap_captiondata.csv"), Some(Route::BanCapCsv));
        assert_eq!(
            Route::classify("BanglaView_Dataset.xlsx"),
            Some(Route::BanglaViewWorkbook)
        );
        assert_eq!(Route::classify("captions.json"), Some(Route::CaptionRecords));
    }

    #[test]
    fn test_classify_ignores_other_files() {
        assert_eq!(Route::classify("notes.txt"), None);
        assert_eq!(Route::classify("captioning.csv"), None);
        assert_eq!(Route::classify("ban-cap.xlsx"), None);
        assert_eq!(Route::classify("banglaview_dataset_v2.xlsx"), None);
        assert_eq!(Route::classify("labels.json"), None);
    }

    #[test]
    fn test_route_extractors() {
        assert!(matches!(
            Route::CaptioningWorkbook.extractor(),
            Extractor::Spreadsheet(e) if e.has_header()
        ));
        assert!(matches!(
            Route::BanglaViewWorkbook.extractor(),
            Extractor::Spreadsheet(e) if !e.has_header()
        ));
        assert!(matches!(Route::BanCapCsv.extractor(), Extractor::Delimited(_)));
        assert!(matches!(Route::CaptionRecords.extractor(), Extractor::Records(_)));
    }

    #[test]
    fn test_image_root_fallbacks() {
        let base = TempDir::new().unwrap();
        let base = base.path();
        let file_dir = base.join("set");
        fs::create_dir(&file_dir).unwrap();

        assert_eq!(
            Route::CaptioningWorkbook.image_root(&file_dir, base),
            Some(file_dir.clone())
        );
        assert_eq!(
            Route::BanCapCsv.image_root(&file_dir, base),
            Some(base.to_path_buf())
        );
        assert_eq!(Route::BanglaViewWorkbook.image_root(&file_dir, base), None);
        assert_eq!(
            Route::CaptionRecords.image_root(&file_dir, base),
            Some(base.join("rxxch9vw59.2").join("images"))
        );
    }

    #[test]
    fn test_image_root_preferred_directories() {
        let base = TempDir::new().unwrap();
        let base = base.path();
        let file_dir = base.join("set");
        fs::create_dir_all(file_dir.join("image")).unwrap();
        fs::create_dir_all(file_dir.join("images")).unwrap();
        fs::create_dir_all(base.join("Flickr 8k Dataset").join("Images")).unwrap();
        fs::create_dir_all(base.join("flickr30k_images").join("flickr30k_images")).unwrap();

        assert_eq!(
            Route::CaptioningWorkbook.image_root(&file_dir, base),
            Some(file_dir.join("image"))
        );
        assert_eq!(
            Route::BanCapCsv.image_root(&file_dir, base),
            Some(base.join("Flickr 8k Dataset").join("Images"))
        );
        assert_eq!(
            Route::BanglaViewWorkbook.image_root(&file_dir, base),
            Some(base.join("flickr30k_images").join("flickr30k_images"))
        );
        assert_eq!(
            Route::CaptionRecords.image_root(&file_dir, base),
            Some(file_dir.join("images"))
        );
    }

    #[test]
    fn test_discover_files_top_down() {
        let base = TempDir::new().unwrap();
        let nested = base.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(base.path().join("top.txt"), b"").unwrap();
        fs::write(nested.join("deep.txt"), b"").unwrap();

        let mut files = Vec::new();
        discover_files(base.path(), &mut files);

        assert_eq!(files.len(), 2);
        assert_eq!(files[0], base.path().join("top.txt"));
        assert_eq!(files[1], nested.join("deep.txt"));
    }

    #[test]
    fn test_missing_base_dir_yields_empty_mapping() {
        let base = TempDir::new().unwrap();
        let (mapping, stats) = CaptionCollector::new(base.path().join("absent"))
            .with_validation(false)
            .collect_with_stats();

        assert!(mapping.is_empty());
        assert_eq!(stats.files_scanned, 0);
    }
}
