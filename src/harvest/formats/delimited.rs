//! CSV caption extraction (`caption_id`, `bengali_caption` columns).

use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::harvest::traits::{
    image_path, passes_validation, strip_variant_suffix, CaptionExtractor, ExtractionError,
};
use crate::model::CaptionMapping;

pub const IMAGE_COLUMN: &str = "caption_id";
pub const CAPTION_COLUMN: &str = "bengali_caption";

const PROGRESS_INTERVAL: usize = 10_000;

/// Formats a CSV caption as `" <start> {caption} <end> "`.
///
/// The surrounding spaces differ from the spreadsheet format and are kept.
pub fn format_delimited_caption(caption: &str) -> String {
    format!(" <start> {} <end> ", caption.trim())
}

/// Extractor for header-row CSV files.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedExtractor;

fn last_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .enumerate()
        .filter(|(_, h)| *h == name)
        .map(|(i, _)| i)
        .last()
}

impl CaptionExtractor for DelimitedExtractor {
    fn name(&self) -> &str {
        "csv"
    }

    fn default_validate_images(&self) -> bool {
        true
    }

    fn extract_into(
        &self,
        source: &Path,
        image_root: &Path,
        validate_images: bool,
        mapping: &mut CaptionMapping,
    ) -> Result<(), ExtractionError> {
        let file = File::open(source)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        // Duplicate header names: the last column wins.
        let headers = reader.headers()?;
        let image_idx = last_column(headers, IMAGE_COLUMN);
        let caption_idx = last_column(headers, CAPTION_COLUMN);
        let (Some(image_idx), Some(caption_idx)) = (image_idx, caption_idx) else {
            warn!(
                file = %source.display(),
                "CSV lacks '{}' or '{}' column, skipping",
                IMAGE_COLUMN,
                CAPTION_COLUMN
            );
            return Ok(());
        };

        info!(file = %source.display(), "Parsing CSV");

        let mut rows_read = 0usize;
        let mut accepted = 0usize;

        for record in reader.records() {
            let record = record?;
            rows_read += 1;
            if rows_read % PROGRESS_INTERVAL == 0 {
                debug!(file = %source.display(), rows = rows_read, "CSV progress");
            }

            let name = record.get(image_idx).filter(|s| !s.is_empty());
            let caption = record.get(caption_idx).filter(|s| !s.is_empty());
            let (Some(name), Some(caption)) = (name, caption) else {
                continue;
            };

            let path = image_path(image_root, strip_variant_suffix(name));
            if !passes_validation(&path, validate_images) {
                continue;
            }

            mapping.push_caption(path, format_delimited_caption(caption));
            accepted += 1;
        }

        info!(
            file = %source.display(),
            rows = rows_read,
            accepted,
            entries = mapping.len(),
            "Finished CSV"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("ban-cap.csv");
        std::fs::write(&path, body).unwrap();
        path
    }

    fn key(root: &Path, name: &str) -> String {
        root.join(name).to_string_lossy().into_owned()
    }

    #[test]
    fn test_caption_formatting_keeps_outer_spaces() {
        let dir = TempDir::new().unwrap();
        let source = write_csv(&dir, "caption_id,bengali_caption\nimg2.jpg, চমৎকার \n");
        let root = Path::new("/flickr");

        let mapping = DelimitedExtractor.extract(&source, root, false);

        assert_eq!(
            mapping.get(&key(root, "img2.jpg")).unwrap(),
            [" <start> চমৎকার <end> "]
        );
    }

    #[test]
    fn test_suffix_stripped_and_captions_accumulate() {
        let dir = TempDir::new().unwrap();
        let source = write_csv(
            &dir,
            "caption_id,bengali_caption\n\
             a.jpg#0,first\n\
             a.jpg#1,\"second, with comma\"\n",
        );

        let mapping = DelimitedExtractor.extract(&source, Path::new(""), false);

        assert_eq!(
            mapping.get("a.jpg").unwrap(),
            [" <start> first <end> ", " <start> second, with comma <end> "]
        );
    }

    #[test]
    fn test_rows_missing_fields_are_skipped() {
        let dir = TempDir::new().unwrap();
        let source = write_csv(
            &dir,
            "id,caption_id,bengali_caption\n\
             1,,orphan caption\n\
             2,nocap.jpg,\n\
             3,short.jpg\n\
             4,ok.jpg,fine\n",
        );

        let mapping = DelimitedExtractor.extract(&source, Path::new(""), false);

        assert_eq!(mapping.len(), 1);
        assert!(mapping.contains("ok.jpg"));
    }

    #[test]
    fn test_duplicate_header_last_column_wins() {
        let dir = TempDir::new().unwrap();
        let source = write_csv(
            &dir,
            "caption_id,bengali_caption,bengali_caption\na.jpg,first,second\n",
        );

        let mapping = DelimitedExtractor.extract(&source, Path::new(""), false);

        assert_eq!(mapping.get("a.jpg").unwrap(), [" <start> second <end> "]);
    }

    #[test]
    fn test_missing_column_yields_empty_mapping() {
        let dir = TempDir::new().unwrap();
        let source = write_csv(&dir, "caption_id,english_caption\na.jpg,hello\n");

        let mapping = DelimitedExtractor.extract(&source, Path::new(""), false);
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_missing_file_yields_empty_mapping() {
        let dir = TempDir::new().unwrap();
        let mapping =
            DelimitedExtractor.extract(&dir.path().join("absent.csv"), Path::new(""), false);
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_validation_defaults_on() {
        let dir = TempDir::new().unwrap();
        let images = dir.path().join("Images");
        std::fs::create_dir(&images).unwrap();
        std::fs::write(images.join("real.jpg"), b"jpg").unwrap();
        let source = write_csv(
            &dir,
            "caption_id,bengali_caption\nreal.jpg#0,yes\nghost.jpg#0,no\n",
        );

        let defaulted = DelimitedExtractor.extract_with_defaults(&source, &images);
        let unvalidated = DelimitedExtractor.extract(&source, &images, false);

        assert!(DelimitedExtractor.default_validate_images());
        assert_eq!(defaulted.len(), 1);
        assert!(defaulted.contains(&key(&images, "real.jpg")));
        assert_eq!(unvalidated.len(), 2);
    }
}
