//! JSON caption records.
//!
//! Expects a top-level array of objects such as
//! `{"filename": "image1.jpg", "caption": ["first", "second"]}`. The caption
//! field may also be a single string.

use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::harvest::traits::{image_path, passes_validation, CaptionExtractor, ExtractionError};
use crate::model::CaptionMapping;

pub const NAME_FIELD: &str = "filename";
pub const CAPTION_FIELD: &str = "caption";

const PROGRESS_INTERVAL: usize = 1_000;

/// Formats a record caption as `"<start>{caption} "`, with no end marker.
pub fn format_record_caption(caption: &str) -> String {
    format!("<start>{} ", caption.trim())
}

/// Extractor for JSON arrays of `filename`/`caption` records.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordExtractor;

/// Normalizes the caption field to a list, dropping nulls.
///
/// Non-string items (numbers, booleans, nested arrays or objects) are kept as
/// their compact JSON text, e.g. `true` or `["a","b"]`.
fn caption_texts(value: &Value) -> Vec<String> {
    let items = match value {
        Value::Array(items) => items.as_slice(),
        single => std::slice::from_ref(single),
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .collect()
}

impl CaptionExtractor for RecordExtractor {
    fn name(&self) -> &str {
        "json"
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
        info!(file = %source.display(), "Parsing JSON records");

        let file = File::open(source)?;
        let root: Value = serde_json::from_reader(BufReader::new(file))?;
        let Value::Array(records) = root else {
            return Err(ExtractionError::Malformed(
                "root is not a list of records".to_string(),
            ));
        };

        let mut skipped = 0usize;

        for (idx, record) in records.iter().enumerate() {
            if idx % PROGRESS_INTERVAL == 0 {
                debug!(file = %source.display(), item = idx, "JSON progress");
            }

            let fields = record
                .as_object()
                .and_then(|obj| Some((obj.get(NAME_FIELD)?, obj.get(CAPTION_FIELD)?)));
            let Some((name, captions)) = fields else {
                warn!(file = %source.display(), item = idx, "Skipping malformed record: {}", record);
                skipped += 1;
                continue;
            };
            let Some(name) = name.as_str() else {
                warn!(file = %source.display(), item = idx, "Skipping record with non-text filename: {}", name);
                skipped += 1;
                continue;
            };

            let path = image_path(image_root, name.trim());
            let formatted: Vec<String> = caption_texts(captions)
                .iter()
                .map(|c| format_record_caption(c))
                .collect();

            if passes_validation(&path, validate_images) && !formatted.is_empty() {
                mapping.assign(path, formatted);
            }
        }

        info!(
            file = %source.display(),
            records = records.len(),
            skipped,
            entries = mapping.len(),
            "Finished JSON records"
        );
        Ok(())
    }
}
