use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Image path → ordered list of formatted captions.
///
/// Keys are kept sorted so serialized output is stable. Caption order within a
/// key is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptionMapping {
    entries: BTreeMap<String, Vec<String>>,
}

impl CaptionMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one caption to `image_path`, creating the entry if needed.
    pub fn push_caption(&mut self, image_path: impl Into<String>, caption: String) {
        self.entries
            .entry(image_path.into())
            .or_default()
            .push(caption);
    }

    /// Replaces the whole caption list of `image_path`.
    pub fn assign(&mut self, image_path: impl Into<String>, captions: Vec<String>) {
        self.entries.insert(image_path.into(), captions);
    }

    /// Merges `other` into `self`. A key present in both takes `other`'s value
    /// wholesale; the lists are never concatenated.
    pub fn merge_overwrite(&mut self, other: CaptionMapping) {
        self.entries.extend(other.entries);
    }

    pub fn get(&self, image_path: &str) -> Option<&[String]> {
        self.entries.get(image_path).map(Vec::as_slice)
    }

    pub fn contains(&self, image_path: &str) -> bool {
        self.entries.contains_key(image_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of captions across all images.
    pub fn caption_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
