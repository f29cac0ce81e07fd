//! XLSX caption extraction.
//!
//! Reads the zipped SpreadsheetML parts directly with a streaming XML reader
//! instead of building a workbook model. Image names come from the first cell
//! of each row and captions from the second; cells typed `s` are resolved
//! through the shared-string table.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::harvest::traits::{
    image_path, passes_validation, strip_variant_suffix, CaptionExtractor, ExtractionError,
};
use crate::model::CaptionMapping;

const WORKSHEET_PART: &str = "xl/worksheets/sheet1.xml";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Placeholder some datasets use in place of the `IMG_` file prefix.
const NAME_PLACEHOLDER: &str = "*MG*";
const NAME_PREFIX: &str = "IMG_";

const PROGRESS_INTERVAL: usize = 500;

/// Formats a spreadsheet caption as `<start> {caption} <end>`.
pub fn format_spreadsheet_caption(caption: &str) -> String {
    format!("<start> {} <end>", caption.trim())
}

/// Strips the `#<index>` suffix and rewrites the `*MG*` placeholder.
pub fn normalize_image_name(raw: &str) -> String {
    strip_variant_suffix(raw).replace(NAME_PLACEHOLDER, NAME_PREFIX)
}

/// Extractor for `.xlsx` workbooks with image names in column A and captions
/// in column B of the first worksheet.
#[derive(Debug, Clone, Copy)]
pub struct SpreadsheetExtractor {
    has_header: bool,
}

impl SpreadsheetExtractor {
    /// Creates an extractor; with `has_header` the first row is skipped.
    pub fn new(has_header: bool) -> Self {
        Self { has_header }
    }

    pub fn has_header(&self) -> bool {
        self.has_header
    }
}

impl Default for SpreadsheetExtractor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl CaptionExtractor for SpreadsheetExtractor {
    fn name(&self) -> &str {
        "xlsx"
    }

    fn default_validate_images(&self) -> bool {
        false
    }

    fn extract_into(
        &self,
        source: &Path,
        image_root: &Path,
        validate_images: bool,
        mapping: &mut CaptionMapping,
    ) -> Result<(), ExtractionError> {
        let file = File::open(source)?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;

        let shared_strings = match archive.by_name(SHARED_STRINGS_PART) {
            Ok(part) => read_shared_strings(BufReader::new(part))?,
            Err(ZipError::FileNotFound) => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let sheet = match archive.by_name(WORKSHEET_PART) {
            Ok(part) => part,
            Err(ZipError::FileNotFound) => {
                return Err(ExtractionError::MissingPart(WORKSHEET_PART.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            file = %source.display(),
            shared_strings = shared_strings.len(),
            "Parsing spreadsheet"
        );

        let mut rows_read = 0usize;
        let mut captions_added = 0usize;

        scan_rows(BufReader::new(sheet), &shared_strings, |position, cells| {
            if self.has_header && position == 1 {
                return;
            }
            rows_read += 1;
            if rows_read % PROGRESS_INTERVAL == 0 {
                debug!(file = %source.display(), rows = rows_read, "Spreadsheet progress");
            }

            if cells.len() < 2 {
                return;
            }
            let Some(raw_name) = cells[0].as_deref() else {
                return;
            };

            let path = image_path(image_root, &normalize_image_name(raw_name));
            if !passes_validation(&path, validate_images) {
                return;
            }
            if let Some(caption) = cells[1].as_deref() {
                mapping.push_caption(path, format_spreadsheet_caption(caption));
                captions_added += 1;
            }
        })?;

        info!(
            file = %source.display(),
            rows = rows_read,
            captions = captions_added,
            entries = mapping.len(),
            "Finished spreadsheet"
        );
        Ok(())
    }
}

// ============================================================================
// Shared Strings
// ============================================================================

/// Reads `xl/sharedStrings.xml` into a position-indexed table.
///
/// Each `<si>` item is one entry: its `<t>` runs concatenated, phonetic
/// (`<rPh>`) runs excluded.
fn read_shared_strings<R: BufRead>(source: R) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => in_phonetic = true,
                b"t" => in_text = current.is_some() && !in_phonetic,
                _ => {}
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"si" {
                    strings.push(String::new());
                }
            }
            Event::Text(e) => {
                if in_text {
                    if let Some(s) = current.as_mut() {
                        s.push_str(&e.unescape()?);
                    }
                }
            }
            Event::CData(e) => {
                if in_text {
                    if let Some(s) = current.as_mut() {
                        s.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => {
                    if let Some(s) = current.take() {
                        strings.push(s);
                    }
                }
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

// ============================================================================
// Worksheet Rows
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    SharedString,
    InlineString,
    Plain,
}

impl CellKind {
    fn of(element: &BytesStart<'_>) -> Self {
        let kind = element
            .attributes()
            .flatten()
            .find(|attr| attr.key.local_name().as_ref() == b"t");
        match kind.as_ref().map(|attr| attr.value.as_ref()) {
            Some(b"s") => CellKind::SharedString,
            Some(b"inlineStr") => CellKind::InlineString,
            _ => CellKind::Plain,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    None,
    Value,
    Inline,
}

/// A `<c>` element being read.
#[derive(Debug)]
struct CellState {
    kind: CellKind,
    value: Option<String>,
    inline: String,
    capture: Capture,
    in_phonetic: bool,
}

impl CellState {
    fn new(kind: CellKind) -> Self {
        Self {
            kind,
            value: None,
            inline: String::new(),
            capture: Capture::None,
            in_phonetic: false,
        }
    }

    fn push_text(&mut self, text: &str) {
        match self.capture {
            Capture::Value => {
                if let Some(v) = self.value.as_mut() {
                    v.push_str(text);
                }
            }
            Capture::Inline => self.inline.push_str(text),
            Capture::None => {}
        }
    }

    /// Resolves the cell to its text, or `None` when it has no usable value.
    fn resolve(self, shared_strings: &[String]) -> Option<String> {
        match (self.kind, self.value) {
            (CellKind::SharedString, Some(raw)) if !raw.is_empty() => raw
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|idx| shared_strings.get(idx))
                .filter(|s| !s.is_empty())
                .cloned(),
            (CellKind::InlineString, None) if !self.inline.is_empty() => Some(self.inline),
            (_, Some(raw)) if !raw.is_empty() => Some(raw),
            _ => None,
        }
    }
}

/// Streams worksheet rows, calling `on_row` with each row's 1-based position
/// and its resolved cell values in document order.
fn scan_rows<R, F>(source: R, shared_strings: &[String], mut on_row: F) -> Result<(), ExtractionError>
where
    R: BufRead,
    F: FnMut(usize, &[Option<String>]),
{
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();
    let mut position = 0usize;
    let mut in_row = false;
    let mut cells: Vec<Option<String>> = Vec::new();
    let mut cell: Option<CellState> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    in_row = true;
                    cells.clear();
                }
                b"c" if in_row => cell = Some(CellState::new(CellKind::of(&e))),
                b"v" => {
                    if let Some(c) = cell.as_mut() {
                        if c.value.is_none() {
                            c.value = Some(String::new());
                            c.capture = Capture::Value;
                        }
                    }
                }
                b"rPh" => {
                    if let Some(c) = cell.as_mut() {
                        c.in_phonetic = true;
                    }
                }
                b"t" => {
                    if let Some(c) = cell.as_mut() {
                        if c.kind == CellKind::InlineString && !c.in_phonetic {
                            c.capture = Capture::Inline;
                        }
                    }
                }
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => {
                    position += 1;
                    on_row(position, &[]);
                }
                b"c" if in_row => cells.push(None),
                _ => {}
            },
            Event::Text(e) => {
                if let Some(c) = cell.as_mut() {
                    if c.capture != Capture::None {
                        c.push_text(&e.unescape()?);
                    }
                }
            }
            Event::CData(e) => {
                if let Some(c) = cell.as_mut() {
                    c.push_text(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => {
                    if let Some(c) = cell.as_mut() {
                        c.capture = Capture::None;
                    }
                }
                b"rPh" => {
                    if let Some(c) = cell.as_mut() {
                        c.in_phonetic = false;
                    }
                }
                b"c" => {
                    if let Some(c) = cell.take() {
                        cells.push(c.resolve(shared_strings));
                    }
                }
                b"row" if in_row => {
                    in_row = false;
                    position += 1;
                    on_row(position, &cells);
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
