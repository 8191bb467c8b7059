//! PDF document and page metadata extraction
//!
//! Built on lopdf. Path accessibility problems are usage errors; every
//! parsing problem after the file is confirmed readable is reported
//! inside the result. Page-level failures are isolated: a page with a
//! broken MediaBox gets the US Letter default, a page whose text cannot
//! be decoded contributes an empty string.

use crate::error::{Error, Result};
use lopdf::{Document, Object, ObjectId};
use std::path::Path;
use std::time::{Duration, Instant};

/// US Letter fallback when a page has no usable MediaBox
const DEFAULT_PAGE_WIDTH: f64 = 612.0;
const DEFAULT_PAGE_HEIGHT: f64 = 792.0;

/// Width and height of one page in points
#[derive(Debug, Clone, PartialEq)]
pub struct PageDimensions {
    pub width: f64,
    pub height: f64,
    pub unit: &'static str,
}

impl Default for PageDimensions {
    fn default() -> Self {
        Self {
            width: DEFAULT_PAGE_WIDTH,
            height: DEFAULT_PAGE_HEIGHT,
            unit: "pt",
        }
    }
}

/// Fields of the document information dictionary. Absent entries stay
/// `None`; dates are ISO-8601 when they parse, raw otherwise.
#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub producer: Option<String>,
    pub creator: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
}

/// Result of a pdf_info run
#[derive(Debug, Clone)]
pub struct PdfInfoReport {
    pub success: bool,
    pub error_message: Option<String>,
    pub file_path: String,
    pub file_size_bytes: u64,
    pub page_count: usize,
    pub page_dimensions: Vec<PageDimensions>,
    pub pdf_version: Option<String>,
    pub is_encrypted: bool,
    pub metadata: DocumentMetadata,
    /// Per-page text when requested; a failed page is an empty string
    pub text_content: Option<Vec<String>>,
    pub elapsed: Duration,
}

impl PdfInfoReport {
    fn new(file_path: &str, file_size_bytes: u64) -> Self {
        Self {
            success: false,
            error_message: None,
            file_path: file_path.to_string(),
            file_size_bytes,
            page_count: 0,
            page_dimensions: Vec::new(),
            pdf_version: None,
            is_encrypted: false,
            metadata: DocumentMetadata::default(),
            text_content: None,
            elapsed: Duration::ZERO,
        }
    }

    fn fail(mut self, message: String, start: Instant) -> Self {
        self.error_message = Some(message);
        self.elapsed = start.elapsed();
        self
    }
}

/// Extract metadata and optionally text from a PDF file.
pub fn extract_pdf_info(
    file_path: &str,
    include_text: bool,
    password: Option<&str>,
) -> Result<PdfInfoReport> {
    let start = Instant::now();

    if file_path.is_empty() {
        return Err(Error::EmptyPath);
    }
    let path = Path::new(file_path);
    let file_size = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::FileNotFound {
                path: file_path.to_string(),
            })
        }
        Err(e) => {
            return Err(Error::FileAccess {
                path: file_path.to_string(),
                reason: e.to_string(),
            })
        }
    };

    let mut report = PdfInfoReport::new(file_path, file_size);

    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => return Ok(report.fail(format!("Failed to read PDF: {}", e), start)),
    };
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Ok(report.fail("Not a valid PDF file: missing %PDF header".to_string(), start));
    }

    let mut doc = match Document::load_mem(&data) {
        Ok(doc) => doc,
        Err(e) => return Ok(report.fail(format!("Not a valid PDF file: {}", e), start)),
    };

    report.pdf_version = Some(doc.version.clone());
    report.is_encrypted = doc.trailer.get(b"Encrypt").is_ok();

    if report.is_encrypted {
        if let Some(password) = password {
            if let Err(e) = doc.decrypt(password) {
                return Ok(report.fail(format!("Failed to decrypt PDF: {}", e), start));
            }
        }
        // No password: continue best-effort; structural reads may come
        // back empty but must not fail the extraction.
    }

    let pages = doc.get_pages();
    report.page_count = pages.len();
    report.metadata = extract_document_metadata(&doc);
    report.page_dimensions = pages
        .values()
        .map(|&page_id| page_dimensions(&doc, page_id))
        .collect();

    if include_text {
        let text_content = pages
            .keys()
            .map(|&number| doc.extract_text(&[number]).unwrap_or_default())
            .collect();
        report.text_content = Some(text_content);
    }

    report.success = true;
    report.elapsed = start.elapsed();
    Ok(report)
}

fn extract_document_metadata(doc: &Document) -> DocumentMetadata {
    let dict = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => match doc.get_object(*id).ok().and_then(|o| o.as_dict().ok())
        {
            Some(dict) => dict,
            None => return DocumentMetadata::default(),
        },
        Ok(Object::Dictionary(dict)) => dict,
        _ => return DocumentMetadata::default(),
    };

    DocumentMetadata {
        title: info_string(doc, dict, b"Title"),
        author: info_string(doc, dict, b"Author"),
        subject: info_string(doc, dict, b"Subject"),
        keywords: info_string(doc, dict, b"Keywords"),
        producer: info_string(doc, dict, b"Producer"),
        creator: info_string(doc, dict, b"Creator"),
        creation_date: info_string(doc, dict, b"CreationDate").and_then(|raw| format_pdf_date(&raw)),
        modification_date: info_string(doc, dict, b"ModDate").and_then(|raw| format_pdf_date(&raw)),
    }
}

fn info_string(doc: &Document, dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    let obj = dict.get(key).ok()?;
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    match obj {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

/// PDF text strings are UTF-16BE when they carry a BOM, otherwise byte
/// text (PDFDocEncoding, close enough to Latin-1 for metadata fields).
fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&utf16)
    } else {
        match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// MediaBox for one page, with single-level Parent inheritance. Any
/// failure falls back to US Letter.
fn page_dimensions(doc: &Document, page_id: ObjectId) -> PageDimensions {
    media_box(doc, page_id)
        .map(|[width, height]| PageDimensions {
            width,
            height,
            unit: "pt",
        })
        .unwrap_or_default()
}

fn media_box(doc: &Document, page_id: ObjectId) -> Option<[f64; 2]> {
    let dict = doc.get_object(page_id).ok()?.as_dict().ok()?;

    if let Ok(obj) = dict.get(b"MediaBox") {
        return parse_rect(doc, obj);
    }

    // MediaBox is inheritable from the page tree
    let parent_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
    let parent = doc.get_object(parent_id).ok()?.as_dict().ok()?;
    parse_rect(doc, parent.get(b"MediaBox").ok()?)
}

/// Parse a [x1 y1 x2 y2] rectangle into width and height. Entries may be
/// indirect references.
fn parse_rect(doc: &Document, obj: &Object) -> Option<[f64; 2]> {
    let arr = match obj {
        Object::Array(arr) => arr,
        Object::Reference(id) => doc.get_object(*id).ok()?.as_array().ok()?,
        _ => return None,
    };
    if arr.len() != 4 {
        return None;
    }

    let mut values = [0.0f64; 4];
    for (i, item) in arr.iter().enumerate() {
        values[i] = object_number(doc, item)?;
    }
    Some([(values[2] - values[0]).abs(), (values[3] - values[1]).abs()])
}

fn object_number(doc: &Document, obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        Object::Reference(id) => object_number(doc, doc.get_object(*id).ok()?),
        _ => None,
    }
}

/// Convert a PDF date string (`D:YYYYMMDDHHMMSS` with an optional
/// `±HH'MM'` timezone) to ISO-8601. Strings shorter than a date yield
/// `None`; date-only strings become midnight UTC; anything else that
/// does not parse comes back unchanged.
pub fn format_pdf_date(raw: &str) -> Option<String> {
    let date = raw.strip_prefix("D:").unwrap_or(raw);

    if date.len() >= 14 && date.as_bytes()[..14].iter().all(|b| b.is_ascii_digit()) {
        let timezone = match date[14..].chars().next() {
            Some(sign @ ('+' | '-')) => {
                let tz = &date[14..];
                let hours = tz.get(1..3).unwrap_or("00");
                let minutes = tz
                    .find('\'')
                    .and_then(|idx| tz.get(idx + 1..idx + 3))
                    .unwrap_or("00");
                format!("{}{}:{}", sign, hours, minutes)
            }
            _ => "Z".to_string(),
        };
        Some(format!(
            "{}-{}-{}T{}:{}:{}{}",
            &date[0..4],
            &date[4..6],
            &date[6..8],
            &date[8..10],
            &date[10..12],
            &date[12..14],
            timezone
        ))
    } else if date.len() >= 8 && date.as_bytes()[..8].iter().all(|b| b.is_ascii_digit()) {
        Some(format!(
            "{}-{}-{}T00:00:00Z",
            &date[0..4],
            &date[4..6],
            &date[6..8]
        ))
    } else if date.len() < 8 {
        None
    } else {
        // Unparsable but substantial: hand the raw value back
        Some(raw.to_string())
    }
}
