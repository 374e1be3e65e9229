// Document text extraction module
pub mod text;

pub use text::{extract_text, extract_text_from_bytes, get_page_count};

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Obtain the raw text of a request document, dispatching on extension.
///
/// Plain-text exports (`.txt`) are read verbatim; everything else goes
/// through the PDF content-stream path.
pub fn document_text(path: &Path) -> Result<String> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("txt") => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => text::extract_text(path),
    }
}
