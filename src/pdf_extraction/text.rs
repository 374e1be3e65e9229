// PDF TEXT EXTRACTION - Pure Rust Implementation
use anyhow::{Context, Result};
use lopdf::{Document, Object};
use std::path::Path;

/// Extract the full text of a PDF, page order preserved.
///
/// Text strings on a page are joined with single spaces and each page ends
/// with a newline, which is the shape the field patterns downstream expect.
pub fn extract_text(path: &Path) -> Result<String> {
    let document = Document::load(path)
        .with_context(|| format!("failed to read PDF {}", path.display()))?;
    text_from_document(&document)
}

/// Same as [`extract_text`] but from an in-memory byte buffer.
pub fn extract_text_from_bytes(bytes: &[u8]) -> Result<String> {
    let document = Document::load_mem(bytes).context("failed to read PDF from memory")?;
    text_from_document(&document)
}

pub fn get_page_count(path: &Path) -> Result<usize> {
    let document = Document::load(path)
        .with_context(|| format!("failed to read PDF {}", path.display()))?;
    Ok(document.get_pages().len())
}

fn text_from_document(document: &Document) -> Result<String> {
    let mut full_text = String::new();

    // get_pages returns a BTreeMap keyed by page number, so iteration
    // preserves document order.
    for (_page_num, page_id) in document.get_pages() {
        let page_dict = document.get_object(page_id)?.as_dict()?;

        let items = match page_dict.get(b"Contents") {
            Ok(contents) => {
                let content_data = get_content_data(document, contents)?;
                extract_text_items(&content_data)
            }
            // A page without content streams contributes an empty line.
            Err(_) => Vec::new(),
        };

        full_text.push_str(&items.join(" "));
        full_text.push('\n');
    }

    Ok(full_text)
}

// Pull the show-text operands (Tj / TJ) out of a decoded content stream
fn extract_text_items(content_data: &[u8]) -> Vec<String> {
    let content_str = String::from_utf8_lossy(content_data);
    let mut items = Vec::new();

    for line in content_str.lines() {
        let line = line.trim();

        if line.contains("Tj") {
            // Show text string
            if let Some(text) = extract_text_from_tj(line) {
                items.push(text);
            }
        } else if line.contains("TJ") {
            // Show text with individual glyph positioning
            if let Some(text) = extract_text_from_tj_array(line) {
                items.push(text);
            }
        }
    }

    items
}

// Get content data from content object
fn get_content_data(document: &Document, contents: &Object) -> Result<Vec<u8>> {
    match contents {
        Object::Reference(r) => {
            let obj = document.get_object(*r)?;
            get_content_data(document, obj)
        }
        Object::Stream(stream) => Ok(stream.decompressed_content()?),
        Object::Array(arr) => {
            let mut data = Vec::new();
            for item in arr {
                let item_data = get_content_data(document, item)?;
                data.extend_from_slice(&item_data);
                data.push(b'\n');
            }
            Ok(data)
        }
        _ => Ok(Vec::new()),
    }
}

// Extract text from Tj operator
fn extract_text_from_tj(line: &str) -> Option<String> {
    // Find text between parentheses
    if let Some(start) = line.find('(') {
        if let Some(end) = line.rfind(')') {
            if end > start {
                let text = &line[start + 1..end];
                return Some(decode_pdf_string(text));
            }
        }
    }
    None
}

// Extract text from TJ array operator
fn extract_text_from_tj_array(line: &str) -> Option<String> {
    let start = line.find('[')?;
    let end = line.rfind(']')?;
    if end <= start {
        return None;
    }

    let array_content = &line[start + 1..end];
    let mut result = String::new();

    // Extract the string elements, skipping the kerning numbers
    let mut in_string = false;
    let mut current_string = String::new();

    for ch in array_content.chars() {
        if ch == '(' && !in_string {
            in_string = true;
            current_string.clear();
        } else if ch == ')' && in_string {
            in_string = false;
            result.push_str(&decode_pdf_string(&current_string));
        } else if in_string {
            current_string.push(ch);
        }
    }

    if !result.is_empty() {
        Some(result)
    } else {
        None
    }
}

// Basic PDF string decoder
fn decode_pdf_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            // Handle escape sequences
            if let Some(next) = chars.next() {
                match next {
                    'n' => result.push('\n'),
                    'r' => result.push('\r'),
                    't' => result.push('\t'),
                    '\\' => result.push('\\'),
                    '(' => result.push('('),
                    ')' => result.push(')'),
                    _ => {
                        // Octal escape or just add the character
                        result.push(next);
                    }
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tj_operand_extracted() {
        assert_eq!(
            extract_text_from_tj("(Number: RITM0012345) Tj"),
            Some("Number: RITM0012345".to_string())
        );
        assert_eq!(extract_text_from_tj("BT /F1 12 Tf"), None);
    }

    #[test]
    fn tj_array_joins_string_elements() {
        assert_eq!(
            extract_text_from_tj_array("[(Sta) -12 (te:) 4 ( Approved)] TJ"),
            Some("State: Approved".to_string())
        );
        assert_eq!(extract_text_from_tj_array("[ -12 4 ] TJ"), None);
    }

    #[test]
    fn pdf_string_escapes_decoded() {
        assert_eq!(decode_pdf_string(r"a\(b\)c"), "a(b)c");
        assert_eq!(decode_pdf_string(r"line\nbreak"), "line\nbreak");
        assert_eq!(decode_pdf_string(r"back\\slash"), "back\\slash");
    }

    #[test]
    fn text_items_from_raw_stream() {
        let stream = b"BT\n/F1 12 Tf\n(Number: RITM0042) Tj\n[(State:) 3 ( Approved)] TJ\nET";
        let items = extract_text_items(stream);
        assert_eq!(items, vec!["Number: RITM0042", "State: Approved"]);
    }
}
