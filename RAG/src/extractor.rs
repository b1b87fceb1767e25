use regex::Regex;
use std::io::Read;

use crate::error::{RagError, Result};

/// One page (or, for non-paginated formats, one whole-document unit) of
/// extracted text.
pub struct ExtractedPage {
    pub page: Option<u32>,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileType {
    Pdf,
    Docx,
    Txt,
    Unknown,
}

pub struct Extractor {
    whitespace_re: Regex,
    blank_lines_re: Regex,
    printable_re: Regex,
}

impl Extractor {
    pub fn new() -> Self {
        Extractor {
            whitespace_re: Regex::new(r"\s+").unwrap(),
            blank_lines_re: Regex::new(r"\n\s*\n\s*\n+").unwrap(),
            printable_re: Regex::new(r#"[^\w\s\-.,;:!?()\[\]{}"'/\\@#$%^&*+=<>~`|]"#).unwrap(),
        }
    }

    pub fn extract(&self, filename: &str, content: &[u8]) -> Result<Vec<ExtractedPage>> {
        match self.detect_file_type(filename, content) {
            FileType::Pdf => self.extract_pdf(filename, content),
            FileType::Docx => self.extract_docx(filename, content),
            FileType::Txt => {
                let text = self.clean_text(&self.decode_text(content));
                Ok(if text.is_empty() {
                    Vec::new()
                } else {
                    vec![ExtractedPage { page: None, text }]
                })
            }
            FileType::Unknown => {
                log::warn!("unsupported file type for '{filename}', skipping extraction");
                Ok(Vec::new())
            }
        }
    }

    fn detect_file_type(&self, filename: &str, content: &[u8]) -> FileType {
        let lower = filename.to_lowercase();
        if lower.ends_with(".pdf") {
            return FileType::Pdf;
        }
        if lower.ends_with(".docx") {
            return FileType::Docx;
        }
        if lower.ends_with(".txt") || lower.ends_with(".text") {
            return FileType::Txt;
        }

        let head = &content[..content.len().min(1024)];
        if content.starts_with(b"%PDF") {
            return FileType::Pdf;
        }
        if content.starts_with(b"PK\x03\x04") && contains_subslice(head, b"word/") {
            return FileType::Docx;
        }
        if std::str::from_utf8(head).is_ok() {
            return FileType::Txt;
        }
        FileType::Unknown
    }

    fn extract_pdf(&self, filename: &str, content: &[u8]) -> Result<Vec<ExtractedPage>> {
        let pages = pdf_extract::extract_text_by_pages_from_mem(content).map_err(|e| RagError::Extraction {
            filename: filename.to_string(),
            cause: e.to_string(),
        })?;

        Ok(pages
            .into_iter()
            .enumerate()
            .filter_map(|(idx, raw)| {
                let cleaned = self.clean_text(&raw);
                if cleaned.is_empty() {
                    None
                } else {
                    Some(ExtractedPage {
                        page: Some((idx + 1) as u32),
                        text: cleaned,
                    })
                }
            })
            .collect())
    }

    fn extract_docx(&self, filename: &str, content: &[u8]) -> Result<Vec<ExtractedPage>> {
        let text = self.extract_docx_text(content).map_err(|e| RagError::Extraction {
            filename: filename.to_string(),
            cause: e,
        })?;
        let cleaned = self.clean_text(&text);
        Ok(if cleaned.is_empty() {
            Vec::new()
        } else {
            vec![ExtractedPage { page: None, text: cleaned }]
        })
    }

    /// Walks `word/document.xml` directly: no docx Rust crate in the
    /// ecosystem actually implements text extraction, so this reads the
    /// OOXML paragraph/table structure by hand via `zip` + `quick-xml`.
    fn extract_docx_text(&self, content: &[u8]) -> std::result::Result<String, String> {
        use quick_xml::events::Event;
        use quick_xml::reader::Reader;

        let cursor = std::io::Cursor::new(content);
        let mut archive = zip::ZipArchive::new(cursor).map_err(|e| e.to_string())?;
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| e.to_string())?
            .read_to_string(&mut xml)
            .map_err(|e| e.to_string())?;

        let mut reader = Reader::from_str(&xml);
        reader.config_mut().trim_text(false);

        let mut paragraphs: Vec<String> = Vec::new();
        let mut table_rows: Vec<String> = Vec::new();
        let mut cur_para = String::new();
        let mut cur_row: Vec<String> = Vec::new();
        let mut cur_cell = String::new();
        let mut in_text = false;

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"t" => in_text = true,
                    b"tc" => cur_cell.clear(),
                    _ => {}
                },
                Ok(Event::Text(t)) if in_text => {
                    cur_para.push_str(&t.unescape().unwrap_or_default());
                    cur_cell.push_str(&t.unescape().unwrap_or_default());
                }
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    b"p" => {
                        let trimmed = cur_para.trim().to_string();
                        if !trimmed.is_empty() {
                            paragraphs.push(trimmed);
                        }
                        cur_para.clear();
                    }
                    b"tc" => {
                        let trimmed = cur_cell.trim().to_string();
                        if !trimmed.is_empty() {
                            cur_row.push(trimmed);
                        }
                        cur_cell.clear();
                    }
                    b"tr" => {
                        if !cur_row.is_empty() {
                            table_rows.push(cur_row.join(" | "));
                        }
                        cur_row.clear();
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(e.to_string()),
                _ => {}
            }
            buf.clear();
        }

        paragraphs.extend(table_rows);
        Ok(paragraphs.join("\n"))
    }

    /// Tries utf-8, utf-16, latin-1, then cp1252 in turn before falling
    /// back to lossy utf-8, matching the original extraction pipeline's
    /// encoding fallback order.
    fn decode_text(&self, content: &[u8]) -> String {
        if let Ok(s) = std::str::from_utf8(content) {
            return s.to_string();
        }

        let (utf16, _, had_errors) = encoding_rs::UTF_16LE.decode(content);
        if !had_errors {
            return utf16.into_owned();
        }

        if let Some(latin1) = decode_latin1(content) {
            return latin1;
        }

        let (cp1252, _, had_errors) = encoding_rs::WINDOWS_1252.decode(content);
        if !had_errors {
            return cp1252.into_owned();
        }

        let (fallback, _, _) = encoding_rs::UTF_8.decode(content);
        fallback.into_owned()
    }

    fn clean_text(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let no_nul = text.replace('\x00', " ");
        let collapsed_ws = self.whitespace_re.replace_all(&no_nul, " ");
        let collapsed_blank = self.blank_lines_re.replace_all(&collapsed_ws, "\n\n");
        let printable = self.printable_re.replace_all(&collapsed_blank, " ");
        printable.trim().to_string()
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// True ISO-8859-1: every byte maps directly to the Unicode codepoint of
/// the same value. Unlike `encoding_rs::WINDOWS_1252` (which remaps the
/// 0x80-0x9F range to printable characters per the WHATWG standard), this
/// never substitutes a replacement character, so it always succeeds.
fn decode_latin1(content: &[u8]) -> Option<String> {
    Some(content.iter().map(|&b| b as char).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_whitespace_and_null_bytes() {
        let e = Extractor::new();
        let cleaned = e.clean_text("hello\x00  world\n\n\n\nagain");
        assert_eq!(cleaned, "hello world\n\nagain");
    }

    #[test]
    fn detects_type_by_extension_first() {
        let e = Extractor::new();
        assert_eq!(e.detect_file_type("report.PDF", b"not actually pdf"), FileType::Pdf);
        assert_eq!(e.detect_file_type("notes.txt", b"hello"), FileType::Txt);
    }

    #[test]
    fn detects_pdf_by_magic_bytes_when_extension_unknown() {
        let e = Extractor::new();
        assert_eq!(e.detect_file_type("blob", b"%PDF-1.4 ..."), FileType::Pdf);
    }

    #[test]
    fn unsupported_binary_yields_unknown() {
        let e = Extractor::new();
        assert_eq!(e.detect_file_type("blob", &[0xff, 0xfe, 0x00, 0x01]), FileType::Unknown);
    }

    #[test]
    fn txt_extraction_returns_empty_vec_for_blank_content() {
        let e = Extractor::new();
        let pages = e.extract("empty.txt", b"   \n\n  ").unwrap();
        assert!(pages.is_empty());
    }
}
