//! Text extractors for binary document formats.

use super::loader::TextExtractor;
use lexrag_core::error::{LexragError, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read};

fn malformed(format: &str, message: impl std::fmt::Display) -> LexragError {
    LexragError::Serialization {
        format: format.to_string(),
        message: message.to_string(),
    }
}

/// Extractor for `.pdf` files, page by page in document order.
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extensions(&self) -> &[&'static str] {
        &[".pdf"]
    }

    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let document = lopdf::Document::load_mem(bytes).map_err(|e| malformed("PDF", e))?;
        let pages: Vec<u32> = document.get_pages().keys().copied().collect();
        if pages.is_empty() {
            return Ok(String::new());
        }
        document.extract_text(&pages).map_err(|e| malformed("PDF", e))
    }
}

/// Extractor for `.docx` files.
///
/// Reads `word/document.xml` from the package and keeps the text runs.
/// Paragraph ends and breaks become newlines, tabs stay tabs.
pub struct DocxExtractor;

const DOCUMENT_PART: &str = "word/document.xml";

impl TextExtractor for DocxExtractor {
    fn extensions(&self) -> &[&'static str] {
        &[".docx"]
    }

    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| malformed("DOCX", e))?;
        let mut xml = String::new();
        archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| malformed("DOCX", format!("{DOCUMENT_PART}: {e}")))?
            .read_to_string(&mut xml)
            .map_err(|e| malformed("DOCX", e))?;
        document_text(&xml)
    }
}

fn document_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event().map_err(|e| malformed("DOCX", e))? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text_run = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => text.push('\t'),
                b"br" | b"cr" => text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text_run => {
                text.push_str(std::str::from_utf8(&t).map_err(|e| malformed("DOCX", e))?);
            }
            Event::GeneralRef(r) if in_text_run => {
                if let Some(c) = r.resolve_char_ref().map_err(|e| malformed("DOCX", e))? {
                    text.push(c);
                } else {
                    let name = std::str::from_utf8(&r).map_err(|e| malformed("DOCX", e))?;
                    let resolved = quick_xml::escape::resolve_predefined_entity(name)
                        .ok_or_else(|| malformed("DOCX", format!("unknown entity '&{name};'")))?;
                    text.push_str(resolved);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text.trim_end().to_string())
}
