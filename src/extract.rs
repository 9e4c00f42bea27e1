//! Format-specific text extraction: PDF, DOCX, TXT, and Markdown sources
//! become plain UTF-8 text ready for chunking.

use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::OnceLock;

use pulldown_cmark::{Event, Parser, TagEnd};
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader as XmlReader;
use regex::Regex;
use tokio::fs;

use crate::types::RagError;

const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "docx", "txt", "md"];

/// Returns `true` when the extractor handles the file's extension.
pub fn is_supported(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Type tag recorded on the stored document, derived from the extension.
pub fn file_type(path: &Path) -> Option<String> {
    extension_of(path).filter(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Extracts plain text from a supported document on disk.
///
/// Legacy `.doc` files are rejected with a conversion hint; any other
/// unrecognized extension is an [`RagError::UnsupportedFormat`]. A missing
/// file is a validation error surfaced before extraction starts.
pub async fn extract_text(path: &Path) -> Result<String, RagError> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(RagError::Validation(format!(
            "file not found: {}",
            path.display()
        )));
    }

    match extension_of(path).as_deref() {
        Some("pdf") => extract_pdf(path).await,
        Some("docx") => extract_docx(path).await,
        Some("txt") => Ok(fs::read_to_string(path).await?),
        Some("md") => extract_markdown(path).await,
        Some("doc") => Err(RagError::UnsupportedFormat(
            "legacy .doc files are not supported; convert to .docx".to_string(),
        )),
        Some(other) => Err(RagError::UnsupportedFormat(format!(
            "file type .{other} is not supported"
        ))),
        None => Err(RagError::UnsupportedFormat(
            "file has no extension".to_string(),
        )),
    }
}

async fn extract_pdf(path: &Path) -> Result<String, RagError> {
    let path = path.to_path_buf();
    let text = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text(&path)
            .map_err(|err| RagError::Extraction(format!("pdf extraction failed: {err}")))
    })
    .await
    .map_err(|err| RagError::Extraction(format!("pdf extraction task failed: {err}")))??;
    Ok(normalize_whitespace(&text))
}

async fn extract_docx(path: &Path) -> Result<String, RagError> {
    let bytes = fs::read(path).await?;
    let text = tokio::task::spawn_blocking(move || docx_to_text(&bytes))
        .await
        .map_err(|err| RagError::Extraction(format!("docx extraction task failed: {err}")))??;
    Ok(normalize_whitespace(&text))
}

/// Pulls the text runs out of a DOCX archive's `word/document.xml`.
///
/// Paragraph ends become newlines so the chunker sees line structure.
fn docx_to_text(bytes: &[u8]) -> Result<String, RagError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| RagError::Extraction(format!("not a docx archive: {err}")))?;
    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|err| RagError::Extraction(format!("docx missing document body: {err}")))?
        .read_to_string(&mut document_xml)
        .map_err(|err| RagError::Extraction(format!("docx body unreadable: {err}")))?;

    let mut reader = XmlReader::from_str(&document_xml);
    let mut text = String::new();
    loop {
        match reader.read_event() {
            Ok(XmlEvent::Text(t)) => {
                let piece = t
                    .unescape()
                    .map_err(|err| RagError::Extraction(format!("docx text decode: {err}")))?;
                text.push_str(&piece);
            }
            Ok(XmlEvent::End(e)) if e.local_name().as_ref() == b"p" => text.push('\n'),
            Ok(XmlEvent::Empty(e)) if e.local_name().as_ref() == b"br" => text.push('\n'),
            Ok(XmlEvent::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(RagError::Extraction(format!("docx parse error: {err}")));
            }
        }
    }
    Ok(text)
}

async fn extract_markdown(path: &Path) -> Result<String, RagError> {
    let markdown = fs::read_to_string(path).await?;
    Ok(normalize_whitespace(&markdown_to_text(&markdown)))
}

/// Renders Markdown down to plain text, keeping block boundaries as newlines.
fn markdown_to_text(markdown: &str) -> String {
    let mut text = String::new();
    for event in Parser::new(markdown) {
        match event {
            Event::Text(t) => text.push_str(&t),
            Event::Code(code) => text.push_str(&code),
            Event::SoftBreak => text.push(' '),
            Event::HardBreak => text.push('\n'),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::CodeBlock
                | TagEnd::BlockQuote(_),
            ) => text.push('\n'),
            _ => {}
        }
    }
    text
}

/// Collapses runs of spaces/tabs and trims every line, dropping the noise the
/// format converters leave behind.
fn normalize_whitespace(text: &str) -> String {
    static SPACES: OnceLock<Regex> = OnceLock::new();
    let spaces = SPACES.get_or_init(|| Regex::new(r"[ \t]+").expect("static regex"));

    text.lines()
        .map(|line| spaces.replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
