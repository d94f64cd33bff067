use super::Document;
use log::debug;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::cell::Cell;
use std::fs::{self, File};
use std::io::Read;
use std::panic;
use std::path::Path;
use std::sync::Once;
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX archive error: {0}")]
    Zip(#[from] ZipError),
    #[error("DOCX XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Pdf,
    Docx,
    Text,
}

impl FileKind {
    fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy();
        if name.ends_with(".pdf") {
            Some(FileKind::Pdf)
        } else if name.ends_with(".docx") || name.ends_with(".doc") {
            Some(FileKind::Docx)
        } else if name.ends_with(".txt") {
            Some(FileKind::Text)
        } else {
            None
        }
    }
}

/// Loads a single file, picking the loader from its extension.
///
/// Unsupported extensions yield no documents and no error.
pub fn load_file(path: &Path) -> Result<Vec<Document>, LoaderError> {
    match FileKind::from_path(path) {
        Some(FileKind::Pdf) => load_pdf(path),
        Some(FileKind::Docx) => load_docx(path),
        Some(FileKind::Text) => load_text(path),
        None => {
            debug!("Skipping unsupported file {}", path.display());
            Ok(Vec::new())
        }
    }
}

pub fn load_text(path: &Path) -> Result<Vec<Document>, LoaderError> {
    let text = fs::read_to_string(path)?;
    Ok(vec![Document::new(text, path.display().to_string(), None)])
}

/// One document per page, pages numbered from 0.
pub fn load_pdf(path: &Path) -> Result<Vec<Document>, LoaderError> {
    let bytes = fs::read(path)?;

    // pdf-extract panics on some malformed inputs instead of returning an error
    let pages = catch_quietly(|| pdf_extract::extract_text_from_mem_by_pages(&bytes))
        .map_err(|_| LoaderError::Pdf("extractor panicked on malformed PDF".to_string()))?
        .map_err(|e| LoaderError::Pdf(format!("{:?}", e)))?;

    let source = path.display().to_string();
    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| Document::new(text, source.clone(), Some(i as u32)))
        .collect())
}

thread_local! {
    static QUIET_PANIC: Cell<bool> = const { Cell::new(false) };
}

static INSTALL_QUIET_HOOK: Once = Once::new();

/// `catch_unwind` that keeps the panic hook from printing to stderr. Only the
/// calling thread is silenced; panics elsewhere still reach the previous hook.
fn catch_quietly<R>(f: impl FnOnce() -> R + panic::UnwindSafe) -> std::thread::Result<R> {
    INSTALL_QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !QUIET_PANIC.with(Cell::get) {
                previous(info);
            }
        }));
    });

    QUIET_PANIC.with(|quiet| quiet.set(true));
    let result = panic::catch_unwind(f);
    QUIET_PANIC.with(|quiet| quiet.set(false));
    result
}

/// Headers, then the body, then footers, concatenated in that order.
pub fn load_docx(path: &Path) -> Result<Vec<Document>, LoaderError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let mut parts: Vec<(u8, String)> = archive
        .file_names()
        .filter_map(|name| docx_part_rank(name).map(|rank| (rank, name.to_string())))
        .collect();
    parts.sort_by_key(|(rank, _)| *rank);

    if !parts.iter().any(|(rank, _)| *rank == 1) {
        return Err(ZipError::FileNotFound.into());
    }

    let mut text = String::new();
    for (_, name) in parts {
        let mut xml = String::new();
        archive.by_name(&name)?.read_to_string(&mut xml)?;
        text.push_str(&extract_docx_text(&xml)?);
    }

    Ok(vec![Document::new(text.trim(), path.display().to_string(), None)])
}

/// Ordering of the archive parts that carry text: `word/headerN.xml` is 0,
/// `word/document.xml` is 1, `word/footerN.xml` is 2.
fn docx_part_rank(name: &str) -> Option<u8> {
    let numbered = |prefix: &str| {
        name.strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(".xml"))
            .is_some_and(|n| n.chars().all(|c| c.is_ascii_digit()))
    };
    if numbered("word/header") {
        Some(0)
    } else if name == "word/document.xml" {
        Some(1)
    } else if numbered("word/footer") {
        Some(2)
    } else {
        None
    }
}

/// Flattens WordprocessingML text: a blank line before every paragraph,
/// tabs and breaks kept, everything outside `w:t` runs dropped.
fn extract_docx_text(xml: &str) -> Result<String, LoaderError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => text.push_str("\n\n"),
                b"w:t" => in_run_text = true,
                _ => {}
            },
            Event::End(e) => {
                if e.name().as_ref() == b"w:t" {
                    in_run_text = false;
                }
            }
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => text.push_str("\n\n"),
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_run_text => text.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}
