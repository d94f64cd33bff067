use crate::document::{load_file, Document, LoaderError};
use colored::Colorize;
use log::error;
use std::fs;
use std::path::Path;

/// Loads every file in `dir`. A file that fails to load is reported and
/// skipped; only an unreadable directory is an error.
pub fn import_documents(dir: &Path) -> Result<Vec<Document>, LoaderError> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();

    let total = entries.len();
    let mut documents = Vec::new();
    for (i, path) in entries.iter().enumerate() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        println!("Importing: {} {} / {}", name, i + 1, total);

        match load_file(path) {
            Ok(docs) => documents.extend(docs),
            Err(e) => {
                println!("{}", format!("Error importing file: {}", name).red());
                error!("Error importing file: {}: {}", name, e);
            }
        }
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{write_docx, write_pdf};

    #[test]
    fn test_only_supported_files_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "text file body").unwrap();
        write_pdf(&dir.path().join("paper.pdf"), "Hello PDF");
        fs::write(dir.path().join("data.csv"), "a,b,c\n1,2,3").unwrap();

        let docs = import_documents(dir.path()).unwrap();
        assert_eq!(docs.len(), 2);

        let sources: Vec<&str> = docs.iter().map(|d| d.metadata.source.as_str()).collect();
        assert!(sources.iter().any(|s| s.ends_with("notes.txt")));
        assert!(sources.iter().any(|s| s.ends_with("paper.pdf")));
        assert!(!sources.iter().any(|s| s.ends_with("data.csv")));
        assert!(docs.iter().any(|d| d.page_content == "text file body"));
        assert!(docs.iter().any(|d| d.page_content.contains("Hello")));
    }

    #[test]
    fn test_corrupted_pdf_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a_broken.pdf"), b"%PDF-1.7 garbage without objects").unwrap();
        fs::write(dir.path().join("b_notes.txt"), "still here").unwrap();
        write_docx(&dir.path().join("c_report.docx"), &["docx body"]);

        let docs = import_documents(dir.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].page_content, "still here");
        assert_eq!(docs[1].page_content, "docx body");
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(import_documents(&dir.path().join("docs")).is_err());
    }

    #[test]
    fn test_empty_directory_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(import_documents(dir.path()).unwrap().is_empty());
    }
}
