mod loader;
mod splitter;

use serde::{Deserialize, Serialize};

pub use loader::{load_docx, load_file, load_pdf, load_text, LoaderError};
pub use splitter::{RecursiveCharacterTextSplitter, SplitterError};

#[cfg(test)]
pub(crate) use loader::tests::{write_docx, write_pdf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// A unit of loaded text plus where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(page_content: impl Into<String>, source: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: DocumentMetadata {
                source: source.into(),
                page,
            },
        }
    }
}
