pub mod commands;
pub mod config;
pub mod database;
pub mod document;
pub mod llm;
pub mod providers;

// Re-export commonly used items
pub use config::Settings;
pub use document::{Document, RecursiveCharacterTextSplitter};
pub use llm::{ChatHistory, ConversationalRetrievalChain, SemanticSearch};
