pub mod chat;
pub mod memory;
pub mod semantic_search;

pub use chat::{ChainResponse, ConversationalRetrievalChain};
pub use memory::ChatHistory;
pub use semantic_search::{SearchResult, SemanticSearch};
