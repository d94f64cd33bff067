pub mod openai;
pub mod traits;

pub use openai::OpenAIProvider;
pub use traits::{ChatMessage, ChatRole, CompletionProvider, EmbeddingProvider};
