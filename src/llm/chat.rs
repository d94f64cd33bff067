use crate::document::Document;
use crate::llm::memory::ChatHistory;
use crate::llm::semantic_search::SemanticSearch;
use crate::providers::traits::{ChatMessage, CompletionProvider};
use anyhow::Result;
use log::debug;
use std::sync::Arc;

const CONDENSE_QUESTION_PROMPT: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question, in its original language.

Chat History:
{chat_history}
Follow Up Input: {question}
Standalone question:";

const QA_SYSTEM_PROMPT: &str = "Use the following pieces of context to answer the user's question.
If you don't know the answer, just say that you don't know, don't try to make up an answer.
----------------
{context}";

#[derive(Debug, Clone)]
pub struct ChainResponse {
    pub answer: String,
    /// The question actually used for retrieval: the input itself on the
    /// first turn, the condensed standalone question afterwards.
    pub generated_question: String,
    pub source_documents: Vec<Document>,
}

/// Retrieval-augmented question answering over a conversation: condense the
/// follow-up with the history, fetch the `k` nearest chunks, stuff them into
/// the QA prompt.
pub struct ConversationalRetrievalChain {
    llm: Arc<dyn CompletionProvider>,
    retriever: SemanticSearch,
    k: usize,
}

impl ConversationalRetrievalChain {
    pub fn new(llm: Arc<dyn CompletionProvider>, retriever: SemanticSearch, k: usize) -> Self {
        Self { llm, retriever, k }
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    pub async fn ask(&self, question: &str, history: &ChatHistory) -> Result<ChainResponse> {
        let generated_question = if history.is_empty() {
            question.to_string()
        } else {
            self.condense_question(question, history).await?
        };

        let hits = self.retriever.similarity_search(&generated_question, self.k).await?;
        for hit in &hits {
            debug!(
                "Retrieved {} (page {:?}) score {:.3}",
                hit.document.metadata.source, hit.document.metadata.page, hit.score
            );
        }
        let source_documents: Vec<Document> = hits.into_iter().map(|hit| hit.document).collect();

        let messages = vec![
            ChatMessage::system(QA_SYSTEM_PROMPT.replace("{context}", &stuff_documents(&source_documents))),
            ChatMessage::user(generated_question.clone()),
        ];
        let answer = self.llm.complete(&messages).await?;

        Ok(ChainResponse {
            answer,
            generated_question,
            source_documents,
        })
    }

    async fn condense_question(&self, question: &str, history: &ChatHistory) -> Result<String> {
        let prompt = CONDENSE_QUESTION_PROMPT
            .replace("{chat_history}", &history.to_buffer_string())
            .replace("{question}", question);

        let standalone = self.llm.complete(&[ChatMessage::user(prompt)]).await?;
        debug!("Condensed question: {}", standalone.trim());
        Ok(standalone.trim().to_string())
    }
}

fn stuff_documents(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|d| d.page_content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
