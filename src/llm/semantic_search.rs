use crate::database::{Payload, VectorDB};
use crate::document::{Document, DocumentMetadata};
use crate::providers::traits::EmbeddingProvider;
use anyhow::{anyhow, bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub document: Document,
    pub score: f32,
}

/// Embeds document chunks into a `VectorDB` collection and answers nearest
/// neighbour queries against it.
#[derive(Clone)]
pub struct SemanticSearch {
    vector_db: VectorDB,
    embedder: Arc<dyn EmbeddingProvider>,
    collection_name: String,
    batch_size: usize,
}

impl SemanticSearch {
    pub fn new(
        vector_db: VectorDB,
        embedder: Arc<dyn EmbeddingProvider>,
        collection_name: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            vector_db,
            embedder,
            collection_name: collection_name.into(),
            batch_size: batch_size.max(1),
        }
    }

    /// Replaces the collection with embeddings of `documents`. Returns the
    /// number of stored chunks.
    pub async fn rebuild(&self, documents: &[Document]) -> Result<usize> {
        if documents.is_empty() {
            bail!("No documents to index: nothing was loaded from the docs folder");
        }

        if self.vector_db.delete_collection(&self.collection_name).await? {
            info!("Dropped previous collection {}", self.collection_name);
        }

        let pb = ProgressBar::new(documents.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?,
        );
        pb.set_message("Embedding chunks");

        let mut stored = 0;
        for batch in documents.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|d| d.page_content.clone()).collect();
            let vectors = self.embedder.embed_documents(&texts).await?;
            if vectors.len() != batch.len() {
                bail!("Expected {} embeddings, got {}", batch.len(), vectors.len());
            }

            if stored == 0 {
                let dimension = vectors.first().map(Vec::len).unwrap_or_default();
                self.vector_db
                    .create_collection(&self.collection_name, dimension as u64)
                    .await?;
            }

            let points = vectors
                .into_iter()
                .zip(batch)
                .map(|(vector, doc)| Ok((vector, to_payload(doc)?)))
                .collect::<Result<Vec<_>>>()?;
            stored += self
                .vector_db
                .store_vectors(&self.collection_name, points)
                .await?
                .len();
            pb.inc(batch.len() as u64);
        }

        pb.finish_with_message("Index ready");
        info!("Indexed {} chunks into {}", stored, self.collection_name);
        Ok(stored)
    }

    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let query_vector = self.embedder.embed_query(query).await?;
        let results = self
            .vector_db
            .search_vectors(&self.collection_name, query_vector, k as u64)
            .await?;

        results
            .into_iter()
            .map(|(id, score, payload)| -> Result<SearchResult> {
                let document = from_payload(&payload)
                    .with_context(|| format!("Malformed payload on point {}", id))?;
                Ok(SearchResult { document, score })
            })
            .collect()
    }
}

fn from_payload(payload: &Payload) -> Result<Document> {
    let text = payload
        .get("text")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("missing text"))?;
    let metadata = payload
        .get("metadata")
        .cloned()
        .ok_or_else(|| anyhow!("missing metadata"))?;
    Ok(Document {
        page_content: text.to_string(),
        metadata: serde_json::from_value::<DocumentMetadata>(metadata)?,
    })
}

fn to_payload(doc: &Document) -> Result<Payload> {
    let mut payload = Payload::new();
    payload.insert("text".to_string(), serde_json::Value::String(doc.page_content.clone()));
    payload.insert("metadata".to_string(), serde_json::to_value(&doc.metadata)?);
    Ok(payload)
}
