pub mod vector_db;

pub use vector_db::{cosine_similarity, Payload, VectorDB, VectorDBError};
