use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub const DOCS_DIR: &str = "./docs";
pub const DATA_DIR: &str = "./data";
pub const INDEX_FILE: &str = "docbot.sqlite3";
pub const COLLECTION_NAME: &str = "docbot";

pub const CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const CHAT_TEMPERATURE: f32 = 0.7;
pub const EMBEDDING_MODEL: &str = "text-embedding-ada-002";

pub const CHUNK_SIZE: usize = 500;
pub const CHUNK_OVERLAP: usize = 50;
pub const RETRIEVAL_K: usize = 6;
pub const EMBEDDING_BATCH_SIZE: usize = 1000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is not set (add it to .env or the environment)")]
    MissingApiKey,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub api_base: Option<String>,
    pub docs_dir: PathBuf,
    pub data_dir: PathBuf,
    pub collection: String,
    pub chat_model: String,
    pub temperature: f32,
    pub embedding_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieval_k: usize,
    pub embedding_batch_size: usize,
}

impl Settings {
    /// Reads the credential from the process environment. Call `dotenv()` first
    /// so values from `.env` are visible here.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let api_base = lookup("OPENAI_API_BASE")
            .map(|b| b.trim().trim_end_matches('/').to_string())
            .filter(|b| !b.is_empty());

        Ok(Self {
            api_key,
            api_base,
            docs_dir: PathBuf::from(DOCS_DIR),
            data_dir: PathBuf::from(DATA_DIR),
            collection: COLLECTION_NAME.to_string(),
            chat_model: CHAT_MODEL.to_string(),
            temperature: CHAT_TEMPERATURE,
            embedding_model: EMBEDDING_MODEL.to_string(),
            chunk_size: CHUNK_SIZE,
            chunk_overlap: CHUNK_OVERLAP,
            retrieval_k: RETRIEVAL_K,
            embedding_batch_size: EMBEDDING_BATCH_SIZE,
        })
    }

    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(INDEX_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_api_key() {
        let result = Settings::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ConfigError::MissingApiKey)));

        let result = Settings::from_lookup(lookup_from(&[("OPENAI_API_KEY", "   ")]));
        assert!(matches!(result, Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn test_defaults_are_fixed() {
        let settings = Settings::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(settings.api_key, "sk-test");
        assert_eq!(settings.api_base, None);
        assert_eq!(settings.chat_model, "gpt-3.5-turbo");
        assert_eq!(settings.temperature, 0.7);
        assert_eq!(settings.chunk_size, 500);
        assert_eq!(settings.chunk_overlap, 50);
        assert_eq!(settings.retrieval_k, 6);
        assert_eq!(settings.docs_dir, PathBuf::from("./docs"));
        assert_eq!(settings.index_path(), PathBuf::from("./data").join("docbot.sqlite3"));
    }

    #[test]
    fn test_api_base_override() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_API_BASE", "http://localhost:8080/v1/"),
        ]))
        .unwrap();
        assert_eq!(settings.api_base.as_deref(), Some("http://localhost:8080/v1"));
    }
}
