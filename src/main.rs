use anyhow::{Context, Result};
use clap::Parser;
use docbot::commands::{self, system, CommandHandler, Flow};
use docbot::config::Settings;
use docbot::database::VectorDB;
use docbot::document::RecursiveCharacterTextSplitter;
use docbot::llm::{ConversationalRetrievalChain, SemanticSearch};
use docbot::providers::OpenAIProvider;
use dotenv::dotenv;
use env_logger::Env;
use log::info;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;

/// Chat with the documents in ./docs. Put OPENAI_API_KEY in .env.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize colored output
    colored::control::set_override(true);

    // Load environment variables
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let _args = Args::parse();

    run_cli_mode().await
}

async fn run_cli_mode() -> Result<()> {
    let settings = Settings::from_env()?;

    let documents = commands::import_documents(&settings.docs_dir)
        .with_context(|| format!("Failed to read documents from {}", settings.docs_dir.display()))?;

    let splitter = RecursiveCharacterTextSplitter::new(settings.chunk_size, settings.chunk_overlap)?;
    let chunks = splitter.split_documents(&documents);
    info!("Split {} documents into {} chunks", documents.len(), chunks.len());

    let provider = Arc::new(OpenAIProvider::new(&settings));
    let vector_db = VectorDB::open(settings.index_path()).await?;
    let search = SemanticSearch::new(
        vector_db,
        provider.clone(),
        settings.collection.clone(),
        settings.embedding_batch_size,
    );
    search.rebuild(&chunks).await?;

    let chain = ConversationalRetrievalChain::new(provider, search, settings.retrieval_k);
    info!("Answering with {} over the top {} chunks", chain.model_name(), settings.retrieval_k);
    let mut command_handler = CommandHandler::new(chain);

    system::print_banner();

    let mut rl = DefaultEditor::new()?;
    loop {
        match rl.readline(&system::prompt()) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    rl.add_history_entry(line.as_str())?;
                }
                if command_handler.handle_command(&line).await? == Flow::Exit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                system::print_goodbye();
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}
