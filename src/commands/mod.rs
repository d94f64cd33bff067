use crate::llm::{ChatHistory, ConversationalRetrievalChain};
use anyhow::Result;

pub mod document;
pub mod system;

pub use document::import_documents;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Exit,
    Empty,
    Question(String),
}

pub fn parse_input(line: &str) -> Input {
    let input = line.trim();
    if input.is_empty() {
        Input::Empty
    } else if system::is_exit_command(input) {
        Input::Exit
    } else {
        Input::Question(input.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Drives one REPL turn: exit tokens stop, empty lines re-prompt, anything
/// else goes through the retrieval chain and is remembered.
pub struct CommandHandler {
    chain: ConversationalRetrievalChain,
    history: ChatHistory,
}

impl CommandHandler {
    pub fn new(chain: ConversationalRetrievalChain) -> Self {
        Self {
            chain,
            history: ChatHistory::new(),
        }
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub async fn handle_command(&mut self, line: &str) -> Result<Flow> {
        match parse_input(line) {
            Input::Exit => {
                system::print_goodbye();
                Ok(Flow::Exit)
            }
            Input::Empty => Ok(Flow::Continue),
            Input::Question(question) => {
                let response = self.chain.ask(&question, &self.history).await?;
                system::print_answer(&response.answer);
                self.history.push(question, response.answer);
                Ok(Flow::Continue)
            }
        }
    }
}
