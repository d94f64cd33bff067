/// Question/answer pairs of the current session, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatHistory {
    exchanges: Vec<(String, String)>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.exchanges.push((question.into(), answer.into()));
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, String)> {
        self.exchanges.iter()
    }

    /// Renders the history the way the condense prompt expects it:
    /// `"\nHuman: ...\nAssistant: ..."` per exchange.
    pub fn to_buffer_string(&self) -> String {
        self.exchanges
            .iter()
            .map(|(human, ai)| format!("\nHuman: {}\nAssistant: {}", human, ai))
            .collect()
    }
}
