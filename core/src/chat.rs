use crate::document::DocMeta;
use crate::error::Result;
use crate::index::Index;
use crate::rank::{RankedResult, DEFAULT_K};
use crate::DocId;
use std::collections::HashMap;
use std::fmt::Write;

const TRIGGERS: &[&str] = &["recommend", "suggest"];

pub const HELP_REPLY: &str =
    "How can I help you find your next favorite book? You can ask for recommendations based on your interests!";
pub const RECOMMEND_HEADER: &str = "Based on your interests, here are some books you might enjoy:\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Bot,
}

/// A single conversation. The transcript lives only as long as the session.
#[derive(Debug, Clone)]
pub struct ChatSession {
    k: usize,
    transcript: Vec<(Speaker, String)>,
}

impl Default for ChatSession {
    fn default() -> Self { Self::new(DEFAULT_K) }
}

impl ChatSession {
    pub fn new(k: usize) -> Self { Self { k, transcript: Vec::new() } }

    pub fn transcript(&self) -> &[(Speaker, String)] { &self.transcript }

    /// Whether the message asks for recommendations.
    pub fn wants_recommendations(index: &Index, message: &str) -> bool {
        index
            .normalizer()
            .normalize(message)
            .iter()
            .any(|term| TRIGGERS.iter().any(|t| term.contains(t)))
    }

    pub fn handle_message(&mut self, index: &Index, catalog: &HashMap<DocId, DocMeta>, message: &str) -> Result<String> {
        self.transcript.push((Speaker::User, message.to_string()));
        let reply = if Self::wants_recommendations(index, message) {
            let hits = index.rank(message, self.k)?;
            format_recommendations(&hits, catalog)
        } else {
            HELP_REPLY.to_string()
        };
        self.transcript.push((Speaker::Bot, reply.clone()));
        Ok(reply)
    }
}

pub fn format_recommendations(hits: &[RankedResult], catalog: &HashMap<DocId, DocMeta>) -> String {
    let mut out = String::from(RECOMMEND_HEADER);
    for hit in hits {
        let Some(meta) = catalog.get(&hit.document_id) else { continue };
        let _ = write!(out, "- {} by {}", meta.title, meta.author);
        if let Some(year) = &meta.year {
            let _ = write!(out, " ({year})");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ingest, TextField};
    use serde_json::json;

    fn fixture() -> (Index, HashMap<DocId, DocMeta>) {
        let rows = vec![
            json!({"title": "Dune", "author": "Frank Herbert", "year": 1965}),
            json!({"title": "The Hobbit", "author": "J.R.R. Tolkien"}),
        ];
        let corpus = ingest(&rows, TextField::TitleAuthor).unwrap();
        (Index::build(corpus.documents).unwrap(), corpus.catalog)
    }

    #[test]
    fn recommends_on_trigger_word() {
        let (index, catalog) = fixture();
        let mut chat = ChatSession::new(1);
        let reply = chat.handle_message(&index, &catalog, "Can you recommend something like Dune?").unwrap();
        assert_eq!(reply, format!("{RECOMMEND_HEADER}- Dune by Frank Herbert (1965)\n"));
        assert_eq!(chat.transcript().len(), 2);
    }

    #[test]
    fn inflected_trigger_still_matches() {
        let (index, _) = fixture();
        assert!(ChatSession::wants_recommendations(&index, "any suggestions?"));
    }

    #[test]
    fn falls_back_to_help() {
        let (index, catalog) = fixture();
        let mut chat = ChatSession::default();
        assert_eq!(chat.handle_message(&index, &catalog, "hello there").unwrap(), HELP_REPLY);
        assert_eq!(chat.transcript()[1], (Speaker::Bot, HELP_REPLY.to_string()));
    }
}
