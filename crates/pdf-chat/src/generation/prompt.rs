//! Prompt templates for grounded chat

use crate::providers::VectorSearchResult;
use crate::types::{ConversationEntry, Role};

/// Prompt builder for knowledge-base chat
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build context from search results
    pub fn build_context(results: &[VectorSearchResult]) -> String {
        let mut context = String::new();

        for (i, result) in results.iter().enumerate() {
            context.push_str(&format!(
                "[{}] {}\n{}\n\n",
                i + 1,
                result.chunk.source.format_reference(),
                result.chunk.content
            ));
        }

        context
    }

    /// Render the most recent `window` conversation turns
    pub fn build_history(history: &[ConversationEntry], window: usize) -> String {
        let start = history.len().saturating_sub(window);

        history[start..]
            .iter()
            .map(|entry| {
                let speaker = match entry.role() {
                    Role::User => "Human",
                    Role::Assistant => "AI",
                };
                format!("{}: {}", speaker, entry.content())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Build the full chat prompt
    pub fn build_chat_prompt(query: &str, context: &str, history: &str) -> String {
        let mut prompt = String::from(
            "You are a helpful assistant answering questions about a PDF document.\n\
             Use the following pieces of context to answer the query at the end.\n\
             If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n",
        );

        if context.trim().is_empty() {
            prompt.push_str("Context: (no matching content in the knowledge base)\n\n");
        } else {
            prompt.push_str("Context:\n");
            prompt.push_str(context);
        }

        if !history.is_empty() {
            prompt.push_str("Conversation so far:\n");
            prompt.push_str(history);
            prompt.push_str("\n\n");
        }

        prompt.push_str(&format!("Query: {}\n\nHelpful Answer:", query));
        prompt
    }
}
