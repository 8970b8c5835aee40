//! Prompt construction for the generation step.

use serde::{Deserialize, Serialize};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

const RULES: &str = "Rules:\n\
- Answer based only on the provided context.\n\
- If the answer is not in the context, respond with \"I don't know.\"\n\
- Be concise and to the point.\n\
- Do not invent information.\n";

/// One chat message in the OpenAI / Ollama chat format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Builds prompts from a question and an ordered list of context strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    system_prompt: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PromptBuilder {
    /// `None` or a blank prompt falls back to [`DEFAULT_SYSTEM_PROMPT`].
    pub fn new(system_prompt: Option<&str>) -> Self {
        let system_prompt = system_prompt
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
            .to_string();
        Self { system_prompt }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Context strings numbered `[Context 1]`, `[Context 2]`, … separated
    /// by blank lines.
    pub fn context_block(context: &[String]) -> String {
        context
            .iter()
            .enumerate()
            .map(|(i, ctx)| format!("[Context {}]: {}", i + 1, ctx))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// System + user messages for chat-completion APIs.
    pub fn build_messages(&self, question: &str, context: &[String]) -> Vec<ChatMessage> {
        let user = format!(
            "Use the following context to answer the question.\n{}\nQuestion: {}\n{}",
            Self::context_block(context),
            question,
            RULES
        );
        vec![
            ChatMessage {
                role: "system".to_string(),
                content: self.system_prompt.clone(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: user,
            },
        ]
    }

    /// Single plain-text prompt for completion-style models.
    pub fn build_prompt_text(&self, question: &str, context: &[String]) -> String {
        format!(
            "{}\nUse the following context to answer the question.\n{}\nQuestion: {}\n{}",
            self.system_prompt,
            Self::context_block(context),
            question,
            RULES
        )
        .trim()
        .to_string()
    }
}
