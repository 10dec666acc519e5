//! Server-side prompt assembly.
//!
//! The master prompt is injected on every upstream call and never sent to the
//! client.

use std::path::Path;

use crate::core::llm::ChatMessage;

/// Built-in master prompt used when none is configured
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a warm, attentive conversational assistant. \
Respond with empathy and clarity, keep answers concise, and ask a gentle follow-up \
question when it helps the person reflect.";

/// Builds the ordered message list for a single exchange.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    master_prompt: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl PromptBuilder {
    pub fn new(master_prompt: impl Into<String>) -> Self {
        Self {
            master_prompt: master_prompt.into(),
        }
    }

    /// Inline text wins over a file; the built-in prompt is the fallback.
    pub fn from_sources(inline: Option<&str>, path: Option<&Path>) -> std::io::Result<Self> {
        if let Some(text) = inline.map(str::trim).filter(|t| !t.is_empty()) {
            return Ok(Self::new(text));
        }

        if let Some(path) = path {
            let text = std::fs::read_to_string(path)?;
            let text = text.trim();
            if !text.is_empty() {
                return Ok(Self::new(text));
            }
        }

        Ok(Self::default())
    }

    pub fn master_prompt(&self) -> &str {
        &self.master_prompt
    }

    /// `[system(master), system(instructions)?, user(text)]`
    ///
    /// Blank instructions are omitted. Only the current exchange is included.
    pub fn build(&self, user_text: &str, instructions: Option<&str>) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(3);
        messages.push(ChatMessage::system(self.master_prompt.clone()));

        if let Some(extra) = instructions.filter(|i| !i.trim().is_empty()) {
            messages.push(ChatMessage::system(extra));
        }

        messages.push(ChatMessage::user(user_text));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::ChatRole;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_build_without_instructions() {
        let builder = PromptBuilder::new("master");
        let messages = builder.build("Hello", None);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system("master"));
        assert_eq!(messages[1], ChatMessage::user("Hello"));
    }

    #[test]
    fn test_build_with_instructions() {
        let builder = PromptBuilder::new("master");
        let messages = builder.build("Hello", Some("Speak slowly."));

        let roles: Vec<ChatRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![ChatRole::System, ChatRole::System, ChatRole::User]);
        assert_eq!(messages[1].content, "Speak slowly.");
    }

    #[test]
    fn test_instructions_forwarded_verbatim() {
        let builder = PromptBuilder::new("master");
        let raw = "  Line one.\n  - indented bullet\n";
        let messages = builder.build("Hello", Some(raw));

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], ChatMessage::system(raw));
    }

    #[test]
    fn test_blank_instructions_are_omitted() {
        let builder = PromptBuilder::default();
        assert_eq!(builder.build("Hi", Some("   ")).len(), 2);
        assert_eq!(builder.master_prompt(), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_from_sources_priority() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("prompt.txt");
        fs::write(&path, "  from file \n").unwrap();

        let inline = PromptBuilder::from_sources(Some("inline"), Some(&path)).unwrap();
        assert_eq!(inline.master_prompt(), "inline");

        let file = PromptBuilder::from_sources(None, Some(&path)).unwrap();
        assert_eq!(file.master_prompt(), "from file");

        let fallback = PromptBuilder::from_sources(Some(""), None).unwrap();
        assert_eq!(fallback.master_prompt(), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_from_sources_missing_file() {
        let result = PromptBuilder::from_sources(None, Some(Path::new("/nonexistent/prompt.txt")));
        assert!(result.is_err());
    }
}
