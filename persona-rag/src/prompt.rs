//! Persona prompt template.
//!
//! A template is plain text with placeholders in braces:
//!
//! - `{persona}` is replaced once, when the [`PromptBuilder`] is created
//! - `{context}` and `{question}` are replaced on every [`PromptBuilder::build`]
//!
//! `{{` and `}}` produce literal braces. Substituted values are never scanned
//! for placeholders, so a question containing `{context}` is inserted as-is.

use crate::document::PromptContext;
use crate::error::{RagError, Result};

/// The built-in template: answer in the persona's voice, only from the context.
pub const DEFAULT_TEMPLATE: &str = "\
You are an AI emulating {persona}.
Use the provided context to answer accurately as if you were {persona}.

CONTEXT:
{context}

QUESTION:
{question}

Guidelines:
- Base your response strictly on the provided context.
- If the context does not contain enough information, say so plainly instead of guessing.
- Avoid generating or assuming false information.
- Maintain a friendly, conversational tone.

ANSWER:
";

/// Persona used when none is configured.
pub const DEFAULT_PERSONA: &str = "the person described in the provided context";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Text(String),
    Context,
    Question,
    Unknown(String),
}

/// Renders the persona prompt from a context and a question.
///
/// # Example
///
/// ```rust,ignore
/// use persona_rag::PromptBuilder;
///
/// let prompt = PromptBuilder::new("Spral").build("Spral builds web apps.", "What do you build?")?;
/// assert!(prompt.contains("You are an AI emulating Spral."));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    parts: Vec<Part>,
}

impl PromptBuilder {
    /// Use [`DEFAULT_TEMPLATE`] with the given persona.
    pub fn new(persona: impl AsRef<str>) -> Self {
        Self { parts: tokenize(DEFAULT_TEMPLATE, persona.as_ref()) }
    }

    /// Use a custom template.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if the template uses a
    /// placeholder other than `{persona}`, `{context}` and `{question}`, or
    /// lacks `{context}` or `{question}`.
    pub fn with_template(template: &str, persona: impl AsRef<str>) -> Result<Self> {
        let parts = tokenize(template, persona.as_ref());

        if let Some(Part::Unknown(name)) = parts.iter().find(|p| matches!(p, Part::Unknown(_))) {
            return Err(RagError::InvalidConfiguration(format!(
                "prompt template uses unknown placeholder {{{name}}}"
            )));
        }
        for (required, name) in [(Part::Context, "context"), (Part::Question, "question")] {
            if !parts.contains(&required) {
                return Err(RagError::InvalidConfiguration(format!(
                    "prompt template must contain {{{name}}}"
                )));
            }
        }

        Ok(Self { parts })
    }

    /// Substitute `context` and `question` into the template.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::MissingVariable`] if either value is blank.
    pub fn build(&self, context: &str, question: &str) -> Result<String> {
        if context.trim().is_empty() {
            return Err(RagError::MissingVariable("context".to_string()));
        }
        if question.trim().is_empty() {
            return Err(RagError::MissingVariable("question".to_string()));
        }

        let mut prompt = String::new();
        for part in &self.parts {
            match part {
                Part::Text(text) => prompt.push_str(text),
                Part::Context => prompt.push_str(context),
                Part::Question => prompt.push_str(question),
                // Rejected by `with_template`; `new` only sees the built-in template
                Part::Unknown(name) => {
                    prompt.push('{');
                    prompt.push_str(name);
                    prompt.push('}');
                }
            }
        }
        Ok(prompt)
    }

    /// [`build`](Self::build) from a [`PromptContext`].
    pub fn render(&self, context: &PromptContext) -> Result<String> {
        self.build(&context.context, &context.question)
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONA)
    }
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split a template into literal text and placeholders, resolving `{persona}`.
///
/// A `{` that does not open a well-formed placeholder is kept literally.
fn tokenize(template: &str, persona: &str) -> Vec<Part> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        text.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            text.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }

        if tail.starts_with('{') {
            if let Some(end) = tail[1..].find('}') {
                let name = &tail[1..=end];
                if is_placeholder_name(name) {
                    rest = &tail[end + 2..];
                    if name == "persona" {
                        text.push_str(persona);
                        continue;
                    }
                    if !text.is_empty() {
                        parts.push(Part::Text(std::mem::take(&mut text)));
                    }
                    parts.push(match name {
                        "context" => Part::Context,
                        "question" => Part::Question,
                        other => Part::Unknown(other.to_string()),
                    });
                    continue;
                }
            }
        }

        text.push_str(&tail[..1]);
        rest = &tail[1..];
    }

    text.push_str(rest);
    if !text.is_empty() {
        parts.push(Part::Text(text));
    }
    parts
}
