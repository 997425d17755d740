//! Reply translation using the completion endpoint
//!
//! Called lazily the first time a turn's translation is shown; the caller
//! caches the result on the session.

use crate::llm::{LlmError, LlmService};
use crate::prompts::{translation_request, Persona};

/// Translate one assistant reply into the persona's translation language.
pub async fn translate(
    text: &str,
    persona: &Persona,
    llm_service: &dyn LlmService,
) -> Result<String, LlmError> {
    let request = translation_request(text, persona);
    let response = llm_service.complete(&request).await?;

    let translated = strip_quotes(response.text.trim());
    if translated.is_empty() {
        return Err(LlmError::malformed("Empty translation"));
    }
    Ok(translated.to_string())
}

/// The instruction quotes the source text, so models often quote the answer
fn strip_quotes(text: &str) -> &str {
    text.strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .unwrap_or(text)
        .trim()
}
