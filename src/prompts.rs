//! Fixed instructions and request construction
//!
//! The completion request is derived from the full turn history every time;
//! nothing here is stored.

use crate::llm::{LlmMessage, LlmRequest};
use crate::session::Turn;

const COMPLETION_TEMPERATURE: f32 = 0.4;
const COMPLETION_MAX_TOKENS: u32 = 150;
const TRANSLATION_TEMPERATURE: f32 = 0.2;
const TRANSLATION_MAX_TOKENS: u32 = 400;

/// Opening assistant turn of every session
pub const GREETING: &str = "Woezɔ, loo! Nye ŋkɔ enye Woezɔr. Aleke mate ŋu akpe ɖe ŋuwò?";

/// Conversation starters offered before the first user turn
pub const STARTERS: &[&str] = &[
    "Aleke yame ƒe nɔnɔme le egbe?",
    "Gblɔ lododo aɖe nam eye nàɖe egɔme.",
    "Ŋlɔ ha kpui aɖe tso Eʋenyigba ŋu.",
    "Fia nuɖuɖu nyui aɖe si mate ŋu aɖa egbe.",
];

/// Who the assistant is and which language it must answer in
#[derive(Debug, Clone)]
pub struct Persona {
    pub name: String,
    pub language: String,
    /// Language the translation helper renders replies into
    pub translation_language: String,
    /// Reply the model must give when it does not know the answer
    pub apology: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: "Woezɔr".to_string(),
            language: "Ewe".to_string(),
            translation_language: "English".to_string(),
            apology: "Taflatse, nyemenya o".to_string(),
        }
    }
}

impl Persona {
    pub fn system_instruction(&self) -> String {
        let Persona {
            name,
            language,
            apology,
            ..
        } = self;
        format!(
            "You are {name}, a friendly, patient and knowledgeable general-purpose assistant. \
             You answer questions on any topic, explain things simply, summarize text and help \
             with creative tasks such as poems or stories. Your only output language is \
             {language}: ALWAYS reply in {language}, whether the user writes in {language} or \
             English. Keep every answer very short, one short sentence when possible and never \
             more than two. When it feels natural, end with a short follow-up question. \
             Emulate the user's conversational style. If you do not know the answer, reply \
             exactly '{apology}'. Decline any request that is harmful or unethical."
        )
    }

    fn translation_instruction(&self, text: &str) -> String {
        format!(
            "Translate the following {} text to {}. Do not add any preamble, just the \
             translation: '{text}'",
            self.language, self.translation_language
        )
    }
}

/// Project the whole turn history into a completion request
pub fn completion_request(turns: &[Turn], persona: &Persona) -> LlmRequest {
    LlmRequest {
        system: Some(persona.system_instruction()),
        messages: turns
            .iter()
            .map(|turn| LlmMessage {
                role: turn.role.into(),
                text: turn.content.clone(),
            })
            .collect(),
        temperature: Some(COMPLETION_TEMPERATURE),
        max_tokens: Some(COMPLETION_MAX_TOKENS),
    }
}

/// One-shot request translating a single reply
pub fn translation_request(text: &str, persona: &Persona) -> LlmRequest {
    LlmRequest {
        system: None,
        messages: vec![LlmMessage::user(persona.translation_instruction(text))],
        temperature: Some(TRANSLATION_TEMPERATURE),
        max_tokens: Some(TRANSLATION_MAX_TOKENS),
    }
}
