//! User-facing messages
//!
//! Every failure is logged with full detail and then shown to the user as one
//! of these fixed Ewe strings. Raw errors never reach the page.

use serde::Serialize;

/// Fixed localized message surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    /// The synthesis service could not be reached at startup or during a call
    TtsConnectionFailed,
    /// The completion call failed for any reason
    CompletionFailed,
    /// Synthesis failed upstream or the audio could not be stored
    AudioGenerationFailed,
    /// The synthesis response carried no usable audio path
    InvalidAudioPath,
    /// The audio path was resolved but no file exists there
    AudioPathNotFound,
    TranslationFailed,
    /// Voice input is not configured or the recognition service is down
    RecognitionUnavailable,
    RecognitionFailed,
    /// The recording produced an empty transcript
    NothingHeard,
}

/// How loudly a notice is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl Notice {
    pub fn text(self) -> &'static str {
        match self {
            Notice::TtsConnectionFailed => {
                "Taflatse, nyemete ŋu le gbeŋɔŋlɔ̃mɔ̃a gbɔ tu ge fifia o. Meɖe kuku, te ekpɔ emegbe."
            }
            Notice::CompletionFailed => "Taflatse, nye nuŋlɔ̃mɔ̃a medɔwɔ nyuie o. Meɖe kuku, te ekpɔ.",
            Notice::AudioGenerationFailed => {
                "Kuxi aɖe do mo le gbea wɔwɔ me. Nyemete ŋu wɔe nyuie o."
            }
            Notice::InvalidAudioPath => {
                "Gbeŋɔŋlɔ̃mɔ̃a tsɔ mɔ si mesɔ o ɖo ɖem. Nyemete ŋu xɔ gbea o."
            }
            Notice::AudioPathNotFound => "Mekpɔ mɔa, gake gbea mele afima o. Taflatse.",
            Notice::TranslationFailed => "Taflatse, nyemete ŋu gɔ̃ nya sia me o.",
            Notice::RecognitionUnavailable => {
                "Taflatse, gbeseselɔ̃mɔ̃a mele dɔ wɔm fifia o. Meɖe kuku, ŋlɔ wò nya."
            }
            Notice::RecognitionFailed => {
                "Taflatse, nyemete ŋu se wò gbe nyuie o. Meɖe kuku, te ekpɔ ake."
            }
            Notice::NothingHeard => "Nyemese nya aɖeke o. Meɖe kuku, ƒo nu ake.",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Notice::InvalidAudioPath | Notice::AudioPathNotFound | Notice::NothingHeard => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    /// Failure strings that can end up as turn content
    const TURN_CONTENT: [Notice; 2] = [Notice::CompletionFailed, Notice::TranslationFailed];

    /// True when `content` is one of the fixed failure strings rather than a
    /// model reply. Such turns are not offered for translation.
    pub fn is_failure_text(content: &str) -> bool {
        Self::TURN_CONTENT.iter().any(|n| n.text() == content)
    }
}
