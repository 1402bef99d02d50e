//! Transcript log
//!
//! Keeps the room's transcription results in arrival order. Each speaker
//! has at most one interim entry, always the latest; a final result
//! replaces it. Translations attach to final entries after the fact.

use crate::signaling::protocol::{TranscriptionResult, TranslationComplete};

/// Recognizer locale for a spoken-language code
///
/// Unknown languages fall back to US English.
pub fn recognizer_locale(language: &str) -> &'static str {
    match language {
        "en" => "en-US",
        "es" => "es-ES",
        "fr" => "fr-FR",
        "de" => "de-DE",
        "it" => "it-IT",
        "pt" => "pt-BR",
        "ru" => "ru-RU",
        "ja" => "ja-JP",
        "zh" => "zh-CN",
        "ko" => "ko-KR",
        "ar" => "ar-SA",
        "hi" => "hi-IN",
        _ => "en-US",
    }
}

/// One line of the transcript
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub socket_id: String,
    pub username: String,
    pub transcript: String,
    pub is_final: bool,
    pub timestamp: String,
    pub source_language: Option<String>,
    /// Set once the translation for a final entry arrives
    pub translated_text: Option<String>,
}

impl From<TranscriptionResult> for TranscriptEntry {
    fn from(result: TranscriptionResult) -> Self {
        Self {
            socket_id: result.socket_id,
            username: result.username,
            transcript: result.transcript,
            is_final: result.is_final,
            timestamp: result.timestamp,
            source_language: result.source_language,
            translated_text: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct TranscriptLog {
    entries: Vec<TranscriptEntry>,
    speaking: bool,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a result
    ///
    /// Any pending interim entry of the same speaker is dropped first, then
    /// the new entry is appended.
    pub fn apply_result(&mut self, result: TranscriptionResult) {
        let socket_id = result.socket_id.clone();
        self.entries
            .retain(|e| e.socket_id != socket_id || e.is_final);
        self.entries.push(result.into());
    }

    /// Attach a translation to the matching final entry
    ///
    /// Returns false when no final entry matches.
    pub fn apply_translation(&mut self, translation: TranslationComplete) -> bool {
        let entry = self.entries.iter_mut().find(|e| {
            e.is_final && e.socket_id == translation.socket_id && e.timestamp == translation.timestamp
        });

        match entry {
            Some(entry) => {
                entry.translated_text = Some(translation.translated_text);
                true
            }
            None => {
                tracing::debug!(
                    peer = %translation.socket_id,
                    timestamp = %translation.timestamp,
                    "Translation for unknown entry"
                );
                false
            }
        }
    }

    pub fn set_speaking(&mut self, speaking: bool) {
        self.speaking = speaking;
    }

    /// Whether the service currently hears the local user
    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.speaking = false;
    }
}
