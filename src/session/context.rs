//! Join parameters

use crate::signaling::protocol::JoinRoom;

/// Who is joining which room
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRequest {
    /// Room to join
    pub room_id: String,

    /// Account name
    pub username: String,

    /// Name shown to other peers (falls back to `username`)
    pub display_name: Option<String>,

    /// Spoken-language code (falls back to the configured default)
    pub language: Option<String>,
}

impl JoinRequest {
    pub fn new(room_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            username: username.into(),
            display_name: None,
            language: None,
        }
    }

    /// Set the display name
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the spoken language
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Language to announce, given a default
    pub fn language_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.language
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(default)
    }

    /// The `join-room` payload
    pub fn to_message(&self, default_language: &str) -> JoinRoom {
        let display_name = self
            .display_name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.username.clone());

        JoinRoom {
            room_id: self.room_id.clone(),
            username: self.username.clone(),
            display_name,
            language: self.language_or(default_language).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_in() {
        let msg = JoinRequest::new("room", "ana").to_message("en");

        assert_eq!(msg.display_name, "ana");
        assert_eq!(msg.language, "en");
    }

    #[test]
    fn test_explicit_values() {
        let msg = JoinRequest::new("room", "ana")
            .display_name("Ana B.")
            .language("pt")
            .to_message("en");

        assert_eq!(msg.room_id, "room");
        assert_eq!(msg.display_name, "Ana B.");
        assert_eq!(msg.language, "pt");
    }
}
