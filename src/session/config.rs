//! Session configuration.

use std::fmt;

use crate::error::{LiveError, LiveResult};

pub const DEFAULT_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";
pub const DEFAULT_MODEL: &str = "models/gemini-2.5-flash-native-audio-preview-09-2025";
pub const DEFAULT_VOICE: &str = "Zephyr";

pub const COACH_INSTRUCTION: &str = r#"You are "LingoLab Coach," an expert, patient, and highly professional English-speaking tutor. Your persona is encouraging, but firm on accuracy.

GOAL: Facilitate natural, topic-based conversation (role-play, current events, daily life) to maximize the user's speaking time and confidence.

VOICE & TONE GUIDANCE: Your dialogue must be extremely clear, articulate, and use a consistent, standard North American or British English (neutral accent). Speak in short, concise turns to maintain a fast pace (2-3 sentences max).

ERROR CORRECTION PROTOCOL (MANDATORY):

Do not interrupt. Wait for the user to complete their thought or sentence.

Correct immediately after the user's turn if they make a significant grammatical, syntax, or pronunciation-impacting error.

Format the correction clearly: Provide the correct version of the user's sentence, followed by a brief, one-sentence explanation of the error (e.g., tense, article usage, word order).

Example of Correction:
User: "Yesterday I go to the bank for money."
Your Response: "I see. You are describing a past action, so remember to use the simple past tense. The correct sentence is: 'Yesterday, I went to the bank for money.' Now, tell me, why did you need to go to the bank?""#;

#[derive(Clone)]
pub struct LiveConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub voice: String,
    pub system_instruction: String,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            system_instruction: COACH_INSTRUCTION.to_string(),
        }
    }
}

impl LiveConfig {
    /// Read overrides from the process environment.
    ///
    /// The credential comes from `API_KEY`, falling back to `GEMINI_API_KEY`.
    /// Empty values count as unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            api_key: get("API_KEY").or_else(|| get("GEMINI_API_KEY")),
            endpoint: get("LIVE_ENDPOINT").unwrap_or(defaults.endpoint),
            model: get("LIVE_MODEL").unwrap_or(defaults.model),
            voice: get("LIVE_VOICE").unwrap_or(defaults.voice),
            system_instruction: defaults.system_instruction,
        }
    }

    pub fn credential(&self) -> LiveResult<&str> {
        self.api_key.as_deref().ok_or(LiveError::MissingCredential)
    }
}

impl fmt::Debug for LiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("voice", &self.voice)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> LiveConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LiveConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = config(&[]);
        assert_eq!(config.credential(), Err(LiveError::MissingCredential));
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.voice, "Zephyr");
        assert!(config.system_instruction.contains("LingoLab Coach"));
    }

    #[test]
    fn test_credential_fallback_and_blank_values() {
        assert_eq!(config(&[("GEMINI_API_KEY", "g")]).credential(), Ok("g"));
        assert_eq!(
            config(&[("API_KEY", "a"), ("GEMINI_API_KEY", "g")]).credential(),
            Ok("a")
        );
        assert_eq!(
            config(&[("API_KEY", "  "), ("GEMINI_API_KEY", "g")]).credential(),
            Ok("g")
        );
    }

    #[test]
    fn test_overrides() {
        let config = config(&[("LIVE_MODEL", "models/other"), ("LIVE_VOICE", "Puck")]);
        assert_eq!(config.model, "models/other");
        assert_eq!(config.voice, "Puck");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_debug_hides_key() {
        let config = config(&[("API_KEY", "secret-key")]);
        let printed = format!("{config:?}");
        assert!(!printed.contains("secret-key"));
        assert!(printed.contains("redacted"));
    }
}
