//! Per-adventure-type response constraints handed to the LLM caller.

use regex::Regex;
use serde::Serialize;

use super::AdventureType;

/// Bounds for how many past turns are sent with a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextWindow {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

impl ContextWindow {
    /// Clamp a caller override into `[min, max]`; `None` uses the default.
    pub fn size(&self, requested: Option<u32>) -> u32 {
        requested.map_or(self.default, |n| n.clamp(self.min, self.max))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseConfig {
    pub max_paragraphs: usize,
    pub stop_sequences: Vec<String>,
    /// Also stop when the model starts a `"{name}:"` line for the character.
    pub stop_on_character_name: bool,
    /// Patterns matching the model speaking for the user. `{user}` is
    /// replaced with the escaped user name before compiling.
    pub forbidden_patterns: Vec<String>,
    pub context_window: ContextWindow,
}

const USER_SPEAKING_PATTERNS: &[&str] = &[
    r"(?im)^\s*{user}\s*:",
    r"(?i)\b{user}\s+(?:says|said|replies|replied|asks|asked)\b",
    r"(?i)\byou\s+(?:say|reply|answer|decide)\b",
];

impl ResponseConfig {
    pub fn for_type(adventure_type: AdventureType) -> Self {
        let base_stops = vec!["\n\n\n".to_string(), "<|end|>".to_string()];
        let forbidden_patterns = USER_SPEAKING_PATTERNS
            .iter()
            .map(|p| (*p).to_string())
            .collect();
        match adventure_type {
            AdventureType::Romance => Self {
                max_paragraphs: 4,
                stop_sequences: base_stops,
                stop_on_character_name: true,
                forbidden_patterns,
                context_window: ContextWindow {
                    min: 6,
                    max: 40,
                    default: 20,
                },
            },
            AdventureType::Action => Self {
                max_paragraphs: 3,
                stop_sequences: base_stops,
                stop_on_character_name: true,
                forbidden_patterns,
                context_window: ContextWindow {
                    min: 4,
                    max: 30,
                    default: 12,
                },
            },
            AdventureType::General => Self {
                max_paragraphs: 5,
                stop_sequences: base_stops,
                stop_on_character_name: false,
                forbidden_patterns,
                context_window: ContextWindow {
                    min: 4,
                    max: 40,
                    default: 16,
                },
            },
        }
    }

    /// Stop sequences with the character-name stop appended when enabled.
    pub fn stop_sequences_for(&self, character_name: &str) -> Vec<String> {
        let mut stops = self.stop_sequences.clone();
        let name = character_name.trim();
        if self.stop_on_character_name && !name.is_empty() {
            stops.push(format!("{name}:"));
        }
        stops
    }

    pub fn context_window_size(&self, requested: Option<u32>) -> u32 {
        self.context_window.size(requested)
    }

    /// Check a generated reply against the paragraph limit and the
    /// user-speaking patterns.
    pub fn validate_response(&self, text: &str, user_name: &str) -> Vec<ResponseIssue> {
        let mut issues = Vec::new();

        let paragraphs = text
            .split("\n\n")
            .filter(|p| !p.trim().is_empty())
            .count();
        if paragraphs > self.max_paragraphs {
            issues.push(ResponseIssue::TooManyParagraphs {
                count: paragraphs,
                max: self.max_paragraphs,
            });
        }

        let user = regex::escape(user_name.trim());
        for pattern in &self.forbidden_patterns {
            if user.is_empty() && pattern.contains("{user}") {
                continue;
            }
            let Ok(re) = Regex::new(&pattern.replace("{user}", &user)) else {
                continue;
            };
            if re.is_match(text) {
                issues.push(ResponseIssue::SpeaksForUser {
                    pattern: pattern.clone(),
                });
            }
        }
        issues
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseIssue {
    TooManyParagraphs { count: usize, max: usize },
    SpeaksForUser { pattern: String },
}
