//! System prompt assembly.
//!
//! Each adventure type has a built-in template parsed once into an AST.
//! [`build_prompt`] renders the template for a [`PromptContext`] and
//! normalizes whitespace; identical contexts always produce identical bytes.

pub mod context;
pub mod response_config;
pub mod template;
mod templates;

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub use context::{ContextValue, PromptContext};
pub use response_config::{ContextWindow, ResponseConfig, ResponseIssue};
pub use template::{Template, MISSING_VALUE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdventureType {
    Romance,
    Action,
    General,
}

impl AdventureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Romance => "romance",
            Self::Action => "action",
            Self::General => "general",
        }
    }

    /// Lenient resolution for stored configuration: anything missing or
    /// unrecognized is `General`.
    pub fn resolve(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.trim().to_lowercase().parse().ok())
            .unwrap_or(Self::General)
    }

    fn template(&self) -> &'static Template {
        match self {
            Self::Romance => &ROMANCE,
            Self::Action => &ACTION,
            Self::General => &GENERAL,
        }
    }
}

impl fmt::Display for AdventureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdventureType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "romance" => Ok(Self::Romance),
            "action" => Ok(Self::Action),
            "general" => Ok(Self::General),
            other => Err(CoreError::Validation(format!(
                "Unknown adventure type '{other}'"
            ))),
        }
    }
}

static ROMANCE: LazyLock<Template> =
    LazyLock::new(|| Template::parse(&templates::romance()).expect("valid built-in template"));
static ACTION: LazyLock<Template> =
    LazyLock::new(|| Template::parse(&templates::action()).expect("valid built-in template"));
static GENERAL: LazyLock<Template> =
    LazyLock::new(|| Template::parse(&templates::general()).expect("valid built-in template"));

static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("valid regex"));

/// Render the system prompt for `adventure_type`.
///
/// Fails with a validation error for an unknown type; use
/// [`AdventureType::resolve`] first when a fallback is wanted.
pub fn build_prompt(adventure_type: &str, context: &PromptContext) -> Result<String, CoreError> {
    let adventure_type: AdventureType = adventure_type.parse()?;
    Ok(render(adventure_type, context))
}

pub fn render(adventure_type: AdventureType, context: &PromptContext) -> String {
    let raw = adventure_type.template().render(&context.to_root());
    normalize(&raw)
}

/// Strip trailing spaces, collapse runs of blank lines to one, trim.
pub fn normalize(text: &str) -> String {
    let trimmed_lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let joined = trimmed_lines.join("\n");
    BLANK_RUN_RE.replace_all(&joined, "\n\n").trim().to_string()
}
