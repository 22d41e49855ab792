//! Character-state extraction from free-text LLM output.
//!
//! An [`Extractor`] runs an ordered list of [`ExtractionStrategy`]
//! implementations over the response text, deduplicates the candidates on
//! their serialized data, and drops anything below the caller's minimum
//! confidence. Extraction is best-effort: missing a change is acceptable,
//! and nothing here returns an error.

mod strategies;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::attributes::{FieldType, TraitValue};
use crate::error::CoreError;

pub use strategies::{AdvancedStrategy, SimpleStrategy, StructuredStrategy};

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// Extraction confidence. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Numeric score compared against a protection rule's `min_confidence`.
    pub fn score(&self) -> f64 {
        match self {
            Self::Low => 0.3,
            Self::Medium => 0.6,
            Self::High => 0.9,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Confidence {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(CoreError::Validation(format!(
                "Unknown confidence level '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// A proposed character-state change found in text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionCandidate {
    pub field_type: FieldType,
    /// The matched span.
    pub original_text: String,
    pub extracted_data: TraitValue,
    pub confidence: Confidence,
    /// The sentence the match was found in.
    pub context: String,
}

/// Which strategies to run and the confidence floor for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractionOptions {
    pub simple: bool,
    pub structured: bool,
    pub advanced: bool,
    pub min_confidence: Confidence,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            simple: true,
            structured: true,
            advanced: false,
            min_confidence: Confidence::Low,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetadata {
    pub strategies_run: Vec<String>,
    pub raw_count: usize,
    pub deduplicated_count: usize,
    pub returned_count: usize,
    pub text_length: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub extractions: Vec<ExtractionCandidate>,
    pub metadata: ExtractionMetadata,
}

// ---------------------------------------------------------------------------
// Strategy seam
// ---------------------------------------------------------------------------

/// One pattern family the extractor can run.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, text: &str) -> Vec<ExtractionCandidate>;
}

/// Ordered list of strategies. Earlier strategies win ties in dedup.
pub struct Extractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Extractor {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Build the built-in strategy list selected by `options`.
    pub fn from_options(options: &ExtractionOptions) -> Self {
        let mut strategies: Vec<Box<dyn ExtractionStrategy>> = Vec::new();
        if options.simple {
            strategies.push(Box::new(SimpleStrategy));
        }
        if options.structured {
            strategies.push(Box::new(StructuredStrategy));
        }
        if options.advanced {
            strategies.push(Box::new(AdvancedStrategy));
        }
        Self::new(strategies)
    }

    pub fn run(&self, text: &str, min_confidence: Confidence) -> ExtractionResult {
        let mut raw = Vec::new();
        let mut strategies_run = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            strategies_run.push(strategy.name().to_string());
            raw.extend(strategy.extract(text));
        }
        let raw_count = raw.len();

        let deduplicated = deduplicate(raw);
        let deduplicated_count = deduplicated.len();

        let extractions: Vec<ExtractionCandidate> = deduplicated
            .into_iter()
            .filter(|c| c.confidence >= min_confidence)
            .collect();

        ExtractionResult {
            metadata: ExtractionMetadata {
                strategies_run,
                raw_count,
                deduplicated_count,
                returned_count: extractions.len(),
                text_length: text.chars().count(),
            },
            extractions,
        }
    }
}

/// Run the strategies selected by `options` over `text`.
pub fn extract_state(text: &str, options: &ExtractionOptions) -> ExtractionResult {
    Extractor::from_options(options).run(text, options.min_confidence)
}

/// Collapse candidates with identical serialized data, keeping the first
/// position and the highest confidence seen.
fn deduplicate(candidates: Vec<ExtractionCandidate>) -> Vec<ExtractionCandidate> {
    let mut out: Vec<ExtractionCandidate> = Vec::with_capacity(candidates.len());
    let mut seen: HashMap<String, usize> = HashMap::new();
    for candidate in candidates {
        let key = serde_json::to_string(&candidate.extracted_data)
            .unwrap_or_else(|_| candidate.original_text.clone());
        match seen.get(&key) {
            Some(&idx) => {
                if candidate.confidence > out[idx].confidence {
                    out[idx] = candidate;
                }
            }
            None => {
                seen.insert(key, out.len());
                out.push(candidate);
            }
        }
    }
    out
}
