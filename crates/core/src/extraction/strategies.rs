//! Built-in extraction strategies.

use std::sync::LazyLock;

use regex::{Match, Regex};

use super::{Confidence, ExtractionCandidate, ExtractionStrategy};
use crate::attributes::{get_field_type, parse_text, FieldType, TraitDomain, TraitValue};

static MY_X_IS_NOW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bmy\s+([a-z][a-z ]{0,30}?)\s+(?:is|are)\s+now\s+([^.!?\n]+)")
        .expect("valid regex")
});

static I_FEEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bi\s+feel\s+([^.!?\n]+)").expect("valid regex"));

static BODY_ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:i|she|he|they)\s+(?:cut|cuts|dyed|dyes|braided|braids|styled|styles|tied|ties|shaved|shaves|trimmed|trims|curled|curls)\s+(?:my|her|his|their)\s+(?:hair|beard|locks)\b[^.!?\n]*",
    )
    .expect("valid regex")
});

static MY_X_WAS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bmy\s+([a-z][a-z ]{0,30}?)\s+(?:was|were|looked|looks|seemed)\s+([^.!?\n]+)")
        .expect("valid regex")
});

static SCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:smell(?:s|ed)?|scent(?:ed)?|aroma|fragrance|perfume)\s+(?:of|like)\s+[^.!?\n]+",
    )
    .expect("valid regex")
});

static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:we|i|they|you|she|he)\s+(?:arrived|arrive|entered|enter|reached|reach|walked into|stepped into)\s+(?:at\s+|in\s+)?([^.!?\n,]+)",
    )
    .expect("valid regex")
});

static SENTENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?\n]+[.!?]*").expect("valid regex"));

const LOCATION_SUBJECTS: &[&str] = &["location", "position", "whereabouts"];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The sentence containing `m`, including its terminal punctuation.
fn sentence_around(text: &str, m: &Match<'_>) -> String {
    let is_stop = |c: char| matches!(c, '.' | '!' | '?' | '\n');
    let start = text[..m.start()].rfind(is_stop).map_or(0, |i| i + 1);
    let body_end = if m.as_str().ends_with(is_stop) {
        m.end()
    } else {
        text[m.end()..]
            .find(is_stop)
            .map_or(text.len(), |i| m.end() + i)
    };
    let end = text[body_end..]
        .find(|c: char| !matches!(c, '.' | '!' | '?'))
        .map_or(text.len(), |i| body_end + i);
    text[start..end].trim().to_string()
}

fn subject_field_type(subject: &str) -> FieldType {
    match get_field_type(subject) {
        FieldType::Other if LOCATION_SUBJECTS.iter().any(|s| subject.to_lowercase().contains(s)) => {
            FieldType::Location
        }
        other => other,
    }
}

/// Candidate for a "my X <verb> Y" match: structured when the subject maps
/// to a trait domain and the codec recognizes the phrase, raw text
/// otherwise.
fn subject_value_candidate(
    text: &str,
    whole: &Match<'_>,
    subject: &str,
    value: &str,
    confidence: Confidence,
) -> Option<ExtractionCandidate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let field_type = subject_field_type(subject);
    let extracted_data = field_type
        .domain()
        .and_then(|domain| parse_text(&format!("{subject} {value}"), domain))
        .unwrap_or_else(|| TraitValue::Text(value.to_string()));
    Some(ExtractionCandidate {
        field_type,
        original_text: whole.as_str().trim().to_string(),
        extracted_data,
        confidence,
        context: sentence_around(text, whole),
    })
}

fn domain_candidate(
    text: &str,
    whole: &Match<'_>,
    parse_from: &str,
    domain: TraitDomain,
    confidence: Confidence,
) -> Option<ExtractionCandidate> {
    let extracted_data = parse_text(parse_from, domain)?;
    Some(ExtractionCandidate {
        field_type: domain.into(),
        original_text: whole.as_str().trim().to_string(),
        extracted_data,
        confidence,
        context: sentence_around(text, whole),
    })
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Present-tense first-person changes, feelings, and narrated grooming.
pub struct SimpleStrategy;

impl ExtractionStrategy for SimpleStrategy {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn extract(&self, text: &str) -> Vec<ExtractionCandidate> {
        let mut out = Vec::new();

        for caps in MY_X_IS_NOW_RE.captures_iter(text) {
            let (Some(whole), Some(subject), Some(value)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            out.extend(subject_value_candidate(
                text,
                &whole,
                subject.as_str(),
                value.as_str(),
                Confidence::High,
            ));
        }

        for caps in I_FEEL_RE.captures_iter(text) {
            let (Some(whole), Some(value)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.extend(domain_candidate(
                text,
                &whole,
                value.as_str(),
                TraitDomain::Personality,
                Confidence::Medium,
            ));
        }

        for whole in BODY_ACTION_RE.find_iter(text) {
            let candidate = domain_candidate(
                text,
                &whole,
                whole.as_str(),
                TraitDomain::Appearance,
                Confidence::Low,
            )
            .unwrap_or_else(|| ExtractionCandidate {
                field_type: FieldType::Action,
                original_text: whole.as_str().trim().to_string(),
                extracted_data: TraitValue::Text(whole.as_str().trim().to_string()),
                confidence: Confidence::Low,
                context: sentence_around(text, &whole),
            });
            out.push(candidate);
        }

        out
    }
}

/// Past-tense descriptions and scent phrasing.
pub struct StructuredStrategy;

impl ExtractionStrategy for StructuredStrategy {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn extract(&self, text: &str) -> Vec<ExtractionCandidate> {
        let mut out = Vec::new();

        for caps in MY_X_WAS_RE.captures_iter(text) {
            let (Some(whole), Some(subject), Some(value)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            out.extend(subject_value_candidate(
                text,
                &whole,
                subject.as_str(),
                value.as_str(),
                Confidence::Medium,
            ));
        }

        for whole in SCENT_RE.find_iter(text) {
            out.extend(domain_candidate(
                text,
                &whole,
                whole.as_str(),
                TraitDomain::Scents,
                Confidence::Medium,
            ));
        }

        out
    }
}

/// Sentence-level keyword clues and arrivals at places. Everything it
/// reports is low confidence.
pub struct AdvancedStrategy;

impl ExtractionStrategy for AdvancedStrategy {
    fn name(&self) -> &'static str {
        "advanced"
    }

    fn extract(&self, text: &str) -> Vec<ExtractionCandidate> {
        let mut out = Vec::new();

        for sentence in SENTENCE_RE.find_iter(text) {
            let Some(domain) = get_field_type(sentence.as_str()).domain() else {
                continue;
            };
            out.extend(domain_candidate(
                text,
                &sentence,
                sentence.as_str(),
                domain,
                Confidence::Low,
            ));
        }

        for caps in LOCATION_RE.captures_iter(text) {
            let (Some(whole), Some(place)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let place = place.as_str().trim();
            if place.is_empty() {
                continue;
            }
            out.push(ExtractionCandidate {
                field_type: FieldType::Location,
                original_text: whole.as_str().trim().to_string(),
                extracted_data: TraitValue::Text(place.to_string()),
                confidence: Confidence::Low,
                context: sentence_around(text, &whole),
            });
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_of(text: &str, needle: &str) -> String {
        let re = Regex::new(&regex::escape(needle)).unwrap();
        let m = re.find(text).unwrap();
        sentence_around(text, &m)
    }

    #[test]
    fn sentence_around_picks_enclosing_sentence() {
        let text = "First one. My hair is now red! Last.";
        assert_eq!(context_of(text, "hair is now"), "My hair is now red!");
        assert_eq!(context_of(text, "First"), "First one.");
        assert_eq!(context_of("no stop here", "stop"), "no stop here");
    }

    #[test]
    fn location_subject_is_classified() {
        assert_eq!(subject_field_type("location"), FieldType::Location);
        assert_eq!(subject_field_type("hair"), FieldType::Appearance);
        assert_eq!(subject_field_type("sword"), FieldType::Other);
    }

    #[test]
    fn unknown_subject_keeps_raw_text() {
        let out = SimpleStrategy.extract("My sword is now chipped.");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].field_type, FieldType::Other);
        assert_eq!(out[0].extracted_data, TraitValue::Text("chipped".into()));
    }

    #[test]
    fn grooming_without_descriptor_is_action() {
        let out = SimpleStrategy.extract("They cut their hair.");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].field_type, FieldType::Action);
    }
}
