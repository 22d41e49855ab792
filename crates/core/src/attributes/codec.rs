//! Trait text codec: free-text descriptions <-> structured attributes.
//!
//! Parsing is heuristic. Labeled segments (`hair: blonde, curly`) are read
//! exactly; unlabeled prose is split into sentences and clauses and
//! descriptor words from [`vocabulary`](super::vocabulary) are attached to
//! the feature noun they belong to. A parse that finds nothing returns
//! `None`.
//!
//! [`to_text`] renders in the labeled form, so re-parsing rendered text
//! yields an equivalent (sometimes coarser) structure.

use std::sync::LazyLock;

use regex::Regex;

use super::vocabulary::{self as vocab, contains};
use super::{Appearance, Eyes, FieldType, Hair, Personality, Scents, Skin, TraitDomain, TraitValue};

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z]+(?:-[a-z]+)*").expect("valid regex"));

static SENTENCE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.;!?\n]+").expect("valid regex"));

static CLAUSE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",|\band\b|\bbut\b|\bwith\b").expect("valid regex"));

static LIST_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",|\band\b").expect("valid regex"));

static APPEARANCE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(hair|eyes|skin|build|height|clothing|features)\s*:").expect("valid regex")
});

static PERSONALITY_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(traits|mood|behavior)\s*:").expect("valid regex"));

static SCENT_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(notes|scents?|intensity)\s*:").expect("valid regex"));

static CLOTHING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:wearing|wears|wore|dressed in|clad in)\s+([^.;!?\n]+)").expect("valid regex")
});

static FEATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:(?:a|an|the|his|her|my|their)\s+)?(?:([a-z]+)\s+)?(scars?|tattoos?|freckles|piercings?|beard|moustache|mustache|birthmarks?)\b",
    )
    .expect("valid regex")
});

static BEHAVIOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b((?:tends to|always|often|usually)\s+[^.;!?\n,]+)").expect("valid regex")
});

static SCENT_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:smell(?:s|ed|ing)?|scent(?:ed)?|aroma|fragrance|perfume|odou?r)\s+(?:of|like)\s+([^.;!?\n]+)",
    )
    .expect("valid regex")
});

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse free text into a structured value of the given domain.
///
/// Returns `None` when no attribute-bearing phrase is recognized.
pub fn parse_text(text: &str, domain: TraitDomain) -> Option<TraitValue> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match domain {
        TraitDomain::Appearance => parse_appearance(text).map(TraitValue::Appearance),
        TraitDomain::Personality => parse_personality(text).map(TraitValue::Personality),
        TraitDomain::Scents => parse_scents(text).map(TraitValue::Scents),
    }
}

/// Render a trait value as stable, human-readable text.
pub fn to_text(value: &TraitValue) -> String {
    match value {
        TraitValue::Appearance(a) => render_appearance(a),
        TraitValue::Personality(p) => render_personality(p),
        TraitValue::Scents(s) => render_scents(s),
        TraitValue::Text(t) => t.trim().to_string(),
    }
}

/// Classify a field name or text snippet by keyword.
///
/// Categories are checked appearance, personality, scents in that order and
/// the first match wins; anything else is [`FieldType::Other`].
pub fn get_field_type(name_or_text: &str) -> FieldType {
    let lower = name_or_text.to_lowercase();
    let hit = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));
    if hit(vocab::APPEARANCE_KEYWORDS) {
        FieldType::Appearance
    } else if hit(vocab::PERSONALITY_KEYWORDS) {
        FieldType::Personality
    } else if hit(vocab::SCENT_KEYWORDS) {
        FieldType::Scents
    } else {
        FieldType::Other
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Text split around `label:` markers.
struct Segments {
    /// `(label, value)` pairs; label lowercased, value trimmed.
    labeled: Vec<(String, String)>,
    /// Text before the first label (or the whole text if there are none).
    unlabeled: String,
}

fn split_labeled(text: &str, label_re: &Regex) -> Segments {
    let markers: Vec<(usize, usize, String)> = label_re
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some((whole.start(), whole.end(), name.as_str().to_lowercase()))
        })
        .collect();

    let unlabeled = match markers.first() {
        Some((start, _, _)) => text[..*start].to_string(),
        None => text.to_string(),
    };

    let labeled = markers
        .iter()
        .enumerate()
        .map(|(i, (_, end, name))| {
            let stop = markers.get(i + 1).map_or(text.len(), |(next, _, _)| *next);
            (name.clone(), clean_segment(&text[*end..stop]))
        })
        .filter(|(_, value)| !value.is_empty())
        .collect();

    Segments { labeled, unlabeled }
}

fn clean_segment(s: &str) -> String {
    s.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '.'))
        .to_string()
}

fn words(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn split_list(text: &str) -> Vec<String> {
    LIST_SPLIT_RE
        .split(text)
        .map(clean_segment)
        .filter(|s| !s.is_empty())
        .collect()
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.iter().any(|existing| existing.eq_ignore_ascii_case(&item)) {
        list.push(item);
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn is_color(word: &str) -> bool {
    contains(vocab::COLORS, word)
}

fn is_shade(word: &str) -> bool {
    contains(vocab::SHADES, word)
}

/// Group colors with a preceding shade ("dark brown"). A lone shade counts
/// as a color of its own.
fn color_groups(words: &[String]) -> Vec<String> {
    let mut groups = Vec::new();
    let mut i = 0;
    while i < words.len() {
        let word = words[i].as_str();
        if is_shade(word) && words.get(i + 1).is_some_and(|next| is_color(next)) {
            groups.push(format!("{word} {}", words[i + 1]));
            i += 2;
            continue;
        }
        if is_color(word) || is_shade(word) {
            groups.push(word.to_string());
        }
        i += 1;
    }
    groups
}

fn residual(words: &[String], known: impl Fn(&str) -> bool) -> Option<String> {
    let rest: Vec<&str> = words
        .iter()
        .map(String::as_str)
        .filter(|w| !known(w) && !contains(vocab::STOPWORDS, w))
        .collect();
    non_empty(rest.join(" "))
}

// ---------------------------------------------------------------------------
// Appearance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feature {
    Hair,
    Eyes,
    Skin,
    Build,
    Height,
}

impl Feature {
    fn from_noun(word: &str) -> Option<Self> {
        if contains(vocab::HAIR_NOUNS, word) {
            Some(Self::Hair)
        } else if contains(vocab::EYE_NOUNS, word) {
            Some(Self::Eyes)
        } else if contains(vocab::SKIN_NOUNS, word) {
            Some(Self::Skin)
        } else if contains(vocab::BUILD_NOUNS, word) {
            Some(Self::Build)
        } else if contains(vocab::HEIGHT_NOUNS, word) {
            Some(Self::Height)
        } else {
            None
        }
    }

    fn accepts(self, word: &str) -> bool {
        match self {
            Self::Hair => {
                is_color(word)
                    || is_shade(word)
                    || contains(vocab::HAIR_STYLES, word)
                    || contains(vocab::HAIR_LENGTHS, word)
            }
            Self::Eyes => is_color(word) || is_shade(word),
            Self::Skin => contains(vocab::SKIN_TONES, word) || is_shade(word),
            Self::Build => contains(vocab::BUILDS, word),
            Self::Height => contains(vocab::HEIGHTS, word),
        }
    }

    /// Descriptors that mean something without a noun ("she is tall").
    fn standalone(word: &str) -> Option<Self> {
        if contains(vocab::BUILDS, word) {
            Some(Self::Build)
        } else if contains(vocab::HEIGHTS, word) {
            Some(Self::Height)
        } else {
            None
        }
    }
}

fn is_appearance_descriptor(word: &str) -> bool {
    is_color(word)
        || is_shade(word)
        || contains(vocab::HAIR_STYLES, word)
        || contains(vocab::HAIR_LENGTHS, word)
        || contains(vocab::SKIN_TONES, word)
        || contains(vocab::BUILDS, word)
        || contains(vocab::HEIGHTS, word)
}

#[derive(Default)]
struct FeatureWords {
    hair: Vec<String>,
    eyes: Vec<String>,
    skin: Vec<String>,
    build: Vec<String>,
    height: Vec<String>,
}

impl FeatureWords {
    fn bucket(&mut self, feature: Feature) -> &mut Vec<String> {
        match feature {
            Feature::Hair => &mut self.hair,
            Feature::Eyes => &mut self.eyes,
            Feature::Skin => &mut self.skin,
            Feature::Build => &mut self.build,
            Feature::Height => &mut self.height,
        }
    }
}

fn hair_from_words(words: &[String], keep_residual: bool) -> Option<Hair> {
    let colors = color_groups(words);
    let styles: Vec<&str> = words
        .iter()
        .map(String::as_str)
        .filter(|w| contains(vocab::HAIR_STYLES, w))
        .collect();
    let length = words
        .iter()
        .find(|w| contains(vocab::HAIR_LENGTHS, w))
        .cloned();

    let mut style = non_empty(styles.join(" "));
    if style.is_none() && keep_residual {
        style = residual(words, |w| Feature::Hair.accepts(w));
    }

    let hair = Hair {
        color: non_empty(colors.join(" and ")),
        style,
        length,
    };
    (!hair.is_empty()).then_some(hair)
}

fn eyes_from_words(words: &[String], keep_residual: bool) -> Option<Eyes> {
    let mut color = non_empty(color_groups(words).join(" and "));
    if color.is_none() && keep_residual {
        color = residual(words, |_| false);
    }
    color.map(|c| Eyes { color: Some(c) })
}

fn parse_appearance(text: &str) -> Option<Appearance> {
    let segments = split_labeled(text, &APPEARANCE_LABEL_RE);
    let mut out = Appearance::default();

    for (label, value) in &segments.labeled {
        match label.as_str() {
            "hair" => out.hair = hair_from_words(&words(value), true),
            "eyes" => out.eyes = eyes_from_words(&words(value), true),
            "skin" => {
                out.skin = Some(Skin {
                    tone: Some(value.clone()),
                })
            }
            "build" => out.build = Some(value.clone()),
            "height" => out.height = Some(value.clone()),
            "clothing" => out.clothing = Some(value.clone()),
            "features" => out.features = split_list(value),
            _ => {}
        }
    }

    parse_appearance_prose(&segments.unlabeled, &mut out);

    (!out.is_empty()).then_some(out)
}

/// Attach descriptors in unlabeled prose to feature nouns.
///
/// A descriptor binds to the next noun when only descriptors sit between
/// them ("long silver hair"), otherwise to the previous noun in the clause
/// ("hair is now blonde"). A clause with no noun inherits the last noun of
/// the previous clause in the same sentence ("blonde and curly").
fn parse_appearance_prose(text: &str, out: &mut Appearance) {
    let mut text = text.to_lowercase();
    if text.trim().is_empty() {
        return;
    }

    let clothing = CLOTHING_RE.captures(&text).and_then(|caps| {
        let whole = caps.get(0)?;
        Some((whole.range(), clean_segment(&caps[1])))
    });
    if let Some((span, clothing)) = clothing {
        if out.clothing.is_none() {
            out.clothing = non_empty(clothing);
        }
        text.replace_range(span, " ");
    }

    let mut features = Vec::new();
    for caps in FEATURE_RE.captures_iter(&text) {
        let noun = &caps[2];
        let feature = match caps.get(1).map(|m| m.as_str()) {
            Some(adj) if !contains(vocab::STOPWORDS, adj) => format!("{adj} {noun}"),
            _ => noun.to_string(),
        };
        features.push(feature);
    }
    let text = FEATURE_RE.replace_all(&text, " ");
    for feature in features {
        push_unique(&mut out.features, feature);
    }

    let mut found = FeatureWords::default();
    for sentence in SENTENCE_SPLIT_RE.split(&text) {
        let mut carry: Option<Feature> = None;
        for clause in CLAUSE_SPLIT_RE.split(sentence) {
            let tokens: Vec<String> = WORD_RE
                .find_iter(clause)
                .map(|m| m.as_str().to_string())
                .collect();
            let nouns: Vec<(usize, Feature)> = tokens
                .iter()
                .enumerate()
                .filter_map(|(i, t)| Feature::from_noun(t).map(|f| (i, f)))
                .collect();

            for (i, token) in tokens.iter().enumerate() {
                if Feature::from_noun(token).is_some() || !is_appearance_descriptor(token) {
                    continue;
                }
                let target = following_noun(&tokens, &nouns, i)
                    .filter(|f| f.accepts(token))
                    .or_else(|| preceding_noun(&nouns, i).filter(|f| f.accepts(token)))
                    .or_else(|| {
                        if nouns.is_empty() {
                            carry.filter(|f| f.accepts(token))
                        } else {
                            None
                        }
                    })
                    .or_else(|| Feature::standalone(token));
                if let Some(feature) = target {
                    found.bucket(feature).push(token.clone());
                }
            }

            if let Some(&(_, feature)) = nouns.last() {
                carry = Some(feature);
            }
        }
    }

    if out.hair.is_none() {
        out.hair = hair_from_words(&found.hair, false);
    }
    if out.eyes.is_none() {
        out.eyes = eyes_from_words(&found.eyes, false);
    }
    if out.skin.is_none() && !found.skin.is_empty() {
        out.skin = Some(Skin {
            tone: Some(found.skin.join(" ")),
        });
    }
    if out.build.is_none() {
        out.build = non_empty(found.build.join(" "));
    }
    if out.height.is_none() {
        out.height = found.height.first().cloned();
    }
}

fn following_noun(tokens: &[String], nouns: &[(usize, Feature)], at: usize) -> Option<Feature> {
    let &(idx, feature) = nouns.iter().find(|(idx, _)| *idx > at)?;
    tokens[at + 1..idx]
        .iter()
        .all(|t| is_appearance_descriptor(t))
        .then_some(feature)
}

fn preceding_noun(nouns: &[(usize, Feature)], at: usize) -> Option<Feature> {
    nouns
        .iter()
        .rev()
        .find(|(idx, _)| *idx < at)
        .map(|(_, f)| *f)
}

fn render_appearance(a: &Appearance) -> String {
    let mut parts = Vec::new();
    if let Some(hair) = a.hair.as_ref().filter(|h| !h.is_empty()) {
        let bits: Vec<&str> = [&hair.color, &hair.style, &hair.length]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();
        parts.push(format!("hair: {}", bits.join(", ")));
    }
    if let Some(color) = a.eyes.as_ref().and_then(|e| e.color.as_ref()) {
        parts.push(format!("eyes: {color}"));
    }
    if let Some(tone) = a.skin.as_ref().and_then(|s| s.tone.as_ref()) {
        parts.push(format!("skin: {tone}"));
    }
    if let Some(build) = &a.build {
        parts.push(format!("build: {build}"));
    }
    if let Some(height) = &a.height {
        parts.push(format!("height: {height}"));
    }
    if let Some(clothing) = &a.clothing {
        parts.push(format!("clothing: {clothing}"));
    }
    if !a.features.is_empty() {
        parts.push(format!("features: {}", a.features.join(", ")));
    }
    parts.join(", ")
}

// ---------------------------------------------------------------------------
// Personality
// ---------------------------------------------------------------------------

fn parse_personality(text: &str) -> Option<Personality> {
    let segments = split_labeled(text, &PERSONALITY_LABEL_RE);
    let mut out = Personality::default();

    for (label, value) in &segments.labeled {
        match label.as_str() {
            "traits" => {
                for item in split_list(value) {
                    push_unique(&mut out.traits, item);
                }
            }
            "mood" => out.mood = Some(value.clone()),
            "behavior" => out.behavior = Some(value.clone()),
            _ => {}
        }
    }

    let prose = segments.unlabeled.to_lowercase();
    if !prose.trim().is_empty() {
        for word in words(&prose) {
            if contains(vocab::PERSONALITY_TRAITS, &word) {
                push_unique(&mut out.traits, word);
            } else if out.mood.is_none() && contains(vocab::MOODS, &word) {
                out.mood = Some(word);
            }
        }
        if out.behavior.is_none() {
            out.behavior = BEHAVIOR_RE
                .captures(&prose)
                .and_then(|caps| non_empty(clean_segment(&caps[1])));
        }
    }

    (!out.is_empty()).then_some(out)
}

fn render_personality(p: &Personality) -> String {
    let mut parts = Vec::new();
    if !p.traits.is_empty() {
        parts.push(format!("traits: {}", p.traits.join(", ")));
    }
    if let Some(mood) = &p.mood {
        parts.push(format!("mood: {mood}"));
    }
    if let Some(behavior) = &p.behavior {
        parts.push(format!("behavior: {behavior}"));
    }
    parts.join(", ")
}

// ---------------------------------------------------------------------------
// Scents
// ---------------------------------------------------------------------------

fn parse_scents(text: &str) -> Option<Scents> {
    let segments = split_labeled(text, &SCENT_LABEL_RE);
    let mut out = Scents::default();

    for (label, value) in &segments.labeled {
        match label.as_str() {
            "notes" | "scent" | "scents" => {
                for item in split_list(value) {
                    push_unique(&mut out.notes, item);
                }
            }
            "intensity" => out.intensity = Some(value.clone()),
            _ => {}
        }
    }

    let prose = segments.unlabeled.to_lowercase();
    if !prose.trim().is_empty() {
        if let Some(caps) = SCENT_PHRASE_RE.captures(&prose) {
            for item in split_list(&caps[1]) {
                let note = strip_leading_article(&item);
                let note_words = words(note);
                // "a faint vanilla" -> intensity "faint", note "vanilla"
                if let Some(intensity) = note_words
                    .iter()
                    .find(|w| contains(vocab::SCENT_INTENSITIES, w))
                {
                    out.intensity.get_or_insert_with(|| intensity.clone());
                }
                let cleaned: Vec<&str> = note_words
                    .iter()
                    .map(String::as_str)
                    .filter(|w| !contains(vocab::SCENT_INTENSITIES, w))
                    .collect();
                if let Some(note) = non_empty(trim_note(&cleaned).join(" ")) {
                    push_unique(&mut out.notes, note);
                }
            }
        }
        for word in words(&prose) {
            if contains(vocab::SCENT_NOTES, &word)
                && !out.notes.iter().any(|n| n.split(' ').any(|part| part == word))
            {
                out.notes.push(word);
            } else if out.intensity.is_none() && contains(vocab::SCENT_INTENSITIES, &word) {
                out.intensity = Some(word);
            }
        }
    }

    (!out.is_empty()).then_some(out)
}

/// Cut a phrase down to its scent: everything up to the last known note,
/// or the first two words when no known note appears ("old books").
fn trim_note<'a>(words: &[&'a str]) -> Vec<&'a str> {
    match words.iter().rposition(|w| contains(vocab::SCENT_NOTES, w)) {
        Some(last) => words[..=last].to_vec(),
        None => words.iter().take(2).copied().collect(),
    }
}

fn strip_leading_article(s: &str) -> &str {
    for article in ["a ", "an ", "the "] {
        if let Some(rest) = s.strip_prefix(article) {
            return rest.trim_start();
        }
    }
    s
}

fn render_scents(s: &Scents) -> String {
    let mut parts = Vec::new();
    if !s.notes.is_empty() {
        parts.push(format!("notes: {}", s.notes.join(", ")));
    }
    if let Some(intensity) = &s.intensity {
        parts.push(format!("intensity: {intensity}"));
    }
    parts.join(", ")
}
