//! Character trait domains and their attribute schemas.
//!
//! Every trait domain has an explicit schema of optional fields so that any
//! subset of attributes may be set while invalid attribute names are caught
//! at compile time. [`TraitValue`] is the tagged union stored in character
//! state; its `Text` variant keeps raw prose when the codec cannot parse it.

pub mod codec;
pub mod path;
mod vocabulary;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub use codec::{get_field_type, parse_text, to_text};

// ---------------------------------------------------------------------------
// Domains and field types
// ---------------------------------------------------------------------------

/// One of the three structured trait domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitDomain {
    Appearance,
    Personality,
    Scents,
}

impl TraitDomain {
    pub const ALL: [TraitDomain; 3] = [Self::Appearance, Self::Personality, Self::Scents];

    /// Field-path root used for this domain in character state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Appearance => "appearance",
            Self::Personality => "personality",
            Self::Scents => "scents",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Appearance => "Appearance",
            Self::Personality => "Personality",
            Self::Scents => "Scents",
        }
    }
}

impl fmt::Display for TraitDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraitDomain {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "appearance" => Ok(Self::Appearance),
            "personality" => Ok(Self::Personality),
            "scents" => Ok(Self::Scents),
            other => Err(CoreError::Validation(format!(
                "Unknown trait domain '{other}'"
            ))),
        }
    }
}

/// Classification of a field name or text snippet.
///
/// The three trait domains plus the non-trait kinds the extractor can
/// report. `Other` is the catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Appearance,
    Personality,
    Scents,
    Action,
    Location,
    Other,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Appearance => "appearance",
            Self::Personality => "personality",
            Self::Scents => "scents",
            Self::Action => "action",
            Self::Location => "location",
            Self::Other => "other",
        }
    }

    /// The trait domain this field type maps to, if any.
    pub fn domain(&self) -> Option<TraitDomain> {
        match self {
            Self::Appearance => Some(TraitDomain::Appearance),
            Self::Personality => Some(TraitDomain::Personality),
            Self::Scents => Some(TraitDomain::Scents),
            Self::Action | Self::Location | Self::Other => None,
        }
    }
}

impl From<TraitDomain> for FieldType {
    fn from(domain: TraitDomain) -> Self {
        match domain {
            TraitDomain::Appearance => Self::Appearance,
            TraitDomain::Personality => Self::Personality,
            TraitDomain::Scents => Self::Scents,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Appearance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
}

impl Hair {
    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.style.is_none() && self.length.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eyes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

/// Physical appearance attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appearance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hair: Option<Hair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eyes: Option<Eyes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin: Option<Skin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clothing: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

impl Appearance {
    pub fn is_empty(&self) -> bool {
        self.hair.as_ref().map_or(true, Hair::is_empty)
            && self.eyes.as_ref().map_or(true, |e| e.color.is_none())
            && self.skin.as_ref().map_or(true, |s| s.tone.is_none())
            && self.build.is_none()
            && self.height.is_none()
            && self.clothing.is_none()
            && self.features.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Personality
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personality {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<String>,
}

impl Personality {
    pub fn is_empty(&self) -> bool {
        self.traits.is_empty() && self.mood.is_none() && self.behavior.is_none()
    }
}

// ---------------------------------------------------------------------------
// Scents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scents {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<String>,
}

impl Scents {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.intensity.is_none()
    }
}

// ---------------------------------------------------------------------------
// TraitValue
// ---------------------------------------------------------------------------

/// A value stored at one field path of character state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "domain", content = "value", rename_all = "snake_case")]
pub enum TraitValue {
    Appearance(Appearance),
    Personality(Personality),
    Scents(Scents),
    /// Raw text that could not be (or was not meant to be) structured.
    Text(String),
}

impl TraitValue {
    pub fn domain(&self) -> Option<TraitDomain> {
        match self {
            Self::Appearance(_) => Some(TraitDomain::Appearance),
            Self::Personality(_) => Some(TraitDomain::Personality),
            Self::Scents(_) => Some(TraitDomain::Scents),
            Self::Text(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Appearance(a) => a.is_empty(),
            Self::Personality(p) => p.is_empty(),
            Self::Scents(s) => s.is_empty(),
            Self::Text(t) => t.trim().is_empty(),
        }
    }

    /// The bare attribute object (no domain tag), or a JSON string for text.
    pub fn attributes_json(&self) -> serde_json::Value {
        let value = match self {
            Self::Appearance(a) => serde_json::to_value(a),
            Self::Personality(p) => serde_json::to_value(p),
            Self::Scents(s) => serde_json::to_value(s),
            Self::Text(t) => return serde_json::Value::String(t.clone()),
        };
        // Plain structs of strings always serialize.
        value.unwrap_or(serde_json::Value::Null)
    }

    /// Rebuild a structured value from a bare attribute object.
    pub fn from_attributes_json(
        domain: TraitDomain,
        value: serde_json::Value,
    ) -> Result<Self, CoreError> {
        let invalid =
            |e: serde_json::Error| CoreError::Validation(format!("Invalid {domain} attributes: {e}"));
        Ok(match domain {
            TraitDomain::Appearance => Self::Appearance(serde_json::from_value(value).map_err(invalid)?),
            TraitDomain::Personality => {
                Self::Personality(serde_json::from_value(value).map_err(invalid)?)
            }
            TraitDomain::Scents => Self::Scents(serde_json::from_value(value).map_err(invalid)?),
        })
    }

    /// Structurally merge `newer` over `self`.
    ///
    /// When both values are structured and of the same domain, leaf keys
    /// present in `newer` overwrite and every other key of `self` is kept.
    /// Any other combination is a full replacement by `newer`. Fails if the
    /// merged object no longer deserializes as the domain's schema.
    pub fn merged_with(&self, newer: &TraitValue) -> Result<TraitValue, CoreError> {
        match (self.domain(), newer.domain()) {
            (Some(old_domain), Some(new_domain)) if old_domain == new_domain => {
                let mut base = self.attributes_json();
                path::deep_merge(&mut base, &newer.attributes_json());
                Self::from_attributes_json(new_domain, base)
            }
            _ => Ok(newer.clone()),
        }
    }

    /// Human-readable rendering via the trait codec.
    pub fn to_text(&self) -> String {
        codec::to_text(self)
    }
}

impl From<Appearance> for TraitValue {
    fn from(value: Appearance) -> Self {
        Self::Appearance(value)
    }
}

impl From<Personality> for TraitValue {
    fn from(value: Personality) -> Self {
        Self::Personality(value)
    }
}

impl From<Scents> for TraitValue {
    fn from(value: Scents) -> Self {
        Self::Scents(value)
    }
}
