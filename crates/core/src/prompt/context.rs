//! Values a prompt template can reference.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::attributes::TraitValue;
use crate::merge::CharacterState;

/// A node in the template lookup tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ContextValue {
    Text(String),
    /// Rendered through the trait codec.
    Traits(TraitValue),
    Map(BTreeMap<String, ContextValue>),
    /// Opaque data, rendered as JSON.
    Json(serde_json::Value),
}

impl ContextValue {
    /// Convert arbitrary JSON: objects become maps, strings become text.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
            other => Self::Json(other),
        }
    }

    /// Follow a dot-separated path through nested maps.
    pub fn lookup(&self, path: &str) -> Option<&ContextValue> {
        path.split('.').try_fold(self, |current, segment| match current {
            Self::Map(map) => map.get(segment),
            _ => None,
        })
    }

    /// Text for a placeholder, or `None` when there is nothing to show.
    ///
    /// Trait values use the codec's rendering and fall back to JSON when that
    /// comes out empty.
    pub fn render(&self) -> Option<String> {
        let rendered = match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Traits(value) => {
                let text = value.to_text();
                if text.trim().is_empty() && !value.is_empty() {
                    value.attributes_json().to_string()
                } else {
                    text
                }
            }
            Self::Map(map) if map.is_empty() => String::new(),
            Self::Map(map) => serde_json::to_string(map).unwrap_or_default(),
            Self::Json(serde_json::Value::Null) => String::new(),
            Self::Json(value) => value.to_string(),
        };
        (!rendered.is_empty()).then_some(rendered)
    }

    /// Whether an `{{#if}}` on this value opens.
    pub fn is_present(&self) -> bool {
        match self {
            Self::Map(map) => map.values().any(ContextValue::is_present),
            other => other.render().is_some(),
        }
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<TraitValue> for ContextValue {
    fn from(value: TraitValue) -> Self {
        Self::Traits(value)
    }
}

/// Everything a system prompt is rendered from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptContext {
    /// `name` plus one entry per state field (`appearance`, `location`, ...).
    pub character: BTreeMap<String, ContextValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting: Option<ContextValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ContextValue>,
    pub user_name: String,
    pub adventure_title: String,
}

impl PromptContext {
    pub fn new(
        character_name: impl Into<String>,
        user_name: impl Into<String>,
        adventure_title: impl Into<String>,
    ) -> Self {
        let mut character = BTreeMap::new();
        character.insert("name".to_string(), ContextValue::Text(character_name.into()));
        Self {
            character,
            setting: None,
            location: None,
            user_name: user_name.into(),
            adventure_title: adventure_title.into(),
        }
    }

    /// Character section derived from adventure state. The name is kept.
    pub fn character_from_state(
        character_name: &str,
        state: &CharacterState,
    ) -> BTreeMap<String, ContextValue> {
        let mut character = BTreeMap::new();
        character.insert("name".to_string(), ContextValue::from(character_name));
        for (field, record) in state.iter() {
            if field != "name" {
                character.insert(field.clone(), ContextValue::Traits(record.value.clone()));
            }
        }
        character
    }

    pub fn with_character(mut self, character: BTreeMap<String, ContextValue>) -> Self {
        self.character = character;
        self
    }

    pub fn with_setting(mut self, setting: Option<serde_json::Value>) -> Self {
        self.setting = setting.map(ContextValue::from_json);
        self
    }

    pub fn with_location(mut self, location: Option<serde_json::Value>) -> Self {
        self.location = location.map(ContextValue::from_json);
        self
    }

    pub fn character_name(&self) -> &str {
        match self.character.get("name") {
            Some(ContextValue::Text(name)) => name,
            _ => "",
        }
    }

    /// The root lookup map templates render against.
    pub fn to_root(&self) -> ContextValue {
        let mut root = BTreeMap::new();
        root.insert("character".to_string(), ContextValue::Map(self.character.clone()));
        if let Some(setting) = &self.setting {
            root.insert("setting".to_string(), setting.clone());
        }
        if let Some(location) = &self.location {
            root.insert("location".to_string(), location.clone());
        }
        root.insert("userName".to_string(), ContextValue::from(self.user_name.as_str()));
        root.insert(
            "adventureTitle".to_string(),
            ContextValue::from(self.adventure_title.as_str()),
        );
        ContextValue::Map(root)
    }
}
