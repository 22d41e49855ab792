//! Field protection rules for character state.
//!
//! A rule covers a field path and every path beneath it, matched on whole
//! segments (`appearance.hair` covers `appearance.hair.color` but not
//! `appearance.hairline`). Rules are evaluated highest priority first; on
//! equal priority the longer path wins, then lexicographic order. The first
//! matching rule decides.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionLevel {
    /// Never changes once set.
    Immutable,
    /// Changes only at or above the rule's `min_confidence`.
    Guarded,
    Open,
}

impl ProtectionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immutable => "immutable",
            Self::Guarded => "guarded",
            Self::Open => "open",
        }
    }
}

impl fmt::Display for ProtectionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtectionLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "immutable" => Ok(Self::Immutable),
            "guarded" => Ok(Self::Guarded),
            "open" => Ok(Self::Open),
            other => Err(CoreError::Validation(format!(
                "Unknown protection level '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectionRule {
    pub field_path: String,
    pub protection_level: ProtectionLevel,
    pub min_confidence: f64,
    pub priority: i32,
}

impl ProtectionRule {
    /// Whether this rule covers `path` (segment-boundary prefix match).
    pub fn covers(&self, path: &str) -> bool {
        match path.strip_prefix(self.field_path.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        }
    }
}

/// Why a leaf write was refused.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    Immutable { rule_path: String },
    BelowThreshold { rule_path: String, required: f64, actual: f64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immutable { rule_path } => {
                write!(f, "protected by immutable rule '{rule_path}'")
            }
            Self::BelowThreshold {
                rule_path,
                required,
                actual,
            } => write!(
                f,
                "confidence {actual:.2} below {required:.2} required by guarded rule '{rule_path}'"
            ),
        }
    }
}

/// Protection rules in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct ProtectionRules {
    rules: Vec<ProtectionRule>,
}

impl ProtectionRules {
    pub fn new(mut rules: Vec<ProtectionRule>) -> Self {
        rules.sort_by(evaluation_order);
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The rule that decides for `path`, if any.
    pub fn rule_for(&self, path: &str) -> Option<&ProtectionRule> {
        self.rules.iter().find(|rule| rule.covers(path))
    }

    /// Decide a write to `path`.
    ///
    /// `already_set` is whether the path currently holds a value; immutable
    /// rules only bite once a value exists. `bypass_guarded` is set for
    /// manual edits.
    pub fn check(
        &self,
        path: &str,
        already_set: bool,
        confidence_score: f64,
        bypass_guarded: bool,
    ) -> Result<(), Rejection> {
        let Some(rule) = self.rule_for(path) else {
            return Ok(());
        };
        match rule.protection_level {
            ProtectionLevel::Immutable if already_set => Err(Rejection::Immutable {
                rule_path: rule.field_path.clone(),
            }),
            ProtectionLevel::Guarded if !bypass_guarded && confidence_score < rule.min_confidence => {
                Err(Rejection::BelowThreshold {
                    rule_path: rule.field_path.clone(),
                    required: rule.min_confidence,
                    actual: confidence_score,
                })
            }
            _ => Ok(()),
        }
    }
}

fn evaluation_order(a: &ProtectionRule, b: &ProtectionRule) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.field_path.len().cmp(&a.field_path.len()))
        .then_with(|| a.field_path.cmp(&b.field_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn rule(path: &str, level: ProtectionLevel, min: f64, priority: i32) -> ProtectionRule {
        ProtectionRule {
            field_path: path.to_string(),
            protection_level: level,
            min_confidence: min,
            priority,
        }
    }

    #[test]
    fn covers_on_segment_boundaries() {
        let r = rule("appearance.hair", ProtectionLevel::Open, 0.0, 0);
        assert!(r.covers("appearance.hair"));
        assert!(r.covers("appearance.hair.color"));
        assert!(!r.covers("appearance.hairline"));
        assert!(!r.covers("appearance"));
    }

    #[test]
    fn higher_priority_wins() {
        let rules = ProtectionRules::new(vec![
            rule("appearance", ProtectionLevel::Open, 0.0, 1),
            rule("appearance.hair.color", ProtectionLevel::Immutable, 0.0, 0),
            rule("appearance.hair", ProtectionLevel::Guarded, 0.8, 5),
        ]);
        let decided = rules.rule_for("appearance.hair.color").unwrap();
        assert_eq!(decided.field_path, "appearance.hair");
    }

    #[test]
    fn equal_priority_prefers_longest_then_lexicographic() {
        let rules = ProtectionRules::new(vec![
            rule("appearance", ProtectionLevel::Open, 0.0, 3),
            rule("appearance.eyes", ProtectionLevel::Guarded, 0.5, 3),
            rule("appearance.hair", ProtectionLevel::Immutable, 0.0, 3),
        ]);
        assert_eq!(rules.rule_for("appearance.hair.color").unwrap().field_path, "appearance.hair");
        assert_eq!(rules.rule_for("appearance.build").unwrap().field_path, "appearance");
        assert!(rules.rule_for("personality.mood").is_none());
    }

    #[test]
    fn immutable_only_blocks_existing_values() {
        let rules = ProtectionRules::new(vec![rule(
            "appearance.hair.color",
            ProtectionLevel::Immutable,
            0.0,
            0,
        )]);
        assert!(rules.check("appearance.hair.color", false, 0.9, false).is_ok());
        assert_matches!(
            rules.check("appearance.hair.color", true, 0.9, true),
            Err(Rejection::Immutable { .. })
        );
    }

    #[test]
    fn guarded_requires_threshold_unless_bypassed() {
        let rules = ProtectionRules::new(vec![rule(
            "personality",
            ProtectionLevel::Guarded,
            0.7,
            0,
        )]);
        assert_matches!(
            rules.check("personality.mood", true, 0.6, false),
            Err(Rejection::BelowThreshold { .. })
        );
        assert!(rules.check("personality.mood", true, 0.9, false).is_ok());
        assert!(rules.check("personality.mood", true, 0.3, true).is_ok());
    }

    #[test]
    fn level_parses_from_str() {
        assert_eq!("guarded".parse::<ProtectionLevel>().unwrap(), ProtectionLevel::Guarded);
        assert!("locked".parse::<ProtectionLevel>().is_err());
    }
}
