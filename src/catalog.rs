//! Behavior catalog
//!
//! The catalog is the static list of coaching behaviors an agent can toggle.
//! It is fixed for the life of a tracker and is never persisted.

use crate::error::TrackerError;
use crate::picker::EncouragementPicker;
use crate::types::BehaviorDefinition;
use std::collections::HashSet;
use std::path::Path;

/// Validated, ordered list of behavior definitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehaviorCatalog {
    behaviors: Vec<BehaviorDefinition>,
}

impl Default for BehaviorCatalog {
    fn default() -> Self {
        Self {
            behaviors: default_behaviors(),
        }
    }
}

impl BehaviorCatalog {
    /// Build a catalog, rejecting empty lists, blank or duplicate ids, and
    /// behaviors without examples or encouragements
    pub fn new(behaviors: Vec<BehaviorDefinition>) -> Result<Self, TrackerError> {
        if behaviors.is_empty() {
            return Err(TrackerError::InvalidCatalog(
                "at least one behavior is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for behavior in &behaviors {
            if behavior.id.trim().is_empty() {
                return Err(TrackerError::InvalidCatalog(format!(
                    "behavior '{}' has an empty id",
                    behavior.name
                )));
            }
            if !seen.insert(behavior.id.as_str()) {
                return Err(TrackerError::InvalidCatalog(format!(
                    "duplicate behavior id '{}'",
                    behavior.id
                )));
            }
            if behavior.examples.is_empty() {
                return Err(TrackerError::InvalidCatalog(format!(
                    "behavior '{}' has no examples",
                    behavior.id
                )));
            }
            if behavior.encouragements.is_empty() {
                return Err(TrackerError::InvalidCatalog(format!(
                    "behavior '{}' has no encouragements",
                    behavior.id
                )));
            }
        }

        Ok(Self { behaviors })
    }

    /// Parse a JSON array of behavior definitions
    pub fn from_json(json: &str) -> Result<Self, TrackerError> {
        let behaviors: Vec<BehaviorDefinition> = serde_json::from_str(json)
            .map_err(|e| TrackerError::InvalidCatalog(e.to_string()))?;
        Self::new(behaviors)
    }

    /// Read and parse a catalog file
    pub fn from_file(path: &Path) -> Result<Self, TrackerError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            TrackerError::InvalidCatalog(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn get(&self, id: &str) -> Option<&BehaviorDefinition> {
        self.behaviors.iter().find(|b| b.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.behaviors.iter().map(|b| b.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &BehaviorDefinition> {
        self.behaviors.iter()
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    /// Display name for an id, falling back to the id itself
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|b| b.name.as_str()).unwrap_or(id)
    }

    /// Pick a sample phrasing for a behavior, used as a hint next to its toggle
    pub fn example_hint(&self, id: &str, picker: &mut dyn EncouragementPicker) -> Option<String> {
        self.get(id)
            .and_then(|b| picker.pick(&b.examples))
            .map(str::to_string)
    }
}

fn behavior(id: &str, name: &str, examples: &[&str], encouragements: &[&str]) -> BehaviorDefinition {
    BehaviorDefinition {
        id: id.to_string(),
        name: name.to_string(),
        examples: examples.iter().map(|s| s.to_string()).collect(),
        encouragements: encouragements.iter().map(|s| s.to_string()).collect(),
    }
}

fn default_behaviors() -> Vec<BehaviorDefinition> {
    vec![
        behavior(
            "fixFlow",
            "Use the Fix Flow",
            &[
                "I'm following our Fix Flow to troubleshoot this systematically.",
                "Let's use the Fix Flow to make sure we cover all bases.",
                "The Fix Flow will guide us to the right solution.",
            ],
            &["Nice work using the Fix Flow!"],
        ),
        behavior(
            "personalGuarantee",
            "Send Personal Guarantee SMS",
            &[
                "I'm sending you a quick text to assure you we've got this covered.",
                "Here's a personal guarantee message to give you peace of mind.",
                "I'll follow up with a text so you know we're committed to your satisfaction.",
            ],
            &["Exemplary trust-building!"],
        ),
        behavior(
            "tLifeAppLogin",
            "Guide T-Life App Login",
            &[
                "Let's get you logged into the T-Life app so you can manage your account on the go.",
                "Have you downloaded our T-Life app? I can help you log in right now.",
                "The T-Life app gives you instant account access - let me guide you through the setup.",
            ],
            &["Great job helping with app access!"],
        ),
        behavior(
            "planBenefits",
            "Highlight 3+ Plan Benefits",
            &[
                "Your plan includes three amazing benefits: unlimited streaming, international texting, and hotspot data.",
                "Did you know your rate plan comes with premium video streaming, 5G access, and free international roaming?",
                "Let me tell you about three exciting benefits included in your plan: device protection, Netflix on Us, and unlimited data.",
            ],
            &["Excellent benefit education!"],
        ),
        behavior(
            "collectPastDue",
            "Collect Past Due Amount",
            &[
                "I see there's a past due balance on your account. Would you like to take care of that today?",
                "To maintain uninterrupted service, let's address the outstanding balance on your account.",
                "I noticed a payment is overdue. Can I help you settle this to keep your services active?",
            ],
            &["Effective financial resolution!"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picker::FirstPicker;

    #[test]
    fn test_default_catalog() {
        let catalog = BehaviorCatalog::default();
        assert_eq!(catalog.len(), 5);
        assert_eq!(
            catalog.ids().collect::<Vec<_>>(),
            vec![
                "fixFlow",
                "personalGuarantee",
                "tLifeAppLogin",
                "planBenefits",
                "collectPastDue"
            ]
        );
        // Default list must pass its own validation
        assert!(BehaviorCatalog::new(default_behaviors()).is_ok());
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"id": "empathy", "name": "Empathy Statement",
             "examples": ["I understand how frustrating that is."],
             "encouragements": ["Great empathy!", "Nice!"]}
        ]"#;

        let catalog = BehaviorCatalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.display_name("empathy"), "Empathy Statement");
        assert_eq!(catalog.display_name("missing"), "missing");
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let b = behavior("a", "A", &["x"], &["y"]);
        let result = BehaviorCatalog::new(vec![b.clone(), b]);
        assert!(matches!(result, Err(TrackerError::InvalidCatalog(_))));
    }

    #[test]
    fn test_rejects_empty_lists() {
        assert!(BehaviorCatalog::new(vec![]).is_err());
        assert!(BehaviorCatalog::new(vec![behavior("a", "A", &[], &["y"])]).is_err());
        assert!(BehaviorCatalog::new(vec![behavior("a", "A", &["x"], &[])]).is_err());
        assert!(BehaviorCatalog::new(vec![behavior("  ", "A", &["x"], &["y"])]).is_err());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            BehaviorCatalog::from_json("not json"),
            Err(TrackerError::InvalidCatalog(_))
        ));
    }

    #[test]
    fn test_example_hint() {
        let catalog = BehaviorCatalog::default();
        let hint = catalog.example_hint("fixFlow", &mut FirstPicker).unwrap();
        assert!(hint.contains("Fix Flow"));
        assert!(catalog.example_hint("nope", &mut FirstPicker).is_none());
    }
}
