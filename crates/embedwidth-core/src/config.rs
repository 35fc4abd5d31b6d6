//! Configuration for directives, DOM names and scheduling.
//!
//! `WidthConfig` is the serialisable form handed over by the host (camelCase
//! keys, every field optional). `validate()` turns it into a
//! `ValidatedConfig` with compiled patterns and checked timings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::directive::{DEFAULT_DIRECTIVES, DirectiveSet};
use crate::error::ConfigError;
use crate::platform::ObserveFilter;
use crate::schedule::{DEFAULT_RETRY_LADDER_MS, RetryLadder, Scheduler};

/// Host-supplied configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WidthConfig {
    /// Directive keywords, highest priority first.
    pub directives: Vec<SmolStr>,
    /// CSS selector for embed elements inside a container.
    pub embed_selector: SmolStr,
    /// Attribute holding an embed's target name.
    pub identifier_attribute: SmolStr,
    /// Attribute written with the active directive keyword.
    pub directive_attribute: SmolStr,
    /// Class toggled on the container marker element.
    pub marker_class: SmolStr,
    /// Attributes whose changes under the container count as mutations.
    pub tracked_attributes: Vec<SmolStr>,
    /// Retry ladder offsets in milliseconds from a document change.
    pub retry_ladder_ms: Vec<u32>,
    /// Delay before rescanning after a layout or active-view change.
    pub layout_rescan_delay_ms: u32,
}

impl Default for WidthConfig {
    fn default() -> Self {
        Self {
            directives: DEFAULT_DIRECTIVES.iter().map(|&d| SmolStr::new_static(d)).collect(),
            embed_selector: SmolStr::new_static(".internal-embed"),
            identifier_attribute: SmolStr::new_static("src"),
            directive_attribute: SmolStr::new_static("data-width"),
            marker_class: SmolStr::new_static("has-custom-width"),
            tracked_attributes: vec![SmolStr::new_static("src"), SmolStr::new_static("class")],
            retry_ladder_ms: DEFAULT_RETRY_LADDER_MS.to_vec(),
            layout_rescan_delay_ms: 100,
        }
    }
}

impl WidthConfig {
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let directives = DirectiveSet::new(&self.directives)?;
        let ladder = RetryLadder::new(&self.retry_ladder_ms)?;

        let names = DomNames {
            embed_selector: non_blank(&self.embed_selector, "embedSelector")?,
            identifier_attribute: non_blank(&self.identifier_attribute, "identifierAttribute")?,
            directive_attribute: non_blank(&self.directive_attribute, "directiveAttribute")?,
            marker_class: non_blank(&self.marker_class, "markerClass")?,
        };

        let mut tracked_attributes = Vec::with_capacity(self.tracked_attributes.len());
        for attr in &self.tracked_attributes {
            let attr = non_blank(attr, "trackedAttributes")?;
            if attr == names.directive_attribute {
                return Err(ConfigError::TrackedDirectiveAttribute(attr));
            }
            if !tracked_attributes.contains(&attr) {
                tracked_attributes.push(attr);
            }
        }

        Ok(ValidatedConfig {
            directives,
            ladder,
            layout_rescan_delay: Duration::from_millis(u64::from(self.layout_rescan_delay_ms)),
            names,
            tracked_attributes,
        })
    }
}

fn non_blank(value: &SmolStr, field: &'static str) -> Result<SmolStr, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Blank(field));
    }
    Ok(SmolStr::new(trimmed))
}

/// DOM selector and attribute names used by the browser layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomNames {
    pub embed_selector: SmolStr,
    pub identifier_attribute: SmolStr,
    pub directive_attribute: SmolStr,
    pub marker_class: SmolStr,
}

/// Checked configuration with compiled directive patterns.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub directives: DirectiveSet,
    pub ladder: RetryLadder,
    pub layout_rescan_delay: Duration,
    pub names: DomNames,
    pub tracked_attributes: Vec<SmolStr>,
}

impl ValidatedConfig {
    /// Mutation filter for a live container: structure plus tracked attributes.
    pub fn observe_filter(&self) -> ObserveFilter {
        ObserveFilter {
            child_list: true,
            subtree: true,
            attributes: self.tracked_attributes.clone(),
        }
    }

    /// A fresh scheduler using this configuration's timings.
    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(self.ladder.clone(), self.layout_rescan_delay)
    }
}

impl Default for ValidatedConfig {
    fn default() -> Self {
        match WidthConfig::default().validate() {
            Ok(config) => config,
            Err(e) => unreachable!("default configuration is valid: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        let config = WidthConfig::default().validate().unwrap();
        assert_eq!(config.directives.len(), 3);
        assert_eq!(config.ladder.len(), DEFAULT_RETRY_LADDER_MS.len());
        assert_eq!(config.layout_rescan_delay, Duration::from_millis(100));
        assert_eq!(config.names.directive_attribute, "data-width");
        assert_eq!(config.names.marker_class, "has-custom-width");
    }

    #[test]
    fn test_observe_filter_excludes_annotation() {
        let filter = ValidatedConfig::default().observe_filter();
        assert!(filter.child_list);
        assert!(filter.subtree);
        assert_eq!(filter.attributes, ["src", "class"]);
    }

    #[test]
    fn test_tracking_directive_attribute_rejected() {
        let config = WidthConfig {
            tracked_attributes: vec!["src".into(), "data-width".into()],
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::TrackedDirectiveAttribute("data-width".into())
        );
    }

    #[test]
    fn test_blank_names_rejected() {
        let config = WidthConfig {
            marker_class: " ".into(),
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err(), ConfigError::Blank("markerClass"));
    }

    #[test]
    fn test_bad_ladder_rejected() {
        let config = WidthConfig {
            retry_ladder_ms: vec![100, 50],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Ladder(_))));
    }

    #[test]
    fn test_duplicate_tracked_attributes_collapse() {
        let config = WidthConfig {
            tracked_attributes: vec!["src".into(), " src ".into()],
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap().tracked_attributes, ["src"]);
    }
}
