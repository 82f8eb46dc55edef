use crate::core::Result;
use serde::{Deserialize, Serialize};

/// How the cycle guard recognizes an instance it has already visited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitIdentity {
    /// Same live instance (pointer identity).
    #[default]
    Instance,
    /// Same entity type and primary key values. For contexts that hand out
    /// a fresh instance on every load. Types without key members fall back
    /// to instance identity.
    Key,
}

/// Graph loader configuration
///
/// Defaults suit a full eager load: change detection suspended, revisits of
/// an instance skipped, no depth limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Disable automatic change detection for the duration of a root call
    pub suspend_change_tracking: bool,

    /// Skip instances already visited during the current root call
    pub cycle_guard: bool,

    /// Identity used by the cycle guard
    pub visit_identity: VisitIdentity,

    /// Maximum relationship depth below a root
    pub max_depth: Option<usize>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            suspend_change_tracking: true,
            cycle_guard: true,
            visit_identity: VisitIdentity::Instance,
            max_depth: None,
        }
    }
}

impl LoaderConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set whether change detection is suspended
    pub fn suspend_change_tracking(mut self, suspend: bool) -> Self {
        self.suspend_change_tracking = suspend;
        self
    }

    /// Set whether visited instances are skipped
    pub fn cycle_guard(mut self, enabled: bool) -> Self {
        self.cycle_guard = enabled;
        self
    }

    /// Set the identity used by the cycle guard
    pub fn visit_identity(mut self, identity: VisitIdentity) -> Self {
        self.visit_identity = identity;
        self
    }

    /// Set the depth limit
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::default();
        assert!(config.suspend_change_tracking);
        assert!(config.cycle_guard);
        assert_eq!(config.visit_identity, VisitIdentity::Instance);
        assert_eq!(config.max_depth, None);
    }

    #[test]
    fn test_builder_pattern() {
        let config = LoaderConfig::new()
            .suspend_change_tracking(false)
            .cycle_guard(false)
            .visit_identity(VisitIdentity::Key)
            .max_depth(4);

        assert!(!config.suspend_change_tracking);
        assert!(!config.cycle_guard);
        assert_eq!(config.visit_identity, VisitIdentity::Key);
        assert_eq!(config.max_depth, Some(4));
    }

    #[test]
    fn test_from_json_keeps_missing_defaults() -> Result<()> {
        let config = LoaderConfig::from_json(r#"{ "max_depth": 12 }"#)?;
        assert_eq!(config, LoaderConfig::new().max_depth(12));

        let config = LoaderConfig::from_json(r#"{ "visit_identity": "key", "cycle_guard": true }"#)?;
        assert_eq!(config.visit_identity, VisitIdentity::Key);
        assert!(LoaderConfig::from_json("[]").is_err());
        Ok(())
    }
}
