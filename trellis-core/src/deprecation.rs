use serde::Deserialize;

use crate::Version;

/// Declared deprecation state of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeprecationState {
    Warn,
    Removed,
}

/// Deprecation data attached to a command node.
///
/// A record never acts on its own; [`DeprecationRecord::action`] folds it
/// together with the current tool version into a [`DeprecationAction`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeprecationRecord {
    pub state: DeprecationState,
    /// Version at which a warning escalates to removal.
    pub removed_in: Option<Version>,
    /// Replacement command path suggested to the user.
    pub replacement: Option<String>,
    pub reason: Option<String>,
}

/// What the dispatcher does with a deprecated command.
#[derive(Debug, Clone, PartialEq)]
pub enum DeprecationAction {
    Pass,
    /// Emit one warning line, then proceed.
    Warn { message: String },
    /// Refuse to invoke the command.
    Fail { replacement: Option<String> },
}

impl DeprecationRecord {
    /// Decide the action for this record at the given tool version.
    ///
    /// A warn record escalates to removal once the version reaches its
    /// `removed_in` bound.
    pub fn action(&self, current: &Version) -> DeprecationAction {
        match self.state {
            DeprecationState::Removed => DeprecationAction::Fail {
                replacement: self.replacement.clone(),
            },
            DeprecationState::Warn => match &self.removed_in {
                Some(bound) if current >= bound => DeprecationAction::Fail {
                    replacement: self.replacement.clone(),
                },
                _ => DeprecationAction::Warn {
                    message: self.warning_message(),
                },
            },
        }
    }

    /// Help-text decoration for this record at the given version.
    pub fn decoration(&self, current: &Version) -> &'static str {
        match self.action(current) {
            DeprecationAction::Fail { .. } => "(REMOVED)",
            _ => "(DEPRECATED)",
        }
    }

    fn warning_message(&self) -> String {
        let mut message = self
            .reason
            .clone()
            .unwrap_or_else(|| "This command is deprecated.".to_string());
        if let Some(bound) = &self.removed_in {
            message.push_str(&format!(" It will be removed in version {}.", bound));
        }
        if let Some(replacement) = &self.replacement {
            message.push_str(&format!(" Use `{}` instead.", replacement));
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warn_until(version: &str) -> DeprecationRecord {
        DeprecationRecord {
            state: DeprecationState::Warn,
            removed_in: Some(version.parse().unwrap()),
            replacement: Some("new cmd".to_string()),
            reason: None,
        }
    }

    #[test]
    fn test_warn_before_removal_version() {
        let record = warn_until("2.0.0");
        match record.action(&Version::new(1, 5, 0)) {
            DeprecationAction::Warn { message } => {
                assert!(message.contains("2.0.0"));
                assert!(message.contains("new cmd"));
            }
            other => panic!("expected warn, got {:?}", other),
        }
    }

    #[test]
    fn test_warn_escalates_at_removal_version() {
        let record = warn_until("2.0.0");
        let action = record.action(&Version::new(2, 0, 0));
        assert_eq!(
            action,
            DeprecationAction::Fail {
                replacement: Some("new cmd".to_string())
            }
        );
        // And past it.
        assert!(matches!(
            record.action(&Version::new(2, 1, 0)),
            DeprecationAction::Fail { .. }
        ));
    }

    #[test]
    fn test_warn_without_bound_never_escalates() {
        let record = DeprecationRecord {
            state: DeprecationState::Warn,
            removed_in: None,
            replacement: None,
            reason: Some("Prefer the v2 surface.".to_string()),
        };
        match record.action(&Version::new(99, 0, 0)) {
            DeprecationAction::Warn { message } => {
                assert_eq!(message, "Prefer the v2 surface.");
            }
            other => panic!("expected warn, got {:?}", other),
        }
    }

    #[test]
    fn test_removed_always_fails() {
        let record = DeprecationRecord {
            state: DeprecationState::Removed,
            removed_in: None,
            replacement: None,
            reason: None,
        };
        assert!(matches!(
            record.action(&Version::new(0, 0, 1)),
            DeprecationAction::Fail { replacement: None }
        ));
    }

    #[test]
    fn test_decoration() {
        let record = warn_until("2.0.0");
        assert_eq!(record.decoration(&Version::new(1, 0, 0)), "(DEPRECATED)");
        assert_eq!(record.decoration(&Version::new(2, 0, 0)), "(REMOVED)");
    }
}
