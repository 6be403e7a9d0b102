//! Admission policies and the named policy table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, TurnstileError};

/// A named admission policy: how many requests a single identifier may have
/// admitted within one fixed window.
///
/// Values are validated when a [`PolicyTable`] is built, so a policy taken
/// from a table always has a non-zero cap and window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Maximum requests admitted within one window
    pub max_requests: u64,
    /// Window length in milliseconds
    pub window_ms: u64,
}

impl Policy {
    /// Create a new policy.
    pub const fn new(max_requests: u64, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms,
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(TurnstileError::InvalidPolicy {
                name: name.to_string(),
                reason: "policy name must not be empty".to_string(),
            });
        }
        if self.max_requests == 0 {
            return Err(TurnstileError::InvalidPolicy {
                name: name.to_string(),
                reason: "max_requests must be at least 1".to_string(),
            });
        }
        if self.window_ms == 0 {
            return Err(TurnstileError::InvalidPolicy {
                name: name.to_string(),
                reason: "window_ms must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// The process-wide table of named admission policies.
///
/// Endpoint handlers refer to policies by name, so the table is the single
/// place where request classes map to caps. It is built once when the
/// limiter is constructed and read-only afterwards.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    policies: HashMap<String, Policy>,
}

impl PolicyTable {
    /// The built-in policy set covering the service's endpoint classes.
    ///
    /// Authentication endpoints carry much stricter caps over much longer
    /// windows than the document endpoints, since failed logins and signup
    /// floods are abuse signals rather than ordinary traffic.
    pub fn builtin() -> Self {
        let mut policies = HashMap::new();
        policies.insert("default".to_string(), Policy::new(60, 60_000));
        policies.insert("upload".to_string(), Policy::new(10, 60_000));
        policies.insert("download".to_string(), Policy::new(30, 60_000));
        policies.insert("login".to_string(), Policy::new(5, 900_000));
        policies.insert("signup".to_string(), Policy::new(3, 3_600_000));
        policies.insert("password_reset".to_string(), Policy::new(3, 3_600_000));
        Self { policies }
    }

    /// Build a table from the built-in set with `overrides` merged on top.
    ///
    /// An override with a built-in name replaces that policy; any other name
    /// defines a new one. Every override is validated, and a bad definition
    /// fails construction rather than surfacing on the first request.
    pub fn with_overrides(overrides: &HashMap<String, Policy>) -> Result<Self> {
        let mut table = Self::builtin();
        for (name, policy) in overrides {
            policy.validate(name)?;
            table.policies.insert(name.clone(), *policy);
        }
        Ok(table)
    }

    /// Look up a policy by name.
    pub fn get(&self, name: &str) -> Option<&Policy> {
        self.policies.get(name)
    }

    /// Number of named policies in the table.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether the table has no policies.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_covers_endpoint_classes() {
        let table = PolicyTable::builtin();

        for name in [
            "default",
            "upload",
            "download",
            "login",
            "signup",
            "password_reset",
        ] {
            assert!(table.get(name).is_some(), "missing builtin policy {}", name);
        }
        assert_eq!(table.len(), 6);

        let default = table.get("default").unwrap();
        assert_eq!(default.max_requests, 60);
        assert_eq!(default.window_ms, 60_000);
    }

    #[test]
    fn test_auth_policies_are_stricter_than_default() {
        let table = PolicyTable::builtin();
        let default = *table.get("default").unwrap();

        for name in ["login", "signup", "password_reset"] {
            let policy = table.get(name).unwrap();
            assert!(policy.max_requests < default.max_requests);
            assert!(policy.window_ms > default.window_ms);
        }
    }

    #[test]
    fn test_override_replaces_builtin_policy() {
        let mut overrides = HashMap::new();
        overrides.insert("upload".to_string(), Policy::new(25, 30_000));

        let table = PolicyTable::with_overrides(&overrides).unwrap();
        assert_eq!(table.get("upload"), Some(&Policy::new(25, 30_000)));
        // Untouched builtins survive the merge.
        assert_eq!(table.get("download"), Some(&Policy::new(30, 60_000)));
    }

    #[test]
    fn test_override_defines_new_policy() {
        let mut overrides = HashMap::new();
        overrides.insert("export".to_string(), Policy::new(5, 60_000));

        let table = PolicyTable::with_overrides(&overrides).unwrap();
        assert_eq!(table.len(), 7);
        assert_eq!(table.get("export"), Some(&Policy::new(5, 60_000)));
    }

    #[test]
    fn test_zero_max_requests_is_rejected() {
        let mut overrides = HashMap::new();
        overrides.insert("broken".to_string(), Policy::new(0, 60_000));

        let result = PolicyTable::with_overrides(&overrides);
        assert!(matches!(
            result,
            Err(TurnstileError::InvalidPolicy { ref name, .. }) if name == "broken"
        ));
    }

    #[test]
    fn test_zero_window_is_rejected() {
        let mut overrides = HashMap::new();
        overrides.insert("broken".to_string(), Policy::new(10, 0));

        assert!(PolicyTable::with_overrides(&overrides).is_err());
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let mut overrides = HashMap::new();
        overrides.insert(String::new(), Policy::new(10, 60_000));

        assert!(PolicyTable::with_overrides(&overrides).is_err());
    }
}
