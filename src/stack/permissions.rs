use ahash::AHashMap;
use std::collections::BTreeSet;

/// The effective permission set of every identity in a stack.
///
/// Grants only ever add entries; nothing in the build phase removes one.
#[derive(Debug, Clone, Default)]
pub struct PermissionLedger {
    // Key: identity logical id, Value: (action, target logical id)
    entries: AHashMap<String, BTreeSet<(String, String)>>,
}

impl PermissionLedger {
    pub(crate) fn grant(&mut self, identity: &str, actions: &[String], targets: &[String]) {
        let entry = self.entries.entry(identity.to_string()).or_default();
        for action in actions {
            for target in targets {
                entry.insert((action.clone(), target.clone()));
            }
        }
    }

    /// Whether `identity` may perform `action` on `target`.
    /// An action of `service:*` covers every action of that service.
    pub fn allows(&self, identity: &str, action: &str, target: &str) -> bool {
        let Some(entry) = self.entries.get(identity) else {
            return false;
        };
        entry
            .iter()
            .any(|(granted, granted_target)| granted_target == target && action_matches(granted, action))
    }

    /// Sorted `(action, target)` pairs granted to `identity`.
    pub fn effective(&self, identity: &str) -> Vec<(String, String)> {
        self.entries
            .get(identity)
            .map(|entry| entry.iter().cloned().collect())
            .unwrap_or_default()
    }
}

fn action_matches(granted: &str, requested: &str) -> bool {
    if granted == requested || granted == "*" {
        return true;
    }
    match (granted.split_once(':'), requested.split_once(':')) {
        (Some((granted_service, "*")), Some((requested_service, _))) => {
            granted_service == requested_service
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_are_additive() {
        let mut ledger = PermissionLedger::default();
        ledger.grant("role", &["states:StartExecution".to_string()], &["sm".to_string()]);
        ledger.grant("role", &["states:DescribeExecution".to_string()], &["sm".to_string()]);

        assert!(ledger.allows("role", "states:StartExecution", "sm"));
        assert!(ledger.allows("role", "states:DescribeExecution", "sm"));
        assert!(!ledger.allows("role", "states:StopExecution", "sm"));
        assert!(!ledger.allows("other", "states:StartExecution", "sm"));
        assert_eq!(ledger.effective("role").len(), 2);
    }

    #[test]
    fn service_wildcards_cover_service_actions_only() {
        let mut ledger = PermissionLedger::default();
        ledger.grant("role", &["states:*".to_string()], &["sm".to_string()]);
        assert!(ledger.allows("role", "states:StartExecution", "sm"));
        assert!(!ledger.allows("role", "lambda:InvokeFunction", "sm"));
        assert!(!ledger.allows("role", "states:StartExecution", "other"));
    }
}
