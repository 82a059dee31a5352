//! Mapping from auth usernames to linked Discord accounts.

use std::collections::HashMap;
use tracing::debug;

/// Resolves an auth user to their linked Discord user id.
pub trait IdentityLookup: Send + Sync {
    /// The linked Discord id, or `None` if the user never linked an account.
    fn discord_id(&self, username: &str) -> Option<u64>;
}

/// Identity links read from the `[identities]` config table.
#[derive(Debug, Clone, Default)]
pub struct ConfigIdentities {
    links: HashMap<String, u64>,
}

impl ConfigIdentities {
    pub fn new(links: HashMap<String, u64>) -> Self {
        Self { links }
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl IdentityLookup for ConfigIdentities {
    fn discord_id(&self, username: &str) -> Option<u64> {
        match self.links.get(username) {
            Some(id) if *id != 0 => Some(*id),
            _ => {
                debug!("No Discord account linked for user {}", username);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let identities = ConfigIdentities::new(
            [
                ("john_doe".to_string(), 111_u64),
                ("broken".to_string(), 0_u64),
            ]
            .into_iter()
            .collect(),
        );

        assert!(!identities.is_empty());
        assert_eq!(identities.discord_id("john_doe"), Some(111));
        assert_eq!(identities.discord_id("broken"), None);
        assert_eq!(identities.discord_id("nobody"), None);
        assert!(ConfigIdentities::default().is_empty());
    }
}
