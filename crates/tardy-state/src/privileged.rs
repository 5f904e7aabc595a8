//! Privileged user registry.
//!
//! Configured as a list of emails and/or chat ids. After each directory
//! refresh, email entries with a matching member are rewritten in place to
//! that member's chat id. Membership checks accept both forms, so a user is
//! recognized before and after resolution.

use parking_lot::RwLock;
use tardy_core::{ChatId, ExternalId};

use crate::directory::{DirectoryCache, DirectoryMap};

/// Ordered list of admin identities.
#[derive(Debug, Default)]
pub struct PrivilegedUsers {
    entries: RwLock<Vec<String>>,
}

impl PrivilegedUsers {
    /// Build from configured identities (blank entries dropped).
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|s| s.into().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Whether `chat_id` belongs to a privileged user.
    ///
    /// An entry matches if it equals the chat id, or if it is a still
    /// unresolved email whose directory mapping is the chat id.
    pub fn is_privileged(&self, chat_id: &ChatId, directory: &DirectoryCache) -> bool {
        // snapshot first: never hold both locks
        let mapping = directory.snapshot();
        self.entries
            .read()
            .iter()
            .any(|entry| Self::matches(entry, chat_id, &mapping))
    }

    fn matches(entry: &str, chat_id: &ChatId, mapping: &DirectoryMap) -> bool {
        if entry == chat_id.as_str() {
            return true;
        }
        ExternalId::looks_like_email(entry)
            && mapping.get(&ExternalId::from(entry)) == Some(chat_id)
    }

    /// Rewrite email entries that appear in `mapping` to their chat id.
    ///
    /// Returns how many entries were resolved by this call.
    pub fn resolve(&self, mapping: &DirectoryMap) -> usize {
        let mut resolved = 0;
        for entry in self.entries.write().iter_mut() {
            if !ExternalId::looks_like_email(entry) {
                continue;
            }
            if let Some(chat_id) = mapping.get(&ExternalId::from(entry.as_str())) {
                tracing::debug!(email = %entry, %chat_id, "privileged user resolved");
                *entry = chat_id.to_string();
                resolved += 1;
            }
        }
        resolved
    }

    /// Current entries in configured order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.read().clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no admin is configured.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory(pairs: &[(&str, &str)]) -> DirectoryCache {
        DirectoryCache::with_entries(
            pairs
                .iter()
                .map(|(e, c)| (ExternalId::from(*e), ChatId::from(*c)))
                .collect(),
        )
    }

    #[test]
    fn blank_entries_dropped() {
        let users = PrivilegedUsers::new(["boss@x.org", " ", ""]);
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn chat_id_entry_matches_directly() {
        let users = PrivilegedUsers::new(["P1"]);
        let dir = DirectoryCache::new();
        assert!(users.is_privileged(&ChatId::from("P1"), &dir));
        assert!(!users.is_privileged(&ChatId::from("P2"), &dir));
    }

    #[test]
    fn unresolved_email_matches_through_directory() {
        let users = PrivilegedUsers::new(["Boss@X.org"]);
        let dir = directory(&[("boss@x.org", "P1")]);
        assert!(users.is_privileged(&ChatId::from("P1"), &dir));
        assert!(!users.is_privileged(&ChatId::from("U5"), &dir));
    }

    #[test]
    fn unresolved_email_without_directory_entry_matches_nothing() {
        let users = PrivilegedUsers::new(["boss@x.org"]);
        let dir = DirectoryCache::new();
        assert!(!users.is_privileged(&ChatId::from("P1"), &dir));
    }

    #[test]
    fn resolve_rewrites_in_place_preserving_order() {
        let users = PrivilegedUsers::new(["U0", "boss@x.org", "ghost@x.org"]);
        let dir = directory(&[("boss@x.org", "P1")]);

        assert_eq!(users.resolve(&dir.snapshot()), 1);
        assert_eq!(users.entries(), vec!["U0", "P1", "ghost@x.org"]);

        // second pass has nothing left to resolve
        assert_eq!(users.resolve(&dir.snapshot()), 0);
    }

    #[test]
    fn membership_is_uniform_before_and_after_resolution() {
        let users = PrivilegedUsers::new(["boss@x.org"]);
        let dir = directory(&[("boss@x.org", "P1")]);
        let sender = ChatId::from("P1");

        assert!(users.is_privileged(&sender, &dir));
        let _ = users.resolve(&dir.snapshot());
        assert!(users.is_privileged(&sender, &dir));

        // still privileged after the directory forgets the email
        dir.replace(DirectoryMap::new());
        assert!(users.is_privileged(&sender, &dir));
    }
}
