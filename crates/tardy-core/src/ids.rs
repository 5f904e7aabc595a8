//! Branded identity newtypes.
//!
//! The bot juggles two identity spaces: the compliance feed knows people by
//! email ([`ExternalId`]), the chat platform by opaque user ids ([`ChatId`]).
//! Keeping them as distinct types stops a chat id from being looked up in the
//! directory by accident.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Whether the identity is blank.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

macro_rules! verbatim_from {
    ($name:ident) => {
        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

branded_id! {
    /// Identity used by the compliance feed: an email address.
    ///
    /// Emails are compared case-insensitively by both systems, so the value is
    /// trimmed and lowercased on construction.
    ExternalId
}

branded_id! {
    /// Identity the chat platform uses to address a single user.
    ChatId
}

branded_id! {
    /// Chat channel (public, private, or direct-message conversation).
    ChannelId
}

verbatim_from!(ChatId);
verbatim_from!(ChannelId);

impl ExternalId {
    fn normalize(raw: &str) -> String {
        raw.trim().to_lowercase()
    }

    /// Whether the raw value looks like an email (used to tell unresolved
    /// privileged entries apart from chat ids).
    #[must_use]
    pub fn looks_like_email(raw: &str) -> bool {
        let raw = raw.trim();
        raw.find('@').is_some_and(|at| at > 0 && at + 1 < raw.len())
    }
}

impl From<String> for ExternalId {
    fn from(s: String) -> Self {
        Self(Self::normalize(&s))
    }
}

impl From<&str> for ExternalId {
    fn from(s: &str) -> Self {
        Self(Self::normalize(s))
    }
}

impl ChatId {
    /// The `<@U123>` mention token the chat platform renders as a user link.
    #[must_use]
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_id_is_normalized() {
        let id = ExternalId::from("  Jane.Doe@Example.ORG ");
        assert_eq!(id.as_str(), "jane.doe@example.org");
    }

    #[test]
    fn external_ids_compare_case_insensitively() {
        assert_eq!(ExternalId::from("A@X.org"), ExternalId::from("a@x.org"));
    }

    #[test]
    fn chat_id_is_verbatim() {
        let id = ChatId::from("U0ABC");
        assert_eq!(id.as_str(), "U0ABC");
    }

    #[test]
    fn mention_format() {
        assert_eq!(ChatId::from("U1").mention(), "<@U1>");
    }

    #[test]
    fn blank_external_id_is_empty() {
        assert!(ExternalId::from("   ").is_empty());
    }

    #[test]
    fn email_detection() {
        assert!(ExternalId::looks_like_email("a@x.org"));
        assert!(!ExternalId::looks_like_email("U12345"));
        assert!(!ExternalId::looks_like_email("@x.org"));
        assert!(!ExternalId::looks_like_email("a@"));
    }

    #[test]
    fn serde_is_transparent() {
        let id = ChatId::from("U9");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"U9\"");
        let back: ChatId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn deref_to_str() {
        let id = ChannelId::from("C1");
        let s: &str = &id;
        assert_eq!(s, "C1");
    }
}
