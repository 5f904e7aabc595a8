//! Template repository and rendering.

use std::fmt;
use std::path::Path;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use tardy_core::ChatId;
use tracing::info;

use crate::errors::{MessagesError, Result};

/// Placeholder replaced by the addressed user's chat id.
pub const USER_FILLER: &str = "{user}";

const BUILTIN: &str = include_str!("messages.json");

/// Template group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Scolding a known violator.
    Angry,
    /// Friendly reply.
    Nice,
    /// Unaddressed timesheet nudge.
    Reminder,
}

impl Category {
    /// Whether templates of this category address a user.
    pub fn is_addressed(self) -> bool {
        !matches!(self, Self::Reminder)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Angry => "angry",
            Self::Nice => "nice",
            Self::Reminder => "reminder",
        })
    }
}

#[derive(Deserialize)]
struct RawTemplates {
    angry: Vec<String>,
    nice: Vec<String>,
    reminder: Vec<String>,
}

/// Validated templates for every category.
#[derive(Clone, Debug)]
pub struct MessageRepository {
    angry: Vec<String>,
    nice: Vec<String>,
    reminder: Vec<String>,
}

impl MessageRepository {
    /// The compiled-in set.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN)
    }

    /// Parse and validate a JSON template document
    /// (`{"angry": [...], "nice": [...], "reminder": [...]}`).
    pub fn from_json(raw: &str) -> Result<Self> {
        let raw: RawTemplates = serde_json::from_str(raw)?;
        let repo = Self {
            angry: raw.angry,
            nice: raw.nice,
            reminder: raw.reminder,
        };
        for category in [Category::Angry, Category::Nice, Category::Reminder] {
            repo.validate(category)?;
        }
        Ok(repo)
    }

    /// Load from `path`, or the built-in set when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Self::builtin();
        };
        let raw = std::fs::read_to_string(path).map_err(|source| MessagesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let repo = Self::from_json(&raw)?;
        info!(path = %path.display(), "message templates loaded");
        Ok(repo)
    }

    fn validate(&self, category: Category) -> Result<()> {
        let templates = self.templates(category);
        if templates.is_empty() {
            return Err(MessagesError::Empty(category));
        }
        for (index, template) in templates.iter().enumerate() {
            let has_filler = template.contains(USER_FILLER);
            let problem = match (category.is_addressed(), has_filler) {
                (true, false) => "does not mention {user}",
                (false, true) => "must not mention {user}",
                _ => continue,
            };
            return Err(MessagesError::BadTemplate {
                category,
                index,
                problem,
            });
        }
        Ok(())
    }

    /// All templates of one category.
    pub fn templates(&self, category: Category) -> &[String] {
        match category {
            Category::Angry => &self.angry,
            Category::Nice => &self.nice,
            Category::Reminder => &self.reminder,
        }
    }

    /// Pick a template of `category` with `rng` and fill in `user`.
    pub fn render_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        category: Category,
        user: Option<&ChatId>,
    ) -> String {
        // validation guarantees every category is non-empty
        let template = self
            .templates(category)
            .choose(rng)
            .map_or("", String::as_str);
        match user {
            Some(user) => template.replace(USER_FILLER, user.as_str()),
            None => template.to_string(),
        }
    }

    /// Random angry message for `user`.
    pub fn angry(&self, user: &ChatId) -> String {
        self.render_with(&mut rand::rng(), Category::Angry, Some(user))
    }

    /// Random nice message for `user`.
    pub fn nice(&self, user: &ChatId) -> String {
        self.render_with(&mut rand::rng(), Category::Nice, Some(user))
    }

    /// Random reminder.
    pub fn reminder(&self) -> String {
        self.render_with(&mut rand::rng(), Category::Reminder, None)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn repo() -> MessageRepository {
        MessageRepository::builtin().unwrap()
    }

    #[test]
    fn builtin_set_is_valid() {
        let repo = repo();
        for category in [Category::Angry, Category::Nice, Category::Reminder] {
            assert!(!repo.templates(category).is_empty(), "{category}");
        }
    }

    #[test]
    fn addressed_messages_mention_user() {
        let repo = repo();
        let user = ChatId::from("U42");
        for _ in 0..50 {
            let angry = repo.angry(&user);
            assert!(angry.contains("<@U42>"), "{angry}");
            assert!(!angry.contains(USER_FILLER));
            assert!(repo.nice(&user).contains("<@U42>"));
        }
    }

    #[test]
    fn reminders_are_unaddressed() {
        let repo = repo();
        for template in repo.templates(Category::Reminder) {
            assert!(!template.contains(USER_FILLER));
            assert!(!template.contains("<@"));
        }
        assert!(!repo.reminder().is_empty());
    }

    #[test]
    fn seeded_pick_is_deterministic() {
        let repo = repo();
        let user = ChatId::from("U1");
        let a = repo.render_with(&mut StdRng::seed_from_u64(7), Category::Nice, Some(&user));
        let b = repo.render_with(&mut StdRng::seed_from_u64(7), Category::Nice, Some(&user));
        assert_eq!(a, b);
    }

    #[test]
    fn empty_category_rejected() {
        let err = MessageRepository::from_json(
            r#"{"angry": ["<@{user}> late"], "nice": [], "reminder": ["r"]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, MessagesError::Empty(Category::Nice)));
    }

    #[test]
    fn angry_without_filler_rejected() {
        let err = MessageRepository::from_json(
            r#"{"angry": ["<@{user}> late", "be on time"], "nice": ["hi <@{user}>"], "reminder": ["r"]}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MessagesError::BadTemplate {
                category: Category::Angry,
                index: 1,
                ..
            }
        ));
    }

    #[test]
    fn reminder_with_filler_rejected() {
        let err = MessageRepository::from_json(
            r#"{"angry": ["<@{user}>"], "nice": ["<@{user}>"], "reminder": ["hey <@{user}>"]}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MessagesError::BadTemplate {
                category: Category::Reminder,
                ..
            }
        ));
    }

    #[test]
    fn load_from_file_overrides_builtin() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"angry": ["<@{{user}}> grr"], "nice": ["<@{{user}}> yay"], "reminder": ["psst"]}}"#
        )
        .unwrap();

        let repo = MessageRepository::load(Some(file.path())).unwrap();
        assert_eq!(repo.angry(&ChatId::from("U1")), "<@U1> grr");
        assert_eq!(repo.reminder(), "psst");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = MessageRepository::load(Some(Path::new("/nonexistent/tardy/messages.json")))
            .unwrap_err();
        assert!(matches!(err, MessagesError::Io { .. }));
    }
}
