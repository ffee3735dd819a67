//! Announcement deduplication by embed identity.
//!
//! An announcement's identity is its embed `(title, footer)` pair. Before
//! sending, the destination's recent history is scanned for an embed with the
//! same pair. This is a best-effort, window-bounded check: history beyond
//! what Discord returns in one fetch is invisible, so a duplicate is possible
//! after the window rolls over. That is an accepted limitation, not a
//! guarantee of exactly-once delivery.

use serenity::all::Message;

/// The `(title, footer)` pair identifying one announcement embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementIdentity {
    pub title: String,
    pub footer: String,
}

/// Returns true when `history` already contains an embed whose title and
/// footer both exactly match the candidate.
pub fn already_announced<I>(history: I, title: &str, footer: &str) -> bool
where
    I: IntoIterator<Item = AnnouncementIdentity>,
{
    history
        .into_iter()
        .any(|identity| identity.title == title && identity.footer == footer)
}

/// Extracts the announcement identities from a fetched message window.
///
/// Messages without embeds, or with embeds missing a title or footer, carry
/// no identity and are skipped.
pub fn embed_identities(messages: &[Message]) -> Vec<AnnouncementIdentity> {
    messages
        .iter()
        .flat_map(|message| message.embeds.iter())
        .filter_map(|embed| {
            let title = embed.title.clone()?;
            let footer = embed.footer.as_ref()?.text.clone();
            Some(AnnouncementIdentity { title, footer })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(title: &str, footer: &str) -> AnnouncementIdentity {
        AnnouncementIdentity {
            title: title.to_string(),
            footer: footer.to_string(),
        }
    }

    /// Tests that a prior identical announcement is detected.
    #[test]
    fn detects_existing_announcement() {
        let history = vec![
            identity("Starting in 30 minutes: Game Night", "Event abc123"),
            identity("Unrelated", "Event def456"),
        ];

        assert!(already_announced(
            history,
            "Starting in 30 minutes: Game Night",
            "Event abc123"
        ));
    }

    /// Tests that both halves of the identity must match.
    #[test]
    fn requires_exact_title_and_footer() {
        let history = vec![identity("Starting in 30 minutes: Game Night", "Event abc123")];

        assert!(!already_announced(
            history.clone(),
            "Starting in 30 minutes: Game Night",
            "Event other"
        ));
        assert!(!already_announced(
            history,
            "Starting in 10 minutes: Game Night",
            "Event abc123"
        ));
    }

    /// Tests that an empty or rolled-over history window reports not yet
    /// announced.
    #[test]
    fn empty_history_is_not_announced() {
        assert!(!already_announced(
            Vec::new(),
            "Starting in 30 minutes: Game Night",
            "Event abc123"
        ));
    }
}
