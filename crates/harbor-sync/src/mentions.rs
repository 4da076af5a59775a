use std::sync::LazyLock;

use regex::Regex;

static AT_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\B@([a-z0-9.\-_]+)").expect("Valid at-mention regex"));

/// Finds usernames referenced from message text.
pub trait MentionExtractor: Send + Sync {
    /// Lowercased usernames in first-seen order, without duplicates.
    fn mentioned_usernames(&self, message: &str) -> Vec<String>;
}

/// `@username` mentions, matching the server's username charset.
///
/// Trailing `.`, `-` and `_` are stripped, so `@alice.` at the end of a
/// sentence resolves to `alice`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtMentionExtractor;

impl MentionExtractor for AtMentionExtractor {
    fn mentioned_usernames(&self, message: &str) -> Vec<String> {
        let mut usernames: Vec<String> = Vec::new();

        for cap in AT_MENTION.captures_iter(message) {
            let username = cap[1]
                .trim_end_matches(['.', '-', '_'])
                .to_lowercase();

            if !username.is_empty() && !usernames.contains(&username) {
                usernames.push(username);
            }
        }

        usernames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_lowercased_unique_mentions() {
        let names = AtMentionExtractor.mentioned_usernames("@Alice and @bob.smith, ping @alice again");
        assert_eq!(names, vec!["alice", "bob.smith"]);
    }

    #[test]
    fn strips_trailing_punctuation() {
        let names = AtMentionExtractor.mentioned_usernames("thanks @carol. see @dave_");
        assert_eq!(names, vec!["carol", "dave"]);
    }

    #[test]
    fn ignores_email_addresses() {
        let names = AtMentionExtractor.mentioned_usernames("mail ops@example.com or @eve");
        assert_eq!(names, vec!["eve"]);
    }
}
