//! Conversation memory.
//!
//! - [`SessionStore`] keeps one append-only transcript per session id.
//! - [`truncate_history`] bounds how much of a transcript reaches a model.

pub mod session_store;

pub use session_store::SessionStore;

use crate::types::{Role, Turn};

/// Default number of recent turns included in model context.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Truncates conversation history to a window of recent turns.
///
/// A cut that would open on an assistant turn drops that turn too, so the
/// window never starts with a reply whose question was cut off.
pub fn truncate_history(history: &[Turn], window_size: usize) -> Vec<Turn> {
    let start = history.len().saturating_sub(window_size);
    let mut window = &history[start..];
    if start > 0 && window.first().is_some_and(|t| t.role == Role::Assistant) {
        window = &window[1..];
    }
    window.to_vec()
}

/// Estimates token count for a text (rough approximation).
///
/// Uses ~4 characters per token, close enough for English prose.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_history() {
        let history: Vec<Turn> = (0..10).map(|i| Turn::user(format!("Message {}", i))).collect();

        let truncated = truncate_history(&history, 3);
        assert_eq!(truncated.len(), 3);
        assert!(truncated[0].text.contains('7'));
        assert!(truncated[2].text.contains('9'));
    }

    #[test]
    fn test_odd_window_starts_on_user_turn() {
        let history: Vec<Turn> = (0..4)
            .flat_map(|i| [Turn::user(format!("q{i}")), Turn::assistant(format!("a{i}"))])
            .collect();

        let truncated = truncate_history(&history, 3);
        assert_eq!(truncated, vec![Turn::user("q3"), Turn::assistant("a3")]);

        let truncated = truncate_history(&history, 5);
        assert_eq!(truncated.len(), 4);
        assert_eq!(truncated[0], Turn::user("q2"));

        assert_eq!(truncate_history(&history, 4).len(), 4);
        assert!(truncate_history(&history, 1).is_empty());
    }

    #[test]
    fn test_truncate_history_shorter_than_window() {
        let history = vec![Turn::user("hi"), Turn::assistant("hello")];
        assert_eq!(truncate_history(&history, DEFAULT_HISTORY_WINDOW), history);
        assert!(truncate_history(&history, 0).is_empty());
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("test"), 1);
        assert_eq!(estimate_tokens("this is a longer test string"), 7);
    }
}
