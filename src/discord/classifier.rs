//! Message shape classification.
//!
//! Derives action/edit framing from a translated message and parses
//! private-message targets for direct channels.

use crate::irc::is_nick_char;

/// Reply sent on a direct channel when no PM target can be deduced.
pub const PM_TARGET_HELP: &str = "Don't know who that is. Can't PM. Try 'name, message here'";

/// Classification result for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub text: String,
    pub is_action: bool,
    pub is_edit: bool,
}

/// Classify a message and apply action/edit framing.
///
/// Action detection runs on the raw text only: translation can change
/// the text's length, so no index derived from one string is ever
/// applied to the other. The enclosing underscores are stripped from
/// the translated text by its own first and last characters; if
/// translation removed them the text passes through unchanged.
pub fn classify(translated: &str, raw: &str, was_edit: bool) -> Classified {
    let is_action =
        raw.len() > 2 && raw.starts_with('_') && raw.ends_with('_') && translated.len() > 2;

    let mut text = if is_action {
        translated
            .strip_prefix('_')
            .and_then(|inner| inner.strip_suffix('_'))
            .unwrap_or(translated)
            .to_string()
    } else {
        translated.to_string()
    };

    if was_edit {
        if is_action {
            text = format!("/me {}", text);
        }
        text = format!("[edit]: {}", text);
    }

    Classified {
        text,
        is_action,
        is_edit: was_edit,
    }
}

/// Parse an IRC PM target out of a direct-channel message.
///
/// The convention is `"<nick>, <rest>"`: split once on the first
/// comma; the left side must be non-empty and consist solely of legal
/// nick characters, else no target is deducible. The right side loses
/// at most one leading space.
pub fn pm_target_from_content(content: &str) -> Option<(String, String)> {
    let (nick, rest) = content.split_once(',')?;

    if nick.is_empty() || !nick.bytes().all(is_nick_char) {
        return None;
    }

    let body = rest.strip_prefix(' ').unwrap_or(rest);
    Some((nick.to_string(), body.to_string()))
}

/// Truncate to at most `max` characters, never splitting a char.
pub fn truncate(max: usize, text: &str) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_message() {
        let c = classify("hello", "hello", false);
        assert_eq!(c.text, "hello");
        assert!(!c.is_action);
        assert!(!c.is_edit);
    }

    #[test]
    fn test_action_message() {
        let c = classify("_hello_", "_hello_", false);
        assert_eq!(c.text, "hello");
        assert!(c.is_action);
    }

    #[test]
    fn test_action_detected_on_raw_after_translation_changed_length() {
        // "_<@7> waves_" translated to a much shorter string; detection
        // still works off the raw markers.
        let c = classify("_Ally~d waves_", "_<@1234567890> waves_", false);
        assert!(c.is_action);
        assert_eq!(c.text, "Ally~d waves");
    }

    #[test]
    fn test_underscore_pair_too_short_is_not_action() {
        let c = classify("__", "__", false);
        assert!(!c.is_action);
        assert_eq!(c.text, "__");
    }

    #[test]
    fn test_edit_prefix() {
        let c = classify("hello", "hello", true);
        assert_eq!(c.text, "[edit]: hello");
        assert!(c.is_edit);
    }

    #[test]
    fn test_edited_action_prefix_order() {
        let c = classify("_waves_", "_waves_", true);
        assert_eq!(c.text, "[edit]: /me waves");
        assert!(c.is_action);
        assert!(c.is_edit);
    }

    #[test]
    fn test_pm_target_parsed() {
        let (nick, body) = pm_target_from_content("alice, how are you").unwrap();
        assert_eq!(nick, "alice");
        assert_eq!(body, "how are you");
    }

    #[test]
    fn test_pm_body_keeps_interior_commas() {
        let (nick, body) = pm_target_from_content("qais,come on, i need this!").unwrap();
        assert_eq!(nick, "qais");
        assert_eq!(body, "come on, i need this!");
    }

    #[test]
    fn test_pm_invalid_nick_rejected() {
        assert!(pm_target_from_content("not a valid nick!, hi").is_none());
    }

    #[test]
    fn test_pm_no_comma_rejected() {
        assert!(pm_target_from_content("just some text").is_none());
    }

    #[test]
    fn test_pm_empty_nick_rejected() {
        assert!(pm_target_from_content(", hi").is_none());
    }

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate(40, "short"), "short");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate(2, "héllo"), "hé");
    }
}
