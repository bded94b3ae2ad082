//! IRC nickname alphabet.

/// Returns true if `c` is legal anywhere in an IRC nickname.
///
/// ASCII letters, digits, the RFC 2812 "special" characters and `-`.
pub fn is_nick_char(c: u8) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            b'[' | b']' | b'\\' | b'`' | b'_' | b'^' | b'{' | b'}' | b'|' | b'-'
        )
}

/// Strip characters that cannot appear in an IRC nickname.
///
/// Used when deriving a nick from a Discord display name, which may
/// contain spaces, punctuation or non-ASCII freely.
pub fn sanitize_nick(name: &str) -> String {
    name.bytes()
        .filter(|&b| is_nick_char(b))
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphanumerics_are_nick_chars() {
        for c in b'a'..=b'z' {
            assert!(is_nick_char(c));
        }
        for c in b'0'..=b'9' {
            assert!(is_nick_char(c));
        }
    }

    #[test]
    fn test_specials_are_nick_chars() {
        for c in br"[]\`_^{}|-" {
            assert!(is_nick_char(*c), "{} should be legal", *c as char);
        }
    }

    #[test]
    fn test_illegal_chars_rejected() {
        for c in b" !@#,.:;'\"" {
            assert!(!is_nick_char(*c), "{} should be illegal", *c as char);
        }
    }

    #[test]
    fn test_sanitize_strips_spaces_and_punctuation() {
        assert_eq!(sanitize_nick("Cool Guy!"), "CoolGuy");
        assert_eq!(sanitize_nick("already_fine"), "already_fine");
    }

    #[test]
    fn test_sanitize_strips_non_ascii() {
        assert_eq!(sanitize_nick("émilie"), "milie");
    }
}
