//! Object key format rules

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use validator::ValidationError;

static KEY_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-/.]+$").expect("key charset pattern is valid"));

/// Reasons an object key is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Key is empty after trimming
    #[error("Key must not be empty")]
    Empty,

    /// Key starts with `/`
    #[error("Key must not start with '/'")]
    LeadingSlash,

    /// Key ends with `/`
    #[error("Key must not end with '/'")]
    TrailingSlash,

    /// Key contains a character outside letters, digits, `_`, `-`, `/` and `.`
    #[error("Key contains invalid character {0:?}")]
    InvalidCharacter(char),
}

impl KeyError {
    /// Machine-readable rule name
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Empty => "empty_key",
            Self::LeadingSlash => "leading_slash",
            Self::TrailingSlash => "trailing_slash",
            Self::InvalidCharacter(_) => "invalid_character",
        }
    }
}

impl From<KeyError> for ValidationError {
    fn from(err: KeyError) -> Self {
        Self::new(err.code()).with_message(err.to_string().into())
    }
}

/// Field validator for request bodies carrying an object key
///
/// # Errors
///
/// Returns a `ValidationError` whose message names the violated rule
pub fn validate_object_key(key: &str) -> Result<(), ValidationError> {
    validate_key(key).map(|_| ()).map_err(ValidationError::from)
}

/// Validates an object key and returns it trimmed
///
/// # Errors
///
/// Returns the first `KeyError` rule the key violates
pub fn validate_key(raw: &str) -> Result<&str, KeyError> {
    let key = raw.trim();

    if key.is_empty() {
        return Err(KeyError::Empty);
    }
    if key.starts_with('/') {
        return Err(KeyError::LeadingSlash);
    }
    if key.ends_with('/') {
        return Err(KeyError::TrailingSlash);
    }
    if !KEY_CHARSET.is_match(key) {
        let invalid = key
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/' | '.')))
            .unwrap_or_default();
        return Err(KeyError::InvalidCharacter(invalid));
    }

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{seq::SliceRandom, Rng};

    const ALLOWED: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_-/.";

    fn random_valid_key(rng: &mut impl Rng) -> String {
        let len = rng.gen_range(1..24);
        let mut key: String = (0..len)
            .map(|_| char::from(*ALLOWED.choose(rng).unwrap()))
            .collect();
        // Anchor both ends on a non-slash character
        key.insert(0, 'a');
        key.push('z');
        key
    }

    #[test]
    fn test_accepts_typical_keys() {
        for key in ["uploads/a.png", "a", "a.b", "dir/sub-dir/file_1.tar.gz", "A-Z_0.9"] {
            assert_eq!(validate_key(key), Ok(key), "rejected {key}");
        }
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(validate_key("  uploads/a.png\n"), Ok("uploads/a.png"));
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(validate_key(""), Err(KeyError::Empty));
        assert_eq!(validate_key("   "), Err(KeyError::Empty));
    }

    #[test]
    fn test_rejects_slash_bounded_keys() {
        assert_eq!(validate_key("/bad"), Err(KeyError::LeadingSlash));
        assert_eq!(validate_key("bad/"), Err(KeyError::TrailingSlash));
        assert_eq!(validate_key("/"), Err(KeyError::LeadingSlash));

        let mut rng = rand::thread_rng();
        for _ in 0..1_000 {
            let key = random_valid_key(&mut rng);
            assert_eq!(validate_key(&format!("/{key}")), Err(KeyError::LeadingSlash));
            assert_eq!(validate_key(&format!("{key}/")), Err(KeyError::TrailingSlash));
        }
    }

    #[test]
    fn test_rejects_characters_outside_charset() {
        for (key, bad) in [
            ("a b", ' '),
            ("uploads/ä.png", 'ä'),
            ("a?b", '?'),
            ("a\\b", '\\'),
            ("a%20b", '%'),
            ("a:b", ':'),
        ] {
            assert_eq!(validate_key(key), Err(KeyError::InvalidCharacter(bad)));
        }

        let mut rng = rand::thread_rng();
        for _ in 0..1_000 {
            let mut key = random_valid_key(&mut rng);
            let bad = loop {
                let candidate = char::from(rng.gen_range(0x21u8..0x7f));
                if !ALLOWED.contains(&(candidate as u8)) {
                    break candidate;
                }
            };
            let at = rng.gen_range(1..key.len());
            key.insert(at, bad);
            assert_eq!(validate_key(&key), Err(KeyError::InvalidCharacter(bad)));
        }
    }

    #[test]
    fn test_field_validator_carries_rule_message() {
        assert!(validate_object_key(" uploads/a.png ").is_ok());

        let err = validate_object_key("bad/").unwrap_err();
        assert_eq!(err.code, "trailing_slash");
        assert_eq!(
            err.message.as_deref(),
            Some("Key must not end with '/'")
        );
    }

    #[test]
    fn test_accepts_random_valid_keys() {
        let mut rng = rand::thread_rng();
        for _ in 0..1_000 {
            let key = random_valid_key(&mut rng);
            assert_eq!(validate_key(&key), Ok(key.as_str()));
        }
    }
}
