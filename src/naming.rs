//! Stream key validation
//!
//! A valid stream key is 2 to 48 characters long, made of lowercase ASCII
//! letters, digits and dashes, starts and ends with a letter or digit, and
//! never contains two dashes in a row.

use std::fmt;

/// Shortest accepted stream key.
pub const MIN_STREAM_KEY_LEN: usize = 2;

/// Longest accepted stream key.
pub const MAX_STREAM_KEY_LEN: usize = 48;

/// Outcome of validating a stream key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    TooShort,
    TooLong,
    BadFirstChar,
    BadLastChar,
    BadChar,
    ConsecutiveDashes,
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        *self == Validity::Valid
    }

    /// Human-readable reason.
    pub fn describe(&self) -> &'static str {
        match self {
            Validity::Valid => "valid",
            Validity::TooShort => "shorter than 2 characters",
            Validity::TooLong => "longer than 48 characters",
            Validity::BadFirstChar => "does not start with a lowercase letter or digit",
            Validity::BadLastChar => "does not end with a lowercase letter or digit",
            Validity::BadChar => "contains characters other than lowercase letters, digits and dashes",
            Validity::ConsecutiveDashes => "contains two consecutive dashes",
        }
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

fn is_lower_alphanumeric(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

/// Classifies `key`. The first rule violated wins.
pub fn validate_stream_key(key: &str) -> Validity {
    let chars: Vec<char> = key.chars().collect();
    let length = chars.len();
    if length < MIN_STREAM_KEY_LEN {
        return Validity::TooShort;
    }
    if length > MAX_STREAM_KEY_LEN {
        return Validity::TooLong;
    }

    let mut last_dash = None;
    for (i, &c) in chars.iter().enumerate() {
        if i == 0 {
            if !is_lower_alphanumeric(c) {
                return Validity::BadFirstChar;
            }
        } else if i == length - 1 {
            if !is_lower_alphanumeric(c) {
                return Validity::BadLastChar;
            }
        } else if c == '-' {
            if last_dash == Some(i - 1) {
                return Validity::ConsecutiveDashes;
            }
            last_dash = Some(i);
        } else if !is_lower_alphanumeric(c) {
            return Validity::BadChar;
        }
    }
    Validity::Valid
}
