//! Two-character node codes and their total order.
//!
//! A code is two symbols from [`CODEBASE`]; its value is
//! `index(first) * 36 + index(second)`, so `"AA"` is 0 and `"99"` is 1295.
//! Letters sort before digits, which is why `"AZ" < "A0"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Alphabet of a code symbol, in value order.
pub const CODEBASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const RADIX: u16 = 36;

/// Number of distinct codes (`36 * 36`).
pub const CODE_SPACE: u16 = RADIX * RADIX;

/// A validated node code, stored as its numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code(u16);

impl Code {
    /// Build a code from its numeric value. `None` outside the code space.
    pub fn from_value(value: u16) -> Option<Self> {
        (value < CODE_SPACE).then_some(Self(value))
    }

    pub fn value(self) -> u16 {
        self.0
    }
}

fn symbol_index(c: char) -> Option<u16> {
    CODEBASE.find(c).map(|i| i as u16)
}

fn symbol_at(index: u16) -> char {
    CODEBASE.as_bytes()[index as usize] as char
}

/// Numeric value of a textual code, or `None` if it is not two symbols
/// from the alphabet. Lowercase letters are accepted.
pub fn code_to_value(code: &str) -> Option<u16> {
    let mut chars = code.trim().chars().map(|c| c.to_ascii_uppercase());
    let hi = symbol_index(chars.next()?)?;
    let lo = symbol_index(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some(hi * RADIX + lo)
}

/// Textual code for a value, or `None` outside the code space.
pub fn value_to_code(value: u16) -> Option<String> {
    Code::from_value(value).map(|c| c.to_string())
}

/// True for values the record sources use to mean "no code".
pub fn is_empty_code(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || raw == "#N/A"
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", symbol_at(self.0 / RADIX), symbol_at(self.0 % RADIX))
    }
}

impl FromStr for Code {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        code_to_value(s)
            .map(Code)
            .ok_or_else(|| Error::InvalidCode(s.to_string()))
    }
}

impl TryFrom<String> for Code {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.to_string()
    }
}
