//! Protocol A wire tokens.
//!
//! Three shapes travel on the wire:
//!
//! ```text
//! 42            integer, plain decimal
//! 5Hhello       Hollerith string, byte count + 'H' + raw bytes
//! 2 {1 2}       array, element count + braced elements
//! ```
//!
//! A token encodes with no surrounding whitespace; whoever sequences tokens
//! supplies the separators.

use std::fmt;

/// A length-prefixed byte string.
///
/// The payload is sent verbatim, so it may hold spaces, newlines or
/// non-UTF-8 bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Hollerith(Vec<u8>);

impl Hollerith {
    /// Wraps raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Payload length in bytes, which is what the wire prefix carries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Payload as text, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.0.len().to_string().as_bytes());
        out.push(b'H');
        out.extend_from_slice(&self.0);
    }
}

impl From<&str> for Hollerith {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<String> for Hollerith {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl From<&[u8]> for Hollerith {
    fn from(value: &[u8]) -> Self {
        Self::new(value)
    }
}

impl From<Vec<u8>> for Hollerith {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

/// One typed value on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// Signed decimal integer.
    Integer(i64),
    /// Length-prefixed byte string.
    Hollerith(Hollerith),
    /// Ordered sequence of tokens; the count is derived from the elements.
    Array(Vec<Token>),
}

impl Token {
    /// Creates an integer token.
    pub fn integer(value: impl Into<i64>) -> Self {
        Self::Integer(value.into())
    }

    /// Creates a Hollerith token from text or bytes.
    pub fn hollerith(bytes: impl Into<Hollerith>) -> Self {
        Self::Hollerith(bytes.into())
    }

    /// Creates an array token.
    pub fn array(items: impl IntoIterator<Item = Token>) -> Self {
        Self::Array(items.into_iter().collect())
    }

    /// Integer value, if this is an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Hollerith payload, if this is a Hollerith string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Hollerith(h) => Some(h.as_bytes()),
            _ => None,
        }
    }

    /// Array elements, if this is an array.
    pub fn as_array(&self) -> Option<&[Token]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the exact wire bytes for this token.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }

    /// Appends the wire bytes for this token to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Self::Integer(value) => out.extend_from_slice(value.to_string().as_bytes()),
            Self::Hollerith(h) => h.write_to(out),
            Self::Array(items) => {
                out.extend_from_slice(items.len().to_string().as_bytes());
                out.extend_from_slice(b" {");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b' ');
                    }
                    item.write_to(out);
                }
                out.push(b'}');
            }
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.encode()))
    }
}

impl From<i64> for Token {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Token {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<bool> for Token {
    fn from(value: bool) -> Self {
        Self::Integer(value.into())
    }
}

impl From<Hollerith> for Token {
    fn from(value: Hollerith) -> Self {
        Self::Hollerith(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self::hollerith(value)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self::hollerith(value)
    }
}

impl From<&[u8]> for Token {
    fn from(value: &[u8]) -> Self {
        Self::hollerith(value)
    }
}

impl From<Vec<u8>> for Token {
    fn from(value: Vec<u8>) -> Self {
        Self::hollerith(value)
    }
}

impl From<Vec<Token>> for Token {
    fn from(value: Vec<Token>) -> Self {
        Self::Array(value)
    }
}
