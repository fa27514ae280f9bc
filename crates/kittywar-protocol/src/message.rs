//! Message types: what a client sends (`Message`) and what the server sends
//! back (`Response`).
//!
//! Both wire variants share the same logical shapes. Only the framing
//! around them differs, which is the codec's business.

use std::fmt;

use crate::{Flag, ProtocolError, ResultCode};

/// Length of the token field in every request.
pub const TOKEN_LEN: usize = 24;

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// The 24-byte ASCII identifier carried by every request.
///
/// Clients that have not logged in yet still send the field (usually
/// zero-filled), so any ASCII content is accepted here; whether it matches
/// the user's stored token is decided by the session layer.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token([u8; TOKEN_LEN]);

impl Token {
    /// Builds a token from its raw bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidToken`] if any byte is not ASCII.
    pub fn from_bytes(bytes: [u8; TOKEN_LEN]) -> Result<Self, ProtocolError> {
        if !bytes.is_ascii() {
            return Err(ProtocolError::InvalidToken);
        }
        Ok(Self(bytes))
    }

    /// Builds a token from a string, right-padding with NUL bytes or
    /// truncating to 24 bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidToken`] if the string is not ASCII.
    pub fn from_str_padded(token: &str) -> Result<Self, ProtocolError> {
        let mut bytes = [0u8; TOKEN_LEN];
        for (slot, byte) in bytes.iter_mut().zip(token.bytes()) {
            *slot = byte;
        }
        Self::from_bytes(bytes)
    }

    /// Returns the raw 24 bytes.
    pub fn as_bytes(&self) -> &[u8; TOKEN_LEN] {
        &self.0
    }

    /// Returns the token as text with trailing NUL padding stripped.
    pub fn as_str(&self) -> &str {
        let end = self.0.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        // ASCII was checked on construction, so this cannot fail.
        std::str::from_utf8(&self.0[..end]).unwrap_or_default()
    }
}

impl Default for Token {
    fn default() -> Self {
        Self([0u8; TOKEN_LEN])
    }
}

/// Tokens are credentials, so `Debug` never prints them in full.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.as_str();
        let shown: String = text.chars().take(4).collect();
        write!(f, "Token({shown}…)")
    }
}

// ---------------------------------------------------------------------------
// Message (client → server)
// ---------------------------------------------------------------------------

/// A decoded client request. Immutable once decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The raw flag byte. The session maps it to a [`Flag`] and kills the
    /// connection if that fails.
    pub flag: u8,
    /// The client's auth token.
    pub token: Token,
    /// Optional body, normally UTF-8 text (a username or a decimal id).
    pub body: Option<Vec<u8>>,
}

impl Message {
    /// Convenience constructor used by clients and tests.
    pub fn new(flag: Flag, token: Token, body: Option<&str>) -> Self {
        Self {
            flag: flag.into(),
            token,
            body: body.map(|b| b.as_bytes().to_vec()),
        }
    }

    /// The body as UTF-8 text, if present and valid.
    pub fn body_str(&self) -> Option<&str> {
        self.body
            .as_deref()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    /// The body parsed as a decimal integer (`"2"` → `2`).
    ///
    /// Returns `None` for a missing or non-numeric body.
    pub fn body_int(&self) -> Option<i64> {
        self.body_str().and_then(|s| s.trim().parse().ok())
    }
}

// ---------------------------------------------------------------------------
// Response (server → client)
// ---------------------------------------------------------------------------

/// The body of a server response.
///
/// The wire length follows from the variant: a single byte counts as 1, a
/// byte list counts its elements (the chance-card list is sent this way),
/// and text counts its UTF-8 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Empty,
    Byte(u8),
    Bytes(Vec<u8>),
    Text(String),
}

impl Body {
    /// Number of body bytes that follow the header.
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Byte(_) => 1,
            Self::Bytes(bytes) => bytes.len(),
            Self::Text(text) => text.len(),
        }
    }

    /// Returns `true` for a zero-length body.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends the body bytes to `out`.
    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Self::Empty => {}
            Self::Byte(b) => out.push(*b),
            Self::Bytes(bytes) => out.extend_from_slice(bytes),
            Self::Text(text) => out.extend_from_slice(text.as_bytes()),
        }
    }
}

/// A server response: one flag plus a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub flag: Flag,
    pub body: Body,
}

impl Response {
    /// A header-only response (zero-length body).
    pub fn empty(flag: Flag) -> Self {
        Self { flag, body: Body::Empty }
    }

    /// A response carrying one raw byte.
    pub fn byte(flag: Flag, value: u8) -> Self {
        Self { flag, body: Body::Byte(value) }
    }

    /// A response carrying a result code.
    pub fn result(flag: Flag, code: ResultCode) -> Self {
        Self::byte(flag, code.into())
    }

    /// A response carrying a list of raw bytes.
    pub fn bytes(flag: Flag, values: Vec<u8>) -> Self {
        Self { flag, body: Body::Bytes(values) }
    }

    /// A response carrying UTF-8 text.
    pub fn text(flag: Flag, text: impl Into<String>) -> Self {
        Self { flag, body: Body::Text(text.into()) }
    }
}
