//! Raw-TCP framing.
//!
//! Request: `flag(1) | token(24) | length(3, big-endian) | body(length)`.
//! Response: `flag(1) | length(3, big-endian) | body(length)`.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Message, ProtocolError, Response, Token, TOKEN_LEN};

/// Size of a request header: flag + token + 3-byte length.
pub const REQUEST_HEADER_LEN: usize = 1 + TOKEN_LEN + 3;

/// Largest body a 3-byte length can describe.
pub const MAX_BODY_LEN: usize = 0x00FF_FFFF;

/// Reads one request from a raw-TCP stream.
///
/// Returns `Ok(None)` when the peer closes the stream, whether that happens
/// at a message boundary or halfway through a frame.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Message>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; REQUEST_HEADER_LEN];
    if !read_or_eof(reader, &mut header).await? {
        return Ok(None);
    }

    let flag = header[0];
    let mut token = [0u8; TOKEN_LEN];
    token.copy_from_slice(&header[1..1 + TOKEN_LEN]);
    let token = Token::from_bytes(token)?;
    let len = read_u24(&header[1 + TOKEN_LEN..]);

    let body = if len > 0 {
        let mut body = vec![0u8; len];
        if !read_or_eof(reader, &mut body).await? {
            return Ok(None);
        }
        Some(body)
    } else {
        None
    };

    Ok(Some(Message { flag, token, body }))
}

/// Encodes a server response.
///
/// # Errors
/// Returns [`ProtocolError::BodyTooLarge`] if the body does not fit in
/// three length bytes.
pub fn encode_response(response: &Response) -> Result<Vec<u8>, ProtocolError> {
    let len = response.body.len();
    if len > MAX_BODY_LEN {
        return Err(ProtocolError::BodyTooLarge(len));
    }
    let mut out = Vec::with_capacity(4 + len);
    out.push(u8::from(response.flag));
    out.extend_from_slice(&write_u24(len));
    response.body.write_to(&mut out);
    Ok(out)
}

/// Encodes a client request. Used by clients and tests.
pub fn encode_message(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    let body = message.body.as_deref().unwrap_or_default();
    if body.len() > MAX_BODY_LEN {
        return Err(ProtocolError::BodyTooLarge(body.len()));
    }
    let mut out = Vec::with_capacity(REQUEST_HEADER_LEN + body.len());
    out.push(message.flag);
    out.extend_from_slice(message.token.as_bytes());
    out.extend_from_slice(&write_u24(body.len()));
    out.extend_from_slice(body);
    Ok(out)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fills `buf` completely. `Ok(false)` means the stream ended first.
pub(crate) async fn read_or_eof<R>(reader: &mut R, buf: &mut [u8]) -> Result<bool, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn read_u24(bytes: &[u8]) -> usize {
    (usize::from(bytes[0]) << 16) | (usize::from(bytes[1]) << 8) | usize::from(bytes[2])
}

fn write_u24(len: usize) -> [u8; 3] {
    [(len >> 16) as u8, (len >> 8) as u8, len as u8]
}
