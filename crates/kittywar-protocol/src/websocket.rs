//! RFC 6455 framing for WebSocket clients.
//!
//! Only what the game needs is implemented: binary data frames, fragmented
//! messages, and the close frame. The upgrade handshake lives in the
//! transport crate; by the time these functions run the stream is already
//! speaking frames.

use tokio::io::AsyncRead;

use crate::raw::read_or_eof;
use crate::{MAX_MESSAGE_LEN, Message, ProtocolError, Response, TOKEN_LEN, Token};

/// Minimum payload of the first frame of a message: flag + token.
pub const MIN_PAYLOAD_LEN: usize = 1 + TOKEN_LEN;

const OPCODE_CONTINUATION: u8 = 0x0;
const OPCODE_BINARY: u8 = 0x2;
const OPCODE_CLOSE: u8 = 0x8;

/// One decoded frame, already unmasked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub opcode: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    fn is_control(&self) -> bool {
        self.opcode & 0x8 != 0
    }
}

/// Reads a single frame.
///
/// `Ok(None)` means the stream ended. The announced length is checked
/// against `budget` before anything is allocated.
pub async fn read_frame<R>(reader: &mut R, budget: u64) -> Result<Option<Frame>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut head = [0u8; 2];
    if !read_or_eof(reader, &mut head).await? {
        return Ok(None);
    }
    let fin = head[0] & 0x80 != 0;
    let opcode = head[0] & 0x0F;
    let masked = head[1] & 0x80 != 0;

    let len = match head[1] & 0x7F {
        126 => {
            let mut ext = [0u8; 2];
            if !read_or_eof(reader, &mut ext).await? {
                return Ok(None);
            }
            u64::from(u16::from_be_bytes(ext))
        }
        127 => {
            let mut ext = [0u8; 8];
            if !read_or_eof(reader, &mut ext).await? {
                return Ok(None);
            }
            u64::from_be_bytes(ext)
        }
        short => u64::from(short),
    };
    if len > budget {
        return Err(ProtocolError::FrameTooLarge(len));
    }

    let mut mask = [0u8; 4];
    if masked && !read_or_eof(reader, &mut mask).await? {
        return Ok(None);
    }

    // `len <= budget <= MAX_MESSAGE_LEN`, which fits in usize.
    let mut payload = vec![0u8; len as usize];
    if !read_or_eof(reader, &mut payload).await? {
        return Ok(None);
    }
    if masked {
        apply_mask(&mut payload, mask);
    }

    Ok(Some(Frame { fin, opcode, payload }))
}

/// Reads frames until one with FIN set and decodes the joined payload.
///
/// Returns `Ok(None)` for a close frame, end of stream, or a first frame
/// too short to hold a flag and token. The session treats all three as a
/// disconnect. Ping and pong frames between fragments are skipped.
///
/// The 25-byte minimum applies to the decoded payload of the first data
/// frame only. Continuation frames may be any length, since the flag and
/// token have already arrived by then.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Message>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut payload: Vec<u8> = Vec::new();
    let mut first = true;

    loop {
        let budget = MAX_MESSAGE_LEN - payload.len() as u64;
        let Some(frame) = read_frame(reader, budget).await? else {
            return Ok(None);
        };

        if frame.opcode == OPCODE_CLOSE {
            return Ok(None);
        }
        if frame.is_control() {
            continue;
        }
        if first && frame.payload.len() < MIN_PAYLOAD_LEN {
            return Ok(None);
        }
        first = false;

        payload.extend_from_slice(&frame.payload);
        if frame.fin {
            break;
        }
    }

    decode_payload(&payload).map(Some)
}

/// Splits an unmasked payload into `flag | token | body`.
///
/// # Errors
/// [`ProtocolError::Truncated`] if the payload is shorter than 25 bytes,
/// [`ProtocolError::InvalidToken`] if the token is not ASCII.
pub fn decode_payload(payload: &[u8]) -> Result<Message, ProtocolError> {
    if payload.len() < MIN_PAYLOAD_LEN {
        return Err(ProtocolError::Truncated(payload.len()));
    }
    let mut token = [0u8; TOKEN_LEN];
    token.copy_from_slice(&payload[1..MIN_PAYLOAD_LEN]);
    let rest = &payload[MIN_PAYLOAD_LEN..];

    Ok(Message {
        flag: payload[0],
        token: Token::from_bytes(token)?,
        body: (!rest.is_empty()).then(|| rest.to_vec()),
    })
}

/// Writes one final binary frame.
///
/// Server frames pass `mask: None`. Clients must mask, so tests pass a key.
pub fn write_frame(payload: &[u8], mask: Option<[u8; 4]>) -> Vec<u8> {
    let len = payload.len();
    let mut out = Vec::with_capacity(len + 14);
    out.push(0x80 | OPCODE_BINARY);

    let mask_bit = if mask.is_some() { 0x80 } else { 0x00 };
    if len < 126 {
        out.push(mask_bit | len as u8);
    } else if len <= usize::from(u16::MAX) {
        out.push(mask_bit | 126);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(mask_bit | 127);
        out.extend_from_slice(&(len as u64).to_be_bytes());
    }

    match mask {
        Some(key) => {
            out.extend_from_slice(&key);
            let start = out.len();
            out.extend_from_slice(payload);
            apply_mask(&mut out[start..], key);
        }
        None => out.extend_from_slice(payload),
    }
    out
}

/// Encodes a server response as one unmasked frame whose payload is the
/// flag byte followed by the body.
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut payload = Vec::with_capacity(1 + response.body.len());
    payload.push(u8::from(response.flag));
    response.body.write_to(&mut payload);
    write_frame(&payload, None)
}

/// Encodes a client request as one masked frame.
pub fn encode_message(message: &Message, mask: [u8; 4]) -> Vec<u8> {
    let body = message.body.as_deref().unwrap_or_default();
    let mut payload = Vec::with_capacity(MIN_PAYLOAD_LEN + body.len());
    payload.push(message.flag);
    payload.extend_from_slice(message.token.as_bytes());
    payload.extend_from_slice(body);
    write_frame(&payload, Some(mask))
}

/// A close frame with no status code.
pub fn close_frame() -> Vec<u8> {
    vec![0x80 | OPCODE_CLOSE, 0x00]
}

fn apply_mask(bytes: &mut [u8], key: [u8; 4]) {
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}
