//! Server side of the HTTP/1.1 WebSocket upgrade.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;

use crate::TransportError;

/// Upper bound on the size of the upgrade request, headers included.
const MAX_REQUEST_LEN: u64 = 8 * 1024;

/// Reads the client's upgrade request and answers with `101 Switching
/// Protocols`.
///
/// Bytes after the blank line that ends the request stay in `reader`, so
/// a client that pipelines its first frame loses nothing.
pub async fn accept<R, W>(reader: &mut R, writer: &mut W) -> Result<(), TransportError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let key = read_request(reader).await?;
    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\r\n",
        derive_accept_key(key.as_bytes())
    );
    writer
        .write_all(response.as_bytes())
        .await
        .map_err(TransportError::SendFailed)?;
    writer.flush().await.map_err(TransportError::SendFailed)?;
    Ok(())
}

/// Parses the request line and headers, returning `Sec-WebSocket-Key`.
async fn read_request<R>(reader: &mut R) -> Result<String, TransportError>
where
    R: AsyncBufRead + Unpin,
{
    let mut limited = reader.take(MAX_REQUEST_LEN);
    let mut key = None;
    let mut first = true;

    loop {
        let mut line = Vec::new();
        let n = limited
            .read_until(b'\n', &mut line)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 || line.last() != Some(&b'\n') {
            return Err(TransportError::Handshake(
                "request ended before the blank line".into(),
            ));
        }

        let line = String::from_utf8_lossy(&line);
        let line = line.trim_end_matches(['\r', '\n']);

        if first {
            if !line.starts_with("GET ") {
                return Err(TransportError::Handshake(format!(
                    "unexpected request line {line:?}"
                )));
            }
            first = false;
            continue;
        }
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("sec-websocket-key") {
                key = Some(value.trim().to_owned());
            }
        }
    }

    key.ok_or_else(|| TransportError::Handshake("missing Sec-WebSocket-Key".into()))
}
