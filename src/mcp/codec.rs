//! Line-delimited JSON wire codec
//!
//! Every message is one JSON object followed by a single `\n`:
//! ```text
//! {"jsonrpc":"2.0","id":1,"method":"tools/list","params":{}}\n
//! ```

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::Error;

/// Largest line we are willing to buffer (16 MiB)
pub const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Read one message line from the stream
///
/// Returns the line without its terminator. EOF before any byte is read
/// means the server has gone away.
pub async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String, Error> {
    let mut line = String::new();
    let bytes_read = reader.read_line(&mut line).await.map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::ServerClosed
        } else {
            Error::Io(e)
        }
    })?;

    if bytes_read == 0 {
        return Err(Error::ServerClosed);
    }

    if line.len() > MAX_LINE_BYTES {
        return Err(Error::Protocol(format!(
            "Response line too large: {} bytes",
            line.len()
        )));
    }

    let trimmed = line.trim_end_matches(['\r', '\n']);
    Ok(trimmed.to_string())
}

/// Write one message line to the stream and flush it
pub async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, json: &str) -> Result<(), Error> {
    if json.contains('\n') {
        return Err(Error::Protocol(
            "Message must not contain a raw newline".to_string(),
        ));
    }

    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_read_line() {
        let data = b"{\"result\":{}}\n{\"id\":2}\n";
        let mut reader = BufReader::new(Cursor::new(data.to_vec()));

        assert_eq!(read_line(&mut reader).await.unwrap(), "{\"result\":{}}");
        assert_eq!(read_line(&mut reader).await.unwrap(), "{\"id\":2}");
        assert!(matches!(
            read_line(&mut reader).await,
            Err(Error::ServerClosed)
        ));
    }

    #[tokio::test]
    async fn test_read_line_crlf() {
        let data = b"{\"result\":{}}\r\n";
        let mut reader = BufReader::new(Cursor::new(data.to_vec()));

        assert_eq!(read_line(&mut reader).await.unwrap(), "{\"result\":{}}");
    }

    #[tokio::test]
    async fn test_read_line_without_terminator_at_eof() {
        let data = b"{\"result\":{}}";
        let mut reader = BufReader::new(Cursor::new(data.to_vec()));

        assert_eq!(read_line(&mut reader).await.unwrap(), "{\"result\":{}}");
    }

    #[tokio::test]
    async fn test_write_line() {
        let mut output = Vec::new();
        write_line(&mut output, "{\"test\":true}").await.unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), "{\"test\":true}\n");
    }

    #[tokio::test]
    async fn test_write_line_rejects_embedded_newline() {
        let mut output = Vec::new();
        let err = write_line(&mut output, "{\n}").await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(output.is_empty());
    }
}
