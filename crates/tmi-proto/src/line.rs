//! Line-based codec for tokio.
//!
//! Reads LF-terminated lines (CR optional) and writes lines with CRLF
//! appended.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};

/// Twitch tag blocks push lines well past the classic 512 bytes.
pub const DEFAULT_MAX_LEN: usize = 8192;

/// Codec for newline-terminated UTF-8 lines.
#[derive(Debug)]
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    max_len: usize,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LineCodec {
    /// Codec with [`DEFAULT_MAX_LEN`].
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LEN)
    }

    /// Codec with a custom maximum line length in bytes.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(ProtocolError::LineTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            let data = std::str::from_utf8(&line).map_err(|e| ProtocolError::InvalidUtf8 {
                byte_pos: e.valid_up_to(),
                details: e.to_string(),
            })?;

            Ok(Some(data.trim_end_matches(['\r', '\n']).to_owned()))
        } else {
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(ProtocolError::LineTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }

            Ok(None)
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            None if src.is_empty() => Ok(None),
            None => {
                // unterminated final line, e.g. a control frame closed by EOF
                let rest = src.split_to(src.len());
                self.next_index = 0;
                let data = std::str::from_utf8(&rest).map_err(|e| ProtocolError::InvalidUtf8 {
                    byte_pos: e.valid_up_to(),
                    details: e.to_string(),
                })?;
                Ok(Some(data.trim_end_matches('\r').to_owned()))
            }
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> error::Result<()> {
        let line = line.trim_end_matches(['\r', '\n']);
        dst.reserve(line.len() + 2);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_complete_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("PING :tmi.twitch.tv\r\n");

        let result = codec.decode(&mut buf).unwrap();
        assert_eq!(result.as_deref(), Some("PING :tmi.twitch.tv"));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_partial_then_rest() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("PING :");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"x\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PING :x"));
    }

    #[test]
    fn test_decode_too_long() {
        let mut codec = LineCodec::with_max_len(10);
        let mut buf = BytesMut::from("this is way too long\n");
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::LineTooLong { .. })
        ));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"ab\xff\n"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::InvalidUtf8 { byte_pos: 2, .. })
        ));
    }

    #[test]
    fn test_decode_eof_unterminated() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("c1 REFRESH_DATA");
        assert_eq!(
            codec.decode_eof(&mut buf).unwrap().as_deref(),
            Some("c1 REFRESH_DATA")
        );
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_encode_appends_crlf() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();
        codec.encode("PONG :x".to_string(), &mut buf).unwrap();
        codec.encode("NICK bot\r\n".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"PONG :x\r\nNICK bot\r\n");
    }
}
