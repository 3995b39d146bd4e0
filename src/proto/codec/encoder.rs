use bytes::{BufMut, Bytes, BytesMut};

use crate::proto::frame::Frame;

/// A RESP encoder that accumulates frames and commands in a write buffer.
///
/// Commands are queued with [`encode_command`](Encoder::encode_command) and
/// handed to the socket in one piece with [`take`](Encoder::take), which is
/// what lets a pipeline go out in a single write.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use dataplane::proto::codec::Encoder;
///
/// let mut encoder = Encoder::new();
/// encoder.encode_command(&[Bytes::from("PING")]);
/// assert_eq!(encoder.take().as_ref(), b"*1\r\n$4\r\nPING\r\n");
/// ```
#[derive(Debug, Default)]
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    /// Creates a new encoder with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command as an array of bulk strings.
    pub fn encode_command(&mut self, args: &[Bytes]) {
        self.put_header(b'*', args.len());
        for arg in args {
            self.put_bulk(arg);
        }
    }

    /// Appends an arbitrary frame. Servers and tests use this for replies.
    pub fn encode(&mut self, frame: &Frame) {
        match frame {
            Frame::SimpleString(s) => self.put_line(b'+', s),
            Frame::Error(e) => self.put_line(b'-', e),
            Frame::Integer(n) => self.put_line(b':', n.to_string().as_bytes()),
            Frame::BulkString(Some(data)) => self.put_bulk(data),
            Frame::BulkString(None) | Frame::Null => self.buf.extend_from_slice(b"$-1\r\n"),
            Frame::Array(items) => {
                self.put_header(b'*', items.len());
                for item in items {
                    self.encode(item);
                }
            }
        }
    }

    /// Number of buffered bytes not yet taken.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Takes the encoded data, leaving the encoder empty and reusable.
    pub fn take(&mut self) -> BytesMut {
        self.buf.split()
    }

    fn put_header(&mut self, prefix: u8, len: usize) {
        self.put_line(prefix, len.to_string().as_bytes());
    }

    fn put_line(&mut self, prefix: u8, body: &[u8]) {
        self.buf.reserve(body.len() + 3);
        self.buf.put_u8(prefix);
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\r\n");
    }

    fn put_bulk(&mut self, data: &[u8]) {
        self.put_header(b'$', data.len());
        self.buf.reserve(data.len() + 2);
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\r\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_command() {
        let mut encoder = Encoder::new();
        encoder.encode_command(&[Bytes::from("SET"), Bytes::from("k"), Bytes::from("v")]);
        assert_eq!(
            encoder.take().as_ref(),
            b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n"
        );
        assert!(encoder.is_empty());
    }

    #[test]
    fn test_encode_commands_accumulate() {
        let mut encoder = Encoder::new();
        encoder.encode_command(&[Bytes::from("DEL"), Bytes::from("a")]);
        encoder.encode_command(&[Bytes::from("DEL"), Bytes::from("b")]);
        assert_eq!(
            encoder.take().as_ref(),
            b"*2\r\n$3\r\nDEL\r\n$1\r\na\r\n*2\r\n$3\r\nDEL\r\n$1\r\nb\r\n"
        );
    }

    #[test]
    fn test_encode_binary_bulk() {
        let mut encoder = Encoder::new();
        encoder.encode(&Frame::bulk(Bytes::from_static(b"a\r\nb")));
        assert_eq!(encoder.take().as_ref(), b"$4\r\na\r\nb\r\n");
    }

    #[test]
    fn test_encode_reply_frames() {
        let mut encoder = Encoder::new();
        encoder.encode(&Frame::simple("OK"));
        encoder.encode(&Frame::error("ERR bad"));
        encoder.encode(&Frame::Integer(-7));
        encoder.encode(&Frame::Null);
        assert_eq!(
            encoder.take().as_ref(),
            b"+OK\r\n-ERR bad\r\n:-7\r\n$-1\r\n"
        );
    }

    #[test]
    fn test_encode_nested_array() {
        let mut encoder = Encoder::new();
        encoder.encode(&Frame::Array(vec![
            Frame::bulk("x"),
            Frame::Array(vec![Frame::Integer(1)]),
        ]));
        assert_eq!(encoder.take().as_ref(), b"*2\r\n$1\r\nx\r\n*1\r\n:1\r\n");
    }
}
