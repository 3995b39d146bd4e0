use bytes::{Bytes, BytesMut};

use crate::proto::error::{Error, Result};
use crate::proto::frame::Frame;

const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024; // 512 MB default

/// Deepest array nesting accepted in a reply.
const MAX_NESTING_DEPTH: usize = 64;

/// An incremental RESP decoder.
///
/// Call [`append`](Decoder::append) with bytes read from the socket, then
/// [`decode`](Decoder::decode) until it returns `Ok(None)`. Bytes are only
/// consumed once a whole frame (including every element of an array) is
/// buffered, so a reply split across reads is never lost.
///
/// Completeness is checked by a scan that resumes where the previous call
/// stopped; frames are only built once the scan reaches the end of a frame,
/// so a large reply arriving in many reads is walked once.
///
/// # Example
///
/// ```
/// use dataplane::proto::codec::Decoder;
/// use dataplane::proto::frame::Frame;
///
/// let mut decoder = Decoder::new();
/// decoder.append(b"+OK\r\n");
/// let frame = decoder.decode().unwrap().unwrap();
/// assert_eq!(frame, Frame::SimpleString(b"OK".to_vec()));
/// ```
#[derive(Debug)]
pub struct Decoder {
    buf: BytesMut,
    max_frame_size: usize,
    scan: Scan,
}

/// Progress of the completeness scan over the frame at the head of `buf`.
#[derive(Debug, Default)]
struct Scan {
    /// Offset of the next header to examine.
    pos: usize,
    /// Elements still expected by each open array, innermost last.
    open: Vec<usize>,
}

impl Decoder {
    /// Creates a new decoder with an empty buffer.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Creates a new decoder with a custom maximum frame size in bytes.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_frame_size,
            scan: Scan::default(),
        }
    }

    /// Appends raw bytes received from the network.
    pub fn append(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Buffer to read socket data into directly, with room for at least
    /// `additional` more bytes.
    pub(crate) fn read_buffer(&mut self, additional: usize) -> &mut BytesMut {
        self.buf.reserve(additional);
        &mut self.buf
    }

    /// Number of buffered bytes that have not been decoded yet.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Attempts to decode one frame.
    ///
    /// Returns `Ok(None)` if more data is needed and
    /// [`Error::Protocol`] if the data is malformed.
    pub fn decode(&mut self) -> Result<Option<Frame>> {
        if self.buf.is_empty() {
            return Ok(None);
        }

        if self.buf.len() > self.max_frame_size {
            return Err(protocol("buffer size exceeded maximum frame size"));
        }

        let end = match self.scan() {
            Ok(Some(end)) => end,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.scan = Scan::default();
                return Err(e);
            }
        };
        self.scan = Scan::default();

        let frame = self.buf.split_to(end).freeze();
        let (parsed, consumed) = build(&frame, 0)?;
        debug_assert_eq!(consumed, end);
        Ok(Some(parsed))
    }

    /// Advances the completeness scan as far as the buffered bytes allow.
    ///
    /// Returns the length of the head frame once all of it is buffered.
    fn scan(&mut self) -> Result<Option<usize>> {
        loop {
            let pos = self.scan.pos;
            let Some(&tag) = self.buf.get(pos) else {
                return Ok(None);
            };
            let Some(end) = find_crlf(&self.buf, pos + 1) else {
                return Ok(None);
            };
            let line = &self.buf[pos + 1..end];
            let next = end + 2;

            let after = match tag {
                b'+' | b'-' => next,
                b':' => {
                    parse_int(line)?;
                    next
                }
                b'$' => {
                    let len = parse_int(line)?;
                    if len == -1 {
                        next
                    } else {
                        let len = usize::try_from(len)
                            .map_err(|_| protocol("negative bulk string length"))?;
                        if len > self.max_frame_size {
                            return Err(protocol(
                                "bulk string length exceeds maximum frame size",
                            ));
                        }
                        if self.buf.len() < next + len + 2 {
                            return Ok(None);
                        }
                        if &self.buf[next + len..next + len + 2] != b"\r\n" {
                            return Err(protocol("bulk string missing terminator"));
                        }
                        next + len + 2
                    }
                }
                b'*' => {
                    let len = parse_int(line)?;
                    if len != -1 {
                        let len = usize::try_from(len)
                            .map_err(|_| protocol("negative array length"))?;
                        // Assume minimum 16 bytes per item
                        if len > self.max_frame_size / 16 {
                            return Err(protocol("array length exceeds reasonable maximum"));
                        }
                        if len > 0 {
                            if self.scan.open.len() >= MAX_NESTING_DEPTH {
                                return Err(protocol("array nesting exceeds maximum depth"));
                            }
                            self.scan.open.push(len);
                            self.scan.pos = next;
                            continue;
                        }
                    }
                    next
                }
                other => {
                    return Err(protocol(&format!("unknown frame type: {}", other as char)))
                }
            };

            self.scan.pos = after;
            // A finished element may in turn finish its enclosing arrays.
            while let Some(remaining) = self.scan.open.last_mut() {
                *remaining -= 1;
                if *remaining > 0 {
                    break;
                }
                self.scan.open.pop();
            }
            if self.scan.open.is_empty() {
                return Ok(Some(after));
            }
        }
    }
}

/// Builds the frame starting at `pos` from a buffer already known to hold
/// it completely. Returns the frame and the offset just past it.
fn build(buf: &Bytes, pos: usize) -> Result<(Frame, usize)> {
    let tag = *buf.get(pos).ok_or_else(truncated)?;
    let end = find_crlf(buf, pos + 1).ok_or_else(truncated)?;
    let line = &buf[pos + 1..end];
    let next = end + 2;

    let parsed = match tag {
        b'+' => (Frame::SimpleString(line.to_vec()), next),
        b'-' => (Frame::Error(line.to_vec()), next),
        b':' => (Frame::Integer(parse_int(line)?), next),
        b'$' => match parse_int(line)? {
            -1 => (Frame::BulkString(None), next),
            len => {
                let len = usize::try_from(len).map_err(|_| truncated())?;
                let data = buf.slice(next..next + len);
                (Frame::BulkString(Some(data)), next + len + 2)
            }
        },
        b'*' => match parse_int(line)? {
            -1 => (Frame::Null, next),
            len => {
                let len = usize::try_from(len).map_err(|_| truncated())?;
                let mut items = Vec::with_capacity(len);
                let mut cursor = next;
                for _ in 0..len {
                    let (item, after) = build(buf, cursor)?;
                    items.push(item);
                    cursor = after;
                }
                (Frame::Array(items), cursor)
            }
        },
        other => return Err(protocol(&format!("unknown frame type: {}", other as char))),
    };

    Ok(parsed)
}

/// Returns the index of the next `\r` of a CRLF pair at or after `from`.
fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|i| from + i)
}

fn truncated() -> Error {
    protocol("frame truncated after scan")
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_int(line: &[u8]) -> Result<i64> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| protocol("invalid integer"))
}

fn protocol(message: &str) -> Error {
    Error::Protocol {
        message: message.to_string(),
    }
}
