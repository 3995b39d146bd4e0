//! Conversions from raw reply frames to the types callers ask for.
//!
//! Error frames always become [`Error::Server`]. A reply of the wrong shape
//! or with unparsable content becomes [`Error::TypeConversion`], and nil
//! becomes [`Error::Nil`] wherever a value is required.

use std::collections::HashMap;

use bytes::Bytes;

use crate::proto::frame::Frame;
use crate::{Error, Result};

fn server(e: &[u8]) -> Error {
    Error::Server {
        message: String::from_utf8_lossy(e).into_owned(),
    }
}

fn conversion(target: &'static str, frame: &Frame) -> Error {
    let value = match frame {
        Frame::SimpleString(s) => String::from_utf8_lossy(s).into_owned(),
        Frame::BulkString(Some(b)) => String::from_utf8_lossy(b).into_owned(),
        Frame::Integer(i) => i.to_string(),
        other => other.kind().to_string(),
    };
    Error::TypeConversion { target, value }
}

/// Passes the frame through unless it is an error reply.
#[inline]
pub fn check(frame: Frame) -> Result<Frame> {
    match frame {
        Frame::Error(e) => Err(server(&e)),
        other => Ok(other),
    }
}

/// Accepts any non-error reply.
#[inline]
pub fn to_unit(frame: Frame) -> Result<()> {
    check(frame).map(|_| ())
}

/// Converts a frame to bytes, `None` for nil.
#[inline]
pub fn to_bytes(frame: Frame) -> Result<Option<Bytes>> {
    match frame {
        Frame::BulkString(b) => Ok(b),
        Frame::Null => Ok(None),
        Frame::SimpleString(s) => Ok(Some(Bytes::from(s))),
        Frame::Error(e) => Err(server(&e)),
        other => Err(conversion("bytes", &other)),
    }
}

/// Converts a frame to a 64-bit integer, parsing bulk strings.
#[inline]
pub fn to_i64(frame: Frame) -> Result<i64> {
    match frame {
        Frame::Integer(i) => Ok(i),
        Frame::BulkString(Some(ref b)) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| conversion("i64", &frame)),
        Frame::BulkString(None) | Frame::Null => Err(Error::Nil),
        Frame::Error(e) => Err(server(&e)),
        other => Err(conversion("i64", &other)),
    }
}

/// Converts a frame to a 32-bit integer, rejecting out-of-range values.
#[inline]
pub fn to_i32(frame: Frame) -> Result<i32> {
    let n = to_i64(frame)?;
    i32::try_from(n).map_err(|_| Error::TypeConversion {
        target: "i32",
        value: n.to_string(),
    })
}

/// Converts a frame to a float.
#[inline]
pub fn to_f64(frame: Frame) -> Result<f64> {
    match frame {
        Frame::Integer(i) => Ok(i as f64),
        Frame::BulkString(Some(ref b)) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| conversion("f64", &frame)),
        Frame::BulkString(None) | Frame::Null => Err(Error::Nil),
        Frame::Error(e) => Err(server(&e)),
        other => Err(conversion("f64", &other)),
    }
}

/// Converts a frame to a UTF-8 string.
#[inline]
pub fn to_string(frame: Frame) -> Result<String> {
    match frame {
        Frame::SimpleString(s) => {
            String::from_utf8(s).map_err(|e| Error::TypeConversion {
                target: "string",
                value: String::from_utf8_lossy(e.as_bytes()).into_owned(),
            })
        }
        Frame::BulkString(Some(b)) => match std::str::from_utf8(&b) {
            Ok(s) => Ok(s.to_owned()),
            Err(_) => Err(Error::TypeConversion {
                target: "string",
                value: String::from_utf8_lossy(&b).into_owned(),
            }),
        },
        Frame::Integer(i) => Ok(i.to_string()),
        Frame::BulkString(None) | Frame::Null => Err(Error::Nil),
        Frame::Error(e) => Err(server(&e)),
        other => Err(conversion("string", &other)),
    }
}

/// Converts a frame to a boolean: integers are true when non-zero.
#[inline]
pub fn to_bool(frame: Frame) -> Result<bool> {
    match frame {
        Frame::Integer(i) => Ok(i != 0),
        Frame::BulkString(Some(ref b)) => match b.as_ref() {
            b"1" | b"true" => Ok(true),
            b"0" | b"false" => Ok(false),
            _ => Err(conversion("bool", &frame)),
        },
        Frame::BulkString(None) | Frame::Null => Err(Error::Nil),
        Frame::Error(e) => Err(server(&e)),
        other => Err(conversion("bool", &other)),
    }
}

fn to_array(frame: Frame, target: &'static str) -> Result<Vec<Frame>> {
    match frame {
        Frame::Array(items) => Ok(items),
        Frame::Null => Ok(Vec::new()),
        Frame::Error(e) => Err(server(&e)),
        other => Err(conversion(target, &other)),
    }
}

/// Converts an array reply to a vector of optional byte sequences.
#[inline]
pub fn to_vec_bytes(frame: Frame) -> Result<Vec<Option<Bytes>>> {
    to_array(frame, "array of bytes")?
        .into_iter()
        .map(to_bytes)
        .collect()
}

/// Converts an array reply to a vector of strings.
#[inline]
pub fn to_vec_string(frame: Frame) -> Result<Vec<String>> {
    to_array(frame, "array of strings")?
        .into_iter()
        .map(to_string)
        .collect()
}

/// Converts a flat field/value array (HGETALL) into a map.
#[inline]
pub fn to_string_map(frame: Frame) -> Result<HashMap<String, String>> {
    let items = to_array(frame, "map")?;
    if items.len() % 2 != 0 {
        return Err(Error::TypeConversion {
            target: "map",
            value: format!("array of {} elements", items.len()),
        });
    }

    let mut map = HashMap::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
        map.insert(to_string(field)?, to_string(value)?);
    }
    Ok(map)
}
