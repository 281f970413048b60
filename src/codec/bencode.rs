//! Bencode codec: tagged value tree plus strict decoder and canonical encoder.
//!
//! Dictionaries are kept in a `BTreeMap` keyed by raw bytes, so encoding is
//! always canonical (keys in ascending byte order) regardless of the order in
//! which they appeared in the input. Two records compare equal exactly when
//! their canonical encodings are byte-identical.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fmt;

use memchr::memchr;

/// Dictionary representation: raw byte keys in canonical order.
pub type Dict = BTreeMap<Vec<u8>, Value>;

/// Nesting limit for lists/dicts; deeper input is rejected instead of
/// recursing without bound.
const MAX_DEPTH: usize = 512;

/// A decoded bencode value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Dict(Dict),
}

impl Value {
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Byte string interpreted as UTF-8, if it is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_dict(&self) -> Option<&Dict> {
        match self {
            Self::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Look up `key` when `self` is a dictionary.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_dict().and_then(|d| d.get(key.as_bytes()))
    }

    /// Short label of the variant, used in shape errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Bytes(_) => "byte string",
            Self::List(_) => "list",
            Self::Dict(_) => "dictionary",
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Bytes(value.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Bytes(value.into_bytes())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Decoder failure with the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    UnexpectedEof,
    InvalidPrefix { byte: u8, offset: usize },
    InvalidInt { offset: usize },
    InvalidLen { offset: usize },
    InvalidDictKey { offset: usize },
    DuplicateKey { offset: usize },
    NestingTooDeep { offset: usize },
    TrailingData { offset: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::InvalidPrefix { byte, offset } => {
                write!(f, "invalid prefix byte 0x{byte:02x} at offset {offset}")
            }
            Self::InvalidInt { offset } => write!(f, "invalid integer at offset {offset}"),
            Self::InvalidLen { offset } => {
                write!(f, "invalid byte string length at offset {offset}")
            }
            Self::InvalidDictKey { offset } => {
                write!(f, "dictionary key is not a byte string at offset {offset}")
            }
            Self::DuplicateKey { offset } => {
                write!(f, "duplicate dictionary key at offset {offset}")
            }
            Self::NestingTooDeep { offset } => {
                write!(f, "nesting deeper than {MAX_DEPTH} at offset {offset}")
            }
            Self::TrailingData { offset } => write!(f, "trailing data at offset {offset}"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decode a complete buffer into one value. Trailing bytes are an error.
pub fn decode(data: &[u8]) -> Result<Value, DecodeError> {
    let (value, pos) = decode_value(data, 0, 0)?;
    if pos != data.len() {
        return Err(DecodeError::TrailingData { offset: pos });
    }
    Ok(value)
}

/// Canonical encoding of `value`.
#[must_use]
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

pub fn encode_into(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Int(num) => {
            out.push(b'i');
            out.extend_from_slice(num.to_string().as_bytes());
            out.push(b'e');
        }
        Value::Bytes(bytes) => encode_bytes(bytes, out),
        Value::List(items) => {
            out.push(b'l');
            for item in items {
                encode_into(item, out);
            }
            out.push(b'e');
        }
        Value::Dict(items) => {
            out.push(b'd');
            for (key, value) in items {
                encode_bytes(key, out);
                encode_into(value, out);
            }
            out.push(b'e');
        }
    }
}

fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(bytes.len().to_string().as_bytes());
    out.push(b':');
    out.extend_from_slice(bytes);
}

fn decode_value(data: &[u8], pos: usize, depth: usize) -> Result<(Value, usize), DecodeError> {
    let Some(&prefix) = data.get(pos) else {
        return Err(DecodeError::UnexpectedEof);
    };
    match prefix {
        b'i' => {
            let (value, next) = decode_int(data, pos)?;
            Ok((Value::Int(value), next))
        }
        b'l' => {
            if depth >= MAX_DEPTH {
                return Err(DecodeError::NestingTooDeep { offset: pos });
            }
            let mut items = Vec::new();
            let mut i = pos + 1;
            loop {
                match data.get(i) {
                    None => return Err(DecodeError::UnexpectedEof),
                    Some(b'e') => return Ok((Value::List(items), i + 1)),
                    Some(_) => {
                        let (value, next) = decode_value(data, i, depth + 1)?;
                        items.push(value);
                        i = next;
                    }
                }
            }
        }
        b'd' => {
            if depth >= MAX_DEPTH {
                return Err(DecodeError::NestingTooDeep { offset: pos });
            }
            let mut items = Dict::new();
            let mut i = pos + 1;
            loop {
                match data.get(i) {
                    None => return Err(DecodeError::UnexpectedEof),
                    Some(b'e') => return Ok((Value::Dict(items), i + 1)),
                    Some(b'0'..=b'9') => {
                        let (key, next) = decode_bytes(data, i)?;
                        let (value, after) = decode_value(data, next, depth + 1)?;
                        if items.insert(key, value).is_some() {
                            return Err(DecodeError::DuplicateKey { offset: i });
                        }
                        i = after;
                    }
                    Some(_) => return Err(DecodeError::InvalidDictKey { offset: i }),
                }
            }
        }
        b'0'..=b'9' => {
            let (bytes, next) = decode_bytes(data, pos)?;
            Ok((Value::Bytes(bytes), next))
        }
        byte => Err(DecodeError::InvalidPrefix { byte, offset: pos }),
    }
}

fn decode_int(data: &[u8], pos: usize) -> Result<(i64, usize), DecodeError> {
    let body_start = pos + 1;
    let Some(len) = memchr(b'e', &data[body_start..]) else {
        return Err(DecodeError::UnexpectedEof);
    };
    let end = body_start + len;
    let slice = &data[body_start..end];
    let invalid = DecodeError::InvalidInt { offset: pos };
    let digits = slice.strip_prefix(b"-").unwrap_or(slice);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(invalid);
    }
    // No leading zeros, no negative zero.
    if (digits.len() > 1 && digits[0] == b'0') || (digits.len() < slice.len() && digits == b"0")
    {
        return Err(invalid);
    }
    let text = std::str::from_utf8(slice).map_err(|_| invalid.clone())?;
    let value = text.parse::<i64>().map_err(|_| invalid)?;
    Ok((value, end + 1))
}

fn decode_bytes(data: &[u8], pos: usize) -> Result<(Vec<u8>, usize), DecodeError> {
    let Some(len_digits) = memchr(b':', &data[pos..]) else {
        return Err(DecodeError::UnexpectedEof);
    };
    let colon = pos + len_digits;
    let slice = &data[pos..colon];
    let invalid = DecodeError::InvalidLen { offset: pos };
    if slice.is_empty()
        || !slice.iter().all(u8::is_ascii_digit)
        || (slice.len() > 1 && slice[0] == b'0')
    {
        return Err(invalid);
    }
    let text = std::str::from_utf8(slice).map_err(|_| invalid.clone())?;
    let len = text.parse::<usize>().map_err(|_| invalid)?;
    let start = colon + 1;
    let end = start.checked_add(len).ok_or(DecodeError::UnexpectedEof)?;
    if end > data.len() {
        return Err(DecodeError::UnexpectedEof);
    }
    Ok((data[start..end].to_vec(), end))
}
