//! Typed values stored inside a vault.
//!
//! A `Value` is encoded to bytes before encryption and decoded after
//! decryption.  The vault itself never looks inside the encoded bytes.
//!
//! Encoding: one tag byte followed by a fixed payload per kind.
//!
//! ```text
//! 0x01 Int    i64 little-endian (8 bytes)
//! 0x02 Float  f64 bits little-endian (8 bytes)
//! 0x03 Text   u32 LE length + UTF-8 bytes
//! 0x04 Bytes  u32 LE length + raw bytes
//! ```

use std::fmt;

use crate::errors::{Result, VaultError};

const TAG_INT: u8 = 0x01;
const TAG_FLOAT: u8 = 0x02;
const TAG_TEXT: u8 = 0x03;
const TAG_BYTES: u8 = 0x04;

/// A value stored under a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// The kind of a `Value`, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Float,
    Text,
    Bytes,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
            Value::Bytes(_) => ValueKind::Bytes,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// Encode to the tagged byte representation.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        match self {
            Value::Int(v) => {
                buf.push(TAG_INT);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Value::Float(v) => {
                buf.push(TAG_FLOAT);
                buf.extend_from_slice(&v.to_bits().to_le_bytes());
            }
            Value::Text(v) => {
                buf.push(TAG_TEXT);
                push_len_prefixed(&mut buf, v.as_bytes())?;
            }
            Value::Bytes(v) => {
                buf.push(TAG_BYTES);
                push_len_prefixed(&mut buf, v)?;
            }
        }
        Ok(buf)
    }

    /// Decode bytes produced by `encode`.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (&tag, payload) = data
            .split_first()
            .ok_or_else(|| VaultError::InvalidValue("empty value".into()))?;

        match tag {
            TAG_INT => Ok(Value::Int(i64::from_le_bytes(fixed_payload(payload)?))),
            TAG_FLOAT => Ok(Value::Float(f64::from_bits(u64::from_le_bytes(
                fixed_payload(payload)?,
            )))),
            TAG_TEXT => {
                let bytes = len_prefixed_payload(payload)?;
                let text = std::str::from_utf8(bytes)
                    .map_err(|_| VaultError::InvalidValue("text value is not valid UTF-8".into()))?;
                Ok(Value::Text(text.to_string()))
            }
            TAG_BYTES => Ok(Value::Bytes(len_prefixed_payload(payload)?.to_vec())),
            other => Err(VaultError::InvalidValue(format!(
                "unknown value tag 0x{other:02x}"
            ))),
        }
    }

    fn encoded_len(&self) -> usize {
        1 + match self {
            Value::Int(_) | Value::Float(_) => 8,
            Value::Text(v) => 4 + v.len(),
            Value::Bytes(v) => 4 + v.len(),
        }
    }
}

fn push_len_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    let len = u32::try_from(bytes.len()).map_err(|_| {
        VaultError::InvalidValue(format!("value length {} exceeds u32::MAX", bytes.len()))
    })?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

fn fixed_payload(payload: &[u8]) -> Result<[u8; 8]> {
    payload.try_into().map_err(|_| {
        VaultError::InvalidValue(format!(
            "expected 8 payload bytes, got {}",
            payload.len()
        ))
    })
}

fn len_prefixed_payload(payload: &[u8]) -> Result<&[u8]> {
    if payload.len() < 4 {
        return Err(VaultError::InvalidValue("missing length prefix".into()));
    }
    let (len_bytes, rest) = payload.split_at(4);
    let len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]);
    if usize::try_from(len).ok() != Some(rest.len()) {
        return Err(VaultError::InvalidValue(format!(
            "length prefix {len} does not match {} payload bytes",
            rest.len()
        )));
    }
    Ok(rest)
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}
