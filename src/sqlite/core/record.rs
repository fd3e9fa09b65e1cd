//! SQLite Record Format Implementation
//!
//! This module decodes SQLite records (rows) according to the file format specification.
//!
//! ## Record Format
//!
//! A record consists of:
//!
//! - A header containing:
//!   - Header size (varint), counting the size varint itself
//!   - Serial type codes (sequence of varints), one per column
//! - The column bodies, packed back to back in header order
//!
//! The serial type codes in the header describe the data type and size of each field:
//!
//! - 0: NULL
//! - 1: 8-bit signed int
//! - 2: 16-bit signed int
//! - 3: 24-bit signed int
//! - 4: 32-bit signed int
//! - 5: 48-bit signed int
//! - 6: 64-bit signed int
//! - 7: IEEE 754 64-bit float
//! - 8: integer constant 0
//! - 9: integer constant 1
//! - 10,11: Internal use
//! - N >= 12 and even: BLOB of (N-12)/2 bytes
//! - N >= 13 and odd: Text of (N-13)/2 bytes

use super::varint::Varint;
use crate::sqlite::error::{FormatError, FormatResult};
use std::fmt;
use tracing::{debug, warn};

/// Storage class and width of a single column, as declared in a record header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialType {
    Null,
    Int8,
    Int16,
    Int24,
    Int32,
    Int48,
    Int64,
    Float64,
    Zero,
    One,
    Blob(usize),
    Text(usize),
}

impl TryFrom<u64> for SerialType {
    type Error = FormatError;

    fn try_from(code: u64) -> FormatResult<Self> {
        Ok(match code {
            0 => SerialType::Null,
            1 => SerialType::Int8,
            2 => SerialType::Int16,
            3 => SerialType::Int24,
            4 => SerialType::Int32,
            5 => SerialType::Int48,
            6 => SerialType::Int64,
            7 => SerialType::Float64,
            8 => SerialType::Zero,
            9 => SerialType::One,
            10 | 11 => return Err(FormatError::ReservedSerialType(code)),
            n if n % 2 == 0 => SerialType::Blob(((n - 12) / 2) as usize),
            n => SerialType::Text(((n - 13) / 2) as usize),
        })
    }
}

impl SerialType {
    /// Number of body bytes a value of this type occupies
    pub fn size(&self) -> usize {
        match self {
            SerialType::Null | SerialType::Zero | SerialType::One => 0,
            SerialType::Int8 => 1,
            SerialType::Int16 => 2,
            SerialType::Int24 => 3,
            SerialType::Int32 => 4,
            SerialType::Int48 => 6,
            SerialType::Int64 | SerialType::Float64 => 8,
            SerialType::Blob(len) | SerialType::Text(len) => *len,
        }
    }
}

/// A decoded column value, borrowing its bytes from the page buffer
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Null,
    Integer(i64),
    Float(f64),
    Blob(&'a [u8]),
    Text(&'a str),
}

impl<'a> Value<'a> {
    pub fn as_text(&self) -> Option<&'a str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Short name of the storage class, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Blob(_) => "blob",
            Value::Text(_) => "text",
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{}", value),
            Value::Blob(bytes) => write!(f, "<blob {} bytes>", bytes.len()),
            Value::Text(text) => write!(f, "{}", text),
        }
    }
}

/// A decoded record (table row)
#[derive(Debug, Clone, PartialEq)]
pub struct Record<'a> {
    values: Vec<Value<'a>>,
}

impl<'a> Record<'a> {
    /// Decodes a record from a cell payload
    pub fn decode(payload: &'a [u8]) -> FormatResult<Self> {
        let (serial_types, header_len) = Self::read_header(payload)?;

        let mut values = Vec::with_capacity(serial_types.len());
        let mut position = header_len;
        for serial_type in serial_types {
            let (value, size) = Self::read_value(payload, position, serial_type)?;
            values.push(value);
            position += size;
        }

        if position != payload.len() {
            warn!(
                "Record body ends at {} but payload is {} bytes; ignoring trailing bytes",
                position,
                payload.len()
            );
        }

        Ok(Self { values })
    }

    /// Reads the record header, returning the serial types and the header length in bytes
    pub fn read_header(payload: &[u8]) -> FormatResult<(Vec<SerialType>, usize)> {
        let (header_size, size_len) = payload.read_varint(0)?;
        if header_size < size_len as u64 {
            return Err(FormatError::InvalidRecordHeader {
                header_len: header_size,
                payload_len: payload.len(),
            });
        }
        if header_size > payload.len() as u64 {
            return Err(FormatError::RecordTruncated {
                offset: 0,
                expected: usize::try_from(header_size).unwrap_or(usize::MAX),
                available: payload.len(),
            });
        }

        let header_end = header_size as usize;
        // Serial type varints must not spill into the body
        let header = &payload[..header_end];

        let mut serial_types = Vec::new();
        let mut position = size_len;
        while position < header_end {
            let (code, len) = header.read_varint(position)?;
            serial_types.push(SerialType::try_from(code)?);
            position += len;
        }

        debug!("Record header: {} bytes, types {:?}", header_end, serial_types);
        Ok((serial_types, header_end))
    }

    fn read_value(
        payload: &'a [u8],
        position: usize,
        serial_type: SerialType,
    ) -> FormatResult<(Value<'a>, usize)> {
        let size = serial_type.size();
        let available = payload.len().saturating_sub(position);
        if size > available {
            return Err(FormatError::RecordTruncated {
                offset: position,
                expected: size,
                available,
            });
        }
        let body = &payload[position..position + size];

        let value = match serial_type {
            SerialType::Null => Value::Null,
            SerialType::Zero => Value::Integer(0),
            SerialType::One => Value::Integer(1),
            SerialType::Int8
            | SerialType::Int16
            | SerialType::Int24
            | SerialType::Int32
            | SerialType::Int48
            | SerialType::Int64 => Value::Integer(read_signed(body)),
            SerialType::Float64 => {
                let bytes: [u8; 8] = body.try_into().map_err(|_| FormatError::RecordTruncated {
                    offset: position,
                    expected: 8,
                    available,
                })?;
                Value::Float(f64::from_be_bytes(bytes))
            }
            SerialType::Blob(_) => Value::Blob(body),
            SerialType::Text(_) => Value::Text(
                std::str::from_utf8(body)
                    .map_err(|_| FormatError::InvalidText { offset: position })?,
            ),
        };

        Ok((value, size))
    }

    pub fn values(&self) -> &[Value<'a>] {
        &self.values
    }

    pub fn get(&self, column: usize) -> Option<&Value<'a>> {
        self.values.get(column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Big-endian two's complement integer of 1 to 8 bytes
fn read_signed(bytes: &[u8]) -> i64 {
    let unsigned = bytes
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | byte as u64);
    let shift = 64 - 8 * bytes.len() as u32;
    ((unsigned << shift) as i64) >> shift
}
