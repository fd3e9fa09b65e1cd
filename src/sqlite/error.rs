//! Errors raised while decoding the database file format.

use thiserror::Error;

/// Errors that can occur while reading or decoding a database file.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt database header: {0}")]
    CorruptHeader(String),

    #[error("Malformed varint at offset {offset}: buffer ends after {available} bytes")]
    MalformedVarint { offset: usize, available: usize },

    #[error("Record truncated at offset {offset}: needs {expected} bytes but only {available} available")]
    RecordTruncated {
        offset: usize,
        expected: usize,
        available: usize,
    },

    #[error("Invalid record header length {header_len} for a {payload_len}-byte payload")]
    InvalidRecordHeader { header_len: u64, payload_len: usize },

    #[error("Reserved serial type {0}")]
    ReservedSerialType(u64),

    #[error("Text column at offset {offset} is not valid UTF-8")]
    InvalidText { offset: usize },

    #[error("Unsupported page type 0x{page_type:02x}: only leaf table pages (0x0d) are supported")]
    UnsupportedPageType { page_type: u8 },

    #[error("Page truncated at offset {offset}: needs {expected} bytes but only {available} available")]
    PageTruncated {
        offset: usize,
        expected: usize,
        available: usize,
    },

    #[error("Cell pointer {pointer} lies outside the {page_size}-byte page")]
    CellPointerOutOfRange { pointer: usize, page_size: usize },

    #[error("Page {page} out of range (database has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("Malformed schema row {rowid}: {reason}")]
    MalformedSchemaRow { rowid: u64, reason: String },
}

/// Result type for format decoding operations.
pub type FormatResult<T> = Result<T, FormatError>;
