//! SQLite Database Header Implementation
//!
//! Handles parsing of the SQLite database header (first 100 bytes of the file)
//! according to the file format specification.
//!
//! ## Database Header Format (First 100 bytes)
//!
//! - Bytes 0-15: Header string "SQLite format 3\0"
//! - Bytes 16-17: Page size in bytes (big-endian, 1 means 65536)
//! - Byte 18: File format write version
//! - Byte 19: File format read version
//! - Byte 20: Reserved space at end of each page
//! - Bytes 21-23: Maximum embedded payload fraction, minimum embedded payload fraction, leaf payload fraction
//! - Bytes 24-27: File change counter
//! - Bytes 28-31: Size of database file in pages
//! - Bytes 32-35: First freelist trunk page
//! - Bytes 36-39: Total number of freelist pages
//! - Bytes 40-43: Schema cookie
//! - Bytes 44-47: Schema format number
//! - Bytes 48-51: Default page cache size
//! - Bytes 52-55: Largest root b-tree page number
//! - Bytes 56-59: Database text encoding (1:UTF-8, 2:UTF-16le, 3:UTF-16be)
//! - Bytes 60-63: User version
//! - Bytes 64-67: Incremental vacuum mode
//! - Bytes 68-71: Application ID
//! - Bytes 72-91: Reserved for expansion
//! - Bytes 92-95: Version-valid-for number
//! - Bytes 96-99: SQLite version number

use crate::sqlite::error::{FormatError, FormatResult};
use nom::bytes::complete::{tag, take};
use nom::number::complete::{be_u16, be_u32, be_u8};
use nom::IResult;
use tracing::info;

/// Represents the SQLite database header (first 100 bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseHeader {
    /// Page size in bytes (bytes 16-17), with the 65536 sentinel resolved
    pub page_size: u32,
    /// File format write version (byte 18)
    pub write_version: u8,
    /// File format read version (byte 19)
    pub read_version: u8,
    /// Reserved space at end of each page (byte 20)
    pub reserved_space: u8,
    /// Maximum embedded payload fraction (byte 21)
    pub max_payload_fraction: u8,
    /// Minimum embedded payload fraction (byte 22)
    pub min_payload_fraction: u8,
    /// Leaf payload fraction (byte 23)
    pub leaf_payload_fraction: u8,
    /// File change counter (bytes 24-27)
    pub file_change_counter: u32,
    /// Size of database file in pages (bytes 28-31)
    pub database_size: u32,
    /// First freelist trunk page (bytes 32-35)
    pub first_freelist_trunk: u32,
    /// Total number of freelist pages (bytes 36-39)
    pub total_freelist_pages: u32,
    /// Schema cookie (bytes 40-43)
    pub schema_cookie: u32,
    /// Schema format number (bytes 44-47)
    pub schema_format: u32,
    /// Default page cache size (bytes 48-51)
    pub page_cache_size: u32,
    /// Largest root b-tree page number (bytes 52-55)
    pub largest_root_page: u32,
    /// Database text encoding (1:UTF-8, 2:UTF-16le, 3:UTF-16be) (bytes 56-59)
    pub text_encoding: u32,
    /// User version (bytes 60-63)
    pub user_version: u32,
    /// Incremental vacuum mode (bytes 64-67)
    pub incremental_vacuum: u32,
    /// Application ID (bytes 68-71)
    pub application_id: u32,
    /// Version valid for number (bytes 92-95)
    pub version_valid_for: u32,
    /// SQLite version number (bytes 96-99)
    pub sqlite_version_number: u32,
}

impl DatabaseHeader {
    /// Size of the SQLite database header in bytes
    pub const HEADER_SIZE: usize = 100;

    /// Magic string that should appear at the start of every SQLite file
    const MAGIC_STRING: &'static [u8] = b"SQLite format 3\0";

    const MIN_PAGE_SIZE: u32 = 512;
    const MAX_PAGE_SIZE: u32 = 65536;

    /// Parses a database header from raw bytes
    pub fn parse(header_bytes: &[u8]) -> FormatResult<Self> {
        if header_bytes.len() < Self::HEADER_SIZE {
            return Err(FormatError::CorruptHeader(format!(
                "header needs {} bytes but only {} available",
                Self::HEADER_SIZE,
                header_bytes.len()
            )));
        }

        let (_, header) = Self::fields(&header_bytes[..Self::HEADER_SIZE])
            .map_err(|_| FormatError::CorruptHeader("invalid SQLite magic string".into()))?;
        header.validate()?;

        info!("Parsed database header: {:?}", header);
        Ok(header)
    }

    fn fields(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, _) = tag(Self::MAGIC_STRING)(input)?;
        let (input, raw_page_size) = be_u16(input)?;
        let (input, write_version) = be_u8(input)?;
        let (input, read_version) = be_u8(input)?;
        let (input, reserved_space) = be_u8(input)?;
        let (input, max_payload_fraction) = be_u8(input)?;
        let (input, min_payload_fraction) = be_u8(input)?;
        let (input, leaf_payload_fraction) = be_u8(input)?;
        let (input, file_change_counter) = be_u32(input)?;
        let (input, database_size) = be_u32(input)?;
        let (input, first_freelist_trunk) = be_u32(input)?;
        let (input, total_freelist_pages) = be_u32(input)?;
        let (input, schema_cookie) = be_u32(input)?;
        let (input, schema_format) = be_u32(input)?;
        let (input, page_cache_size) = be_u32(input)?;
        let (input, largest_root_page) = be_u32(input)?;
        let (input, text_encoding) = be_u32(input)?;
        let (input, user_version) = be_u32(input)?;
        let (input, incremental_vacuum) = be_u32(input)?;
        let (input, application_id) = be_u32(input)?;
        let (input, _) = take(20usize)(input)?;
        let (input, version_valid_for) = be_u32(input)?;
        let (input, sqlite_version_number) = be_u32(input)?;

        Ok((
            input,
            DatabaseHeader {
                page_size: Self::resolve_page_size(raw_page_size),
                write_version,
                read_version,
                reserved_space,
                max_payload_fraction,
                min_payload_fraction,
                leaf_payload_fraction,
                file_change_counter,
                database_size,
                first_freelist_trunk,
                total_freelist_pages,
                schema_cookie,
                schema_format,
                page_cache_size,
                largest_root_page,
                text_encoding,
                user_version,
                incremental_vacuum,
                application_id,
                version_valid_for,
                sqlite_version_number,
            },
        ))
    }

    fn resolve_page_size(raw: u16) -> u32 {
        if raw == 1 {
            Self::MAX_PAGE_SIZE
        } else {
            raw as u32
        }
    }

    /// Checks the header invariants the reader relies on
    fn validate(&self) -> FormatResult<()> {
        let size = self.page_size;
        if !size.is_power_of_two() || !(Self::MIN_PAGE_SIZE..=Self::MAX_PAGE_SIZE).contains(&size)
        {
            return Err(FormatError::CorruptHeader(format!(
                "page size {} is not a power of two between {} and {}",
                size,
                Self::MIN_PAGE_SIZE,
                Self::MAX_PAGE_SIZE
            )));
        }
        Ok(())
    }

    /// Returns the page count recorded in the header, if it can be trusted
    ///
    /// The in-header size is only valid when it is non-zero and the
    /// version-valid-for number matches the change counter.
    pub fn trusted_page_count(&self) -> Option<u32> {
        (self.database_size != 0 && self.version_valid_for == self.file_change_counter)
            .then_some(self.database_size)
    }

    /// Returns true if the database uses UTF-8 encoding
    pub fn is_utf8(&self) -> bool {
        self.text_encoding == 1
    }
}
