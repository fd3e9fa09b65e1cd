//! SQLite File Format Implementation
//!
//! This module implements reading of SQLite database files according to the SQLite file format specification.
//!
//! # SQLite File Structure
//!
//! A SQLite database file consists of one or more pages of equal size. Page
//! `n` (counting from 1) starts at byte `(n - 1) * page_size`. The first page
//! contains:
//!
//! - Database header (100 bytes), see [`DatabaseHeader`]
//! - First page of the sqlite_schema table, whose page header starts at byte 100
//!
//! Every other page starts with its own page header at byte 0.

use super::btree::BTreePageHeader;
use super::core::header::DatabaseHeader;
use super::core::schema::{SchemaCatalog, SchemaEntry, TableDescriptor, SCHEMA_ROOT_PAGE};
use super::error::{FormatError, FormatResult};
use std::fs::File;
use std::io::{prelude::*, SeekFrom};
use std::path::Path;
use tracing::{info, warn};

/// Represents a SQLite database file
pub struct SQLiteDatabase {
    /// The underlying database file handle
    file: File,
    header: DatabaseHeader,
    file_len: u64,
}

/// Contains metadata about a SQLite database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SQLiteDatabaseInfo {
    /// Size of each page in bytes
    page_size: u32,
    /// Number of cells on the schema root page
    num_tables: u16,
}

impl SQLiteDatabaseInfo {
    /// Returns the page size in bytes
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Returns the number of schema rows on page 1
    pub fn num_tables(&self) -> u16 {
        self.num_tables
    }
}

impl SQLiteDatabase {
    /// Opens a SQLite database file at the given path and reads its header
    pub fn open(path: impl AsRef<Path>) -> FormatResult<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let file_len = file.metadata()?.len();
        info!("Opened {} ({} bytes)", path.display(), file_len);

        if file_len < DatabaseHeader::HEADER_SIZE as u64 {
            return Err(FormatError::CorruptHeader(format!(
                "file is {} bytes, smaller than the {}-byte header",
                file_len,
                DatabaseHeader::HEADER_SIZE
            )));
        }

        let mut header = [0; DatabaseHeader::HEADER_SIZE];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut header)?;
        let header = DatabaseHeader::parse(&header)?;
        if !header.is_utf8() {
            warn!(
                "Text encoding {} is not UTF-8; text columns may fail to decode",
                header.text_encoding
            );
        }

        Ok(Self {
            file,
            header,
            file_len,
        })
    }

    pub fn header(&self) -> &DatabaseHeader {
        &self.header
    }

    /// Page size in bytes
    pub fn page_size(&self) -> u32 {
        self.header.page_size
    }

    /// Number of pages, from the header when it is trustworthy, otherwise
    /// from the file length
    ///
    /// Never less than 1: page 1 holds the header that was already read, so a
    /// short file surfaces as a read error on page 1 rather than an empty database.
    pub fn page_count(&self) -> u32 {
        self.header.trusted_page_count().unwrap_or_else(|| {
            u32::try_from(self.file_len / self.page_size() as u64)
                .unwrap_or(u32::MAX)
                .max(1)
        })
    }

    /// Offset of the page header within page `index`
    pub fn page_header_offset(index: u32) -> usize {
        if index == 1 {
            DatabaseHeader::HEADER_SIZE
        } else {
            0
        }
    }

    /// Reads page `index` (1-based) into a buffer of `page_size` bytes
    ///
    /// The buffer for page 1 still starts with the database header.
    pub fn read_page(&mut self, index: u32) -> FormatResult<Vec<u8>> {
        let page_count = self.page_count();
        if index == 0 || index > page_count {
            return Err(FormatError::PageOutOfRange {
                page: index,
                page_count,
            });
        }

        let page_size = self.page_size() as u64;
        let offset = (index as u64 - 1) * page_size;
        info!("Seeking to offset: {} for page {}", offset, index);

        let mut page = vec![0; page_size as usize];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut page)?;
        Ok(page)
    }

    /// Reads the page size and the number of schema rows without decoding any record
    pub fn get_info(&mut self) -> FormatResult<SQLiteDatabaseInfo> {
        let page = self.read_page(SCHEMA_ROOT_PAGE)?;
        let btree_header =
            BTreePageHeader::parse(&page, Self::page_header_offset(SCHEMA_ROOT_PAGE))?;

        let info = SQLiteDatabaseInfo {
            page_size: self.header().page_size,
            num_tables: btree_header.num_cells,
        };
        info!("Database info: {:?}", info);
        Ok(info)
    }

    /// Lists all user tables in the database by reading the sqlite_schema table
    pub fn list_tables(&mut self, catalog: SchemaCatalog) -> FormatResult<Vec<TableDescriptor>> {
        catalog.tables(self)
    }

    /// Lists every object in the sqlite_schema table
    pub fn schema_entries(&mut self, catalog: SchemaCatalog) -> FormatResult<Vec<SchemaEntry>> {
        catalog.entries(self)
    }
}
