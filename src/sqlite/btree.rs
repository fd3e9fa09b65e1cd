//! B-tree page decoding
//!
//! ## B-tree Page Structure
//!
//! Each page in the database file is a B-tree page that contains:
//!
//! - Page header (8-12 bytes)
//! - Cell pointer array
//! - Unallocated space
//! - Cell content area
//! - Reserved region
//!
//! Page 1 is special: the first 100 bytes hold the database header, so its
//! page header starts at offset 100. Cell pointers are always relative to the
//! start of the page, not to the page header.

use crate::sqlite::core::varint::Varint;
use crate::sqlite::error::{FormatError, FormatResult};
use itertools::Itertools;
use nom::number::complete::{be_u16, be_u32, be_u8};
use nom::IResult;
use tracing::debug;

/// Kind of B-tree page, from the first byte of the page header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    InteriorIndex,
    InteriorTable,
    LeafIndex,
    LeafTable,
}

impl TryFrom<u8> for PageType {
    type Error = FormatError;

    fn try_from(page_type: u8) -> FormatResult<Self> {
        match page_type {
            0x02 => Ok(PageType::InteriorIndex),
            0x05 => Ok(PageType::InteriorTable),
            0x0a => Ok(PageType::LeafIndex),
            0x0d => Ok(PageType::LeafTable),
            _ => Err(FormatError::UnsupportedPageType { page_type }),
        }
    }
}

impl PageType {
    pub fn code(&self) -> u8 {
        match self {
            PageType::InteriorIndex => 0x02,
            PageType::InteriorTable => 0x05,
            PageType::LeafIndex => 0x0a,
            PageType::LeafTable => 0x0d,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, PageType::LeafIndex | PageType::LeafTable)
    }

    /// Size of the page header: interior pages carry a right-most pointer
    pub fn header_size(&self) -> usize {
        if self.is_leaf() {
            8
        } else {
            12
        }
    }
}

/// Represents a B-tree page header
///
/// ## B-tree Page Header Format
///
/// - Byte 0: Page type
/// - Bytes 1-2: First freeblock offset
/// - Bytes 3-4: Number of cells
/// - Bytes 5-6: Cell content offset (0 means 65536)
/// - Byte 7: Number of fragmented free bytes
/// - Bytes 8-11: Right-most pointer (interior pages only)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BTreePageHeader {
    pub page_type: PageType,
    /// Offset to first freeblock
    pub first_freeblock: u16,
    /// Number of cells in page
    pub num_cells: u16,
    /// Offset to cell content area
    pub content_offset: u32,
    /// Number of fragmented free bytes
    pub fragmented_free_bytes: u8,
    pub rightmost_pointer: Option<u32>,
}

impl BTreePageHeader {
    /// Parse a B-tree page header starting at `offset` within `page`
    pub fn parse(page: &[u8], offset: usize) -> FormatResult<Self> {
        let available = page.len().saturating_sub(offset);
        let truncated = |expected| FormatError::PageTruncated {
            offset,
            expected,
            available,
        };

        let type_byte = *page.get(offset).ok_or_else(|| truncated(1))?;
        let page_type = PageType::try_from(type_byte)?;
        let expected = page_type.header_size();
        let (_, header) =
            Self::fields(&page[offset..], page_type).map_err(|_| truncated(expected))?;

        debug!("Page header at offset {}: {:?}", offset, header);
        Ok(header)
    }

    fn fields(input: &[u8], page_type: PageType) -> IResult<&[u8], Self> {
        let (input, _) = be_u8(input)?;
        let (input, first_freeblock) = be_u16(input)?;
        let (input, num_cells) = be_u16(input)?;
        let (input, content_offset) = be_u16(input)?;
        let (input, fragmented_free_bytes) = be_u8(input)?;
        let (input, rightmost_pointer) = if page_type.is_leaf() {
            (input, None)
        } else {
            let (input, pointer) = be_u32(input)?;
            (input, Some(pointer))
        };

        Ok((
            input,
            BTreePageHeader {
                page_type,
                first_freeblock,
                num_cells,
                content_offset: if content_offset == 0 {
                    65536
                } else {
                    content_offset as u32
                },
                fragmented_free_bytes,
                rightmost_pointer,
            },
        ))
    }

    /// Returns the offset where cell pointer array starts
    pub fn cell_pointer_array_offset(&self, header_offset: usize) -> usize {
        header_offset + self.page_type.header_size()
    }
}

/// A B-tree page viewed through its header
pub struct BTreePage<'a> {
    /// Raw page data, including the database header on page 1
    data: &'a [u8],
    header_offset: usize,
    header: BTreePageHeader,
}

impl<'a> BTreePage<'a> {
    /// Interprets `data` as a page whose header starts at `header_offset`
    pub fn parse(data: &'a [u8], header_offset: usize) -> FormatResult<Self> {
        let header = BTreePageHeader::parse(data, header_offset)?;
        Ok(Self {
            data,
            header_offset,
            header,
        })
    }

    /// Returns number of cells in the page
    pub fn num_cells(&self) -> u16 {
        self.header.num_cells
    }

    /// Reads the cell pointer array, in storage order
    pub fn cell_pointers(&self) -> FormatResult<Vec<usize>> {
        let array_start = self.header.cell_pointer_array_offset(self.header_offset);
        let array_len = self.header.num_cells as usize * 2;
        let array = self
            .data
            .get(array_start..array_start + array_len)
            .ok_or(FormatError::PageTruncated {
                offset: array_start,
                expected: array_len,
                available: self.data.len().saturating_sub(array_start),
            })?;

        Ok(array
            .iter()
            .tuples()
            .map(|(&high, &low)| u16::from_be_bytes([high, low]) as usize)
            .collect())
    }

    /// Returns one byte slice per cell of a leaf table page, in pointer order
    ///
    /// Each slice covers the payload-length varint, the rowid varint and the
    /// payload itself; its extent comes from decoding the cell, not from the
    /// gap to the next cell.
    pub fn leaf_cells(&self) -> FormatResult<Vec<&'a [u8]>> {
        self.iter_leaf_cells()?.collect()
    }

    /// Like [`BTreePage::leaf_cells`], but yields each cell's result separately
    /// so a caller can step over a damaged cell.
    pub fn iter_leaf_cells(&self) -> FormatResult<impl Iterator<Item = FormatResult<&'a [u8]>>> {
        if self.header.page_type != PageType::LeafTable {
            return Err(FormatError::UnsupportedPageType {
                page_type: self.header.page_type.code(),
            });
        }

        let data = self.data;
        let page_size = data.len();
        let content_floor = self.header.cell_pointer_array_offset(self.header_offset)
            + self.header.num_cells as usize * 2;

        Ok(self.cell_pointers()?.into_iter().map(move |pointer| {
            if pointer < content_floor || pointer >= page_size {
                return Err(FormatError::CellPointerOutOfRange { pointer, page_size });
            }
            let cell = &data[pointer..];
            let len = LeafCell::encoded_len(cell)?;
            Ok(&cell[..len])
        }))
    }
}

/// A cell of a leaf table page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafCell<'a> {
    pub payload_len: u64,
    pub rowid: u64,
    pub payload: &'a [u8],
}

impl<'a> LeafCell<'a> {
    /// Splits a cell into its payload length, rowid and record payload
    pub fn parse(cell: &'a [u8]) -> FormatResult<Self> {
        let (payload_len, rowid, start) = Self::layout(cell)?;
        Ok(Self {
            payload_len,
            rowid,
            payload: &cell[start..start + payload_len as usize],
        })
    }

    /// Total bytes occupied by the cell starting at `cell[0]`
    pub fn encoded_len(cell: &[u8]) -> FormatResult<usize> {
        let (payload_len, _, start) = Self::layout(cell)?;
        Ok(start + payload_len as usize)
    }

    /// Decodes the cell prefix, returning payload length, rowid and payload start
    fn layout(cell: &[u8]) -> FormatResult<(u64, u64, usize)> {
        let (payload_len, len_size) = cell.read_varint(0)?;
        let (rowid, rowid_size) = cell.read_varint(len_size)?;
        let start = len_size + rowid_size;

        // Overflow pages are not followed
        let available = cell.len() - start;
        if payload_len > available as u64 {
            return Err(FormatError::RecordTruncated {
                offset: start,
                expected: usize::try_from(payload_len).unwrap_or(usize::MAX),
                available,
            });
        }

        Ok((payload_len, rowid, start))
    }
}
