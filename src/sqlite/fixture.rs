//! Byte-level builders for database images used by the tests.

use super::core::header::DatabaseHeader;
use super::core::record::Value;

pub const LEAF_TABLE_PAGE: u8 = 0x0d;

/// Canonical (shortest) varint encoding of `value`
pub fn encode_varint(value: u64) -> Vec<u8> {
    if value >> 56 != 0 {
        let mut bytes = vec![0u8; 9];
        bytes[8] = value as u8;
        let mut rest = value >> 8;
        for byte in bytes[..8].iter_mut().rev() {
            *byte = (rest & 0x7f) as u8 | 0x80;
            rest >>= 7;
        }
        return bytes;
    }

    let mut groups = Vec::new();
    let mut rest = value;
    loop {
        groups.push((rest & 0x7f) as u8);
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }
    groups.reverse();
    let last = groups.len() - 1;
    for byte in &mut groups[..last] {
        *byte |= 0x80;
    }
    groups
}

fn integer_body(value: i64) -> (u64, Vec<u8>) {
    let bytes = value.to_be_bytes();
    let (code, width) = match value {
        0 => return (8, Vec::new()),
        1 => return (9, Vec::new()),
        -0x80..=0x7f => (1, 1),
        -0x8000..=0x7fff => (2, 2),
        -0x80_0000..=0x7f_ffff => (3, 3),
        -0x8000_0000..=0x7fff_ffff => (4, 4),
        -0x8000_0000_0000..=0x7fff_ffff_ffff => (5, 6),
        _ => (6, 8),
    };
    (code, bytes[8 - width..].to_vec())
}

/// Serializes column values into a record payload
pub fn serialize_record(values: &[Value]) -> Vec<u8> {
    let mut types = Vec::new();
    let mut body = Vec::new();
    for value in values {
        let code = match value {
            Value::Null => 0,
            Value::Integer(v) => {
                let (code, bytes) = integer_body(*v);
                body.extend(bytes);
                code
            }
            Value::Float(v) => {
                body.extend(v.to_be_bytes());
                7
            }
            Value::Blob(bytes) => {
                body.extend_from_slice(bytes);
                12 + 2 * bytes.len() as u64
            }
            Value::Text(text) => {
                body.extend_from_slice(text.as_bytes());
                13 + 2 * text.len() as u64
            }
        };
        types.extend(encode_varint(code));
    }

    // Header size counts its own varint
    let mut header_size = types.len() + 1;
    while encode_varint(header_size as u64).len() + types.len() != header_size {
        header_size = encode_varint(header_size as u64).len() + types.len();
    }

    let mut payload = encode_varint(header_size as u64);
    payload.extend(types);
    payload.extend(body);
    payload
}

/// Wraps a record payload into a table leaf cell
pub fn table_leaf_cell(rowid: u64, payload: &[u8]) -> Vec<u8> {
    let mut cell = encode_varint(payload.len() as u64);
    cell.extend(encode_varint(rowid));
    cell.extend_from_slice(payload);
    cell
}

/// A schema table row as a leaf cell
pub fn schema_cell(
    rowid: u64,
    kind: &str,
    name: &str,
    tbl_name: &str,
    root_page: i64,
    sql: &str,
) -> Vec<u8> {
    let payload = serialize_record(&[
        Value::Text(kind),
        Value::Text(name),
        Value::Text(tbl_name),
        Value::Integer(root_page),
        Value::Text(sql),
    ]);
    table_leaf_cell(rowid, &payload)
}

/// Builds a leaf table page whose header starts at `header_offset`.
///
/// Cells are packed from the end of the page towards the front, first cell
/// highest, the way SQLite lays out a freshly built page.
pub fn table_leaf_page(page_size: usize, header_offset: usize, cells: &[Vec<u8>]) -> Vec<u8> {
    let mut page = vec![0u8; page_size];
    let mut content_start = page_size;
    let mut pointers = Vec::with_capacity(cells.len());
    for cell in cells {
        content_start -= cell.len();
        page[content_start..content_start + cell.len()].copy_from_slice(cell);
        pointers.push(content_start as u16);
    }

    let header = &mut page[header_offset..header_offset + 8];
    header[0] = LEAF_TABLE_PAGE;
    header[3..5].copy_from_slice(&(cells.len() as u16).to_be_bytes());
    header[5..7].copy_from_slice(&(content_start as u16).to_be_bytes());

    let array_start = header_offset + 8;
    for (i, pointer) in pointers.iter().enumerate() {
        let at = array_start + i * 2;
        page[at..at + 2].copy_from_slice(&pointer.to_be_bytes());
    }
    page
}

/// Writes a valid 100-byte file header into the start of `image`
pub fn write_file_header(image: &mut [u8], page_size: u32, page_count: u32) {
    let header = &mut image[..DatabaseHeader::HEADER_SIZE];
    header[..16].copy_from_slice(b"SQLite format 3\0");
    let raw_page_size: u16 = if page_size == 65536 { 1 } else { page_size as u16 };
    header[16..18].copy_from_slice(&raw_page_size.to_be_bytes());
    header[18] = 1;
    header[19] = 1;
    header[21] = 64;
    header[22] = 32;
    header[23] = 32;
    header[24..28].copy_from_slice(&1u32.to_be_bytes());
    header[28..32].copy_from_slice(&page_count.to_be_bytes());
    header[44..48].copy_from_slice(&4u32.to_be_bytes());
    header[56..60].copy_from_slice(&1u32.to_be_bytes());
    header[92..96].copy_from_slice(&1u32.to_be_bytes());
    header[96..100].copy_from_slice(&3_045_001u32.to_be_bytes());
}

/// A complete database image: page 1 holds the schema cells, followed by
/// `extra_pages` empty leaf table pages.
pub fn database_image(page_size: u32, schema_cells: &[Vec<u8>], extra_pages: u32) -> Vec<u8> {
    let size = page_size as usize;
    let mut image = table_leaf_page(size, DatabaseHeader::HEADER_SIZE, schema_cells);
    write_file_header(&mut image, page_size, extra_pages + 1);
    for _ in 0..extra_pages {
        image.extend(table_leaf_page(size, 0, &[]));
    }
    image
}
