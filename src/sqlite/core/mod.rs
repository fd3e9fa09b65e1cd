//! Decoding of the fixed structures of the file format.

pub mod header;
pub mod record;
pub mod schema;
pub mod varint;
