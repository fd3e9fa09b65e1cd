//! The schema table (`sqlite_schema`)
//!
//! Page 1 holds the root of the schema table. Each row has five columns in
//! a fixed order: `type`, `name`, `tbl_name`, `rootpage`, `sql`.

use super::record::{Record, Value};
use crate::sqlite::btree::{BTreePage, LeafCell};
use crate::sqlite::db::SQLiteDatabase;
use crate::sqlite::error::{FormatError, FormatResult};
use tracing::{info, warn};

/// Page number of the schema table root
pub const SCHEMA_ROOT_PAGE: u32 = 1;

/// Number of columns in a schema table row
const SCHEMA_COLUMNS: usize = 5;

/// One row of the schema table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    /// "table", "index", "view" or "trigger"
    pub kind: String,
    pub name: String,
    pub tbl_name: String,
    /// Root b-tree page, 0 for views and triggers
    pub root_page: u32,
    /// CREATE statement, absent for automatic indexes
    pub sql: Option<String>,
}

/// A user table listed in the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub root_page: u32,
    pub sql: Option<String>,
}

impl SchemaEntry {
    /// Maps a decoded schema record onto its named columns
    pub fn from_record(rowid: u64, record: &Record) -> FormatResult<Self> {
        let malformed = |reason: String| FormatError::MalformedSchemaRow { rowid, reason };

        if record.len() < SCHEMA_COLUMNS {
            return Err(malformed(format!(
                "expected {} columns, found {}",
                SCHEMA_COLUMNS,
                record.len()
            )));
        }
        let values = record.values();

        let text = |column: usize, name: &str| -> FormatResult<String> {
            values[column]
                .as_text()
                .map(str::to_string)
                .ok_or_else(|| malformed(format!("{} is {}, not text", name, values[column].kind())))
        };

        let root_page = match &values[3] {
            Value::Null => 0,
            Value::Integer(page) => u32::try_from(*page)
                .map_err(|_| malformed(format!("rootpage {} out of range", page)))?,
            other => {
                return Err(malformed(format!(
                    "rootpage '{}' is {}, not integer",
                    other,
                    other.kind()
                )))
            }
        };

        let sql = match &values[4] {
            Value::Null => None,
            Value::Text(sql) => Some(sql.to_string()),
            other => return Err(malformed(format!("sql is {}, not text", other.kind()))),
        };

        Ok(Self {
            kind: text(0, "type")?,
            name: text(1, "name")?,
            tbl_name: text(2, "tbl_name")?,
            root_page,
            sql,
        })
    }

    pub fn is_table(&self) -> bool {
        self.kind == "table"
    }
}

impl From<SchemaEntry> for TableDescriptor {
    fn from(entry: SchemaEntry) -> Self {
        Self {
            name: entry.name,
            root_page: entry.root_page,
            sql: entry.sql,
        }
    }
}

/// What to do with a schema cell that fails to decode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanPolicy {
    /// Report the first decoding error
    #[default]
    Strict,
    /// Log the error and continue with the next cell
    SkipMalformed,
}

/// Reads the schema table stored on page 1
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaCatalog {
    policy: ScanPolicy,
}

impl SchemaCatalog {
    pub fn new(policy: ScanPolicy) -> Self {
        Self { policy }
    }

    /// Decodes every schema row, in cell pointer order
    pub fn entries(&self, db: &mut SQLiteDatabase) -> FormatResult<Vec<SchemaEntry>> {
        let page = db.read_page(SCHEMA_ROOT_PAGE)?;
        let header_offset = SQLiteDatabase::page_header_offset(SCHEMA_ROOT_PAGE);
        let btree_page = BTreePage::parse(&page, header_offset)?;

        let mut entries = Vec::with_capacity(btree_page.num_cells() as usize);
        for (index, cell) in btree_page.iter_leaf_cells()?.enumerate() {
            match cell.and_then(Self::decode_cell) {
                Ok(entry) => entries.push(entry),
                Err(err) if self.policy == ScanPolicy::SkipMalformed => {
                    warn!("Skipping schema cell {}: {}", index, err);
                }
                Err(err) => return Err(err),
            }
        }

        info!("Found {} schema entries", entries.len());
        Ok(entries)
    }

    /// Lists user tables: schema rows whose type is "table"
    pub fn tables(&self, db: &mut SQLiteDatabase) -> FormatResult<Vec<TableDescriptor>> {
        Ok(self
            .entries(db)?
            .into_iter()
            .filter(SchemaEntry::is_table)
            .map(TableDescriptor::from)
            .collect())
    }

    fn decode_cell(cell: &[u8]) -> FormatResult<SchemaEntry> {
        let cell = LeafCell::parse(cell)?;
        let record = Record::decode(cell.payload)?;
        SchemaEntry::from_record(cell.rowid, &record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::fixture::{schema_cell, serialize_record};

    #[test]
    fn test_entry_from_record() {
        let payload = serialize_record(&[
            Value::Text("table"),
            Value::Text("apples"),
            Value::Text("apples"),
            Value::Integer(2),
            Value::Text("CREATE TABLE apples(id)"),
        ]);
        let record = Record::decode(&payload).unwrap();
        let entry = SchemaEntry::from_record(1, &record).unwrap();

        assert!(entry.is_table());
        assert_eq!(entry.name, "apples");
        assert_eq!(entry.tbl_name, "apples");
        assert_eq!(entry.root_page, 2);
        assert_eq!(entry.sql.as_deref(), Some("CREATE TABLE apples(id)"));
    }

    #[test]
    fn test_autoindex_without_sql() {
        let payload = serialize_record(&[
            Value::Text("index"),
            Value::Text("sqlite_autoindex_apples_1"),
            Value::Text("apples"),
            Value::Integer(3),
            Value::Null,
        ]);
        let record = Record::decode(&payload).unwrap();
        let entry = SchemaEntry::from_record(2, &record).unwrap();

        assert!(!entry.is_table());
        assert_eq!(entry.sql, None);
    }

    #[test]
    fn test_too_few_columns() {
        let payload = serialize_record(&[Value::Text("table"), Value::Text("apples")]);
        let record = Record::decode(&payload).unwrap();
        assert!(matches!(
            SchemaEntry::from_record(7, &record),
            Err(FormatError::MalformedSchemaRow { rowid: 7, .. })
        ));
    }

    #[test]
    fn test_wrongly_typed_name() {
        let payload = serialize_record(&[
            Value::Text("table"),
            Value::Integer(12),
            Value::Text("apples"),
            Value::Integer(2),
            Value::Null,
        ]);
        let record = Record::decode(&payload).unwrap();
        match SchemaEntry::from_record(1, &record) {
            Err(FormatError::MalformedSchemaRow { reason, .. }) => {
                assert_eq!(reason, "name is integer, not text");
            }
            other => panic!("expected MalformedSchemaRow, got {:?}", other),
        }
    }

    #[test]
    fn test_non_integer_rootpage() {
        let payload = serialize_record(&[
            Value::Text("table"),
            Value::Text("apples"),
            Value::Text("apples"),
            Value::Text("two"),
            Value::Null,
        ]);
        let record = Record::decode(&payload).unwrap();
        match SchemaEntry::from_record(1, &record) {
            Err(FormatError::MalformedSchemaRow { reason, .. }) => {
                assert_eq!(reason, "rootpage 'two' is text, not integer");
            }
            other => panic!("expected MalformedSchemaRow, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_cell() {
        let cell = schema_cell(4, "view", "v", "apples", 0, "CREATE VIEW v AS SELECT 1");
        let entry = SchemaCatalog::decode_cell(&cell).unwrap();
        assert_eq!(entry.kind, "view");
        assert_eq!(entry.root_page, 0);
    }
}
