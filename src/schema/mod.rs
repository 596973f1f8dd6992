//! Schema Context: table and column metadata for planning
//!
//! Tracks which tables exist and which columns each one has. The planner
//! resolves every table and column reference of a candidate statement
//! against this context. Lookups are case-insensitive; the name a table
//! was registered with is kept for display.
//!
//! ## JSON format
//!
//! ```json
//! {
//!   "tables": [
//!     { "name": "t1", "columns": [ { "name": "id", "type": "int" }, { "name": "a" } ] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Errors loading or building a schema
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("table '{0}' is defined more than once")]
    DuplicateTable(String),

    #[error("column '{column}' is defined more than once in table '{table}'")]
    DuplicateColumn { table: String, column: String },
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    /// Declared type, informational only
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

/// Table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    /// Check if this table has a column, case-insensitively
    pub fn has_column(&self, column: &str) -> bool {
        self.columns
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(column))
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct SchemaFile {
    tables: Vec<TableDef>,
}

/// Schema context the planner resolves against
#[derive(Debug, Clone, Default)]
pub struct SchemaContext {
    /// Lowercased table name to definition
    tables: HashMap<String, TableDef>,
}

impl SchemaContext {
    /// Create a new empty schema
    pub fn new() -> Self {
        SchemaContext {
            tables: HashMap::new(),
        }
    }

    /// Register a table with untyped columns
    pub fn register_table<I, S>(&mut self, name: &str, columns: I) -> Result<(), SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table = TableDef {
            name: name.to_string(),
            columns: columns
                .into_iter()
                .map(|column| ColumnDef {
                    name: column.into(),
                    data_type: None,
                })
                .collect(),
        };
        self.register_table_def(table)
    }

    /// Register a full table definition
    pub fn register_table_def(&mut self, table: TableDef) -> Result<(), SchemaError> {
        let key = table.name.to_ascii_lowercase();
        if self.tables.contains_key(&key) {
            return Err(SchemaError::DuplicateTable(table.name));
        }
        for (i, column) in table.columns.iter().enumerate() {
            if table.columns[..i]
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(&column.name))
            {
                return Err(SchemaError::DuplicateColumn {
                    table: table.name.clone(),
                    column: column.name.clone(),
                });
            }
        }
        self.tables.insert(key, table);
        Ok(())
    }

    /// Get a table definition
    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(&name.to_ascii_lowercase())
    }

    /// Check if a table exists
    pub fn has_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    /// Check if `table` has `column`
    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.table(table).is_some_and(|t| t.has_column(column))
    }

    /// Column names of a table, in definition order
    pub fn columns(&self, table: &str) -> Option<Vec<&str>> {
        self.table(table)
            .map(|t| t.columns.iter().map(|c| c.name.as_str()).collect())
    }

    /// All registered table names, sorted
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.values().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if no table is registered
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Parse a schema from its JSON representation
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile = serde_json::from_str(json)?;
        let mut schema = SchemaContext::new();
        for table in file.tables {
            schema.register_table_def(table)?;
        }
        Ok(schema)
    }

    /// Load a schema from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Serialize to the JSON representation, tables sorted by name
    pub fn to_json(&self) -> Result<String, SchemaError> {
        let mut tables: Vec<TableDef> = self.tables.values().cloned().collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(serde_json::to_string_pretty(&SchemaFile { tables })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut schema = SchemaContext::new();
        schema.register_table("Orders", ["id", "Total"]).unwrap();

        assert!(schema.has_table("orders"));
        assert!(schema.has_column("ORDERS", "total"));
        assert!(!schema.has_column("orders", "missing"));
        assert_eq!(schema.columns("orders"), Some(vec!["id", "Total"]));
        assert_eq!(schema.table_names(), vec!["Orders"]);
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let mut schema = SchemaContext::new();
        schema.register_table("t", ["a"]).unwrap();
        let err = schema.register_table("T", ["b"]).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateTable(_)));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut schema = SchemaContext::new();
        let err = schema.register_table("t", ["a", "A"]).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateColumn { .. }));
    }

    #[test]
    fn test_from_json() {
        let schema = SchemaContext::from_json(
            r#"{"tables":[{"name":"t1","columns":[{"name":"id","type":"int"},{"name":"a"}]}]}"#,
        )
        .unwrap();
        assert_eq!(schema.len(), 1);
        let table = schema.table("t1").unwrap();
        assert_eq!(table.columns[0].data_type.as_deref(), Some("int"));
        assert_eq!(table.columns[1].data_type, None);
    }

    #[test]
    fn test_json_round_trip() {
        let mut schema = SchemaContext::new();
        schema.register_table("b", ["x"]).unwrap();
        schema.register_table("a", ["y"]).unwrap();
        let json = schema.to_json().unwrap();
        let reloaded = SchemaContext::from_json(&json).unwrap();
        assert_eq!(reloaded.table_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            SchemaContext::from_json("{"),
            Err(SchemaError::Json(_))
        ));
    }
}
