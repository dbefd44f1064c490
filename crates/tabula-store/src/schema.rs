//! Optional per-table schemas.
//!
//! A schema declares typed columns; records may still carry undeclared
//! fields. Validation runs before every insert and before every in-place
//! update is committed.

use serde::{Deserialize, Serialize};
use tabula_types::{DataType, Record, Value};

use crate::error::{Result, StoreError};

// ============================================================================
// Column Definition
// ============================================================================

/// Definition of a table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Column data type.
    pub data_type: DataType,
    /// Whether the column may be missing or NULL.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnDef {
    /// Creates a new nullable column definition.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    /// Makes this column required.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    fn check(&self, table: &str, value: Option<&Value>) -> Result<()> {
        match value {
            None | Some(Value::Null) if !self.nullable => Err(self.violation(
                table,
                "missing required field".to_string(),
            )),
            Some(value) if !value.is_compatible_with(self.data_type) => {
                let actual = value
                    .data_type()
                    .map_or_else(|| "NULL".to_string(), |dt| dt.to_string());
                Err(self.violation(
                    table,
                    format!("expected {}, got {actual}", self.data_type),
                ))
            }
            _ => Ok(()),
        }
    }

    fn violation(&self, table: &str, reason: String) -> StoreError {
        StoreError::SchemaViolation {
            table: table.to_string(),
            field: self.name.clone(),
            reason,
        }
    }
}

// ============================================================================
// Table Schema
// ============================================================================

/// Declared columns of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Creates a schema from column definitions.
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        debug_assert!(
            columns
                .iter()
                .enumerate()
                .all(|(i, c)| columns[..i].iter().all(|prev| prev.name != c.name)),
            "duplicate column names in schema"
        );
        Self { columns }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Column definitions in declaration order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Finds a column by name.
    pub fn find_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Checks a record against every declared column.
    ///
    /// Stops at the first violating column.
    pub fn validate(&self, table: &str, record: &Record) -> Result<()> {
        for column in &self.columns {
            column.check(table, record.get(&column.name))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_types::record;

    fn users() -> TableSchema {
        TableSchema::new(vec![
            ColumnDef::new("name", DataType::Text).not_null(),
            ColumnDef::new("age", DataType::Number),
        ])
    }

    #[test]
    fn test_accepts_valid_record() {
        let row = record! { "name" => "alice", "age" => 30, "extra" => true };
        assert!(users().validate("users", &row).is_ok());
    }

    #[test]
    fn test_nullable_column_may_be_absent() {
        let row = record! { "name" => "alice" };
        assert!(users().validate("users", &row).is_ok());
    }

    #[test]
    fn test_rejects_missing_required() {
        let row = record! { "age" => 30 };
        let err = users().validate("users", &row).unwrap_err();
        assert!(matches!(
            err,
            StoreError::SchemaViolation { ref field, .. } if field == "name"
        ));
    }

    #[test]
    fn test_rejects_explicit_null_required() {
        let row = record! { "name" => Value::Null };
        assert!(users().validate("users", &row).is_err());
    }

    #[test]
    fn test_rejects_mistyped() {
        let row = record! { "name" => "alice", "age" => "thirty" };
        let err = users().validate("users", &row).unwrap_err();
        assert_eq!(
            err.to_string(),
            "schema violation in table 'users', field 'age': expected NUMBER, got TEXT"
        );
    }
}
