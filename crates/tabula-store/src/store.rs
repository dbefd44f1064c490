//! The in-memory table store.

use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tabula_types::{Record, Value};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::schema::TableSchema;
use crate::table::{RowRef, Table};
use crate::TableStore;

/// Configuration for a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Field holding the row identifier.
    pub id_field: String,
    /// Field holding the creation timestamp.
    pub created_at_field: String,
    /// Assign a UUID to inserted records that lack an identifier.
    pub assign_ids: bool,
    /// Stamp inserted records that lack a creation timestamp.
    pub assign_timestamps: bool,
    /// Create a schemaless table on first insert instead of failing.
    pub auto_create_tables: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            created_at_field: "created_at".to_string(),
            assign_ids: true,
            assign_timestamps: true,
            auto_create_tables: true,
        }
    }
}

impl StoreConfig {
    /// Sets the identifier field name.
    #[must_use]
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Sets the creation timestamp field name.
    #[must_use]
    pub fn with_created_at_field(mut self, field: impl Into<String>) -> Self {
        self.created_at_field = field.into();
        self
    }

    /// Disables identifier and timestamp stamping.
    #[must_use]
    pub fn without_stamping(mut self) -> Self {
        self.assign_ids = false;
        self.assign_timestamps = false;
        self
    }

    /// Requires tables to be created before they are written.
    #[must_use]
    pub fn without_auto_create(mut self) -> Self {
        self.auto_create_tables = false;
        self
    }
}

/// A database: named tables held in memory.
///
/// Nothing is persisted. Table order is creation order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    config: StoreConfig,
    tables: IndexMap<String, Table>,
}

impl MemoryStore {
    /// Creates an empty store with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with the given configuration.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            tables: IndexMap::new(),
        }
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Creates a table, optionally with a schema.
    pub fn create_table(&mut self, name: &str, schema: Option<TableSchema>) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(StoreError::TableExists(name.to_string()));
        }
        let table = match schema {
            Some(schema) => Table::with_schema(name, schema),
            None => Table::new(name),
        };
        self.tables.insert(name.to_string(), table);
        tracing::debug!(table = name, "table created");
        Ok(())
    }

    /// Removes a table and all of its rows.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.tables
            .shift_remove(name)
            .map(|_| tracing::debug!(table = name, "table dropped"))
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    /// Table names in creation order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    fn table_for_insert(&mut self, name: &str) -> Result<&mut Table> {
        if self.config.auto_create_tables && !self.tables.contains_key(name) {
            self.create_table(name, None)?;
        }
        self.table_mut(name)
    }

    /// Fills in the identifier and creation timestamp when absent.
    fn stamp(&self, record: &mut Record) {
        if self.config.assign_ids && record.is_null(&self.config.id_field) {
            record.insert(
                self.config.id_field.clone(),
                Uuid::new_v4().to_string(),
            );
        }
        if self.config.assign_timestamps && record.is_null(&self.config.created_at_field) {
            record.insert(
                self.config.created_at_field.clone(),
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            );
        }
    }
}

impl TableStore for MemoryStore {
    fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    fn insert(&mut self, table: &str, mut record: Record) -> Result<RowRef> {
        self.stamp(&mut record);
        let row = self.table_for_insert(table)?.append(record)?;
        tracing::debug!(table, "row inserted");
        Ok(row)
    }

    fn update_rows(&mut self, table: &str, rows: &[RowRef], changes: &Record) -> Result<usize> {
        let updated = self.table_mut(table)?.update_rows(rows, changes)?;
        tracing::debug!(table, updated, "rows updated");
        Ok(updated)
    }

    fn update_by_id(&mut self, table: &str, records: &[Record]) -> Result<usize> {
        let id_field = self.config.id_field.clone();
        let target = self.table_mut(table)?;

        let mut updated = 0;
        for record in records {
            let Some(id) = record.get(&id_field).filter(|id| !Value::is_null(id)) else {
                continue;
            };
            if let Some(row) = target.find_by(&id_field, id) {
                updated += target.update_rows(&[row], record)?;
            }
        }
        tracing::debug!(table, updated, "rows updated by id");
        Ok(updated)
    }

    fn delete_rows(&mut self, table: &str, rows: &[RowRef]) -> Result<usize> {
        let deleted = self.table_mut(table)?.remove_rows(rows);
        tracing::debug!(table, deleted, "rows deleted");
        Ok(deleted)
    }
}
