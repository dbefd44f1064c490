//! Database configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tabula_query::EngineConfig;
use tabula_store::StoreConfig;

use crate::error::{Result, TabulaError};

/// Configuration for a [`Database`](crate::Database).
///
/// Every field has a default, so a partial JSON document such as
/// `{"store": {"assign_ids": false}}` is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Table store settings.
    pub store: StoreConfig,
    /// Query engine settings.
    pub engine: EngineConfig,
}

impl DatabaseConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the store configuration.
    #[must_use]
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Sets the engine configuration.
    #[must_use]
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks that the settings are usable together.
    pub fn validate(&self) -> Result<()> {
        let store = &self.store;
        if store.id_field.is_empty() {
            return Err(TabulaError::config("store.id_field must not be empty"));
        }
        if store.created_at_field.is_empty() {
            return Err(TabulaError::config(
                "store.created_at_field must not be empty",
            ));
        }
        if store.id_field == store.created_at_field {
            return Err(TabulaError::config(format!(
                "store.id_field and store.created_at_field are both '{}'",
                store.id_field
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.store.id_field, "id");
        assert_eq!(config.store.created_at_field, "created_at");
        assert!(config.store.assign_ids && config.store.auto_create_tables);
        assert!(config.engine.cache_subqueries);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            DatabaseConfig::from_json_str(r#"{"store": {"assign_ids": false}}"#).unwrap();
        assert!(!config.store.assign_ids);
        assert!(config.store.assign_timestamps);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn json_round_trip() {
        let config = DatabaseConfig::new()
            .with_store(StoreConfig::default().with_id_field("uid"))
            .with_engine(EngineConfig::default().with_subquery_cache(false));
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(DatabaseConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn rejects_clashing_fields() {
        let err = DatabaseConfig::from_json_str(
            r#"{"store": {"id_field": "at", "created_at_field": "at"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, TabulaError::Config(_)));
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(
            DatabaseConfig::from_json_str("{"),
            Err(TabulaError::Json(_))
        ));
    }

    #[test]
    fn from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"engine": {{"cache_subqueries": false}}}}"#).unwrap();
        let config = DatabaseConfig::from_json_file(file.path()).unwrap();
        assert!(!config.engine.cache_subqueries);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = DatabaseConfig::from_json_file(dir.path().join("absent.json"));
        assert!(matches!(result, Err(TabulaError::Io(_))));
    }
}
