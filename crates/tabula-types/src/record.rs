//! Records: insertion-ordered field maps.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

static NULL: Value = Value::Null;

/// One row of a table, or one transient result row.
///
/// Fields keep their insertion order. Overwriting an existing field keeps
/// its original position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of a field by exact name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Looks up a field, falling back to a unique qualified match.
    ///
    /// An unqualified name that is absent resolves to the single
    /// `alias.name` field of a joined row. Ambiguous names resolve to
    /// nothing.
    pub fn resolve(&self, field: &str) -> Option<&Value> {
        if let Some(value) = self.fields.get(field) {
            return Some(value);
        }
        if field.contains('.') {
            return None;
        }

        let mut found = None;
        for (name, value) in &self.fields {
            let matches = name
                .rsplit_once('.')
                .is_some_and(|(_, column)| column == field);
            if matches {
                if found.is_some() {
                    return None;
                }
                found = Some(value);
            }
        }
        found
    }

    /// Like [`Record::resolve`], treating an absent field as NULL.
    pub fn value(&self, field: &str) -> &Value {
        self.resolve(field).unwrap_or(&NULL)
    }

    /// Sets a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Removes a field, preserving the order of the remaining fields.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.shift_remove(field)
    }

    /// Returns true if the field is present (even if NULL).
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Returns true if the field is absent or explicitly NULL.
    pub fn is_null(&self, field: &str) -> bool {
        self.resolve(field).is_none_or(Value::is_null)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Iterates `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overlays every field of `changes` onto this record.
    pub fn merge(&mut self, changes: &Record) {
        for (field, value) in &changes.fields {
            self.fields.insert(field.clone(), value.clone());
        }
    }

    /// Returns a copy whose field names carry a `prefix.` qualifier.
    pub fn qualified(&self, prefix: &str) -> Record {
        self.fields
            .iter()
            .map(|(field, value)| (format!("{prefix}.{field}"), value.clone()))
            .collect()
    }

    /// Returns a record with the same field names, every value NULL.
    pub fn null_template(&self) -> Record {
        self.fields
            .keys()
            .map(|field| (field.clone(), Value::Null))
            .collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Record {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.fields.insert(k.into(), v.into());
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Builds a [`Record`] from `field => value` pairs.
///
/// ```
/// use tabula_types::record;
///
/// let row = record! { "name" => "alice", "age" => 30 };
/// assert_eq!(row.len(), 2);
/// ```
#[macro_export]
macro_rules! record {
    () => { $crate::Record::new() };
    ($($field:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $( record.insert($field, $value); )+
        record
    }};
}
