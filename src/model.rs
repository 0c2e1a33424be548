use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::error::{Error, Result};
use crate::schema::SubType;

/// A single dynamically typed cell, as stored by SQLite.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value. Text is never coerced.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(*value as f64),
            Value::Real(value) => Some(*value),
            Value::Null | Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Grouping key view of the value: text verbatim, integers in decimal.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Value::Text(text) => Some(text.clone()),
            Value::Integer(value) => Some(value.to_string()),
            Value::Null | Value::Real(_) => None,
        }
    }

    /// Python-style tuple element rendering used for texture summaries.
    pub fn to_tuple_element(&self) -> String {
        match self {
            Value::Null => "None".to_string(),
            Value::Integer(value) => value.to_string(),
            Value::Real(value) => python_float_repr(*value),
            Value::Text(text) => python_str_repr(text),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Integer(value) => serde_json::Value::from(*value),
            Value::Real(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(text) => serde_json::Value::String(text.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Real(value) => write!(f, "{value}"),
            Value::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Rows by named columns. Every row has exactly one value per column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Empty table carrying the given column schema.
    pub fn with_columns(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|column| column.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == columns.len()));
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    /// Index of a column that the schema requires.
    pub fn require_column(&self, column: &str) -> Result<usize> {
        self.column_index(column)
            .ok_or_else(|| Error::missing_column(&self.name, column))
    }

    pub fn require_columns(&self, columns: &[&str]) -> Result<Vec<usize>> {
        columns
            .iter()
            .map(|column| self.require_column(column))
            .collect()
    }

    pub fn column_values(&self, column: &str) -> Result<impl Iterator<Item = &Value> + '_> {
        let idx = self.require_column(column)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|values| &values[idx])
    }

    pub fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Copy of the rows for which `keep` holds.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[Value]) -> bool,
    {
        Table {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| keep(row))
                .cloned()
                .collect(),
        }
    }

    /// Copy of the given rows restricted to the given column indices.
    pub fn take(&self, rows: &[usize], columns: &[usize]) -> Table {
        Table {
            name: self.name.clone(),
            columns: columns.iter().map(|&idx| self.columns[idx].clone()).collect(),
            rows: rows
                .iter()
                .map(|&row| columns.iter().map(|&idx| self.rows[row][idx].clone()).collect())
                .collect(),
        }
    }

    /// Copy without the named column; an absent column copies as is.
    pub fn without_column(&self, column: &str) -> Table {
        let Some(drop_idx) = self.column_index(column) else {
            return self.clone();
        };
        let keep: Vec<usize> = (0..self.columns.len()).filter(|&idx| idx != drop_idx).collect();
        let rows: Vec<usize> = (0..self.rows.len()).collect();
        self.take(&rows, &keep)
    }

    /// Sets every row of `column` to `value`, appending the column if absent.
    pub fn fill_column(&mut self, column: &str, value: Value) {
        match self.column_index(column) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.clone();
                }
            }
            None => {
                self.columns.push(column.to_string());
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
    }

    /// Appends a column from per-row values.
    pub fn push_column(&mut self, column: &str, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.rows.len());
        self.columns.push(column.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }

    /// Rewrites the values of one column in place.
    pub fn map_column<F>(&mut self, column: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&Value) -> Value,
    {
        let idx = self.require_column(column)?;
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        Ok(())
    }

    /// Appends the rows of `other`, matching columns by name.
    ///
    /// Columns only in `other` are added to `self` and null-filled for the
    /// existing rows; columns only in `self` are null for the appended rows.
    pub fn append(&mut self, other: &Table) {
        for column in &other.columns {
            if !self.has_column(column) {
                self.fill_column(column, Value::Null);
            }
        }
        let mapping: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|column| other.column_index(column))
            .collect();
        for row in &other.rows {
            self.rows.push(
                mapping
                    .iter()
                    .map(|idx| idx.map(|idx| row[idx].clone()).unwrap_or_default())
                    .collect(),
            );
        }
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Observation id (`OBSID`), unique within a table set.
    ObservationId
);
string_id!(
    /// Tectonic measurement id, the `GDB_ID` of a tectonic measurement row.
    MeasurementId
);
string_id!(
    /// Row-level id (`GDB_ID`) of a rock observation point.
    RockObsId
);

/// Key type of one grouped table.
pub trait GroupKey: Clone + Eq + Hash + AsRef<str> + From<String> {}

impl GroupKey for ObservationId {}
impl GroupKey for MeasurementId {}
impl GroupKey for RockObsId {}

/// Map from an id as it appears in a grouping key to the id present in the
/// child table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdExceptions(HashMap<String, String>);

impl IdExceptions {
    pub fn new(map: HashMap<String, String>) -> Self {
        Self(map)
    }

    pub fn remap<K: GroupKey>(&self, key: &K) -> K {
        match self.0.get(key.as_ref()) {
            Some(replacement) => K::from(replacement.clone()),
            None => key.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for IdExceptions {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One field-survey site with all its related measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub obs_id: ObservationId,
    pub gdb_id: Option<MeasurementId>,
    pub latitude: f64,
    pub longitude: f64,
    pub remarks: String,
    pub project: String,
    pub planars: Table,
    pub linears: Table,
    pub images: Table,
    pub rock_observations: Table,
    pub samples: Table,
    pub textures: Table,
}

impl Observation {
    /// Observation with every sub-table empty but fully shaped.
    pub fn new(
        obs_id: ObservationId,
        latitude: f64,
        longitude: f64,
        remarks: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        let empty = |sub_type: SubType| Table::with_columns(sub_type.as_str(), sub_type.columns());
        Self {
            obs_id,
            gdb_id: None,
            latitude,
            longitude,
            remarks: remarks.into(),
            project: project.into(),
            planars: empty(SubType::Planar),
            linears: empty(SubType::Linear),
            images: empty(SubType::Image),
            rock_observations: empty(SubType::RockObservation),
            samples: empty(SubType::Sample),
            textures: empty(SubType::Texture),
        }
    }

    /// The resolved measurement id, empty when none was found.
    pub fn gdb_id_str(&self) -> &str {
        self.gdb_id.as_ref().map(MeasurementId::as_str).unwrap_or("")
    }

    pub fn sub_table(&self, sub_type: SubType) -> &Table {
        match sub_type {
            SubType::Planar => &self.planars,
            SubType::Linear => &self.linears,
            SubType::RockObservation => &self.rock_observations,
            SubType::Sample => &self.samples,
            SubType::Texture => &self.textures,
            SubType::Image => &self.images,
        }
    }
}

fn python_float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    // Python writes the exponent signed and at least two digits wide
    let repr = format!("{value:?}");
    match repr.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => repr,
    }
}

fn python_str_repr(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut repr = String::with_capacity(text.len() + 2);
    repr.push(quote);
    for c in text.chars() {
        match c {
            '\\' => repr.push_str("\\\\"),
            '\n' => repr.push_str("\\n"),
            '\r' => repr.push_str("\\r"),
            '\t' => repr.push_str("\\t"),
            c if c == quote => {
                repr.push('\\');
                repr.push(c);
            }
            c => repr.push(c),
        }
    }
    repr.push(quote);
    repr
}
