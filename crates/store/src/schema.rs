//! Column descriptors discovered from the inventory table's schema.
//!
//! The descriptor list is introspected once per session and passed into every
//! repository call. Types are coarse categories used for input validation and
//! sort order only.

use std::fmt;

use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    /// Map a declared SQL type (`INT(11)`, `DECIMAL(10,2)`, `VARCHAR(100)`, ...)
    /// onto a coarse category.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();
        if upper.contains("INT") {
            Self::Integer
        } else if ["REAL", "NUMERIC", "FLOAT", "DOUBLE", "DECIMAL"]
            .iter()
            .any(|k| upper.contains(k))
        {
            Self::Real
        } else {
            Self::Text
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Real)
    }

    /// Parse raw user input. Empty input is `Null`; numeric input is trimmed.
    pub fn parse(self, raw: &str) -> Option<Value> {
        if raw.is_empty() {
            return Some(Value::Null);
        }
        match self {
            Self::Integer => raw.trim().parse().ok().map(Value::Integer),
            Self::Real => raw.trim().parse().ok().map(Value::Real),
            Self::Text => Some(Value::Text(raw.to_string())),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::Real => write!(f, "REAL"),
            Self::Text => write!(f, "TEXT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self { name: name.into(), ty }
    }
}

/// Ordered column descriptors of the inventory table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ColumnSet {
    columns: Vec<Column>,
}

impl ColumnSet {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Column> {
        self.columns.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn type_of(&self, name: &str) -> Option<ColumnType> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.ty)
    }

    pub fn get(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Validate one raw input against the named column.
    pub fn parse_value(&self, column: &str, raw: &str) -> StoreResult<Value> {
        let ty = self
            .type_of(column)
            .ok_or_else(|| StoreError::UnknownColumn(column.to_string()))?;
        ty.parse(raw).ok_or_else(|| StoreError::Validation {
            column: column.to_string(),
            expected: ty,
            value: raw.to_string(),
        })
    }

    /// Validate a full row of raw inputs, in column order. Fails on the first
    /// offending column; nothing is returned partially.
    pub fn parse_row<S: AsRef<str>>(&self, raw: &[S]) -> StoreResult<Vec<Value>> {
        if raw.len() != self.columns.len() {
            return Err(StoreError::Arity {
                expected: self.columns.len(),
                actual: raw.len(),
            });
        }
        self.columns
            .iter()
            .zip(raw)
            .map(|(col, input)| {
                let input = input.as_ref();
                col.ty.parse(input).ok_or_else(|| StoreError::Validation {
                    column: col.name.clone(),
                    expected: col.ty,
                    value: input.to_string(),
                })
            })
            .collect()
    }

    pub fn check_arity(&self, values: &[Value]) -> StoreResult<()> {
        if values.len() == self.columns.len() {
            Ok(())
        } else {
            Err(StoreError::Arity {
                expected: self.columns.len(),
                actual: values.len(),
            })
        }
    }

    /// Coerce a value read back as text (remote backends) into the column's
    /// category. Text that does not parse is kept as text.
    pub fn coerce_stored(&self, index: usize, text: Option<String>) -> Value {
        let Some(text) = text else {
            return Value::Null;
        };
        match self.columns.get(index).map(|c| c.ty) {
            Some(ColumnType::Integer) => text.trim().parse().map(Value::Integer).unwrap_or(Value::Text(text)),
            Some(ColumnType::Real) => text.trim().parse().map(Value::Real).unwrap_or(Value::Text(text)),
            _ => Value::Text(text),
        }
    }
}

impl<'a> IntoIterator for &'a ColumnSet {
    type Item = &'a Column;
    type IntoIter = std::slice::Iter<'a, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}
