// Typed field values as stored in the inventory table

use std::fmt;

use serde::Serialize;

/// A single stored field. `Null` is the semantic "no value" (blank input).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Trimmed display text used as a matching key. `None` for null or blank.
    pub fn as_key(&self) -> Option<String> {
        let text = self.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Integer reading of the value: integers, integral reals and numeric text.
    /// Fractional reals and non-numeric text yield `None`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Null => None,
            Value::Integer(n) => Some(*n),
            Value::Real(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => Some(*f as i64),
            Value::Real(_) => None,
            Value::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Numeric reading used for sorting numeric columns.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Integer(n) => Some(*n as f64),
            Value::Real(f) => Some(*f),
            Value::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Real(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Real(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Render a full row for audit messages, e.g. `[A100, 20, NULL]`.
pub fn format_values(values: &[Value]) -> String {
    let parts: Vec<String> = values
        .iter()
        .map(|v| match v {
            Value::Null => "NULL".to_string(),
            other => other.to_string(),
        })
        .collect();
    format!("[{}]", parts.join(", "))
}
