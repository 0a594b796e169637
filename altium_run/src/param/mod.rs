//! Conversion of script function arguments into DelphiScript literals.
//!
//! Strings are emitted between single quotes without escaping, so a string containing `'`
//! produces an invalid literal. Callers that need quotes must escape them themselves.

use arcstr::ArcStr;
use itertools::Itertools;

use crate::error::{ErrorSource, Result};


/// An argument passed to the script function.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Param>),
    /// A value with no DelphiScript literal form.
    Other { type_name: ArcStr },
}

impl Param {
    pub fn type_name(&self) -> &str {
        match self {
            Param::Str(_) => "string",
            Param::Int(_) => "integer",
            Param::Float(_) => "float",
            Param::Bool(_) => "boolean",
            Param::List(_) => "list",
            Param::Other { type_name } => type_name.as_str(),
        }
    }

    /// Parses a single TOML value literal, such as `"text"`, `3`, `2.5`, `true` or `[1, "a"]`.
    pub fn parse_literal(literal: &str) -> Result<Self> {
        let mut table: toml::Table = toml::from_str(&format!("value = {literal}"))?;
        let value = table
            .remove("value")
            .ok_or_else(|| {
                ErrorSource::InvalidArgument(format!("no value in literal `{literal}`"))
            })?;
        Ok(value.into())
    }

    /// The first value, depth first, that cannot be serialized.
    fn first_unsupported(&self) -> Option<&Param> {
        match self {
            Param::Float(f) if !f.is_finite() => Some(self),
            Param::List(items) => items.iter().find_map(Param::first_unsupported),
            Param::Other { .. } => Some(self),
            _ => None,
        }
    }
}

/// Serializes `param` into a DelphiScript literal.
///
/// Returns `None` for values without a literal form: [`Param::Other`], non-finite floats and
/// lists containing either.
pub fn serialize(param: &Param) -> Option<String> {
    match param {
        Param::Str(s) => Some(format!("'{s}'")),
        Param::Int(i) => Some(i.to_string()),
        // Debug formatting keeps the decimal point on integral values.
        Param::Float(f) if f.is_finite() => Some(format!("{f:?}")),
        Param::Float(_) => None,
        Param::Bool(true) => Some("True".to_string()),
        Param::Bool(false) => Some("False".to_string()),
        Param::List(items) => {
            let items = items.iter().map(serialize).collect::<Option<Vec<_>>>()?;
            Some(format!("[{}]", items.iter().join(", ")))
        }
        Param::Other { .. } => None,
    }
}

/// Serializes an argument list, in order, separated by `", "`.
///
/// Fails on the first argument without a literal form.
pub fn serialize_params(params: &[Param]) -> Result<String> {
    let mut parts = Vec::with_capacity(params.len());
    for (index, param) in params.iter().enumerate() {
        match serialize(param) {
            Some(part) => parts.push(part),
            None => {
                let type_name = param
                    .first_unsupported()
                    .unwrap_or(param)
                    .type_name()
                    .into();
                return Err(ErrorSource::UnsupportedParameter { index, type_name }.into());
            }
        }
    }
    Ok(parts.join(", "))
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Param {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<Param>> From<Vec<T>> for Param {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<toml::Value> for Param {
    fn from(value: toml::Value) -> Self {
        use toml::Value;
        match value {
            Value::String(s) => Self::Str(s),
            Value::Integer(i) => Self::Int(i),
            Value::Float(f) => Self::Float(f),
            Value::Boolean(b) => Self::Bool(b),
            Value::Array(items) => Self::List(items.into_iter().map(Into::into).collect()),
            Value::Datetime(_) => Self::Other {
                type_name: arcstr::literal!("datetime"),
            },
            Value::Table(_) => Self::Other {
                type_name: arcstr::literal!("table"),
            },
        }
    }
}
