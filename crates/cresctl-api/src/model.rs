// ── Schema and value types ──
//
// A category's field schema is an ordered list of `Field`s per instance.
// Order is the positional contract with the device: the i-th token of a
// batched response belongs to the i-th requested path.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::codec;
use crate::error::Error;

/// Device subsystem a point belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Category {
    Sensor,
    Fan,
    Output,
    Input,
    Switch,
    System,
    Other,
}

/// Declared wire type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Float,
    Text,
}

impl FieldKind {
    /// Convert one response token into a typed value.
    pub fn decode(self, token: &str) -> Result<Value, Error> {
        match self {
            Self::Bool => Ok(Value::Bool(codec::parse_bool(token))),
            Self::Float => codec::parse_float(token).map(Value::Float),
            Self::Text => Ok(Value::Text(token.to_owned())),
        }
    }
}

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Float(f64),
    Text(String),
}

impl Value {
    /// Encode for the right-hand side of a `path=value` segment.
    pub fn to_wire(&self) -> String {
        match self {
            Self::Bool(true) => "1".into(),
            Self::Bool(false) => "0".into(),
            Self::Float(v) => v.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Parse user input according to a field's declared kind.
    pub fn parse_as(kind: FieldKind, raw: &str) -> Result<Self, Error> {
        match kind {
            FieldKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" => Ok(Self::Bool(true)),
                "0" | "false" | "off" => Ok(Self::Bool(false)),
                _ => Err(Error::Type {
                    token: raw.to_owned(),
                    expected: "boolean",
                }),
            },
            other => other.decode(raw),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// Attribute map view of one instance, in schema order.
pub type Attributes = IndexMap<String, Value>;

/// One remote attribute of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub writable: bool,
}

impl Field {
    pub const fn rw(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            writable: true,
        }
    }

    pub const fn ro(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            writable: false,
        }
    }
}

/// One addressable unit of a category together with its field schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub id: String,
    /// Path prefix including the trailing `:` (e.g. `out-a:`).
    pub prefix: String,
    pub fields: Vec<Field>,
}

impl Instance {
    pub fn new(id: impl Into<String>, prefix: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            id: id.into(),
            prefix: prefix.into(),
            fields,
        }
    }

    /// Full attribute path of a field, e.g. `out-a:voltage`.
    pub fn path(&self, field: &str) -> String {
        format!("{}{field}", self.prefix)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Typed per-instance state that can be addressed field-by-field.
///
/// `get` returning `None` means "not applicable / not reported" and
/// the field is omitted from the attribute map.
pub trait InstanceState: Default + Clone + Send + Sync + 'static {
    fn get(&self, field: &str) -> Option<Value>;

    fn set(&mut self, field: &str, value: Value) -> Result<(), Error>;

    /// Attribute map restricted to the instance's schema.
    fn attributes(&self, instance: &Instance) -> Attributes {
        instance
            .fields
            .iter()
            .filter_map(|f| self.get(f.name).map(|v| (f.name.to_owned(), v)))
            .collect()
    }
}

/// Shared helper for `InstanceState::set` implementations.
pub(crate) fn expect_bool(field: &str, value: &Value) -> Result<bool, Error> {
    value.as_bool().ok_or_else(|| Error::Type {
        token: format!("{field}={value}"),
        expected: "boolean",
    })
}

pub(crate) fn expect_f64(field: &str, value: &Value) -> Result<f64, Error> {
    value.as_f64().ok_or_else(|| Error::Type {
        token: format!("{field}={value}"),
        expected: "float",
    })
}

pub(crate) fn expect_text(field: &str, value: Value) -> Result<String, Error> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(Error::Type {
            token: format!("{field}={other}"),
            expected: "text",
        }),
    }
}
