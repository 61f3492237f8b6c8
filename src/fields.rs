//! Field introspection: the labelled values each box exposes for display.

use crate::boxes::{BoxView, FullBoxHeader};
use serde::{Serialize, Serializer};
use std::any::Any;
use std::fmt;

/// Raw value of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    UInt(u64),
    /// Rendered as `0x` followed by `width` upper-case hex digits.
    Hex { value: u64, width: usize },
    Text(String),
    Matrix([[u32; 3]; 3]),
    /// Explicit "nothing here" marker, distinct from an empty string.
    Empty,
}

impl FieldValue {
    pub fn hex32(value: u32) -> Self {
        FieldValue::Hex {
            value: value as u64,
            width: 8,
        }
    }

    pub fn hex16(value: u16) -> Self {
        FieldValue::Hex {
            value: value as u64,
            width: 4,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::UInt(v) | FieldValue::Hex { value: v, .. } => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::UInt(v) => write!(f, "{v}"),
            FieldValue::Hex { value, width } => write!(f, "0x{value:0width$X}"),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Matrix(m) => write!(f, "{m:?}"),
            FieldValue::Empty => write!(f, "<empty>"),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::UInt(v) => s.serialize_u64(*v),
            FieldValue::Matrix(m) => m.serialize(s),
            other => s.collect_str(other),
        }
    }
}

/// One labelled value, with an optional human-readable rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub label: &'static str,
    pub raw: FieldValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
}

impl Field {
    pub fn new(label: &'static str, raw: FieldValue) -> Self {
        Self {
            label,
            raw,
            formatted: None,
        }
    }

    pub fn formatted(label: &'static str, raw: FieldValue, formatted: impl Into<String>) -> Self {
        Self {
            label,
            raw,
            formatted: Some(formatted.into()),
        }
    }

    pub fn uint(label: &'static str, v: impl Into<u64>) -> Self {
        Self::new(label, FieldValue::UInt(v.into()))
    }

    pub fn text(label: &'static str, s: impl Into<String>) -> Self {
        Self::new(label, FieldValue::Text(s.into()))
    }
}

/// Item of a box's introspection sequence.
#[derive(Debug)]
pub enum Entry<'t> {
    Field(Field),
    Box(BoxView<'t>),
}

/// Implemented by box bodies that come from decoders registered outside
/// this crate.
pub trait FieldSource: fmt::Debug + Send + Sync + 'static {
    fn fields(&self) -> Vec<Field>;

    fn as_any(&self) -> &dyn Any;
}

impl FullBoxHeader {
    pub fn fields(&self) -> Vec<Field> {
        vec![
            Field::uint("version", self.version),
            Field::new(
                "flags",
                FieldValue::Hex {
                    value: self.flags as u64,
                    width: 6,
                },
            ),
        ]
    }
}

/// Renders a 16.16 fixed-point value without trailing zeros.
pub(crate) fn fixed_16_16(v: u32) -> String {
    format!("{}", v as f64 / 65536.0)
}

/// Renders an 8.8 fixed-point value without trailing zeros.
pub(crate) fn fixed_8_8(v: u16) -> String {
    format!("{}", v as f64 / 256.0)
}
