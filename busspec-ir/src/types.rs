use crate::error::SpecError;
use crate::units::Quantity;
use serde::Serialize;
use std::str::FromStr;

// --- Field types ---

/// Declared storage type of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WidthType {
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "int8_t")]
    Int8,
    #[serde(rename = "uint8_t")]
    UInt8,
    #[serde(rename = "int16_t")]
    Int16,
    #[serde(rename = "uint16_t")]
    UInt16,
    #[serde(rename = "int32_t")]
    Int32,
    #[serde(rename = "uint32_t")]
    UInt32,
    #[serde(rename = "int64_t")]
    Int64,
    #[serde(rename = "uint64_t")]
    UInt64,
}

impl WidthType {
    /// Bit width of the type; `None` for `Bool`, which accepts any length.
    pub fn bits(self) -> Option<u32> {
        match self {
            WidthType::Bool => None,
            WidthType::Int8 | WidthType::UInt8 => Some(8),
            WidthType::Int16 | WidthType::UInt16 => Some(16),
            WidthType::Int32 | WidthType::UInt32 => Some(32),
            WidthType::Int64 | WidthType::UInt64 => Some(64),
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            WidthType::Int8 | WidthType::Int16 | WidthType::Int32 | WidthType::Int64
        )
    }

    pub fn c_name(self) -> &'static str {
        match self {
            WidthType::Bool => "bool",
            WidthType::Int8 => "int8_t",
            WidthType::UInt8 => "uint8_t",
            WidthType::Int16 => "int16_t",
            WidthType::UInt16 => "uint16_t",
            WidthType::Int32 => "int32_t",
            WidthType::UInt32 => "uint32_t",
            WidthType::Int64 => "int64_t",
            WidthType::UInt64 => "uint64_t",
        }
    }
}

impl FromStr for WidthType {
    type Err = SpecError;

    /// Accepts C names (`uint16_t`) and their short forms (`uint16`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let short = name.strip_suffix("_t").unwrap_or(name);
        match short {
            "bool" => Ok(WidthType::Bool),
            "int8" => Ok(WidthType::Int8),
            "uint8" => Ok(WidthType::UInt8),
            "int16" => Ok(WidthType::Int16),
            "uint16" => Ok(WidthType::UInt16),
            "int32" => Ok(WidthType::Int32),
            "uint32" => Ok(WidthType::UInt32),
            "int64" => Ok(WidthType::Int64),
            "uint64" => Ok(WidthType::UInt64),
            _ => Err(SpecError::UnknownWidthType(s.to_string())),
        }
    }
}

impl std::fmt::Display for WidthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.c_name())
    }
}

// --- Enum values ---

/// One named constant of a segment's value set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ValueEntry {
    pub name: String,
    pub value: i64,
}

impl ValueEntry {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        ValueEntry {
            name: name.into(),
            value,
        }
    }
}

/// The accepted shapes of an enum declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumSource {
    /// Names in order; values are assigned `0..n`.
    Sequential(Vec<String>),
    /// Explicit name to value pairs, in declaration order.
    Explicit(Vec<(String, i64)>),
    Prebuilt(Vec<ValueEntry>),
}

impl EnumSource {
    pub fn sequential<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EnumSource::Sequential(names.into_iter().map(Into::into).collect())
    }

    /// Resolve to entries in declaration order.
    pub fn into_entries(self) -> Vec<ValueEntry> {
        match self {
            EnumSource::Sequential(names) => names
                .into_iter()
                .zip(0i64..)
                .map(|(name, value)| ValueEntry { name, value })
                .collect(),
            EnumSource::Explicit(pairs) => pairs
                .into_iter()
                .map(|(name, value)| ValueEntry { name, value })
                .collect(),
            EnumSource::Prebuilt(entries) => entries,
        }
    }
}

// --- Decoded values ---

/// The result of decoding one segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Enum(String),
    Quantity(Quantity),
}

impl Value {
    /// Numeric magnitude, if the value has one.
    pub fn magnitude(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            Value::Enum(_) => None,
            Value::Quantity(q) => Some(q.magnitude),
        }
    }

    pub fn as_enum(&self) -> Option<&str> {
        match self {
            Value::Enum(name) => Some(name),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Enum(name) => f.write_str(name),
            Value::Quantity(q) => write!(f, "{q}"),
        }
    }
}
