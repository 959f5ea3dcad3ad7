//! Serde-deserializable shapes of the system and bus documents.
//!
//! Only the fixed-shape parts are typed here. Bus documents mix the reserved
//! `can_id` key with user-chosen segment names, so they are walked as
//! `serde_yaml::Value` in parser.rs.

use serde::{Deserialize, Serialize};

/// Root of a system document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemDocument {
    pub name: String,
    #[serde(default)]
    pub architectures: Vec<String>,
    #[serde(default)]
    pub units: Vec<String>,
    /// Board name -> [`BoardDoc`], in document order.
    #[serde(default)]
    pub board: serde_yaml::Mapping,
    /// Protocol name -> [`ProtocolDoc`], in document order.
    #[serde(default)]
    pub protocol: serde_yaml::Mapping,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoardDoc {
    #[serde(default)]
    pub architecture: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolDoc {
    /// Bus file, relative to the system document.
    #[serde(default)]
    pub source: Option<String>,
    /// Inline bus; layered over `source` when both are given.
    #[serde(default)]
    pub bus: Option<serde_yaml::Value>,
}

/// Attributes of one segment inside a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SegmentDoc {
    pub position: serde_yaml::Value,
    pub length: serde_yaml::Value,
    pub c_type: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub signed: Option<bool>,
    #[serde(default)]
    pub is_big_endian: Option<bool>,
    #[serde(default, rename = "enum")]
    pub values: Option<serde_yaml::Value>,
}

/// The message key holding the bus address.
pub const ADDRESS_KEY: &str = "can_id";
