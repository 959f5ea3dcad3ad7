//! YAML document -> spec tree construction.
//!
//! The walkers here only translate document shapes into typed definitions;
//! every semantic check is left to the `busspec-ir` constructors.

use crate::yaml_model::*;
use busspec_ir::*;
use serde_yaml::{Mapping, Value as Yaml};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum YamlParseError {
    #[error("YAML deserialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error(transparent)]
    Spec(#[from] SpecError),
    #[error("in {kind} {name}: {source}")]
    Context {
        kind: &'static str,
        name: String,
        #[source]
        source: Box<YamlParseError>,
    },
}

impl YamlParseError {
    /// Attach entity context; spec errors keep a single `SpecError` chain.
    pub fn within(self, kind: &'static str, name: &str) -> Self {
        match self {
            YamlParseError::Spec(e) => YamlParseError::Spec(e.within(kind, name)),
            other => YamlParseError::Context {
                kind,
                name: name.to_string(),
                source: Box::new(other),
            },
        }
    }

    pub fn root(&self) -> &YamlParseError {
        match self {
            YamlParseError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Classification for document-shape and spec errors; `None` for I/O and
    /// YAML syntax failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self.root() {
            YamlParseError::Spec(e) => Some(e.kind()),
            YamlParseError::MissingField(_) | YamlParseError::InvalidValue(_) => {
                Some(ErrorKind::Construction)
            }
            YamlParseError::Yaml(_) | YamlParseError::Io { .. } | YamlParseError::Context { .. } => None,
        }
    }
}

trait WithinExt<T> {
    fn within(self, kind: &'static str, name: &str) -> Result<T, YamlParseError>;
}

impl<T> WithinExt<T> for Result<T, YamlParseError> {
    fn within(self, kind: &'static str, name: &str) -> Result<T, YamlParseError> {
        self.map_err(|e| e.within(kind, name))
    }
}

// --- Bus documents ---

/// Parse a bus document into a BusSpec.
///
/// `source` is recorded on the bus as its locator.
pub fn parse_bus(yaml: &str, source: &str) -> Result<BusSpec, YamlParseError> {
    let doc: Yaml = serde_yaml::from_str(yaml)?;
    bus_from_value(&doc, source)
}

/// Read and parse a bus file.
pub fn load_bus_file(path: &Path) -> Result<BusSpec, YamlParseError> {
    let text = read(path)?;
    parse_bus(&text, &path.display().to_string())
}

/// Build a bus from an already loaded `{message_name -> message}` mapping.
///
/// Messages are upserted in document order, so a later message with the
/// address of an earlier one replaces it.
pub fn bus_from_value(doc: &Yaml, source: &str) -> Result<BusSpec, YamlParseError> {
    let mut bus = BusSpec::new(source);
    let messages = match doc {
        Yaml::Null => return Ok(bus),
        Yaml::Mapping(m) => m,
        other => {
            return Err(YamlParseError::InvalidValue(format!(
                "bus must be a mapping of messages, got {}",
                type_name(other)
            )));
        }
    };

    for (key, body) in messages {
        let name = key_string(key)?;
        let message = message_from_value(&name, body).within("message", &name)?;
        log::debug!(
            "{source}: message '{name}' at {:#x} with {} segments",
            message.address(),
            message.segments().len()
        );
        if let Some(old) = bus.upsert_message(message) {
            log::warn!(
                "{source}: message '{name}' overrides '{}' at the same address",
                old.name()
            );
        }
    }
    Ok(bus)
}

fn message_from_value(name: &str, body: &Yaml) -> Result<MessageSpec, YamlParseError> {
    let fields = as_mapping(body, "message")?;

    let address = fields
        .get(ADDRESS_KEY)
        .ok_or_else(|| YamlParseError::MissingField(ADDRESS_KEY.to_string()))?;
    let address = coerce_int(address, ADDRESS_KEY)?;
    let address = u32::try_from(address).map_err(|_| {
        YamlParseError::InvalidValue(format!("{ADDRESS_KEY} out of range: {address}"))
    })?;

    let mut message = MessageSpec::new(name, address);
    for (key, attrs) in fields {
        let segment_name = key_string(key)?;
        if segment_name == ADDRESS_KEY {
            continue;
        }
        let segment = segment_from_value(&segment_name, attrs).within("segment", &segment_name)?;
        message.add_segment(segment)?;
    }
    Ok(message)
}

fn segment_from_value(name: &str, attrs: &Yaml) -> Result<SegmentSpec, YamlParseError> {
    as_mapping(attrs, "segment")?;
    let doc: SegmentDoc = typed(attrs.clone())?;

    let def = SegmentDef {
        name: name.to_string(),
        width: doc.c_type.parse()?,
        unit: doc.unit,
        position: coerce_int(&doc.position, "position")?,
        length: coerce_int(&doc.length, "length")?,
        signed: doc.signed,
        big_endian: doc.is_big_endian.unwrap_or(true),
        values: doc.values.as_ref().map(enum_source).transpose()?,
    };
    Ok(SegmentSpec::new(def)?)
}

/// A list of names, or a mapping of names to integer values.
fn enum_source(doc: &Yaml) -> Result<EnumSource, SpecError> {
    match doc {
        Yaml::Sequence(items) => items
            .iter()
            .map(|item| match item {
                Yaml::String(s) => Ok(s.clone()),
                Yaml::Number(n) => Ok(n.to_string()),
                other => Err(SpecError::MalformedEnum(format!(
                    "list entries must be names, got {}",
                    type_name(other)
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(EnumSource::Sequential),
        Yaml::Mapping(pairs) => pairs
            .iter()
            .map(|(k, v)| {
                let name = key_string(k).map_err(|e| SpecError::MalformedEnum(e.to_string()))?;
                match v.as_i64() {
                    Some(value) => Ok((name, value)),
                    None => Err(SpecError::MalformedEnum(format!(
                        "value given for '{name}' is not an integer"
                    ))),
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(EnumSource::Explicit),
        other => Err(SpecError::MalformedEnum(format!(
            "expected a list or a mapping, got {}",
            type_name(other)
        ))),
    }
}

// --- System documents ---

/// Parse a system document. Protocol `source:` paths resolve against the
/// current directory.
pub fn parse_system(yaml: &str) -> Result<SystemSpec, YamlParseError> {
    parse_system_with(yaml, None)
}

/// Read and parse a system file; protocol `source:` paths resolve against
/// the file's directory.
pub fn load_system_file(path: &Path) -> Result<SystemSpec, YamlParseError> {
    let text = read(path)?;
    parse_system_with(&text, path.parent())
}

/// Parse a system document, resolving protocol `source:` paths against
/// `base_dir` when given.
pub fn parse_system_with(
    yaml: &str,
    base_dir: Option<&Path>,
) -> Result<SystemSpec, YamlParseError> {
    let doc: SystemDocument = typed(serde_yaml::from_str(yaml)?)?;

    // The validation context must exist before any board or protocol is added.
    let mut system = SystemSpec::new(doc.name, doc.architectures, doc.units);

    for (key, body) in &doc.board {
        let name = key_string(key)?;
        let board_doc: BoardDoc = from_optional(body).within("board", &name)?;
        let board = Board {
            name: name.clone(),
            architecture: board_doc.architecture,
        };
        system.add_board(board)?;
    }

    for (key, body) in &doc.protocol {
        let name = key_string(key)?;
        let protocol_doc: ProtocolDoc = from_optional(body).within("protocol", &name)?;
        let bus = protocol_bus(&name, &protocol_doc, base_dir).within("protocol", &name)?;
        system.add_protocol(Protocol::new(name, bus))?;
    }

    log::debug!(
        "system '{}': {} boards, {} protocols",
        system.name(),
        system.boards().len(),
        system.protocols().len()
    );
    Ok(system)
}

fn protocol_bus(
    name: &str,
    doc: &ProtocolDoc,
    base_dir: Option<&Path>,
) -> Result<BusSpec, YamlParseError> {
    let mut bus = match &doc.source {
        Some(source) => {
            let path = match base_dir {
                Some(dir) => dir.join(source),
                None => PathBuf::from(source),
            };
            load_bus_file(&path)?
        }
        None => BusSpec::new(format!("protocol:{name}")),
    };
    if let Some(inline) = &doc.bus {
        let layer = bus_from_value(inline, &format!("protocol:{name}"))?;
        bus.merge(layer);
    }
    Ok(bus)
}

// --- Helpers ---

fn read(path: &Path) -> Result<String, YamlParseError> {
    std::fs::read_to_string(path).map_err(|source| YamlParseError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Deserialize an attribute bag, treating an empty body as all defaults.
fn from_optional<T>(body: &Yaml) -> Result<T, YamlParseError>
where
    T: serde::de::DeserializeOwned + Default,
{
    match body {
        Yaml::Null => Ok(T::default()),
        other => typed(other.clone()),
    }
}

/// Deserialize a typed document part. Shape mismatches such as a missing
/// field or an unknown key are construction errors, not syntax errors.
fn typed<T: serde::de::DeserializeOwned>(v: Yaml) -> Result<T, YamlParseError> {
    serde_yaml::from_value(v).map_err(|e| YamlParseError::InvalidValue(e.to_string()))
}

fn as_mapping<'a>(v: &'a Yaml, what: &str) -> Result<&'a Mapping, YamlParseError> {
    v.as_mapping().ok_or_else(|| {
        YamlParseError::InvalidValue(format!("{what} must be a mapping, got {}", type_name(v)))
    })
}

/// Accept integers, integral floats and decimal or `0x` hex strings.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn coerce_int(v: &Yaml, field: &str) -> Result<i64, YamlParseError> {
    let invalid = || YamlParseError::InvalidValue(format!("{field} is not an integer: {v:?}"));
    match v {
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(f as i64),
                    _ => Err(invalid()),
                }
            }
        }
        Yaml::String(s) => {
            let s = s.trim();
            let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => i64::from_str_radix(hex, 16),
                None => s.parse::<i64>(),
            };
            parsed.map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

fn key_string(key: &Yaml) -> Result<String, YamlParseError> {
    match key {
        Yaml::String(s) => Ok(s.clone()),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        other => Err(YamlParseError::InvalidValue(format!(
            "keys must be scalars, got {}",
            type_name(other)
        ))),
    }
}

fn type_name(v: &Yaml) -> &'static str {
    match v {
        Yaml::Null => "null",
        Yaml::Bool(_) => "a boolean",
        Yaml::Number(_) => "a number",
        Yaml::String(_) => "a string",
        Yaml::Sequence(_) => "a list",
        Yaml::Mapping(_) => "a mapping",
        Yaml::Tagged(_) => "a tagged value",
    }
}
