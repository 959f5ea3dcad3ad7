use crate::bus::BusSpec;
use crate::error::{DecodeError, ResultExt, SpecError};
use crate::frame::Frame;
use crate::rules::{Hook, RuleSet, Validator};
use crate::types::Value;
use crate::unique::{KeyValue, Unique, UniqueKey};
use crate::units::UnitConversion;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

// --- Entities ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Board {
    pub name: String,
    pub architecture: Option<String>,
}

impl Board {
    pub fn new(name: impl Into<String>) -> Self {
        Board {
            name: name.into(),
            architecture: None,
        }
    }

    pub fn with_architecture(mut self, architecture: impl Into<String>) -> Self {
        self.architecture = Some(architecture.into());
        self
    }
}

/// A named protocol and the bus layout it carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Protocol {
    pub name: String,
    pub bus: BusSpec,
}

impl Protocol {
    pub fn new(name: impl Into<String>, bus: BusSpec) -> Self {
        Protocol {
            name: name.into(),
            bus,
        }
    }
}

/// The declarations add-time rules check against.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SystemContext {
    pub architectures: BTreeSet<String>,
    pub units: BTreeSet<String>,
}

// --- Rules ---

/// Rejects boards naming an architecture the system does not declare.
pub struct KnownArchitecture;

impl Validator<Board, SystemContext> for KnownArchitecture {
    fn name(&self) -> &str {
        "known-architecture"
    }

    fn validate(&self, board: &Board, context: &SystemContext) -> Result<(), String> {
        match board.architecture.as_deref() {
            Some(arch) if !arch.is_empty() && !context.architectures.contains(arch) => {
                Err(format!("unknown architecture: {arch}"))
            }
            _ => Ok(()),
        }
    }
}

/// Rejects protocols whose segments use a unit the system does not declare.
pub struct DeclaredUnits;

impl Validator<Protocol, SystemContext> for DeclaredUnits {
    fn name(&self) -> &str {
        "declared-units"
    }

    fn validate(&self, protocol: &Protocol, context: &SystemContext) -> Result<(), String> {
        let undeclared: Vec<&str> = protocol
            .bus
            .units()
            .into_iter()
            .filter(|u| !context.units.contains(*u))
            .collect();
        if undeclared.is_empty() {
            Ok(())
        } else {
            Err(format!("undeclared units: {}", undeclared.join(", ")))
        }
    }
}

fn board_name(board: &Board) -> KeyValue {
    KeyValue::Text(board.name.clone())
}

fn protocol_name(protocol: &Protocol) -> KeyValue {
    KeyValue::Text(protocol.name.clone())
}

pub fn board_collection() -> Unique<Board, SystemContext> {
    Unique::new(&[UniqueKey::new("name", board_name)])
        .with_rules(RuleSet::new().with(Hook::PreAdd, KnownArchitecture))
}

pub fn protocol_collection() -> Unique<Protocol, SystemContext> {
    Unique::new(&[UniqueKey::new("name", protocol_name)])
        .with_rules(RuleSet::new().with(Hook::PreAdd, DeclaredUnits))
}

// --- System ---

/// Top-level aggregate of boards and protocols.
#[derive(Debug, Clone, Serialize)]
pub struct SystemSpec {
    name: String,
    context: SystemContext,
    boards: Unique<Board, SystemContext>,
    protocols: Unique<Protocol, SystemContext>,
}

impl SystemSpec {
    /// An empty system with its validation context declared.
    pub fn new<A, U>(name: impl Into<String>, architectures: A, units: U) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        U: IntoIterator,
        U::Item: Into<String>,
    {
        SystemSpec {
            name: name.into(),
            context: SystemContext {
                architectures: architectures.into_iter().map(Into::into).collect(),
                units: units.into_iter().map(Into::into).collect(),
            },
            boards: board_collection(),
            protocols: protocol_collection(),
        }
    }

    /// Build a complete system from already constructed boards and protocols.
    pub fn build<A, U>(
        name: impl Into<String>,
        architectures: A,
        units: U,
        boards: Vec<Board>,
        protocols: Vec<Protocol>,
    ) -> Result<Self, SpecError>
    where
        A: IntoIterator,
        A::Item: Into<String>,
        U: IntoIterator,
        U::Item: Into<String>,
    {
        let mut system = Self::new(name, architectures, units);
        system.extend_boards(boards)?;
        system.extend_protocols(protocols)?;
        log::debug!(
            "system '{}': {} boards, {} protocols",
            system.name,
            system.boards.len(),
            system.protocols.len()
        );
        Ok(system)
    }

    pub fn add_board(&mut self, board: Board) -> Result<(), SpecError> {
        let name = board.name.clone();
        self.boards
            .safe_add(board, &self.context)
            .within("board", &name)
    }

    pub fn add_protocol(&mut self, protocol: Protocol) -> Result<(), SpecError> {
        let name = protocol.name.clone();
        self.protocols
            .safe_add(protocol, &self.context)
            .within("protocol", &name)
    }

    /// Add boards in order; boards added before a failure are kept.
    pub fn extend_boards<I>(&mut self, boards: I) -> Result<(), SpecError>
    where
        I: IntoIterator<Item = Board>,
    {
        boards.into_iter().try_for_each(|b| self.add_board(b))
    }

    /// Add protocols in order; protocols added before a failure are kept.
    pub fn extend_protocols<I>(&mut self, protocols: I) -> Result<(), SpecError>
    where
        I: IntoIterator<Item = Protocol>,
    {
        protocols.into_iter().try_for_each(|p| self.add_protocol(p))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &SystemContext {
        &self.context
    }

    pub fn architectures(&self) -> &BTreeSet<String> {
        &self.context.architectures
    }

    pub fn units(&self) -> &BTreeSet<String> {
        &self.context.units
    }

    pub fn boards(&self) -> &Unique<Board, SystemContext> {
        &self.boards
    }

    pub fn protocols(&self) -> &Unique<Protocol, SystemContext> {
        &self.protocols
    }

    pub fn board(&self, name: &str) -> Option<&Board> {
        self.boards.get(name)
    }

    pub fn protocol(&self, name: &str) -> Option<&Protocol> {
        self.protocols.get(name)
    }

    /// Decode `frame` on the bus of the named protocol.
    pub fn interpret(
        &self,
        protocol: &str,
        frame: &Frame,
        units: &dyn UnitConversion,
    ) -> Result<BTreeMap<String, Value>, DecodeError> {
        self.protocol(protocol)
            .ok_or_else(|| DecodeError::UnknownProtocol(protocol.to_string()))?
            .bus
            .interpret(frame, units)
    }
}
