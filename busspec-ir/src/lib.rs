//! Typed model of a bus communication spec and the frame decode engine.
//!
//! Entities are validated once, on construction, and are read-only after
//! that; decoding only borrows the tree and can run from many threads.

pub mod bus;
pub mod error;
pub mod frame;
pub mod message;
pub mod rules;
pub mod segment;
pub mod system;
pub mod types;
pub mod unique;
pub mod units;
pub mod validate;

pub use bus::BusSpec;
pub use error::{DecodeError, ErrorKind, ResultExt, SpecError};
pub use frame::{BitSource, Frame};
pub use message::MessageSpec;
pub use rules::{Hook, RuleSet, Validator, rule};
pub use segment::{SegmentDef, SegmentSpec};
pub use system::{Board, Protocol, SystemContext, SystemSpec};
pub use types::*;
pub use unique::{KeyValue, Unique, UniqueKey};
pub use units::{Quantity, UnitConversion, UnitError, UnitRegistry};
pub use validate::{Issue, Severity, lint_bus, lint_system};
