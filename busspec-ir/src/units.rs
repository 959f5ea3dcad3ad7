//! Physical quantities and the unit conversion interface.
//!
//! Decoding depends only on [`UnitConversion`]; [`UnitRegistry`] is the
//! bundled implementation, a table of linear unit definitions grouped by
//! dimension. Registries are plain values, so differently configured ones can
//! be used side by side.

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("undefined unit '{0}'")]
    Undefined(String),
    #[error("cannot convert from '{from}' ({from_dim}) to '{to}' ({to_dim})")]
    Incompatible {
        from: String,
        from_dim: String,
        to: String,
        to_dim: String,
    },
}

/// A magnitude tagged with a unit symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quantity {
    pub magnitude: f64,
    pub unit: String,
}

impl Quantity {
    /// Convert to `target` using `units`.
    pub fn to(&self, units: &dyn UnitConversion, target: &str) -> Result<Quantity, UnitError> {
        let magnitude = units.convert(self, target)?;
        units.to_quantity(magnitude, target)
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}

/// The unit service consumed by the decode engine.
pub trait UnitConversion: Send + Sync {
    fn to_quantity(&self, magnitude: f64, unit: &str) -> Result<Quantity, UnitError>;

    /// Magnitude of `quantity` expressed in `target`.
    fn convert(&self, quantity: &Quantity, target: &str) -> Result<f64, UnitError>;
}

/// Linear definition: `base = magnitude * factor + offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDef {
    pub dimension: String,
    pub factor: f64,
    pub offset: f64,
}

#[derive(Debug, Clone)]
pub struct UnitRegistry {
    units: HashMap<String, UnitDef>,
}

const DEFAULT_UNITS: &[(&str, &str, f64, f64)] = &[
    ("1", "dimensionless", 1.0, 0.0),
    ("%", "dimensionless", 0.01, 0.0),
    ("m", "length", 1.0, 0.0),
    ("km", "length", 1000.0, 0.0),
    ("cm", "length", 0.01, 0.0),
    ("mm", "length", 0.001, 0.0),
    ("mi", "length", 1609.344, 0.0),
    ("ft", "length", 0.3048, 0.0),
    ("in", "length", 0.0254, 0.0),
    ("s", "time", 1.0, 0.0),
    ("ms", "time", 1e-3, 0.0),
    ("us", "time", 1e-6, 0.0),
    ("min", "time", 60.0, 0.0),
    ("h", "time", 3600.0, 0.0),
    ("m/s", "speed", 1.0, 0.0),
    ("km/h", "speed", 1.0 / 3.6, 0.0),
    ("mph", "speed", 0.44704, 0.0),
    ("m/s^2", "acceleration", 1.0, 0.0),
    ("Hz", "frequency", 1.0, 0.0),
    ("kHz", "frequency", 1e3, 0.0),
    ("rpm", "frequency", 1.0 / 60.0, 0.0),
    ("V", "voltage", 1.0, 0.0),
    ("mV", "voltage", 1e-3, 0.0),
    ("kV", "voltage", 1e3, 0.0),
    ("A", "current", 1.0, 0.0),
    ("mA", "current", 1e-3, 0.0),
    ("ohm", "resistance", 1.0, 0.0),
    ("W", "power", 1.0, 0.0),
    ("mW", "power", 1e-3, 0.0),
    ("kW", "power", 1e3, 0.0),
    ("J", "energy", 1.0, 0.0),
    ("kJ", "energy", 1e3, 0.0),
    ("Wh", "energy", 3600.0, 0.0),
    ("kWh", "energy", 3.6e6, 0.0),
    ("C", "charge", 1.0, 0.0),
    ("Ah", "charge", 3600.0, 0.0),
    ("mAh", "charge", 3.6, 0.0),
    ("K", "temperature", 1.0, 0.0),
    ("degC", "temperature", 1.0, 273.15),
    ("degF", "temperature", 5.0 / 9.0, 459.67 * 5.0 / 9.0),
    ("Pa", "pressure", 1.0, 0.0),
    ("kPa", "pressure", 1e3, 0.0),
    ("MPa", "pressure", 1e6, 0.0),
    ("bar", "pressure", 1e5, 0.0),
    ("psi", "pressure", 6894.757, 0.0),
    ("rad", "angle", 1.0, 0.0),
    ("deg", "angle", std::f64::consts::PI / 180.0, 0.0),
    ("g", "mass", 1e-3, 0.0),
    ("kg", "mass", 1.0, 0.0),
    ("N", "force", 1.0, 0.0),
    ("Nm", "torque", 1.0, 0.0),
];

impl UnitRegistry {
    /// A registry preloaded with common SI and automotive units.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for &(symbol, dimension, factor, offset) in DEFAULT_UNITS {
            registry.define(symbol, dimension, factor, offset);
        }
        registry
    }

    pub fn empty() -> Self {
        UnitRegistry {
            units: HashMap::new(),
        }
    }

    /// Define or redefine `symbol`.
    pub fn define(&mut self, symbol: &str, dimension: &str, factor: f64, offset: f64) {
        self.units.insert(
            symbol.to_string(),
            UnitDef {
                dimension: dimension.to_string(),
                factor,
                offset,
            },
        );
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.units.contains_key(symbol)
    }

    pub fn definition(&self, symbol: &str) -> Result<&UnitDef, UnitError> {
        self.units
            .get(symbol)
            .ok_or_else(|| UnitError::Undefined(symbol.to_string()))
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitConversion for UnitRegistry {
    fn to_quantity(&self, magnitude: f64, unit: &str) -> Result<Quantity, UnitError> {
        self.definition(unit)?;
        Ok(Quantity {
            magnitude,
            unit: unit.to_string(),
        })
    }

    fn convert(&self, quantity: &Quantity, target: &str) -> Result<f64, UnitError> {
        let from = self.definition(&quantity.unit)?;
        let to = self.definition(target)?;
        if from.dimension != to.dimension {
            return Err(UnitError::Incompatible {
                from: quantity.unit.clone(),
                from_dim: from.dimension.clone(),
                to: target.to_string(),
                to_dim: to.dimension.clone(),
            });
        }
        let base = quantity.magnitude * from.factor + from.offset;
        Ok((base - to.offset) / to.factor)
    }
}
