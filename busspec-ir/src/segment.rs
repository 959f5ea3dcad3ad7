//! Bit-field segments and the decode engine.

use crate::error::{DecodeError, ResultExt, SpecError};
use crate::frame::{BitSource, FRAME_BITS};
use crate::types::{EnumSource, Value, ValueEntry, WidthType};
use crate::unique::{KeyValue, Unique, UniqueKey};
use crate::units::UnitConversion;
use serde::Serialize;

/// Unvalidated segment attributes, as declared.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDef {
    pub name: String,
    pub width: WidthType,
    pub unit: Option<String>,
    pub position: i64,
    pub length: i64,
    /// When absent, signedness follows `width`.
    pub signed: Option<bool>,
    pub big_endian: bool,
    pub values: Option<EnumSource>,
}

impl SegmentDef {
    pub fn new(name: impl Into<String>, width: WidthType, position: i64, length: i64) -> Self {
        SegmentDef {
            name: name.into(),
            width,
            unit: None,
            position,
            length,
            signed: None,
            big_endian: true,
            values: None,
        }
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn signed(mut self, signed: bool) -> Self {
        self.signed = Some(signed);
        self
    }

    pub fn big_endian(mut self, big_endian: bool) -> Self {
        self.big_endian = big_endian;
        self
    }

    pub fn values(mut self, values: EnumSource) -> Self {
        self.values = Some(values);
        self
    }
}

fn entry_name(entry: &ValueEntry) -> KeyValue {
    KeyValue::Text(entry.name.clone())
}

fn entry_value(entry: &ValueEntry) -> KeyValue {
    KeyValue::Int(entry.value)
}

/// Value sets are unique on both name and value.
pub fn value_set() -> Unique<ValueEntry> {
    Unique::new(&[
        UniqueKey::new("name", entry_name),
        UniqueKey::new("value", entry_value),
    ])
}

/// A validated bit-field definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSpec {
    name: String,
    width: WidthType,
    unit: Option<String>,
    position: u32,
    length: u32,
    signed: bool,
    big_endian: bool,
    values: Unique<ValueEntry>,
}

impl SegmentSpec {
    /// Validate `def` and build the segment.
    pub fn new(def: SegmentDef) -> Result<Self, SpecError> {
        let SegmentDef {
            name,
            width,
            unit,
            position,
            length,
            signed,
            big_endian,
            values,
        } = def;

        if !(0..=i64::from(FRAME_BITS)).contains(&position) {
            return Err(SpecError::InvalidPosition(position));
        }
        if length < 1 {
            return Err(SpecError::LengthTooSmall(length));
        }
        if position + length > i64::from(FRAME_BITS) {
            return Err(SpecError::LengthOverflow { position, length });
        }
        let position = u32::try_from(position).map_err(|_| SpecError::InvalidPosition(position))?;
        let length = u32::try_from(length).map_err(|_| SpecError::LengthTooSmall(length))?;

        let signed = match signed {
            Some(s) if s != width.is_signed() => {
                return Err(SpecError::SignednessMismatch { width, signed: s });
            }
            _ => width.is_signed(),
        };

        let mut set = value_set();
        if let Some(source) = values {
            for entry in source.into_entries() {
                let entry_name = entry.name.clone();
                set.add(entry).within("value", &entry_name)?;
            }
        }

        // Enum fields decode the raw bits by lookup; type width and byte order
        // only constrain fields that are reinterpreted.
        if set.is_empty() {
            if let Some(bits) = width.bits() {
                if length > bits {
                    return Err(SpecError::WidthTooNarrow { width, length });
                }
                if !big_endian && length % 8 != 0 {
                    return Err(SpecError::UnalignedLittleEndian(length));
                }
            }
        }

        Ok(SegmentSpec {
            name,
            width,
            unit: unit.filter(|u| !u.is_empty()),
            position,
            length,
            signed,
            big_endian,
            values: set,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> WidthType {
        self.width
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn is_big_endian(&self) -> bool {
        self.big_endian
    }

    pub fn values(&self) -> &Unique<ValueEntry> {
        &self.values
    }

    /// The raw unsigned bits this segment occupies in `frame`.
    pub fn extract<B: BitSource + ?Sized>(&self, frame: &B) -> u64 {
        frame.bits(self.position, self.length)
    }

    /// Decode this segment's bits from `frame`.
    pub fn decode<B: BitSource + ?Sized>(
        &self,
        frame: &B,
        units: &dyn UnitConversion,
    ) -> Result<Value, DecodeError> {
        let raw = self.extract(frame);

        if !self.values.is_empty() {
            return i64::try_from(raw)
                .ok()
                .and_then(|v| self.values.lookup("value", v).ok())
                .map(|entry| Value::Enum(entry.name.clone()))
                .ok_or(DecodeError::UnknownEnumValue { raw });
        }

        let value = self.reinterpret(raw);
        match &self.unit {
            Some(unit) => {
                let magnitude = value.magnitude().unwrap_or_default();
                Ok(Value::Quantity(units.to_quantity(magnitude, unit)?))
            }
            None => Ok(value),
        }
    }

    fn reinterpret(&self, raw: u64) -> Value {
        if self.width == WidthType::Bool {
            return Value::Bool(raw != 0);
        }
        let raw = if self.big_endian {
            raw
        } else {
            swap_bytes(raw, self.length)
        };
        if self.signed {
            Value::Int(sign_extend(raw, self.length))
        } else {
            Value::UInt(raw)
        }
    }
}

/// Reverse the byte order of the low `length` bits (a multiple of 8).
fn swap_bytes(raw: u64, length: u32) -> u64 {
    raw.swap_bytes() >> (FRAME_BITS - length)
}

/// Two's-complement interpretation of the low `length` bits.
#[allow(clippy::cast_possible_wrap)]
fn sign_extend(raw: u64, length: u32) -> i64 {
    if length >= FRAME_BITS {
        return raw as i64;
    }
    let shift = FRAME_BITS - length;
    ((raw << shift) as i64) >> shift
}

impl std::fmt::Display for SegmentSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values: Vec<String> = self
            .values
            .iter()
            .map(|v| format!("{}={}", v.name, v.value))
            .collect();
        write!(
            f,
            "{},{},{},{},{},{},{}",
            self.name,
            self.width,
            self.unit.as_deref().unwrap_or_default(),
            self.position,
            self.length,
            self.signed,
            values.join("|")
        )
    }
}
