use crate::error::{DecodeError, ResultExt, SpecError};
use crate::frame::BitSource;
use crate::segment::SegmentSpec;
use crate::types::Value;
use crate::unique::{KeyValue, Unique, UniqueKey};
use crate::units::UnitConversion;
use serde::Serialize;
use std::collections::BTreeMap;

fn segment_name(segment: &SegmentSpec) -> KeyValue {
    KeyValue::Text(segment.name().to_string())
}

/// A message layout: the segments found in frames sent to `address`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageSpec {
    name: String,
    address: u32,
    segments: Unique<SegmentSpec>,
}

impl MessageSpec {
    pub fn new(name: impl Into<String>, address: u32) -> Self {
        MessageSpec {
            name: name.into(),
            address,
            segments: Unique::new(&[UniqueKey::new("name", segment_name)]),
        }
    }

    /// Build a message and add `segments` in order, failing on the first error.
    pub fn with_segments<I>(name: impl Into<String>, address: u32, segments: I) -> Result<Self, SpecError>
    where
        I: IntoIterator<Item = SegmentSpec>,
    {
        let mut message = Self::new(name, address);
        for segment in segments {
            message.add_segment(segment)?;
        }
        Ok(message)
    }

    pub fn add_segment(&mut self, segment: SegmentSpec) -> Result<(), SpecError> {
        let name = segment.name().to_string();
        self.segments.add(segment).within("segment", &name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn segments(&self) -> &Unique<SegmentSpec> {
        &self.segments
    }

    pub fn segment(&self, name: &str) -> Option<&SegmentSpec> {
        self.segments.get(name)
    }

    /// Decode every segment of `frame`.
    ///
    /// Any segment failure fails the whole message; no partial map is returned.
    pub fn interpret<B: BitSource + ?Sized>(
        &self,
        frame: &B,
        units: &dyn UnitConversion,
    ) -> Result<BTreeMap<String, Value>, DecodeError> {
        self.segments
            .iter()
            .map(|segment| {
                segment
                    .decode(frame, units)
                    .map(|value| (segment.name().to_string(), value))
                    .map_err(|e| DecodeError::InSegment {
                        segment: segment.name().to_string(),
                        source: Box::new(e),
                    })
            })
            .collect()
    }
}
