use crate::error::DecodeError;
use crate::frame::Frame;
use crate::message::MessageSpec;
use crate::types::Value;
use crate::units::UnitConversion;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// All message layouts of one bus, keyed by address.
///
/// Insertion is an upsert: a message whose address is already taken replaces
/// the previous one. Layering override specs over a base spec relies on this.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BusSpec {
    source: String,
    messages: BTreeMap<u32, MessageSpec>,
}

impl BusSpec {
    /// An empty bus; `source` is an opaque locator kept for reporting.
    pub fn new(source: impl Into<String>) -> Self {
        BusSpec {
            source: source.into(),
            messages: BTreeMap::new(),
        }
    }

    pub fn from_messages<I>(source: impl Into<String>, messages: I) -> Self
    where
        I: IntoIterator<Item = MessageSpec>,
    {
        let mut bus = Self::new(source);
        for message in messages {
            bus.upsert_message(message);
        }
        bus
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Insert or replace by address, returning the replaced message.
    pub fn upsert_message(&mut self, message: MessageSpec) -> Option<MessageSpec> {
        let address = message.address();
        let replaced = self.messages.insert(address, message);
        if let Some(old) = &replaced {
            log::debug!(
                "{}: message '{}' replaces '{}' at address {:#x}",
                self.source,
                self.messages[&address].name(),
                old.name(),
                address
            );
        }
        replaced
    }

    /// Layer `other` over this bus, message by message.
    pub fn merge(&mut self, other: BusSpec) {
        for (_, message) in other.messages {
            self.upsert_message(message);
        }
    }

    pub fn message(&self, address: u32) -> Option<&MessageSpec> {
        self.messages.get(&address)
    }

    pub fn get_message(&self, address: u32) -> Result<&MessageSpec, DecodeError> {
        self.message(address)
            .ok_or(DecodeError::UnknownAddress(address))
    }

    pub fn message_by_name(&self, name: &str) -> Option<&MessageSpec> {
        self.messages.values().find(|m| m.name() == name)
    }

    /// Messages in address order.
    pub fn messages(&self) -> impl Iterator<Item = &MessageSpec> {
        self.messages.values()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Every unit symbol referenced by a segment on this bus.
    pub fn units(&self) -> BTreeSet<&str> {
        self.messages
            .values()
            .flat_map(|m| m.segments().iter())
            .filter_map(|s| s.unit())
            .collect()
    }

    /// Decode `frame` with the message registered at its address.
    pub fn interpret(
        &self,
        frame: &Frame,
        units: &dyn UnitConversion,
    ) -> Result<BTreeMap<String, Value>, DecodeError> {
        let message = self.get_message(frame.address)?;
        message
            .interpret(frame, units)
            .map_err(|e| DecodeError::InMessage {
                message: message.name().to_string(),
                source: Box::new(e),
            })
    }
}
