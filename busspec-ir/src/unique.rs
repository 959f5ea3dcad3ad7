//! Insertion-ordered collection with one or more uniqueness keys.
//!
//! Every declared key is indexed separately; an element is accepted only when
//! none of its keys is already taken. Mutations run the collection's
//! [`RuleSet`] with a caller-supplied context.

use crate::error::SpecError;
use crate::rules::{Hook, RuleSet};
use serde::Serialize;
use std::collections::HashMap;

/// A key extracted from an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum KeyValue {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for KeyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyValue::Int(v) => write!(f, "{v}"),
            KeyValue::Text(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        KeyValue::Text(s.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(s: String) -> Self {
        KeyValue::Text(s)
    }
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        KeyValue::Int(v)
    }
}

impl From<u32> for KeyValue {
    fn from(v: u32) -> Self {
        KeyValue::Int(i64::from(v))
    }
}

/// A named key extraction function.
pub struct UniqueKey<T> {
    pub name: &'static str,
    pub extract: fn(&T) -> KeyValue,
}

impl<T> UniqueKey<T> {
    pub const fn new(name: &'static str, extract: fn(&T) -> KeyValue) -> Self {
        UniqueKey { name, extract }
    }
}

impl<T> Clone for UniqueKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for UniqueKey<T> {}

/// Ordered container enforcing uniqueness on every declared key.
///
/// The first declared key is the main key used by [`Unique::get`].
pub struct Unique<T, C = ()> {
    items: Vec<T>,
    keys: Vec<UniqueKey<T>>,
    indexes: Vec<HashMap<KeyValue, usize>>,
    rules: RuleSet<T, C>,
}

impl<T, C> Unique<T, C> {
    /// Create an empty collection indexed on `keys`.
    ///
    /// # Panics
    ///
    /// Panics if `keys` is empty.
    pub fn new(keys: &[UniqueKey<T>]) -> Self {
        assert!(!keys.is_empty(), "a unique collection needs at least one key");
        Unique {
            items: Vec::new(),
            keys: keys.to_vec(),
            indexes: vec![HashMap::new(); keys.len()],
            rules: RuleSet::new(),
        }
    }

    pub fn with_rules(mut self, rules: RuleSet<T, C>) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &RuleSet<T, C> {
        &self.rules
    }

    pub fn key_names(&self) -> Vec<&'static str> {
        self.keys.iter().map(|k| k.name).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Look up by the main key.
    pub fn get(&self, value: impl Into<KeyValue>) -> Option<&T> {
        self.indexes[0]
            .get(&value.into())
            .map(|&pos| &self.items[pos])
    }

    pub fn contains(&self, value: impl Into<KeyValue>) -> bool {
        self.get(value).is_some()
    }

    /// Look up by a named key, failing with `NotFound`.
    pub fn lookup(&self, key: &str, value: impl Into<KeyValue>) -> Result<&T, SpecError> {
        let pos = self.position(key, value.into())?;
        Ok(&self.items[pos])
    }

    /// Insert `item` if none of its keys is taken and every add rule passes.
    ///
    /// On a key collision or a pre-add veto nothing is modified. A post-add
    /// failure removes the element again before returning the error.
    pub fn safe_add(&mut self, item: T, context: &C) -> Result<(), SpecError> {
        let keys = self.extract_keys(&item);
        for (slot, key) in keys.iter().enumerate() {
            if self.indexes[slot].contains_key(key) {
                return Err(SpecError::DuplicateKey {
                    key: self.keys[slot].name,
                    value: key.clone(),
                });
            }
        }

        self.rules.run(Hook::PreAdd, &item, context)?;

        let pos = self.items.len();
        for (index, key) in self.indexes.iter_mut().zip(keys) {
            index.insert(key, pos);
        }
        self.items.push(item);

        if let Err(e) = self.rules.run(Hook::PostAdd, &self.items[pos], context) {
            self.items.pop();
            self.reindex();
            return Err(e);
        }
        Ok(())
    }

    /// Add each element in order.
    ///
    /// Not transactional: on failure the elements added before the failing
    /// one stay in the collection.
    pub fn extend<I>(&mut self, items: I, context: &C) -> Result<(), SpecError>
    where
        I: IntoIterator<Item = T>,
    {
        for item in items {
            self.safe_add(item, context)?;
        }
        Ok(())
    }

    /// Remove the element whose `key` equals `value`, running remove rules.
    pub fn remove(
        &mut self,
        key: &str,
        value: impl Into<KeyValue>,
        context: &C,
    ) -> Result<T, SpecError> {
        let pos = self.position(key, value.into())?;
        self.rules.run(Hook::PreRemove, &self.items[pos], context)?;

        let item = self.items.remove(pos);
        self.reindex();

        if let Err(e) = self.rules.run(Hook::PostRemove, &item, context) {
            self.items.insert(pos, item);
            self.reindex();
            return Err(e);
        }
        Ok(item)
    }

    fn position(&self, key: &str, value: KeyValue) -> Result<usize, SpecError> {
        let slot = self
            .keys
            .iter()
            .position(|k| k.name == key)
            .ok_or_else(|| SpecError::NotFound {
                key: "key".to_string(),
                value: KeyValue::Text(key.to_string()),
            })?;
        self.indexes[slot]
            .get(&value)
            .copied()
            .ok_or(SpecError::NotFound {
                key: key.to_string(),
                value,
            })
    }

    fn extract_keys(&self, item: &T) -> Vec<KeyValue> {
        self.keys.iter().map(|k| (k.extract)(item)).collect()
    }

    fn reindex(&mut self) {
        for (slot, key) in self.keys.iter().enumerate() {
            self.indexes[slot] = self
                .items
                .iter()
                .enumerate()
                .map(|(pos, item)| ((key.extract)(item), pos))
                .collect();
        }
    }
}

impl<T> Unique<T, ()> {
    /// [`Unique::safe_add`] for collections without a rule context.
    pub fn add(&mut self, item: T) -> Result<(), SpecError> {
        self.safe_add(item, &())
    }
}

impl<'a, T, C> IntoIterator for &'a Unique<T, C> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Clone, C> Clone for Unique<T, C> {
    fn clone(&self) -> Self {
        Unique {
            items: self.items.clone(),
            keys: self.keys.clone(),
            indexes: self.indexes.clone(),
            rules: self.rules.clone(),
        }
    }
}

impl<T: std::fmt::Debug, C> std::fmt::Debug for Unique<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unique")
            .field("keys", &self.key_names())
            .field("rules", &self.rules)
            .field("items", &self.items)
            .finish()
    }
}

impl<T: PartialEq, C> PartialEq for Unique<T, C> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Serialize, C> Serialize for Unique<T, C> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.items)
    }
}
