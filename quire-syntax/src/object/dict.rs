use crate::object::{Name, ObjRef, Object};
use std::ops::Deref;

/// A dictionary, preserving the insertion order of its entries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dict {
    entries: Vec<(Name, Object)>,
}

impl Dict {
    /// Create a new, empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the (unresolved) value of a key.
    pub fn get(&self, key: &[u8]) -> Option<&Object> {
        self.entries
            .iter()
            .find(|(k, _)| k.deref() == key)
            .map(|(_, v)| v)
    }

    /// Whether the key exists. A key with a null value counts as absent.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some_and(|v| !v.is_null())
    }

    /// Insert a value, replacing an existing one in place.
    pub fn insert(&mut self, key: impl Into<Name>, value: impl Into<Object>) {
        let key = key.into();
        let value = value.into();

        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Remove a key, returning its value.
    pub fn remove(&mut self, key: &[u8]) -> Option<Object> {
        let pos = self.entries.iter().position(|(k, _)| k.deref() == key)?;

        Some(self.entries.remove(pos).1)
    }

    /// Iterate over all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Object)> + '_ {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Iterate over all keys.
    pub fn keys(&self) -> impl Iterator<Item = &Name> + '_ {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Get a name value.
    pub fn get_name(&self, key: &[u8]) -> Option<&Name> {
        self.get(key)?.as_name()
    }

    /// Get an integer value.
    pub fn get_int(&self, key: &[u8]) -> Option<i64> {
        self.get(key)?.as_int()
    }

    /// Get a number value.
    pub fn get_f32(&self, key: &[u8]) -> Option<f32> {
        self.get(key)?.as_f32()
    }

    /// Get a boolean value.
    pub fn get_bool(&self, key: &[u8]) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    /// Get a reference value.
    pub fn get_ref(&self, key: &[u8]) -> Option<ObjRef> {
        self.get(key)?.as_ref()
    }

    /// Get a direct dictionary value.
    pub fn get_dict(&self, key: &[u8]) -> Option<&Self> {
        self.get(key)?.as_dict()
    }

    /// Get a direct array value.
    pub fn get_array(&self, key: &[u8]) -> Option<&[Object]> {
        self.get(key)?.as_array()
    }

    /// Get a string value.
    pub fn get_string(&self, key: &[u8]) -> Option<&[u8]> {
        self.get(key)?.as_string()
    }
}

impl<K: Into<Name>, V: Into<Object>> FromIterator<(K, V)> for Dict {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut dict = Self::new();

        for (k, v) in iter {
            dict.insert(k, v);
        }

        dict
    }
}
