//! Insertion-ordered entry list shared by both store backends.
//!
//! Stores here are small (one entry per user or per live token), so a
//! `Vec` with linear lookup is the whole index. What matters is that it
//! keeps insertion order, which a `HashMap` or `BTreeMap` would lose.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, Serializer};

#[derive(Debug, Clone)]
pub(crate) struct Entries<V> {
    items: Vec<(String, V)>,
}

impl<V> Default for Entries<V> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<V: Clone> Entries<V> {
    pub(crate) fn get(&self, key: &str) -> Option<V> {
        self.position(key).map(|i| self.items[i].1.clone())
    }

    /// Overwrites in place when the key exists, appends otherwise.
    pub(crate) fn put(&mut self, key: &str, value: V) {
        match self.position(key) {
            Some(i) => self.items[i].1 = value,
            None => self.items.push((key.to_string(), value)),
        }
    }

    pub(crate) fn delete(&mut self, key: &str) -> bool {
        match self.position(key) {
            Some(i) => {
                // `remove` (not `swap_remove`) so the remaining entries
                // keep their relative order.
                self.items.remove(i);
                true
            }
            None => false,
        }
    }

    pub(crate) fn scan(
        &self,
        predicate: &dyn Fn(&str, &V) -> bool,
    ) -> Vec<(String, V)> {
        self.items
            .iter()
            .filter(|(k, v)| predicate(k, v))
            .cloned()
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.items.iter().position(|(k, _)| k == key)
    }
}

// On disk the entries are a plain JSON object. `collect_map` writes keys in
// iteration order and the visitor below reads them back in document order,
// so the order survives a restart.

impl<V: Serialize> Serialize for Entries<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.items.iter().map(|(k, v)| (k, v)))
    }
}

struct EntriesVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
    type Value = Entries<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object keyed by identifier")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut items: Vec<(String, V)> =
            Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, V>()? {
            // A duplicated key in a hand-edited file: last one wins, first
            // position is kept.
            match items.iter().position(|(k, _)| *k == key) {
                Some(i) => items[i].1 = value,
                None => items.push((key, value)),
            }
        }
        Ok(Entries { items })
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Entries<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}
