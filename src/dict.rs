//! A bijective map queryable in both directions.
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{Error, Result};

/// A bijection between keys and values.
///
/// Entries are only ever added. Both directions are updated by the same `insert`, and an
/// insertion that would break the bijection leaves the dictionary untouched.
#[derive(Clone, Debug)]
pub struct BidiDict<K, V> {
    forward: HashMap<K, V>,
    backward: HashMap<V, K>,
}

impl<K, V> BidiDict<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        BidiDict {
            forward: HashMap::new(),
            backward: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        BidiDict {
            forward: HashMap::with_capacity(capacity),
            backward: HashMap::with_capacity(capacity),
        }
    }

    /// Build a dictionary from pairs, failing on the first one that breaks the bijection.
    pub fn try_from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let pairs = pairs.into_iter();
        let mut dict = Self::with_capacity(pairs.size_hint().0);
        for (key, value) in pairs {
            dict.insert(key, value)?;
        }
        Ok(dict)
    }

    /// The value of `key`, if any.
    pub fn lookup_forward(&self, key: &K) -> Option<&V> {
        self.forward.get(key)
    }

    /// The key of `value`, if any.
    pub fn lookup_backward(&self, value: &V) -> Option<&K> {
        self.backward.get(value)
    }

    /// The key of a value that the caller knows to be present.
    ///
    /// A missing value means the caller's invariant is broken, typically through corrupt
    /// input. The resulting [`Error::MissingEntry`] is not meant to be recovered from.
    pub fn lookup_backward_required(&self, value: &V) -> Result<&K>
    where
        V: Debug,
    {
        self.backward
            .get(value)
            .ok_or_else(|| Error::MissingEntry(format!("{:?}", value)))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.forward.contains_key(key)
    }

    pub fn contains_value(&self, value: &V) -> bool {
        self.backward.contains_key(value)
    }

    /// Add a new pair. Neither `key` nor `value` may be present yet.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        if self.forward.contains_key(&key) {
            return Err(Error::DuplicateKey);
        }
        if self.backward.contains_key(&value) {
            return Err(Error::DuplicateValue);
        }

        self.forward.insert(key.clone(), value.clone());
        self.backward.insert(value, key);
        Ok(())
    }

    /// The number of pairs.
    ///
    /// Counted as `usize` like any collection. LZW code arithmetic goes through
    /// [`lzw::next_code`](crate::lzw::next_code), which yields the size as a `Code`.
    pub fn size(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// All pairs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.forward.iter()
    }
}

impl<K, V> Default for BidiDict<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
