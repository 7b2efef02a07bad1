//! Insertion-ordered associative container with linear lookup
//!
//! Suited to small maps where a scan over a contiguous array beats hashing.

use std::borrow::Borrow;
use std::fmt;

use crate::error::MemoryResult;
use crate::storage::{ArenaStorage, Storage};
use crate::vector::Vector;

/// Key / element pair stored by [`VectorMap`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapPair<K, E> {
    /// Lookup key
    pub key: K,
    /// Associated element
    pub element: E,
}

impl<K, E> MapPair<K, E> {
    /// Create a pair
    pub fn new(key: K, element: E) -> Self {
        Self { key, element }
    }
}

/// Outcome of [`VectorMap::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Added {
    /// The key was new; the pair was appended at this index
    Inserted(usize),
    /// The key was already present at this index; nothing changed
    Existing(usize),
}

impl Added {
    /// Index of the pair, whether new or existing
    pub fn index(self) -> usize {
        match self {
            Self::Inserted(index) | Self::Existing(index) => index,
        }
    }

    /// Whether the key was already present
    pub fn existed(self) -> bool {
        matches!(self, Self::Existing(_))
    }
}

/// Map stored as a [`Vector`] of [`MapPair`]s in insertion order
///
/// # Examples
///
/// ```
/// use arenakit_memory::map::{Added, VectorMap};
///
/// let mut map = VectorMap::<&str, u32>::with_capacity(8).unwrap();
/// assert_eq!(map.add("a", 1).unwrap(), Added::Inserted(0));
/// assert_eq!(map.add("a", 2).unwrap(), Added::Existing(0));
/// assert_eq!(*map.find_data(&"a"), 1);
/// ```
pub struct VectorMap<K, E, S: Storage<MapPair<K, E>> = ArenaStorage<MapPair<K, E>>> {
    pairs: Vector<MapPair<K, E>, S>,
}

impl<K, E> VectorMap<K, E, ArenaStorage<MapPair<K, E>>> {
    /// Arena-backed map sized for 64 MiB of pairs
    pub fn new() -> MemoryResult<Self> {
        Ok(Self::from_storage(ArenaStorage::new()?))
    }

    /// Arena-backed map holding at least `capacity` pairs
    pub fn with_capacity(capacity: usize) -> MemoryResult<Self> {
        Ok(Self::from_storage(ArenaStorage::with_capacity(capacity)?))
    }
}

impl<K, E, S: Storage<MapPair<K, E>>> VectorMap<K, E, S> {
    /// Map over an empty storage
    pub fn from_storage(storage: S) -> Self {
        Self {
            pairs: Vector::from_storage(storage),
        }
    }

    /// Insert `key` unless it is already present
    ///
    /// An existing element is never overwritten; the new one is dropped.
    pub fn add(&mut self, key: K, element: E) -> MemoryResult<Added>
    where
        K: PartialEq,
    {
        self.add_pair(MapPair::new(key, element))
    }

    /// Insert `pair` unless its key is already present
    pub fn add_pair(&mut self, pair: MapPair<K, E>) -> MemoryResult<Added>
    where
        K: PartialEq,
    {
        if let Some(index) = self.find(&pair.key) {
            return Ok(Added::Existing(index));
        }
        self.pairs.push(pair)?;
        Ok(Added::Inserted(self.pairs.len() - 1))
    }

    /// Index of `key`
    pub fn find<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: PartialEq + ?Sized,
    {
        self.pairs.iter().position(|pair| pair.key.borrow() == key)
    }

    /// Element at `index`
    ///
    /// # Panics
    ///
    /// If `index >= len`.
    pub fn get_data(&self, index: usize) -> &E {
        &self.pairs[index].element
    }

    /// Mutable element at `index`
    ///
    /// # Panics
    ///
    /// If `index >= len`.
    pub fn get_data_mut(&mut self, index: usize) -> &mut E {
        &mut self.pairs[index].element
    }

    /// Element for `key`
    ///
    /// # Panics
    ///
    /// If `key` is absent.
    pub fn find_data<Q>(&self, key: &Q) -> &E
    where
        K: Borrow<Q>,
        Q: PartialEq + ?Sized,
    {
        match self.get(key) {
            Some(element) => element,
            None => panic!("find_data: key not present in VectorMap"),
        }
    }

    /// Element for `key`, if present
    pub fn get<Q>(&self, key: &Q) -> Option<&E>
    where
        K: Borrow<Q>,
        Q: PartialEq + ?Sized,
    {
        self.find(key).map(|index| &self.pairs[index].element)
    }

    /// Mutable element for `key`, if present
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut E>
    where
        K: Borrow<Q>,
        Q: PartialEq + ?Sized,
    {
        self.find(key)
            .map(move |index| &mut self.pairs[index].element)
    }

    /// Whether `key` is present
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: PartialEq + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Remove `key`, keeping the order of the remaining pairs
    pub fn remove<Q>(&mut self, key: &Q) -> Option<E>
    where
        K: Borrow<Q>,
        Q: PartialEq + ?Sized,
    {
        let index = self.find(key)?;
        Some(self.pairs.remove(index).element)
    }

    /// Pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &E)> {
        self.pairs.iter().map(|pair| (&pair.key, &pair.element))
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.pairs.iter().map(|pair| &pair.key)
    }

    /// The pairs as a slice
    pub fn as_slice(&self) -> &[MapPair<K, E>] {
        &self.pairs
    }

    /// Number of pairs
    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the map is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Remove every pair
    pub fn clear(&mut self) {
        self.pairs.clear();
    }
}

impl<K: fmt::Debug, E: fmt::Debug, S: Storage<MapPair<K, E>>> fmt::Debug for VectorMap<K, E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
