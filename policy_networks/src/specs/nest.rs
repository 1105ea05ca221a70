//! Nested spec trees.
//!
//! Observation, action and output specs are arbitrary-depth trees of leaves.
//! A [`Nest`] is flattened into an ordered list of leaves, the leaves are
//! processed one by one, and the results are folded back into the original
//! shape with [`Nest::pack_sequence_as`].
//!
//! Leaf order is depth-first: sequences in index order, maps in sorted key
//! order (the `BTreeMap` order).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, Result};

/// A tree of leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Nest<T> {
    /// A single value.
    Leaf(T),
    /// Ordered children.
    Sequence(Vec<Nest<T>>),
    /// Named children, visited in sorted key order.
    Map(BTreeMap<String, Nest<T>>),
}

impl<T> Default for Nest<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Nest<T> {
    /// The empty nest (no leaves).
    pub fn empty() -> Self {
        Nest::Sequence(Vec::new())
    }

    /// Build a map node from `(key, child)` pairs.
    pub fn from_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, Nest<T>)>) -> Self {
        Nest::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Nest::Leaf(_))
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        match self {
            Nest::Leaf(_) => 1,
            Nest::Sequence(items) => items.iter().map(Nest::len).sum(),
            Nest::Map(items) => items.values().map(Nest::len).sum(),
        }
    }

    /// True when the nest holds no leaves at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Leaves in traversal order.
    pub fn flatten(&self) -> Vec<&T> {
        let mut out = Vec::with_capacity(self.len());
        self.collect_refs(&mut out);
        out
    }

    /// Owned leaves in traversal order.
    pub fn into_flatten(self) -> Vec<T> {
        let mut out = Vec::new();
        self.collect_owned(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            Nest::Leaf(value) => out.push(value),
            Nest::Sequence(items) => items.iter().for_each(|item| item.collect_refs(out)),
            Nest::Map(items) => items.values().for_each(|item| item.collect_refs(out)),
        }
    }

    fn collect_owned(self, out: &mut Vec<T>) {
        match self {
            Nest::Leaf(value) => out.push(value),
            Nest::Sequence(items) => items.into_iter().for_each(|item| item.collect_owned(out)),
            Nest::Map(items) => items.into_values().for_each(|item| item.collect_owned(out)),
        }
    }

    /// Fold `flat` back into the shape of `self`.
    ///
    /// `self` only serves as a template; its leaf values are ignored.
    pub fn pack_sequence_as<U>(&self, flat: Vec<U>) -> Result<Nest<U>> {
        let expected = self.len();
        if flat.len() != expected {
            return Err(NetworkError::NestStructure {
                expected,
                actual: flat.len(),
            });
        }
        let mut iter = flat.into_iter();
        self.pack_from(&mut iter, expected)
    }

    fn pack_from<U, I: Iterator<Item = U>>(&self, iter: &mut I, expected: usize) -> Result<Nest<U>> {
        Ok(match self {
            Nest::Leaf(_) => Nest::Leaf(iter.next().ok_or(NetworkError::NestStructure {
                expected,
                actual: 0,
            })?),
            Nest::Sequence(items) => Nest::Sequence(
                items
                    .iter()
                    .map(|item| item.pack_from(iter, expected))
                    .collect::<Result<_>>()?,
            ),
            Nest::Map(items) => Nest::Map(
                items
                    .iter()
                    .map(|(key, item)| Ok((key.clone(), item.pack_from(iter, expected)?)))
                    .collect::<Result<_>>()?,
            ),
        })
    }

    /// Apply `f` to every leaf, keeping the structure.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Nest<U> {
        self.map_with(&mut f)
    }

    fn map_with<U>(&self, f: &mut impl FnMut(&T) -> U) -> Nest<U> {
        match self {
            Nest::Leaf(value) => Nest::Leaf(f(value)),
            Nest::Sequence(items) => Nest::Sequence(items.iter().map(|item| item.map_with(f)).collect()),
            Nest::Map(items) => Nest::Map(
                items
                    .iter()
                    .map(|(key, item)| (key.clone(), item.map_with(f)))
                    .collect(),
            ),
        }
    }

    /// Fallible [`Nest::map`]; stops at the first error.
    pub fn try_map<U, E>(
        &self,
        mut f: impl FnMut(&T) -> std::result::Result<U, E>,
    ) -> std::result::Result<Nest<U>, E> {
        self.try_map_with(&mut f)
    }

    fn try_map_with<U, E>(
        &self,
        f: &mut impl FnMut(&T) -> std::result::Result<U, E>,
    ) -> std::result::Result<Nest<U>, E> {
        Ok(match self {
            Nest::Leaf(value) => Nest::Leaf(f(value)?),
            Nest::Sequence(items) => Nest::Sequence(
                items
                    .iter()
                    .map(|item| item.try_map_with(f))
                    .collect::<std::result::Result<_, E>>()?,
            ),
            Nest::Map(items) => Nest::Map(
                items
                    .iter()
                    .map(|(key, item)| Ok((key.clone(), item.try_map_with(f)?)))
                    .collect::<std::result::Result<_, E>>()?,
            ),
        })
    }

    /// True when both nests have the same shape, ignoring leaf values.
    pub fn same_structure<U>(&self, other: &Nest<U>) -> bool {
        match (self, other) {
            (Nest::Leaf(_), Nest::Leaf(_)) => true,
            (Nest::Sequence(a), Nest::Sequence(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_structure(y))
            }
            (Nest::Map(a), Nest::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.same_structure(vb))
            }
            _ => false,
        }
    }
}

impl<T> From<T> for Nest<T> {
    fn from(value: T) -> Self {
        Nest::Leaf(value)
    }
}
