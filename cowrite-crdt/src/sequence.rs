//! Ordered atom sequence keyed by position identifier.
//!
//! A CRDT for ordered sequences that supports authoritative insert and
//! delete operations. Every atom carries a unique [`Pid`] and the sequence
//! is kept strictly increasing by Pid, so an atom's index is a pure function
//! of the set of Pids present. This is the key to convergence: the order is
//! computed from the atom data, never from the order operations arrived in.
//!
//! Use cases:
//! - The characters of a collaborative string (`Sequence<char>`)
//! - Any ordered list whose positions are minted by an allocation authority

use serde::{Deserialize, Serialize};

use crate::pid::Pid;

/// One unit of content paired with its position identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Atom<T> {
    /// Where the atom lives.
    pub pid: Pid,
    /// The content.
    pub value: T,
}

impl<T> Atom<T> {
    /// Creates a new atom.
    #[must_use]
    pub fn new(pid: Pid, value: T) -> Self {
        Self { pid, value }
    }
}

/// An ordered sequence of atoms, strictly increasing by Pid.
///
/// Lookups are a binary search over the Pid order; insertion and removal
/// shift the backing vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence<T> {
    atoms: Vec<Atom<T>>,
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self { atoms: Vec::new() }
    }
}

impl<T> Sequence<T> {
    /// Creates a new empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a sequence from atoms in any order.
    ///
    /// Atoms are sorted by Pid; when two atoms share a Pid the first one wins.
    #[must_use]
    pub fn from_atoms(mut atoms: Vec<Atom<T>>) -> Self {
        atoms.sort_by(|a, b| a.pid.cmp(&b.pid));
        atoms.dedup_by(|later, earlier| later.pid == earlier.pid);
        Self { atoms }
    }

    /// Returns the number of atoms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Returns true if the sequence is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Returns the Pid of the atom at `index`.
    #[must_use]
    pub fn pid_at(&self, index: usize) -> Option<&Pid> {
        self.atoms.get(index).map(|atom| &atom.pid)
    }

    /// Returns the atom at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Atom<T>> {
        self.atoms.get(index)
    }

    /// Iterates over the atoms in order.
    pub fn iter(&self) -> impl Iterator<Item = &Atom<T>> {
        self.atoms.iter()
    }

    /// Iterates over the atom values in order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.atoms.iter().map(|atom| &atom.value)
    }

    /// Returns the atoms as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Atom<T>] {
        &self.atoms
    }

    /// Returns the index of the first atom whose Pid is `>= pid`, or `len()`
    /// if there is none.
    #[must_use]
    pub fn search(&self, pid: &Pid) -> usize {
        self.atoms.partition_point(|atom| atom.pid < *pid)
    }

    /// Returns the index of the atom with exactly this Pid.
    #[must_use]
    pub fn index_of(&self, pid: &Pid) -> Option<usize> {
        let index = self.search(pid);
        match self.atoms.get(index) {
            Some(atom) if atom.pid == *pid => Some(index),
            _ => None,
        }
    }

    /// Inserts an atom at the place its Pid dictates.
    ///
    /// Returns the index it landed at, or `None` if an atom with this Pid is
    /// already present (re-delivery of the same insert is a no-op).
    pub fn apply_insert(&mut self, pid: Pid, value: T) -> Option<usize> {
        let index = self.search(&pid);
        if self.atoms.get(index).is_some_and(|atom| atom.pid == pid) {
            return None;
        }
        self.atoms.insert(index, Atom::new(pid, value));
        Some(index)
    }

    /// Removes the atom with this Pid.
    ///
    /// Returns the index it was removed from, or `None` if no such atom
    /// exists.
    pub fn apply_delete(&mut self, pid: &Pid) -> Option<usize> {
        let index = self.index_of(pid)?;
        self.atoms.remove(index);
        Some(index)
    }
}

impl Sequence<char> {
    /// Concatenates the atom values.
    #[must_use]
    pub fn as_string(&self) -> String {
        self.values().collect()
    }
}

impl<T> FromIterator<Atom<T>> for Sequence<T> {
    fn from_iter<I: IntoIterator<Item = Atom<T>>>(iter: I) -> Self {
        Self::from_atoms(iter.into_iter().collect())
    }
}
