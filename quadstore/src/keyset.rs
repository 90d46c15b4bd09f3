//! A growable contiguous array of [`TripleKey`] (spec §4.5): the
//! materialised result of a lookup, with O(1) amortised append, tombstone
//! deletion, and set-algebra primitives.

use crate::key::TripleKey;
use crate::quad::Pattern;

const GROWTH_FACTOR: f64 = 1.75;

/// `used_count ≤ capacity`; entries at or beyond `used_count` are
/// unspecified (spec §4.5's invariant). Removed entries are tombstoned in
/// place with [`TripleKey::NULL`] rather than shifted, so indices returned
/// by `seek`/`tell` stay stable across a `remove`.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    buf: Vec<TripleKey>,
    used_count: usize,
    cursor: usize,
}

impl KeySet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: vec![TripleKey::NULL; capacity], used_count: 0, cursor: 0 }
    }

    pub fn from_iter(iter: impl IntoIterator<Item = TripleKey>) -> Self {
        let mut set = Self::with_capacity(0);
        for key in iter {
            set.add(key, true);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.buf[..self.used_count].iter().filter(|k| !k.is_tombstone()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn grow_to_fit_one_more(&mut self) {
        if self.used_count == self.buf.len() {
            let grown = ((self.buf.len() as f64) * GROWTH_FACTOR).ceil() as usize;
            let new_cap = grown.max(self.buf.len() + 1);
            self.buf.resize(new_cap, TripleKey::NULL);
        }
    }

    /// Appends `key`. With `check_dup`, a key already present (ignoring
    /// tombstones) is skipped and `false` is returned.
    pub fn add(&mut self, key: TripleKey, check_dup: bool) -> bool {
        if check_dup && self.contains(key) {
            return false;
        }
        self.grow_to_fit_one_more();
        self.buf[self.used_count] = key;
        self.used_count += 1;
        true
    }

    /// Tombstones the first non-tombstone occurrence of `key`.
    pub fn remove(&mut self, key: TripleKey) -> bool {
        for slot in &mut self.buf[..self.used_count] {
            if *slot == key && !slot.is_tombstone() {
                *slot = TripleKey::NULL;
                return true;
            }
        }
        false
    }

    pub fn contains(&self, key: TripleKey) -> bool {
        if key.is_tombstone() {
            return false;
        }
        self.buf[..self.used_count].contains(&key)
    }

    pub fn seek(&mut self, index: usize) {
        self.cursor = index;
    }

    pub fn tell(&self) -> usize {
        self.cursor
    }

    /// Advances the cursor past tombstones and writes the next live entry
    /// into `out`. Returns `false` once the end of the set is reached,
    /// leaving `out` untouched.
    pub fn get_next(&mut self, out: &mut TripleKey) -> bool {
        while self.cursor < self.used_count {
            let candidate = self.buf[self.cursor];
            self.cursor += 1;
            if !candidate.is_tombstone() {
                *out = candidate;
                return true;
            }
        }
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = TripleKey> + '_ {
        self.buf[..self.used_count].iter().copied().filter(|k| !k.is_tombstone())
    }

    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Compacts away tombstones and shrinks the backing buffer to fit.
    pub fn sparse_copy(&self) -> Self {
        let live: Vec<TripleKey> = self.iter().collect();
        let used_count = live.len();
        Self { buf: live, used_count, cursor: 0 }
    }

    /// Resizes the backing buffer. Shrinking below `used_count` truncates
    /// live entries along with any tombstones past the new capacity.
    pub fn resize(&mut self, new_cap: usize) {
        self.buf.resize(new_cap, TripleKey::NULL);
        self.used_count = self.used_count.min(new_cap);
        self.cursor = self.cursor.min(new_cap);
    }

    /// A linear scan comparing only the bound positions of `pattern`.
    pub fn lookup(&self, pattern: Pattern) -> Self {
        let matches = self.iter().filter(|k| {
            (pattern.s.is_none() || pattern.s == Some(k.s))
                && (pattern.p.is_none() || pattern.p == Some(k.p))
                && (pattern.o.is_none() || pattern.o == Some(k.o))
        });
        Self::from_iter(matches)
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut out = Self::from_iter(self.iter());
        for key in other.iter() {
            out.add(key, true);
        }
        out
    }

    pub fn subtract(&self, other: &Self) -> Self {
        Self::from_iter(self.iter().filter(|k| !other.contains(*k)))
    }

    pub fn intersect(&self, other: &Self) -> Self {
        Self::from_iter(self.iter().filter(|k| other.contains(*k)))
    }

    pub fn xor(&self, other: &Self) -> Self {
        let a_only = self.iter().filter(|k| !other.contains(*k));
        let b_only = other.iter().filter(|k| !self.contains(*k));
        Self::from_iter(a_only.chain(b_only))
    }
}

impl PartialEq for KeySet {
    fn eq(&self, other: &Self) -> bool {
        let a: std::collections::HashSet<_> = self.iter().collect();
        let b: std::collections::HashSet<_> = other.iter().collect();
        a == b
    }
}

impl Eq for KeySet {}
