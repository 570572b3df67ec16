//! A fixed-width, word-packed bit vector over the problem universe.
//!
//! The universe size `W` is a compile-time constant (see [`UNIVERSE_SIZE`]).
//! Every base set, target set and expression result is a [`Bitset`] of this
//! width; there is no support for a dynamically sized universe.

use std::fmt;

/// Compile-time universe width. All [`Bitset`] values have exactly this many
/// slots, indexed `0..UNIVERSE_SIZE`.
pub const UNIVERSE_SIZE: usize = 128;

const BITS_PER_WORD: usize = u64::BITS as usize;
const WORD_COUNT: usize = UNIVERSE_SIZE.div_ceil(BITS_PER_WORD);

/// A fixed-width bit vector over `0..UNIVERSE_SIZE`, packed into `u64` words.
///
/// Supports union, intersection, difference, cardinality and a canonical
/// string encoding used as a hash/dedup key. Cheap to copy: `WORD_COUNT` is
/// small and fixed, so `Bitset` derives `Copy`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bitset {
  words: [u64; WORD_COUNT],
}

impl Bitset {
  /// The empty set `∅`.
  pub fn empty() -> Self {
    Self::default()
  }

  /// The universe `U`, i.e. every index `0..UNIVERSE_SIZE` set.
  pub fn universe() -> Self {
    let mut b = Self::empty();
    for i in 0..UNIVERSE_SIZE {
      b.set(i);
    }
    b
  }

  /// Returns `true` if bit `idx` is set.
  ///
  /// # Panics
  ///
  /// Panics if `idx >= UNIVERSE_SIZE`.
  pub fn test(&self, idx: usize) -> bool {
    assert!(idx < UNIVERSE_SIZE, "index {idx} out of universe bounds");
    let word = self.words[idx / BITS_PER_WORD];
    (word >> (idx % BITS_PER_WORD)) & 1 != 0
  }

  /// Sets bit `idx`.
  ///
  /// # Panics
  ///
  /// Panics if `idx >= UNIVERSE_SIZE`.
  pub fn set(&mut self, idx: usize) {
    assert!(idx < UNIVERSE_SIZE, "index {idx} out of universe bounds");
    self.words[idx / BITS_PER_WORD] |= 1u64 << (idx % BITS_PER_WORD);
  }

  /// Number of set bits.
  pub fn popcount(&self) -> u32 {
    self.words.iter().map(|w| w.count_ones()).sum()
  }

  /// `self ∪ other`.
  pub fn union(&self, other: &Self) -> Self {
    let mut words = [0u64; WORD_COUNT];
    for i in 0..WORD_COUNT {
      words[i] = self.words[i] | other.words[i];
    }
    Self { words }
  }

  /// `self ∩ other`.
  pub fn intersect(&self, other: &Self) -> Self {
    let mut words = [0u64; WORD_COUNT];
    for i in 0..WORD_COUNT {
      words[i] = self.words[i] & other.words[i];
    }
    Self { words }
  }

  /// `self ∖ other`, i.e. `self & !other`.
  pub fn difference(&self, other: &Self) -> Self {
    let mut words = [0u64; WORD_COUNT];
    for i in 0..WORD_COUNT {
      words[i] = self.words[i] & !other.words[i];
    }
    Self { words }
  }

  /// Iterates over the indices of set bits, ascending.
  pub fn iter_indices(&self) -> impl Iterator<Item = usize> + '_ {
    (0..UNIVERSE_SIZE).filter(move |&i| self.test(i))
  }

  /// Canonical string encoding, used as a hash key to deduplicate
  /// expressions by extension rather than by syntactic form.
  pub fn canonical_key(&self) -> String {
    let mut s = String::with_capacity(UNIVERSE_SIZE);
    for i in 0..UNIVERSE_SIZE {
      s.push(if self.test(i) { '1' } else { '0' });
    }
    s
  }
}

impl fmt::Debug for Bitset {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Bitset{{")?;
    let mut first = true;
    for i in self.iter_indices() {
      if !first {
        write!(f, ",")?;
      }
      write!(f, "{i}")?;
      first = false;
    }
    write!(f, "}}")
  }
}

impl FromIterator<usize> for Bitset {
  fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
    let mut b = Self::empty();
    for idx in iter {
      b.set(idx);
    }
    b
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_and_universe() {
    assert_eq!(Bitset::empty().popcount(), 0);
    assert_eq!(Bitset::universe().popcount(), UNIVERSE_SIZE as u32);
  }

  #[test]
  fn test_set_and_test() {
    let mut b = Bitset::empty();
    assert!(!b.test(5));
    b.set(5);
    assert!(b.test(5));
    assert!(!b.test(4));
  }

  #[test]
  fn test_union_intersect_difference() {
    let a: Bitset = [0, 1, 2, 3].into_iter().collect();
    let b: Bitset = [2, 3].into_iter().collect();

    let u = a.union(&b);
    assert_eq!(u.popcount(), 4);

    let i = a.intersect(&b);
    assert_eq!(i.popcount(), 2);
    assert!(i.test(2) && i.test(3));

    let d = a.difference(&b);
    assert_eq!(d.popcount(), 2);
    assert!(d.test(0) && d.test(1));
    assert!(!d.test(2) && !d.test(3));
  }

  #[test]
  fn test_canonical_key_distinguishes_sets() {
    let a: Bitset = [0, 1].into_iter().collect();
    let b: Bitset = [1, 2].into_iter().collect();
    assert_ne!(a.canonical_key(), b.canonical_key());
    assert_eq!(a.canonical_key(), a.canonical_key());
  }

  #[test]
  fn test_commutativity_of_union_and_intersect() {
    let a: Bitset = [0, 4, 8].into_iter().collect();
    let b: Bitset = [4, 9].into_iter().collect();
    assert_eq!(a.union(&b).canonical_key(), b.union(&a).canonical_key());
    assert_eq!(
      a.intersect(&b).canonical_key(),
      b.intersect(&a).canonical_key()
    );
  }
}
