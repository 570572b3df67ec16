//! Set-algebra expressions: immutable values carrying both extension (the
//! evaluated [`Bitset`]) and intention (a canonical textual rendering).

use std::collections::BTreeSet;
use std::fmt;

use crate::bitset::Bitset;

/// A set-algebra operator.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Op {
  /// `∪`
  Union,
  /// `∩`
  Intersect,
  /// `∖`
  Difference,
}

impl Op {
  /// All three operators, in a fixed, deterministic order.
  pub const ALL: [Op; 3] = [Op::Union, Op::Intersect, Op::Difference];

  /// Applies this operator to two bitsets.
  pub fn apply(&self, lhs: &Bitset, rhs: &Bitset) -> Bitset {
    match self {
      Op::Union => lhs.union(rhs),
      Op::Intersect => lhs.intersect(rhs),
      Op::Difference => lhs.difference(rhs),
    }
  }

  /// The exact spacing-sensitive infix symbol used in [`Expr`] rendering.
  fn symbol(&self) -> &'static str {
    match self {
      Op::Union => " ∪ ",
      Op::Intersect => " ∩ ",
      Op::Difference => " \\ ",
    }
  }
}

/// An immutable set-algebra expression.
///
/// Carries its evaluated extension (`set`), a canonical infix rendering
/// (`text`), the indices of base sets it references (`used_sets`) and its
/// operator count (`n_ops`). Two fields never drift apart after
/// construction: dedup elsewhere in the crate is always keyed on `set`'s
/// canonical string, never on `text`, since distinct trees can share an
/// extension.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Expr {
  set: Bitset,
  text: String,
  used_sets: BTreeSet<usize>,
  n_ops: u32,
}

impl Expr {
  /// The leaf expression `Fi`, referencing base set `i`.
  pub fn leaf(idx: usize, value: Bitset) -> Self {
    Self {
      set: value,
      text: format!("F{idx}"),
      used_sets: BTreeSet::from([idx]),
      n_ops: 0,
    }
  }

  /// The universe leaf `U`, evaluating to the full universe bitset.
  pub fn universe() -> Self {
    Self::universe_as(Bitset::universe())
  }

  /// The universe leaf `U`, evaluating to the given bitset. Used by solvers
  /// that receive `U` as a parameter rather than assuming the default full
  /// universe.
  pub fn universe_as(u: Bitset) -> Self {
    Self {
      set: u,
      text: "U".to_string(),
      used_sets: BTreeSet::new(),
      n_ops: 0,
    }
  }

  /// The empty-set leaf `∅`.
  pub fn empty() -> Self {
    Self {
      set: Bitset::empty(),
      text: "∅".to_string(),
      used_sets: BTreeSet::new(),
      n_ops: 0,
    }
  }

  /// Combines two expressions with `op`, producing `(lhs op rhs)`.
  pub fn combine(op: Op, lhs: &Expr, rhs: &Expr) -> Self {
    let set = op.apply(&lhs.set, &rhs.set);
    let text = format!("({}{}{})", lhs.text, op.symbol(), rhs.text);
    let used_sets: BTreeSet<usize> =
      lhs.used_sets.union(&rhs.used_sets).copied().collect();
    let n_ops = lhs.n_ops + rhs.n_ops + 1;
    Self { set, text, used_sets, n_ops }
  }

  /// The evaluated extension.
  pub fn set(&self) -> &Bitset {
    &self.set
  }

  /// The canonical infix rendering, e.g. `(F0 ∪ F2)`.
  pub fn text(&self) -> &str {
    &self.text
  }

  /// Indices of base sets referenced by this expression. `U` and `∅`
  /// contribute no indices.
  pub fn used_sets(&self) -> &BTreeSet<usize> {
    &self.used_sets
  }

  /// Operator count of the expression tree (0 for a leaf).
  pub fn n_ops(&self) -> u32 {
    self.n_ops
  }

  /// Number of distinct base sets referenced, the structural `sizeH`
  /// objective (see `metrics::Metric::SizeH`). Not the cardinality of `set`.
  pub fn size_h(&self) -> usize {
    self.used_sets.len()
  }

  /// The canonical bitset key used to deduplicate expressions by extension.
  pub fn dedup_key(&self) -> String {
    self.set.canonical_key()
  }
}

impl fmt::Display for Expr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.text)
  }
}
