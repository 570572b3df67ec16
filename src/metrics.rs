//! The metric evaluator facade: `M(expr, G, metric) -> f64`.
//!
//! Pure and constant-time relative to the bitset word count. The `0/0 = 1.0`
//! Jaccard convention (ground truth: `tfgcore/metrics.cpp::jaccard_coefficient`)
//! is load-bearing for several edge cases in the solvers and must never
//! propagate `NaN`.

use crate::bitset::Bitset;
use crate::error::Error;
use crate::expr::Expr;

/// The three objectives the solvers search over.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Metric {
  /// `|H∩G| / |H∪G|`, maximised. `1.0` when both sets are empty.
  Jaccard,
  /// `|used_sets|`, minimised. A structural cost proxy, not `|H|`.
  SizeH,
  /// `n_ops`, minimised.
  OpSize,
}

impl Metric {
  /// Parses a metric name, case-insensitively, accepting the aliases `iou`
  /// (for `Jaccard`) and `size`/`op_size` (for `SizeH`/`OpSize`).
  pub fn parse(name: &str) -> Result<Self, Error> {
    match name.to_ascii_lowercase().as_str() {
      "jaccard" | "iou" => Ok(Metric::Jaccard),
      "sizeh" | "size" => Ok(Metric::SizeH),
      "opsize" | "op_size" => Ok(Metric::OpSize),
      other => {
        Err(Error::InvalidParameter(format!("unknown metric: {other}")))
      }
    }
  }

  /// Whether larger values of this metric are better.
  pub fn is_maximization(&self) -> bool {
    matches!(self, Metric::Jaccard)
  }
}

/// The Jaccard similarity of two bitsets, with the `0/0 := 1.0` convention.
pub fn jaccard(h: &Bitset, g: &Bitset) -> f64 {
  let intersection = h.intersect(g).popcount();
  let union = h.union(g).popcount();
  if union == 0 {
    1.0
  } else {
    f64::from(intersection) / f64::from(union)
  }
}

/// Evaluates `expr` against `g` under `metric`.
pub fn evaluate(expr: &Expr, g: &Bitset, metric: Metric) -> f64 {
  match metric {
    Metric::Jaccard => jaccard(expr.set(), g),
    Metric::SizeH => expr.size_h() as f64,
    Metric::OpSize => f64::from(expr.n_ops()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::expr::Expr;

  #[test]
  fn test_jaccard_both_empty_is_one() {
    assert_eq!(jaccard(&Bitset::empty(), &Bitset::empty()), 1.0);
  }

  #[test]
  fn test_jaccard_typical() {
    let h: Bitset = [0, 1, 2].into_iter().collect();
    let g: Bitset = [1, 2, 3].into_iter().collect();
    // intersection {1,2} = 2, union {0,1,2,3} = 4
    assert_eq!(jaccard(&h, &g), 0.5);
  }

  #[test]
  fn test_jaccard_no_nan() {
    let h = Bitset::empty();
    let g: Bitset = [0].into_iter().collect();
    assert!(!jaccard(&h, &g).is_nan());
  }

  #[test]
  fn test_size_h_is_structural_not_cardinality() {
    let f0 = Expr::leaf(0, Bitset::universe());
    // |used_sets| = 1 even though |H| = 128
    assert_eq!(evaluate(&f0, &Bitset::empty(), Metric::SizeH), 1.0);
  }

  #[test]
  fn test_metric_parse() {
    assert_eq!(Metric::parse("Jaccard").unwrap(), Metric::Jaccard);
    assert_eq!(Metric::parse("iou").unwrap(), Metric::Jaccard);
    assert_eq!(Metric::parse("sizeh").unwrap(), Metric::SizeH);
    assert_eq!(Metric::parse("op_size").unwrap(), Metric::OpSize);
    assert!(Metric::parse("bogus").is_err());
  }
}
