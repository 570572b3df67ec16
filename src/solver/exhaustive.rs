//! Exhaustive expression enumeration: a ground-truth oracle for small `k`
//! and small `m`.
//!
//! Grounded on spec §4.3 and `tfgcore/include/exhaustiva.hpp`
//! (`exhaustive_search`/`evaluar_subconjuntos`). The inner per-level
//! combination loop is embarrassingly parallel (§5): each level's
//! `(op, a, b)` partitions are expanded with `rayon`, then reduced to a
//! single deduplicated candidate list — mirroring the teacher's
//! `ParBatch`/`ParEach` map-then-combine contract.

use std::collections::HashMap;

use log::debug;
use rayon::prelude::*;

use crate::bitset::Bitset;
use crate::expr::{Expr, Op};
use crate::solution::{pareto_front, SolMo};

/// Enumerates every expression of operator count `0..=k` over leaves
/// `{F_i} ∪ {U, ∅}`, evaluates each against `g`, and returns the Pareto
/// front of the full accumulated candidate set.
pub fn exhaustive(f: &[Bitset], u: &Bitset, g: &Bitset, k: u32) -> Vec<SolMo> {
  let levels = enumerate_levels(f, u, k);
  let candidates: Vec<SolMo> = levels
    .into_iter()
    .flatten()
    .map(|expr| SolMo::new(expr, g))
    .collect();
  pareto_front(candidates)
}

/// Builds `E[0..=k]`: for each level, the distinct (by evaluated extension)
/// expressions with exactly that many operators.
pub fn enumerate_levels(f: &[Bitset], u: &Bitset, k: u32) -> Vec<Vec<Expr>> {
  let mut levels: Vec<Vec<Expr>> = Vec::with_capacity(k as usize + 1);

  let mut level0 = Vec::with_capacity(f.len() + 2);
  level0.push(Expr::universe_as(*u));
  level0.push(Expr::empty());
  for (i, &set) in f.iter().enumerate() {
    level0.push(Expr::leaf(i, set));
  }
  levels.push(dedup_by_extension(level0));
  debug!("exhaustive: level 0 has {} distinct expressions", levels[0].len());

  for s in 1..=k {
    let mut partitions: Vec<(u32, u32)> = Vec::new();
    for a in 0..s {
      let b = s - 1 - a;
      partitions.push((a, b));
    }

    let candidates: Vec<Expr> = partitions
      .into_par_iter()
      .flat_map(|(a, b)| {
        let lhs_pool = &levels[a as usize];
        let rhs_pool = &levels[b as usize];
        Op::ALL
          .into_par_iter()
          .flat_map_iter(move |op| {
            lhs_pool.iter().flat_map(move |l| {
              rhs_pool.iter().map(move |r| Expr::combine(op, l, r))
            })
          })
          .collect::<Vec<_>>()
      })
      .collect();

    levels.push(dedup_by_extension(candidates));
    debug!(
      "exhaustive: level {s} has {} distinct expressions",
      levels[s as usize].len()
    );
  }

  levels
}

/// Deduplicates a list of expressions by their evaluated extension,
/// keeping the first expression to produce a given bitset.
fn dedup_by_extension(exprs: Vec<Expr>) -> Vec<Expr> {
  let mut seen: HashMap<String, ()> = HashMap::with_capacity(exprs.len());
  let mut out = Vec::with_capacity(exprs.len());
  for expr in exprs {
    if seen.insert(expr.dedup_key(), ()).is_none() {
      out.push(expr);
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_s1_union_reaches_jaccard_one() {
    // F = [{0,1},{2,3},{4,5}], G = {0,1,4,5}, k=2
    let f = vec![
      Bitset::from_iter([0, 1]),
      Bitset::from_iter([2, 3]),
      Bitset::from_iter([4, 5]),
    ];
    let u = Bitset::universe();
    let g = Bitset::from_iter([0, 1, 4, 5]);
    let front = exhaustive(&f, &u, &g, 2);
    let hit = front.iter().find(|s| s.jaccard() == 1.0).expect("no hit");
    assert_eq!(hit.n_ops(), 1);
    assert_eq!(hit.size_h(), 2);
    assert_eq!(hit.expr().text(), "(F0 ∪ F2)");
  }

  #[test]
  fn test_s3_difference_required() {
    // F = [{0,1,2,3},{2,3}], G = {0,1}, k=1
    let f = vec![Bitset::from_iter([0, 1, 2, 3]), Bitset::from_iter([2, 3])];
    let u = Bitset::universe();
    let g = Bitset::from_iter([0, 1]);
    let front = exhaustive(&f, &u, &g, 1);
    let hit = front.iter().find(|s| s.jaccard() == 1.0).expect("no hit");
    assert_eq!(hit.expr().text(), "(F0 \\ F1)");
    assert_eq!(hit.n_ops(), 1);
    assert_eq!(hit.size_h(), 2);
  }

  #[test]
  fn test_s5_equal_structure_worse_jaccard_is_dominated() {
    // F0 and F1 are both leaves (n_ops=0, sizeH=1), so they tie on the two
    // structural objectives; whichever has the worse Jaccard is strictly
    // dominated and must not survive to the front, despite both appearing
    // "non-dominated" if read carelessly.
    let f = vec![Bitset::from_iter([0]), Bitset::universe()];
    let u = Bitset::universe();
    let g = Bitset::from_iter([0, 1]);
    let front = exhaustive(&f, &u, &g, 2);
    assert!(front.iter().any(|s| s.expr().text() == "F0"));
    assert!(!front.iter().any(|s| s.expr().text() == "F1"));
  }

  #[test]
  fn test_s6_empty_universe_edge_case() {
    let f: Vec<Bitset> = vec![];
    let u = Bitset::universe();
    let g = Bitset::empty();
    let front = exhaustive(&f, &u, &g, 0);
    // only {U, ∅} are admitted as leaves; ∅ has jaccard=1.0 (both empty)
    assert!(front.iter().any(|s| s.expr().text() == "∅" && s.jaccard() == 1.0));
    assert!(front.len() <= 2);
  }

  #[test]
  fn test_op_count_bound() {
    let f = vec![
      Bitset::from_iter([0, 1]),
      Bitset::from_iter([2, 3]),
      Bitset::from_iter([4, 5]),
    ];
    let u = Bitset::universe();
    let g = Bitset::from_iter([0, 1, 2]);
    let front = exhaustive(&f, &u, &g, 2);
    assert!(front.iter().all(|s| s.n_ops() <= 2));
  }

  #[test]
  fn test_pareto_closure_no_pair_dominates() {
    let f = vec![Bitset::from_iter([0, 1]), Bitset::from_iter([1, 2])];
    let u = Bitset::universe();
    let g = Bitset::from_iter([0, 2]);
    let front = exhaustive(&f, &u, &g, 2);
    for i in 0..front.len() {
      for j in 0..front.len() {
        if i != j {
          assert!(!crate::solution::dominates(&front[i], &front[j]));
        }
      }
    }
  }

  #[test]
  fn test_ground_truth_recovery() {
    let f = vec![
      Bitset::from_iter([0, 1, 2]),
      Bitset::from_iter([3, 4]),
      Bitset::from_iter([5, 6, 7]),
    ];
    let u = Bitset::universe();
    // gold: F0 ∪ F1
    let gold = Expr::combine(Op::Union, &Expr::leaf(0, f[0]), &Expr::leaf(1, f[1]));
    let g = *gold.set();
    let front = exhaustive(&f, &u, &g, 2);
    assert!(front.iter().any(|s| s.jaccard() == 1.0));
  }
}
