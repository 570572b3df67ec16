//! Greedy hill-climbing constructive solver.
//!
//! Grounded on spec §4.4 and `tfgcore/include/greedy.hpp`. The per-step
//! search over `(op, rhs)` pairs is the embarrassingly parallel inner loop
//! of §5 (base sets × three operators), parallelized with `rayon` as the
//! teacher parallelizes its per-solution operators.

use log::trace;
use rayon::prelude::*;

use crate::bitset::Bitset;
use crate::expr::{Expr, Op};
use crate::solution::{pareto_front, SolMo};

/// Lexicographic ordering used to pick the best next step and to decide
/// whether a step is a strict improvement: Jaccard descending, `sizeH`
/// ascending, `n_ops` ascending.
fn is_strictly_better(a: &SolMo, b: &SolMo) -> bool {
  use std::cmp::Ordering::*;
  match a.jaccard().partial_cmp(&b.jaccard()).unwrap_or(Equal) {
    Greater => true,
    Less => false,
    Equal => match a.size_h().cmp(&b.size_h()) {
      Less => true,
      Greater => false,
      Equal => a.n_ops() < b.n_ops(),
    },
  }
}

/// Builds a single expression via `k` hill-climbing steps, recording every
/// intermediate and explored expression as a Pareto candidate. Returns the
/// Pareto front of the full candidate pool.
pub fn greedy(f: &[Bitset], u: &Bitset, g: &Bitset, k: u32) -> Vec<SolMo> {
  let building_blocks: Vec<Expr> = f
    .iter()
    .enumerate()
    .map(|(i, &set)| Expr::leaf(i, set))
    .chain(std::iter::once(Expr::universe_as(*u)))
    .collect();

  let mut curr = Expr::empty();
  let mut curr_sol = SolMo::new(curr.clone(), g);
  let mut pool: Vec<SolMo> = vec![curr_sol.clone()];

  for _ in 0..k {
    let candidates: Vec<(Expr, SolMo, Expr)> = Op::ALL
      .into_par_iter()
      .flat_map(|op| {
        let curr_ref = &curr;
        building_blocks.par_iter().map(move |rhs| {
          let candidate = Expr::combine(op, curr_ref, rhs);
          let sol = SolMo::new(candidate.clone(), g);
          (candidate, sol, rhs.clone())
        })
      })
      .collect();

    pool.extend(candidates.iter().map(|(_, sol, _)| sol.clone()));

    let best = candidates
      .iter()
      .max_by(|(_, a, _), (_, b, _)| {
        if is_strictly_better(a, b) {
          std::cmp::Ordering::Greater
        } else if is_strictly_better(b, a) {
          std::cmp::Ordering::Less
        } else {
          std::cmp::Ordering::Equal
        }
      })
      .expect("building_blocks is never empty: U is always a candidate");

    let (best_expr, best_sol, best_rhs) = best;
    if !is_strictly_better(best_sol, &curr_sol) {
      trace!("greedy: no strictly better step found, stopping early");
      break;
    }

    // Naming convention: a transition out of ∅ re-labels to just the `rhs`
    // that won the step, so it doesn't spend an operation representing what
    // is really a leaf pick.
    let is_empty_start = curr.used_sets().is_empty() && curr.n_ops() == 0;
    curr = if is_empty_start { best_rhs.clone() } else { best_expr.clone() };
    curr_sol = SolMo::new(curr.clone(), g);
    pool.push(curr_sol.clone());
    trace!(
      "greedy: step accepted, jaccard={} n_ops={}",
      curr_sol.jaccard(),
      curr_sol.n_ops()
    );
  }

  pareto_front(pool)
}
