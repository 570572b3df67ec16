//! Human-readable report formatting.
//!
//! Grounded on `tfgcore/src/main.cpp`'s console report (the instance block,
//! per-algorithm block and reproducibility dump), rewritten as pure
//! string-building functions so the report shape is independently testable
//! from actually running a solver.

use std::time::Duration;

use crate::bitset::Bitset;
use crate::expr::Expr;
use crate::solution::SolMo;

/// Maximum number of indices printed before a set's reproducibility dump is
/// truncated with `...`.
const MAX_INDICES_SHOWN: usize = 64;

/// Formats a bitset's set indices as a comma-separated list, truncated at
/// [`MAX_INDICES_SHOWN`] entries.
pub fn format_indices(set: &Bitset) -> String {
  let mut out = String::new();
  for (shown, idx) in set.iter_indices().enumerate() {
    if shown >= MAX_INDICES_SHOWN {
      out.push_str("...");
      break;
    }
    if shown > 0 {
      out.push_str(", ");
    }
    out.push_str(&idx.to_string());
  }
  out
}

/// The instance block: universe width, family size, budget, gold expression
/// (if known), and the reproducibility dump of `G` and every `F_i` as
/// comma-separated indices.
pub fn format_instance_block(
  f: &[Bitset],
  k: u32,
  seed: u64,
  gold: Option<&Expr>,
  g: &Bitset,
) -> String {
  let mut out = String::new();
  out.push_str("=== INSTANCE ===\n");
  out.push_str(&format!("seed: {seed}\n"));
  out.push_str(&format!("universe_size: {}\n", crate::bitset::UNIVERSE_SIZE));
  out.push_str(&format!("f_count: {}\n", f.len()));
  out.push_str(&format!("k: {k}\n"));
  if let Some(expr) = gold {
    out.push_str(&format!("gold_expr: {}\n", expr.text()));
    out.push_str(&format!(
      "gold_jaccard: {}\n",
      crate::metrics::jaccard(expr.set(), g)
    ));
  }
  out.push_str(&format!("g_indices: {}\n", format_indices(g)));
  for (i, set) in f.iter().enumerate() {
    out.push_str(&format!("f{i}_indices: {}\n", format_indices(set)));
  }
  out
}

/// One formatted Pareto-front line: rendering, Jaccard, `n_ops`, `sizeH`.
pub fn format_solution_line(sol: &SolMo) -> String {
  format!(
    "{:<40} jaccard={:.4} n_ops={} size_h={}",
    sol.expr().text(),
    sol.jaccard(),
    sol.n_ops(),
    sol.size_h()
  )
}

/// Renders the genetic solvers' selected parameters, for the per-algorithm
/// block's `params:` line.
pub fn format_genetic_params(
  population_size: usize,
  crossover_prob: f64,
  mutation_prob: f64,
  tournament_size: usize,
) -> String {
  format!(
    "pop_size={population_size} crossover_prob={crossover_prob:.2} \
     mutation_prob={mutation_prob:.2} tournament_size={tournament_size}"
  )
}

/// The per-algorithm report block: name, the algorithm's selected
/// parameters (`None` for exhaustive/greedy, which take none), elapsed
/// wall time, one line per front member, and whether any member reaches
/// `jaccard == 1.0`.
pub fn format_algorithm_block(
  name: &str,
  params: Option<&str>,
  elapsed: Duration,
  front: &[SolMo],
) -> String {
  let mut out = String::new();
  out.push_str(&format!("=== {name} ===\n"));
  if let Some(p) = params {
    out.push_str(&format!("params: {p}\n"));
  }
  out.push_str(&format!("elapsed_ms: {}\n", elapsed.as_millis()));
  out.push_str(&format!("front_size: {}\n", front.len()));
  for sol in front {
    out.push_str(&format_solution_line(sol));
    out.push('\n');
  }
  let hit = front.iter().any(|s| s.jaccard() == 1.0);
  out.push_str(&format!("hit_target: {}\n", if hit { "yes" } else { "no" }));
  out
}
