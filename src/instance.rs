//! Random problem-instance generation: base families, targets and
//! ground-truth instances with a known gold expression.
//!
//! Grounded on `tfgcore/include/generator.hpp` (`generar_F`/`generar_G`) and
//! `tfgcore/src/ground_truth.cpp` (`make_groundtruth`), translated from
//! `std::mt19937` + rejection-sampled-without-replacement index draws into
//! `rand`'s `StdRng` + `rand::seq::index::sample`.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use crate::bitset::{Bitset, UNIVERSE_SIZE};
use crate::expr::Expr;
use crate::solver::nsga2::build_random_tree;

/// Generation bounds for a random instance, mirroring the original
/// generator's default knobs (`generator.hpp::GenConfig`).
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct GenConfig {
  /// Minimum size of the random target `G`.
  pub g_size_min: usize,
  /// Minimum number of base sets in `F`.
  pub f_count_min: usize,
  /// Maximum number of base sets in `F`.
  pub f_count_max: usize,
  /// Minimum size of each base set `F_i`.
  pub fi_size_min: usize,
  /// Maximum size of each base set `F_i`.
  pub fi_size_max: usize,
}

impl Default for GenConfig {
  fn default() -> Self {
    Self {
      g_size_min: 10,
      f_count_min: 10,
      f_count_max: 100,
      fi_size_min: 1,
      fi_size_max: 64,
    }
  }
}

/// A generated instance with a known gold expression, for recovery testing.
pub struct GroundTruthInstance {
  /// Base set family.
  pub f: Vec<Bitset>,
  /// Target set, `gold.set()`.
  pub g: Bitset,
  /// The expression used to derive `g`.
  pub gold: Expr,
}

/// Draws a random family of `count` base sets, each a uniformly random
/// subset of `0..UNIVERSE_SIZE` with size in `[size_min, size_max]`.
///
/// # Panics
///
/// Panics if `size_max >= UNIVERSE_SIZE` or `size_min > size_max`.
pub fn random_family(
  count: usize,
  size_min: usize,
  size_max: usize,
  seed: u64,
) -> Vec<Bitset> {
  assert!(size_max < UNIVERSE_SIZE, "Fi size exceeds universe width");
  assert!(size_min <= size_max, "size_min must not exceed size_max");
  let mut rng = StdRng::seed_from_u64(seed);
  (0..count)
    .map(|_| {
      let size = rng.gen_range(size_min..=size_max);
      index::sample(&mut rng, UNIVERSE_SIZE, size)
        .into_iter()
        .collect::<Bitset>()
    })
    .collect()
}

/// Draws a single random target set, a uniformly random subset of
/// `0..UNIVERSE_SIZE` with size in `[size_min, UNIVERSE_SIZE]`.
pub fn random_target(size_min: usize, seed: u64) -> Bitset {
  assert!(size_min <= UNIVERSE_SIZE, "size_min exceeds universe width");
  let mut rng = StdRng::seed_from_u64(seed);
  let size = rng.gen_range(size_min..=UNIVERSE_SIZE);
  index::sample(&mut rng, UNIVERSE_SIZE, size).into_iter().collect()
}

/// Draws a random family whose size is itself drawn from
/// `[config.f_count_min, config.f_count_max]`, base set sizes from
/// `[config.fi_size_min, config.fi_size_max]`.
pub fn random_family_from_config(config: &GenConfig, seed: u64) -> Vec<Bitset> {
  let mut rng = StdRng::seed_from_u64(seed);
  let count = rng.gen_range(config.f_count_min..=config.f_count_max);
  random_family(count, config.fi_size_min, config.fi_size_max, seed)
}

/// Builds a ground-truth instance: a random family `F`, a random gold
/// expression over `F` (and `U`) with at most `k` operators, and the target
/// `G` obtained by evaluating that expression.
pub fn make_ground_truth(
  count: usize,
  size_min: usize,
  size_max: usize,
  k: u32,
  seed_f: u64,
  seed_expr: u64,
) -> GroundTruthInstance {
  let f = random_family(count, size_min, size_max, seed_f);
  let u = Bitset::universe();
  let mut rng = StdRng::seed_from_u64(seed_expr);

  let leaves: Vec<Expr> = f
    .iter()
    .enumerate()
    .map(|(i, &set)| Expr::leaf(i, set))
    .chain(std::iter::once(Expr::universe_as(u)))
    .collect();
  let gold = build_random_tree(&leaves, k, &mut rng);
  let g = *gold.set();

  GroundTruthInstance { f, g, gold }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_random_family_respects_bounds() {
    let f = random_family(10, 4, 8, 1);
    assert_eq!(f.len(), 10);
    for set in &f {
      let pc = set.popcount();
      assert!((4..=8).contains(&(pc as usize)));
    }
  }

  #[test]
  fn test_random_family_deterministic_for_fixed_seed() {
    let a = random_family(5, 2, 6, 42);
    let b = random_family(5, 2, 6, 42);
    for (x, y) in a.iter().zip(b.iter()) {
      assert_eq!(x.canonical_key(), y.canonical_key());
    }
  }

  #[test]
  fn test_random_target_size_bound() {
    let g = random_target(20, 7);
    assert!(g.popcount() as usize >= 20);
  }

  #[test]
  fn test_make_ground_truth_jaccard_one_on_itself() {
    let inst = make_ground_truth(6, 2, 5, 3, 1, 2);
    assert_eq!(crate::metrics::jaccard(inst.gold.set(), &inst.g), 1.0);
    assert!(inst.gold.n_ops() <= 3);
  }

  #[test]
  fn test_gen_config_defaults() {
    let cfg = GenConfig::default();
    assert_eq!(cfg.g_size_min, 10);
    assert_eq!(cfg.f_count_min, 10);
    assert_eq!(cfg.f_count_max, 100);
  }

  #[test]
  fn test_random_family_from_config_respects_count_bounds() {
    let cfg = GenConfig { f_count_min: 3, f_count_max: 6, ..GenConfig::default() };
    let f = random_family_from_config(&cfg, 9);
    assert!((3..=6).contains(&f.len()));
  }
}
