//! NSGA-II: a fast and elitist multi-objective genetic algorithm.
//!
//! The environmental-selection machinery (fast non-dominated sort, crowding
//! distance, front-by-front truncation) is adapted directly from the
//! teacher crate's `optimizer/nsga.rs::crowding_distance_selection`,
//! retargeted from a generic `Solution`/`Scores<N>` pair onto this
//! problem's concrete [`Individual`]/three named objectives. The
//! domain-specific operators (initialisation, crossover, mutation, the
//! random-tree builder) are grounded on
//! `tfgcore/include/genetico.hpp` and the only non-empty random-tree
//! builder in the original sources, `tfgcore/spea2.cpp::build_random_expr`.

use std::collections::HashSet;
use std::time::Instant;

use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use typed_builder::TypedBuilder;

use crate::bitset::Bitset;
use crate::expr::{Expr, Op};
use crate::solution::{dominates, pareto_front, Individual, SolMo};

/// Probability that a mutation is a "growth" graft rather than a "rebuild".
/// A tunable default, not a contract (spec §9 open question).
pub(crate) const GROWTH_MUTATION_PROB: f64 = 0.8;
/// Bound on consecutive failed merge attempts in the random-tree builder.
const MAX_TREE_BUILD_FAILURES: u32 = 100;

/// NSGA-II configuration. Built with a compile-time-checked builder, the
/// same way the teacher's `Nsga2` optimizer struct is constructed.
#[derive(TypedBuilder, Debug, Clone)]
pub struct NsgaParams {
  /// Population size `N`.
  #[builder(default = 200)]
  pub population_size: usize,
  /// Generation cap `Gmax`.
  #[builder(default = 10_000)]
  pub max_generations: u64,
  /// Wall-clock cap in seconds.
  #[builder(default = 300)]
  pub time_limit_sec: u64,
  /// Crossover probability `pc`.
  #[builder(default = 0.8)]
  pub crossover_prob: f64,
  /// Mutation probability `pm`.
  #[builder(default = 0.4)]
  pub mutation_prob: f64,
  /// Tournament size `tau`.
  #[builder(default = 2)]
  pub tournament_size: usize,
  /// RNG seed. `None` seeds from OS entropy.
  #[builder(default, setter(strip_option))]
  pub seed: Option<u64>,
}

pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
  match seed {
    Some(s) => StdRng::seed_from_u64(s),
    None => StdRng::from_entropy(),
  }
}

/// Builds a leaf [`Expr`] for building-block index `idx`, where `-1`
/// denotes `U` and `0..m` denotes `F_idx`.
pub(crate) fn block_at(idx: i64, f: &[Bitset], u: &Bitset) -> Expr {
  if idx < 0 {
    Expr::universe_as(*u)
  } else {
    Expr::leaf(idx as usize, f[idx as usize])
  }
}

/// Merges a pool of leaves into a single expression tree by repeatedly
/// combining two random positions with a random operator, accepting a merge
/// only if it keeps `n_ops <= k`. Aborts after `MAX_TREE_BUILD_FAILURES`
/// consecutive rejections and returns the first remaining pool element.
pub(crate) fn build_random_tree(
  leaves: &[Expr],
  k: u32,
  rng: &mut impl Rng,
) -> Expr {
  let mut pool: Vec<Expr> = leaves.to_vec();
  if pool.is_empty() {
    return Expr::empty();
  }
  let mut consecutive_failures = 0u32;
  while pool.len() > 1 {
    if consecutive_failures >= MAX_TREE_BUILD_FAILURES {
      break;
    }
    let a = rng.gen_range(0..pool.len());
    let mut b = rng.gen_range(0..pool.len());
    while b == a {
      b = rng.gen_range(0..pool.len());
    }
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    let op = Op::ALL[rng.gen_range(0..Op::ALL.len())];
    let candidate = Expr::combine(op, &pool[lo], &pool[hi]);
    if candidate.n_ops() <= k {
      pool[lo] = candidate;
      pool.remove(hi);
      consecutive_failures = 0;
    } else {
      consecutive_failures += 1;
    }
  }
  pool.into_iter().next().expect("pool is never empty")
}

/// Produces `n` distinct (by rendered text) individuals.
pub(crate) fn init_population(
  f: &[Bitset],
  u: &Bitset,
  g: &Bitset,
  k: u32,
  n: usize,
  rng: &mut impl Rng,
) -> Vec<Individual> {
  let m = f.len();
  let max_c = ((m + 1).min(k as usize + 1)).max(1);
  let mut population = Vec::with_capacity(n);
  let mut seen: HashSet<String> = HashSet::with_capacity(n * 2);
  let guard = n.saturating_mul(200).max(2_000);

  for _ in 0..guard {
    if population.len() >= n {
      break;
    }
    let c = rng.gen_range(1..=max_c);
    let mut indices: Vec<i64> = (-1..m as i64).collect();
    indices.shuffle(rng);
    indices.truncate(c);

    let leaves: Vec<Expr> =
      indices.iter().map(|&idx| block_at(idx, f, u)).collect();
    let expr = build_random_tree(&leaves, k, rng);
    if seen.insert(expr.text().to_string()) {
      population.push(Individual::new(SolMo::new(expr, g)));
    }
  }
  population
}

/// Tournament of size `tau`: the winner minimises rank, ties broken by
/// higher crowding distance.
pub(crate) fn tournament_select<'a>(
  pop: &'a [Individual],
  tau: usize,
  rng: &mut impl Rng,
) -> &'a Individual {
  let mut best = &pop[rng.gen_range(0..pop.len())];
  for _ in 1..tau.max(1) {
    let candidate = &pop[rng.gen_range(0..pop.len())];
    if candidate.rank < best.rank
      || (candidate.rank == best.rank && candidate.crowd > best.crowd)
    {
      best = candidate;
    }
  }
  best
}

/// One-node graft crossover: order the parents randomly, graft them under a
/// random operator if the result fits the budget `k`, else return the
/// better parent by Jaccard.
pub(crate) fn crossover(
  p1: &Individual,
  p2: &Individual,
  g: &Bitset,
  k: u32,
  rng: &mut impl Rng,
) -> SolMo {
  let (left, right) = if rng.gen_bool(0.5) { (p1, p2) } else { (p2, p1) };
  if left.expr().n_ops() + right.expr().n_ops() + 1 > k {
    return if left.sol().jaccard() >= right.sol().jaccard() {
      left.sol().clone()
    } else {
      right.sol().clone()
    };
  }
  let op = Op::ALL[rng.gen_range(0..Op::ALL.len())];
  let child = Expr::combine(op, left.expr(), right.expr());
  SolMo::new(child, g)
}

/// Two-kind mutation: growth (graft a random block) with probability
/// [`GROWTH_MUTATION_PROB`], otherwise a rebuild from a perturbed
/// `used_sets`.
pub(crate) fn mutate(
  sol: &SolMo,
  f: &[Bitset],
  u: &Bitset,
  g: &Bitset,
  k: u32,
  rng: &mut impl Rng,
) -> SolMo {
  if rng.gen_bool(GROWTH_MUTATION_PROB) {
    if sol.n_ops() + 1 > k {
      return sol.clone();
    }
    let m = f.len() as i64;
    let block = block_at(rng.gen_range(-1..=m - 1), f, u);
    let op = Op::ALL[rng.gen_range(0..Op::ALL.len())];
    let child = if rng.gen_bool(0.5) {
      Expr::combine(op, sol.expr(), &block)
    } else {
      Expr::combine(op, &block, sol.expr())
    };
    SolMo::new(child, g)
  } else {
    let m = f.len() as i64;
    let mut used: Vec<i64> =
      sol.expr().used_sets().iter().map(|&i| i as i64).collect();
    let drawn = rng.gen_range(-1..=m - 1);
    if used.is_empty() || rng.gen_bool(0.5) {
      used.push(drawn);
    } else {
      let pos = rng.gen_range(0..used.len());
      used[pos] = drawn;
    }
    used.sort_unstable();
    used.dedup();
    used.shuffle(rng);

    let leaves: Vec<Expr> =
      used.iter().map(|&idx| block_at(idx, f, u)).collect();
    let tree = build_random_tree(&leaves, k, rng);
    SolMo::new(tree, g)
  }
}

/// Produces `n` distinct (by rendered text, against the current
/// generation) offspring via tournament selection, crossover and mutation.
#[allow(clippy::too_many_arguments)]
fn make_offspring(
  population: &[Individual],
  f: &[Bitset],
  u: &Bitset,
  g: &Bitset,
  k: u32,
  params: &NsgaParams,
  rng: &mut impl Rng,
) -> Vec<Individual> {
  let mut seen: HashSet<String> = population
    .iter()
    .map(|ind| ind.expr().text().to_string())
    .collect();
  let mut offspring = Vec::with_capacity(params.population_size);
  let guard = params.population_size.saturating_mul(200).max(2_000);

  for _ in 0..guard {
    if offspring.len() >= params.population_size {
      break;
    }
    let p1 = tournament_select(population, params.tournament_size, rng);
    let p2 = tournament_select(population, params.tournament_size, rng);

    let mut child = if rng.gen_bool(params.crossover_prob) {
      crossover(p1, p2, g, k, rng)
    } else if rng.gen_bool(0.5) {
      p1.sol().clone()
    } else {
      p2.sol().clone()
    };

    if rng.gen_bool(params.mutation_prob) {
      child = mutate(&child, f, u, g, k, rng);
    }

    if seen.insert(child.expr().text().to_string()) {
      offspring.push(Individual::new(child));
    }
  }
  offspring
}

/// Fast non-dominated sort: partitions `pop`'s indices into successive
/// non-domination fronts.
fn fast_non_dominated_sort(pop: &[Individual]) -> Vec<Vec<usize>> {
  let n = pop.len();
  let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
  let mut domination_count: Vec<u32> = vec![0; n];
  let mut fronts: Vec<Vec<usize>> = vec![Vec::new()];

  for p in 0..n {
    for q in 0..n {
      if p == q {
        continue;
      }
      if dominates(pop[p].sol(), pop[q].sol()) {
        dominated_by[p].push(q);
      } else if dominates(pop[q].sol(), pop[p].sol()) {
        domination_count[p] += 1;
      }
    }
    if domination_count[p] == 0 {
      fronts[0].push(p);
    }
  }

  let mut i = 0;
  while !fronts[i].is_empty() {
    let mut next_front = Vec::new();
    for &p in &fronts[i] {
      for &q in &dominated_by[p] {
        domination_count[q] -= 1;
        if domination_count[q] == 0 {
          next_front.push(q);
        }
      }
    }
    i += 1;
    fronts.push(next_front);
  }
  fronts.pop(); // trailing empty front
  fronts
}

/// Crowding distance of each member of `front`, in the same order as
/// `front`. A lone member gets `+infinity`.
fn crowding_distance(front: &[usize], pop: &[Individual]) -> Vec<f64> {
  let n = front.len();
  if n == 1 {
    return vec![f64::INFINITY];
  }
  let mut dist = vec![0.0f64; n];
  let objectives: [fn(&Individual) -> f64; 3] = [
    |ind| ind.sol().jaccard(),
    |ind| ind.sol().n_ops() as f64,
    |ind| ind.sol().size_h() as f64,
  ];

  for obj in objectives {
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
      obj(&pop[front[a]])
        .partial_cmp(&obj(&pop[front[b]]))
        .unwrap_or(std::cmp::Ordering::Equal)
    });

    dist[order[0]] = f64::INFINITY;
    dist[order[n - 1]] = f64::INFINITY;

    let min_v = obj(&pop[front[order[0]]]);
    let max_v = obj(&pop[front[order[n - 1]]]);
    let span = if (max_v - min_v).abs() > f64::EPSILON {
      max_v - min_v
    } else {
      1.0
    };

    for w in 1..n.saturating_sub(1) {
      if dist[order[w]].is_finite() {
        let next_v = obj(&pop[front[order[w + 1]]]);
        let prev_v = obj(&pop[front[order[w - 1]]]);
        dist[order[w]] += (next_v - prev_v).abs() / span;
      }
    }
  }
  dist
}

/// Environmental selection: appends whole fronts until the next would
/// overflow, then fills the remainder from the overflow front by largest
/// crowding distance. Sets `rank`/`crowd` on every surviving individual.
fn environmental_selection(
  mut combined: Vec<Individual>,
  n: usize,
) -> Vec<Individual> {
  let fronts = fast_non_dominated_sort(&combined);
  let mut rank_crowd: Vec<(u32, f64)> = vec![(0, 0.0); combined.len()];
  let mut selected: Vec<usize> = Vec::with_capacity(n);

  for (rank, front) in fronts.iter().enumerate() {
    let cd = crowding_distance(front, &combined);
    for (i, &idx) in front.iter().enumerate() {
      rank_crowd[idx] = (rank as u32, cd[i]);
    }
    if selected.len() + front.len() <= n {
      selected.extend_from_slice(front);
    } else {
      let remaining = n - selected.len();
      let mut paired: Vec<(usize, f64)> =
        front.iter().zip(cd.iter()).map(|(&idx, &d)| (idx, d)).collect();
      paired.sort_by(|a, b| {
        b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
      });
      selected.extend(paired.into_iter().take(remaining).map(|(idx, _)| idx));
      break;
    }
  }

  for &idx in &selected {
    let (rank, crowd) = rank_crowd[idx];
    combined[idx].rank = rank;
    combined[idx].crowd = crowd;
  }

  let mut slots: Vec<Option<Individual>> =
    combined.into_iter().map(Some).collect();
  let mut result: Vec<Individual> = selected
    .iter()
    .map(|&idx| slots[idx].take().expect("index selected at most once"))
    .collect();
  result.sort_by(|a, b| {
    a.rank
      .cmp(&b.rank)
      .then_with(|| b.crowd.partial_cmp(&a.crowd).unwrap_or(std::cmp::Ordering::Equal))
  });
  result
}

/// Runs NSGA-II until the generation cap or time limit is reached, then
/// returns the Pareto front of the final population.
pub fn nsga2(
  f: &[Bitset],
  u: &Bitset,
  g: &Bitset,
  k: u32,
  params: &NsgaParams,
) -> Vec<SolMo> {
  let mut rng = make_rng(params.seed);
  let initial = init_population(f, u, g, k, params.population_size, &mut rng);
  if initial.is_empty() {
    warn!("nsga2: initial population is empty, returning an empty front");
    return Vec::new();
  }
  debug!("nsga2: initial population of {} individuals", initial.len());
  let mut population = environmental_selection(initial.clone(), initial.len());

  let start = Instant::now();
  let mut generation = 0u64;
  while generation < params.max_generations {
    let offspring = make_offspring(&population, f, u, g, k, params, &mut rng);
    if start.elapsed().as_secs_f64() >= params.time_limit_sec as f64 {
      debug!("nsga2: time limit reached at generation {generation}");
      break;
    }
    let mut combined = population;
    combined.extend(offspring);
    population = environmental_selection(combined, params.population_size);
    generation += 1;
    trace!(
      "nsga2: generation {generation} front0_size={}",
      population.iter().filter(|ind| ind.rank == 0).count()
    );
  }

  debug!("nsga2: ran {generation} generations over a population of {}", population.len());
  pareto_front(population.into_iter().map(|ind| ind.sol().clone()).collect())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_op_count_bound() {
    let f = vec![
      Bitset::from_iter([0, 1]),
      Bitset::from_iter([2, 3]),
      Bitset::from_iter([4, 5]),
    ];
    let u = Bitset::universe();
    let g = Bitset::from_iter([0, 1, 4, 5]);
    let params = NsgaParams::builder()
      .population_size(20)
      .max_generations(5)
      .time_limit_sec(5)
      .seed(42)
      .build();
    let front = nsga2(&f, &u, &g, 2, &params);
    assert!(front.iter().all(|s| s.n_ops() <= 2));
  }

  #[test]
  fn test_jaccard_range() {
    let f = vec![Bitset::from_iter([0, 1, 2]), Bitset::from_iter([3, 4])];
    let u = Bitset::universe();
    let g = Bitset::from_iter([0, 1, 3]);
    let params = NsgaParams::builder()
      .population_size(30)
      .max_generations(10)
      .seed(7)
      .build();
    let front = nsga2(&f, &u, &g, 3, &params);
    assert!(front.iter().all(|s| (0.0..=1.0).contains(&s.jaccard())));
  }

  #[test]
  fn test_pareto_closure() {
    let f = vec![
      Bitset::from_iter([0, 1]),
      Bitset::from_iter([1, 2]),
      Bitset::from_iter([2, 3]),
    ];
    let u = Bitset::universe();
    let g = Bitset::from_iter([0, 1, 2]);
    let params = NsgaParams::builder()
      .population_size(40)
      .max_generations(15)
      .seed(99)
      .build();
    let front = nsga2(&f, &u, &g, 3, &params);
    for i in 0..front.len() {
      for j in 0..front.len() {
        if i != j {
          assert!(!dominates(&front[i], &front[j]));
        }
      }
    }
  }

  #[test]
  fn test_ground_truth_recovery_within_generations() {
    let f = vec![
      Bitset::from_iter([0, 1, 2]),
      Bitset::from_iter([3, 4]),
      Bitset::from_iter([5, 6, 7]),
    ];
    let u = Bitset::universe();
    let gold =
      Expr::combine(Op::Union, &Expr::leaf(0, f[0]), &Expr::leaf(1, f[1]));
    let g = *gold.set();
    let params = NsgaParams::builder()
      .population_size(80)
      .max_generations(60)
      .time_limit_sec(10)
      .seed(2024)
      .build();
    let front = nsga2(&f, &u, &g, 2, &params);
    assert!(front.iter().any(|s| s.jaccard() == 1.0));
  }

  #[test]
  fn test_crowding_distance_single_member_is_infinite() {
    let f = vec![Bitset::from_iter([0])];
    let g = Bitset::from_iter([0]);
    let sol = SolMo::new(Expr::leaf(0, f[0]), &g);
    let pop = vec![Individual::new(sol)];
    let dist = crowding_distance(&[0], &pop);
    assert_eq!(dist, vec![f64::INFINITY]);
  }

  #[test]
  fn test_fast_non_dominated_sort_first_front_nondominated() {
    let g = Bitset::from_iter([0, 1]);
    let a = Individual::new(SolMo::new(Expr::leaf(0, Bitset::from_iter([0, 1])), &g));
    let b = Individual::new(SolMo::new(Expr::leaf(1, Bitset::from_iter([0])), &g));
    let pop = vec![a, b];
    let fronts = fast_non_dominated_sort(&pop);
    assert_eq!(fronts[0], vec![0]);
  }
}
