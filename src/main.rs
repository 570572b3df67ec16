//! Binary entry point: parses CLI arguments, generates (or receives) a
//! problem instance, runs the selected solver(s), and prints a
//! human-readable report.

use std::time::Instant;

use log::info;

use setexpr::cli::{self, AlgoChoice};
use setexpr::driver;
use setexpr::instance;
use setexpr::solver::{exhaustive, greedy, nsga2, spea2};

fn main() {
  env_logger::init();

  let args = match cli::parse_args(std::env::args().skip(1)) {
    Ok(args) => args,
    Err(e) => {
      eprintln!("error: {e}");
      std::process::exit(1);
    }
  };

  info!("generating instance: n_sets={} k={} seed={}", args.n_sets, args.k, args.seed);
  let gt = instance::make_ground_truth(
    args.n_sets,
    args.set_size_min,
    args.set_size_max,
    args.k,
    args.seed,
    args.seed,
  );
  let u = setexpr::bitset::Bitset::universe();

  print!(
    "{}",
    driver::format_instance_block(&gt.f, args.k, args.seed, Some(&gt.gold), &gt.g)
  );

  let run_exhaustive = matches!(args.algo, AlgoChoice::Exhaustive | AlgoChoice::All);
  let run_greedy = matches!(args.algo, AlgoChoice::Greedy | AlgoChoice::All);
  let run_nsga2 = matches!(args.algo, AlgoChoice::Nsga2 | AlgoChoice::All);
  let run_spea2 = matches!(args.algo, AlgoChoice::Spea2 | AlgoChoice::All);

  if run_exhaustive {
    let t0 = Instant::now();
    let front = exhaustive::exhaustive(&gt.f, &u, &gt.g, args.k);
    print!(
      "{}",
      driver::format_algorithm_block("EXHAUSTIVE", None, t0.elapsed(), &front)
    );
  }

  if run_greedy {
    let t0 = Instant::now();
    let front = greedy::greedy(&gt.f, &u, &gt.g, args.k);
    print!(
      "{}",
      driver::format_algorithm_block("GREEDY", None, t0.elapsed(), &front)
    );
  }

  if run_nsga2 {
    let params = nsga2::NsgaParams::builder()
      .population_size(args.population_size)
      .max_generations(args.max_generations)
      .time_limit_sec(args.time_limit_sec)
      .crossover_prob(args.crossover_prob)
      .mutation_prob(args.mutation_prob)
      .tournament_size(args.tournament_size)
      .seed(args.seed)
      .build();
    let params_line = driver::format_genetic_params(
      args.population_size,
      args.crossover_prob,
      args.mutation_prob,
      args.tournament_size,
    );
    let t0 = Instant::now();
    let front = nsga2::nsga2(&gt.f, &u, &gt.g, args.k, &params);
    print!(
      "{}",
      driver::format_algorithm_block(
        "NSGA-II",
        Some(&params_line),
        t0.elapsed(),
        &front
      )
    );
  }

  if run_spea2 {
    let params = spea2::Spea2Params::builder()
      .population_size(args.population_size)
      .archive_size(args.population_size)
      .max_generations(args.max_generations)
      .time_limit_sec(args.time_limit_sec)
      .pc(args.crossover_prob)
      .pm(args.mutation_prob)
      .tournament_k(args.tournament_size)
      .seed(args.seed)
      .build();
    let params_line = driver::format_genetic_params(
      args.population_size,
      args.crossover_prob,
      args.mutation_prob,
      args.tournament_size,
    );
    let t0 = Instant::now();
    let front = spea2::spea2(&gt.f, &u, &gt.g, args.k, &params);
    print!(
      "{}",
      driver::format_algorithm_block(
        "SPEA2",
        Some(&params_line),
        t0.elapsed(),
        &front
      )
    );
  }
}
