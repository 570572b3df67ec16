//! A hand-rolled command-line argument parser.
//!
//! Grounded on spec.md §6's CLI surface table. No argument-parsing crate is
//! added: the teacher carries none, and the flag surface here is small
//! enough to parse directly and test as plain data, the same way the
//! original's `main.cpp` reads `argv` by hand.

use crate::error::Error;

/// Which algorithm(s) to run.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AlgoChoice {
  /// Exhaustive enumeration.
  Exhaustive,
  /// Greedy hill-climbing.
  Greedy,
  /// NSGA-II.
  Nsga2,
  /// SPEA2.
  Spea2,
  /// All four, in that order.
  All,
}

impl AlgoChoice {
  fn parse(s: &str) -> Result<Self, Error> {
    match s.to_ascii_lowercase().as_str() {
      "exhaustive" => Ok(AlgoChoice::Exhaustive),
      "greedy" => Ok(AlgoChoice::Greedy),
      "nsga2" | "nsga" => Ok(AlgoChoice::Nsga2),
      "spea2" | "spea" => Ok(AlgoChoice::Spea2),
      "all" => Ok(AlgoChoice::All),
      other => Err(Error::InvalidParameter(format!(
        "unknown algorithm '{other}', expected one of exhaustive, greedy, \
         nsga2, spea2, all"
      ))),
    }
  }
}

/// Parsed command-line arguments.
#[derive(Clone, Debug)]
pub struct CliArgs {
  /// Which algorithm(s) to run.
  pub algo: AlgoChoice,
  /// Operator budget `k`.
  pub k: u32,
  /// Number of base sets to generate.
  pub n_sets: usize,
  /// Minimum/maximum size of each generated base set.
  pub set_size_min: usize,
  /// See [`CliArgs::set_size_min`].
  pub set_size_max: usize,
  /// RNG seed for instance generation.
  pub seed: u64,
  /// Population size, for the genetic solvers.
  pub population_size: usize,
  /// Generation cap, for the genetic solvers.
  pub max_generations: u64,
  /// Wall-clock cap in seconds, for the genetic solvers.
  pub time_limit_sec: u64,
  /// Crossover probability `pc`, for the genetic solvers.
  pub crossover_prob: f64,
  /// Mutation probability `pm`, for the genetic solvers.
  pub mutation_prob: f64,
  /// Tournament size `tau`, for the genetic solvers.
  pub tournament_size: usize,
}

impl Default for CliArgs {
  fn default() -> Self {
    Self {
      algo: AlgoChoice::All,
      k: 6,
      n_sets: 20,
      set_size_min: 5,
      set_size_max: 40,
      seed: 20251019,
      population_size: 200,
      max_generations: 10_000,
      time_limit_sec: 300,
      crossover_prob: 0.8,
      mutation_prob: 0.4,
      tournament_size: 2,
    }
  }
}

/// Parses `--flag value` pairs (and the bare `--flag=value` form) into
/// [`CliArgs`], starting from [`CliArgs::default`]. `argv` excludes the
/// program name.
pub fn parse_args<I: IntoIterator<Item = String>>(
  argv: I,
) -> Result<CliArgs, Error> {
  let mut args = CliArgs::default();
  let mut iter = argv.into_iter();

  while let Some(token) = iter.next() {
    let (flag, inline_value) = split_inline(&token);
    let mut next_value = || -> Result<String, Error> {
      if let Some(v) = &inline_value {
        return Ok(v.clone());
      }
      iter.next().ok_or_else(|| {
        Error::InvalidParameter(format!("flag '{flag}' is missing a value"))
      })
    };

    match flag.as_str() {
      "--algo" => args.algo = AlgoChoice::parse(&next_value()?)?,
      "--k" => args.k = parse_num(&next_value()?, "--k")?,
      "--n_sets" => args.n_sets = parse_num(&next_value()?, "--n_sets")?,
      "--set_size_min" => {
        args.set_size_min = parse_num(&next_value()?, "--set_size_min")?
      }
      "--set_size_max" => {
        args.set_size_max = parse_num(&next_value()?, "--set_size_max")?
      }
      "--seed" => args.seed = parse_num(&next_value()?, "--seed")?,
      "--population_size" => {
        args.population_size =
          parse_num(&next_value()?, "--population_size")?
      }
      "--max_generations" => {
        args.max_generations = parse_num(&next_value()?, "--max_generations")?
      }
      "--time_limit_sec" | "--time_limit" => {
        args.time_limit_sec = parse_num(&next_value()?, "--time_limit_sec")?
      }
      "--pop_size" => {
        args.population_size = parse_num(&next_value()?, "--pop_size")?
      }
      "--crossover_prob" => {
        args.crossover_prob = parse_num(&next_value()?, "--crossover_prob")?
      }
      "--mutation_prob" => {
        args.mutation_prob = parse_num(&next_value()?, "--mutation_prob")?
      }
      "--tournament_size" => {
        args.tournament_size = parse_num(&next_value()?, "--tournament_size")?
      }
      other => {
        return Err(Error::InvalidParameter(format!(
          "unrecognised flag '{other}'"
        )))
      }
    }
  }

  if args.set_size_min > args.set_size_max {
    return Err(Error::InvalidParameter(
      "--set_size_min must not exceed --set_size_max".to_string(),
    ));
  }

  Ok(args)
}

/// Splits `--flag=value` into `("--flag", Some("value"))`, or returns
/// `("--flag", None)` for a bare flag.
fn split_inline(token: &str) -> (String, Option<String>) {
  match token.split_once('=') {
    Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
    None => (token.to_string(), None),
  }
}

fn parse_num<T: std::str::FromStr>(s: &str, flag: &str) -> Result<T, Error> {
  s.parse::<T>()
    .map_err(|_| Error::InvalidParameter(format!("'{flag}' expects a number, got '{s}'")))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn test_defaults_when_no_flags() {
    let parsed = parse_args(Vec::new()).unwrap();
    assert_eq!(parsed.algo, AlgoChoice::All);
    assert_eq!(parsed.k, 6);
  }

  #[test]
  fn test_space_separated_flags() {
    let parsed = parse_args(args(&["--algo", "greedy", "--k", "3"])).unwrap();
    assert_eq!(parsed.algo, AlgoChoice::Greedy);
    assert_eq!(parsed.k, 3);
  }

  #[test]
  fn test_equals_separated_flags() {
    let parsed = parse_args(args(&["--algo=nsga2", "--seed=42"])).unwrap();
    assert_eq!(parsed.algo, AlgoChoice::Nsga2);
    assert_eq!(parsed.seed, 42);
  }

  #[test]
  fn test_genetic_tuning_flags() {
    let parsed = parse_args(args(&[
      "--pop_size",
      "64",
      "--crossover_prob",
      "0.7",
      "--mutation_prob",
      "0.3",
      "--tournament_size",
      "4",
      "--time_limit",
      "30",
    ]))
    .unwrap();
    assert_eq!(parsed.population_size, 64);
    assert_eq!(parsed.crossover_prob, 0.7);
    assert_eq!(parsed.mutation_prob, 0.3);
    assert_eq!(parsed.tournament_size, 4);
    assert_eq!(parsed.time_limit_sec, 30);
  }

  #[test]
  fn test_unknown_flag_is_error() {
    assert!(parse_args(args(&["--bogus", "1"])).is_err());
  }

  #[test]
  fn test_unknown_algo_is_error() {
    assert!(parse_args(args(&["--algo", "bogus"])).is_err());
  }

  #[test]
  fn test_missing_value_is_error() {
    assert!(parse_args(args(&["--k"])).is_err());
  }

  #[test]
  fn test_non_numeric_value_is_error() {
    assert!(parse_args(args(&["--k", "three"])).is_err());
  }

  #[test]
  fn test_size_min_greater_than_max_is_error() {
    assert!(parse_args(args(&[
      "--set_size_min",
      "40",
      "--set_size_max",
      "5"
    ]))
    .is_err());
  }
}
