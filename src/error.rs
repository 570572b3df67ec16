//! Crate-wide error type for the CLI/driver layer.
//!
//! Solvers never return `Result`: per the invalid-parameter / empty-input /
//! degenerate-Jaccard / budget-exhausted taxonomy, every solver path yields a
//! (possibly empty) Pareto front. Only parameter parsing at the boundary can
//! fail.

use std::fmt;

/// An error surfaced while parsing parameters at the CLI/driver boundary.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Error {
  /// A parameter was out of range, a flag was unrecognised, or a flag was
  /// missing its value.
  InvalidParameter(String),
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
    }
  }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display() {
    let e = Error::InvalidParameter("k < 0".to_string());
    assert_eq!(e.to_string(), "invalid parameter: k < 0");
  }
}
