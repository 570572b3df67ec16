//! The three (four, counting the SPEA2 alternative) solvers for the
//! set-expression synthesis problem. Each consumes a family `F`, universe
//! `U`, target `G` and operator budget `k`, and returns a Pareto front.

pub mod exhaustive;
pub mod greedy;
pub mod nsga2;
pub mod spea2;
