//! edgemesh-solver — the Placement Solver and Invocation-Path Solver.
//!
//! Both cycles are realised as combinatorial searches with pruning rather
//! than SMT calls, since no SMT/LP crate is available anywhere in this
//! workspace's dependency stack. See `placement` and `invocation` for the
//! per-cycle invariants.

pub mod error;
pub mod invocation;
pub mod latency;
pub mod placement;

pub use error::{SolverError, SolverResult};
pub use invocation::solve_invocation_path;
pub use latency::{build_latency_table, LatencyOracle, RandomizedLatencyOracle};
pub use placement::{solve_placement, PlacementOutcome};
