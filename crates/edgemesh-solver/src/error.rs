use thiserror::Error;

/// Errors from the Invocation-Path Solver. The Placement Solver never
/// returns an error of its own — an unplaceable microservice is recorded as
/// an empty replica set in `PlacementOutcome::degraded` and the cycle
/// continues.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SolverError {
    #[error("no invocation path satisfies the latency and availability SLA")]
    PathInfeasible,
}

pub type SolverResult<T> = Result<T, SolverError>;
