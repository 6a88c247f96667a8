use thiserror::Error;

/// Top-level Controller error. Library crates keep their own per-crate enums
/// (`edgemesh_state::StateError`, `edgemesh_solver::SolverError`); this one
/// only adds the Controller's own terminal condition and wraps the others
/// via `#[from]`. Descriptor loading errors (`edgemesh_state::DescriptorError`)
/// are fatal at startup and propagate straight into `main`'s `anyhow::Result`
/// instead, since nothing downstream of `main` ever needs to match on them.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("state store error: {0}")]
    State(#[from] edgemesh_state::StateError),
    #[error("startup placement/path solve is infeasible: {0}")]
    StartupInfeasible(#[from] edgemesh_solver::SolverError),
    #[error("no feasible invocation path remains after adapting to node failures; more edge nodes are required")]
    TerminalInfeasibility,
}

pub type ControllerResult<T> = Result<T, ControllerError>;
