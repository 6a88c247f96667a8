//! edgemesh-state — data model and embedded state store for edgemesh.
//!
//! Defines the Node/Microservice/Application/Placement/InvocationPath/
//! LatencyTable types the rest of the workspace shares, plus a `redb`-backed
//! `StateStore` that persists the latest snapshot of each for diagnostics.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{DescriptorError, DescriptorResult, StateError, StateResult};
pub use store::StateStore;
pub use types::*;
