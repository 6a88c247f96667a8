//! Descriptor loading: resolves `--application_file NAME --edge_nodes NAME`
//! to `apps/NAME.json` / `topologies/NAME.json` and parses them with a
//! plain read-then-parse shape — no caching, no watching for changes.

use std::path::{Path, PathBuf};

use edgemesh_state::{Application, ApplicationDescriptor, DescriptorError, DescriptorResult, Topology, TopologyDescriptor};

pub fn application_path(data_dir: &Path, name: &str) -> PathBuf {
    data_dir.join("apps").join(format!("{name}.json"))
}

pub fn topology_path(data_dir: &Path, name: &str) -> PathBuf {
    data_dir.join("topologies").join(format!("{name}.json"))
}

pub fn load_application(path: &Path) -> DescriptorResult<Application> {
    let raw = std::fs::read_to_string(path).map_err(|source| DescriptorError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let descriptor: ApplicationDescriptor = serde_json::from_str(&raw).map_err(|source| DescriptorError::Malformed {
        path: path.display().to_string(),
        source,
    })?;
    Ok(descriptor.into())
}

pub fn load_topology(path: &Path) -> DescriptorResult<Topology> {
    let raw = std::fs::read_to_string(path).map_err(|source| DescriptorError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let descriptor: TopologyDescriptor = serde_json::from_str(&raw).map_err(|source| DescriptorError::Malformed {
        path: path.display().to_string(),
        source,
    })?;
    Ok(descriptor.into())
}
