//! Embedded state store backed by `redb`.
//!
//! Persists the latest Topology, Application, Placement and InvocationPath
//! snapshots plus the adaptation-round counter. This is diagnostic state for
//! the status surface, not the source of truth for a running adaptation
//! loop: per the Failure Monitor's "probe until first down" design, a
//! restarted process starts fresh rather than resuming watchers or
//! in-flight solves from what's on disk.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::{APPLICATION, CURRENT, INVOCATION_PATH, PLACEMENT, ROUND, TOPOLOGY};
use crate::types::{Application, InvocationPath, Placement, Topology};

macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Handle to the embedded store. Cheap to clone (wraps `Arc<Database>`).
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (creating if absent) a file-backed store at `path`.
    pub fn open(path: impl AsRef<Path>) -> StateResult<Self> {
        let db = Database::create(path.as_ref()).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Open an in-memory store, for tests and ephemeral runs.
    pub fn open_in_memory() -> StateResult<Self> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            txn.open_table(TOPOLOGY).map_err(map_err!(Table))?;
            txn.open_table(APPLICATION).map_err(map_err!(Table))?;
            txn.open_table(PLACEMENT).map_err(map_err!(Table))?;
            txn.open_table(INVOCATION_PATH).map_err(map_err!(Table))?;
            txn.open_table(ROUND).map_err(map_err!(Table))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    pub fn put_topology(&self, topology: &Topology) -> StateResult<()> {
        let bytes = serde_json::to_vec(topology).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(TOPOLOGY).map_err(map_err!(Table))?;
            table
                .insert(CURRENT, bytes.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(nodes = topology.nodes.len(), "persisted topology snapshot");
        Ok(())
    }

    pub fn get_topology(&self) -> StateResult<Option<Topology>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(TOPOLOGY).map_err(map_err!(Table))?;
        match table.get(CURRENT).map_err(map_err!(Read))? {
            Some(v) => {
                let topo = serde_json::from_slice(v.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(topo))
            }
            None => Ok(None),
        }
    }

    pub fn put_application(&self, app: &Application) -> StateResult<()> {
        let bytes = serde_json::to_vec(app).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(APPLICATION).map_err(map_err!(Table))?;
            table
                .insert(CURRENT, bytes.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    pub fn get_application(&self) -> StateResult<Option<Application>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(APPLICATION).map_err(map_err!(Table))?;
        match table.get(CURRENT).map_err(map_err!(Read))? {
            Some(v) => Ok(Some(
                serde_json::from_slice(v.value()).map_err(map_err!(Deserialize))?,
            )),
            None => Ok(None),
        }
    }

    pub fn put_placement(&self, placement: &Placement) -> StateResult<()> {
        let bytes = serde_json::to_vec(placement).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(PLACEMENT).map_err(map_err!(Table))?;
            table
                .insert(CURRENT, bytes.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    pub fn get_placement(&self) -> StateResult<Option<Placement>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PLACEMENT).map_err(map_err!(Table))?;
        match table.get(CURRENT).map_err(map_err!(Read))? {
            Some(v) => Ok(Some(
                serde_json::from_slice(v.value()).map_err(map_err!(Deserialize))?,
            )),
            None => Ok(None),
        }
    }

    pub fn put_invocation_path(&self, path: &InvocationPath) -> StateResult<()> {
        let bytes = serde_json::to_vec(path).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(INVOCATION_PATH).map_err(map_err!(Table))?;
            table
                .insert(CURRENT, bytes.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    pub fn get_invocation_path(&self) -> StateResult<Option<InvocationPath>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(INVOCATION_PATH).map_err(map_err!(Table))?;
        match table.get(CURRENT).map_err(map_err!(Read))? {
            Some(v) => Ok(Some(
                serde_json::from_slice(v.value()).map_err(map_err!(Deserialize))?,
            )),
            None => Ok(None),
        }
    }

    pub fn put_round(&self, round: u64) -> StateResult<()> {
        let bytes = round.to_be_bytes();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(ROUND).map_err(map_err!(Table))?;
            table
                .insert(CURRENT, bytes.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    pub fn get_round(&self) -> StateResult<u64> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(ROUND).map_err(map_err!(Table))?;
        match table.get(CURRENT).map_err(map_err!(Read))? {
            Some(v) => {
                let bytes: [u8; 8] = v
                    .value()
                    .try_into()
                    .map_err(|_| StateError::Deserialize("round counter malformed".into()))?;
                Ok(u64::from_be_bytes(bytes))
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Microservice, Node, Sla};
    use std::collections::{BTreeMap, BTreeSet};

    fn test_topology() -> Topology {
        Topology {
            nodes: vec![Node::new(1, "http://10.0.0.1:5000", 0.1), Node::new(2, "http://10.0.0.2:5000", 0.1)],
        }
    }

    fn test_application() -> Application {
        Application {
            sla: Sla { availability: 0.9, e2e: 100 },
            microservices: vec![Microservice {
                id: "cosminava/m1".into(),
                ram_req_mb: 100,
                hdd_req_mb: 100,
                container_port: "5001".into(),
                external_port: "6001".into(),
                dest: vec![],
            }],
        }
    }

    #[test]
    fn topology_round_trip() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.get_topology().unwrap().is_none());
        store.put_topology(&test_topology()).unwrap();
        let got = store.get_topology().unwrap().unwrap();
        assert_eq!(got.nodes.len(), 2);
    }

    #[test]
    fn application_round_trip() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_application(&test_application()).unwrap();
        let got = store.get_application().unwrap().unwrap();
        assert_eq!(got.microservices.len(), 1);
    }

    #[test]
    fn placement_and_path_round_trip() {
        let store = StateStore::open_in_memory().unwrap();
        let mut placement: Placement = BTreeMap::new();
        placement.insert("cosminava/m1".into(), BTreeSet::from([1, 2]));
        store.put_placement(&placement).unwrap();
        assert_eq!(store.get_placement().unwrap().unwrap(), placement);

        let mut path: InvocationPath = BTreeMap::new();
        path.insert("cosminava/m1".into(), 1);
        store.put_invocation_path(&path).unwrap();
        assert_eq!(store.get_invocation_path().unwrap().unwrap(), path);
    }

    #[test]
    fn round_counter_defaults_to_zero_then_persists() {
        let store = StateStore::open_in_memory().unwrap();
        assert_eq!(store.get_round().unwrap(), 0);
        store.put_round(3).unwrap();
        assert_eq!(store.get_round().unwrap(), 3);
    }

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edgemesh.redb");
        {
            let store = StateStore::open(&path).unwrap();
            store.put_topology(&test_topology()).unwrap();
        }
        let reopened = StateStore::open(&path).unwrap();
        assert_eq!(reopened.get_topology().unwrap().unwrap().nodes.len(), 2);
    }
}
