//! edgemesh-monitor — the Failure Monitor.
//!
//! # Architecture
//!
//! ```text
//! FailureMonitor
//!   ├── one tokio task per node url (run_watcher)
//!   │     probe at ~1Hz -> on success write Up, on failure write Down + exit
//!   └── MonitorStatus: Arc<RwLock<HashMap<url, NodeStatus>>>
//!         read by the Controller, written by watchers
//! ```
//!
//! Watchers never recover a node once it is flagged `Down`; the Controller
//! retires it instead.

pub mod probe;
pub mod watcher;

pub use probe::tcp_probe;
pub use watcher::{FailureMonitor, MonitorStatus};
