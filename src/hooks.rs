//! The three traits the surrounding runtime implements to parametrize the
//! core: upstream selection, worker scheduling, and write-readiness
//! notification. The core is otherwise configuration-free; see §7 of the
//! design notes — tests construct these directly instead of going through a
//! config layer.

use std::sync::Arc;

use crate::connection::Connection;
use crate::operation::Operation;

/// Chooses an upstream Connection for an Operation, or reports that none is
/// available.
pub trait BackendSelector: Send + Sync {
    fn select(&self, op: &Operation) -> Option<Arc<Connection>>;
}

/// Schedules `Operation::process` to run on a worker and returns promptly.
pub trait WorkerDispatch: Send + Sync {
    fn schedule(&self, op: Arc<Operation>);
}

/// Notifies the surrounding I/O runtime that a Connection's pending write
/// buffer has new bytes to flush.
pub trait WriteSignal: Send + Sync {
    fn writable(&self, conn: &Arc<Connection>);
}
