//! A bidirectional LDAP channel: a mutex-guarded, msgid-ordered index of
//! in-flight Operations, plus the monotonic `next_msgid` counter an upstream
//! Connection uses to assign fresh message IDs. See §4.C.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};

use crate::codec::{encode_frame, OutgoingMessage};
use crate::error::LloadError;
use crate::operation::Operation;

pub type MessageId = i32;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Which side of a forwarded operation this Connection plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Client,
    Upstream,
}

struct ConnectionInner {
    ops: BTreeMap<MessageId, Arc<Operation>>,
    next_msgid: MessageId,
    pending_write_buffer: BytesMut,
}

/// A bidirectional LDAP channel. All mutable state lives behind one mutex
/// guarding `ops`, `next_msgid`, and `pending_write_buffer` together, so
/// that allocate-encode-append-insert is always one atomic step (§4.C).
pub struct Connection {
    pub role: Role,
    pub connid: u64,
    inner: Mutex<ConnectionInner>,
}

impl Connection {
    pub fn new(role: Role) -> Arc<Self> {
        Arc::new(Connection {
            role,
            connid: NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed),
            inner: Mutex::new(ConnectionInner {
                ops: BTreeMap::new(),
                next_msgid: 1,
                pending_write_buffer: BytesMut::new(),
            }),
        })
    }

    /// Inserts `op` under `key`. Fails `DuplicateKey` if already present,
    /// leaving the existing entry untouched.
    pub fn insert(&self, key: MessageId, op: Arc<Operation>) -> Result<(), LloadError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.ops.contains_key(&key) {
            return Err(LloadError::DuplicateKey);
        }
        inner.ops.insert(key, op);
        Ok(())
    }

    pub fn remove(&self, key: MessageId) -> Option<Arc<Operation>> {
        self.inner.lock().unwrap().ops.remove(&key)
    }

    pub fn find(&self, key: MessageId) -> Option<Arc<Operation>> {
        self.inner.lock().unwrap().ops.get(&key).cloned()
    }

    /// Number of Operations currently indexed on this Connection. Exposed
    /// for tests asserting on index state after dispatch/demux/drain.
    pub fn index_len(&self) -> usize {
        self.inner.lock().unwrap().ops.len()
    }

    /// Atomically allocates `next_msgid`, encodes the outbound message with
    /// it, appends to the write buffer, and inserts `op` into the index —
    /// all under one critical section. The only entry point that advances
    /// `next_msgid`.
    pub fn enqueue_request(&self, op: Arc<Operation>, body: Bytes, controls: Option<Bytes>) -> MessageId {
        let mut inner = self.inner.lock().unwrap();
        let msgid = inner.next_msgid;
        inner.next_msgid += 1;
        let wire = encode_frame(&OutgoingMessage { msgid, body, controls });
        inner.pending_write_buffer.extend_from_slice(&wire);
        let prior = inner.ops.insert(msgid, op);
        assert!(
            prior.is_none(),
            "connection {}: next_msgid {} collided with an already-indexed operation, next_msgid invariant violated",
            self.connid,
            msgid
        );
        msgid
    }

    /// Same allocate-encode-append sequence as `enqueue_request`, but
    /// installs no index entry — used for Abandon/Unbind forwarding, which
    /// never expect a response.
    pub fn enqueue_fire_and_forget(&self, body: Bytes, controls: Option<Bytes>) -> MessageId {
        let mut inner = self.inner.lock().unwrap();
        let msgid = inner.next_msgid;
        inner.next_msgid += 1;
        let wire = encode_frame(&OutgoingMessage { msgid, body, controls });
        inner.pending_write_buffer.extend_from_slice(&wire);
        msgid
    }

    /// Appends a response PDU reusing `msgid` verbatim (no allocation from
    /// `next_msgid`) — used by the demultiplexer to forward a response back
    /// to the client connection that owns that msgid.
    pub fn enqueue_response(&self, msgid: MessageId, body: Bytes, controls: Option<Bytes>) {
        let mut inner = self.inner.lock().unwrap();
        let wire = encode_frame(&OutgoingMessage { msgid, body, controls });
        inner.pending_write_buffer.extend_from_slice(&wire);
    }

    /// Drains and returns everything in the pending write buffer, for the
    /// I/O runtime's writer to flush.
    pub fn take_pending_writes(&self) -> BytesMut {
        std::mem::take(&mut self.inner.lock().unwrap().pending_write_buffer)
    }

    /// Empties the index, returning every Operation that was indexed here.
    /// Used when the Connection is closed, to bulk-destroy its Operations.
    pub fn drain(&self) -> Vec<Arc<Operation>> {
        let mut inner = self.inner.lock().unwrap();
        std::mem::take(&mut inner.ops).into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use bytes::Bytes;

    fn op() -> Arc<Operation> {
        Operation::new_for_test(1, 0x60, Bytes::from_static(b"body"), None)
    }

    #[test]
    fn duplicate_insert_fails_and_preserves_existing() {
        let conn = Connection::new(Role::Upstream);
        conn.insert(1, op()).unwrap();
        let err = conn.insert(1, op()).unwrap_err();
        assert!(matches!(err, LloadError::DuplicateKey));
        assert_eq!(conn.index_len(), 1);
    }

    #[test]
    fn enqueue_request_allocates_strictly_increasing_msgids() {
        let conn = Connection::new(Role::Upstream);
        let a = conn.enqueue_request(op(), Bytes::from_static(b"a"), None);
        let b = conn.enqueue_request(op(), Bytes::from_static(b"b"), None);
        assert!(b > a);
        assert_eq!(conn.index_len(), 2);
    }

    #[test]
    fn fire_and_forget_installs_no_index_entry() {
        let conn = Connection::new(Role::Upstream);
        conn.enqueue_fire_and_forget(Bytes::from_static(b"abandon"), None);
        assert_eq!(conn.index_len(), 0);
        assert!(!conn.take_pending_writes().is_empty());
    }

    #[test]
    fn drain_empties_index() {
        let conn = Connection::new(Role::Client);
        conn.insert(1, op()).unwrap();
        conn.insert(2, op()).unwrap();
        let drained = conn.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(conn.index_len(), 0);
    }
}
