//! Response demultiplexing: for a PDU arriving from an upstream, find the
//! Operation it belongs to by the upstream's msgid, rewrite it back to the
//! client's own msgid, and forward it. See §4.E.

use std::sync::Arc;

use log::trace;

use crate::codec::Frame;
use crate::connection::Connection;
use crate::hooks::WriteSignal;
use crate::msgtype::ResponseTag;
use crate::operation::OpState;

/// Demultiplexes one response `Frame` read from `upstream`. Discards
/// silently (at trace level) if the upstream msgid has no indexed
/// Operation, or if the Operation's client connection is already gone —
/// both are normal races with client abandon/disconnect, not errors.
pub fn demultiplex_response(upstream: &Arc<Connection>, frame: Frame, write_signal: &dyn WriteSignal) {
    let Some(op) = upstream.find(frame.msgid) else {
        trace!(
            "connection {}: discarding response for unindexed upstream msgid {}",
            upstream.connid,
            frame.msgid
        );
        return;
    };

    let Some(client) = op.client.upgrade() else {
        trace!(
            "connection {}: client for upstream msgid {} already gone, discarding response",
            upstream.connid,
            frame.msgid
        );
        upstream.remove(frame.msgid);
        return;
    };

    client.enqueue_response(op.client_msgid, frame.body.clone(), frame.controls.clone());
    write_signal.writable(&client);

    if ResponseTag(frame.op_tag).is_terminal() {
        upstream.remove(frame.msgid);
        client.remove(op.client_msgid);
        op.set_state(OpState::Terminal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Role;
    use crate::msgtype::RequestTag;
    use crate::operation::Operation;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct NoopSignal(AtomicBool);
    impl WriteSignal for NoopSignal {
        fn writable(&self, _conn: &Arc<Connection>) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn forwarded_op(client: &Arc<Connection>, upstream: &Arc<Connection>, client_msgid: i32) -> i32 {
        let frame = Frame {
            msgid: client_msgid,
            op_tag: RequestTag::BIND.0,
            body: Bytes::from_static(b"bind"),
            controls: None,
        };
        let op = Operation::from_frame(client, frame).unwrap();
        let upstream_msgid = upstream.enqueue_request(op, Bytes::from_static(b"bind"), None);
        upstream_msgid
    }

    #[test]
    fn terminal_response_clears_both_indices_and_rewrites_msgid() {
        let client = Connection::new(Role::Client);
        let upstream = Connection::new(Role::Upstream);
        let upstream_msgid = forwarded_op(&client, &upstream, 7);

        let signal = NoopSignal(AtomicBool::new(false));
        let response = Frame {
            msgid: upstream_msgid,
            op_tag: crate::msgtype::ResponseTag::BIND.0,
            body: Bytes::from_static(b"bind-response"),
            controls: None,
        };
        demultiplex_response(&upstream, response, &signal);

        assert_eq!(upstream.index_len(), 0);
        assert_eq!(client.index_len(), 0);
        assert!(signal.0.load(Ordering::SeqCst));
    }

    #[test]
    fn intermediate_search_response_keeps_indices() {
        let client = Connection::new(Role::Client);
        let upstream = Connection::new(Role::Upstream);
        let upstream_msgid = forwarded_op(&client, &upstream, 9);

        let signal = NoopSignal(AtomicBool::new(false));
        let entry = Frame {
            msgid: upstream_msgid,
            op_tag: crate::msgtype::ResponseTag::SEARCH_RESULT_ENTRY.0,
            body: Bytes::from_static(b"entry-1"),
            controls: None,
        };
        demultiplex_response(&upstream, entry, &signal);
        assert_eq!(upstream.index_len(), 1);
        assert_eq!(client.index_len(), 1);

        let done = Frame {
            msgid: upstream_msgid,
            op_tag: crate::msgtype::ResponseTag::SEARCH_RESULT_DONE.0,
            body: Bytes::from_static(b"done"),
            controls: None,
        };
        demultiplex_response(&upstream, done, &signal);
        assert_eq!(upstream.index_len(), 0);
        assert_eq!(client.index_len(), 0);
    }

    #[test]
    fn unindexed_msgid_is_discarded_without_panic() {
        let upstream = Connection::new(Role::Upstream);
        let signal = NoopSignal(AtomicBool::new(false));
        let frame = Frame {
            msgid: 999,
            op_tag: crate::msgtype::ResponseTag::BIND.0,
            body: Bytes::from_static(b"stray"),
            controls: None,
        };
        demultiplex_response(&upstream, frame, &signal);
        assert!(!signal.0.load(Ordering::SeqCst));
    }
}
