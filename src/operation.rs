//! The Operation record and the two-phase dispatcher (`from_frame` /
//! `process`) that creates, forwards, and eventually retires it. See §3,
//! §4.B, §4.D.

use std::sync::{Arc, OnceLock, Weak};

use bytes::Bytes;
use log::{debug, error, trace, warn};

use crate::codec::{decode_abandon_target, Frame};
use crate::connection::{Connection, MessageId};
use crate::error::LloadError;
use crate::hooks::{BackendSelector, WriteSignal};
use crate::msgtype::RequestTag;

/// Observable lifecycle states, used for logging and testing — never part
/// of protocol logic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpState {
    Created,
    ClientIndexed,
    UpstreamIndexed,
    InFlight,
    Terminal,
    Abandoned,
}

/// Set once an upstream has been chosen and the request forwarded. A
/// `OnceLock` makes the single-assignment invariant compile-time enforced
/// rather than something the Connection mutex has to arbitrate.
struct UpstreamBinding {
    upstream: Weak<Connection>,
    upstream_msgid: MessageId,
}

/// The unit of in-flight work, shared between exactly two Connections
/// (client and upstream). Ownership: the Connections' indices own the
/// reference; the record is destroyed once the last index entry referring
/// to it is removed.
pub struct Operation {
    pub client: Weak<Connection>,
    pub client_msgid: MessageId,
    pub tag: RequestTag,
    pub request_body: Bytes,
    pub controls: Option<Bytes>,
    upstream: OnceLock<UpstreamBinding>,
    state: std::sync::Mutex<OpState>,
}

impl Operation {
    pub(crate) fn set_state(&self, state: OpState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn state(&self) -> OpState {
        *self.state.lock().unwrap()
    }

    pub fn upstream_connection(&self) -> Option<Arc<Connection>> {
        self.upstream.get().and_then(|b| b.upstream.upgrade())
    }

    pub fn upstream_msgid(&self) -> Option<MessageId> {
        self.upstream.get().map(|b| b.upstream_msgid)
    }

    /// **Phase 1** (reader task, client connection only): builds an
    /// Operation from a decoded client `Frame` and indexes it on `client`
    /// keyed by its client msgid. Returns `DuplicateKey` without disturbing
    /// the existing in-flight operation if that msgid is already indexed —
    /// this protects upstreams from a misbehaving client, not a protocol
    /// error surfaced from upstream.
    pub fn from_frame(client: &Arc<Connection>, frame: Frame) -> Result<Arc<Operation>, LloadError> {
        let op = Arc::new(Operation {
            client: Arc::downgrade(client),
            client_msgid: frame.msgid,
            tag: RequestTag(frame.op_tag),
            request_body: frame.body,
            controls: frame.controls,
            upstream: OnceLock::new(),
            state: std::sync::Mutex::new(OpState::Created),
        });

        match client.insert(frame.msgid, op.clone()) {
            Ok(()) => {
                op.set_state(OpState::ClientIndexed);
                trace!(
                    "connection {}: indexed operation for client msgid {}",
                    client.connid,
                    frame.msgid
                );
                Ok(op)
            }
            Err(e) => {
                warn!(
                    "connection {}: duplicate client msgid {}, rejecting new operation",
                    client.connid, frame.msgid
                );
                Err(e)
            }
        }
    }

    /// **Phase 2** (worker task): selects an upstream, rewrites the msgid,
    /// and forwards the request; or handles the Abandon/Unbind special
    /// cases, which never get an upstream index entry.
    pub fn process(
        self: &Arc<Self>,
        selector: &dyn BackendSelector,
        write_signal: &dyn WriteSignal,
    ) -> Result<(), LloadError> {
        let Some(client) = self.client.upgrade() else {
            return Ok(());
        };

        if self.tag == RequestTag::ABANDON {
            return self.process_abandon(&client, write_signal);
        }
        if self.tag == RequestTag::UNBIND {
            client.remove(self.client_msgid);
            self.set_state(OpState::Abandoned);
            return Ok(());
        }

        let Some(upstream) = selector.select(self) else {
            client.remove(self.client_msgid);
            warn!(
                "connection {}: no upstream available for client msgid {}",
                client.connid, self.client_msgid
            );
            return Err(LloadError::NoUpstream);
        };

        let upstream_msgid = upstream.enqueue_request(self.clone(), self.request_body.clone(), self.controls.clone());
        self.upstream
            .set(UpstreamBinding {
                upstream: Arc::downgrade(&upstream),
                upstream_msgid,
            })
            .unwrap_or_else(|_| error!("operation upstream binding set twice, this is a bug"));
        self.set_state(OpState::UpstreamIndexed);
        self.set_state(OpState::InFlight);
        debug!(
            "connection {}: forwarded client msgid {} to upstream {} as msgid {}",
            client.connid, self.client_msgid, upstream.connid, upstream_msgid
        );
        write_signal.writable(&upstream);
        Ok(())
    }

    fn process_abandon(self: &Arc<Self>, client: &Arc<Connection>, write_signal: &dyn WriteSignal) -> Result<(), LloadError> {
        let target_msgid = decode_abandon_target(&self.request_body)?;

        if let Some(target) = client.find(target_msgid) {
            if let (Some(upstream), Some(upstream_msgid)) = (target.upstream_connection(), target.upstream_msgid()) {
                upstream.remove(upstream_msgid);
                let abandon_body = crate::codec::encode_abandon_request(upstream_msgid);
                upstream.enqueue_fire_and_forget(abandon_body, None);
                write_signal.writable(&upstream);
            }
            client.remove(target_msgid);
            target.set_state(OpState::Abandoned);
        } else {
            trace!(
                "connection {}: abandon target {} not found, race with completion or unknown msgid",
                client.connid,
                target_msgid
            );
        }

        client.remove(self.client_msgid);
        self.set_state(OpState::Abandoned);
        Ok(())
    }

    #[cfg(test)]
    pub fn new_for_test(client_msgid: MessageId, op_tag: u8, body: Bytes, controls: Option<Bytes>) -> Arc<Operation> {
        Arc::new(Operation {
            client: Weak::new(),
            client_msgid,
            tag: RequestTag(op_tag),
            request_body: body,
            controls,
            upstream: OnceLock::new(),
            state: std::sync::Mutex::new(OpState::Created),
        })
    }
}
