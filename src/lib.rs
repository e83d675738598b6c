//! Operation-forwarding core and entry-modification engine for an LDAP
//! directory proxy.
//!
//! Two subsystems share this crate because they share the same notion of an
//! "operation": the connection/dispatch/demux machinery that forwards LDAP
//! requests from clients to a chosen upstream and routes the responses back
//! (`connection`, `operation`, `demux`, `codec`, `msgtype`), and the
//! entry-modification engine that applies Add/Delete/Replace/Increment to
//! an in-memory entry under matching-rule equality (`entry`, `modify`,
//! `matching`). Everything this crate needs from the outside world —
//! upstream selection, worker scheduling, write readiness, matching rules —
//! comes in through the traits in `hooks` and `matching`; the crate itself
//! parses no configuration and owns no listener.

pub mod codec;
pub mod connection;
pub mod demux;
pub mod entry;
pub mod error;
pub mod hooks;
pub mod matching;
pub mod modify;
pub mod msgtype;
pub mod operation;
pub mod result_code;

pub use codec::{Frame, LdapCodec, OutgoingMessage};
pub use connection::{Connection, MessageId, Role};
pub use demux::demultiplex_response;
pub use entry::{Attribute, AttributeDescription, Entry};
pub use error::{LloadError, ModifyError};
pub use hooks::{BackendSelector, WorkerDispatch, WriteSignal};
pub use matching::{MatchError, MatchFlags, MatchingRuleRegistry};
pub use modify::{apply_modification, ModOp, Modification};
pub use msgtype::{RequestTag, ResponseTag};
pub use operation::{OpState, Operation};
pub use result_code::ResultCode;
