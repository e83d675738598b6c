//! Minimal BER primitives for framing the LDAP message envelope.
//!
//! This crate deliberately does not parse LDAP protocol op bodies. It
//! exposes just enough of BER to peek a tag, skip a complete tagged element
//! without recursing into it, and get/put the INTEGER encoding used for
//! message IDs — the building blocks the forwarding core needs to frame
//! `SEQUENCE { INTEGER messageID, op, controls? }` and pass the op/controls
//! bytes through untouched.

mod error;
pub mod primitive;
pub mod tag;

pub use error::LberError;
