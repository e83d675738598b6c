//! Typed errors for the forwarding core and the entry-modification engine.
//!
//! Split in two: `LloadError` covers the connection/dispatch machinery
//! (some variants carry an LDAP result code for the boundary to encode
//! toward a client, others are internal-only and never reach the wire).
//! `ModifyError` covers the entry engine and always carries a `ResultCode`
//! plus a diagnostic string built from the same templates the reference
//! implementation uses.

use crate::result_code::ResultCode;

/// Errors raised by the connection/operation/dispatch machinery.
#[derive(thiserror::Error, Debug)]
pub enum LloadError {
    #[error("malformed frame: {0}")]
    Codec(#[from] lber::LberError),

    #[error("duplicate key in connection index")]
    DuplicateKey,

    #[error("no upstream available")]
    NoUpstream,

    #[error("matching rule invocation failed: {0}")]
    Match(#[from] crate::matching::MatchError),

    #[error("protocol violation: {0}")]
    ProtocolError(&'static str),
}

impl LloadError {
    /// The LDAP result code this error maps to at the client boundary, if
    /// any. `DuplicateKey` is an internal client-connection protection and
    /// surfaces as `ProtocolError` on the wire; `Codec` and `Match` errors
    /// close the affected connection rather than produce a result PDU on
    /// their own, so they have no direct wire mapping here.
    pub fn result_code(&self) -> Option<ResultCode> {
        match self {
            LloadError::DuplicateKey => Some(ResultCode::ProtocolError),
            LloadError::NoUpstream => Some(ResultCode::Unavailable),
            LloadError::ProtocolError(_) => Some(ResultCode::ProtocolError),
            LloadError::Codec(_) | LloadError::Match(_) => None,
        }
    }
}

/// Errors raised by the Add/Delete/Replace/Increment engine. Always carries
/// the LDAP result code to report and a diagnostic message built from a
/// short template: operation name, attribute short name, and (where
/// applicable) the offending value's index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyError {
    pub code: ResultCode,
    pub diagnostic: String,
}

impl ModifyError {
    pub fn new(code: ResultCode, diagnostic: impl Into<String>) -> Self {
        ModifyError {
            code,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn no_such_attribute(op: &str, attr: &str) -> Self {
        ModifyError::new(
            ResultCode::NoSuchAttribute,
            format!("modify/{op}: no such attribute {attr}"),
        )
    }

    pub fn no_such_value(op: &str, attr: &str, index: usize) -> Self {
        ModifyError::new(
            ResultCode::NoSuchAttribute,
            format!("modify/{op}: no such value (attr {attr}, value #{index})"),
        )
    }

    pub fn inappropriate_matching(op: &str, attr: &str) -> Self {
        ModifyError::new(
            ResultCode::InappropriateMatching,
            format!("modify/{op}: no equality matching rule for {attr}"),
        )
    }

    pub fn type_or_value_exists(op: &str, attr: &str, index: usize) -> Self {
        ModifyError::new(
            ResultCode::TypeOrValueExists,
            format!("modify/{op}: value #{index} of {attr} already exists"),
        )
    }

    pub fn constraint_violation(op: &str, attr: &str, reason: &str) -> Self {
        ModifyError::new(
            ResultCode::ConstraintViolation,
            format!("modify/{op}: {attr}: {reason}"),
        )
    }

    pub fn other(op: &str, attr: &str, reason: &str) -> Self {
        ModifyError::new(ResultCode::Other, format!("modify/{op}: {attr}: {reason}"))
    }
}

impl std::fmt::Display for ModifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} ({})", self.diagnostic, self.code)
    }
}

impl std::error::Error for ModifyError {}
