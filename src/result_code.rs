//! LDAP result code vocabulary (RFC 4511 §A.1), trimmed to the codes this
//! core can itself produce, plus the common ones it needs to recognize when
//! classifying an upstream's reply tag. Adapted from the result-code naming
//! table that has shipped with every version of this client.

use std::fmt;

/// An LDAP result code the core can itself emit toward a client.
///
/// This is not the full RFC 4511 enumeration — only the codes §7 of the
/// design names as ones this core produces. An upstream's own result codes
/// pass through verbatim as opaque response bodies; they never need to be
/// named here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultCode {
    Success,
    ProtocolError,
    NoSuchAttribute,
    InappropriateMatching,
    ConstraintViolation,
    TypeOrValueExists,
    Unavailable,
    Other,
}

impl ResultCode {
    /// The numeric wire value, per RFC 4511 §A.1.
    pub fn code(self) -> u32 {
        match self {
            ResultCode::Success => 0,
            ResultCode::ProtocolError => 2,
            ResultCode::NoSuchAttribute => 16,
            ResultCode::InappropriateMatching => 18,
            ResultCode::ConstraintViolation => 19,
            ResultCode::TypeOrValueExists => 20,
            ResultCode::Unavailable => 52,
            ResultCode::Other => 80,
        }
    }

    /// The RFC 4511 enumeration name, used in logs and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ResultCode::Success => "success",
            ResultCode::ProtocolError => "protocolError",
            ResultCode::NoSuchAttribute => "noSuchAttribute",
            ResultCode::InappropriateMatching => "inappropriateMatching",
            ResultCode::ConstraintViolation => "constraintViolation",
            ResultCode::TypeOrValueExists => "typeOrValueExists",
            ResultCode::Unavailable => "unavailable",
            ResultCode::Other => "other",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.name())
    }
}
