//! The matching-rule registry hook and the normalization-state flags the
//! entry-modification engine passes alongside each comparison.
//!
//! Syntax and matching-rule *definitions* are out of scope (they belong to
//! the schema layer); this module only defines the dispatch contract the
//! engine uses to invoke whichever equality rule an attribute names.

/// Which side(s) of a comparison are already normalized. The engine uses
/// normalized values when it has them (from `nvalues`) and presentation
/// values otherwise, per §4.F.1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct MatchFlags {
    pub value_a_normalized: bool,
    pub value_b_normalized: bool,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("unknown matching rule {0:?}")]
    UnknownRule(String),
    #[error("unknown syntax {0:?}")]
    UnknownSyntax(String),
    #[error("value is not valid for the asserted syntax")]
    InvalidValue,
}

/// Invokes an attribute's equality matching rule. Schema loading and rule
/// implementations themselves are out of scope; the core only needs this
/// dispatch contract.
pub trait MatchingRuleRegistry: Send + Sync {
    fn matches(
        &self,
        rule: &str,
        syntax: &str,
        flags: MatchFlags,
        value_a: &[u8],
        value_b: &[u8],
    ) -> Result<bool, MatchError>;
}

/// A case-insensitive ASCII equality rule, useful as a test double and as
/// the equality rule for the directory string attributes exercised in this
/// crate's own tests (mirrors `caseIgnoreMatch`).
#[derive(Debug, Default)]
pub struct CaseIgnoreMatch;

impl MatchingRuleRegistry for CaseIgnoreMatch {
    fn matches(
        &self,
        _rule: &str,
        _syntax: &str,
        _flags: MatchFlags,
        value_a: &[u8],
        value_b: &[u8],
    ) -> Result<bool, MatchError> {
        Ok(value_a.eq_ignore_ascii_case(value_b))
    }
}
