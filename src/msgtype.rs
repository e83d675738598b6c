//! Request/response application tags and the fixed mapping between them.
//!
//! Tag values are the `[APPLICATION n]` numbers from RFC 4511 §4.2's
//! protocolOp CHOICE, encoded as they appear on the wire (class bits already
//! folded in). The dispatcher never needs to know anything about a tag
//! beyond this table and whether it is one of the two special cases
//! (Abandon, Unbind) that never produce a response.

/// An application-tagged LDAP protocol operation, identified by its wire tag
/// byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTag(pub u8);

impl RequestTag {
    pub const BIND: RequestTag = RequestTag(0x60);
    pub const UNBIND: RequestTag = RequestTag(0x42);
    pub const SEARCH: RequestTag = RequestTag(0x63);
    pub const MODIFY: RequestTag = RequestTag(0x66);
    pub const ADD: RequestTag = RequestTag(0x68);
    pub const DELETE: RequestTag = RequestTag(0x4a);
    pub const MODIFY_DN: RequestTag = RequestTag(0x6c);
    pub const COMPARE: RequestTag = RequestTag(0x6e);
    pub const ABANDON: RequestTag = RequestTag(0x50);
    pub const EXTENDED: RequestTag = RequestTag(0x77);

    /// Whether this request tag never produces a response PDU.
    pub fn is_fire_and_forget(self) -> bool {
        matches!(self, RequestTag::ABANDON | RequestTag::UNBIND)
    }
}

/// A response application tag, as seen arriving from an upstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponseTag(pub u8);

impl ResponseTag {
    pub const BIND: ResponseTag = ResponseTag(0x61);
    pub const SEARCH_RESULT_ENTRY: ResponseTag = ResponseTag(0x64);
    pub const SEARCH_RESULT_DONE: ResponseTag = ResponseTag(0x65);
    pub const SEARCH_RESULT_REFERENCE: ResponseTag = ResponseTag(0x73);
    pub const MODIFY: ResponseTag = ResponseTag(0x67);
    pub const ADD: ResponseTag = ResponseTag(0x69);
    pub const DELETE: ResponseTag = ResponseTag(0x6b);
    pub const MODIFY_DN: ResponseTag = ResponseTag(0x6d);
    pub const COMPARE: ResponseTag = ResponseTag(0x6f);
    pub const EXTENDED: ResponseTag = ResponseTag(0x78);
    pub const INTERMEDIATE: ResponseTag = ResponseTag(0x79);

    /// Whether a response carrying this tag closes out the Operation it
    /// belongs to (removes both index entries), as opposed to being one of
    /// a stream of intermediate messages for the same request.
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            ResponseTag::SEARCH_RESULT_ENTRY
                | ResponseTag::SEARCH_RESULT_REFERENCE
                | ResponseTag::INTERMEDIATE
        )
    }
}

/// The response tag an upstream is expected to answer a given request tag
/// with, per the §3 mapping table. Returns `None` for Abandon/Unbind, which
/// never get a response, and for any tag this table doesn't recognize.
pub fn response_tag_for(req: RequestTag) -> Option<ResponseTag> {
    match req {
        RequestTag::BIND => Some(ResponseTag::BIND),
        RequestTag::SEARCH => Some(ResponseTag::SEARCH_RESULT_DONE),
        RequestTag::MODIFY => Some(ResponseTag::MODIFY),
        RequestTag::ADD => Some(ResponseTag::ADD),
        RequestTag::DELETE => Some(ResponseTag::DELETE),
        RequestTag::MODIFY_DN => Some(ResponseTag::MODIFY_DN),
        RequestTag::COMPARE => Some(ResponseTag::COMPARE),
        RequestTag::EXTENDED => Some(ResponseTag::EXTENDED),
        _ => None,
    }
}
