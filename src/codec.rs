//! Envelope framing: `SEQUENCE { INTEGER messageID, op, controls? }` decoded
//! into a `Frame` without interpreting `op`'s or `controls`' content, and a
//! `tokio_util::codec` adapter wired to the `lber` envelope primitives.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use lber::primitive::{get_integer, peek_tag, put_integer, put_tlv, skip_element};
use lber::tag;
use lber::LberError;
use tokio_util::codec::{Decoder, Encoder};

/// One decoded LDAP message envelope. `body` and `controls` are the complete
/// encoded TLV spans (tag + length + content) of the protocol op and the
/// optional Controls element, stored as cheap reference-counted clones so
/// re-emission is a verbatim slice-and-append.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub msgid: i32,
    pub op_tag: u8,
    pub body: Bytes,
    pub controls: Option<Bytes>,
}

/// An outbound message to encode: `msgid` is substituted into the envelope,
/// `body`/`controls` are emitted verbatim (they already carry their own tag
/// and length header).
pub struct OutgoingMessage {
    pub msgid: i32,
    pub body: Bytes,
    pub controls: Option<Bytes>,
}

fn read_sequence_members(seq_content: &[u8]) -> Result<(i32, u8, Bytes, Option<Bytes>), LberError> {
    let (msgid_elem, msgid_consumed) =
        skip_element(seq_content)?.ok_or(LberError::Malformed("truncated messageID"))?;
    if msgid_elem.tag != tag::INTEGER {
        return Err(LberError::Malformed("expected INTEGER messageID"));
    }
    let msgid = get_integer(msgid_elem.content(seq_content))?;

    let rest = &seq_content[msgid_consumed..];
    let (op_elem, op_consumed) = skip_element(rest)?.ok_or(LberError::Malformed("truncated protocol op"))?;
    let body = Bytes::copy_from_slice(&rest[..op_consumed]);

    let after_op = &rest[op_consumed..];
    let controls = if after_op.is_empty() {
        None
    } else {
        let (ctrl_elem, ctrl_consumed) =
            skip_element(after_op)?.ok_or(LberError::Malformed("truncated controls"))?;
        if ctrl_elem.tag != tag::CONTROLS {
            return Err(LberError::Malformed("trailing bytes after protocol op"));
        }
        Some(Bytes::copy_from_slice(&after_op[..ctrl_consumed]))
    };

    Ok((msgid, op_elem.tag, body, controls))
}

/// Decodes a `Frame` from the front of `input` if a complete one is present.
/// Returns the frame and how many bytes of `input` it occupied; the caller's
/// `Decoder::decode` is responsible for advancing past that many bytes.
pub fn decode_frame(input: &[u8]) -> Result<Option<(Frame, usize)>, LberError> {
    let Some((seq_elem, seq_total)) = skip_element(input)? else {
        return Ok(None);
    };
    if seq_elem.tag != tag::SEQUENCE {
        return Err(LberError::Malformed("expected SEQUENCE envelope"));
    }
    let seq_content = seq_elem.content(input);
    let (msgid, op_tag, body, controls) = read_sequence_members(seq_content)?;
    Ok(Some((
        Frame {
            msgid,
            op_tag,
            body,
            controls,
        },
        seq_total,
    )))
}

/// Encodes `msg` as a complete envelope ready to write to the wire.
pub fn encode_frame(msg: &OutgoingMessage) -> Bytes {
    let msgid_tlv = put_tlv(tag::INTEGER, &put_integer(msg.msgid as i64));
    let mut content =
        Vec::with_capacity(msgid_tlv.len() + msg.body.len() + msg.controls.as_ref().map_or(0, Bytes::len));
    content.extend_from_slice(&msgid_tlv);
    content.extend_from_slice(&msg.body);
    if let Some(controls) = &msg.controls {
        content.extend_from_slice(controls);
    }
    Bytes::from(put_tlv(tag::SEQUENCE, &content))
}

/// Reads the bare INTEGER body of an AbandonRequest, naming the client
/// msgid of the operation to cancel.
pub fn decode_abandon_target(body: &[u8]) -> Result<i32, LberError> {
    let (elem, _consumed) = skip_element(body)?.ok_or(LberError::Malformed("truncated abandon target"))?;
    get_integer(elem.content(body))
}

/// Encodes an AbandonRequest body naming `target_msgid`. An AbandonRequest's
/// body is, unusually, a bare `[APPLICATION 16] INTEGER` rather than a
/// SEQUENCE — the dispatcher uses this when re-forwarding an abandon onto
/// the target operation's upstream.
pub fn encode_abandon_request(target_msgid: i32) -> Bytes {
    Bytes::from(put_tlv(tag::ABANDON_REQUEST, &put_integer(target_msgid as i64)))
}

/// `tokio_util::codec` adapter framing LDAP messages over a byte stream.
/// Holds no protocol state of its own.
#[derive(Debug, Default)]
pub struct LdapCodec;

impl Decoder for LdapCodec {
    type Item = Frame;
    type Error = LberError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, LberError> {
        if peek_tag(src).is_none() {
            return Ok(None);
        }
        match decode_frame(src)? {
            Some((frame, consumed)) => {
                src.advance(consumed);
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }
}

impl Encoder<OutgoingMessage> for LdapCodec {
    type Error = LberError;

    fn encode(&mut self, item: OutgoingMessage, dst: &mut BytesMut) -> Result<(), LberError> {
        dst.put(encode_frame(&item));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_bind_like_envelope() {
        let body = Bytes::from(put_tlv(0x60, b"fake-bind-body"));
        let outgoing = OutgoingMessage {
            msgid: 7,
            body: body.clone(),
            controls: None,
        };
        let wire = encode_frame(&outgoing);
        let (frame, consumed) = decode_frame(&wire).unwrap().unwrap();
        assert_eq!(consumed, wire.len());
        assert_eq!(frame.msgid, 7);
        assert_eq!(frame.op_tag, 0x60);
        assert_eq!(frame.body, body);
        assert_eq!(frame.controls, None);
    }

    #[test]
    fn round_trips_with_controls() {
        let body = Bytes::from(put_tlv(0x68, b"add-body"));
        let controls = Bytes::from(put_tlv(tag::CONTROLS, b"ctrl"));
        let outgoing = OutgoingMessage {
            msgid: 42,
            body: body.clone(),
            controls: Some(controls.clone()),
        };
        let wire = encode_frame(&outgoing);
        let (frame, _) = decode_frame(&wire).unwrap().unwrap();
        assert_eq!(frame.controls, Some(controls));
        assert_eq!(frame.body, body);
    }

    #[test]
    fn incomplete_buffer_yields_none() {
        let body = Bytes::from(put_tlv(0x60, b"x"));
        let wire = encode_frame(&OutgoingMessage {
            msgid: 1,
            body,
            controls: None,
        });
        let truncated = &wire[..wire.len() - 1];
        assert!(decode_frame(truncated).unwrap().is_none());
    }

    #[test]
    fn header_split_across_read_boundary_yields_none_not_error() {
        // Only the SEQUENCE tag byte has arrived; the length byte hasn't.
        // This is a routine TCP read boundary, not a malformed frame.
        let wire = [tag::SEQUENCE];
        assert!(decode_frame(&wire).unwrap().is_none());
    }

    #[test]
    fn abandon_target_decodes_bare_integer() {
        let target = put_integer(7);
        assert_eq!(decode_abandon_target(&target).unwrap(), 7);
    }

    #[test]
    fn decoder_advances_buffer_by_consumed_amount() {
        let body = Bytes::from(put_tlv(0x60, b"hi"));
        let wire = encode_frame(&OutgoingMessage {
            msgid: 3,
            body,
            controls: None,
        });
        let mut buf = BytesMut::from(&wire[..]);
        let mut codec = LdapCodec;
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.msgid, 3);
        assert!(buf.is_empty());
    }
}
