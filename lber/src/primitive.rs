//! Tag/length/value primitives for the LDAP message envelope.
//!
//! Only what the envelope layer needs: peeking a tag, reading a BER definite
//! length (short and long form), skipping one complete TLV without
//! interpreting its content, and getting/putting the two-complement INTEGER
//! encoding used for message IDs and the Abandon target.

use nom::bytes::streaming::take;
use nom::error::{Error as NomError, ErrorKind};
use nom::number::streaming::be_u8;
use nom::{Err as NomErr, IResult};

use crate::LberError;

/// Read a BER definite-length field. Returns `(length, bytes_consumed)`.
fn parse_length(input: &[u8]) -> IResult<&[u8], usize> {
    let (rest, first) = be_u8(input)?;
    if first & 0x80 == 0 {
        return Ok((rest, first as usize));
    }
    let n_octets = (first & 0x7F) as usize;
    if n_octets == 0 || n_octets > std::mem::size_of::<usize>() {
        return Err(NomErr::Failure(NomError::new(rest, ErrorKind::LengthValue)));
    }
    let (rest, octets) = take(n_octets)(rest)?;
    let len = octets.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize);
    Ok((rest, len))
}

/// Peek the leading tag byte without consuming anything.
pub fn peek_tag(input: &[u8]) -> Option<u8> {
    input.first().copied()
}

/// One decoded tagged element: its tag byte, the full encoded span
/// (tag + length header + content, never just the content), and where the
/// content begins within that span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    pub tag: u8,
    pub len: usize,
    pub content_offset: usize,
}

impl Element {
    /// The element's content, given the full slice this `Element` was
    /// parsed out of (starting at the element's own tag byte).
    pub fn content<'a>(&self, full_element_bytes: &'a [u8]) -> &'a [u8] {
        &full_element_bytes[self.content_offset..self.len]
    }
}

/// Skip one complete TLV element starting at `input[0]`. Returns the element
/// descriptor and the number of bytes it occupies in `input`, without
/// recursing into constructed content.
///
/// `Ok(None)` means the buffer doesn't yet hold a complete element (caller
/// should wait for more bytes); `Err` means the header itself is malformed.
pub fn skip_element(input: &[u8]) -> Result<Option<(Element, usize)>, LberError> {
    if input.is_empty() {
        return Ok(None);
    }
    let tag = input[0];
    let rest = &input[1..];
    match parse_length(rest) {
        Ok((after_len, content_len)) => {
            let header_len = input.len() - after_len.len();
            let total = header_len + content_len;
            if after_len.len() < content_len {
                return Ok(None);
            }
            Ok(Some((
                Element {
                    tag,
                    len: total,
                    content_offset: header_len,
                },
                total,
            )))
        }
        Err(NomErr::Incomplete(_)) => Ok(None),
        Err(_) => Err(LberError::Malformed("invalid BER length")),
    }
}

/// Decode the content of an INTEGER primitive (two's-complement, big-endian,
/// minimal encoding) into a signed 32-bit value, as used for message IDs.
pub fn get_integer(content: &[u8]) -> Result<i32, LberError> {
    if content.is_empty() || content.len() > 4 {
        return Err(LberError::Malformed("integer out of i32 range"));
    }
    let mut value: i32 = if content[0] & 0x80 != 0 { -1 } else { 0 };
    for &b in content {
        value = (value << 8) | b as i32;
    }
    Ok(value)
}

/// Encode a signed integer in minimal two's-complement big-endian form.
pub fn put_integer(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let byte = bytes[start];
        let next = bytes[start + 1];
        let sign_extends = (byte == 0x00 && next & 0x80 == 0) || (byte == 0xFF && next & 0x80 != 0);
        if !sign_extends {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

/// BER definite-length encoding of `len`, minimal form.
fn encode_length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        return vec![len as u8];
    }
    let mut octets = Vec::new();
    let mut n = len;
    while n > 0 {
        octets.push((n & 0xFF) as u8);
        n >>= 8;
    }
    octets.reverse();
    let mut out = Vec::with_capacity(octets.len() + 1);
    out.push(0x80 | octets.len() as u8);
    out.extend(octets);
    out
}

/// Wrap `content` in a tag + definite-length header.
pub fn put_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 6);
    out.push(tag);
    out.extend(encode_length(content.len()));
    out.extend_from_slice(content);
    out
}
