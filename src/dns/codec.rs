//! Minimal RFC 1035 message codec: A/AAAA questions out, answer records in.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{DnsError, RecordType};

pub const CLASS_IN: u16 = 1;

const HEADER_LEN: usize = 12;
const FLAG_QR: u16 = 0x8000;
const FLAG_RD: u16 = 0x0100;
const RCODE_MASK: u16 = 0x000f;
const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 255;
const POINTER_MASK: u8 = 0xc0;

/// Decoded reply: transaction id, response code and the addresses of the
/// requested record type, in answer-section order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedReply {
    pub id: u16,
    pub rcode: u8,
    pub addresses: Vec<IpAddr>,
}

/// Builds a recursive query for `name`.
pub fn encode_query(id: u16, record_type: RecordType, name: &str) -> Result<Bytes, DnsError> {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + name.len() + 6);
    buf.put_u16(id);
    buf.put_u16(FLAG_RD);
    buf.put_u16(1); // QDCOUNT
    buf.put_u16(0); // ANCOUNT
    buf.put_u16(0); // NSCOUNT
    buf.put_u16(0); // ARCOUNT
    encode_name(&mut buf, name)?;
    buf.put_u16(record_type.code());
    buf.put_u16(CLASS_IN);
    Ok(buf.freeze())
}

fn encode_name(buf: &mut BytesMut, name: &str) -> Result<(), DnsError> {
    let trimmed = name.strip_suffix('.').unwrap_or(name);
    if trimmed.is_empty() || trimmed.len() + 2 > MAX_NAME_LEN {
        return Err(DnsError::InvalidName(name.to_string()));
    }
    for label in trimmed.split('.') {
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(DnsError::InvalidName(name.to_string()));
        }
        buf.put_u8(label.len() as u8);
        buf.put_slice(label.as_bytes());
    }
    buf.put_u8(0);
    Ok(())
}

/// Decodes a reply, keeping only answers of `wanted` type in class IN.
pub fn decode_reply(message: &[u8], wanted: RecordType) -> Result<DecodedReply, DnsError> {
    let mut buf = message;
    let id = take_u16(&mut buf)?;
    let flags = take_u16(&mut buf)?;
    let qdcount = take_u16(&mut buf)?;
    let ancount = take_u16(&mut buf)?;
    take_u16(&mut buf)?; // NSCOUNT
    take_u16(&mut buf)?; // ARCOUNT

    if flags & FLAG_QR == 0 {
        return Err(DnsError::Malformed("message is not a response"));
    }
    let rcode = (flags & RCODE_MASK) as u8;

    for _ in 0..qdcount {
        skip_name(&mut buf)?;
        take_u16(&mut buf)?; // QTYPE
        take_u16(&mut buf)?; // QCLASS
    }

    let mut addresses = Vec::new();
    if rcode != 0 {
        return Ok(DecodedReply { id, rcode, addresses });
    }

    for _ in 0..ancount {
        skip_name(&mut buf)?;
        let rtype = take_u16(&mut buf)?;
        let class = take_u16(&mut buf)?;
        take_u32(&mut buf)?; // TTL
        let rdlength = take_u16(&mut buf)? as usize;
        if buf.remaining() < rdlength {
            return Err(DnsError::Malformed("truncated record data"));
        }
        let rdata = &buf[..rdlength];
        if class == CLASS_IN && rtype == wanted.code() {
            match (wanted, rdlength) {
                (RecordType::A, 4) => {
                    let octets: [u8; 4] = [rdata[0], rdata[1], rdata[2], rdata[3]];
                    addresses.push(IpAddr::V4(Ipv4Addr::from(octets)));
                }
                (RecordType::AAAA, 16) => {
                    let mut octets = [0u8; 16];
                    octets.copy_from_slice(rdata);
                    addresses.push(IpAddr::V6(Ipv6Addr::from(octets)));
                }
                _ => return Err(DnsError::Malformed("address record of unexpected length")),
            }
        }
        buf.advance(rdlength);
    }

    Ok(DecodedReply { id, rcode, addresses })
}

// Names may end in a compression pointer; the pointer target is never
// followed since only the position after the name matters here.
fn skip_name(buf: &mut &[u8]) -> Result<(), DnsError> {
    let mut consumed = 0usize;
    loop {
        let len = take_u8(buf)?;
        if len & POINTER_MASK == POINTER_MASK {
            take_u8(buf)?;
            return Ok(());
        }
        if len & POINTER_MASK != 0 {
            return Err(DnsError::Malformed("unsupported label type"));
        }
        if len == 0 {
            return Ok(());
        }
        let len = len as usize;
        consumed += len + 1;
        if consumed > MAX_NAME_LEN || buf.remaining() < len {
            return Err(DnsError::Malformed("truncated name"));
        }
        buf.advance(len);
    }
}

fn take_u8(buf: &mut &[u8]) -> Result<u8, DnsError> {
    if buf.remaining() < 1 {
        return Err(DnsError::Malformed("truncated message"));
    }
    Ok(buf.get_u8())
}

fn take_u16(buf: &mut &[u8]) -> Result<u16, DnsError> {
    if buf.remaining() < 2 {
        return Err(DnsError::Malformed("truncated message"));
    }
    Ok(buf.get_u16())
}

fn take_u32(buf: &mut &[u8]) -> Result<u32, DnsError> {
    if buf.remaining() < 4 {
        return Err(DnsError::Malformed("truncated message"));
    }
    Ok(buf.get_u32())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_layout_matches_rfc1035() {
        let msg = encode_query(0x1234, RecordType::A, "example.com").unwrap();
        let expected: &[u8] = &[
            0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
            7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0, //
            0x00, 0x01, 0x00, 0x01,
        ];
        assert_eq!(&msg[..], expected);
    }

    #[test]
    fn trailing_dot_is_accepted() {
        let a = encode_query(1, RecordType::AAAA, "example.com.").unwrap();
        let b = encode_query(1, RecordType::AAAA, "example.com").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_empty_and_oversized_labels() {
        assert!(encode_query(1, RecordType::A, "").is_err());
        assert!(encode_query(1, RecordType::A, "a..b").is_err());
        let long = "x".repeat(64);
        assert!(encode_query(1, RecordType::A, &long).is_err());
    }

    #[test]
    fn truncated_reply_is_malformed() {
        assert!(decode_reply(&[0x12, 0x34, 0x81], RecordType::A).is_err());
    }
}
