//! Wire codec for memos: length-prefixed binary primitives, base64 framing
//! and the two authenticated payload envelopes (user and member).

mod memo;

pub use memo::{
    decode_member_action, decode_user_action, seal_user_action, sign_member_action, MemberAction,
    MemoError, UserAction,
};

use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD as BASE64_STD, URL_SAFE as BASE64_URL};
use base64::Engine as _;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("unexpected end of payload")]
    Eof,
    #[error("malformed payload")]
    Malformed,
}

pub fn put_uuid(buf: &mut Vec<u8>, id: &Uuid) {
    buf.extend_from_slice(id.as_bytes());
}

pub fn put_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

pub fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

pub fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

/// Strings ride with a one-byte length prefix; memo payloads are tiny.
pub fn put_str(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    debug_assert!(bytes.len() <= u8::MAX as usize);
    buf.push(bytes.len().min(u8::MAX as usize) as u8);
    buf.extend_from_slice(&bytes[..bytes.len().min(u8::MAX as usize)]);
}

/// Decimals are encoded as their canonical (trailing-zero-free) string.
pub fn put_decimal(buf: &mut Vec<u8>, d: Decimal) {
    put_str(buf, &d.normalize().to_string());
}

pub fn encode_base64(raw: &[u8]) -> String {
    BASE64_STD.encode(raw)
}

/// Derive a deterministic child trace id from a parent trace. Used for
/// response transfers so replays regenerate identical payments.
pub fn derive_trace_id(trace_id: &str, tag: &str) -> String {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("{trace_id}:{tag}").as_bytes(),
    )
    .to_string()
}

/// Memo strings arrive base64 standard, base64 url-safe or raw; try each in
/// that order.
pub fn decode_base64(memo: &str) -> Vec<u8> {
    if let Ok(b) = BASE64_STD.decode(memo) {
        return b;
    }
    if let Ok(b) = BASE64_URL.decode(memo) {
        return b;
    }
    memo.as_bytes().to_vec()
}

/// Sequential reader over an encoded payload.
pub struct Scanner<'a> {
    buf: &'a [u8],
}

impl<'a> Scanner<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ScanError> {
        if self.buf.len() < n {
            return Err(ScanError::Eof);
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    pub fn read_uuid(&mut self) -> Result<Uuid, ScanError> {
        let raw = self.take(16)?;
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(raw);
        Ok(Uuid::from_bytes(bytes))
    }

    pub fn read_u8(&mut self) -> Result<u8, ScanError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ScanError> {
        let raw = self.take(2)?;
        Ok(u16::from_be_bytes([raw[0], raw[1]]))
    }

    pub fn read_u64(&mut self) -> Result<u64, ScanError> {
        let raw = self.take(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(raw);
        Ok(u64::from_be_bytes(bytes))
    }

    pub fn read_str(&mut self) -> Result<String, ScanError> {
        let len = self.read_u8()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| ScanError::Malformed)
    }

    pub fn read_decimal(&mut self) -> Result<Decimal, ScanError> {
        let s = self.read_str()?;
        Decimal::from_str(&s).map_err(|_| ScanError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_round_trip() {
        let id = Uuid::new_v4();
        let mut buf = Vec::new();
        put_uuid(&mut buf, &id);
        put_u8(&mut buf, 7);
        put_u16(&mut buf, 65000);
        put_u64(&mut buf, 1 << 40);
        put_str(&mut buf, "BTC");
        put_decimal(&mut buf, Decimal::from_str("434.78260869").unwrap());

        let mut s = Scanner::new(&buf);
        assert_eq!(s.read_uuid().unwrap(), id);
        assert_eq!(s.read_u8().unwrap(), 7);
        assert_eq!(s.read_u16().unwrap(), 65000);
        assert_eq!(s.read_u64().unwrap(), 1 << 40);
        assert_eq!(s.read_str().unwrap(), "BTC");
        assert_eq!(
            s.read_decimal().unwrap(),
            Decimal::from_str("434.78260869").unwrap()
        );
        assert_eq!(s.remaining(), 0);
    }

    #[test]
    fn decimal_encoding_is_canonical() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        put_decimal(&mut a, Decimal::from_str("1.500").unwrap());
        put_decimal(&mut b, Decimal::from_str("1.5").unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn truncated_payload_is_eof() {
        let mut buf = Vec::new();
        put_uuid(&mut buf, &Uuid::new_v4());
        let mut s = Scanner::new(&buf[..10]);
        assert_eq!(s.read_uuid(), Err(ScanError::Eof));
    }

    #[test]
    fn base64_fallback_order() {
        let raw = vec![1u8, 2, 250, 251];
        assert_eq!(decode_base64(&BASE64_STD.encode(&raw)), raw);
        assert_eq!(decode_base64(&BASE64_URL.encode(&raw)), raw);
        // Not valid base64 at all: falls through to raw bytes.
        assert_eq!(decode_base64("!!"), b"!!".to_vec());
    }
}
