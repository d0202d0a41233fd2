/*++

Licensed under the Apache-2.0 license.

File Name:

   der.rs

Abstract:

    DER construction helpers for the certificate generator. These build
    owned byte vectors; the generator runs on the host, not in firmware.

--*/

use kestrel_cert_types::der::{TAG_INTEGER, TAG_OID};

/// Encode a DER length field
pub fn der_len(len: usize) -> Vec<u8> {
    if len < 128 {
        return vec![len as u8];
    }
    let be = len.to_be_bytes();
    let first = be.iter().position(|b| *b != 0).unwrap_or(be.len() - 1);
    let mut out = vec![0x80 | (be.len() - first) as u8];
    out.extend_from_slice(&be[first..]);
    out
}

/// Encode one tag + length + content item
pub fn der_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    out.extend_from_slice(&der_len(content.len()));
    out.extend_from_slice(content);
    out
}

/// Encode an unsigned INTEGER from big-endian bytes, trimming leading
/// zeros and adding the sign pad byte when the top bit is set
pub fn der_uint(val: &[u8]) -> Vec<u8> {
    let trimmed = match val.iter().position(|b| *b != 0) {
        Some(first) => &val[first..],
        None => &[0][..],
    };
    let mut content = Vec::with_capacity(trimmed.len() + 1);
    if trimmed[0] & 0x80 != 0 {
        content.push(0);
    }
    content.extend_from_slice(trimmed);
    der_tlv(TAG_INTEGER, &content)
}

/// Encode an OBJECT IDENTIFIER from its value bytes
pub fn der_oid(value: &[u8]) -> Vec<u8> {
    der_tlv(TAG_OID, value)
}
