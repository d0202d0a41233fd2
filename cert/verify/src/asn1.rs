/*++

Licensed under the Apache-2.0 license.

File Name:

   asn1.rs

Abstract:

    Byte cursor and tag/length decoding for the fixed ASN.1 certificate
    profile. Every other module performs its reads through this cursor;
    no component does offset arithmetic on the raw buffer directly.

--*/

use kestrel_cert_types::MAX_CERT_BYTE_SIZE;
use kestrel_error::{KestrelError, KestrelResult};

/// A borrowed window over certificate bytes plus a read position.
///
/// The position always stays within `[0, len]`; any advance that would
/// pass the end (or wrap) fails and leaves the cursor unchanged.
#[derive(Debug)]
pub struct Asn1Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Asn1Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Advance the position by `n`. Checked in both directions since the
    /// lengths driving `n` are attacker controlled.
    pub fn advance(&mut self, n: usize) -> KestrelResult<()> {
        let new_pos = self
            .pos
            .checked_add(n)
            .ok_or(KestrelError::ASN1_OUT_OF_BOUNDS)?;
        if new_pos > self.data.len() {
            return Err(KestrelError::ASN1_OUT_OF_BOUNDS);
        }
        self.pos = new_pos;
        Ok(())
    }

    pub fn read_u8(&mut self) -> KestrelResult<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(KestrelError::ASN1_OUT_OF_BOUNDS)?;
        self.pos += 1;
        Ok(byte)
    }

    /// Next byte without advancing
    pub fn peek_u8(&self) -> KestrelResult<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(KestrelError::ASN1_OUT_OF_BOUNDS)
    }

    /// Read `n` bytes and advance past them
    pub fn read_bytes(&mut self, n: usize) -> KestrelResult<&'a [u8]> {
        let start = self.pos;
        self.advance(n)?;
        Ok(&self.data[start..start + n])
    }
}

/// One decoded tag + length header
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Asn1Item {
    pub tag: u8,
    /// Declared content length, already bounded by `MAX_CERT_BYTE_SIZE`
    pub len: u32,
    /// Bytes the tag + length header itself occupied
    pub header_size: u32,
}

impl Asn1Item {
    /// Header plus content size. Cannot overflow: both parts are bounded
    /// by the maximum certificate size.
    pub fn total_size(&self) -> u32 {
        self.header_size + self.len
    }
}

/// Decode one tag + length header from the cursor.
///
/// Short form lengths use the low 7 bits directly; long form lengths carry
/// a byte count of 1..=4 followed by big-endian length bytes. The decoded
/// length is rejected before return if it exceeds the maximum certificate
/// size, which defends every later size-arithmetic step against overflow.
pub fn read_item(cursor: &mut Asn1Cursor, expected_tag: u8) -> KestrelResult<Asn1Item> {
    let tag = cursor.read_u8()?;
    if tag != expected_tag {
        return Err(KestrelError::ASN1_TAG_MISMATCH);
    }

    let first = cursor.read_u8()?;
    let (len, header_size) = if first & 0x80 == 0 {
        (first as u32, 2)
    } else {
        let count = (first & 0x7F) as usize;
        if count == 0 || count > 4 {
            return Err(KestrelError::ASN1_MALFORMED_LENGTH);
        }
        let mut len: u32 = 0;
        for byte in cursor.read_bytes(count)? {
            len = (len << 8) | *byte as u32;
        }
        (len, 2 + count as u32)
    };

    if len as usize > MAX_CERT_BYTE_SIZE {
        return Err(KestrelError::ASN1_OVERSIZED_ITEM);
    }

    Ok(Asn1Item {
        tag,
        len,
        header_size,
    })
}

/// Decode an item and return its content bytes
pub fn read_item_bytes<'a>(
    cursor: &mut Asn1Cursor<'a>,
    expected_tag: u8,
) -> KestrelResult<&'a [u8]> {
    let item = read_item(cursor, expected_tag)?;
    cursor.read_bytes(item.len as usize)
}
