/*++

Licensed under the Apache-2.0 license.

File Name:

   loader.rs

Abstract:

    Loads a certificate's raw bytes from external storage into a caller
    buffer, validating the declared size against the buffer capacity
    before the bulk read.

--*/

use crate::asn1::{read_item, Asn1Cursor};
use crate::FlashAccess;
use kestrel_cert_types::der::TAG_SEQUENCE;
use kestrel_cert_types::{CERT_PREFIX_READ_WORDS, MAX_CERT_BYTE_SIZE};
use kestrel_error::{KestrelError, KestrelResult};
use zerocopy::IntoBytes;

/// Load one certificate from `addr` into `buf`.
///
/// The first read fetches only the outer SEQUENCE header; the full size
/// is derived from it with checked arithmetic and validated against the
/// buffer capacity before the second read fetches the remainder.
///
/// Returns the word-aligned number of words the certificate occupies in
/// storage; callers use it to locate data placed directly after the
/// certificate.
pub fn load_certificate<F: FlashAccess>(
    flash: &mut F,
    addr: u32,
    buf: &mut [u32],
) -> KestrelResult<u32> {
    if buf.is_empty() {
        return Err(KestrelError::INVALID_INPUT_PARAMETER);
    }
    if buf.len() < CERT_PREFIX_READ_WORDS {
        return Err(KestrelError::WORKSPACE_TOO_SMALL);
    }

    flash.read(addr, buf[..CERT_PREFIX_READ_WORDS].as_mut_bytes())?;

    let prefix = buf[..CERT_PREFIX_READ_WORDS].as_bytes();
    let mut cursor = Asn1Cursor::new(prefix);
    let outer = read_item(&mut cursor, TAG_SEQUENCE)?;

    // The reader bounds outer.len to the maximum certificate size, but the
    // sum is still formed with checked arithmetic; the length is attacker
    // controlled.
    let total = (outer.header_size as usize)
        .checked_add(outer.len as usize)
        .ok_or(KestrelError::LOADER_SIZE_OVERFLOW)?;
    if total > MAX_CERT_BYTE_SIZE {
        return Err(KestrelError::LOADER_BUFFER_TOO_SMALL);
    }

    let total_words = total.div_ceil(4);
    if total_words > buf.len() {
        return Err(KestrelError::LOADER_BUFFER_TOO_SMALL);
    }

    if total_words > CERT_PREFIX_READ_WORDS {
        let prefix_bytes = (CERT_PREFIX_READ_WORDS * 4) as u32;
        let rest_addr = addr
            .checked_add(prefix_bytes)
            .ok_or(KestrelError::LOADER_SIZE_OVERFLOW)?;
        flash.read(
            rest_addr,
            buf[CERT_PREFIX_READ_WORDS..total_words].as_mut_bytes(),
        )?;
    }

    Ok(total_words as u32)
}
