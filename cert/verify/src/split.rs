/*++

Licensed under the Apache-2.0 license.

File Name:

   split.rs

Abstract:

    Debug package splitter. A debug package is 2 or 3 DER certificates
    concatenated back to back, each padded out to a word boundary. This
    walks the outer SEQUENCE headers to find the certificate boundaries
    without parsing certificate contents.

--*/

use crate::asn1::{read_item, Asn1Cursor};
use kestrel_cert_types::der::TAG_SEQUENCE;
use kestrel_cert_types::MAX_CERT_BYTE_SIZE;
use kestrel_error::{KestrelError, KestrelResult};

pub const PKG_MIN_CERT_COUNT: usize = 2;
pub const PKG_MAX_CERT_COUNT: usize = 3;

/// Borrowed slices of the individual certificates in a debug package
#[derive(Debug, Copy, Clone)]
pub struct DebugPackage<'a> {
    certs: [&'a [u8]; PKG_MAX_CERT_COUNT],
    count: usize,
}

impl<'a> DebugPackage<'a> {
    pub fn count(&self) -> usize {
        self.count
    }

    /// The certificate at `index`, or None past `count()`
    pub fn cert(&self, index: usize) -> Option<&'a [u8]> {
        if index < self.count {
            Some(self.certs[index])
        } else {
            None
        }
    }
}

/// Split a concatenated debug package into its certificates.
///
/// Each certificate's extent is its outer SEQUENCE header plus declared
/// length, rounded up to the next word boundary. The package must hold
/// exactly 2 or 3 certificates with nothing after the last one.
pub fn split_debug_package(pkg: &[u8]) -> KestrelResult<DebugPackage<'_>> {
    if pkg.is_empty() {
        return Err(KestrelError::INVALID_INPUT_PARAMETER);
    }

    let mut certs: [&[u8]; PKG_MAX_CERT_COUNT] = [&[]; PKG_MAX_CERT_COUNT];
    let mut count = 0usize;
    let mut offset = 0usize;

    while offset < pkg.len() {
        if count == PKG_MAX_CERT_COUNT {
            return Err(KestrelError::PKG_SPLITTER_BAD_CERT_COUNT);
        }

        let mut cursor = Asn1Cursor::new(&pkg[offset..]);
        let item = read_item(&mut cursor, TAG_SEQUENCE)
            .map_err(|_| KestrelError::PKG_SPLITTER_PARSE_ILLEGAL)?;

        let total = item.total_size() as usize;
        if total > MAX_CERT_BYTE_SIZE {
            return Err(KestrelError::PKG_SPLITTER_PARSE_ILLEGAL);
        }

        let end = offset
            .checked_add(total)
            .ok_or(KestrelError::PKG_SPLITTER_PARSE_ILLEGAL)?;
        if end > pkg.len() {
            return Err(KestrelError::PKG_SPLITTER_PARSE_ILLEGAL);
        }

        certs[count] = &pkg[offset..end];
        count += 1;

        // Certificates are stored word aligned; skip the pad.
        let aligned = end
            .checked_add(3)
            .ok_or(KestrelError::PKG_SPLITTER_PARSE_ILLEGAL)?
            & !3;
        offset = aligned.min(pkg.len());
    }

    if count < PKG_MIN_CERT_COUNT {
        return Err(KestrelError::PKG_SPLITTER_BAD_CERT_COUNT);
    }

    Ok(DebugPackage { certs, count })
}
