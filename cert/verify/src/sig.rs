/*++

Licensed under the Apache-2.0 license.

File Name:

   sig.rs

Abstract:

    Extractor for the trailing signature block: the signature algorithm
    identifier and the raw RSA-PSS signature, byte-reversed into the
    little-endian representation the verify primitive expects.

--*/

use crate::asn1::{read_item, Asn1Cursor};
use crate::tbs::read_sig_alg;
use kestrel_cert_types::der::TAG_BIT_STRING;
use kestrel_cert_types::{CertSignature, RSA_SIG_BYTE_SIZE};
use kestrel_error::{KestrelError, KestrelResult};

/// Consume the signature-algorithm block and the signature BIT STRING.
///
/// The BIT STRING's leading unused-bits byte is skipped without being
/// validated as zero; the profile is frozen against certificates that
/// were issued this way.
pub(crate) fn extract_signature(cursor: &mut Asn1Cursor) -> KestrelResult<CertSignature> {
    read_sig_alg(
        cursor,
        KestrelError::SIG_BAD_ALGORITHM,
        KestrelError::SIG_BAD_ALGORITHM,
    )?;

    let bits = read_item(cursor, TAG_BIT_STRING)?;
    if bits.len as usize != RSA_SIG_BYTE_SIZE + 1 {
        return Err(KestrelError::SIG_BAD_BIT_STRING);
    }
    cursor.read_u8()?;

    let wire = cursor.read_bytes(RSA_SIG_BYTE_SIZE)?;
    let mut sig = CertSignature::default();
    for (dst, src) in sig.bytes.iter_mut().zip(wire.iter().rev()) {
        *dst = *src;
    }
    Ok(sig)
}
