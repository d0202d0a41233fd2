/*++

Licensed under the Apache-2.0 license.

File Name:

   ext.rs

Abstract:

    Parser for the three fixed proprietary certificate extensions:
    proprietary header, public-key reduction-constant tail, and the
    certificate-type-specific body. The body is returned as a view into
    the certificate bytes; nothing is copied.

--*/

use crate::asn1::{read_item, read_item_bytes, Asn1Cursor};
use kestrel_cert_types::der::*;
use kestrel_cert_types::*;
use kestrel_error::{KestrelError, KestrelResult};
use zerocopy::FromBytes;

/// Parsed extension data. `body` borrows the certificate buffer; callers
/// must not retain it past the certificate's lifetime.
pub(crate) struct CertExtensions<'a> {
    pub prop_header: CertPropHeader,
    pub reduction_constant: [u8; RSA_NP_BYTE_SIZE],
    /// Type-specific body payload, sign-pad already stripped
    pub body: &'a [u8],
}

/// Parse the extensions wrapper holding exactly 3 extensions in fixed
/// order, each shaped SEQUENCE { OID, BOOLEAN, OCTET STRING }.
pub(crate) fn parse_extensions<'a>(
    cursor: &mut Asn1Cursor<'a>,
) -> KestrelResult<CertExtensions<'a>> {
    let wrapper = read_item(cursor, TAG_CTX_EXTENSIONS)?;
    let wrapper_end = end_of(cursor, wrapper.len)?;
    let list = read_item(cursor, TAG_SEQUENCE)?;
    let list_end = end_of(cursor, list.len)?;

    let header_payload = read_extension(cursor, PROP_EXT_ID_HEADER)?;
    let header_bytes = unpad(header_payload, CERT_PROP_HEADER_BYTE_SIZE)?;
    let prop_header = CertPropHeader::read_from_bytes(header_bytes)
        .map_err(|_| KestrelError::EXT_PARSE_ILLEGAL)?;

    let np_payload = read_extension(cursor, PROP_EXT_ID_NP)?;
    let np_bytes = unpad(np_payload, RSA_NP_BYTE_SIZE)?;
    let mut reduction_constant = [0u8; RSA_NP_BYTE_SIZE];
    reduction_constant.copy_from_slice(np_bytes);

    let body_payload = read_extension(cursor, PROP_EXT_ID_BODY)?;
    let body = unpad_body(body_payload, &prop_header)?;

    if cursor.pos() != list_end || cursor.pos() != wrapper_end {
        return Err(KestrelError::EXT_PARSE_ILLEGAL);
    }

    Ok(CertExtensions {
        prop_header,
        reduction_constant,
        body,
    })
}

/// One extension; the OID's trailing byte must match `expected_id`
fn read_extension<'a>(cursor: &mut Asn1Cursor<'a>, expected_id: u8) -> KestrelResult<&'a [u8]> {
    let ext = read_item(cursor, TAG_SEQUENCE)?;
    let ext_end = end_of(cursor, ext.len)?;

    let oid = read_item_bytes(cursor, TAG_OID)?;
    if oid.len() != OID_PROP_EXT_PREFIX.len() + 1 || !oid.starts_with(OID_PROP_EXT_PREFIX) {
        return Err(KestrelError::EXT_UNKNOWN_EXTENSION);
    }
    let id = oid[oid.len() - 1];
    if !(PROP_EXT_ID_HEADER..=PROP_EXT_ID_BODY).contains(&id) {
        return Err(KestrelError::EXT_UNKNOWN_EXTENSION);
    }
    // Recognized but out of order
    if id != expected_id {
        return Err(KestrelError::EXT_PARSE_ILLEGAL);
    }

    // Critical flag: consumed, not policy-checked
    let critical = read_item(cursor, TAG_BOOLEAN)?;
    if critical.len != 1 {
        return Err(KestrelError::EXT_PARSE_ILLEGAL);
    }
    cursor.read_u8()?;

    let payload = read_item_bytes(cursor, TAG_OCTET_STRING)?;
    if cursor.pos() != ext_end {
        return Err(KestrelError::EXT_PARSE_ILLEGAL);
    }
    Ok(payload)
}

/// A payload one byte larger than expected is tolerated only when its
/// leading byte is zero (ASN.1 integer sign pad).
fn unpad(payload: &[u8], expected: usize) -> KestrelResult<&[u8]> {
    if payload.len() == expected {
        Ok(payload)
    } else if payload.len() == expected + 1 && payload[0] == 0 {
        Ok(&payload[1..])
    } else {
        Err(KestrelError::EXT_PAYLOAD_SIZE_MISMATCH)
    }
}

/// Body payload size depends on the certificate type from the proprietary
/// header: a fixed digest for key certificates, prefix plus image records
/// for content certificates.
fn unpad_body<'a>(payload: &'a [u8], header: &CertPropHeader) -> KestrelResult<&'a [u8]> {
    match CertType::try_from(header.cert_type) {
        Ok(CertType::Key) => unpad(payload, SHA256_DIGEST_BYTE_SIZE),
        Ok(CertType::Content) => {
            if check_content_body(payload).is_ok() {
                return Ok(payload);
            }
            // Sign-pad tolerance: retry with the leading zero stripped
            if payload.first() == Some(&0) {
                let stripped = &payload[1..];
                if check_content_body(stripped).is_ok() {
                    return Ok(stripped);
                }
            }
            Err(check_content_body(payload).unwrap_err())
        }
        // The field assembler rejects the type itself; treat the payload
        // as opaque garbage here.
        Err(_) => Err(KestrelError::EXT_PAYLOAD_SIZE_MISMATCH),
    }
}

/// A content body must hold its prefix, an in-range image count, and
/// exactly `image_count` records.
fn check_content_body(body: &[u8]) -> KestrelResult<()> {
    let prefix_bytes = body
        .get(..CONTENT_BODY_PREFIX_BYTE_SIZE)
        .ok_or(KestrelError::EXT_PAYLOAD_SIZE_MISMATCH)?;
    let prefix = ContentBodyPrefix::read_from_bytes(prefix_bytes)
        .map_err(|_| KestrelError::EXT_PARSE_ILLEGAL)?;

    if prefix.image_count == 0 || prefix.image_count as usize > MAX_SW_IMAGES {
        return Err(KestrelError::EXT_TOO_MANY_IMAGES);
    }

    let expected = CONTENT_BODY_PREFIX_BYTE_SIZE
        .checked_add(
            (prefix.image_count as usize)
                .checked_mul(SW_IMAGE_SIGNED_BYTE_SIZE)
                .ok_or(KestrelError::EXT_PAYLOAD_SIZE_MISMATCH)?,
        )
        .ok_or(KestrelError::EXT_PAYLOAD_SIZE_MISMATCH)?;
    if body.len() != expected {
        return Err(KestrelError::EXT_PAYLOAD_SIZE_MISMATCH);
    }
    Ok(())
}

fn end_of(cursor: &Asn1Cursor, len: u32) -> KestrelResult<usize> {
    cursor
        .pos()
        .checked_add(len as usize)
        .ok_or(KestrelError::EXT_PARSE_ILLEGAL)
}
