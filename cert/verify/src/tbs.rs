/*++

Licensed under the Apache-2.0 license.

File Name:

   tbs.rs

Abstract:

    Parser for the to-be-signed portion of a chain certificate: wrapper
    sequences, version, serial number, signature algorithm binding, names,
    validity period and the RSA public key. The profile is fixed; any
    deviation rejects the whole certificate.

--*/

use crate::asn1::{read_item, read_item_bytes, Asn1Cursor, Asn1Item};
use crate::CertVerificationEnv;
use kestrel_cert_types::der::*;
use kestrel_cert_types::*;
use kestrel_error::{KestrelError, KestrelResult};

/// Everything the TBS parse yields: the signed-region boundaries, the RSA
/// modulus and the human-readable display fields.
pub(crate) struct TbsInfo {
    /// Offset of the signed region (the inner TBS sequence incl. header)
    pub signed_start: usize,

    /// Size of the signed region
    pub signed_len: usize,

    /// End offset of the outer certificate sequence
    pub outer_end: usize,

    pub modulus: [u8; RSA_MOD_BYTE_SIZE],

    pub display: CertDisplayFields,
}

/// Parse the outer wrapper and the TBS header fields, leaving the cursor
/// at the start of the extensions wrapper.
pub(crate) fn parse_tbs<Env: CertVerificationEnv>(
    env: &mut Env,
    cursor: &mut Asn1Cursor,
) -> KestrelResult<TbsInfo> {
    let outer = read_item(cursor, TAG_SEQUENCE)?;
    let outer_end = end_of(cursor, &outer)?;

    let signed_start = cursor.pos();
    let inner = read_item(cursor, TAG_SEQUENCE)?;
    let signed_len = inner.total_size() as usize;
    if signed_start + signed_len > outer_end {
        return Err(KestrelError::TBS_PARSE_ILLEGAL);
    }

    // Version: explicit context wrapper around a one-byte integer
    let version_wrap = read_item(cursor, TAG_CTX_VERSION)?;
    if version_wrap.len != 3 {
        return Err(KestrelError::TBS_PARSE_ILLEGAL);
    }
    let version = read_item(cursor, TAG_INTEGER)?;
    if version.len != 1 {
        return Err(KestrelError::TBS_PARSE_ILLEGAL);
    }
    if cursor.read_u8()? != CERT_VERSION {
        return Err(KestrelError::TBS_BAD_VERSION);
    }

    let mut display = CertDisplayFields::default();

    // Serial number, copied out endian-reversed for display
    let serial = read_item_bytes(cursor, TAG_INTEGER)?;
    if serial.is_empty() || serial.len() > SERIAL_MAX_BYTE_SIZE {
        return Err(KestrelError::TBS_PARSE_ILLEGAL);
    }
    for (i, byte) in serial.iter().rev().enumerate() {
        display.serial[i] = *byte;
    }
    display.serial_len = serial.len() as u8;

    // Signature algorithm identifier; the PSS parameter block is the
    // cryptographic binding of the signature scheme and is matched
    // byte-for-byte.
    read_sig_alg(
        cursor,
        KestrelError::TBS_UNSUPPORTED_SIG_ALG,
        KestrelError::TBS_BAD_PSS_PARAMS,
    )?;

    let issuer = parse_name(cursor)?;
    if issuer != CERT_ISSUER_NAME {
        return Err(KestrelError::TBS_ISSUER_MISMATCH);
    }
    copy_truncated(&mut display.issuer, &mut display.issuer_len, issuer);

    // Validity period; the policy decision is entirely external
    let validity = read_item(cursor, TAG_SEQUENCE)?;
    let validity_end = end_of(cursor, &validity)?;
    let not_before = read_time(cursor)?;
    let not_after = read_time(cursor)?;
    if cursor.pos() != validity_end {
        return Err(KestrelError::TBS_PARSE_ILLEGAL);
    }
    env.check_validity(&CertValidity {
        not_before: (!not_before.is_empty()).then_some(not_before),
        not_after: (!not_after.is_empty()).then_some(not_after),
    })?;
    copy_truncated(&mut display.not_before, &mut display.not_before_len, not_before);
    copy_truncated(&mut display.not_after, &mut display.not_after_len, not_after);

    // Subject; compared against a certificate-type-specific constant by
    // the caller, not here.
    let subject = parse_name(cursor)?;
    copy_truncated(&mut display.subject, &mut display.subject_len, subject);

    let modulus = parse_spki(cursor)?;

    Ok(TbsInfo {
        signed_start,
        signed_len,
        outer_end,
        modulus,
        display,
    })
}

/// Consume an algorithm identifier sequence that must carry the RSASSA-PSS
/// OID followed by the byte-exact PSS parameter block. Shared with the
/// signature extractor, which reports its own error codes.
pub(crate) fn read_sig_alg(
    cursor: &mut Asn1Cursor,
    oid_err: KestrelError,
    params_err: KestrelError,
) -> KestrelResult<()> {
    let alg = read_item(cursor, TAG_SEQUENCE)?;
    let alg_end = cursor
        .pos()
        .checked_add(alg.len as usize)
        .ok_or(params_err)?;

    let oid = read_item_bytes(cursor, TAG_OID)?;
    if oid != OID_RSASSA_PSS {
        return Err(oid_err);
    }

    if cursor.pos() > alg_end {
        return Err(params_err);
    }
    let params = cursor.read_bytes(alg_end - cursor.pos())?;
    if params != PSS_PARAMS {
        return Err(params_err);
    }
    Ok(())
}

/// Parse a Name of the fixed shape SEQUENCE→SET→SEQUENCE→OID(cn)→string
/// and return the string bytes.
fn parse_name<'a>(cursor: &mut Asn1Cursor<'a>) -> KestrelResult<&'a [u8]> {
    let name = read_item(cursor, TAG_SEQUENCE)?;
    let name_end = end_of(cursor, &name)?;

    read_item(cursor, TAG_SET)?;
    read_item(cursor, TAG_SEQUENCE)?;

    let oid = read_item_bytes(cursor, TAG_OID)?;
    if oid != OID_COMMON_NAME {
        return Err(KestrelError::TBS_PARSE_ILLEGAL);
    }

    let tag = cursor.peek_u8()?;
    if tag != TAG_PRINTABLE_STRING && tag != TAG_UTF8_STRING {
        return Err(KestrelError::TBS_PARSE_ILLEGAL);
    }
    let value = read_item_bytes(cursor, tag)?;

    if cursor.pos() != name_end {
        return Err(KestrelError::TBS_PARSE_ILLEGAL);
    }
    if value.is_empty() || value.len() > NAME_MAX_BYTE_SIZE {
        return Err(KestrelError::TBS_PARSE_ILLEGAL);
    }
    Ok(value)
}

/// A UTCTime string; an empty string means the bound is absent
fn read_time<'a>(cursor: &mut Asn1Cursor<'a>) -> KestrelResult<&'a [u8]> {
    let item = read_item(cursor, TAG_UTC_TIME)?;
    if item.len as usize > VALIDITY_MAX_BYTE_SIZE {
        return Err(KestrelError::TBS_PARSE_ILLEGAL);
    }
    cursor.read_bytes(item.len as usize)
}

/// SubjectPublicKeyInfo with the fixed rsaEncryption shape; returns the
/// modulus. A single leading zero pad byte on the modulus is tolerated.
fn parse_spki(cursor: &mut Asn1Cursor) -> KestrelResult<[u8; RSA_MOD_BYTE_SIZE]> {
    let spki = read_item(cursor, TAG_SEQUENCE)?;
    let spki_end = end_of(cursor, &spki)?;

    read_item(cursor, TAG_SEQUENCE)?;
    let oid = read_item_bytes(cursor, TAG_OID)?;
    if oid != OID_RSA_ENCRYPTION {
        return Err(KestrelError::TBS_BAD_PUBLIC_KEY);
    }
    let null = read_item(cursor, TAG_NULL)?;
    if null.len != 0 {
        return Err(KestrelError::TBS_BAD_PUBLIC_KEY);
    }

    read_item(cursor, TAG_BIT_STRING)?;
    // unused-bits prefix byte
    cursor.read_u8()?;

    read_item(cursor, TAG_SEQUENCE)?;

    let modulus_raw = read_item_bytes(cursor, TAG_INTEGER)?;
    let modulus_bytes = match modulus_raw.len() {
        RSA_MOD_BYTE_SIZE => modulus_raw,
        l if l == RSA_MOD_BYTE_SIZE + 1 && modulus_raw[0] == 0 => &modulus_raw[1..],
        _ => return Err(KestrelError::TBS_BAD_PUBLIC_KEY),
    };

    let exponent = read_item_bytes(cursor, TAG_INTEGER)?;
    if exponent != [0x01, 0x00, 0x01] {
        return Err(KestrelError::TBS_BAD_PUBLIC_KEY);
    }

    if cursor.pos() != spki_end {
        return Err(KestrelError::TBS_PARSE_ILLEGAL);
    }

    let mut modulus = [0u8; RSA_MOD_BYTE_SIZE];
    modulus.copy_from_slice(modulus_bytes);
    Ok(modulus)
}

fn end_of(cursor: &Asn1Cursor, item: &Asn1Item) -> KestrelResult<usize> {
    cursor
        .pos()
        .checked_add(item.len as usize)
        .ok_or(KestrelError::TBS_PARSE_ILLEGAL)
}

fn copy_truncated(dest: &mut [u8], dest_len: &mut u8, src: &[u8]) {
    let n = src.len().min(dest.len());
    dest[..n].copy_from_slice(&src[..n]);
    *dest_len = n as u8;
}
