/*++

Licensed under the Apache-2.0 license.

File Name:

   fields.rs

Abstract:

    Certificate field assembler: drives the TBS parser, the extension
    parser and the signature extractor over a freshly loaded certificate
    buffer and produces the parsed certificate record. Produced only on
    full success; no partially-valid record can escape.

--*/

use crate::asn1::Asn1Cursor;
use crate::ext::parse_extensions;
use crate::sig::extract_signature;
use crate::tbs::parse_tbs;
use crate::CertVerificationEnv;
use kestrel_cert_types::*;
use kestrel_error::{KestrelError, KestrelResult};
use zerocopy::FromBytes;

/// A fully parsed and structurally validated certificate. Borrows the raw
/// certificate buffer; must never outlive it and is discarded once the
/// chain advances.
#[derive(Debug)]
pub struct ParsedCertificate<'a> {
    pub cert_type: CertType,

    /// The exact byte range covered by the signature
    pub signed_region: &'a [u8],

    pub pub_key: PublicKeyParams,

    pub signature: CertSignature,

    pub prop_header: CertPropHeader,

    pub key_slot: KeySlot,

    pub display: CertDisplayFields,

    pub body: CertBody<'a>,
}

/// Certificate-type-specific body
#[derive(Debug)]
pub enum CertBody<'a> {
    /// SHA-256 of the next certificate's (modulus ‖ Np)
    Key(Digest256),

    Content(ContentCertView<'a>),
}

/// Zero-copy view of a content certificate's image table
#[derive(Debug)]
pub struct ContentCertView<'a> {
    pub nonce: CertNonce,
    pub image_count: u32,
    records: &'a [u8],
}

impl ContentCertView<'_> {
    /// The i-th signed image record
    pub fn record(&self, index: usize) -> KestrelResult<SwImageSigned> {
        let offset = index
            .checked_mul(SW_IMAGE_SIGNED_BYTE_SIZE)
            .ok_or(KestrelError::INVALID_INPUT_PARAMETER)?;
        let bytes = self
            .records
            .get(offset..offset + SW_IMAGE_SIGNED_BYTE_SIZE)
            .ok_or(KestrelError::INVALID_INPUT_PARAMETER)?;
        SwImageSigned::read_from_bytes(bytes).map_err(|_| KestrelError::INVALID_INPUT_PARAMETER)
    }
}

/// Parse a loaded certificate buffer into a `ParsedCertificate`.
///
/// Runs the TBS parser, the extension parser and the signature extractor
/// in sequence, short-circuiting on the first failure, then cross-checks
/// the extension-derived sizes against the TBS-derived signed region.
pub fn parse_certificate<'a, Env: CertVerificationEnv>(
    env: &mut Env,
    cert: &'a [u8],
) -> KestrelResult<ParsedCertificate<'a>> {
    if cert.is_empty() {
        return Err(KestrelError::INVALID_INPUT_PARAMETER);
    }

    let mut cursor = Asn1Cursor::new(cert);

    let tbs = parse_tbs(env, &mut cursor)?;
    let exts = parse_extensions(&mut cursor)?;

    // The extensions close the TBS sequence; the cursor must land exactly
    // on the signed-region boundary.
    let signed_end = tbs.signed_start + tbs.signed_len;
    if cursor.pos() != signed_end {
        return Err(KestrelError::FIELDS_EXTENSIONS_OUTSIDE_SIGNED_REGION);
    }

    if exts.prop_header.magic != CERT_PROP_HEADER_MAGIC {
        return Err(KestrelError::FIELDS_BAD_MAGIC);
    }
    let cert_type = CertType::try_from(exts.prop_header.cert_type)?;
    let key_slot = KeySlot::try_from(exts.prop_header.key_slot)?;

    // A certificate cannot claim a body larger than its own signed
    // envelope. Structurally implied by the parse above; kept as an
    // independent check.
    if exts.body.len() > tbs.signed_len {
        return Err(KestrelError::FIELDS_BODY_EXCEEDS_SIGNED_REGION);
    }

    let signature = extract_signature(&mut cursor)?;
    if cursor.pos() != tbs.outer_end {
        return Err(KestrelError::TBS_PARSE_ILLEGAL);
    }

    let signed_region = cert
        .get(tbs.signed_start..signed_end)
        .ok_or(KestrelError::TBS_PARSE_ILLEGAL)?;

    let body = match cert_type {
        CertType::Key => {
            let mut digest: Digest256 = [0; SHA256_DIGEST_BYTE_SIZE];
            digest.copy_from_slice(exts.body);
            CertBody::Key(digest)
        }
        CertType::Content => {
            let prefix =
                ContentBodyPrefix::read_from_bytes(&exts.body[..CONTENT_BODY_PREFIX_BYTE_SIZE])
                    .map_err(|_| KestrelError::EXT_PARSE_ILLEGAL)?;
            CertBody::Content(ContentCertView {
                nonce: prefix.nonce,
                image_count: prefix.image_count,
                records: &exts.body[CONTENT_BODY_PREFIX_BYTE_SIZE..],
            })
        }
    };

    Ok(ParsedCertificate {
        cert_type,
        signed_region,
        pub_key: PublicKeyParams {
            modulus: tbs.modulus,
            reduction_constant: exts.reduction_constant,
        },
        signature,
        prop_header: exts.prop_header,
        key_slot,
        display: tbs.display,
        body,
    })
}

impl ParsedCertificate<'_> {
    /// Subject name constant this certificate must carry
    pub fn expected_subject(&self) -> &'static [u8] {
        match self.cert_type {
            CertType::Key => KEY_CERT_SUBJECT_NAME,
            CertType::Content => CONTENT_CERT_SUBJECT_NAME,
        }
    }
}
