/*++

Licensed under the Apache-2.0 license.

File Name:

   der.rs

Abstract:

    Fixed DER profile constants shared by the certificate verifier and the
    certificate generator: tags, object identifiers and the byte-exact
    RSASSA-PSS parameter block the chain is frozen against.

--*/

/// ASN.1 tags used by the fixed certificate profile
pub const TAG_BOOLEAN: u8 = 0x01;
pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_BIT_STRING: u8 = 0x03;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_NULL: u8 = 0x05;
pub const TAG_OID: u8 = 0x06;
pub const TAG_UTF8_STRING: u8 = 0x0C;
pub const TAG_PRINTABLE_STRING: u8 = 0x13;
pub const TAG_UTC_TIME: u8 = 0x17;
pub const TAG_SEQUENCE: u8 = 0x30;
pub const TAG_SET: u8 = 0x31;

/// Context tag of the explicit version wrapper
pub const TAG_CTX_VERSION: u8 = 0xA0;
/// Context tag of the explicit extensions wrapper
pub const TAG_CTX_EXTENSIONS: u8 = 0xA3;

/// The only supported certificate version integer (X.509 v3)
pub const CERT_VERSION: u8 = 2;

/// OID value bytes (contents of the OID item, without tag/length)
pub const OID_RSASSA_PSS: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x0A];
pub const OID_RSA_ENCRYPTION: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x01];
pub const OID_MGF1: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x08];
pub const OID_SHA256: &[u8] = &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01];
pub const OID_COMMON_NAME: &[u8] = &[0x55, 0x04, 0x03];

/// Proprietary extension OID value bytes minus the trailing id byte.
/// The id byte selects the extension (1 header, 2 Np tail, 3 body).
pub const OID_PROP_EXT_PREFIX: &[u8] = &[0x2B, 0x06, 0x01, 0x04, 0x01, 0x8C, 0x1F, 0x01];

pub const PROP_EXT_ID_HEADER: u8 = 1;
pub const PROP_EXT_ID_NP: u8 = 2;
pub const PROP_EXT_ID_BODY: u8 = 3;

/// RSASSA-PSS parameter SEQUENCE: SHA-256 hash, MGF1/SHA-256, salt length 32,
/// default trailer field. Matched byte-for-byte; this is the cryptographic
/// binding of the signature scheme.
#[rustfmt::skip]
pub const PSS_PARAMS: &[u8] = &[
    0x30, 0x34,
    // [0] hashAlgorithm: sha256 with absent-parameters NULL
    0xA0, 0x0F,
        0x30, 0x0D,
            0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01,
            0x05, 0x00,
    // [1] maskGenAlgorithm: mgf1 parameterized with sha256
    0xA1, 0x1C,
        0x30, 0x1A,
            0x06, 0x09, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x08,
            0x30, 0x0D,
                0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01,
                0x05, 0x00,
    // [2] saltLength: 32
    0xA2, 0x03,
        0x02, 0x01, 0x20,
];
