/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains API and macros used by the library for error handling

--*/
#![cfg_attr(not(feature = "std"), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// Kestrel Error Type
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct KestrelError(pub NonZeroU32);

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: KestrelError = KestrelError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl KestrelError {
    /// Create a kestrel error; intended to only be used from const contexts, as we don't want
    /// runtime panics if val is zero. The preferred way to get a KestrelError from a u32 is to
    /// use `KestrelError::try_from()` from the `TryFrom` trait impl.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("KestrelError cannot be 0"),
        }
    }

    // Error code layout: the upper 16 bits select the component, the lower 16
    // bits the condition. Components: 0x0001 caller input / workspace, 0x0002
    // ASN.1 reader, 0x0003 certificate loader & storage, 0x0004 TBS parser,
    // 0x0005 extension parser, 0x0006 signature extractor, 0x0007 field
    // assembler, 0x0008 chain verifier, 0x0009 SW-component validator,
    // 0x000A debug-package splitter.
    define_error_constants![
        (
            INVALID_INPUT_PARAMETER,
            0x00010001,
            "Caller misuse: null-sized buffer, bad argument"
        ),
        (
            WORKSPACE_TOO_SMALL,
            0x00010002,
            "Caller workspace cannot hold the requested stage"
        ),
        (
            ASN1_TAG_MISMATCH,
            0x00020001,
            "ASN.1 reader: tag does not match the expected tag"
        ),
        (
            ASN1_MALFORMED_LENGTH,
            0x00020002,
            "ASN.1 reader: long-form length with a byte count of 0 or more than 4"
        ),
        (
            ASN1_OVERSIZED_ITEM,
            0x00020003,
            "ASN.1 reader: declared length exceeds the maximum certificate size"
        ),
        (
            ASN1_OUT_OF_BOUNDS,
            0x00020004,
            "ASN.1 reader: cursor advance past the window end or wraparound"
        ),
        (
            LOADER_SIZE_OVERFLOW,
            0x00030001,
            "Certificate loader: declared size arithmetic overflowed"
        ),
        (
            LOADER_BUFFER_TOO_SMALL,
            0x00030002,
            "Certificate loader: certificate larger than the provided buffer"
        ),
        (
            STORAGE_READ_FAILED,
            0x00030003,
            "Storage read callback reported a failure"
        ),
        (
            TBS_PARSE_ILLEGAL,
            0x00040001,
            "TBS parser: structural violation in the to-be-signed region"
        ),
        (
            TBS_BAD_VERSION,
            0x00040002,
            "TBS parser: certificate version is not the supported version"
        ),
        (
            TBS_UNSUPPORTED_SIG_ALG,
            0x00040003,
            "TBS parser: signature algorithm OID mismatch"
        ),
        (
            TBS_BAD_PSS_PARAMS,
            0x00040004,
            "TBS parser: RSASSA-PSS parameter block mismatch"
        ),
        (
            TBS_ISSUER_MISMATCH,
            0x00040005,
            "TBS parser: issuer name does not match the fixed issuer"
        ),
        (
            TBS_VALIDITY_EXPIRED,
            0x00040006,
            "TBS parser: validity period collaborator rejected the certificate"
        ),
        (
            TBS_BAD_PUBLIC_KEY,
            0x00040007,
            "TBS parser: RSA public key malformed or exponent not 65537"
        ),
        (
            EXT_PARSE_ILLEGAL,
            0x00050001,
            "Extension parser: structural violation in the extensions wrapper"
        ),
        (
            EXT_UNKNOWN_EXTENSION,
            0x00050002,
            "Extension parser: unrecognized proprietary extension id"
        ),
        (
            EXT_PAYLOAD_SIZE_MISMATCH,
            0x00050003,
            "Extension parser: payload size does not match the expected structure"
        ),
        (
            EXT_TOO_MANY_IMAGES,
            0x00050004,
            "Extension parser: content certificate image count out of range"
        ),
        (
            SIG_BAD_ALGORITHM,
            0x00060001,
            "Signature extractor: trailing signature algorithm mismatch"
        ),
        (
            SIG_BAD_BIT_STRING,
            0x00060002,
            "Signature extractor: BIT STRING payload is not modulus size + 1"
        ),
        (
            FIELDS_BAD_MAGIC,
            0x00070001,
            "Field assembler: proprietary header magic mismatch"
        ),
        (
            FIELDS_BAD_CERT_TYPE,
            0x00070002,
            "Field assembler: certificate type is neither key nor content"
        ),
        (
            FIELDS_BODY_EXCEEDS_SIGNED_REGION,
            0x00070003,
            "Field assembler: certificate body larger than its signed envelope"
        ),
        (
            FIELDS_EXTENSIONS_OUTSIDE_SIGNED_REGION,
            0x00070004,
            "Field assembler: extension payload escapes the signed region"
        ),
        (
            CHAIN_PUB_KEY_HASH_MISMATCH,
            0x00080001,
            "Chain verifier: public key hash does not match the trust anchor"
        ),
        (
            CHAIN_SIGNATURE_INVALID,
            0x00080002,
            "Chain verifier: RSA-PSS signature verification failed"
        ),
        (
            CHAIN_UNEXPECTED_CERT_TYPE,
            0x00080003,
            "Chain verifier: certificate type not allowed in the current stage"
        ),
        (
            CHAIN_SW_VERSION_TOO_OLD,
            0x00080004,
            "Chain verifier: carried software version below the OTP minimum"
        ),
        (
            CHAIN_SESSION_CONSUMED,
            0x00080005,
            "Chain verifier: session already reached the terminal stage"
        ),
        (
            CHAIN_SUBJECT_MISMATCH,
            0x00080006,
            "Chain verifier: subject name does not match the certificate type"
        ),
        (
            CHAIN_SESSION_NOT_DONE,
            0x00080007,
            "Chain verifier: operation requires a completed chain"
        ),
        (
            SW_COMP_ILLEGAL_LIFECYCLE,
            0x00090001,
            "SW component: load scheme or encryption not permitted in this lifecycle state"
        ),
        (
            SW_COMP_KEY_INDEX_MISMATCH,
            0x00090002,
            "SW component: encryption key does not match the chain key slot"
        ),
        (
            SW_COMP_ILLEGAL_SCHEME,
            0x00090003,
            "SW component: load scheme and encryption combination not supported"
        ),
        (
            SW_COMP_SIZE_ILLEGAL,
            0x00090004,
            "SW component: staging size is zero or exceeds the signed maximum"
        ),
        (
            SW_COMP_DIGEST_MISMATCH,
            0x00090005,
            "SW component: image digest does not match the signed digest"
        ),
        (
            PKG_SPLITTER_PARSE_ILLEGAL,
            0x000A0001,
            "Debug package splitter: malformed certificate boundary"
        ),
        (
            PKG_SPLITTER_BAD_CERT_COUNT,
            0x000A0002,
            "Debug package splitter: package holds neither 2 nor 3 certificates"
        ),
    ];
}

impl From<core::num::NonZeroU32> for crate::KestrelError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::KestrelError(val)
    }
}

impl From<KestrelError> for core::num::NonZeroU32 {
    fn from(val: KestrelError) -> Self {
        val.0
    }
}

impl From<KestrelError> for u32 {
    fn from(val: KestrelError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for KestrelError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(KestrelError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type KestrelResult<T> = Result<T, KestrelError>;
