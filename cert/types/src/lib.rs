/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains data structures for the secure boot certificate chain.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

use kestrel_error::{KestrelError, KestrelResult};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
use zeroize::Zeroize;

pub mod der;

/// RSA-3072 modulus size
pub const RSA_MOD_BYTE_SIZE: usize = 384;
pub const RSA_MOD_WORD_SIZE: usize = RSA_MOD_BYTE_SIZE / 4;

/// Barrett reduction constant (Np) size
pub const RSA_NP_BYTE_SIZE: usize = 20;

/// The only supported public exponent
pub const RSA_EXPONENT: u32 = 65537;

/// RSA-3072 signature size
pub const RSA_SIG_BYTE_SIZE: usize = RSA_MOD_BYTE_SIZE;

pub const SHA256_DIGEST_BYTE_SIZE: usize = 32;

/// Size of the 128-bit truncated trust anchor digests (Hbk0/Hbk1)
pub const TRUNCATED_DIGEST_BYTE_SIZE: usize = 16;

/// Upper bound on any certificate and on any single ASN.1 item. Every
/// declared length is checked against this before further size arithmetic.
pub const MAX_CERT_BYTE_SIZE: usize = 0x1000;
pub const MAX_CERT_WORD_SIZE: usize = MAX_CERT_BYTE_SIZE / 4;

/// Words fetched by the loader's first read; covers the longest outer
/// SEQUENCE header the reader accepts (tag + 5 length bytes).
pub const CERT_PREFIX_READ_WORDS: usize = 2;

/// Per-type certificate buffer ceilings
pub const KEY_CERT_BUFFER_WORD_SIZE: usize = 512;
pub const CONTENT_CERT_BUFFER_WORD_SIZE: usize = MAX_CERT_WORD_SIZE;

/// Maximum software image records in a content certificate
pub const MAX_SW_IMAGES: usize = 16;

pub const NONCE_BYTE_SIZE: usize = 8;
pub const AES_IV_BYTE_SIZE: usize = 16;
pub const AES_BLOCK_BYTE_SIZE: usize = 16;

/// Proprietary header extension magic ("TBSK")
pub const CERT_PROP_HEADER_MAGIC: u32 = 0x4B53_4254;

pub const SERIAL_MAX_BYTE_SIZE: usize = 20;
pub const NAME_MAX_BYTE_SIZE: usize = 64;
pub const VALIDITY_MAX_BYTE_SIZE: usize = 16;

/// Fixed issuer common name all chain certificates must carry
pub const CERT_ISSUER_NAME: &[u8] = b"Kestrel Boot CA";

/// Fixed subject common names, checked per certificate type
pub const KEY_CERT_SUBJECT_NAME: &[u8] = b"KeyCert";
pub const CONTENT_CERT_SUBJECT_NAME: &[u8] = b"CntCert";

pub type Digest256 = [u8; SHA256_DIGEST_BYTE_SIZE];
pub type CertNonce = [u8; NONCE_BYTE_SIZE];
pub type AesIv = [u8; AES_IV_BYTE_SIZE];

/// Certificate type carried in the proprietary header
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CertType {
    Key,
    Content,
}

impl TryFrom<u32> for CertType {
    type Error = KestrelError;

    fn try_from(val: u32) -> KestrelResult<Self> {
        match val {
            1 => Ok(CertType::Key),
            2 => Ok(CertType::Content),
            _ => Err(KestrelError::FIELDS_BAD_CERT_TYPE),
        }
    }
}

impl From<CertType> for u32 {
    fn from(val: CertType) -> u32 {
        match val {
            CertType::Key => 1,
            CertType::Content => 2,
        }
    }
}

/// OTP trust anchor slot selected by the proprietary header
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeySlot {
    /// 128-bit ICV hash
    Hbk0_128,
    /// 128-bit OEM hash
    Hbk1_128,
    /// Full 256-bit hash
    Hbk256,
}

impl KeySlot {
    /// Number of trust anchor bytes compared for this slot
    pub fn digest_byte_len(&self) -> usize {
        match self {
            KeySlot::Hbk0_128 | KeySlot::Hbk1_128 => TRUNCATED_DIGEST_BYTE_SIZE,
            KeySlot::Hbk256 => SHA256_DIGEST_BYTE_SIZE,
        }
    }
}

impl TryFrom<u32> for KeySlot {
    type Error = KestrelError;

    fn try_from(val: u32) -> KestrelResult<Self> {
        match val {
            0 => Ok(KeySlot::Hbk0_128),
            1 => Ok(KeySlot::Hbk1_128),
            2 => Ok(KeySlot::Hbk256),
            _ => Err(KestrelError::FIELDS_BAD_CERT_TYPE),
        }
    }
}

impl From<KeySlot> for u32 {
    fn from(val: KeySlot) -> u32 {
        match val {
            KeySlot::Hbk0_128 => 0,
            KeySlot::Hbk1_128 => 1,
            KeySlot::Hbk256 => 2,
        }
    }
}

/// Device lifecycle state from OTP
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Lifecycle {
    NonSecure,
    Secure,
    Rma,
}

/// Key used to decrypt an encrypted software image
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AesKeySelect {
    Icv,
    Oem,
}

/// Per-image load scheme, bits 1:0 of `SwImageSigned::flags`
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoadScheme {
    LoadOnly,
    VerifyInFlash,
    VerifyInMemory,
    LoadAndVerify,
}

/// Per-image encryption selector, bits 3:2 of `SwImageSigned::flags`
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ImageEncryption {
    None,
    IcvKey,
    OemKey,
}

/// RSA public key in the representation the PSS verify primitive expects
#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Zeroize, Copy, Clone, Eq, PartialEq)]
pub struct PublicKeyParams {
    /// Big-endian modulus
    pub modulus: [u8; RSA_MOD_BYTE_SIZE],

    /// Barrett reduction constant
    pub reduction_constant: [u8; RSA_NP_BYTE_SIZE],
}

impl Default for PublicKeyParams {
    fn default() -> Self {
        Self {
            modulus: [0; RSA_MOD_BYTE_SIZE],
            reduction_constant: [0; RSA_NP_BYTE_SIZE],
        }
    }
}

impl core::fmt::Debug for PublicKeyParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PublicKeyParams").finish_non_exhaustive()
    }
}

/// Raw signature, byte-reversed from the wire into the little-endian
/// order the RSA-PSS verify primitive expects
#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Zeroize, Copy, Clone, Eq, PartialEq)]
pub struct CertSignature {
    pub bytes: [u8; RSA_SIG_BYTE_SIZE],
}

impl Default for CertSignature {
    fn default() -> Self {
        Self {
            bytes: [0; RSA_SIG_BYTE_SIZE],
        }
    }
}

impl core::fmt::Debug for CertSignature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CertSignature").finish_non_exhaustive()
    }
}

/// Proprietary header extension payload
#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct CertPropHeader {
    pub magic: u32,
    pub cert_type: u32,
    pub otp_version: u32,
    pub key_slot: u32,
    pub sw_version: u32,
    pub flags: u32,
}

pub const CERT_PROP_HEADER_BYTE_SIZE: usize = core::mem::size_of::<CertPropHeader>();

/// Signed software image record, lives inside the content certificate body
#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct SwImageSigned {
    /// SHA-256 digest of the plaintext image
    pub digest: Digest256,

    /// Destination address for loading schemes
    pub load_addr: u32,

    /// Upper bound on the image size; the non-signed staging size must
    /// not exceed it
    pub max_size: u32,

    /// Bits 1:0 load scheme, bits 3:2 encryption key, rest reserved-zero
    pub flags: u32,
}

pub const SW_IMAGE_SIGNED_BYTE_SIZE: usize = core::mem::size_of::<SwImageSigned>();

impl SwImageSigned {
    pub fn load_scheme(&self) -> LoadScheme {
        match self.flags & 0x3 {
            0 => LoadScheme::LoadOnly,
            1 => LoadScheme::VerifyInFlash,
            2 => LoadScheme::VerifyInMemory,
            _ => LoadScheme::LoadAndVerify,
        }
    }

    pub fn encryption(&self) -> KestrelResult<ImageEncryption> {
        match (self.flags >> 2) & 0x3 {
            0 => Ok(ImageEncryption::None),
            1 => Ok(ImageEncryption::IcvKey),
            2 => Ok(ImageEncryption::OemKey),
            _ => Err(KestrelError::SW_COMP_ILLEGAL_SCHEME),
        }
    }

    pub fn with_scheme(mut self, scheme: LoadScheme, enc: ImageEncryption) -> Self {
        let scheme = match scheme {
            LoadScheme::LoadOnly => 0,
            LoadScheme::VerifyInFlash => 1,
            LoadScheme::VerifyInMemory => 2,
            LoadScheme::LoadAndVerify => 3,
        };
        let enc = match enc {
            ImageEncryption::None => 0u32,
            ImageEncryption::IcvKey => 1,
            ImageEncryption::OemKey => 2,
        };
        self.flags = (self.flags & !0xF) | scheme | (enc << 2);
        self
    }
}

/// Non-signed software image record, trails the content certificate in
/// storage. Trusted only after the certificate itself verified.
#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct SwImageUnsigned {
    /// Source address in storage
    pub storage_addr: u32,

    /// Actual image size in storage
    pub staging_size: u32,
}

pub const SW_IMAGE_UNSIGNED_BYTE_SIZE: usize = core::mem::size_of::<SwImageUnsigned>();

/// Content certificate body prefix, ahead of the image records
#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct ContentBodyPrefix {
    pub nonce: CertNonce,
    pub image_count: u32,
}

pub const CONTENT_BODY_PREFIX_BYTE_SIZE: usize = core::mem::size_of::<ContentBodyPrefix>();

/// Human-readable header fields extracted during the TBS parse. All fields
/// are optional and truncated to their fixed capacity; they exist for boot
/// log consumers only and carry no trust.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CertDisplayFields {
    /// Serial number bytes, endian-reversed for display
    pub serial: [u8; SERIAL_MAX_BYTE_SIZE],
    pub serial_len: u8,

    pub issuer: [u8; NAME_MAX_BYTE_SIZE],
    pub issuer_len: u8,

    pub subject: [u8; NAME_MAX_BYTE_SIZE],
    pub subject_len: u8,

    pub not_before: [u8; VALIDITY_MAX_BYTE_SIZE],
    pub not_before_len: u8,

    pub not_after: [u8; VALIDITY_MAX_BYTE_SIZE],
    pub not_after_len: u8,
}

impl Default for CertDisplayFields {
    fn default() -> Self {
        Self {
            serial: [0; SERIAL_MAX_BYTE_SIZE],
            serial_len: 0,
            issuer: [0; NAME_MAX_BYTE_SIZE],
            issuer_len: 0,
            subject: [0; NAME_MAX_BYTE_SIZE],
            subject_len: 0,
            not_before: [0; VALIDITY_MAX_BYTE_SIZE],
            not_before_len: 0,
            not_after: [0; VALIDITY_MAX_BYTE_SIZE],
            not_after_len: 0,
        }
    }
}

impl CertDisplayFields {
    pub fn subject_bytes(&self) -> &[u8] {
        &self.subject[..self.subject_len as usize]
    }

    pub fn issuer_bytes(&self) -> &[u8] {
        &self.issuer[..self.issuer_len as usize]
    }
}

/// Validity period strings handed to the external validity collaborator
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct CertValidity<'a> {
    pub not_before: Option<&'a [u8]>,
    pub not_after: Option<&'a [u8]>,
}

/// Trust anchor digest read from OTP; `byte_len` is 16 for the 128-bit
/// slots and 32 for the full hash
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct TrustAnchor {
    pub digest: Digest256,
    pub byte_len: usize,
}
