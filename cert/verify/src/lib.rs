/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    Secure boot certificate chain verification library.

--*/
#![cfg_attr(not(feature = "std"), no_std)]

mod asn1;
mod chain;
mod ext;
mod fields;
mod loader;
mod sig;
mod split;
mod sw_comp;
mod tbs;

pub use asn1::{Asn1Cursor, Asn1Item};
pub use chain::{CertChainVerifier, VerifiedCertInfo};
pub use fields::{parse_certificate, CertBody, ContentCertView, ParsedCertificate};
pub use loader::load_certificate;
pub use split::{split_debug_package, DebugPackage};

use kestrel_cert_types::*;
use kestrel_error::KestrelResult;

/// Words of workspace the SW component validator uses per read/decrypt/hash
/// chunk. Must stay a multiple of the AES block size in bytes.
pub const SW_COMP_CHUNK_WORD_SIZE: usize = 256;

/// Words reserved for the content certificate's non-signed trailer
pub const TRAILER_MAX_WORD_SIZE: usize = MAX_SW_IMAGES * SW_IMAGE_UNSIGNED_BYTE_SIZE / 4;

/// Minimum caller workspace for a full chain verification session
pub const WORKSPACE_MIN_WORD_SIZE: usize =
    CONTENT_CERT_BUFFER_WORD_SIZE + TRAILER_MAX_WORD_SIZE + SW_COMP_CHUNK_WORD_SIZE;

/// External storage read collaborator ("flash read"). Copies `dest.len()`
/// bytes starting at `addr` into `dest`; any failure aborts the in-progress
/// load and is propagated verbatim.
pub trait FlashAccess {
    fn read(&mut self, addr: u32, dest: &mut [u8]) -> KestrelResult<()>;
}

/// Target memory collaborator used when loading software images
pub trait MemAccess {
    fn write(&mut self, addr: u32, data: &[u8]) -> KestrelResult<()>;
    fn read(&mut self, addr: u32, dest: &mut [u8]) -> KestrelResult<()>;
}

/// One in-flight SHA-256 computation
pub trait Sha256Session {
    fn update(&mut self, data: &[u8]);
    fn finish(self) -> Digest256;
}

/// Certificate Verification Environment
///
/// The crypto, OTP and validity-policy collaborators. All primitives are
/// opaque and assumed correct; the verifier only sequences them.
pub trait CertVerificationEnv {
    type Hasher: Sha256Session;

    /// Begin a SHA-256 computation
    fn sha256_start(&mut self) -> KestrelResult<Self::Hasher>;

    /// One-shot SHA-256 digest
    fn sha256_digest(&mut self, data: &[u8]) -> KestrelResult<Digest256> {
        let mut hasher = self.sha256_start()?;
        hasher.update(data);
        Ok(hasher.finish())
    }

    /// Perform RSA-3072 PSS verification. `sig` is little-endian as
    /// produced by the signature extractor.
    fn rsa_pss_verify(
        &mut self,
        digest: &Digest256,
        key: &PublicKeyParams,
        sig: &CertSignature,
    ) -> KestrelResult<()>;

    /// AES-256-CTR transform `data` in place with the selected device key
    fn aes256_ctr(&mut self, key: AesKeySelect, iv: &AesIv, data: &mut [u8]) -> KestrelResult<()>;

    /// Device lifecycle state from OTP
    fn lifecycle(&self) -> Lifecycle;

    /// Trust anchor public key hash for the given OTP slot
    fn trust_anchor(&mut self, slot: KeySlot) -> KestrelResult<TrustAnchor>;

    /// Minimum allowed software version counter from OTP
    fn min_sw_version(&mut self) -> KestrelResult<u32>;

    /// Advance the minimum software version counter in OTP
    fn set_min_sw_version(&mut self, version: u32) -> KestrelResult<()>;

    /// Validity period policy; the parser only extracts and forwards the
    /// time strings. Failure is fatal for the certificate.
    fn check_validity(&mut self, validity: &CertValidity) -> KestrelResult<()>;
}
