/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    Data structures and traits for the certificate generator.

--*/

mod der;
mod generator;

pub use der::{der_len, der_oid, der_tlv, der_uint};
pub use generator::{build_debug_package, CertGenerator, ContentCertBundle};

use kestrel_cert_types::*;

pub trait CertGeneratorHasher {
    fn update(&mut self, data: &[u8]);

    fn finish(self) -> Digest256;
}

/// Certificate Generator Crypto Trait
pub trait CertGeneratorCrypto {
    type Sha256Hasher: CertGeneratorHasher;

    fn sha256_start(&self) -> Self::Sha256Hasher;

    /// Calculate SHA-256 digest
    fn sha256_digest(&self, data: &[u8]) -> anyhow::Result<Digest256> {
        let mut hasher = self.sha256_start();
        hasher.update(data);
        Ok(hasher.finish())
    }

    /// Produce the big-endian RSA-PSS signature over `digest` for the
    /// key identified by `modulus`
    fn rsa_sign(
        &self,
        digest: &Digest256,
        modulus: &[u8; RSA_MOD_BYTE_SIZE],
    ) -> anyhow::Result<[u8; RSA_SIG_BYTE_SIZE]>;
}

/// Fields shared by both certificate kinds
#[derive(Clone)]
pub struct CertHeaderConfig {
    /// Big-endian serial number
    pub serial: Vec<u8>,

    /// UTCTime content bytes; empty emits a zero-length time
    pub not_before: Vec<u8>,
    pub not_after: Vec<u8>,

    pub otp_version: u32,
    pub key_slot: KeySlot,
    pub sw_version: u32,
    pub flags: u32,

    pub modulus: [u8; RSA_MOD_BYTE_SIZE],
    pub reduction_constant: [u8; RSA_NP_BYTE_SIZE],
}

impl Default for CertHeaderConfig {
    fn default() -> Self {
        Self {
            serial: vec![1],
            not_before: b"260101000000Z".to_vec(),
            not_after: b"360101000000Z".to_vec(),
            otp_version: 0,
            key_slot: KeySlot::Hbk256,
            sw_version: 0,
            flags: 0,
            modulus: [0; RSA_MOD_BYTE_SIZE],
            reduction_constant: [0; RSA_NP_BYTE_SIZE],
        }
    }
}

/// Key Certificate Generator Configuration
#[derive(Clone, Default)]
pub struct KeyCertConfig {
    pub header: CertHeaderConfig,

    /// SHA-256 of the next certificate's public key parameters
    pub next_pub_key_digest: Digest256,
}

/// Content Certificate Generator Configuration
#[derive(Clone, Default)]
pub struct ContentCertConfig {
    pub header: CertHeaderConfig,

    pub nonce: CertNonce,

    /// Signed record and matching non-signed record per image
    pub images: Vec<(SwImageSigned, SwImageUnsigned)>,

    /// Write a different image count into the body prefix; for negative
    /// testing only
    pub image_count_override: Option<u32>,
}
