/*++

Licensed under the Apache-2.0 license.

File Name:

   chain.rs

Abstract:

    Certificate chain verifier: a 3-stage state machine (key cert,
    key-or-content cert, content cert) that loads and assembles each
    certificate, checks its public key hash against the trust anchor,
    verifies the RSA-PSS signature over the signed region, and carries
    the verified public key hash forward as the next anchor.

--*/

use crate::fields::{parse_certificate, CertBody, ParsedCertificate};
use crate::loader::load_certificate;
use crate::sw_comp;
use crate::{
    CertVerificationEnv, FlashAccess, MemAccess, TRAILER_MAX_WORD_SIZE, WORKSPACE_MIN_WORD_SIZE,
};
use kestrel_cert_types::*;
use kestrel_error::{KestrelError, KestrelResult};
use zerocopy::IntoBytes;
use zeroize::Zeroize;

/// Chain position. A content certificate is always chain-terminal.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum ChainStage {
    ExpectKey,
    ExpectKeyOrContent,
    ExpectContent,
    Done,
}

/// Outcome of one successfully verified certificate
#[derive(Debug, Default, Copy, Clone)]
pub struct VerifiedCertInfo {
    pub cert_type: Option<CertType>,
    pub sw_version: u32,
    pub otp_version: u32,
    /// Image records validated; non-zero only for content certificates
    pub images_verified: u32,
    pub display: CertDisplayFields,
}

/// Certificate Chain Verifier
///
/// One instance is one verification session; it exclusively owns the
/// caller workspace for its whole lifetime. A failure at any step leaves
/// the stage unchanged and fails the whole boot attempt; there is no
/// retry-in-place.
pub struct CertChainVerifier<'w, Env: CertVerificationEnv> {
    env: Env,
    workspace: &'w mut [u32],
    stage: ChainStage,
    /// Trust anchor for the next certificate: None selects the OTP hash
    carried_hash: Option<Digest256>,
    key_slot: Option<KeySlot>,
    /// OTP minimum software version, snapshotted on first use
    min_sw_version: Option<u32>,
    chain_sw_version: u32,
}

impl<'w, Env: CertVerificationEnv> CertChainVerifier<'w, Env> {
    /// Create a new verification session over a caller-owned workspace
    pub fn new(env: Env, workspace: &'w mut [u32]) -> KestrelResult<Self> {
        if workspace.is_empty() {
            return Err(KestrelError::INVALID_INPUT_PARAMETER);
        }
        if workspace.len() < WORKSPACE_MIN_WORD_SIZE {
            return Err(KestrelError::WORKSPACE_TOO_SMALL);
        }
        Ok(Self {
            env,
            workspace,
            stage: ChainStage::ExpectKey,
            carried_hash: None,
            key_slot: None,
            min_sw_version: None,
            chain_sw_version: 0,
        })
    }

    pub fn is_done(&self) -> bool {
        self.stage == ChainStage::Done
    }

    pub fn env_mut(&mut self) -> &mut Env {
        &mut self.env
    }

    /// Load, parse and verify the certificate at `cert_addr`, advancing
    /// the chain stage on success.
    pub fn verify_next<F: FlashAccess, M: MemAccess>(
        &mut self,
        flash: &mut F,
        mem: &mut M,
        cert_addr: u32,
    ) -> KestrelResult<VerifiedCertInfo> {
        let ceiling = match self.stage {
            ChainStage::Done => return Err(KestrelError::CHAIN_SESSION_CONSUMED),
            ChainStage::ExpectKey => KEY_CERT_BUFFER_WORD_SIZE,
            _ => CONTENT_CERT_BUFFER_WORD_SIZE,
        };

        let (cert_buf, tail) = self.workspace.split_at_mut(ceiling);
        let env = &mut self.env;

        let words = load_certificate(flash, cert_addr, cert_buf)?;
        let cert_bytes = &cert_buf.as_bytes()[..words as usize * 4];
        let parsed = parse_certificate(env, cert_bytes)?;

        match (self.stage, parsed.cert_type) {
            (ChainStage::ExpectKey, CertType::Content) => {
                return Err(KestrelError::CHAIN_UNEXPECTED_CERT_TYPE)
            }
            (ChainStage::ExpectContent, CertType::Key) => {
                return Err(KestrelError::CHAIN_UNEXPECTED_CERT_TYPE)
            }
            _ => {}
        }

        if parsed.display.subject_bytes() != parsed.expected_subject() {
            return Err(KestrelError::CHAIN_SUBJECT_MISMATCH);
        }

        // The single most security-critical check in the system: the
        // certificate's public key must hash to the carried trust anchor.
        let key_digest = env.sha256_digest(parsed.pub_key.as_bytes())?;
        match self.carried_hash {
            None => {
                let anchor = env.trust_anchor(parsed.key_slot)?;
                let n = anchor.byte_len.min(SHA256_DIGEST_BYTE_SIZE);
                if n == 0 || key_digest[..n] != anchor.digest[..n] {
                    return Err(KestrelError::CHAIN_PUB_KEY_HASH_MISMATCH);
                }
            }
            Some(prev) => {
                if key_digest != prev {
                    return Err(KestrelError::CHAIN_PUB_KEY_HASH_MISMATCH);
                }
            }
        }

        let signed_digest = env.sha256_digest(parsed.signed_region)?;
        env.rsa_pss_verify(&signed_digest, &parsed.pub_key, &parsed.signature)
            .map_err(|_| KestrelError::CHAIN_SIGNATURE_INVALID)?;

        let session_slot = self.key_slot.unwrap_or(parsed.key_slot);

        let mut info = VerifiedCertInfo {
            cert_type: Some(parsed.cert_type),
            sw_version: parsed.prop_header.sw_version,
            otp_version: parsed.prop_header.otp_version,
            images_verified: 0,
            display: parsed.display,
        };

        let next_anchor = match &parsed.body {
            CertBody::Key(next_hash) => {
                let min = match self.min_sw_version {
                    Some(min) => min,
                    None => env.min_sw_version()?,
                };
                if parsed.prop_header.sw_version < min {
                    return Err(KestrelError::CHAIN_SW_VERSION_TOO_OLD);
                }
                self.min_sw_version = Some(min);
                Some(*next_hash)
            }
            CertBody::Content(view) => {
                let count = view.image_count as usize;
                let trailer_len = count * SW_IMAGE_UNSIGNED_BYTE_SIZE;
                let (trailer_buf, chunk_buf) = tail.split_at_mut(TRAILER_MAX_WORD_SIZE);

                // The non-signed records live directly after the
                // word-aligned certificate in storage.
                let trailer_addr = cert_addr
                    .checked_add(words * 4)
                    .ok_or(KestrelError::LOADER_SIZE_OVERFLOW)?;
                flash.read(trailer_addr, &mut trailer_buf.as_mut_bytes()[..trailer_len])?;

                let chunk_bytes = chunk_buf.as_mut_bytes();
                let usable = chunk_bytes.len() & !(AES_BLOCK_BYTE_SIZE - 1);
                info.images_verified = sw_comp::verify_components(
                    env,
                    flash,
                    mem,
                    view,
                    &trailer_buf.as_bytes()[..trailer_len],
                    session_slot,
                    &mut chunk_bytes[..usable],
                )?;
                None
            }
        };

        // Success: advance the state machine and carry the verified
        // anchor forward. Key material copies are wiped.
        let cert_type = parsed.cert_type;
        let key_slot = parsed.key_slot;
        let ParsedCertificate {
            mut pub_key,
            mut signature,
            ..
        } = parsed;
        pub_key.zeroize();
        signature.zeroize();

        match cert_type {
            CertType::Key => {
                self.carried_hash = next_anchor;
                self.key_slot.get_or_insert(key_slot);
                self.chain_sw_version = info.sw_version;
                self.stage = match self.stage {
                    ChainStage::ExpectKey => ChainStage::ExpectKeyOrContent,
                    _ => ChainStage::ExpectContent,
                };
            }
            CertType::Content => {
                self.stage = ChainStage::Done;
            }
        }

        Ok(info)
    }

    /// Advance the OTP minimum software version counter to the verified
    /// chain's version. Only legal once the chain completed.
    pub fn commit_min_sw_version(&mut self) -> KestrelResult<()> {
        if self.stage != ChainStage::Done {
            return Err(KestrelError::CHAIN_SESSION_NOT_DONE);
        }
        self.env.set_min_sw_version(self.chain_sw_version)
    }
}
