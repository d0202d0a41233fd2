/*++

Licensed under the Apache-2.0 license.

File Name:

   chain_tests.rs

Abstract:

    End-to-end tests of the certificate chain verifier against generated
    certificate chains, with software crypto standing in for the hardware
    primitives.

--*/

use aes::Aes256;
use cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use sha2::{Digest, Sha256};

use kestrel_cert_gen::{
    build_debug_package, CertGenerator, CertGeneratorCrypto, CertGeneratorHasher, CertHeaderConfig,
    ContentCertConfig, KeyCertConfig,
};
use kestrel_cert_types::*;
use kestrel_cert_verify::{
    split_debug_package, CertChainVerifier, CertVerificationEnv, FlashAccess, MemAccess,
    Sha256Session, WORKSPACE_MIN_WORD_SIZE,
};
use kestrel_error::{KestrelError, KestrelResult};

const TEST_ICV_KEY: [u8; 32] = [0x11; 32];
const TEST_OEM_KEY: [u8; 32] = [0x22; 32];

const KEY_MODULUS_1: [u8; RSA_MOD_BYTE_SIZE] = [0x9D; RSA_MOD_BYTE_SIZE];
const KEY_MODULUS_2: [u8; RSA_MOD_BYTE_SIZE] = [0xB1; RSA_MOD_BYTE_SIZE];
const CONTENT_MODULUS: [u8; RSA_MOD_BYTE_SIZE] = [0xC3; RSA_MOD_BYTE_SIZE];

const MEM_BASE: u32 = 0x1000_0000;
const MEM_SIZE: usize = 0x1_0000;

// ---------------------------------------------------------------------
// Generator-side crypto: sha2 plus a deterministic stand-in signature
// scheme of digest-then-filler, reversed by the wire extractor and
// checked by the test env below.

struct GenHasher(Sha256);

impl CertGeneratorHasher for GenHasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }
    fn finish(self) -> Digest256 {
        self.0.finalize().into()
    }
}

struct GenCrypto;

impl CertGeneratorCrypto for GenCrypto {
    type Sha256Hasher = GenHasher;

    fn sha256_start(&self) -> GenHasher {
        GenHasher(Sha256::new())
    }

    fn rsa_sign(
        &self,
        digest: &Digest256,
        _modulus: &[u8; RSA_MOD_BYTE_SIZE],
    ) -> anyhow::Result<[u8; RSA_SIG_BYTE_SIZE]> {
        let mut sig = [0x5Au8; RSA_SIG_BYTE_SIZE];
        sig[..SHA256_DIGEST_BYTE_SIZE].copy_from_slice(digest);
        Ok(sig)
    }
}

// ---------------------------------------------------------------------
// Verifier-side environment

struct EnvHasher(Sha256);

impl Sha256Session for EnvHasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }
    fn finish(self) -> Digest256 {
        self.0.finalize().into()
    }
}

struct TestEnv {
    lifecycle: Lifecycle,
    anchors: [Option<TrustAnchor>; 3],
    min_sw_version: u32,
    rsa_calls: usize,
    reject_validity: bool,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Secure,
            anchors: [None; 3],
            min_sw_version: 0,
            rsa_calls: 0,
            reject_validity: false,
        }
    }

    fn set_anchor(&mut self, slot: KeySlot, anchor: TrustAnchor) {
        self.anchors[u32::from(slot) as usize] = Some(anchor);
    }
}

impl CertVerificationEnv for TestEnv {
    type Hasher = EnvHasher;

    fn sha256_start(&mut self) -> KestrelResult<EnvHasher> {
        Ok(EnvHasher(Sha256::new()))
    }

    fn rsa_pss_verify(
        &mut self,
        digest: &Digest256,
        _key: &PublicKeyParams,
        sig: &CertSignature,
    ) -> KestrelResult<()> {
        self.rsa_calls += 1;
        let mut wire = sig.bytes;
        wire.reverse();
        let filler_ok = wire[SHA256_DIGEST_BYTE_SIZE..].iter().all(|b| *b == 0x5A);
        if &wire[..SHA256_DIGEST_BYTE_SIZE] == digest && filler_ok {
            Ok(())
        } else {
            Err(KestrelError::CHAIN_SIGNATURE_INVALID)
        }
    }

    fn aes256_ctr(&mut self, key: AesKeySelect, iv: &AesIv, data: &mut [u8]) -> KestrelResult<()> {
        let key_bytes = match key {
            AesKeySelect::Icv => &TEST_ICV_KEY,
            AesKeySelect::Oem => &TEST_OEM_KEY,
        };
        let mut cipher = Ctr128BE::<Aes256>::new(key_bytes.into(), iv.into());
        cipher.apply_keystream(data);
        Ok(())
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn trust_anchor(&mut self, slot: KeySlot) -> KestrelResult<TrustAnchor> {
        self.anchors[u32::from(slot) as usize].ok_or(KestrelError::STORAGE_READ_FAILED)
    }

    fn min_sw_version(&mut self) -> KestrelResult<u32> {
        Ok(self.min_sw_version)
    }

    fn set_min_sw_version(&mut self, version: u32) -> KestrelResult<()> {
        self.min_sw_version = version;
        Ok(())
    }

    fn check_validity(&mut self, _validity: &CertValidity) -> KestrelResult<()> {
        if self.reject_validity {
            Err(KestrelError::TBS_VALIDITY_EXPIRED)
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------
// Storage and memory models

struct TestFlash(Vec<u8>);

impl FlashAccess for TestFlash {
    fn read(&mut self, addr: u32, dest: &mut [u8]) -> KestrelResult<()> {
        let start = addr as usize;
        let src = self
            .0
            .get(start..start + dest.len())
            .ok_or(KestrelError::STORAGE_READ_FAILED)?;
        dest.copy_from_slice(src);
        Ok(())
    }
}

struct TestMem {
    base: u32,
    data: Vec<u8>,
}

impl TestMem {
    fn new() -> Self {
        Self {
            base: MEM_BASE,
            data: vec![0; MEM_SIZE],
        }
    }

    fn slice(&self, addr: u32, len: usize) -> &[u8] {
        let start = (addr - self.base) as usize;
        &self.data[start..start + len]
    }
}

impl MemAccess for TestMem {
    fn write(&mut self, addr: u32, data: &[u8]) -> KestrelResult<()> {
        let start = addr
            .checked_sub(self.base)
            .ok_or(KestrelError::INVALID_INPUT_PARAMETER)? as usize;
        let dest = self
            .data
            .get_mut(start..start + data.len())
            .ok_or(KestrelError::INVALID_INPUT_PARAMETER)?;
        dest.copy_from_slice(data);
        Ok(())
    }

    fn read(&mut self, addr: u32, dest: &mut [u8]) -> KestrelResult<()> {
        let start = addr
            .checked_sub(self.base)
            .ok_or(KestrelError::INVALID_INPUT_PARAMETER)? as usize;
        let src = self
            .data
            .get(start..start + dest.len())
            .ok_or(KestrelError::INVALID_INPUT_PARAMETER)?;
        dest.copy_from_slice(src);
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Chain construction helpers

fn sha256(data: &[u8]) -> Digest256 {
    Sha256::digest(data).into()
}

fn pub_key_digest(modulus: &[u8; RSA_MOD_BYTE_SIZE], np: &[u8; RSA_NP_BYTE_SIZE]) -> Digest256 {
    let mut hasher = Sha256::new();
    hasher.update(modulus);
    hasher.update(np);
    hasher.finalize().into()
}

fn header_config(
    modulus: [u8; RSA_MOD_BYTE_SIZE],
    key_slot: KeySlot,
    sw_version: u32,
) -> CertHeaderConfig {
    CertHeaderConfig {
        modulus,
        reduction_constant: [0x0A; RSA_NP_BYTE_SIZE],
        key_slot,
        sw_version,
        ..Default::default()
    }
}

fn ctr_encrypt(key: &[u8; 32], nonce: &CertNonce, load_addr: u32, data: &mut [u8]) {
    let mut iv = [0u8; AES_IV_BYTE_SIZE];
    iv[..NONCE_BYTE_SIZE].copy_from_slice(nonce);
    iv[12..].copy_from_slice(&load_addr.to_be_bytes());
    let mut cipher = Ctr128BE::<Aes256>::new(key.into(), (&iv).into());
    cipher.apply_keystream(data);
}

struct ChainFixture {
    flash: TestFlash,
    env: TestEnv,
    key_cert_addr: u32,
    content_cert_addr: u32,
}

/// One image of `image_bytes`, written to flash at `storage_addr`, to be
/// loaded to `load_addr`. Returns the flash image and certificate chain
/// baked into a single flash model.
fn build_chain(
    key_slot: KeySlot,
    key_sw_version: u32,
    image_bytes: &[u8],
    scheme: LoadScheme,
    encryption: ImageEncryption,
) -> ChainFixture {
    let generator = CertGenerator::new(GenCrypto);
    let nonce: CertNonce = [0xD0, 0xD1, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7];
    let load_addr = MEM_BASE + 0x100;
    let storage_addr = 0x4000u32;

    let signed = SwImageSigned {
        digest: sha256(image_bytes),
        load_addr,
        max_size: image_bytes.len() as u32,
        flags: 0,
    }
    .with_scheme(scheme, encryption);
    let unsigned = SwImageUnsigned {
        storage_addr,
        staging_size: image_bytes.len() as u32,
    };

    let content_config = ContentCertConfig {
        header: header_config(CONTENT_MODULUS, key_slot, key_sw_version),
        nonce,
        images: vec![(signed, unsigned)],
        ..Default::default()
    };
    let content = generator.generate_content_cert(&content_config).unwrap();

    let key_config = KeyCertConfig {
        header: header_config(KEY_MODULUS_1, key_slot, key_sw_version),
        next_pub_key_digest: pub_key_digest(&CONTENT_MODULUS, &[0x0A; RSA_NP_BYTE_SIZE]),
    };
    let key_cert = generator.generate_key_cert(&key_config).unwrap();

    let key_cert_addr = 0u32;
    let content_cert_addr = key_cert.len() as u32;

    let mut flash_bytes = key_cert;
    flash_bytes.extend_from_slice(&content.to_flash_bytes());
    flash_bytes.resize(storage_addr as usize, 0);

    let mut image_copy = image_bytes.to_vec();
    match encryption {
        ImageEncryption::None => {}
        ImageEncryption::IcvKey => ctr_encrypt(&TEST_ICV_KEY, &nonce, load_addr, &mut image_copy),
        ImageEncryption::OemKey => ctr_encrypt(&TEST_OEM_KEY, &nonce, load_addr, &mut image_copy),
    }
    flash_bytes.extend_from_slice(&image_copy);

    let mut env = TestEnv::new();
    env.set_anchor(
        key_slot,
        TrustAnchor {
            digest: pub_key_digest(&KEY_MODULUS_1, &[0x0A; RSA_NP_BYTE_SIZE]),
            byte_len: key_slot.digest_byte_len(),
        },
    );

    ChainFixture {
        flash: TestFlash(flash_bytes),
        env,
        key_cert_addr,
        content_cert_addr,
    }
}

// ---------------------------------------------------------------------

#[test]
fn test_two_cert_chain_load_and_verify() {
    let image = vec![0xE7u8; 0x321];
    let mut fixture = build_chain(
        KeySlot::Hbk256,
        5,
        &image,
        LoadScheme::LoadAndVerify,
        ImageEncryption::None,
    );
    fixture.env.min_sw_version = 3;
    let mut mem = TestMem::new();
    let mut workspace = vec![0u32; WORKSPACE_MIN_WORD_SIZE];
    let mut verifier = CertChainVerifier::new(fixture.env, &mut workspace).unwrap();

    let info = verifier
        .verify_next(&mut fixture.flash, &mut mem, fixture.key_cert_addr)
        .unwrap();
    assert_eq!(info.cert_type, Some(CertType::Key));
    assert_eq!(info.sw_version, 5);
    assert_eq!(info.display.subject_bytes(), KEY_CERT_SUBJECT_NAME);
    assert!(!verifier.is_done());

    let info = verifier
        .verify_next(&mut fixture.flash, &mut mem, fixture.content_cert_addr)
        .unwrap();
    assert_eq!(info.cert_type, Some(CertType::Content));
    assert_eq!(info.images_verified, 1);
    assert!(verifier.is_done());

    // Image landed in memory intact
    assert_eq!(mem.slice(MEM_BASE + 0x100, image.len()), &image[..]);

    // Anti-rollback commit is explicit
    verifier.commit_min_sw_version().unwrap();
    assert_eq!(verifier.env_mut().min_sw_version, 5);
}

#[test]
fn test_truncated_anchor_slot() {
    let image = vec![0x41u8; 256];
    let mut fixture = build_chain(
        KeySlot::Hbk1_128,
        0,
        &image,
        LoadScheme::VerifyInFlash,
        ImageEncryption::None,
    );
    let mut mem = TestMem::new();
    let mut workspace = vec![0u32; WORKSPACE_MIN_WORD_SIZE];
    let mut verifier = CertChainVerifier::new(fixture.env, &mut workspace).unwrap();

    verifier
        .verify_next(&mut fixture.flash, &mut mem, fixture.key_cert_addr)
        .unwrap();
    verifier
        .verify_next(&mut fixture.flash, &mut mem, fixture.content_cert_addr)
        .unwrap();
    assert!(verifier.is_done());

    // VerifyInFlash must not touch memory
    assert_eq!(mem.slice(MEM_BASE + 0x100, image.len()), &[0u8; 256][..]);
}

#[test]
fn test_pub_key_hash_mismatch() {
    let image = vec![0x41u8; 64];
    let mut fixture = build_chain(
        KeySlot::Hbk256,
        0,
        &image,
        LoadScheme::LoadAndVerify,
        ImageEncryption::None,
    );
    fixture
        .env
        .set_anchor(KeySlot::Hbk256, TrustAnchor { digest: [0xEE; 32], byte_len: 32 });
    let mut mem = TestMem::new();
    let mut workspace = vec![0u32; WORKSPACE_MIN_WORD_SIZE];
    let mut verifier = CertChainVerifier::new(fixture.env, &mut workspace).unwrap();

    assert_eq!(
        verifier
            .verify_next(&mut fixture.flash, &mut mem, fixture.key_cert_addr)
            .err(),
        Some(KestrelError::CHAIN_PUB_KEY_HASH_MISMATCH)
    );
    assert!(!verifier.is_done());
}

#[test]
fn test_tampered_signed_region() {
    let image = vec![0x41u8; 64];
    let mut fixture = build_chain(
        KeySlot::Hbk256,
        0,
        &image,
        LoadScheme::LoadAndVerify,
        ImageEncryption::None,
    );

    // Flip the key certificate's serial number value byte; the parse
    // still succeeds but the signed digest changes.
    fixture.flash.0[15] ^= 0x01;

    let mut mem = TestMem::new();
    let mut workspace = vec![0u32; WORKSPACE_MIN_WORD_SIZE];
    let mut verifier = CertChainVerifier::new(fixture.env, &mut workspace).unwrap();

    let err = verifier
        .verify_next(&mut fixture.flash, &mut mem, fixture.key_cert_addr)
        .unwrap_err();
    assert_eq!(err, KestrelError::CHAIN_SIGNATURE_INVALID);
}

#[test]
fn test_content_cert_first_rejected() {
    let image = vec![0x41u8; 64];
    let mut fixture = build_chain(
        KeySlot::Hbk256,
        0,
        &image,
        LoadScheme::LoadAndVerify,
        ImageEncryption::None,
    );
    let mut mem = TestMem::new();
    let mut workspace = vec![0u32; WORKSPACE_MIN_WORD_SIZE];
    let mut verifier = CertChainVerifier::new(fixture.env, &mut workspace).unwrap();

    assert_eq!(
        verifier
            .verify_next(&mut fixture.flash, &mut mem, fixture.content_cert_addr)
            .err(),
        Some(KestrelError::CHAIN_UNEXPECTED_CERT_TYPE)
    );
}

#[test]
fn test_sw_version_too_old() {
    let image = vec![0x41u8; 64];
    let mut fixture = build_chain(
        KeySlot::Hbk256,
        2,
        &image,
        LoadScheme::LoadAndVerify,
        ImageEncryption::None,
    );
    fixture.env.min_sw_version = 3;
    let mut mem = TestMem::new();
    let mut workspace = vec![0u32; WORKSPACE_MIN_WORD_SIZE];
    let mut verifier = CertChainVerifier::new(fixture.env, &mut workspace).unwrap();

    assert_eq!(
        verifier
            .verify_next(&mut fixture.flash, &mut mem, fixture.key_cert_addr)
            .err(),
        Some(KestrelError::CHAIN_SW_VERSION_TOO_OLD)
    );
}

#[test]
fn test_session_consumed_after_done() {
    let image = vec![0x41u8; 64];
    let mut fixture = build_chain(
        KeySlot::Hbk256,
        0,
        &image,
        LoadScheme::LoadAndVerify,
        ImageEncryption::None,
    );
    let mut mem = TestMem::new();
    let mut workspace = vec![0u32; WORKSPACE_MIN_WORD_SIZE];
    let mut verifier = CertChainVerifier::new(fixture.env, &mut workspace).unwrap();

    verifier
        .verify_next(&mut fixture.flash, &mut mem, fixture.key_cert_addr)
        .unwrap();
    verifier
        .verify_next(&mut fixture.flash, &mut mem, fixture.content_cert_addr)
        .unwrap();
    assert_eq!(
        verifier
            .verify_next(&mut fixture.flash, &mut mem, fixture.content_cert_addr)
            .err(),
        Some(KestrelError::CHAIN_SESSION_CONSUMED)
    );
}

#[test]
fn test_body_count_mismatch_rejected_before_signature() {
    let generator = CertGenerator::new(GenCrypto);
    let signed = SwImageSigned {
        digest: [0; 32],
        load_addr: MEM_BASE,
        max_size: 64,
        flags: 0,
    };
    let unsigned = SwImageUnsigned {
        storage_addr: 0x4000,
        staging_size: 64,
    };
    let content_config = ContentCertConfig {
        header: header_config(CONTENT_MODULUS, KeySlot::Hbk256, 0),
        images: vec![(signed, unsigned)],
        image_count_override: Some(2),
        ..Default::default()
    };
    let content = generator.generate_content_cert(&content_config).unwrap();

    let key_config = KeyCertConfig {
        header: header_config(KEY_MODULUS_1, KeySlot::Hbk256, 0),
        next_pub_key_digest: pub_key_digest(&CONTENT_MODULUS, &[0x0A; RSA_NP_BYTE_SIZE]),
    };
    let key_cert = generator.generate_key_cert(&key_config).unwrap();

    let content_addr = key_cert.len() as u32;
    let mut flash_bytes = key_cert;
    flash_bytes.extend_from_slice(&content.to_flash_bytes());

    let mut env = TestEnv::new();
    env.set_anchor(
        KeySlot::Hbk256,
        TrustAnchor {
            digest: pub_key_digest(&KEY_MODULUS_1, &[0x0A; RSA_NP_BYTE_SIZE]),
            byte_len: 32,
        },
    );

    let mut flash = TestFlash(flash_bytes);
    let mut mem = TestMem::new();
    let mut workspace = vec![0u32; WORKSPACE_MIN_WORD_SIZE];
    let mut verifier = CertChainVerifier::new(env, &mut workspace).unwrap();

    verifier.verify_next(&mut flash, &mut mem, 0).unwrap();
    assert_eq!(
        verifier.verify_next(&mut flash, &mut mem, content_addr).err(),
        Some(KestrelError::EXT_PAYLOAD_SIZE_MISMATCH)
    );
    // The malformed certificate never reached the signature primitive
    assert_eq!(verifier.env_mut().rsa_calls, 1);
}

#[test]
fn test_encrypted_image_roundtrip() {
    let image: Vec<u8> = (0..0x500u32).map(|i| i as u8).collect();
    let mut fixture = build_chain(
        KeySlot::Hbk256,
        0,
        &image,
        LoadScheme::LoadAndVerify,
        ImageEncryption::OemKey,
    );
    let mut mem = TestMem::new();
    let mut workspace = vec![0u32; WORKSPACE_MIN_WORD_SIZE];
    let mut verifier = CertChainVerifier::new(fixture.env, &mut workspace).unwrap();

    verifier
        .verify_next(&mut fixture.flash, &mut mem, fixture.key_cert_addr)
        .unwrap();
    let info = verifier
        .verify_next(&mut fixture.flash, &mut mem, fixture.content_cert_addr)
        .unwrap();
    assert_eq!(info.images_verified, 1);

    // Plaintext, not ciphertext, landed in memory
    assert_eq!(mem.slice(MEM_BASE + 0x100, image.len()), &image[..]);
}

#[test]
fn test_encrypted_image_in_rma_rejected() {
    let image = vec![0x41u8; 64];
    let mut fixture = build_chain(
        KeySlot::Hbk256,
        0,
        &image,
        LoadScheme::LoadAndVerify,
        ImageEncryption::OemKey,
    );
    fixture.env.lifecycle = Lifecycle::Rma;
    let mut mem = TestMem::new();
    let mut workspace = vec![0u32; WORKSPACE_MIN_WORD_SIZE];
    let mut verifier = CertChainVerifier::new(fixture.env, &mut workspace).unwrap();

    verifier
        .verify_next(&mut fixture.flash, &mut mem, fixture.key_cert_addr)
        .unwrap();
    assert_eq!(
        verifier
            .verify_next(&mut fixture.flash, &mut mem, fixture.content_cert_addr)
            .err(),
        Some(KestrelError::SW_COMP_ILLEGAL_LIFECYCLE)
    );
}

#[test]
fn test_verify_in_memory_reads_resident_image() {
    let image: Vec<u8> = (0..0x200u32).map(|i| (i * 3) as u8).collect();
    let mut fixture = build_chain(
        KeySlot::Hbk256,
        0,
        &image,
        LoadScheme::VerifyInMemory,
        ImageEncryption::None,
    );
    // Only the resident copy is authentic; the flash staging area holds garbage.
    let staging = 0x4000usize;
    for b in &mut fixture.flash.0[staging..staging + image.len()] {
        *b = 0xFF;
    }
    let mut mem = TestMem::new();
    mem.write(MEM_BASE + 0x100, &image).unwrap();
    let mut workspace = vec![0u32; WORKSPACE_MIN_WORD_SIZE];
    let mut verifier = CertChainVerifier::new(fixture.env, &mut workspace).unwrap();

    verifier
        .verify_next(&mut fixture.flash, &mut mem, fixture.key_cert_addr)
        .unwrap();
    let info = verifier
        .verify_next(&mut fixture.flash, &mut mem, fixture.content_cert_addr)
        .unwrap();
    assert_eq!(info.images_verified, 1);
    assert!(verifier.is_done());
    assert_eq!(mem.slice(MEM_BASE + 0x100, image.len()), &image[..]);
}

#[test]
fn test_encrypted_verify_in_memory_rejected() {
    let image = vec![0x41u8; 64];
    let mut fixture = build_chain(
        KeySlot::Hbk256,
        0,
        &image,
        LoadScheme::VerifyInMemory,
        ImageEncryption::OemKey,
    );
    let mut mem = TestMem::new();
    let mut workspace = vec![0u32; WORKSPACE_MIN_WORD_SIZE];
    let mut verifier = CertChainVerifier::new(fixture.env, &mut workspace).unwrap();

    verifier
        .verify_next(&mut fixture.flash, &mut mem, fixture.key_cert_addr)
        .unwrap();
    assert_eq!(
        verifier
            .verify_next(&mut fixture.flash, &mut mem, fixture.content_cert_addr)
            .err(),
        Some(KestrelError::SW_COMP_ILLEGAL_SCHEME)
    );
}

#[test]
fn test_staging_size_bounds_rejected() {
    let image = vec![0x77u8; 64];
    for staging_size in [0u32, 128] {
        let generator = CertGenerator::new(GenCrypto);
        let signed = SwImageSigned {
            digest: sha256(&image),
            load_addr: MEM_BASE,
            max_size: image.len() as u32,
            flags: 0,
        }
        .with_scheme(LoadScheme::VerifyInFlash, ImageEncryption::None);
        let unsigned = SwImageUnsigned {
            storage_addr: 0x4000,
            staging_size,
        };
        let content_config = ContentCertConfig {
            header: header_config(CONTENT_MODULUS, KeySlot::Hbk256, 0),
            images: vec![(signed, unsigned)],
            ..Default::default()
        };
        let content = generator.generate_content_cert(&content_config).unwrap();

        let key_config = KeyCertConfig {
            header: header_config(KEY_MODULUS_1, KeySlot::Hbk256, 0),
            next_pub_key_digest: pub_key_digest(&CONTENT_MODULUS, &[0x0A; RSA_NP_BYTE_SIZE]),
        };
        let key_cert = generator.generate_key_cert(&key_config).unwrap();

        let content_addr = key_cert.len() as u32;
        let mut flash_bytes = key_cert;
        flash_bytes.extend_from_slice(&content.to_flash_bytes());
        flash_bytes.resize(0x4000, 0);
        flash_bytes.extend_from_slice(&image);

        let mut env = TestEnv::new();
        env.set_anchor(
            KeySlot::Hbk256,
            TrustAnchor {
                digest: pub_key_digest(&KEY_MODULUS_1, &[0x0A; RSA_NP_BYTE_SIZE]),
                byte_len: 32,
            },
        );

        let mut flash = TestFlash(flash_bytes);
        let mut mem = TestMem::new();
        let mut workspace = vec![0u32; WORKSPACE_MIN_WORD_SIZE];
        let mut verifier = CertChainVerifier::new(env, &mut workspace).unwrap();

        verifier.verify_next(&mut flash, &mut mem, 0).unwrap();
        assert_eq!(
            verifier.verify_next(&mut flash, &mut mem, content_addr).err(),
            Some(KestrelError::SW_COMP_SIZE_ILLEGAL)
        );
    }
}

#[test]
fn test_encrypted_key_index_mismatch() {
    let image = vec![0x41u8; 64];
    let mut fixture = build_chain(
        KeySlot::Hbk0_128,
        0,
        &image,
        LoadScheme::LoadAndVerify,
        ImageEncryption::OemKey,
    );
    let mut mem = TestMem::new();
    let mut workspace = vec![0u32; WORKSPACE_MIN_WORD_SIZE];
    let mut verifier = CertChainVerifier::new(fixture.env, &mut workspace).unwrap();

    verifier
        .verify_next(&mut fixture.flash, &mut mem, fixture.key_cert_addr)
        .unwrap();
    assert_eq!(
        verifier
            .verify_next(&mut fixture.flash, &mut mem, fixture.content_cert_addr)
            .err(),
        Some(KestrelError::SW_COMP_KEY_INDEX_MISMATCH)
    );
}

#[test]
fn test_load_only_outside_nonsecure_rejected() {
    let image = vec![0x41u8; 64];
    let mut fixture = build_chain(
        KeySlot::Hbk256,
        0,
        &image,
        LoadScheme::LoadOnly,
        ImageEncryption::None,
    );
    let mut mem = TestMem::new();
    let mut workspace = vec![0u32; WORKSPACE_MIN_WORD_SIZE];
    let mut verifier = CertChainVerifier::new(fixture.env, &mut workspace).unwrap();

    verifier
        .verify_next(&mut fixture.flash, &mut mem, fixture.key_cert_addr)
        .unwrap();
    assert_eq!(
        verifier
            .verify_next(&mut fixture.flash, &mut mem, fixture.content_cert_addr)
            .err(),
        Some(KestrelError::SW_COMP_ILLEGAL_LIFECYCLE)
    );
}

#[test]
fn test_load_only_in_nonsecure_skips_hash() {
    let image = vec![0x41u8; 64];
    let mut fixture = build_chain(
        KeySlot::Hbk256,
        0,
        &image,
        LoadScheme::LoadOnly,
        ImageEncryption::None,
    );
    fixture.env.lifecycle = Lifecycle::NonSecure;
    // Corrupt the flash image; LoadOnly must still succeed
    let len = fixture.flash.0.len();
    fixture.flash.0[len - 1] ^= 0xFF;

    let mut mem = TestMem::new();
    let mut workspace = vec![0u32; WORKSPACE_MIN_WORD_SIZE];
    let mut verifier = CertChainVerifier::new(fixture.env, &mut workspace).unwrap();

    verifier
        .verify_next(&mut fixture.flash, &mut mem, fixture.key_cert_addr)
        .unwrap();
    verifier
        .verify_next(&mut fixture.flash, &mut mem, fixture.content_cert_addr)
        .unwrap();
    assert!(verifier.is_done());
}

#[test]
fn test_corrupted_image_digest_mismatch() {
    let image = vec![0x41u8; 64];
    let mut fixture = build_chain(
        KeySlot::Hbk256,
        0,
        &image,
        LoadScheme::LoadAndVerify,
        ImageEncryption::None,
    );
    let len = fixture.flash.0.len();
    fixture.flash.0[len - 1] ^= 0xFF;

    let mut mem = TestMem::new();
    let mut workspace = vec![0u32; WORKSPACE_MIN_WORD_SIZE];
    let mut verifier = CertChainVerifier::new(fixture.env, &mut workspace).unwrap();

    verifier
        .verify_next(&mut fixture.flash, &mut mem, fixture.key_cert_addr)
        .unwrap();
    assert_eq!(
        verifier
            .verify_next(&mut fixture.flash, &mut mem, fixture.content_cert_addr)
            .err(),
        Some(KestrelError::SW_COMP_DIGEST_MISMATCH)
    );
}

#[test]
fn test_expired_validity_rejected() {
    let image = vec![0x41u8; 64];
    let mut fixture = build_chain(
        KeySlot::Hbk256,
        0,
        &image,
        LoadScheme::LoadAndVerify,
        ImageEncryption::None,
    );
    fixture.env.reject_validity = true;
    let mut mem = TestMem::new();
    let mut workspace = vec![0u32; WORKSPACE_MIN_WORD_SIZE];
    let mut verifier = CertChainVerifier::new(fixture.env, &mut workspace).unwrap();

    assert_eq!(
        verifier
            .verify_next(&mut fixture.flash, &mut mem, fixture.key_cert_addr)
            .err(),
        Some(KestrelError::TBS_VALIDITY_EXPIRED)
    );
}

#[test]
fn test_debug_package_split_round_trip() {
    let generator = CertGenerator::new(GenCrypto);
    let key1 = generator
        .generate_key_cert(&KeyCertConfig {
            header: header_config(KEY_MODULUS_1, KeySlot::Hbk256, 0),
            next_pub_key_digest: pub_key_digest(&KEY_MODULUS_2, &[0x0A; RSA_NP_BYTE_SIZE]),
        })
        .unwrap();
    let key2 = generator
        .generate_key_cert(&KeyCertConfig {
            header: header_config(KEY_MODULUS_2, KeySlot::Hbk256, 0),
            next_pub_key_digest: [0; 32],
        })
        .unwrap();

    let pkg = build_debug_package(&[&key1, &key2]);
    let split = split_debug_package(&pkg).unwrap();
    assert_eq!(split.count(), 2);

    // Each entry is the exact DER extent, excluding the package's word padding.
    let der_len = |cert: &[u8]| 4 + (((cert[2] as usize) << 8) | cert[3] as usize);
    assert_eq!(split.cert(0).unwrap(), &key1[..der_len(&key1)]);
    assert_eq!(split.cert(1).unwrap(), &key2[..der_len(&key2)]);

    // Word-aligned extents cover the whole package.
    let aligned: usize = (0..split.count())
        .map(|i| (split.cert(i).unwrap().len() + 3) & !3)
        .sum();
    assert_eq!(aligned, pkg.len());
}
