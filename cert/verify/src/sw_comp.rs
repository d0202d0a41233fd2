/*++

Licensed under the Apache-2.0 license.

File Name:

   sw_comp.rs

Abstract:

    Software component validator: walks a verified content certificate's
    image table, loads/decrypts/hashes each image per its load scheme,
    and compares the result against the signed digest. A mismatch aborts
    the remaining images immediately.

--*/

use crate::fields::ContentCertView;
use crate::{CertVerificationEnv, FlashAccess, MemAccess, Sha256Session};
use kestrel_cert_types::*;
use kestrel_error::{KestrelError, KestrelResult};
use zerocopy::FromBytes;

/// Validate every image the content certificate describes.
///
/// `trailer` holds the non-signed records read from storage right after
/// the certificate; they are trusted only because the certificate that
/// bounds them already verified. `chunk` is the workspace slice used for
/// the read/decrypt/hash loop.
pub(crate) fn verify_components<Env, F, M>(
    env: &mut Env,
    flash: &mut F,
    mem: &mut M,
    view: &ContentCertView<'_>,
    trailer: &[u8],
    key_slot: KeySlot,
    chunk: &mut [u8],
) -> KestrelResult<u32>
where
    Env: CertVerificationEnv,
    F: FlashAccess,
    M: MemAccess,
{
    if chunk.is_empty() || chunk.len() % AES_BLOCK_BYTE_SIZE != 0 {
        return Err(KestrelError::INVALID_INPUT_PARAMETER);
    }

    let count = view.image_count as usize;
    if trailer.len() < count * SW_IMAGE_UNSIGNED_BYTE_SIZE {
        return Err(KestrelError::INVALID_INPUT_PARAMETER);
    }

    for index in 0..count {
        let signed = view.record(index)?;
        let unsigned_bytes =
            &trailer[index * SW_IMAGE_UNSIGNED_BYTE_SIZE..][..SW_IMAGE_UNSIGNED_BYTE_SIZE];
        let unsigned = SwImageUnsigned::read_from_bytes(unsigned_bytes)
            .map_err(|_| KestrelError::INVALID_INPUT_PARAMETER)?;

        process_image(env, flash, mem, &signed, &unsigned, &view.nonce, key_slot, chunk)?;
    }

    Ok(count as u32)
}

#[allow(clippy::too_many_arguments)]
fn process_image<Env, F, M>(
    env: &mut Env,
    flash: &mut F,
    mem: &mut M,
    signed: &SwImageSigned,
    unsigned: &SwImageUnsigned,
    nonce: &CertNonce,
    key_slot: KeySlot,
    chunk: &mut [u8],
) -> KestrelResult<()>
where
    Env: CertVerificationEnv,
    F: FlashAccess,
    M: MemAccess,
{
    let scheme = signed.load_scheme();
    let encryption = signed.encryption()?;
    let lifecycle = env.lifecycle();

    // Load without verification is a provisioning aid; outside the
    // non-secure lifecycle it would bypass the root of trust.
    if scheme == LoadScheme::LoadOnly && lifecycle != Lifecycle::NonSecure {
        return Err(KestrelError::SW_COMP_ILLEGAL_LIFECYCLE);
    }

    let aes_key = match encryption {
        ImageEncryption::None => None,
        ImageEncryption::IcvKey => {
            if !matches!(key_slot, KeySlot::Hbk0_128 | KeySlot::Hbk256) {
                return Err(KestrelError::SW_COMP_KEY_INDEX_MISMATCH);
            }
            Some(AesKeySelect::Icv)
        }
        ImageEncryption::OemKey => {
            if !matches!(key_slot, KeySlot::Hbk1_128 | KeySlot::Hbk256) {
                return Err(KestrelError::SW_COMP_KEY_INDEX_MISMATCH);
            }
            Some(AesKeySelect::Oem)
        }
    };

    if aes_key.is_some() {
        // Device keys are retired in RMA
        if lifecycle == Lifecycle::Rma {
            return Err(KestrelError::SW_COMP_ILLEGAL_LIFECYCLE);
        }
        // An image already resident in memory is plaintext
        if scheme == LoadScheme::VerifyInMemory {
            return Err(KestrelError::SW_COMP_ILLEGAL_SCHEME);
        }
    }

    let size = unsigned.staging_size;
    if size == 0 || size > signed.max_size {
        return Err(KestrelError::SW_COMP_SIZE_ILLEGAL);
    }

    let mut hasher = match scheme {
        LoadScheme::LoadOnly => None,
        _ => Some(env.sha256_start()?),
    };

    let iv = derive_iv(nonce, signed.load_addr);
    let writes = matches!(scheme, LoadScheme::LoadOnly | LoadScheme::LoadAndVerify);

    // End addresses may not wrap; both address fields are u32 lanes in a
    // 32-bit address space.
    signed
        .load_addr
        .checked_add(size)
        .ok_or(KestrelError::SW_COMP_SIZE_ILLEGAL)?;
    unsigned
        .storage_addr
        .checked_add(size)
        .ok_or(KestrelError::SW_COMP_SIZE_ILLEGAL)?;

    let mut offset: u32 = 0;
    while offset < size {
        let n = (size - offset).min(chunk.len() as u32) as usize;
        let buf = &mut chunk[..n];

        match scheme {
            LoadScheme::VerifyInMemory => mem.read(signed.load_addr + offset, buf)?,
            _ => flash.read(unsigned.storage_addr + offset, buf)?,
        }

        if let Some(key) = aes_key {
            let block_iv = ctr_add(&iv, offset / AES_BLOCK_BYTE_SIZE as u32);
            env.aes256_ctr(key, &block_iv, buf)?;
        }

        if let Some(hasher) = hasher.as_mut() {
            hasher.update(buf);
        }

        if writes {
            mem.write(signed.load_addr + offset, buf)?;
        }

        offset += n as u32;
    }

    if let Some(hasher) = hasher {
        if hasher.finish() != signed.digest {
            return Err(KestrelError::SW_COMP_DIGEST_MISMATCH);
        }
    }

    Ok(())
}

/// Canonical AES counter block for an image: nonce, a zero word, and the
/// big-endian load address. Host endianness plays no part.
pub(crate) fn derive_iv(nonce: &CertNonce, load_addr: u32) -> AesIv {
    let mut iv = [0u8; AES_IV_BYTE_SIZE];
    iv[..NONCE_BYTE_SIZE].copy_from_slice(nonce);
    iv[12..].copy_from_slice(&load_addr.to_be_bytes());
    iv
}

/// Advance the big-endian 128-bit counter by `blocks`
pub(crate) fn ctr_add(iv: &AesIv, blocks: u32) -> AesIv {
    let mut out = *iv;
    let mut carry = blocks as u64;
    for byte in out.iter_mut().rev() {
        if carry == 0 {
            break;
        }
        let sum = *byte as u64 + (carry & 0xFF);
        *byte = sum as u8;
        carry = (carry >> 8) + (sum >> 8);
    }
    out
}
