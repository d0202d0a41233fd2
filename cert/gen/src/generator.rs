/*++

Licensed under the Apache-2.0 license.

File Name:

   generator.rs

Abstract:

    Certificate generator. Builds the fixed-profile DER certificates the
    boot-time verifier consumes: key certificates, content certificates
    with their non-signed image table, and concatenated debug packages.

--*/

use anyhow::bail;
use kestrel_cert_types::der::*;
use kestrel_cert_types::*;
use zerocopy::IntoBytes;

use crate::der::{der_oid, der_tlv, der_uint};
use crate::{CertGeneratorCrypto, CertHeaderConfig, ContentCertConfig, KeyCertConfig};

/// A generated content certificate and its non-signed trailer
pub struct ContentCertBundle {
    /// Word-aligned DER certificate
    pub cert: Vec<u8>,

    /// Non-signed image records, stored directly after the certificate
    pub trailer: Vec<u8>,
}

impl ContentCertBundle {
    /// The flash layout: certificate then trailer
    pub fn to_flash_bytes(&self) -> Vec<u8> {
        let mut out = self.cert.clone();
        out.extend_from_slice(&self.trailer);
        out
    }
}

/// Certificate generator
pub struct CertGenerator<Crypto: CertGeneratorCrypto> {
    crypto: Crypto,
}

impl<Crypto: CertGeneratorCrypto> CertGenerator<Crypto> {
    /// Create an instance of `CertGenerator`
    pub fn new(crypto: Crypto) -> Self {
        Self { crypto }
    }

    /// Generate a key certificate
    pub fn generate_key_cert(&self, config: &KeyCertConfig) -> anyhow::Result<Vec<u8>> {
        self.generate(
            &config.header,
            CertType::Key,
            KEY_CERT_SUBJECT_NAME,
            config.next_pub_key_digest.as_slice(),
        )
    }

    /// Generate a content certificate plus its non-signed trailer
    pub fn generate_content_cert(
        &self,
        config: &ContentCertConfig,
    ) -> anyhow::Result<ContentCertBundle> {
        if config.images.is_empty() || config.images.len() > MAX_SW_IMAGES {
            bail!("image count {} out of range", config.images.len());
        }

        let prefix = ContentBodyPrefix {
            nonce: config.nonce,
            image_count: config
                .image_count_override
                .unwrap_or(config.images.len() as u32),
        };

        let mut body = prefix.as_bytes().to_vec();
        for (signed, _) in &config.images {
            body.extend_from_slice(signed.as_bytes());
        }

        let cert = self.generate(&config.header, CertType::Content, CONTENT_CERT_SUBJECT_NAME, &body)?;

        let mut trailer = Vec::new();
        for (_, unsigned) in &config.images {
            trailer.extend_from_slice(unsigned.as_bytes());
        }

        Ok(ContentCertBundle { cert, trailer })
    }

    fn generate(
        &self,
        header: &CertHeaderConfig,
        cert_type: CertType,
        subject: &[u8],
        body: &[u8],
    ) -> anyhow::Result<Vec<u8>> {
        if header.serial.is_empty() || header.serial.len() > SERIAL_MAX_BYTE_SIZE {
            bail!("serial number must be 1..={SERIAL_MAX_BYTE_SIZE} bytes");
        }

        let prop_header = CertPropHeader {
            magic: CERT_PROP_HEADER_MAGIC,
            cert_type: cert_type.into(),
            otp_version: header.otp_version,
            key_slot: header.key_slot.into(),
            sw_version: header.sw_version,
            flags: header.flags,
        };

        let mut tbs_content = Vec::new();
        tbs_content.extend_from_slice(&[
            TAG_CTX_VERSION,
            3,
            TAG_INTEGER,
            1,
            CERT_VERSION,
        ]);
        tbs_content.extend_from_slice(&der_uint(&header.serial));
        tbs_content.extend_from_slice(&encode_sig_alg());
        tbs_content.extend_from_slice(&encode_name(CERT_ISSUER_NAME));
        tbs_content.extend_from_slice(&encode_validity(&header.not_before, &header.not_after));
        tbs_content.extend_from_slice(&encode_name(subject));
        tbs_content.extend_from_slice(&encode_spki(&header.modulus));

        let mut ext_list = Vec::new();
        ext_list.extend_from_slice(&encode_extension(PROP_EXT_ID_HEADER, prop_header.as_bytes()));
        ext_list.extend_from_slice(&encode_extension(
            PROP_EXT_ID_NP,
            &header.reduction_constant,
        ));
        ext_list.extend_from_slice(&encode_extension(PROP_EXT_ID_BODY, body));
        let ext_seq = der_tlv(TAG_SEQUENCE, &ext_list);
        tbs_content.extend_from_slice(&der_tlv(TAG_CTX_EXTENSIONS, &ext_seq));

        let tbs = der_tlv(TAG_SEQUENCE, &tbs_content);

        let digest = self.crypto.sha256_digest(&tbs)?;
        let signature = self.crypto.rsa_sign(&digest, &header.modulus)?;

        let mut sig_bits = Vec::with_capacity(RSA_SIG_BYTE_SIZE + 1);
        sig_bits.push(0);
        sig_bits.extend_from_slice(&signature);

        let mut outer_content = tbs;
        outer_content.extend_from_slice(&encode_sig_alg());
        outer_content.extend_from_slice(&der_tlv(TAG_BIT_STRING, &sig_bits));

        let mut cert = der_tlv(TAG_SEQUENCE, &outer_content);
        if cert.len() > MAX_CERT_BYTE_SIZE {
            bail!("certificate exceeds {MAX_CERT_BYTE_SIZE} bytes");
        }
        while cert.len() % 4 != 0 {
            cert.push(0);
        }
        Ok(cert)
    }
}

/// Concatenate word-aligned certificates into a debug package
pub fn build_debug_package(certs: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for cert in certs {
        out.extend_from_slice(cert);
        while out.len() % 4 != 0 {
            out.push(0);
        }
    }
    out
}

fn encode_sig_alg() -> Vec<u8> {
    let mut content = der_oid(OID_RSASSA_PSS);
    content.extend_from_slice(PSS_PARAMS);
    der_tlv(TAG_SEQUENCE, &content)
}

fn encode_name(cn: &[u8]) -> Vec<u8> {
    let mut atv = der_oid(OID_COMMON_NAME);
    atv.extend_from_slice(&der_tlv(TAG_PRINTABLE_STRING, cn));
    let atv_seq = der_tlv(TAG_SEQUENCE, &atv);
    let set = der_tlv(TAG_SET, &atv_seq);
    der_tlv(TAG_SEQUENCE, &set)
}

fn encode_validity(not_before: &[u8], not_after: &[u8]) -> Vec<u8> {
    let mut content = der_tlv(TAG_UTC_TIME, not_before);
    content.extend_from_slice(&der_tlv(TAG_UTC_TIME, not_after));
    der_tlv(TAG_SEQUENCE, &content)
}

fn encode_spki(modulus: &[u8; RSA_MOD_BYTE_SIZE]) -> Vec<u8> {
    let mut key_seq = der_uint(modulus);
    key_seq.extend_from_slice(&[TAG_INTEGER, 3, 0x01, 0x00, 0x01]);
    let key_seq = der_tlv(TAG_SEQUENCE, &key_seq);

    let mut bits = Vec::with_capacity(key_seq.len() + 1);
    bits.push(0);
    bits.extend_from_slice(&key_seq);

    let mut alg = der_oid(OID_RSA_ENCRYPTION);
    alg.extend_from_slice(&[TAG_NULL, 0]);
    let alg = der_tlv(TAG_SEQUENCE, &alg);

    let mut content = alg;
    content.extend_from_slice(&der_tlv(TAG_BIT_STRING, &bits));
    der_tlv(TAG_SEQUENCE, &content)
}

fn encode_extension(id: u8, payload: &[u8]) -> Vec<u8> {
    let mut oid_value = OID_PROP_EXT_PREFIX.to_vec();
    oid_value.push(id);

    let mut content = der_oid(&oid_value);
    content.extend_from_slice(&[TAG_BOOLEAN, 1, 0xFF]);
    content.extend_from_slice(&der_tlv(TAG_OCTET_STRING, payload));
    der_tlv(TAG_SEQUENCE, &content)
}
