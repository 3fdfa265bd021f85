//! Per-recipient sealed payloads.
//!
//! Private submissions (reviews, applicant PII) are encrypted to each
//! recipient's wallet public key before upload; the chain and the content
//! store only ever see ciphertext. Hybrid scheme: ephemeral secp256k1 ECDH,
//! SHA-256 key derivation, AES-256-GCM with a random 12-byte nonce.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use k256::ecdh::diffie_hellman;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use sha2::{Digest, Sha256};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use grantforge_types::{Address, ContentHash};

use crate::content_store::ContentStoreClient;
use crate::error::Error;

/// A recipient's secp256k1 wallet public key.
#[derive(Debug, Clone)]
pub struct RecipientKey(PublicKey);

impl RecipientKey {
    /// Parse from hex as members publish it: SEC1 compressed (33 bytes) or
    /// uncompressed (65 bytes), with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)
            .map_err(|e| Error::Validation(format!("invalid recipient key hex: {e}")))?;
        let key = PublicKey::from_sec1_bytes(&bytes)
            .map_err(|e| Error::Validation(format!("invalid recipient key: {e}")))?;
        Ok(Self(key))
    }

    pub fn from_public_key(key: PublicKey) -> Self {
        Self(key)
    }
}

/// Seal `plaintext` to one recipient.
///
/// Output framing: base64(ephemeral_pub(33) ‖ nonce(12) ‖ ciphertext).
pub fn seal(plaintext: &[u8], recipient: &RecipientKey) -> Result<String, Error> {
    let ephemeral = SecretKey::random(&mut rand::thread_rng());
    let shared = diffie_hellman(ephemeral.to_nonzero_scalar(), recipient.0.as_affine());
    let key: [u8; 32] = Sha256::digest(shared.raw_secret_bytes()).into();

    let boxed = encrypt_aes256gcm(&key, plaintext)?;

    let ephemeral_pub = ephemeral.public_key().to_encoded_point(true);
    let mut out = Vec::with_capacity(33 + boxed.len());
    out.extend_from_slice(ephemeral_pub.as_bytes());
    out.extend_from_slice(&boxed);
    Ok(B64.encode(out))
}

/// Inverse of [`seal`], given the recipient's secret key.
pub fn open(sealed: &str, secret: &SecretKey) -> Result<Vec<u8>, Error> {
    let bytes = B64
        .decode(sealed)
        .map_err(|e| Error::Unknown(format!("sealed payload base64 decode failed: {e}")))?;
    if bytes.len() < 33 + 12 {
        return Err(Error::Unknown("sealed payload too short".into()));
    }

    let (ephemeral_bytes, boxed) = bytes.split_at(33);
    let ephemeral_pub = PublicKey::from_sec1_bytes(ephemeral_bytes)
        .map_err(|e| Error::Unknown(format!("sealed payload ephemeral key invalid: {e}")))?;
    let shared = diffie_hellman(secret.to_nonzero_scalar(), ephemeral_pub.as_affine());
    let key: [u8; 32] = Sha256::digest(shared.raw_secret_bytes()).into();

    decrypt_aes256gcm(&key, boxed)
}

/// Seal `payload` to every recipient and upload each ciphertext concurrently.
///
/// The returned map is complete: it is produced only after every upload has
/// resolved. Any failure aborts the remaining uploads and fails the stage;
/// cancellation does the same.
pub async fn seal_for_recipients(
    store: &ContentStoreClient,
    payload: &[u8],
    recipients: &[(Address, RecipientKey)],
    cancel: &CancellationToken,
) -> Result<BTreeMap<Address, ContentHash>, Error> {
    let mut uploads = JoinSet::new();
    for (address, key) in recipients {
        let sealed = seal(payload, key)?;
        let store = store.clone();
        let address = address.clone();
        uploads.spawn(async move {
            let hash = store.upload(sealed.into_bytes()).await?;
            Ok::<(Address, ContentHash), Error>((address, hash))
        });
    }

    let mut out = BTreeMap::new();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                uploads.abort_all();
                return Err(Error::Cancelled);
            }
            joined = uploads.join_next() => {
                match joined {
                    None => break,
                    Some(Ok(Ok((address, hash)))) => {
                        out.insert(address, hash);
                    }
                    Some(Ok(Err(e))) => {
                        uploads.abort_all();
                        return Err(e);
                    }
                    Some(Err(e)) if e.is_cancelled() => {}
                    Some(Err(e)) => {
                        uploads.abort_all();
                        return Err(Error::Unknown(format!("upload task failed: {e}")));
                    }
                }
            }
        }
    }

    debug!(recipients = out.len(), "sealed payloads uploaded");
    Ok(out)
}

fn encrypt_aes256gcm(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
    use aes_gcm::aead::{Aead, KeyInit};
    use aes_gcm::{Aes256Gcm, Nonce};

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| Error::Unknown(format!("AES init failed: {e}")))?;

    let mut nonce_bytes = [0u8; 12];
    use rand::RngCore;
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| Error::Unknown(format!("encryption failed: {e}")))?;

    let mut result = Vec::with_capacity(12 + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

fn decrypt_aes256gcm(key: &[u8; 32], data: &[u8]) -> Result<Vec<u8>, Error> {
    use aes_gcm::aead::{Aead, KeyInit};
    use aes_gcm::{Aes256Gcm, Nonce};

    if data.len() < 12 {
        return Err(Error::Unknown("sealed payload missing nonce".into()));
    }

    let (nonce_bytes, ciphertext) = data.split_at(12);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| Error::Unknown(format!("AES init failed: {e}")))?;

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| Error::Unknown(format!("decryption failed (wrong key?): {e}")))
}
