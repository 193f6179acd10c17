// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decryption for the pre-GCM ciphertext format.
//!
//! The old scheme was AES-256-CBC with a PKCS#7 pad and no authentication
//! tag, keyed by the SHA-256 of the application secret. Rows written under it
//! carry the `cbc:` marker and must stay readable; nothing writes this format
//! anymore.

use aes::Aes256;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};
use parley_core::ParleyError;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Marker prefix identifying legacy ciphertexts.
pub const MARKER: &str = "cbc:";

const IV_LEN: usize = 16;

/// Derive the legacy AES-256-CBC key: SHA-256 of the application secret.
pub fn derive_key(secret: &[u8]) -> Zeroizing<[u8; 32]> {
    let digest = Sha256::digest(secret);
    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&digest);
    key
}

/// Decrypt a legacy ciphertext. `ciphertext` is the full stored string,
/// marker included; layout after the marker is `base64(iv[16] || ct)`.
pub fn open(key: &[u8; 32], ciphertext: &str) -> Result<Vec<u8>, ParleyError> {
    let encoded = ciphertext
        .strip_prefix(MARKER)
        .ok_or_else(|| ParleyError::Credential("missing legacy ciphertext marker".to_string()))?;
    let raw = BASE64
        .decode(encoded)
        .map_err(|_| ParleyError::Credential("legacy ciphertext is not valid base64".to_string()))?;
    if raw.len() <= IV_LEN {
        return Err(ParleyError::Credential(
            "legacy ciphertext too short".to_string(),
        ));
    }
    let (iv, ct) = raw.split_at(IV_LEN);

    let decryptor = Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|_| ParleyError::Credential("legacy ciphertext has a bad IV".to_string()))?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(ct)
        .map_err(|_| ParleyError::Credential("legacy AES-256-CBC decryption failed".to_string()))
}
