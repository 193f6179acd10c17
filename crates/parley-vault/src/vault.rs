// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The key vault facade: string ciphertexts in, plaintext keys out.
//!
//! Wire format for new ciphertexts is `base64(iv[12] || tag[16] || ct)`.
//! Decrypt dispatches on [`CipherFormat`] so the legacy scheme is only ever
//! reachable through its explicit marker, never by accident.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use parley_core::ParleyError;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::{self, NONCE_LEN, TAG_LEN};
use crate::kdf;
use crate::legacy;

/// Which encryption scheme a stored ciphertext uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherFormat {
    /// AES-256-GCM, `base64(iv || tag || ct)`.
    Gcm,
    /// Pre-GCM AES-256-CBC, `cbc:` marker prefix. Read-only.
    LegacyCbc,
}

impl CipherFormat {
    /// Classify a stored ciphertext by its marker.
    pub fn detect(ciphertext: &str) -> Self {
        if ciphertext.starts_with(legacy::MARKER) {
            Self::LegacyCbc
        } else {
            Self::Gcm
        }
    }
}

/// Holds the derived vault keys for the lifetime of the process.
///
/// Debug output intentionally omits key material.
pub struct KeyVault {
    key: Zeroizing<[u8; 32]>,
    legacy_key: Zeroizing<[u8; 32]>,
}

impl std::fmt::Debug for KeyVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVault")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl KeyVault {
    /// Derive the vault keys from the application secret. scrypt makes this
    /// deliberately slow; call it once at startup, not per request.
    pub fn new(secret: &SecretString) -> Result<Self, ParleyError> {
        let secret_bytes = secret.expose_secret().as_bytes();
        let key = kdf::derive_key(secret_bytes)?;
        let legacy_key = legacy::derive_key(secret_bytes);
        debug!("vault keys derived");
        Ok(Self { key, legacy_key })
    }

    /// Encrypt an API key for storage. Always writes the GCM format.
    pub fn encrypt(&self, plaintext: &SecretString) -> Result<String, ParleyError> {
        let (ct_with_tag, nonce) = crypto::seal(&self.key, plaintext.expose_secret().as_bytes())?;

        // seal appends the tag; the wire layout wants iv || tag || ct.
        let split = ct_with_tag.len() - TAG_LEN;
        let (ct, tag) = ct_with_tag.split_at(split);

        let mut raw = Vec::with_capacity(NONCE_LEN + TAG_LEN + ct.len());
        raw.extend_from_slice(&nonce);
        raw.extend_from_slice(tag);
        raw.extend_from_slice(ct);
        Ok(BASE64.encode(raw))
    }

    /// Decrypt a stored ciphertext, legacy or current format.
    pub fn decrypt(&self, ciphertext: &str) -> Result<SecretString, ParleyError> {
        let plaintext = match CipherFormat::detect(ciphertext) {
            CipherFormat::Gcm => self.open_gcm(ciphertext)?,
            CipherFormat::LegacyCbc => legacy::open(&self.legacy_key, ciphertext)?,
        };
        let text = String::from_utf8(plaintext)
            .map_err(|_| ParleyError::Credential("decrypted key is not valid UTF-8".to_string()))?;
        Ok(SecretString::from(text))
    }

    fn open_gcm(&self, ciphertext: &str) -> Result<Vec<u8>, ParleyError> {
        let raw = BASE64
            .decode(ciphertext)
            .map_err(|_| ParleyError::Credential("ciphertext is not valid base64".to_string()))?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(ParleyError::Credential("ciphertext too short".to_string()));
        }
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&raw[..NONCE_LEN]);
        let tag = &raw[NONCE_LEN..NONCE_LEN + TAG_LEN];
        let ct = &raw[NONCE_LEN + TAG_LEN..];

        // Rebuild the ct || tag layout ring expects.
        let mut ct_with_tag = Vec::with_capacity(ct.len() + TAG_LEN);
        ct_with_tag.extend_from_slice(ct);
        ct_with_tag.extend_from_slice(tag);
        crypto::open(&self.key, &nonce, &ct_with_tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> KeyVault {
        KeyVault::new(&SecretString::from("test application secret")).unwrap()
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let vault = vault();
        let key = SecretString::from("sk-live-abc123");

        let ciphertext = vault.encrypt(&key).unwrap();
        assert_eq!(CipherFormat::detect(&ciphertext), CipherFormat::Gcm);

        let decrypted = vault.decrypt(&ciphertext).unwrap();
        assert_eq!(decrypted.expose_secret(), "sk-live-abc123");
    }

    #[test]
    fn ciphertext_never_contains_plaintext() {
        let vault = vault();
        let ciphertext = vault.encrypt(&SecretString::from("sk-visible")).unwrap();
        assert!(!ciphertext.contains("sk-visible"));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let vault = vault();
        let ciphertext = vault.encrypt(&SecretString::from("sk-live-abc123")).unwrap();

        let mut raw = BASE64.decode(&ciphertext).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = BASE64.encode(raw);

        assert!(matches!(
            vault.decrypt(&tampered),
            Err(ParleyError::Credential(_))
        ));
    }

    #[test]
    fn malformed_ciphertext_is_rejected() {
        let vault = vault();
        assert!(vault.decrypt("not base64 at all!").is_err());
        assert!(vault.decrypt("AAAA").is_err());
    }

    #[test]
    fn wrong_secret_cannot_decrypt() {
        let vault = vault();
        let ciphertext = vault.encrypt(&SecretString::from("sk-live-abc123")).unwrap();

        let other = KeyVault::new(&SecretString::from("another secret")).unwrap();
        assert!(other.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn legacy_marker_dispatches_to_cbc_path() {
        use cbc::cipher::block_padding::Pkcs7;
        use cbc::cipher::{BlockEncryptMut, KeyIvInit};

        let vault = vault();
        let legacy_key = legacy::derive_key(b"test application secret");

        let iv = [3u8; 16];
        let encryptor = cbc::Encryptor::<aes::Aes256>::new((&*legacy_key).into(), (&iv).into());
        let ct = encryptor.encrypt_padded_vec_mut::<Pkcs7>(b"sk-from-the-old-days");
        let mut raw = iv.to_vec();
        raw.extend_from_slice(&ct);
        let stored = format!("{}{}", legacy::MARKER, BASE64.encode(raw));

        assert_eq!(CipherFormat::detect(&stored), CipherFormat::LegacyCbc);
        let decrypted = vault.decrypt(&stored).unwrap();
        assert_eq!(decrypted.expose_secret(), "sk-from-the-old-days");
    }

    #[test]
    fn new_writes_are_never_legacy() {
        let vault = vault();
        let ciphertext = vault.encrypt(&SecretString::from("sk-live")).unwrap();
        assert!(!ciphertext.starts_with(legacy::MARKER));
    }
}
