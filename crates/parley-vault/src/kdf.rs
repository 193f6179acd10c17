// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! scrypt key derivation from the application secret.
//!
//! The salt is fixed: the KDF input is the deployment's own secret, not a
//! user-chosen password, so per-derivation salts buy nothing and a fixed salt
//! keeps every process deriving the same vault key.

use parley_core::ParleyError;
use zeroize::Zeroizing;

const SALT: &[u8] = b"parley-key-vault";

const LOG_N: u8 = 15;
const R: u32 = 8;
const P: u32 = 1;

/// Derive the 32-byte vault key from the application secret.
///
/// The returned key is wrapped in [`Zeroizing`] for automatic memory zeroing
/// on drop.
pub fn derive_key(secret: &[u8]) -> Result<Zeroizing<[u8; 32]>, ParleyError> {
    let params = scrypt::Params::new(LOG_N, R, P, 32)
        .map_err(|e| ParleyError::Credential(format!("invalid scrypt parameters: {e}")))?;

    let mut output = Zeroizing::new([0u8; 32]);
    scrypt::scrypt(secret, SALT, &params, output.as_mut())
        .map_err(|e| ParleyError::Credential(format!("scrypt key derivation failed: {e}")))?;

    Ok(output)
}
