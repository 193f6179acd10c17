// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! At-rest encryption for provider API keys.
//!
//! New ciphertexts are AES-256-GCM under a key derived from the application
//! secret with scrypt. Ciphertexts written by the pre-GCM scheme carry a
//! marker prefix and are still decryptable; see [`vault::CipherFormat`].

pub mod crypto;
pub mod kdf;
pub mod legacy;
pub mod vault;

pub use vault::{CipherFormat, KeyVault};
