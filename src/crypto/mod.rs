//! Cryptographic primitives for encrypted files.
//!
//! Provides password-based key derivation, AES-256-GCM with detached
//! authentication tags, and OS-backed randomness for salts and IVs.

pub mod aead;
pub mod kdf;

pub use aead::{AuthError, EncryptError, RandomError, decrypt, encrypt, generate_iv, generate_salt};
pub use kdf::{Argon2Params, Kdf, KdfError, KdfProfile, derive_key};

/// Length of the derived key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the initialization vector (16 bytes).
pub const IV_LEN: usize = 16;
/// Length of the GCM authentication tag (16 bytes).
pub const AUTH_TAG_LEN: usize = 16;
