//! Legacy format, version 001.
//!
//! ```text
//! SALT (64) | IV (16) | AUTH_TAG (16) | CIPHERTEXT
//! ```
//!
//! No version tag. The key comes from PBKDF2-HMAC-SHA512. Only read, never
//! written.

use super::FormatSpec;
use crate::crypto::Kdf;

pub const VERSION: &str = "001";

const SALT_LEN: usize = 64;
const PBKDF2_ITERATIONS: u32 = 10_000;

pub(super) const SPEC: FormatSpec = FormatSpec::new(
    VERSION,
    Kdf::Pbkdf2 {
        iterations: PBKDF2_ITERATIONS,
    },
    0,
    SALT_LEN,
);
