//! Current format, version 002.
//!
//! ```text
//! "DEADBOLT_V002" (13) | SALT (16) | IV (16) | AUTH_TAG (16) | CIPHERTEXT
//! ```
//!
//! The key comes from Argon2id with the RFC 9106 FIRST parameters:
//! 2 GiB of memory, one pass, four lanes.

use super::{FormatSpec, VERSION_HEADER_LEN};
use crate::crypto::{Argon2Params, Kdf};

pub const VERSION: &str = "002";

const SALT_LEN: usize = 16;
const ARGON2_MEM_COST_KIB: u32 = 2 * 1024 * 1024;
const ARGON2_TIME_COST: u32 = 1;
const ARGON2_PARALLELISM: u32 = 4;

pub(super) const SPEC: FormatSpec = FormatSpec::new(
    VERSION,
    Kdf::Argon2id(Argon2Params::new(
        ARGON2_MEM_COST_KIB,
        ARGON2_TIME_COST,
        ARGON2_PARALLELISM,
    )),
    VERSION_HEADER_LEN,
    SALT_LEN,
);
