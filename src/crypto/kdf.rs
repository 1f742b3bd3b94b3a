use argon2::{Algorithm, Argon2, Block, Params, Version};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;
use thiserror::Error;
use zeroize::Zeroizing;

use super::KEY_LEN;

/// Key derivation function used by a file format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kdf {
    /// PBKDF2-HMAC-SHA512. Only ever used to read legacy files.
    Pbkdf2 { iterations: u32 },
    /// Argon2id, version 0x13, raw 32-byte output.
    Argon2id(Argon2Params),
}

#[derive(Debug, Error)]
pub enum KdfError {
    #[error("argon2id could not allocate {required_kib} KiB of working memory")]
    OutOfMemory { required_kib: u32 },

    #[error("invalid argon2 parameters: {0}")]
    InvalidParams(String),

    #[error("argon2 key derivation failed: {0}")]
    Derivation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    mem_cost_kib: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Argon2Params {
    /// Builds a parameter set without validating it.
    ///
    /// Validation happens in [`derive_key`], which lets the format registry
    /// declare its parameters as constants.
    pub const fn new(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            mem_cost_kib,
            time_cost,
            parallelism,
        }
    }

    pub fn mem_cost_kib(&self) -> u32 {
        self.mem_cost_kib
    }

    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn validate(&self) -> Result<(), KdfError> {
        if self.mem_cost_kib < 8 {
            return Err(KdfError::InvalidParams("memory cost too low".into()));
        }
        if self.time_cost < 1 {
            return Err(KdfError::InvalidParams("time cost must be >= 1".into()));
        }
        if self.parallelism < 1 {
            return Err(KdfError::InvalidParams("parallelism must be >= 1".into()));
        }
        if self.mem_cost_kib < 8 * self.parallelism {
            return Err(KdfError::InvalidParams(
                "memory cost must be at least 8 * parallelism".into(),
            ));
        }
        Ok(())
    }
}

/// Cost profile applied when deriving keys.
///
/// `Standard` uses the parameters recorded in the format registry. `Fast`
/// swaps Argon2id down to 64 KiB and a single lane so that test suites finish
/// in milliseconds. PBKDF2 is unaffected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KdfProfile {
    #[default]
    Standard,
    Fast,
}

impl KdfProfile {
    pub const FAST_ARGON2: Argon2Params = Argon2Params::new(64, 1, 1);

    pub fn argon2_params(self, registered: Argon2Params) -> Argon2Params {
        match self {
            KdfProfile::Standard => registered,
            KdfProfile::Fast => Self::FAST_ARGON2,
        }
    }
}

/// Derives the 32-byte file key from a password and salt.
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    kdf: &Kdf,
    profile: KdfProfile,
) -> Result<Zeroizing<[u8; KEY_LEN]>, KdfError> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);

    match kdf {
        Kdf::Pbkdf2 { iterations } => {
            pbkdf2_hmac::<Sha512>(password, salt, *iterations, &mut key[..]);
        }
        Kdf::Argon2id(params) => {
            derive_argon2id(password, salt, profile.argon2_params(*params), &mut key[..])?;
        }
    }

    Ok(key)
}

fn derive_argon2id(
    password: &[u8],
    salt: &[u8],
    kdf: Argon2Params,
    out: &mut [u8],
) -> Result<(), KdfError> {
    kdf.validate()?;

    let params = Params::new(
        kdf.mem_cost_kib,
        kdf.time_cost,
        kdf.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| KdfError::InvalidParams(e.to_string()))?;

    // Reserve the working memory up front so an allocation failure surfaces
    // as an error instead of aborting the process.
    let block_count = params.block_count();
    let mut blocks: Vec<Block> = Vec::new();
    blocks
        .try_reserve_exact(block_count)
        .map_err(|_| KdfError::OutOfMemory {
            required_kib: kdf.mem_cost_kib,
        })?;
    blocks.resize(block_count, Block::default());

    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into_with_memory(password, salt, out, blocks.as_mut_slice())
        .map_err(|e| KdfError::Derivation(e.to_string()))
}
