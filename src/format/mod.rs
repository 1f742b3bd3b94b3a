//! On-disk format of deadbolt encrypted files.
//!
//! Holds the registry of supported versions and detects which one a file
//! uses. Version 001 files carry no version tag. Every later version starts
//! with the 13-byte ASCII tag `DEADBOLT_V###`.

use thiserror::Error;

use crate::crypto::{AUTH_TAG_LEN, IV_LEN, Kdf};

pub mod header;
mod v001;
mod v002;

pub use header::Header;

/// ASCII prefix of the version tag ("DEADBOLT_V").
pub const VERSION_HEADER_PREFIX: &[u8] = b"DEADBOLT_V";
/// Number of digits following the prefix.
pub const VERSION_DIGITS: usize = 3;
/// Length of the full version tag, e.g. "DEADBOLT_V002".
pub const VERSION_HEADER_LEN: usize = VERSION_HEADER_PREFIX.len() + VERSION_DIGITS;
/// Headerless legacy format.
pub const LEGACY_VERSION: &str = v001::VERSION;
/// Format used for every new encryption.
pub const CURRENT_VERSION: &str = v002::VERSION;

/// Registered versions, oldest first. The last entry is the current format.
static REGISTRY: [FormatSpec; 2] = [v001::SPEC, v002::SPEC];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("file is empty")]
    Empty,

    #[error("unsupported version V{0}")]
    UnsupportedVersion(String),

    #[error("file is {len} bytes, smaller than the {required}-byte V{version} header")]
    MissingMetadata {
        version: &'static str,
        len: usize,
        required: usize,
    },

    #[error("invalid salt length for V{version}: expected {expected}, got {got}")]
    InvalidSaltLength {
        version: &'static str,
        expected: usize,
        got: usize,
    },
}

/// Layout and key derivation of one format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    version: &'static str,
    kdf: Kdf,
    salt_offset: usize,
    iv_offset: usize,
    auth_tag_offset: usize,
    metadata_length: usize,
}

impl FormatSpec {
    const fn new(version: &'static str, kdf: Kdf, tag_len: usize, salt_len: usize) -> Self {
        let salt_offset = tag_len;
        let iv_offset = salt_offset + salt_len;
        let auth_tag_offset = iv_offset + IV_LEN;

        Self {
            version,
            kdf,
            salt_offset,
            iv_offset,
            auth_tag_offset,
            metadata_length: auth_tag_offset + AUTH_TAG_LEN,
        }
    }

    /// Three-digit version identifier, e.g. "002".
    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn kdf(&self) -> &Kdf {
        &self.kdf
    }

    pub fn salt_offset(&self) -> usize {
        self.salt_offset
    }

    pub fn salt_len(&self) -> usize {
        self.iv_offset - self.salt_offset
    }

    pub fn iv_offset(&self) -> usize {
        self.iv_offset
    }

    pub fn auth_tag_offset(&self) -> usize {
        self.auth_tag_offset
    }

    /// Total header size; the ciphertext starts right after it.
    pub fn metadata_length(&self) -> usize {
        self.metadata_length
    }

    /// The version tag written at the start of the file, if this version has one.
    pub fn version_tag(&self) -> Option<Vec<u8>> {
        if self.salt_offset == 0 {
            return None;
        }

        let mut tag = Vec::with_capacity(VERSION_HEADER_LEN);
        tag.extend_from_slice(VERSION_HEADER_PREFIX);
        tag.extend_from_slice(self.version.as_bytes());
        Some(tag)
    }

    pub fn is_legacy(&self) -> bool {
        self.version == LEGACY_VERSION
    }
}

/// Looks up a version in the registry.
pub fn lookup(version: &str) -> Option<&'static FormatSpec> {
    REGISTRY.iter().find(|spec| spec.version == version)
}

/// The format every new encryption is written in.
pub fn current() -> &'static FormatSpec {
    &REGISTRY[REGISTRY.len() - 1]
}

/// All registered versions, oldest first.
pub fn supported_versions() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|spec| spec.version)
}

/// Detects the format of an encrypted file from its bytes.
///
/// A file that starts with `DEADBOLT_V` must name a registered version.
/// Anything else is treated as the headerless legacy format. In both cases
/// the file has to be at least as long as that version's header.
pub fn detect(data: &[u8]) -> Result<&'static FormatSpec, FormatError> {
    if data.is_empty() {
        return Err(FormatError::Empty);
    }

    let spec = match data.get(..VERSION_HEADER_LEN) {
        Some(tag) if tag.starts_with(VERSION_HEADER_PREFIX) => {
            let digits = &tag[VERSION_HEADER_PREFIX.len()..];
            std::str::from_utf8(digits)
                .ok()
                .filter(|v| v.bytes().all(|b| b.is_ascii_digit()))
                .and_then(lookup)
                .ok_or_else(|| {
                    FormatError::UnsupportedVersion(String::from_utf8_lossy(digits).into_owned())
                })?
        }
        _ => &REGISTRY[0],
    };

    if data.len() < spec.metadata_length {
        return Err(FormatError::MissingMetadata {
            version: spec.version,
            len: data.len(),
            required: spec.metadata_length,
        });
    }

    Ok(spec)
}
