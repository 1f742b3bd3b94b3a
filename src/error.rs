use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::crypto::KdfError;
use crate::envelope::EnvelopeError;
use crate::format::{self, FormatError};
use crate::paths::pretty_path;

/// Phase of the pipeline an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Encryption,
    Decryption,
    VerificationOfEncryption,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Encryption => write!(f, "encryption"),
            Operation::Decryption => write!(f, "decryption"),
            Operation::VerificationOfEncryption => write!(f, "verification of encryption"),
        }
    }
}

/// Flat discriminant of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FileAccess,
    ArchiveFailure,
    InvalidFormat,
    UnsupportedVersion,
    MissingMetadata,
    AuthenticationFailure,
    KdfResourceExhaustion,
    VerificationMismatch,
    WriteFailure,
    InvalidPassword,
    Internal,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Failed to retrieve file contents of `{}` for {operation}.", pretty_path(.path))]
    FileAccess {
        path: PathBuf,
        operation: Operation,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create a zip archive of `{}`.", pretty_path(.path))]
    Archive {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },

    #[error(
        "`{}` is not an encrypted file.\nExpected file extension: .deadbolt or .dbolt",
        pretty_path(.path)
    )]
    InvalidFormat { path: PathBuf },

    #[error(
        "`{}` is detected as being V{version}, which is not a supported value. Valid values: {}.",
        pretty_path(.path),
        format::supported_versions().collect::<Vec<_>>().join(", ")
    )]
    UnsupportedVersion { path: PathBuf, version: String },

    #[error("`{}` is missing metadata.\nIt's likely corrupted.", pretty_path(.path))]
    MissingMetadata { path: PathBuf },

    #[error(
        "Failed to decrypt `{}`\nIs the password correct? The file may also be corrupted.",
        pretty_path(.path)
    )]
    Authentication { path: PathBuf },

    #[error(
        "`{}` could not be processed: Argon2id ran out of memory.\nDeadbolt requires ~{} MiB of free RAM. Close other applications and try again.",
        pretty_path(.path),
        .required_kib / 1024
    )]
    KdfOutOfMemory { path: PathBuf, required_kib: u32 },

    #[error("Key derivation failed for `{}`.", pretty_path(.path))]
    KeyDerivation {
        path: PathBuf,
        #[source]
        source: KdfError,
    },

    #[error(
        "`{}` failed to be verified after encryption. It's likely corrupted. The hash of the data before encryption was {expected}, and the hash of the data after decryption was {actual}.",
        pretty_path(.path)
    )]
    VerificationMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("`{}` failed to be written during {operation}.", pretty_path(.path))]
    WriteFailure {
        path: PathBuf,
        operation: Operation,
        #[source]
        source: io::Error,
    },

    #[error("Internal error while processing `{}`.", pretty_path(.path))]
    Internal {
        path: PathBuf,
        #[source]
        source: EnvelopeError,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::PasswordTooShort { .. } => ErrorKind::InvalidPassword,
            Error::FileAccess { .. } => ErrorKind::FileAccess,
            Error::Archive { .. } => ErrorKind::ArchiveFailure,
            Error::InvalidFormat { .. } => ErrorKind::InvalidFormat,
            Error::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            Error::MissingMetadata { .. } => ErrorKind::MissingMetadata,
            Error::Authentication { .. } => ErrorKind::AuthenticationFailure,
            Error::KdfOutOfMemory { .. } => ErrorKind::KdfResourceExhaustion,
            Error::KeyDerivation { .. } | Error::Internal { .. } => ErrorKind::Internal,
            Error::VerificationMismatch { .. } => ErrorKind::VerificationMismatch,
            Error::WriteFailure { .. } => ErrorKind::WriteFailure,
        }
    }

    /// The file the error refers to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::PasswordTooShort { .. } => None,
            Error::FileAccess { path, .. }
            | Error::Archive { path, .. }
            | Error::InvalidFormat { path }
            | Error::UnsupportedVersion { path, .. }
            | Error::MissingMetadata { path }
            | Error::Authentication { path }
            | Error::KdfOutOfMemory { path, .. }
            | Error::KeyDerivation { path, .. }
            | Error::VerificationMismatch { path, .. }
            | Error::WriteFailure { path, .. }
            | Error::Internal { path, .. } => Some(path),
        }
    }

    /// Attaches the file path to an envelope error.
    ///
    /// Authentication failures deliberately drop the primitive's error.
    pub(crate) fn from_envelope(path: &Path, err: EnvelopeError) -> Self {
        let path = path.to_path_buf();
        match err {
            EnvelopeError::Format(FormatError::Empty) => Error::InvalidFormat { path },
            EnvelopeError::Format(FormatError::UnsupportedVersion(version)) => {
                Error::UnsupportedVersion { path, version }
            }
            EnvelopeError::Format(FormatError::MissingMetadata { .. }) => {
                Error::MissingMetadata { path }
            }
            EnvelopeError::Authentication(_) => Error::Authentication { path },
            EnvelopeError::Kdf(KdfError::OutOfMemory { required_kib }) => {
                Error::KdfOutOfMemory { path, required_kib }
            }
            EnvelopeError::Kdf(source) => Error::KeyDerivation { path, source },
            source => Error::Internal { path, source },
        }
    }
}
