//! Password-based file and folder encryption.
//!
//! [`Deadbolt`] encrypts a file (or a zipped folder) into a `.deadbolt`
//! file and decrypts such files back, including files written by older
//! format versions.

pub mod archive;
pub mod crypto;
pub mod envelope;
mod error;
pub mod format;
pub mod paths;
mod storage;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

pub use crate::crypto::KdfProfile;
pub use crate::error::{Error, ErrorKind, Operation};
use crate::envelope::Opened;
use crate::format::FormatSpec;
use crate::paths::{decrypted_output_path, encrypted_output_path, is_encrypted_file_path};
use crate::storage::Storage;
pub use crate::storage::rename_noclobber;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Minimum number of characters a password must have.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Rejects passwords shorter than [`MIN_PASSWORD_LEN`] characters.
pub fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// Encryption and decryption engine.
///
/// The engine holds no state besides its configuration, so one instance can
/// serve any number of concurrent operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadbolt {
    kdf_profile: KdfProfile,
}

/// Result of a successful decryption.
#[derive(Debug)]
pub struct Decrypted {
    path: PathBuf,
    format: &'static FormatSpec,
}

impl Decrypted {
    /// Where the plaintext was written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }

    /// Format version the encrypted file was written in.
    pub fn version(&self) -> &'static str {
        self.format.version()
    }

    /// `true` if the file used the legacy PBKDF2 format and should be
    /// re-encrypted.
    pub fn is_legacy(&self) -> bool {
        self.format.is_legacy()
    }
}

impl Deadbolt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kdf_profile(kdf_profile: KdfProfile) -> Self {
        Self { kdf_profile }
    }

    pub fn kdf_profile(&self) -> KdfProfile {
        self.kdf_profile
    }

    /// Encrypts a file or folder next to itself and returns the output path.
    ///
    /// Folders are zipped first and the temporary archive is removed on every
    /// exit path. The written file is decrypted again and its checksum
    /// compared with the original before success is reported.
    pub fn encrypt_file(&self, path: impl AsRef<Path>, password: &str) -> Result<PathBuf> {
        let source = path.as_ref();
        check_password(password)?;

        let metadata = fs::metadata(source).map_err(|source_err| Error::FileAccess {
            path: source.to_path_buf(),
            operation: Operation::Encryption,
            source: source_err,
        })?;

        let archive = if metadata.is_dir() {
            let archive = archive::archive_directory(source).map_err(|e| Error::Archive {
                path: source.to_path_buf(),
                source: e,
            })?;
            Some(archive)
        } else {
            None
        };
        let target = archive.as_ref().map_or(source, |a| a.path());

        let plaintext = Zeroizing::new(Storage::new(target).load().map_err(|e| {
            Error::FileAccess {
                path: source.to_path_buf(),
                operation: Operation::Encryption,
                source: e,
            }
        })?);
        let checksum = sha256_hex(&plaintext);

        let sealed = envelope::seal(&plaintext, password.as_bytes(), self.kdf_profile)
            .map_err(|e| Error::from_envelope(source, e))?;

        let output = Storage::new(encrypted_output_path(target));
        output
            .save_new(&sealed)
            .map_err(|e| Error::WriteFailure {
                path: output.path().to_path_buf(),
                operation: Operation::Encryption,
                source: e,
            })?;
        debug!(path = %output.path().display(), "wrote encrypted file");

        self.verify(&output, password, &checksum)?;

        info!(
            input = %source.display(),
            output = %output.path().display(),
            "encryption succeeded"
        );
        Ok(output.path().to_path_buf())
    }

    /// Decrypts a `.deadbolt` or `.dbolt` file next to itself.
    pub fn decrypt_file(&self, path: impl AsRef<Path>, password: &str) -> Result<Decrypted> {
        let source = path.as_ref();

        if !is_encrypted_file_path(source) {
            return Err(Error::InvalidFormat {
                path: source.to_path_buf(),
            });
        }
        check_password(password)?;

        let opened = self.read_decrypted_contents(source, password, Operation::Decryption)?;
        if opened.format().is_legacy() {
            info!(
                path = %source.display(),
                version = opened.format().version(),
                "decrypting legacy format"
            );
        }

        let output = Storage::new(decrypted_output_path(source));
        let write_failure = |e: io::Error| Error::WriteFailure {
            path: output.path().to_path_buf(),
            operation: Operation::Decryption,
            source: e,
        };
        output.save_new(opened.plaintext()).map_err(write_failure)?;
        if !output.exists() {
            return Err(write_failure(io::Error::from(io::ErrorKind::NotFound)));
        }

        info!(
            input = %source.display(),
            output = %output.path().display(),
            "decryption succeeded"
        );
        Ok(Decrypted {
            path: output.path().to_path_buf(),
            format: opened.format(),
        })
    }

    fn read_decrypted_contents(
        &self,
        path: &Path,
        password: &str,
        operation: Operation,
    ) -> Result<Opened> {
        let data = Storage::new(path).load().map_err(|e| Error::FileAccess {
            path: path.to_path_buf(),
            operation,
            source: e,
        })?;

        envelope::open(&data, password.as_bytes(), self.kdf_profile)
            .map_err(|e| Error::from_envelope(path, e))
    }

    /// Decrypts the freshly written file and compares checksums. The output
    /// is removed unless verification passes.
    fn verify(&self, output: &Storage, password: &str, expected: &str) -> Result<()> {
        let outcome = self
            .read_decrypted_contents(output.path(), password, Operation::VerificationOfEncryption)
            .and_then(|opened| {
                let actual = sha256_hex(opened.plaintext());
                if actual == expected {
                    return Ok(());
                }
                Err(Error::VerificationMismatch {
                    path: output.path().to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                })
            });

        match outcome {
            Ok(()) => {
                debug!(path = %output.path().display(), "verified encrypted file");
                Ok(())
            }
            Err(e) => {
                if let Err(remove_err) = output.remove() {
                    warn!(
                        path = %output.path().display(),
                        error = %remove_err,
                        "failed to remove unverified output"
                    );
                }
                Err(e)
            }
        }
    }
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
