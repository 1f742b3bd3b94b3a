//! Whole-artifact encryption in memory: header plus ciphertext.

use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::{
    self, AuthError, EncryptError, KdfError, KdfProfile, RandomError, generate_iv, generate_salt,
};
use crate::format::{self, FormatError, FormatSpec, Header};

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Kdf(#[from] KdfError),

    #[error(transparent)]
    Authentication(#[from] AuthError),

    #[error(transparent)]
    Encrypt(#[from] EncryptError),

    #[error(transparent)]
    Random(#[from] RandomError),
}

/// Plaintext recovered from an encrypted artifact.
pub struct Opened {
    plaintext: Zeroizing<Vec<u8>>,
    format: &'static FormatSpec,
}

impl Opened {
    pub fn plaintext(&self) -> &[u8] {
        &self.plaintext
    }

    /// Format the artifact was written in.
    pub fn format(&self) -> &'static FormatSpec {
        self.format
    }
}

/// Encrypts `plaintext` into a complete artifact in the current format.
///
/// A fresh salt and IV are drawn for every call.
pub fn seal(
    plaintext: &[u8],
    password: &[u8],
    profile: KdfProfile,
) -> Result<Vec<u8>, EnvelopeError> {
    let spec = format::current();

    let salt = generate_salt(spec.salt_len())?;
    let key = crypto::derive_key(password, &salt, spec.kdf(), profile)?;

    let iv = generate_iv()?;
    let (ciphertext, auth_tag) = crypto::encrypt(plaintext, &key, &iv)?;

    let header = Header::new(spec, &salt, iv, auth_tag)?;

    let mut artifact = header.to_bytes();
    artifact.extend_from_slice(&ciphertext);
    Ok(artifact)
}

/// Decrypts an artifact of any registered format.
///
/// The header is validated before any key derivation takes place.
pub fn open(data: &[u8], password: &[u8], profile: KdfProfile) -> Result<Opened, EnvelopeError> {
    let (header, offset) = Header::from_bytes(data)?;
    debug!(version = header.format().version(), "detected file format");

    let key = crypto::derive_key(password, header.salt(), header.format().kdf(), profile)?;
    let plaintext = crypto::decrypt(&data[offset..], &key, header.iv(), header.auth_tag())?;

    Ok(Opened {
        plaintext,
        format: header.format(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: KdfProfile = KdfProfile::Fast;

    #[test]
    fn seal_open_roundtrip() {
        let sealed = seal(b"hello world", b"correct-horse-battery", PROFILE).unwrap();
        assert_eq!(&sealed[..13], b"DEADBOLT_V002");
        assert_eq!(sealed.len(), 61 + b"hello world".len());

        let opened = open(&sealed, b"correct-horse-battery", PROFILE).unwrap();
        assert_eq!(opened.plaintext(), b"hello world");
        assert_eq!(opened.format().version(), "002");
    }

    #[test]
    fn empty_plaintext_is_header_only() {
        let sealed = seal(b"", b"password123", PROFILE).unwrap();
        assert_eq!(sealed.len(), 61);

        assert!(open(&sealed, b"password123", PROFILE).unwrap().plaintext().is_empty());
    }

    #[test]
    fn wrong_password_is_authentication_error() {
        let sealed = seal(b"hello world", b"correct-horse-battery", PROFILE).unwrap();

        assert!(matches!(
            open(&sealed, b"wrong-password", PROFILE),
            Err(EnvelopeError::Authentication(_))
        ));
    }

    #[test]
    fn salt_and_iv_are_fresh_per_seal() {
        let a = seal(b"same", b"password123", PROFILE).unwrap();
        let b = seal(b"same", b"password123", PROFILE).unwrap();

        assert_ne!(a[13..29], b[13..29]);
        assert_ne!(a[29..45], b[29..45]);
        assert_ne!(a, b);
    }

    #[test]
    fn unsupported_version_is_rejected_before_kdf() {
        let mut sealed = seal(b"data", b"password123", PROFILE).unwrap();
        sealed[10..13].copy_from_slice(b"777");

        // Standard profile would need 2 GiB if key derivation were attempted.
        assert!(matches!(
            open(&sealed, b"password123", KdfProfile::Standard),
            Err(EnvelopeError::Format(FormatError::UnsupportedVersion(v))) if v == "777"
        ));
    }

    #[test]
    fn failure_is_deterministic() {
        let mut sealed = seal(b"data", b"password123", PROFILE).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;

        for _ in 0..3 {
            assert!(matches!(
                open(&sealed, b"password123", PROFILE),
                Err(EnvelopeError::Authentication(_))
            ));
        }
    }

    mod proptest_suite {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(24))]

            #[test]
            fn roundtrip_identity(
                plaintext in prop::collection::vec(any::<u8>(), 0..2048),
                password in "[ -~]{8,32}",
            ) {
                let sealed = seal(&plaintext, password.as_bytes(), PROFILE).unwrap();
                let opened = open(&sealed, password.as_bytes(), PROFILE).unwrap();
                prop_assert_eq!(opened.plaintext(), plaintext.as_slice());
            }

            #[test]
            fn wrong_password_never_opens(
                plaintext in prop::collection::vec(any::<u8>(), 0..512),
                right in "[a-z]{8,16}",
                wrong in "[A-Z]{8,16}",
            ) {
                let sealed = seal(&plaintext, right.as_bytes(), PROFILE).unwrap();
                let result = open(&sealed, wrong.as_bytes(), PROFILE);
                prop_assert!(matches!(result, Err(EnvelopeError::Authentication(_))));
            }

            #[test]
            fn single_bit_flip_in_ciphertext_is_detected(
                plaintext in prop::collection::vec(any::<u8>(), 1..512),
                index in any::<prop::sample::Index>(),
                bit in 0u8..8,
            ) {
                let mut sealed = seal(&plaintext, b"password123", PROFILE).unwrap();
                let pos = 61 + index.index(plaintext.len());
                sealed[pos] ^= 1 << bit;

                let result = open(&sealed, b"password123", PROFILE);
                prop_assert!(matches!(result, Err(EnvelopeError::Authentication(_))));
            }
        }
    }
}
