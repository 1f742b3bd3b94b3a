use super::{AUTH_TAG_LEN, IV_LEN, KEY_LEN};
use aes_gcm::{
    AesGcm, Key, Nonce, Tag,
    aead::{AeadInPlace, KeyInit, consts::U16},
    aes::Aes256,
};
use getrandom::fill;
use thiserror::Error;
use zeroize::Zeroizing;

/// AES-256-GCM keyed with a 16-byte IV, as stored in the file header.
///
/// Non-96-bit IVs go through GHASH to form the initial counter block, which
/// is what OpenSSL does for the same inputs.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Tag verification failed.
///
/// A wrong password and a corrupted file are indistinguishable here, so this
/// error deliberately carries no detail.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("decryption failed: wrong password or corrupted data")]
pub struct AuthError;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("plaintext is too large to encrypt")]
pub struct EncryptError;

#[derive(Debug, Error)]
#[error("OS random generator unavailable")]
pub struct RandomError;

/// Fill buffer with cryptographically secure random bytes
fn secure_random(buf: &mut [u8]) -> Result<(), RandomError> {
    fill(buf).map_err(|_| RandomError)
}

/// Generate a salt of the given length
pub fn generate_salt(len: usize) -> Result<Vec<u8>, RandomError> {
    let mut salt = vec![0u8; len];
    secure_random(&mut salt)?;
    Ok(salt)
}

/// Generate a fresh IV. Never reuse one with the same key.
pub fn generate_iv() -> Result<[u8; IV_LEN], RandomError> {
    let mut iv = [0u8; IV_LEN];
    secure_random(&mut iv)?;
    Ok(iv)
}

/// Encrypt plaintext, returning the ciphertext and its detached tag
pub fn encrypt(
    plaintext: &[u8],
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
) -> Result<(Vec<u8>, [u8; AUTH_TAG_LEN]), EncryptError> {
    let cipher = Aes256Gcm16::new(Key::<Aes256Gcm16>::from_slice(key));

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::<U16>::from_slice(iv), b"", &mut buffer)
        .map_err(|_| EncryptError)?;

    Ok((buffer, tag.into()))
}

/// Decrypt ciphertext, verifying the detached tag
pub fn decrypt(
    ciphertext: &[u8],
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    auth_tag: &[u8; AUTH_TAG_LEN],
) -> Result<Zeroizing<Vec<u8>>, AuthError> {
    let cipher = Aes256Gcm16::new(Key::<Aes256Gcm16>::from_slice(key));

    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(
            Nonce::<U16>::from_slice(iv),
            b"",
            buffer.as_mut_slice(),
            Tag::from_slice(auth_tag),
        )
        .map_err(|_| AuthError)?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_LEN] = [9u8; KEY_LEN];
    const IV: [u8; IV_LEN] = [4u8; IV_LEN];

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let (ciphertext, tag) = encrypt(b"secret data", &KEY, &IV).unwrap();
        assert_ne!(ciphertext.as_slice(), b"secret data");
        assert_eq!(ciphertext.len(), b"secret data".len());

        let plaintext = decrypt(&ciphertext, &KEY, &IV, &tag).unwrap();
        assert_eq!(plaintext.as_slice(), b"secret data");
    }

    #[test]
    fn empty_plaintext_still_has_tag() {
        let (ciphertext, tag) = encrypt(b"", &KEY, &IV).unwrap();
        assert!(ciphertext.is_empty());
        assert_ne!(tag, [0u8; AUTH_TAG_LEN]);

        assert!(decrypt(&ciphertext, &KEY, &IV, &tag).unwrap().is_empty());
    }

    #[test]
    fn wrong_key_fails() {
        let (ciphertext, tag) = encrypt(b"secret data", &KEY, &IV).unwrap();
        let other = [8u8; KEY_LEN];

        assert_eq!(decrypt(&ciphertext, &other, &IV, &tag), Err(AuthError));
    }

    #[test]
    fn tampered_tag_fails() {
        let (ciphertext, mut tag) = encrypt(b"secret data", &KEY, &IV).unwrap();
        tag[0] ^= 1;

        assert_eq!(decrypt(&ciphertext, &KEY, &IV, &tag), Err(AuthError));
    }

    #[test]
    fn tampered_iv_fails() {
        let (ciphertext, tag) = encrypt(b"secret data", &KEY, &IV).unwrap();
        let mut iv = IV;
        iv[15] ^= 0x80;

        assert_eq!(decrypt(&ciphertext, &KEY, &iv, &tag), Err(AuthError));
    }

    #[test]
    fn generated_ivs_are_unique() {
        assert_ne!(generate_iv().unwrap(), generate_iv().unwrap());
    }

    #[test]
    fn generated_salt_has_requested_length() {
        assert_eq!(generate_salt(64).unwrap().len(), 64);
        assert_eq!(generate_salt(16).unwrap().len(), 16);
    }
}
