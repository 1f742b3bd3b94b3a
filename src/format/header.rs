use super::{FormatError, FormatSpec, detect};
use crate::crypto::{AUTH_TAG_LEN, IV_LEN};

/// Header of an encrypted file: optional version tag, salt, IV and tag.
#[derive(Debug)]
pub struct Header {
    format: &'static FormatSpec,
    salt: Vec<u8>,
    iv: [u8; IV_LEN],
    auth_tag: [u8; AUTH_TAG_LEN],
}

impl Header {
    pub fn new(
        format: &'static FormatSpec,
        salt: &[u8],
        iv: [u8; IV_LEN],
        auth_tag: [u8; AUTH_TAG_LEN],
    ) -> Result<Self, FormatError> {
        if salt.len() != format.salt_len() {
            return Err(FormatError::InvalidSaltLength {
                version: format.version(),
                expected: format.salt_len(),
                got: salt.len(),
            });
        }

        Ok(Self {
            format,
            salt: salt.to_vec(),
            iv,
            auth_tag,
        })
    }

    pub fn format(&self) -> &'static FormatSpec {
        self.format
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    pub fn auth_tag(&self) -> &[u8; AUTH_TAG_LEN] {
        &self.auth_tag
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.format.metadata_length());

        if let Some(tag) = self.format.version_tag() {
            buf.extend_from_slice(&tag);
        }
        buf.extend_from_slice(&self.salt);
        buf.extend_from_slice(&self.iv);
        buf.extend_from_slice(&self.auth_tag);

        buf
    }

    /// Parses the header at the start of `data`.
    ///
    /// Returns the header and the offset at which the ciphertext begins.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize), FormatError> {
        let format = detect(data)?;

        let salt = &data[format.salt_offset()..format.iv_offset()];

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&data[format.iv_offset()..format.auth_tag_offset()]);

        let mut auth_tag = [0u8; AUTH_TAG_LEN];
        auth_tag.copy_from_slice(&data[format.auth_tag_offset()..format.metadata_length()]);

        Ok((
            Header {
                format,
                salt: salt.to_vec(),
                iv,
                auth_tag,
            },
            format.metadata_length(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{current, lookup};

    #[test]
    fn header_roundtrip() {
        let header = Header::new(current(), &[1u8; 16], [2u8; 16], [3u8; 16]).unwrap();

        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), 61);
        assert_eq!(&bytes[..13], b"DEADBOLT_V002");

        let (parsed, offset) = Header::from_bytes(&bytes).unwrap();
        assert_eq!(offset, 61);
        assert_eq!(parsed.format().version(), "002");
        assert_eq!(parsed.salt(), header.salt());
        assert_eq!(parsed.iv(), header.iv());
        assert_eq!(parsed.auth_tag(), header.auth_tag());
    }

    #[test]
    fn legacy_header_has_no_tag() {
        let legacy = lookup("001").unwrap();
        let header = Header::new(legacy, &[0x11u8; 64], [0x22u8; 16], [0x33u8; 16]).unwrap();

        let mut bytes = header.to_bytes();
        assert_eq!(bytes.len(), 96);
        assert_eq!(&bytes[..64], &[0x11u8; 64]);
        bytes.extend_from_slice(b"ciphertext");

        let (parsed, offset) = Header::from_bytes(&bytes).unwrap();
        assert!(parsed.format().is_legacy());
        assert_eq!(offset, 96);
        assert_eq!(parsed.iv(), &[0x22u8; 16]);
        assert_eq!(parsed.auth_tag(), &[0x33u8; 16]);
        assert_eq!(&bytes[offset..], b"ciphertext");
    }

    #[test]
    fn header_wrong_salt_length_fails() {
        assert_eq!(
            Header::new(current(), &[0u8; 64], [0u8; 16], [0u8; 16]).unwrap_err(),
            FormatError::InvalidSaltLength {
                version: "002",
                expected: 16,
                got: 64
            }
        );
    }

    #[test]
    fn header_unsupported_version_fails() {
        let mut data = b"DEADBOLT_V099".to_vec();
        data.resize(61, 0);

        assert!(matches!(
            Header::from_bytes(&data),
            Err(FormatError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn header_too_short_fails() {
        let data = vec![0u8; 95];
        assert!(matches!(
            Header::from_bytes(&data),
            Err(FormatError::MissingMetadata { .. })
        ));
    }
}
