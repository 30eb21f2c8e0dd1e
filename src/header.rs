//! FIT file header
//!
//! # Layout
//! ```text
//! 0x00: header_size u8       (14)
//! 0x01: protocol_version u8
//! 0x02: profile_version u16
//! 0x04: data_size u32        (bytes between header and file CRC)
//! 0x08: ".FIT"
//! 0x0C: header_crc u16       (CRC of bytes 0x00..0x0C)
//! ```
//! All integers are little-endian. Legacy 12-byte headers omit `header_crc`.

use crate::crc;
use crate::error::FitError;

/// Type tag identifying a FIT container
pub const FIT_TAG: [u8; 4] = *b".FIT";

/// FIT file header
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct FileHeader {
    pub header_size: u8,
    pub protocol_version: u8,
    pub profile_version: u16,
    pub data_size: u32,
    /// `None` for legacy 12-byte headers
    pub header_crc: Option<u16>,
}

impl FileHeader {
    pub const SIZE: usize = 14;
    pub const LEGACY_SIZE: usize = 12;

    pub fn new(protocol_version: u8, profile_version: u16, data_size: u32) -> Self {
        let mut header = Self {
            header_size: Self::SIZE as u8,
            protocol_version,
            profile_version,
            data_size,
            header_crc: None,
        };
        header.header_crc = Some(crc::checksum(&header.prefix()));
        header
    }

    fn prefix(&self) -> [u8; Self::LEGACY_SIZE] {
        let mut bytes = [0u8; Self::LEGACY_SIZE];
        bytes[0] = self.header_size;
        bytes[1] = self.protocol_version;
        bytes[2..4].copy_from_slice(&self.profile_version.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.data_size.to_le_bytes());
        bytes[8..12].copy_from_slice(&FIT_TAG);
        bytes
    }

    /// Write the 14-byte header
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[..Self::LEGACY_SIZE].copy_from_slice(&self.prefix());
        let header_crc = self
            .header_crc
            .unwrap_or_else(|| crc::checksum(&self.prefix()));
        bytes[12..14].copy_from_slice(&header_crc.to_le_bytes());
        bytes
    }

    /// Read and verify a header from the start of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FitError> {
        let header_size = *bytes
            .first()
            .ok_or_else(|| FitError::Decode("empty input".to_string()))?;
        let size = header_size as usize;
        if size != Self::SIZE && size != Self::LEGACY_SIZE {
            return Err(FitError::Decode(format!("unsupported header size {size}")));
        }
        if bytes.len() < size {
            return Err(FitError::Decode(format!(
                "truncated header: {} of {size} bytes",
                bytes.len()
            )));
        }
        if bytes[8..12] != FIT_TAG {
            return Err(FitError::Decode("missing .FIT type tag".to_string()));
        }

        let header_crc = if size == Self::SIZE {
            let stored = u16::from_le_bytes([bytes[12], bytes[13]]);
            // zero means the writer did not compute one
            if stored != 0 {
                let actual = crc::checksum(&bytes[..Self::LEGACY_SIZE]);
                if actual != stored {
                    return Err(FitError::Decode(format!(
                        "header CRC mismatch: stored {stored:#06x}, computed {actual:#06x}"
                    )));
                }
            }
            Some(stored)
        } else {
            None
        };

        Ok(Self {
            header_size,
            protocol_version: bytes[1],
            profile_version: u16::from_le_bytes([bytes[2], bytes[3]]),
            data_size: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            header_crc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = FileHeader::new(0x20, 2132, 0x0102_0304);
        let bytes = header.to_bytes();

        assert_eq!(bytes[0], 14);
        assert_eq!(bytes[1], 0x20);
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 2132);
        assert_eq!(&bytes[4..8], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[8..12], b".FIT");
        assert_eq!(
            u16::from_le_bytes([bytes[12], bytes[13]]),
            crc::checksum(&bytes[..12])
        );
    }

    #[test]
    fn test_header_roundtrip() {
        let header = FileHeader::new(0x20, 2132, 321);
        let parsed = FileHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_header_crc_mismatch() {
        let mut bytes = FileHeader::new(0x20, 2132, 321).to_bytes();
        bytes[4] ^= 0xFF;
        assert!(FileHeader::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_zero_header_crc_is_accepted() {
        let mut bytes = FileHeader::new(0x10, 100, 0).to_bytes();
        bytes[12] = 0;
        bytes[13] = 0;
        let parsed = FileHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.header_crc, Some(0));
    }

    #[test]
    fn test_legacy_header() {
        let mut bytes = FileHeader::new(0x10, 100, 7).to_bytes();
        bytes[0] = 12;
        let parsed = FileHeader::from_bytes(&bytes[..12]).unwrap();
        assert_eq!(parsed.header_crc, None);
        assert_eq!(parsed.data_size, 7);
    }

    #[test]
    fn test_rejects_bad_tag_and_truncation() {
        let mut bytes = FileHeader::new(0x20, 2132, 0).to_bytes();
        assert!(FileHeader::from_bytes(&bytes[..10]).is_err());
        bytes[9] = b'X';
        assert!(FileHeader::from_bytes(&bytes).is_err());
        assert!(FileHeader::from_bytes(&[]).is_err());
    }
}
