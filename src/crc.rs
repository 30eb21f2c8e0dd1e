//! FIT CRC-16
//!
//! Nibble-table implementation of the checksum used for both the file header
//! and the whole-file trailer (CRC-16/ARC, reflected polynomial 0xA001).

const CRC_TABLE: [u16; 16] = [
    0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800,
    0xB401, 0x5000, 0x9C01, 0x8801, 0x4400,
];

/// Fold one byte into a running checksum
pub fn update(crc: u16, byte: u8) -> u16 {
    // lower nibble
    let tmp = CRC_TABLE[(crc & 0xF) as usize];
    let mut crc = (crc >> 4) & 0x0FFF;
    crc = crc ^ tmp ^ CRC_TABLE[(byte & 0xF) as usize];

    // upper nibble
    let tmp = CRC_TABLE[(crc & 0xF) as usize];
    crc = (crc >> 4) & 0x0FFF;
    crc ^ tmp ^ CRC_TABLE[((byte >> 4) & 0xF) as usize]
}

/// Checksum of a complete byte slice
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0, |crc, &b| update(crc, b))
}
