//! FIT decoding
//!
//! A reader for the record subset [`crate::encoder::FitEncoder`] writes:
//! normal record headers, definition and data records in either byte order,
//! scalar fields and strings. Compressed timestamp headers, developer data and
//! array fields are rejected.

use crate::crc;
use crate::error::FitError;
use crate::header::FileHeader;
use crate::profile::{BaseType, MesgNum};
use crate::types::FieldValue;
use serde::Serialize;
use std::collections::HashMap;

const COMPRESSED_HEADER_FLAG: u8 = 0x80;
const DEFINITION_FLAG: u8 = 0x40;
const DEVELOPER_DATA_FLAG: u8 = 0x20;
const LOCAL_TYPE_MASK: u8 = 0x0F;

/// A decoded FIT file
#[derive(Debug, Clone, Serialize)]
pub struct FitFile {
    pub header: FileHeader,
    pub messages: Vec<DecodedMessage>,
    pub crc: u16,
}

impl FitFile {
    /// Messages of one type, in file order
    pub fn messages_of(&self, kind: MesgNum) -> impl Iterator<Item = &DecodedMessage> {
        self.messages
            .iter()
            .filter(move |m| m.kind == Some(kind))
    }
}

/// A decoded data record
#[derive(Debug, Clone, Serialize)]
pub struct DecodedMessage {
    pub global: u16,
    /// `None` for messages outside the supported profile subset
    pub kind: Option<MesgNum>,
    pub fields: Vec<DecodedField>,
}

impl DecodedMessage {
    /// Value of a field; `None` when absent or set to its invalid value
    pub fn field(&self, number: u8) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|f| f.number == number)
            .and_then(|f| f.value.as_ref())
    }

    pub fn uint(&self, number: u8) -> Option<u64> {
        self.field(number).and_then(FieldValue::as_u64)
    }

    pub fn text(&self, number: u8) -> Option<&str> {
        self.field(number).and_then(FieldValue::as_str)
    }
}

/// A decoded field
#[derive(Debug, Clone, Serialize)]
pub struct DecodedField {
    pub number: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'static str>,
    pub base_type: BaseType,
    pub value: Option<FieldValue>,
}

#[derive(Debug, Clone)]
struct Definition {
    global: u16,
    big_endian: bool,
    fields: Vec<(u8, usize, BaseType)>,
}

/// Decoder for FIT files
pub struct FitDecoder;

impl FitDecoder {
    /// Decode and verify a complete FIT file
    pub fn decode(bytes: &[u8]) -> Result<FitFile, FitError> {
        let header = FileHeader::from_bytes(bytes)?;
        let body_start = header.header_size as usize;
        let body_end = body_start + header.data_size as usize;

        if bytes.len() < body_end + 2 {
            return Err(FitError::Decode(format!(
                "declared data size {} exceeds input of {} bytes",
                header.data_size,
                bytes.len()
            )));
        }
        if bytes.len() > body_end + 2 {
            return Err(FitError::Decode(format!(
                "{} trailing bytes after file CRC",
                bytes.len() - body_end - 2
            )));
        }

        let stored = u16::from_le_bytes([bytes[body_end], bytes[body_end + 1]]);
        let actual = crc::checksum(&bytes[..body_end]);
        if stored != actual {
            return Err(FitError::Decode(format!(
                "file CRC mismatch: stored {stored:#06x}, computed {actual:#06x}"
            )));
        }

        let messages = decode_records(&bytes[body_start..body_end])?;
        Ok(FitFile {
            header,
            messages,
            crc: stored,
        })
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], FitError> {
        let end = self.pos + n;
        let slice = self.bytes.get(self.pos..end).ok_or_else(|| {
            FitError::Decode(format!("record truncated at body offset {}", self.pos))
        })?;
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8, FitError> {
        Ok(self.take(1)?[0])
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }
}

fn decode_records(body: &[u8]) -> Result<Vec<DecodedMessage>, FitError> {
    let mut cursor = Cursor { bytes: body, pos: 0 };
    let mut definitions: HashMap<u8, Definition> = HashMap::new();
    let mut messages = Vec::new();

    while !cursor.is_empty() {
        let record_header = cursor.byte()?;
        if record_header & COMPRESSED_HEADER_FLAG != 0 {
            return Err(FitError::Decode(
                "compressed timestamp headers are not supported".to_string(),
            ));
        }
        let local = record_header & LOCAL_TYPE_MASK;

        if record_header & DEFINITION_FLAG != 0 {
            if record_header & DEVELOPER_DATA_FLAG != 0 {
                return Err(FitError::Decode(
                    "developer data definitions are not supported".to_string(),
                ));
            }
            definitions.insert(local, read_definition(&mut cursor)?);
        } else {
            let definition = definitions.get(&local).ok_or_else(|| {
                FitError::Decode(format!("data record for undefined local type {local}"))
            })?;
            messages.push(read_data(&mut cursor, definition)?);
        }
    }

    Ok(messages)
}

fn read_definition(cursor: &mut Cursor<'_>) -> Result<Definition, FitError> {
    let _reserved = cursor.byte()?;
    let big_endian = match cursor.byte()? {
        0 => false,
        1 => true,
        other => {
            return Err(FitError::Decode(format!("unknown architecture {other}")));
        }
    };
    let raw = cursor.take(2)?;
    let global = if big_endian {
        u16::from_be_bytes([raw[0], raw[1]])
    } else {
        u16::from_le_bytes([raw[0], raw[1]])
    };

    let count = cursor.byte()? as usize;
    let mut fields = Vec::with_capacity(count);
    for _ in 0..count {
        let triple = cursor.take(3)?;
        let base_type = BaseType::from_byte(triple[2]).ok_or_else(|| {
            FitError::Decode(format!("unknown base type {:#04x}", triple[2]))
        })?;
        let size = triple[1] as usize;
        if let Some(width) = base_type.width() {
            if size != width {
                return Err(FitError::Decode(format!(
                    "field {} of message {global}: array fields are not supported",
                    triple[0]
                )));
            }
        }
        fields.push((triple[0], size, base_type));
    }

    Ok(Definition {
        global,
        big_endian,
        fields,
    })
}

fn read_data(cursor: &mut Cursor<'_>, definition: &Definition) -> Result<DecodedMessage, FitError> {
    let kind = MesgNum::from_global(definition.global);
    let mut fields = Vec::with_capacity(definition.fields.len());

    for &(number, size, base_type) in &definition.fields {
        let raw = cursor.take(size)?;
        fields.push(DecodedField {
            number,
            name: kind.and_then(|k| k.field(number)).map(|f| f.name),
            base_type,
            value: decode_value(raw, base_type, definition.big_endian),
        });
    }

    Ok(DecodedMessage {
        global: definition.global,
        kind,
        fields,
    })
}

fn decode_value(raw: &[u8], base_type: BaseType, big_endian: bool) -> Option<FieldValue> {
    if base_type == BaseType::String {
        let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
        if end == 0 {
            return None;
        }
        return Some(FieldValue::Text(
            String::from_utf8_lossy(&raw[..end]).into_owned(),
        ));
    }

    let mut buf = [0u8; 8];
    if big_endian {
        for (i, b) in raw.iter().rev().enumerate() {
            buf[i] = *b;
        }
    } else {
        buf[..raw.len()].copy_from_slice(raw);
    }
    let value = u64::from_le_bytes(buf);
    if value == base_type.invalid_value() {
        return None;
    }

    if base_type.is_signed() {
        // sign-extend from the field width
        let shift = 64 - 8 * raw.len() as u32;
        Some(FieldValue::SInt(((value << shift) as i64) >> shift))
    } else {
        Some(FieldValue::UInt(value))
    }
}
