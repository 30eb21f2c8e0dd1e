//! FIT binary encoding
//!
//! This module serializes a message sequence into a complete FIT container.
//! The body is written to its own buffer first so that the header can declare
//! its exact length, then the whole file is closed with a CRC-16 trailer.
//!
//! Each distinct message type gets one definition record, emitted right before
//! its first data record. Every message of a type shares the layout from
//! [`MesgNum::fields`]; unset fields are written as their invalid value.

use crate::config::FitConfig;
use crate::crc;
use crate::error::FitError;
use crate::header::FileHeader;
use crate::profile::{BaseType, FieldDef, MesgNum};
use crate::types::{EncodedMessage, FieldValue};
use tracing::debug;

/// Record header bit marking a definition record
pub const DEFINITION_FLAG: u8 = 0x40;

/// Local message types are 4 bits wide
pub const MAX_LOCAL_TYPES: usize = 16;

/// Architecture byte for little-endian records
pub const ARCH_LITTLE_ENDIAN: u8 = 0;

/// Encoder producing byte-exact FIT files
#[derive(Debug, Clone)]
pub struct FitEncoder {
    string_size: u8,
    protocol_version: u8,
    profile_version: u16,
}

impl Default for FitEncoder {
    fn default() -> Self {
        Self::new(&FitConfig::default())
    }
}

impl FitEncoder {
    pub fn new(config: &FitConfig) -> Self {
        Self {
            string_size: config.string_field_size(),
            protocol_version: config.protocol_version,
            profile_version: config.profile_version,
        }
    }

    /// Encode messages into a complete file: header, body, CRC
    pub fn encode(&self, messages: &[EncodedMessage]) -> Result<Vec<u8>, FitError> {
        if self.string_size < 2 {
            return Err(FitError::Encode(format!(
                "string field size {} is not usable",
                self.string_size
            )));
        }

        let body = self.encode_body(messages)?;
        let data_size = u32::try_from(body.len())
            .map_err(|_| FitError::Encode(format!("body of {} bytes exceeds u32", body.len())))?;
        let header = FileHeader::new(self.protocol_version, self.profile_version, data_size);

        let mut out = Vec::with_capacity(FileHeader::SIZE + body.len() + 2);
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(&body);
        let file_crc = crc::checksum(&out);
        out.extend_from_slice(&file_crc.to_le_bytes());

        debug!(
            messages = messages.len(),
            data_size,
            file_crc,
            "encoded FIT file"
        );
        Ok(out)
    }

    fn encode_body(&self, messages: &[EncodedMessage]) -> Result<Vec<u8>, FitError> {
        let mut body = Vec::new();
        // index = local message type, in first-use order
        let mut locals: Vec<MesgNum> = Vec::new();

        for message in messages {
            let local = match locals.iter().position(|kind| *kind == message.kind) {
                Some(local) => local as u8,
                None => {
                    if locals.len() == MAX_LOCAL_TYPES {
                        return Err(FitError::Encode(format!(
                            "more than {MAX_LOCAL_TYPES} message types in one file"
                        )));
                    }
                    locals.push(message.kind);
                    let local = (locals.len() - 1) as u8;
                    self.write_definition(&mut body, local, message.kind);
                    local
                }
            };
            self.write_data(&mut body, local, message)?;
        }

        Ok(body)
    }

    fn field_size(&self, def: &FieldDef) -> u8 {
        match def.base_type.width() {
            Some(width) => width as u8,
            None => self.string_size,
        }
    }

    fn write_definition(&self, body: &mut Vec<u8>, local: u8, kind: MesgNum) {
        let fields = kind.fields();
        body.push(DEFINITION_FLAG | local);
        body.push(0); // reserved
        body.push(ARCH_LITTLE_ENDIAN);
        body.extend_from_slice(&kind.global_number().to_le_bytes());
        body.push(fields.len() as u8);
        for def in fields {
            body.push(def.number);
            body.push(self.field_size(def));
            body.push(def.base_type.as_byte());
        }
    }

    fn write_data(
        &self,
        body: &mut Vec<u8>,
        local: u8,
        message: &EncodedMessage,
    ) -> Result<(), FitError> {
        if let Some(unknown) = message
            .fields
            .keys()
            .find(|number| message.kind.field(**number).is_none())
        {
            return Err(FitError::Encode(format!(
                "{} has no field {unknown}",
                message.kind.as_str()
            )));
        }

        body.push(local);
        for def in message.kind.fields() {
            let size = self.field_size(def) as usize;
            match message.fields.get(&def.number) {
                Some(value) => write_value(body, message.kind, def, size, value)?,
                None => write_invalid(body, def, size),
            }
        }
        Ok(())
    }
}

fn write_value(
    body: &mut Vec<u8>,
    kind: MesgNum,
    def: &FieldDef,
    size: usize,
    value: &FieldValue,
) -> Result<(), FitError> {
    let out_of_range = |shown: String| {
        FitError::Encode(format!(
            "{}.{} cannot represent {shown} as {:?}",
            kind.as_str(),
            def.name,
            def.base_type
        ))
    };

    match (def.base_type, value) {
        (BaseType::String, FieldValue::Text(text)) => {
            // room for the NUL terminator; interior NULs would truncate the value
            if text.len() >= size || text.as_bytes().contains(&0) {
                return Err(out_of_range(format!("{text:?}")));
            }
            body.extend_from_slice(text.as_bytes());
            body.resize(body.len() + size - text.len(), 0);
        }
        (base, FieldValue::UInt(v)) if base != BaseType::String => {
            if *v < base.min_valid() || *v > base.max_valid() {
                return Err(out_of_range(v.to_string()));
            }
            body.extend_from_slice(&v.to_le_bytes()[..size]);
        }
        (base, FieldValue::SInt(v)) if base.is_signed() => {
            let bits = (size * 8) as u32;
            let min = -(1i64 << (bits - 1));
            // the largest positive value is the sentinel
            let max = (1i64 << (bits - 1)) - 2;
            if *v < min || *v > max {
                return Err(out_of_range(v.to_string()));
            }
            body.extend_from_slice(&v.to_le_bytes()[..size]);
        }
        (_, other) => {
            return Err(FitError::Encode(format!(
                "{}.{} expects {:?}, got {other:?}",
                kind.as_str(),
                def.name,
                def.base_type
            )));
        }
    }
    Ok(())
}

fn write_invalid(body: &mut Vec<u8>, def: &FieldDef, size: usize) {
    match def.base_type {
        BaseType::String => body.resize(body.len() + size, 0),
        base => body.extend_from_slice(&base.invalid_value().to_le_bytes()[..size]),
    }
}
