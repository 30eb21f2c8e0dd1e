//! FIT profile subset
//!
//! Global message numbers, base types and field layouts for the three messages
//! a workout file needs: `file_id`, `workout` and `workout_step`. The field
//! tables fix the order in which fields appear in definition and data records.

use serde::{Deserialize, Serialize};

/// FIT base types used by the supported messages.
///
/// The discriminant is the on-wire base type byte (endian flag included).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BaseType {
    Enum = 0x00,
    SInt8 = 0x01,
    UInt8 = 0x02,
    SInt16 = 0x83,
    UInt16 = 0x84,
    SInt32 = 0x85,
    UInt32 = 0x86,
    String = 0x07,
    UInt8z = 0x0A,
    UInt16z = 0x8B,
    UInt32z = 0x8C,
    Byte = 0x0D,
}

impl BaseType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        // Bit 7 is the endian-ability flag; some writers leave it clear.
        match byte & 0x1F {
            0x00 => Some(BaseType::Enum),
            0x01 => Some(BaseType::SInt8),
            0x02 => Some(BaseType::UInt8),
            0x03 => Some(BaseType::SInt16),
            0x04 => Some(BaseType::UInt16),
            0x05 => Some(BaseType::SInt32),
            0x06 => Some(BaseType::UInt32),
            0x07 => Some(BaseType::String),
            0x0A => Some(BaseType::UInt8z),
            0x0B => Some(BaseType::UInt16z),
            0x0C => Some(BaseType::UInt32z),
            0x0D => Some(BaseType::Byte),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Fixed width in bytes; `None` for strings, whose width is declared per field
    pub fn width(self) -> Option<usize> {
        match self {
            BaseType::Enum | BaseType::SInt8 | BaseType::UInt8 | BaseType::UInt8z | BaseType::Byte => {
                Some(1)
            }
            BaseType::SInt16 | BaseType::UInt16 | BaseType::UInt16z => Some(2),
            BaseType::SInt32 | BaseType::UInt32 | BaseType::UInt32z => Some(4),
            BaseType::String => None,
        }
    }

    /// Raw value meaning "field not set"
    pub fn invalid_value(self) -> u64 {
        match self {
            BaseType::Enum | BaseType::UInt8 | BaseType::Byte => 0xFF,
            BaseType::SInt8 => 0x7F,
            BaseType::SInt16 => 0x7FFF,
            BaseType::UInt16 => 0xFFFF,
            BaseType::SInt32 => 0x7FFF_FFFF,
            BaseType::UInt32 => 0xFFFF_FFFF,
            BaseType::UInt8z | BaseType::UInt16z | BaseType::UInt32z | BaseType::String => 0,
        }
    }

    /// Largest raw value that still means something (sentinel excluded)
    pub fn max_valid(self) -> u64 {
        match self {
            BaseType::UInt8z => 0xFF,
            BaseType::UInt16z => 0xFFFF,
            BaseType::UInt32z => 0xFFFF_FFFF,
            BaseType::String => 0,
            other => other.invalid_value() - 1,
        }
    }

    /// Smallest raw value that still means something
    pub fn min_valid(self) -> u64 {
        match self {
            BaseType::UInt8z | BaseType::UInt16z | BaseType::UInt32z => 1,
            _ => 0,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, BaseType::SInt8 | BaseType::SInt16 | BaseType::SInt32)
    }
}

/// Global message numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MesgNum {
    FileId,
    Workout,
    WorkoutStep,
}

impl MesgNum {
    pub fn global_number(self) -> u16 {
        match self {
            MesgNum::FileId => 0,
            MesgNum::Workout => 26,
            MesgNum::WorkoutStep => 27,
        }
    }

    pub fn from_global(number: u16) -> Option<Self> {
        match number {
            0 => Some(MesgNum::FileId),
            26 => Some(MesgNum::Workout),
            27 => Some(MesgNum::WorkoutStep),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MesgNum::FileId => "file_id",
            MesgNum::Workout => "workout",
            MesgNum::WorkoutStep => "workout_step",
        }
    }

    /// Field layout, in record order
    pub fn fields(self) -> &'static [FieldDef] {
        match self {
            MesgNum::FileId => FILE_ID_FIELDS,
            MesgNum::Workout => WORKOUT_FIELDS,
            MesgNum::WorkoutStep => WORKOUT_STEP_FIELDS,
        }
    }

    pub fn field(self, number: u8) -> Option<&'static FieldDef> {
        self.fields().iter().find(|f| f.number == number)
    }
}

/// One entry of a message's field layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub number: u8,
    pub name: &'static str,
    pub base_type: BaseType,
}

const fn field(number: u8, name: &'static str, base_type: BaseType) -> FieldDef {
    FieldDef {
        number,
        name,
        base_type,
    }
}

/// `file_id` field numbers
pub mod file_id {
    pub const TYPE: u8 = 0;
    pub const MANUFACTURER: u8 = 1;
    pub const PRODUCT: u8 = 2;
    pub const SERIAL_NUMBER: u8 = 3;
    pub const TIME_CREATED: u8 = 4;
}

/// `workout` field numbers
pub mod workout {
    pub const SPORT: u8 = 4;
    pub const NUM_VALID_STEPS: u8 = 6;
    pub const WKT_NAME: u8 = 8;
    pub const SUB_SPORT: u8 = 11;
}

/// `workout_step` field numbers
pub mod workout_step {
    pub const MESSAGE_INDEX: u8 = 254;
    pub const WKT_STEP_NAME: u8 = 0;
    pub const DURATION_TYPE: u8 = 1;
    pub const DURATION_VALUE: u8 = 2;
    pub const TARGET_TYPE: u8 = 3;
    pub const TARGET_VALUE: u8 = 4;
    pub const CUSTOM_TARGET_VALUE_LOW: u8 = 5;
    pub const CUSTOM_TARGET_VALUE_HIGH: u8 = 6;
    pub const INTENSITY: u8 = 7;
}

static FILE_ID_FIELDS: &[FieldDef] = &[
    field(file_id::SERIAL_NUMBER, "serial_number", BaseType::UInt32z),
    field(file_id::TIME_CREATED, "time_created", BaseType::UInt32),
    field(file_id::MANUFACTURER, "manufacturer", BaseType::UInt16),
    field(file_id::PRODUCT, "product", BaseType::UInt16),
    field(file_id::TYPE, "type", BaseType::Enum),
];

static WORKOUT_FIELDS: &[FieldDef] = &[
    field(workout::WKT_NAME, "wkt_name", BaseType::String),
    field(workout::NUM_VALID_STEPS, "num_valid_steps", BaseType::UInt16),
    field(workout::SPORT, "sport", BaseType::Enum),
    field(workout::SUB_SPORT, "sub_sport", BaseType::Enum),
];

static WORKOUT_STEP_FIELDS: &[FieldDef] = &[
    field(workout_step::MESSAGE_INDEX, "message_index", BaseType::UInt16),
    field(workout_step::WKT_STEP_NAME, "wkt_step_name", BaseType::String),
    field(workout_step::DURATION_VALUE, "duration_value", BaseType::UInt32),
    field(workout_step::TARGET_VALUE, "target_value", BaseType::UInt32),
    field(workout_step::CUSTOM_TARGET_VALUE_LOW, "custom_target_value_low", BaseType::UInt32),
    field(workout_step::CUSTOM_TARGET_VALUE_HIGH, "custom_target_value_high", BaseType::UInt32),
    field(workout_step::DURATION_TYPE, "duration_type", BaseType::Enum),
    field(workout_step::TARGET_TYPE, "target_type", BaseType::Enum),
    field(workout_step::INTENSITY, "intensity", BaseType::Enum),
];

/// `file` enum value for workout files
pub const FILE_TYPE_WORKOUT: u8 = 5;

/// `wkt_step_duration` values
pub mod duration_type {
    pub const TIME: u8 = 0;
    pub const DISTANCE: u8 = 1;
    pub const CALORIES: u8 = 4;
    pub const OPEN: u8 = 5;
    pub const REPEAT_UNTIL_STEPS_CMPLT: u8 = 6;
}

/// `wkt_step_target` values
pub mod target_type {
    pub const SPEED: u8 = 0;
    pub const HEART_RATE: u8 = 1;
    pub const OPEN: u8 = 2;
    pub const CADENCE: u8 = 3;
    pub const POWER: u8 = 4;
}
