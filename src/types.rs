//! Core types for the workout-fit pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: the validated workout model and the typed FIT messages built from it.

use crate::profile::{duration_type, target_type, MesgNum};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sport classification written to the `workout` message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    #[default]
    Generic,
    Running,
    Cycling,
    FitnessEquipment,
    Swimming,
    Training,
    Walking,
    CrossCountrySkiing,
    Rowing,
    Hiking,
}

impl Sport {
    pub fn fit_value(self) -> u8 {
        match self {
            Sport::Generic => 0,
            Sport::Running => 1,
            Sport::Cycling => 2,
            Sport::FitnessEquipment => 4,
            Sport::Swimming => 5,
            Sport::Training => 10,
            Sport::Walking => 11,
            Sport::CrossCountrySkiing => 12,
            Sport::Rowing => 15,
            Sport::Hiking => 17,
        }
    }
}

/// Optional refinement of [`Sport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubSport {
    Generic,
    Treadmill,
    Street,
    Trail,
    Track,
    Spin,
    IndoorCycling,
    Road,
    Mountain,
    IndoorRowing,
    Elliptical,
    LapSwimming,
    OpenWater,
    StrengthTraining,
    CardioTraining,
}

impl SubSport {
    pub fn fit_value(self) -> u8 {
        match self {
            SubSport::Generic => 0,
            SubSport::Treadmill => 1,
            SubSport::Street => 2,
            SubSport::Trail => 3,
            SubSport::Track => 4,
            SubSport::Spin => 5,
            SubSport::IndoorCycling => 6,
            SubSport::Road => 7,
            SubSport::Mountain => 8,
            SubSport::IndoorRowing => 14,
            SubSport::Elliptical => 15,
            SubSport::LapSwimming => 17,
            SubSport::OpenWater => 18,
            SubSport::StrengthTraining => 20,
            SubSport::CardioTraining => 26,
        }
    }
}

/// Effort classification of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    #[default]
    Active,
    Rest,
    Warmup,
    Cooldown,
    Recovery,
    Interval,
    Other,
}

impl Intensity {
    pub fn fit_value(self) -> u8 {
        match self {
            Intensity::Active => 0,
            Intensity::Rest => 1,
            Intensity::Warmup => 2,
            Intensity::Cooldown => 3,
            Intensity::Recovery => 4,
            Intensity::Interval => 5,
            Intensity::Other => 6,
        }
    }
}

/// How a step ends. Values are already in wire units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepDuration {
    /// No fixed end; the athlete advances the step
    Open,
    Time { millis: u32 },
    Distance { centimeters: u32 },
    Calories { kcal: u32 },
    /// Re-run the contiguous run of earlier steps `children` `count` times
    Repeat { count: u32, children: Vec<u16> },
}

impl StepDuration {
    pub fn fit_type(&self) -> u8 {
        match self {
            StepDuration::Open => duration_type::OPEN,
            StepDuration::Time { .. } => duration_type::TIME,
            StepDuration::Distance { .. } => duration_type::DISTANCE,
            StepDuration::Calories { .. } => duration_type::CALORIES,
            StepDuration::Repeat { .. } => duration_type::REPEAT_UNTIL_STEPS_CMPLT,
        }
    }

    pub fn is_repeat(&self) -> bool {
        matches!(self, StepDuration::Repeat { .. })
    }
}

/// What the device enforces while a step runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepTarget {
    Open,
    HeartRateZone { zone: u8 },
    PowerZone { zone: u8 },
    /// Revolutions per minute
    Cadence { low: u32, high: u32 },
    /// Millimetres per second
    Speed { low: u32, high: u32 },
}

impl StepTarget {
    pub fn fit_type(&self) -> u8 {
        match self {
            StepTarget::Open => target_type::OPEN,
            StepTarget::HeartRateZone { .. } => target_type::HEART_RATE,
            StepTarget::PowerZone { .. } => target_type::POWER,
            StepTarget::Cadence { .. } => target_type::CADENCE,
            StepTarget::Speed { .. } => target_type::SPEED,
        }
    }
}

/// One validated segment of a workout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutStep {
    pub name: String,
    pub intensity: Intensity,
    pub duration: StepDuration,
    pub target: StepTarget,
}

impl WorkoutStep {
    /// Open-ended active step with no target
    pub fn open(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            intensity: Intensity::Active,
            duration: StepDuration::Open,
            target: StepTarget::Open,
        }
    }
}

/// Validated, immutable workout ready for message building.
///
/// Construct through [`crate::normalizer::Normalizer`]; the fields are private
/// so that a `Workout` is always the product of validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workout {
    pub(crate) title: String,
    pub(crate) steps: Vec<WorkoutStep>,
    pub(crate) sport: Sport,
    pub(crate) sub_sport: Option<SubSport>,
    pub(crate) device_profile: Option<serde_json::Value>,
}

impl Workout {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn steps(&self) -> &[WorkoutStep] {
        &self.steps
    }

    pub fn sport(&self) -> Sport {
        self.sport
    }

    pub fn sub_sport(&self) -> Option<SubSport> {
        self.sub_sport
    }

    /// Opaque device information carried alongside the workout; never encoded
    pub fn device_profile(&self) -> Option<&serde_json::Value> {
        self.device_profile.as_ref()
    }

    /// Always derived from the step sequence
    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }

    /// Attach opaque device information
    pub fn with_device_profile(mut self, profile: Option<serde_json::Value>) -> Self {
        self.device_profile = profile;
        self
    }
}

/// Typed value of a single message field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    UInt(u64),
    SInt(i64),
    Text(String),
}

impl FieldValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::UInt(v) => Some(*v),
            FieldValue::SInt(v) => u64::try_from(*v).ok(),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::UInt(_) | FieldValue::SInt(_) => None,
        }
    }
}

impl From<u8> for FieldValue {
    fn from(v: u8) -> Self {
        FieldValue::UInt(v.into())
    }
}

impl From<u16> for FieldValue {
    fn from(v: u16) -> Self {
        FieldValue::UInt(v.into())
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::UInt(v.into())
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

/// One FIT message: a message type plus its set fields keyed by field number.
///
/// Fields that are not present are written as their base type's invalid value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedMessage {
    pub kind: MesgNum,
    pub fields: BTreeMap<u8, FieldValue>,
}

impl EncodedMessage {
    pub fn new(kind: MesgNum) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, number: u8, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(number, value.into());
        self
    }

    pub fn with_opt(self, number: u8, value: Option<impl Into<FieldValue>>) -> Self {
        match value {
            Some(v) => self.with(number, v),
            None => self,
        }
    }

    pub fn get(&self, number: u8) -> Option<&FieldValue> {
        self.fields.get(&number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::workout_step;

    #[test]
    fn test_duration_and_target_fit_types() {
        assert_eq!(StepDuration::Open.fit_type(), 5);
        assert_eq!(StepDuration::Time { millis: 1 }.fit_type(), 0);
        assert_eq!(
            StepDuration::Repeat {
                count: 2,
                children: vec![0]
            }
            .fit_type(),
            6
        );
        assert_eq!(StepTarget::Open.fit_type(), 2);
        assert_eq!(StepTarget::PowerZone { zone: 3 }.fit_type(), 4);
    }

    #[test]
    fn test_serde_names() {
        let sport: Sport = serde_json::from_str(r#""fitness_equipment""#).unwrap();
        assert_eq!(sport, Sport::FitnessEquipment);
        let intensity: Intensity = serde_json::from_str(r#""cooldown""#).unwrap();
        assert_eq!(intensity.fit_value(), 3);
    }

    #[test]
    fn test_message_with_opt_skips_none() {
        let msg = EncodedMessage::new(MesgNum::WorkoutStep)
            .with(workout_step::INTENSITY, 0u8)
            .with_opt(workout_step::TARGET_VALUE, None::<u32>);
        assert_eq!(msg.fields.len(), 1);
        assert_eq!(msg.get(workout_step::INTENSITY), Some(&FieldValue::UInt(0)));
    }
}
