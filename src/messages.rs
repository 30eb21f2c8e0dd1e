//! Message building
//!
//! This module translates a validated [`Workout`] into the ordered FIT message
//! sequence: `file_id`, then `workout`, then one `workout_step` per step.
//! The creation timestamp is resolved here so that encoding stays pure.

use crate::config::{FitConfig, FIT_EPOCH_OFFSET_SECS};
use crate::profile::{file_id, workout, workout_step, MesgNum, FILE_TYPE_WORKOUT};
use crate::types::{EncodedMessage, StepDuration, StepTarget, Workout, WorkoutStep};
use chrono::{DateTime, Utc};

/// Builder for the FIT message sequence of a workout file
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    manufacturer: u16,
    product: u16,
    serial_number: u32,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new(&FitConfig::default())
    }
}

impl MessageBuilder {
    pub fn new(config: &FitConfig) -> Self {
        Self {
            manufacturer: config.manufacturer,
            product: config.product,
            serial_number: config.serial_number,
        }
    }

    /// Build the message sequence, stamping the file with `created_at`
    pub fn build(&self, workout: &Workout, created_at: DateTime<Utc>) -> Vec<EncodedMessage> {
        let mut messages = Vec::with_capacity(2 + workout.num_steps());
        messages.push(self.file_id(created_at));
        messages.push(workout_message(workout));
        messages.extend(
            workout
                .steps()
                .iter()
                .enumerate()
                .map(|(index, step)| step_message(index as u16, step)),
        );
        messages
    }

    fn file_id(&self, created_at: DateTime<Utc>) -> EncodedMessage {
        EncodedMessage::new(MesgNum::FileId)
            .with(file_id::TYPE, FILE_TYPE_WORKOUT)
            .with(file_id::MANUFACTURER, self.manufacturer)
            .with(file_id::PRODUCT, self.product)
            .with(file_id::SERIAL_NUMBER, self.serial_number)
            .with(file_id::TIME_CREATED, fit_timestamp(created_at))
    }
}

fn workout_message(w: &Workout) -> EncodedMessage {
    EncodedMessage::new(MesgNum::Workout)
        .with(workout::WKT_NAME, w.title())
        .with(workout::SPORT, w.sport().fit_value())
        .with_opt(workout::SUB_SPORT, w.sub_sport().map(|s| s.fit_value()))
        .with(workout::NUM_VALID_STEPS, w.num_steps() as u16)
}

fn step_message(index: u16, step: &WorkoutStep) -> EncodedMessage {
    let msg = EncodedMessage::new(MesgNum::WorkoutStep)
        .with(workout_step::MESSAGE_INDEX, index)
        .with(workout_step::WKT_STEP_NAME, step.name.as_str())
        .with(workout_step::INTENSITY, step.intensity.fit_value())
        .with(workout_step::DURATION_TYPE, step.duration.fit_type());

    match &step.duration {
        // A repeat step reuses target_value for its repeat count.
        // children is non-empty; the normalizer rejects empty repeats.
        StepDuration::Repeat { count, children } => msg
            .with(workout_step::DURATION_VALUE, u32::from(children[0]))
            .with(workout_step::TARGET_TYPE, StepTarget::Open.fit_type())
            .with(workout_step::TARGET_VALUE, *count),
        duration => {
            let value = match duration {
                StepDuration::Time { millis } => *millis,
                StepDuration::Distance { centimeters } => *centimeters,
                StepDuration::Calories { kcal } => *kcal,
                StepDuration::Open | StepDuration::Repeat { .. } => 0,
            };
            with_target(msg.with(workout_step::DURATION_VALUE, value), &step.target)
        }
    }
}

fn with_target(msg: EncodedMessage, target: &StepTarget) -> EncodedMessage {
    let msg = msg.with(workout_step::TARGET_TYPE, target.fit_type());
    match *target {
        StepTarget::Open => msg.with(workout_step::TARGET_VALUE, 0u32),
        StepTarget::HeartRateZone { zone } | StepTarget::PowerZone { zone } => {
            msg.with(workout_step::TARGET_VALUE, u32::from(zone))
        }
        // target_value 0 selects the custom low/high range
        StepTarget::Cadence { low, high } | StepTarget::Speed { low, high } => msg
            .with(workout_step::TARGET_VALUE, 0u32)
            .with(workout_step::CUSTOM_TARGET_VALUE_LOW, low)
            .with(workout_step::CUSTOM_TARGET_VALUE_HIGH, high),
    }
}

/// Seconds since the FIT epoch; instants before it clamp to zero
pub fn fit_timestamp(at: DateTime<Utc>) -> u32 {
    let secs = at.timestamp_millis().div_euclid(1000) - FIT_EPOCH_OFFSET_SECS;
    secs.clamp(0, u32::MAX as i64 - 1) as u32
}
