//! Workout normalization
//!
//! This module validates raw request data and normalizes it into a [`Workout`].
//! - Titles and step names trimmed, defaulted and truncated to the string limit
//! - Numeric values range-checked against their wire widths and converted to wire units
//! - Repeat blocks checked to reference a contiguous run of earlier steps
//! - Empty step lists filled with a single open step

use crate::config::FitConfig;
use crate::error::FitError;
use crate::profile::BaseType;
use crate::schema::{GenerateFitRequest, RawDuration, RawStep, RawTarget};
use crate::types::{Sport, StepDuration, StepTarget, Workout, WorkoutStep};

/// Highest heart rate zone a device accepts as a target
pub const MAX_HEART_RATE_ZONE: i64 = 5;

/// Highest power zone a device accepts as a target
pub const MAX_POWER_ZONE: i64 = 7;

/// `message_index` is uint16 and 0xFFFF is its invalid value
pub const MAX_STEPS: usize = (u16::MAX - 1) as usize;

/// Normalizer for converting raw requests into validated workouts
#[derive(Debug, Clone)]
pub struct Normalizer {
    default_title: String,
    max_string_bytes: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&FitConfig::default())
    }
}

impl Normalizer {
    pub fn new(config: &FitConfig) -> Self {
        Self {
            default_title: config.default_title.clone(),
            max_string_bytes: config.max_string_bytes as usize,
        }
    }

    /// Validate a full request, carrying sub-sport and device profile along
    pub fn normalize_request(&self, request: &GenerateFitRequest) -> Result<Workout, FitError> {
        let mut workout = self.normalize(
            request.title.as_deref(),
            &request.workout.steps,
            request.workout.sport,
        )?;
        workout.sub_sport = request.workout.sub_sport;
        Ok(workout.with_device_profile(request.device_profile.clone()))
    }

    /// Normalize a title, a step list and a sport into a workout
    pub fn normalize(
        &self,
        raw_title: Option<&str>,
        raw_steps: &[RawStep],
        raw_sport: Option<Sport>,
    ) -> Result<Workout, FitError> {
        let title = self.normalize_title(raw_title)?;

        if raw_steps.len() > MAX_STEPS {
            return Err(FitError::range("steps", raw_steps.len()));
        }

        let steps = if raw_steps.is_empty() {
            vec![WorkoutStep::open(title.clone())]
        } else {
            raw_steps
                .iter()
                .enumerate()
                .map(|(index, raw)| self.normalize_step(index, raw, &title))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Workout {
            title,
            steps,
            sport: raw_sport.unwrap_or_default(),
            sub_sport: None,
            device_profile: None,
        })
    }

    fn normalize_title(&self, raw: Option<&str>) -> Result<String, FitError> {
        let trimmed = raw.map(str::trim).unwrap_or_default();
        check_no_nul("title", trimmed)?;
        let title = if trimmed.is_empty() {
            self.default_title.as_str()
        } else {
            trimmed
        };
        Ok(truncate_utf8(title, self.max_string_bytes).to_string())
    }

    fn normalize_step(
        &self,
        index: usize,
        raw: &RawStep,
        title: &str,
    ) -> Result<WorkoutStep, FitError> {
        let name = match raw.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                check_no_nul(&format!("steps[{index}].name"), name)?;
                truncate_utf8(name, self.max_string_bytes).to_string()
            }
            _ => title.to_string(),
        };

        Ok(WorkoutStep {
            name,
            intensity: raw.intensity,
            duration: normalize_duration(index, &raw.duration)?,
            target: normalize_target(index, &raw.target)?,
        })
    }
}

fn normalize_duration(index: usize, raw: &RawDuration) -> Result<StepDuration, FitError> {
    let field = format!("steps[{index}].duration.value");
    match raw {
        RawDuration::Open => Ok(StepDuration::Open),
        RawDuration::Time { value } => Ok(StepDuration::Time {
            millis: check_u32(&field, *value)?,
        }),
        RawDuration::Distance { value } => Ok(StepDuration::Distance {
            centimeters: scale_u32(&field, *value, 100.0)?,
        }),
        RawDuration::Calories { value } => Ok(StepDuration::Calories {
            kcal: check_u32(&field, *value)?,
        }),
        RawDuration::Repeat { count, steps } => {
            let count_field = format!("steps[{index}].duration.count");
            if *count < 1 {
                return Err(FitError::range(count_field, count));
            }
            let count = check_u32(&count_field, *count)?;
            let children = normalize_repeat_children(index, steps)?;
            Ok(StepDuration::Repeat { count, children })
        }
    }
}

fn normalize_repeat_children(index: usize, steps: &[i64]) -> Result<Vec<u16>, FitError> {
    let field = format!("steps[{index}].duration.steps");
    if steps.is_empty() {
        return Err(FitError::Validation(format!(
            "{field}: repeat must reference at least one step"
        )));
    }

    let mut children = Vec::with_capacity(steps.len());
    for (pos, &child) in steps.iter().enumerate() {
        if child < 0 {
            return Err(FitError::range(format!("{field}[{pos}]"), child));
        }
        if child as u64 == index as u64 {
            return Err(FitError::Validation(format!(
                "{field}: step {index} cannot repeat itself"
            )));
        }
        if child as u64 > index as u64 {
            return Err(FitError::Validation(format!(
                "{field}: forward reference to step {child}"
            )));
        }
        // child < index <= MAX_STEPS, so it fits in u16
        children.push(child as u16);
    }

    let contiguous = children.windows(2).all(|w| w[1] == w[0] + 1);
    let ends_before_repeat = children.last().map(|&c| c as usize + 1) == Some(index);
    if !contiguous || !ends_before_repeat {
        return Err(FitError::Validation(format!(
            "{field}: repeated steps must be a contiguous run ending at step {}",
            index - 1
        )));
    }

    Ok(children)
}

fn normalize_target(index: usize, raw: &RawTarget) -> Result<StepTarget, FitError> {
    match raw {
        RawTarget::Open => Ok(StepTarget::Open),
        RawTarget::HeartRateZone { zone } => Ok(StepTarget::HeartRateZone {
            zone: check_zone(index, *zone, MAX_HEART_RATE_ZONE)?,
        }),
        RawTarget::PowerZone { zone } => Ok(StepTarget::PowerZone {
            zone: check_zone(index, *zone, MAX_POWER_ZONE)?,
        }),
        RawTarget::Cadence { low, high } => {
            let low = check_u32(&format!("steps[{index}].target.low"), *low)?;
            let high = check_u32(&format!("steps[{index}].target.high"), *high)?;
            check_ordered(index, low, high)?;
            Ok(StepTarget::Cadence { low, high })
        }
        RawTarget::Speed { low, high } => {
            let low = scale_u32(&format!("steps[{index}].target.low"), *low, 1000.0)?;
            let high = scale_u32(&format!("steps[{index}].target.high"), *high, 1000.0)?;
            check_ordered(index, low, high)?;
            Ok(StepTarget::Speed { low, high })
        }
    }
}

fn check_zone(index: usize, zone: i64, max: i64) -> Result<u8, FitError> {
    if !(1..=max).contains(&zone) {
        return Err(FitError::range(format!("steps[{index}].target.zone"), zone));
    }
    Ok(zone as u8)
}

fn check_ordered(index: usize, low: u32, high: u32) -> Result<(), FitError> {
    if low > high {
        return Err(FitError::Validation(format!(
            "steps[{index}].target: low ({low}) exceeds high ({high})"
        )));
    }
    Ok(())
}

/// Accept an integer that fits a uint32 field without colliding with its sentinel
fn check_u32(field: &str, value: i64) -> Result<u32, FitError> {
    if value < 0 || value as u64 > BaseType::UInt32.max_valid() {
        return Err(FitError::range(field, value));
    }
    Ok(value as u32)
}

/// Convert a real value to scaled integer wire units
fn scale_u32(field: &str, value: f64, scale: f64) -> Result<u32, FitError> {
    let scaled = (value * scale).round();
    if !value.is_finite() || value < 0.0 || scaled > BaseType::UInt32.max_valid() as f64 {
        return Err(FitError::range(field, value));
    }
    Ok(scaled as u32)
}

/// FIT strings are NUL-terminated, so an embedded NUL would cut the value short
fn check_no_nul(field: &str, value: &str) -> Result<(), FitError> {
    if value.contains('\0') {
        return Err(FitError::Validation(format!(
            "{field}: must not contain NUL characters"
        )));
    }
    Ok(())
}

/// Longest prefix of `s` that is at most `max_bytes` long and ends on a char boundary
pub fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
