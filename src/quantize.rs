//! Feature quantization
//!
//! Continuous inputs are bucketed into a small set of canonical classes
//! before becoming part of a composite pattern key:
//! - Temperature into 10-degree bands
//! - Counts and scores into {low, medium, high} via fixed thresholds
//! - Free-text weather conditions into {clear, cloudy, rain, storm, unknown}
//! - Day-over-day temperature deltas into {warming, cooling, stable}
//!
//! The ground-truth activity label for a record is derived by a fixed
//! priority cascade, evaluated in declaration order with first match winning.

use crate::types::{ActivityType, DailyRecord};
use serde::{Deserialize, Serialize};

/// Width of a temperature band in degrees celsius
pub const TEMPERATURE_BAND_DEGREES: f64 = 10.0;

/// Temperature delta beyond which a day-over-day transition counts as a
/// warming or cooling trend
pub const TREND_DELTA_DEGREES: f64 = 5.0;

/// Coarse low/medium/high bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }
}

/// Day-over-day temperature trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempTrend {
    Warming,
    Cooling,
    Stable,
}

impl TempTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            TempTrend::Warming => "warming",
            TempTrend::Cooling => "cooling",
            TempTrend::Stable => "stable",
        }
    }
}

/// Bucket a temperature into a 10-degree band index (floor division,
/// so -3.0 lands in band -1 and 21.5 in band 2)
pub fn temperature_band(temperature: f64) -> i32 {
    (temperature / TEMPERATURE_BAND_DEGREES).floor() as i32
}

/// Classify a day-over-day temperature transition
pub fn temperature_trend(previous: f64, current: f64) -> TempTrend {
    let delta = current - previous;
    if delta > TREND_DELTA_DEGREES {
        TempTrend::Warming
    } else if delta < -TREND_DELTA_DEGREES {
        TempTrend::Cooling
    } else {
        TempTrend::Stable
    }
}

/// Bucket a step count
pub fn step_level(steps: u32) -> Level {
    match steps {
        0..=4_999 => Level::Low,
        5_000..=9_999 => Level::Medium,
        _ => Level::High,
    }
}

/// Bucket screen time (minutes)
pub fn screen_level(minutes: u32) -> Level {
    match minutes {
        0..=119 => Level::Low,
        120..=299 => Level::Medium,
        _ => Level::High,
    }
}

/// Bucket a productivity score (0-100)
pub fn productivity_level(score: f64) -> Level {
    if score < 40.0 {
        Level::Low
    } else if score < 70.0 {
        Level::Medium
    } else {
        Level::High
    }
}

/// Bucket a normalized activity score (0-1)
pub fn activity_level(score: f64) -> Level {
    if score < 0.33 {
        Level::Low
    } else if score < 0.66 {
        Level::Medium
    } else {
        Level::High
    }
}

/// Bucket a social interaction count
pub fn social_level(interactions: u32) -> Level {
    match interactions {
        0..=1 => Level::Low,
        2..=4 => Level::Medium,
        _ => Level::High,
    }
}

/// Bucket a relative humidity percentage
pub fn humidity_level(humidity: f64) -> Level {
    if humidity < 40.0 {
        Level::Low
    } else if humidity < 70.0 {
        Level::Medium
    } else {
        Level::High
    }
}

/// Canonicalize a free-text weather condition by substring match.
///
/// Storm is checked before rain so "thunderstorm with rain" maps to storm.
pub fn canonical_condition(raw: &str) -> &'static str {
    let lower = raw.to_lowercase();
    if lower.contains("storm") || lower.contains("thunder") {
        "storm"
    } else if lower.contains("rain") || lower.contains("drizzle") || lower.contains("shower") {
        "rain"
    } else if lower.contains("clear") || lower.contains("sun") {
        "clear"
    } else if lower.contains("cloud") || lower.contains("overcast") || lower.contains("fog") {
        "cloudy"
    } else {
        "unknown"
    }
}

/// Derive the ground-truth activity label for a record.
///
/// An explicit ordered cascade of (predicate, label) pairs; the first
/// matching predicate wins and the fallback label is relaxation.
pub fn derive_activity_label(record: &DailyRecord) -> ActivityType {
    const CASCADE: [(fn(&DailyRecord) -> bool, ActivityType); 6] = [
        (|r| r.steps > 12_000, ActivityType::OutdoorExercise),
        (|r| r.places_visited > 3, ActivityType::SocialActivity),
        (|r| r.photo_count > 10, ActivityType::Photography),
        (|r| r.screen_time_minutes > 360, ActivityType::IndoorActivities),
        (|r| r.active_minutes > 60, ActivityType::IndoorExercise),
        (|r| r.productivity_score > 70.0, ActivityType::WorkProductivity),
    ];

    for (predicate, label) in CASCADE {
        if predicate(record) {
            return label;
        }
    }
    ActivityType::Relaxation
}
