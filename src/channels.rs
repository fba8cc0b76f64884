//! Context channels
//!
//! A closed set of named scoring dimensions used by every pattern model:
//! weather, behavior, time, sequence, and seasonal. Each channel co-locates
//! its training feature extractor (used by the weight optimizer) and its
//! live scoring function so the channel name and its semantics never drift
//! apart.

use crate::context::{TimeOfDay, UserContext, WeatherContext};
use crate::quantize::{canonical_condition, social_level, step_level, Level};
use crate::types::{ActivityType, DailyRecord};
use serde::{Deserialize, Serialize};

/// Named scoring dimension of a pattern model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextChannel {
    Weather,
    Behavior,
    Time,
    Sequence,
    Seasonal,
}

impl ContextChannel {
    pub const ALL: [ContextChannel; 5] = [
        ContextChannel::Weather,
        ContextChannel::Behavior,
        ContextChannel::Time,
        ContextChannel::Sequence,
        ContextChannel::Seasonal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextChannel::Weather => "weather",
            ContextChannel::Behavior => "behavior",
            ContextChannel::Time => "time",
            ContextChannel::Sequence => "sequence",
            ContextChannel::Seasonal => "seasonal",
        }
    }

    /// Feature value of this channel for a training record, in [0, 1].
    ///
    /// Used by the gradient sweep in weight optimization.
    pub fn feature_value(&self, record: &DailyRecord) -> f64 {
        match self {
            ContextChannel::Weather => condition_quality(&record.weather_condition),
            ContextChannel::Behavior => (record.steps as f64 / 15_000.0).clamp(0.0, 1.0),
            ContextChannel::Time => {
                use chrono::Datelike;
                if matches!(
                    record.date.weekday(),
                    chrono::Weekday::Sat | chrono::Weekday::Sun
                ) {
                    1.0
                } else {
                    0.5
                }
            }
            ContextChannel::Sequence => (record.active_minutes as f64 / 120.0).clamp(0.0, 1.0),
            ContextChannel::Seasonal => season_quality(&record.season),
        }
    }

    /// Score contribution of this channel for an activity under live
    /// contexts.
    ///
    /// `pattern_probability` is the model's learned frequency-table entry
    /// for the (context key, activity) pair, 0.0 when absent. Pattern-backed
    /// channels scale it by a context affinity; purely contextual channels
    /// score from the snapshot alone.
    pub fn score(
        &self,
        activity: ActivityType,
        weather: &WeatherContext,
        user: &UserContext,
        pattern_probability: f64,
    ) -> f64 {
        match self {
            ContextChannel::Weather => pattern_probability * weather_affinity(activity, weather),
            ContextChannel::Behavior => pattern_probability * behavior_affinity(activity, user),
            ContextChannel::Time => time_affinity(activity, weather.time_of_day),
            ContextChannel::Sequence => sequence_affinity(activity, user),
            ContextChannel::Seasonal => seasonal_affinity(activity, &weather.season),
        }
    }
}

/// How favorable a raw condition string is for being out and about
fn condition_quality(raw: &str) -> f64 {
    match canonical_condition(raw) {
        "clear" => 1.0,
        "cloudy" => 0.7,
        "rain" => 0.4,
        "storm" => 0.2,
        _ => 0.5,
    }
}

fn season_quality(season: &str) -> f64 {
    match season.to_lowercase().as_str() {
        "summer" => 1.0,
        "spring" => 0.75,
        "autumn" | "fall" => 0.5,
        "winter" => 0.25,
        _ => 0.5,
    }
}

fn is_outdoor(activity: ActivityType) -> bool {
    matches!(
        activity,
        ActivityType::OutdoorExercise
            | ActivityType::OutdoorLeisure
            | ActivityType::Travel
            | ActivityType::Photography
    )
}

fn is_indoor(activity: ActivityType) -> bool {
    matches!(
        activity,
        ActivityType::IndoorExercise
            | ActivityType::IndoorActivities
            | ActivityType::WorkProductivity
            | ActivityType::Relaxation
    )
}

fn weather_affinity(activity: ActivityType, weather: &WeatherContext) -> f64 {
    let quality = condition_quality(&weather.condition);
    let comfortable = (15.0..=25.0).contains(&weather.temperature);
    if is_outdoor(activity) {
        let temp_factor = if comfortable { 1.0 } else { 0.6 };
        quality * temp_factor
    } else if is_indoor(activity) {
        // Poor conditions push activity indoors
        1.0 - quality * 0.5
    } else {
        0.7
    }
}

fn behavior_affinity(activity: ActivityType, user: &UserContext) -> f64 {
    match activity {
        ActivityType::OutdoorExercise | ActivityType::IndoorExercise => {
            match step_level(user.recent_steps) {
                Level::High => 1.0,
                Level::Medium => 0.7,
                Level::Low => 0.4,
            }
        }
        ActivityType::SocialActivity => match social_level(user.social_interactions) {
            Level::High => 1.0,
            Level::Medium => 0.7,
            Level::Low => 0.4,
        },
        ActivityType::IndoorActivities | ActivityType::Relaxation => {
            if user.screen_time_minutes > 300 {
                0.9
            } else {
                0.6
            }
        }
        _ => 0.5 + user.recent_activity_score * 0.3,
    }
}

fn time_affinity(activity: ActivityType, time_of_day: TimeOfDay) -> f64 {
    match (time_of_day, activity) {
        (TimeOfDay::Morning, ActivityType::OutdoorExercise)
        | (TimeOfDay::Morning, ActivityType::IndoorExercise) => 0.9,
        (TimeOfDay::Afternoon, ActivityType::WorkProductivity)
        | (TimeOfDay::Afternoon, ActivityType::Travel) => 0.9,
        (TimeOfDay::Evening, ActivityType::SocialActivity)
        | (TimeOfDay::Evening, ActivityType::Recreational) => 0.9,
        (TimeOfDay::Night, ActivityType::Relaxation)
        | (TimeOfDay::Night, ActivityType::IndoorActivities) => 0.9,
        (TimeOfDay::Night, activity) if is_outdoor(activity) => 0.2,
        _ => 0.5,
    }
}

fn sequence_affinity(activity: ActivityType, user: &UserContext) -> f64 {
    match user.last_activity() {
        // Mild repeat tendency for the most recent activity
        Some(last) if last == activity => 0.7,
        Some(_) => 0.4,
        None => 0.5,
    }
}

fn seasonal_affinity(activity: ActivityType, season: &str) -> f64 {
    let quality = season_quality(season);
    if is_outdoor(activity) {
        quality
    } else if is_indoor(activity) {
        1.0 - quality * 0.5
    } else {
        0.6
    }
}
