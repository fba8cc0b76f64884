//! Point-in-time context snapshots
//!
//! This module defines the weather and user snapshots assembled per
//! prediction request. Snapshots are never persisted by the core; missing
//! fields default to neutral placeholders rather than failing.

use crate::types::ActivityType;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Time-of-day bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 4] = [
        TimeOfDay::Morning,
        TimeOfDay::Afternoon,
        TimeOfDay::Evening,
        TimeOfDay::Night,
    ];

    /// Bucket an hour (0-23) into a time-of-day slot
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=21 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
        }
    }
}

/// Season label for a calendar month (northern-hemisphere convention)
pub fn season_for_month(month: u32) -> &'static str {
    match month {
        3..=5 => "spring",
        6..=8 => "summer",
        9..=11 => "autumn",
        _ => "winter",
    }
}

/// Weather snapshot for a single prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherContext {
    /// Temperature (celsius)
    pub temperature: f64,
    /// Relative humidity (percentage, 0-100)
    pub humidity: f64,
    /// Free-text weather condition
    pub condition: String,
    /// Wind speed (m/s)
    pub wind_speed: f64,
    /// UV index
    pub uv_index: f64,
    /// Air quality index
    pub aqi: f64,
    /// Moon phase (0-1, 0.5 = full)
    pub moon_phase: f64,
    /// Day length (hours)
    pub day_length_hours: f64,
    /// Season label derived from the target date
    pub season: String,
    /// Whether the target time falls on a weekend
    pub is_weekend: bool,
    /// Time-of-day bucket of the target time
    pub time_of_day: TimeOfDay,
}

impl Default for WeatherContext {
    fn default() -> Self {
        Self {
            temperature: 15.0,
            humidity: 50.0,
            condition: "unknown".to_string(),
            wind_speed: 0.0,
            uv_index: 0.0,
            aqi: 50.0,
            moon_phase: 0.5,
            day_length_hours: 12.0,
            season: "unknown".to_string(),
            is_weekend: false,
            time_of_day: TimeOfDay::Morning,
        }
    }
}

impl WeatherContext {
    /// Build a weather snapshot for a target time from the core weather
    /// readings, deriving the calendar-dependent fields. Remaining fields
    /// keep their neutral defaults.
    pub fn at(target_time: DateTime<Utc>, temperature: f64, humidity: f64, condition: &str) -> Self {
        let weekday = target_time.weekday();
        Self {
            temperature,
            humidity,
            condition: condition.to_string(),
            season: season_for_month(target_time.month()).to_string(),
            is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
            time_of_day: TimeOfDay::from_hour(target_time.hour()),
            ..Self::default()
        }
    }
}

/// User snapshot for a single prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    /// Steps in the recent window
    pub recent_steps: u32,
    /// Recent activity score (0-1)
    pub recent_activity_score: f64,
    /// Coarse location label
    pub location: String,
    /// Screen time in the recent window (minutes)
    pub screen_time_minutes: u32,
    /// Most recent activities, oldest first
    pub recent_activities: Vec<ActivityType>,
    /// Social interactions in the recent window
    pub social_interactions: u32,
}

impl Default for UserContext {
    fn default() -> Self {
        Self {
            recent_steps: 0,
            recent_activity_score: 0.5,
            location: "unknown".to_string(),
            screen_time_minutes: 0,
            recent_activities: Vec::new(),
            social_interactions: 0,
        }
    }
}

impl UserContext {
    /// Last activity in the recent window, if any
    pub fn last_activity(&self) -> Option<ActivityType> {
        self.recent_activities.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_time_of_day_boundaries() {
        assert_eq!(TimeOfDay::from_hour(5), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(11), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(16), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(17), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(21), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(22), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(4), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(0), TimeOfDay::Night);
    }

    #[test]
    fn test_season_for_month() {
        assert_eq!(season_for_month(1), "winter");
        assert_eq!(season_for_month(4), "spring");
        assert_eq!(season_for_month(7), "summer");
        assert_eq!(season_for_month(10), "autumn");
        assert_eq!(season_for_month(12), "winter");
    }

    #[test]
    fn test_weather_context_at_weekend() {
        // 2024-06-15 is a Saturday
        let target = Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap();
        let ctx = WeatherContext::at(target, 22.0, 55.0, "clear sky");

        assert!(ctx.is_weekend);
        assert_eq!(ctx.time_of_day, TimeOfDay::Morning);
        assert_eq!(ctx.season, "summer");
        assert_eq!(ctx.temperature, 22.0);
    }

    #[test]
    fn test_weather_context_at_weekday() {
        // 2024-01-17 is a Wednesday
        let target = Utc.with_ymd_and_hms(2024, 1, 17, 20, 0, 0).unwrap();
        let ctx = WeatherContext::at(target, -2.0, 80.0, "snow");

        assert!(!ctx.is_weekend);
        assert_eq!(ctx.time_of_day, TimeOfDay::Evening);
        assert_eq!(ctx.season, "winter");
    }

    #[test]
    fn test_neutral_defaults() {
        let weather = WeatherContext::default();
        assert_eq!(weather.condition, "unknown");
        assert_eq!(weather.moon_phase, 0.5);

        let user = UserContext::default();
        assert_eq!(user.recent_activity_score, 0.5);
        assert_eq!(user.location, "unknown");
        assert_eq!(user.last_activity(), None);
    }
}
