//! Rule-based activity scoring
//!
//! A pure function of the weather and user snapshots built from fixed
//! domain heuristics: temperature and condition suitability, user-context
//! adjustments, and weekday/weekend plus time-of-day adjustments. No
//! learned state.

use crate::context::{TimeOfDay, UserContext, WeatherContext};
use crate::quantize::canonical_condition;
use crate::types::ActivityType;
use std::collections::HashMap;

/// An independent activity scorer over live context snapshots.
///
/// The ensemble engine composes two collaborators behind this seam: the
/// rule scorer below and the historical correlation scorer. Hosts may
/// substitute their own implementations.
pub trait ContextScorer: Send + Sync {
    /// Stable name used in logs and feature-importance maps
    fn name(&self) -> &'static str;

    /// Score every activity for the given snapshots
    fn score(&self, weather: &WeatherContext, user: &UserContext) -> HashMap<ActivityType, f64>;
}

/// Static domain-heuristic scorer
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleScorer;

impl RuleScorer {
    pub fn new() -> Self {
        Self
    }
}

impl ContextScorer for RuleScorer {
    fn name(&self) -> &'static str {
        "domain_rules"
    }

    fn score(&self, weather: &WeatherContext, user: &UserContext) -> HashMap<ActivityType, f64> {
        ActivityType::ALL
            .iter()
            .map(|activity| {
                let score = 0.5
                    * temperature_factor(*activity, weather.temperature)
                    * condition_factor(*activity, &weather.condition)
                    * user_factor(*activity, user)
                    * schedule_factor(*activity, weather.is_weekend, weather.time_of_day);
                (*activity, score)
            })
            .collect()
    }
}

fn outdoor(activity: ActivityType) -> bool {
    matches!(
        activity,
        ActivityType::OutdoorExercise
            | ActivityType::OutdoorLeisure
            | ActivityType::Travel
            | ActivityType::Photography
    )
}

fn indoor(activity: ActivityType) -> bool {
    matches!(
        activity,
        ActivityType::IndoorExercise
            | ActivityType::IndoorActivities
            | ActivityType::WorkProductivity
            | ActivityType::Relaxation
    )
}

fn temperature_factor(activity: ActivityType, temperature: f64) -> f64 {
    if outdoor(activity) {
        if (15.0..=25.0).contains(&temperature) {
            1.3
        } else if !(0.0..=32.0).contains(&temperature) {
            0.6
        } else {
            1.0
        }
    } else if indoor(activity) && !(5.0..=28.0).contains(&temperature) {
        // Harsh temperatures push activity indoors
        1.2
    } else {
        1.0
    }
}

fn condition_factor(activity: ActivityType, condition: &str) -> f64 {
    match canonical_condition(condition) {
        "clear" if outdoor(activity) => 1.3,
        "rain" | "storm" if outdoor(activity) => 0.5,
        "rain" | "storm" if indoor(activity) => 1.3,
        "cloudy" if outdoor(activity) => 0.9,
        _ => 1.0,
    }
}

fn user_factor(activity: ActivityType, user: &UserContext) -> f64 {
    let mut factor = 1.0;
    match activity {
        ActivityType::OutdoorExercise | ActivityType::IndoorExercise => {
            if user.recent_steps > 8_000 {
                factor *= 1.2;
            }
        }
        ActivityType::SocialActivity => {
            if user.social_interactions >= 3 {
                factor *= 1.3;
            }
        }
        ActivityType::IndoorActivities => {
            if user.screen_time_minutes > 300 {
                factor *= 1.2;
            }
        }
        ActivityType::Relaxation => {
            if user.recent_activity_score > 0.7 {
                // Heavy recent activity favors winding down
                factor *= 1.2;
            }
        }
        _ => {}
    }
    factor
}

fn schedule_factor(activity: ActivityType, is_weekend: bool, time_of_day: TimeOfDay) -> f64 {
    let day_factor = match activity {
        ActivityType::Recreational
        | ActivityType::SocialActivity
        | ActivityType::Travel
        | ActivityType::OutdoorLeisure
            if is_weekend =>
        {
            1.2
        }
        ActivityType::WorkProductivity if !is_weekend => 1.3,
        ActivityType::WorkProductivity if is_weekend => 0.7,
        _ => 1.0,
    };

    let time_factor = match (time_of_day, activity) {
        (TimeOfDay::Morning, ActivityType::OutdoorExercise)
        | (TimeOfDay::Morning, ActivityType::IndoorExercise) => 1.2,
        (TimeOfDay::Afternoon, ActivityType::WorkProductivity) => 1.2,
        (TimeOfDay::Evening, ActivityType::SocialActivity)
        | (TimeOfDay::Evening, ActivityType::Recreational) => 1.2,
        (TimeOfDay::Night, ActivityType::Relaxation) => 1.3,
        (TimeOfDay::Night, ActivityType::IndoorActivities) => 1.2,
        (TimeOfDay::Night, a) if outdoor(a) => 0.4,
        _ => 1.0,
    };

    day_factor * time_factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_mild_morning_favors_outdoor_exercise() {
        let weather = WeatherContext {
            temperature: 20.0,
            condition: "clear sky".to_string(),
            time_of_day: TimeOfDay::Morning,
            is_weekend: true,
            ..WeatherContext::default()
        };
        let user = UserContext {
            recent_steps: 9_000,
            ..UserContext::default()
        };

        let scores = RuleScorer::new().score(&weather, &user);
        assert!(scores[&ActivityType::OutdoorExercise] > scores[&ActivityType::IndoorActivities]);
        assert!(scores[&ActivityType::OutdoorExercise] > scores[&ActivityType::WorkProductivity]);
    }

    #[test]
    fn test_stormy_night_favors_indoor() {
        let weather = WeatherContext {
            temperature: 8.0,
            condition: "thunderstorm".to_string(),
            time_of_day: TimeOfDay::Night,
            ..WeatherContext::default()
        };
        let user = UserContext {
            screen_time_minutes: 400,
            ..UserContext::default()
        };

        let scores = RuleScorer::new().score(&weather, &user);
        assert!(scores[&ActivityType::Relaxation] > scores[&ActivityType::OutdoorExercise]);
        assert!(scores[&ActivityType::IndoorActivities] > scores[&ActivityType::OutdoorLeisure]);
    }

    #[test]
    fn test_weekday_afternoon_favors_work() {
        let weather = WeatherContext {
            time_of_day: TimeOfDay::Afternoon,
            is_weekend: false,
            ..WeatherContext::default()
        };
        let scores = RuleScorer::new().score(&weather, &UserContext::default());
        assert!(scores[&ActivityType::WorkProductivity] > scores[&ActivityType::Recreational]);
    }

    #[test]
    fn test_scores_cover_all_activities() {
        let scores = RuleScorer::new().score(&WeatherContext::default(), &UserContext::default());
        assert_eq!(scores.len(), ActivityType::ALL.len());
        for score in scores.values() {
            assert!(*score >= 0.0);
        }
    }
}
