//! Historical weather-activity correlation scoring
//!
//! Builds a lookup of activity distributions grouped by canonical weather
//! condition and temperature band from historical records. Scoring is a
//! plain table lookup: no smoothing beyond a flat default for unseen
//! weather groups.

use crate::context::{UserContext, WeatherContext};
use crate::quantize::{canonical_condition, derive_activity_label, temperature_band};
use crate::rules::ContextScorer;
use crate::types::{ActivityType, DailyRecord};
use std::collections::HashMap;

/// Score assigned to every activity when a weather group was never observed
const NEUTRAL_SCORE: f64 = 0.5;

/// Floor score for activities never seen under an observed weather group
const UNSEEN_SCORE: f64 = 0.1;

/// Correlation lookup from historical weather to observed activities
#[derive(Debug, Default, Clone)]
pub struct CorrelationScorer {
    /// (condition, temperature band) -> per-activity probability
    groups: HashMap<(String, i32), HashMap<ActivityType, f64>>,
}

impl CorrelationScorer {
    /// Build the correlation table from historical records.
    ///
    /// Each group's distribution is normalized over the activities observed
    /// within that group.
    pub fn from_records(records: &[DailyRecord]) -> Self {
        let mut counts: HashMap<(String, i32), HashMap<ActivityType, f64>> = HashMap::new();
        for record in records {
            let group = (
                canonical_condition(&record.weather_condition).to_string(),
                temperature_band(record.temperature),
            );
            let label = derive_activity_label(record);
            *counts.entry(group).or_default().entry(label).or_insert(0.0) += 1.0;
        }

        for distribution in counts.values_mut() {
            let total: f64 = distribution.values().sum();
            if total > 0.0 {
                for value in distribution.values_mut() {
                    *value /= total;
                }
            }
        }

        Self { groups: counts }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl ContextScorer for CorrelationScorer {
    fn name(&self) -> &'static str {
        "weather_correlation"
    }

    fn score(&self, weather: &WeatherContext, _user: &UserContext) -> HashMap<ActivityType, f64> {
        let group = (
            canonical_condition(&weather.condition).to_string(),
            temperature_band(weather.temperature),
        );

        match self.groups.get(&group) {
            Some(distribution) => ActivityType::ALL
                .iter()
                .map(|a| (*a, distribution.get(a).copied().unwrap_or(UNSEEN_SCORE)))
                .collect(),
            None => ActivityType::ALL
                .iter()
                .map(|a| (*a, NEUTRAL_SCORE))
                .collect(),
        }
    }
}
