//! Prediction cache
//!
//! Predictions are cached under a quantized fingerprint so repeated
//! requests for the same half-hour window and near-identical weather
//! return the stored result unchanged until that window has passed. Stale
//! entries are evicted when they are looked up, never by a background
//! sweep.

use crate::context::WeatherContext;
use crate::types::PredictionResult;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::debug;

/// Width of a fingerprint time bucket in seconds
pub const TIME_BUCKET_SECONDS: i64 = 30 * 60;

/// Quantized cache key: time bucket, rounded weather values, condition hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    time_bucket: i64,
    temperature_tenths: i64,
    humidity_tenths: i64,
    condition_hash: u64,
}

impl Fingerprint {
    pub fn new(target_time: DateTime<Utc>, weather: &WeatherContext) -> Self {
        let mut hasher = DefaultHasher::new();
        weather.condition.to_lowercase().hash(&mut hasher);

        Self {
            time_bucket: target_time.timestamp().div_euclid(TIME_BUCKET_SECONDS),
            temperature_tenths: (weather.temperature * 10.0).round() as i64,
            humidity_tenths: (weather.humidity * 10.0).round() as i64,
            condition_hash: hasher.finish(),
        }
    }

    pub fn time_bucket(&self) -> i64 {
        self.time_bucket
    }

    /// An entry stays live until the clock moves past the fingerprint's
    /// time bucket, so predictions for future buckets are served from the
    /// cache rather than recomputed on every repeat request.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now.timestamp().div_euclid(TIME_BUCKET_SECONDS) <= self.time_bucket
    }
}

/// Concurrent fingerprint-keyed cache of completed predictions.
///
/// At most one live entry per fingerprint.
#[derive(Debug, Default)]
pub struct PredictionCache {
    entries: DashMap<Fingerprint, PredictionResult>,
}

impl PredictionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached result for a fingerprint if it is still live.
    ///
    /// A stale entry is evicted here, on the check.
    pub fn lookup(&self, fingerprint: &Fingerprint, now: DateTime<Utc>) -> Option<PredictionResult> {
        let stale = match self.entries.get(fingerprint) {
            Some(entry) if fingerprint.is_live(now) => {
                debug!(bucket = fingerprint.time_bucket, "prediction cache hit");
                return Some(entry.value().clone());
            }
            Some(_) => true,
            None => false,
        };

        if stale {
            self.entries.remove(fingerprint);
            debug!(bucket = fingerprint.time_bucket, "evicted stale prediction");
        }
        None
    }

    pub fn insert(&self, fingerprint: Fingerprint, result: PredictionResult) {
        self.entries.insert(fingerprint, result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UserContext;
    use crate::types::ActivityType;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn make_result(target_time: DateTime<Utc>, weather: &WeatherContext) -> PredictionResult {
        PredictionResult {
            id: Uuid::new_v4(),
            target_time,
            weather: weather.clone(),
            user: UserContext::default(),
            predicted: ActivityType::Relaxation,
            confidence: 0.6,
            alternatives: vec![],
            feature_importance: HashMap::new(),
            reasoning: String::new(),
            method: "test".to_string(),
            produced_by: "test".to_string(),
            validation: None,
        }
    }

    #[test]
    fn test_same_bucket_same_fingerprint() {
        let weather = WeatherContext::default();
        let t1 = Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 6, 15, 10, 29, 59).unwrap();

        assert_eq!(Fingerprint::new(t1, &weather), Fingerprint::new(t2, &weather));
    }

    #[test]
    fn test_next_bucket_differs() {
        let weather = WeatherContext::default();
        let t1 = Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap();

        assert_ne!(Fingerprint::new(t1, &weather), Fingerprint::new(t2, &weather));
    }

    #[test]
    fn test_rounded_weather_collapses_noise() {
        let t = Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();
        let a = WeatherContext {
            temperature: 21.34,
            humidity: 55.01,
            ..WeatherContext::default()
        };
        let b = WeatherContext {
            temperature: 21.31,
            humidity: 54.99,
            ..WeatherContext::default()
        };

        assert_eq!(Fingerprint::new(t, &a), Fingerprint::new(t, &b));
    }

    #[test]
    fn test_condition_changes_fingerprint() {
        let t = Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();
        let clear = WeatherContext {
            condition: "clear".to_string(),
            ..WeatherContext::default()
        };
        let rain = WeatherContext {
            condition: "rain".to_string(),
            ..WeatherContext::default()
        };

        assert_ne!(Fingerprint::new(t, &clear), Fingerprint::new(t, &rain));
    }

    #[test]
    fn test_lookup_hit_within_bucket() {
        let cache = PredictionCache::new();
        let weather = WeatherContext::default();
        let t = Utc.with_ymd_and_hms(2024, 6, 15, 10, 5, 0).unwrap();
        let fingerprint = Fingerprint::new(t, &weather);
        let result = make_result(t, &weather);

        cache.insert(fingerprint, result.clone());

        let later = Utc.with_ymd_and_hms(2024, 6, 15, 10, 20, 0).unwrap();
        assert_eq!(cache.lookup(&fingerprint, later), Some(result));
    }

    #[test]
    fn test_future_bucket_entry_stays_live() {
        let cache = PredictionCache::new();
        let weather = WeatherContext::default();
        let target = Utc.with_ymd_and_hms(2024, 6, 15, 14, 0, 0).unwrap();
        let fingerprint = Fingerprint::new(target, &weather);
        let result = make_result(target, &weather);
        cache.insert(fingerprint, result.clone());

        // Asked again hours before the target bucket arrives
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();
        assert_eq!(cache.lookup(&fingerprint, now), Some(result));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stale_entry_evicted_on_lookup() {
        let cache = PredictionCache::new();
        let weather = WeatherContext::default();
        let t = Utc.with_ymd_and_hms(2024, 6, 15, 10, 5, 0).unwrap();
        let fingerprint = Fingerprint::new(t, &weather);
        cache.insert(fingerprint, make_result(t, &weather));
        assert_eq!(cache.len(), 1);

        let next_bucket = Utc.with_ymd_and_hms(2024, 6, 15, 10, 35, 0).unwrap();
        assert_eq!(cache.lookup(&fingerprint, next_bucket), None);
        assert!(cache.is_empty());
    }
}
