//! Pattern models
//!
//! A pattern model learns a normalized frequency table over composite
//! context keys plus a weighted set of context channels, and scores
//! activities against live context snapshots. Three kinds are trained
//! independently: weather, user behavior, and activity sequence.
//!
//! Training is batch and coarse (tally, normalize, a fixed number of
//! gradient sweeps over channel weights); feedback after validation applies
//! small online nudges to individual table entries without renormalizing.

use crate::channels::ContextChannel;
use crate::context::{UserContext, WeatherContext};
use crate::error::PredictError;
use crate::quantize::{
    activity_level, canonical_condition, derive_activity_label, humidity_level,
    productivity_level, screen_level, step_level, temperature_band, temperature_trend, TempTrend,
};
use crate::types::{ActivityType, DailyRecord, PredictionResult};
use chrono::{DateTime, Datelike, Utc, Weekday};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Learning rate for weight optimization and feedback nudges
pub const LEARNING_RATE: f64 = 0.01;

/// Number of batch gradient-ascent sweeps during training
const GRADIENT_ITERATIONS: usize = 40;

/// Scalar bias added to every activity score
const SCORE_BIAS: f64 = 0.01;

/// The three independently trained pattern model kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Weather,
    UserBehavior,
    ActivitySequence,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Weather => "weather",
            ModelKind::UserBehavior => "user_behavior",
            ModelKind::ActivitySequence => "activity_sequence",
        }
    }

    /// Minimum record count required before `train` takes effect
    pub fn min_samples(&self) -> usize {
        match self {
            ModelKind::Weather => 20,
            ModelKind::UserBehavior => 15,
            ModelKind::ActivitySequence => 25,
        }
    }

    /// Composite context key for a live prediction request
    fn live_key(&self, weather: &WeatherContext, user: &UserContext) -> String {
        match self {
            ModelKind::Weather => format!(
                "{}|{}|{}|{}",
                temperature_band(weather.temperature),
                canonical_condition(&weather.condition),
                humidity_level(weather.humidity).as_str(),
                weather.season.to_lowercase(),
            ),
            ModelKind::UserBehavior => {
                // Live snapshots carry no productivity reading; the recent
                // activity score level stands in for it.
                format!(
                    "{}|{}|{}|{}",
                    step_level(user.recent_steps).as_str(),
                    screen_level(user.screen_time_minutes).as_str(),
                    activity_level(user.recent_activity_score).as_str(),
                    day_type(weather.is_weekend),
                )
            }
            ModelKind::ActivitySequence => {
                let previous = user
                    .last_activity()
                    .map(|a| a.as_str())
                    .unwrap_or("none");
                // No temperature history in a live snapshot; transitions
                // default to stable.
                format!("{}|{}", previous, TempTrend::Stable.as_str())
            }
        }
    }

    /// Training pairs of (context key, ground-truth label, feature record).
    ///
    /// The sequence kind keys on day-over-day transitions, so it yields one
    /// pair per consecutive record pair; the others yield one per record.
    fn training_pairs<'a>(
        &self,
        ordered: &[&'a DailyRecord],
    ) -> Vec<(String, ActivityType, &'a DailyRecord)> {
        match self {
            ModelKind::Weather => ordered
                .iter()
                .map(|r| {
                    let key = format!(
                        "{}|{}|{}|{}",
                        temperature_band(r.temperature),
                        canonical_condition(&r.weather_condition),
                        humidity_level(r.humidity).as_str(),
                        r.season.to_lowercase(),
                    );
                    (key, derive_activity_label(r), *r)
                })
                .collect(),
            ModelKind::UserBehavior => ordered
                .iter()
                .map(|r| {
                    let key = format!(
                        "{}|{}|{}|{}",
                        step_level(r.steps).as_str(),
                        screen_level(r.screen_time_minutes).as_str(),
                        productivity_level(r.productivity_score).as_str(),
                        day_type(is_weekend(r)),
                    );
                    (key, derive_activity_label(r), *r)
                })
                .collect(),
            ModelKind::ActivitySequence => ordered
                .windows(2)
                .map(|pair| {
                    let (prev, curr) = (pair[0], pair[1]);
                    let key = format!(
                        "{}|{}",
                        derive_activity_label(prev).as_str(),
                        temperature_trend(prev.temperature, curr.temperature).as_str(),
                    );
                    (key, derive_activity_label(curr), curr)
                })
                .collect(),
        }
    }
}

fn is_weekend(record: &DailyRecord) -> bool {
    matches!(record.date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn day_type(weekend: bool) -> &'static str {
    if weekend {
        "weekend"
    } else {
        "weekday"
    }
}

/// Frequency-table key for a (context key, activity) pair
fn entry_key(context_key: &str, activity: ActivityType) -> String {
    format!("{}|{}", context_key, activity.as_str())
}

fn uniform_weights() -> HashMap<String, f64> {
    let share = 1.0 / ContextChannel::ALL.len() as f64;
    ContextChannel::ALL
        .iter()
        .map(|c| (c.as_str().to_string(), share))
        .collect()
}

fn normalize_weights(weights: &mut HashMap<String, f64>) {
    let total: f64 = weights.values().sum();
    if total > 0.0 {
        for value in weights.values_mut() {
            *value /= total;
        }
    } else {
        *weights = uniform_weights();
    }
}

/// Mutable model state, guarded by the model's lock
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModelState {
    /// Composite key -> normalized probability; sums to 1 or is empty
    table: HashMap<String, f64>,
    /// Channel name -> weight; sums to 1, all non-negative
    weights: HashMap<String, f64>,
    trained: bool,
    sample_count: usize,
    accuracy: f64,
    last_trained: Option<DateTime<Utc>>,
}

impl Default for ModelState {
    fn default() -> Self {
        Self {
            table: HashMap::new(),
            weights: uniform_weights(),
            trained: false,
            sample_count: 0,
            accuracy: 0.0,
            last_trained: None,
        }
    }
}

/// A standalone activity scorer over historical daily records.
///
/// Shared state is guarded by a read-write lock; a training-in-progress
/// flag rejects concurrent re-entrant `train` calls so two trainings cannot
/// interleave on the same model.
pub struct PatternModel {
    kind: ModelKind,
    state: RwLock<ModelState>,
    training: AtomicBool,
}

impl PatternModel {
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            state: RwLock::new(ModelState::default()),
            training: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn is_trained(&self) -> bool {
        self.state.read().trained
    }

    pub fn sample_count(&self) -> usize {
        self.state.read().sample_count
    }

    /// Accuracy measured against the training set at train time
    pub fn training_accuracy(&self) -> f64 {
        self.state.read().accuracy
    }

    pub fn last_trained(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_trained
    }

    /// Train the model from a batch of daily records.
    ///
    /// Fewer than `min_samples` records leaves the model untrained (logged,
    /// not an error). A concurrent second call fails with
    /// `TrainingInProgress` without touching state.
    pub fn train(&self, records: &[DailyRecord]) -> Result<(), PredictError> {
        if records.len() < self.kind.min_samples() {
            warn!(
                model = self.kind.as_str(),
                samples = records.len(),
                required = self.kind.min_samples(),
                "insufficient training data, model stays untrained"
            );
            return Ok(());
        }

        if self
            .training
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Acquire)
            .is_err()
        {
            return Err(PredictError::TrainingInProgress(self.kind.as_str()));
        }

        self.train_inner(records);
        self.training.store(false, Ordering::Release);
        Ok(())
    }

    fn train_inner(&self, records: &[DailyRecord]) {
        let mut ordered: Vec<&DailyRecord> = records.iter().collect();
        ordered.sort_by_key(|r| r.date);
        let pairs = self.kind.training_pairs(&ordered);
        if pairs.is_empty() {
            warn!(model = self.kind.as_str(), "no trainable pairs in batch");
            return;
        }

        // Tally occurrences per (key, label), then normalize by the grand
        // total so the table sums to 1.
        let mut table: HashMap<String, f64> = HashMap::new();
        for (key, label, _) in &pairs {
            *table.entry(entry_key(key, *label)).or_insert(0.0) += 1.0;
        }
        let total: f64 = table.values().sum();
        for value in table.values_mut() {
            *value /= total;
        }

        // Batch gradient ascent over the channel weights. The table is
        // fixed during the sweeps; each sweep accumulates
        // error * feature_value per channel and applies the averaged step.
        let mut weights = uniform_weights();
        let n = pairs.len() as f64;
        for _ in 0..GRADIENT_ITERATIONS {
            let mut gradient: HashMap<&'static str, f64> = HashMap::new();
            for (key, label, record) in &pairs {
                let predicted = table.get(&entry_key(key, *label)).copied().unwrap_or(0.0);
                let error = 1.0 - predicted;
                for channel in ContextChannel::ALL {
                    *gradient.entry(channel.as_str()).or_insert(0.0) +=
                        error * channel.feature_value(record);
                }
            }
            for channel in ContextChannel::ALL {
                let step = gradient.get(channel.as_str()).copied().unwrap_or(0.0) / n;
                let weight = weights.entry(channel.as_str().to_string()).or_insert(0.0);
                *weight = (*weight + LEARNING_RATE * step).max(0.0);
            }
            normalize_weights(&mut weights);
        }

        // Training accuracy: fraction of pairs whose label is the most
        // probable activity for their context key, ties broken by canonical
        // activity order.
        let correct = pairs
            .iter()
            .filter(|(key, label, _)| {
                let mut best = ActivityType::ALL[0];
                let mut best_p = f64::NEG_INFINITY;
                for activity in ActivityType::ALL {
                    let p = table.get(&entry_key(key, activity)).copied().unwrap_or(0.0);
                    if p > best_p {
                        best_p = p;
                        best = activity;
                    }
                }
                best == *label
            })
            .count();
        let accuracy = correct as f64 / n;

        let mut state = self.state.write();
        state.table = table;
        state.weights = weights;
        state.trained = true;
        state.sample_count = records.len();
        state.accuracy = accuracy;
        state.last_trained = Some(Utc::now());
        drop(state);

        info!(
            model = self.kind.as_str(),
            samples = records.len(),
            pairs = pairs.len(),
            accuracy,
            "model trained"
        );
    }

    /// Score every activity for the given live contexts.
    ///
    /// Untrained models return the uniform distribution (1/|activities|
    /// each). Trained models return an unnormalized score map; callers
    /// normalize if needed.
    pub fn predict(
        &self,
        weather: &WeatherContext,
        user: &UserContext,
    ) -> HashMap<ActivityType, f64> {
        let state = self.state.read();
        if !state.trained {
            let uniform = 1.0 / ActivityType::ALL.len() as f64;
            return ActivityType::ALL.iter().map(|a| (*a, uniform)).collect();
        }

        let context_key = self.kind.live_key(weather, user);
        ActivityType::ALL
            .iter()
            .map(|activity| {
                let pattern_p = state
                    .table
                    .get(&entry_key(&context_key, *activity))
                    .copied()
                    .unwrap_or(0.0);
                let score: f64 = ContextChannel::ALL
                    .iter()
                    .map(|channel| {
                        let weight = state
                            .weights
                            .get(channel.as_str())
                            .copied()
                            .unwrap_or(0.0);
                        weight * channel.score(*activity, weather, user, pattern_p)
                    })
                    .sum();
                (*activity, (score + SCORE_BIAS).max(0.0))
            })
            .collect()
    }

    /// Nudge the table entry for a correct prediction upward.
    ///
    /// No-op on untrained models or unvalidated results. The table is not
    /// renormalized after the nudge; drift is corrected at the next `train`.
    pub fn reinforce_positive(&self, result: &PredictionResult) {
        if result.validation.is_none() {
            debug!(model = self.kind.as_str(), "ignoring unvalidated feedback");
            return;
        }
        let mut state = self.state.write();
        if !state.trained {
            return;
        }
        let context_key = self.kind.live_key(&result.weather, &result.user);
        let key = entry_key(&context_key, result.predicted);
        *state.table.entry(key).or_insert(0.0) += LEARNING_RATE * 0.1;
    }

    /// Shift probability mass from a wrong prediction toward the observed
    /// activity.
    ///
    /// No-op on untrained models or unvalidated results; not renormalized.
    pub fn adjust_negative(&self, result: &PredictionResult) {
        let Some(validation) = &result.validation else {
            debug!(model = self.kind.as_str(), "ignoring unvalidated feedback");
            return;
        };
        let mut state = self.state.write();
        if !state.trained {
            return;
        }
        let context_key = self.kind.live_key(&result.weather, &result.user);

        let wrong_key = entry_key(&context_key, result.predicted);
        let wrong = state.table.entry(wrong_key).or_insert(0.0);
        *wrong = (*wrong - LEARNING_RATE * 0.05).max(0.0);

        let correct_key = entry_key(&context_key, validation.actual);
        *state.table.entry(correct_key).or_insert(0.0) += LEARNING_RATE * 0.05;
    }

    /// Snapshot of the learned channel weights
    pub fn channel_weights(&self) -> HashMap<String, f64> {
        self.state.read().weights.clone()
    }

    /// Snapshot of the learned frequency table
    pub fn frequency_table(&self) -> HashMap<String, f64> {
        self.state.read().table.clone()
    }

    /// Serialize model state to JSON
    pub fn save_state(&self) -> Result<String, PredictError> {
        serde_json::to_string(&*self.state.read()).map_err(PredictError::from)
    }

    /// Replace model state from JSON produced by `save_state`
    pub fn load_state(&self, json: &str) -> Result<(), PredictError> {
        let state: ModelState =
            serde_json::from_str(json).map_err(|e| PredictError::ParseError(e.to_string()))?;
        *self.state.write() = state;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    const EPSILON: f64 = 1e-9;

    /// Records alternating between an active clear-sky profile and a
    /// sedentary rainy profile, one per day.
    fn make_records(count: usize) -> Vec<DailyRecord> {
        (0..count)
            .map(|i| {
                let active = i % 2 == 0;
                DailyRecord {
                    date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
                        + chrono::Duration::days(i as i64),
                    steps: if active { 14_000 } else { 2_000 },
                    active_minutes: if active { 80 } else { 15 },
                    screen_time_minutes: if active { 60 } else { 420 },
                    places_visited: 1,
                    photo_count: 2,
                    productivity_score: 40.0,
                    temperature: if active { 22.0 } else { 12.0 },
                    humidity: 55.0,
                    weather_condition: if active { "clear sky" } else { "light rain" }.to_string(),
                    season: "summer".to_string(),
                }
            })
            .collect()
    }

    fn validated_result(
        predicted: ActivityType,
        actual: ActivityType,
    ) -> PredictionResult {
        let mut result = PredictionResult {
            id: Uuid::new_v4(),
            target_time: Utc::now(),
            weather: WeatherContext::default(),
            user: UserContext::default(),
            predicted,
            confidence: 0.7,
            alternatives: vec![],
            feature_importance: HashMap::new(),
            reasoning: String::new(),
            method: "test".to_string(),
            produced_by: "test".to_string(),
            validation: None,
        };
        result.validate(actual);
        result
    }

    #[test]
    fn test_untrained_predict_is_uniform() {
        let model = PatternModel::new(ModelKind::Weather);
        let scores = model.predict(&WeatherContext::default(), &UserContext::default());

        assert_eq!(scores.len(), 10);
        for activity in ActivityType::ALL {
            assert!((scores[&activity] - 0.1).abs() < EPSILON);
        }
    }

    #[test]
    fn test_insufficient_samples_stays_untrained() {
        let model = PatternModel::new(ModelKind::UserBehavior);
        let records = make_records(ModelKind::UserBehavior.min_samples() - 1);

        model.train(&records).unwrap();
        assert!(!model.is_trained());
    }

    #[test]
    fn test_trained_table_sums_to_one() {
        let model = PatternModel::new(ModelKind::Weather);
        model.train(&make_records(30)).unwrap();
        assert!(model.is_trained());

        let total: f64 = model.frequency_table().values().sum();
        assert!((total - 1.0).abs() < 1e-6, "table sums to {total}");
    }

    #[test]
    fn test_trained_weights_normalized_and_non_negative() {
        for kind in [
            ModelKind::Weather,
            ModelKind::UserBehavior,
            ModelKind::ActivitySequence,
        ] {
            let model = PatternModel::new(kind);
            model.train(&make_records(30)).unwrap();

            let weights = model.channel_weights();
            assert_eq!(weights.len(), 5);
            let total: f64 = weights.values().sum();
            assert!((total - 1.0).abs() < 1e-6, "{} weights sum to {total}", kind.as_str());
            for (name, weight) in &weights {
                assert!(*weight >= 0.0, "{name} weight negative");
            }
        }
    }

    #[test]
    fn test_weather_keys_carry_humidity_level() {
        let model = PatternModel::new(ModelKind::Weather);
        let mut records = make_records(30);
        for (i, record) in records.iter_mut().enumerate() {
            record.humidity = if i % 2 == 0 { 30.0 } else { 80.0 };
        }
        model.train(&records).unwrap();

        let table = model.frequency_table();
        assert!(table.keys().any(|k| k.contains("|low|")));
        assert!(table.keys().any(|k| k.contains("|high|")));

        // Live keys quantize humidity the same way as training keys
        let weather = WeatherContext {
            humidity: 30.0,
            ..WeatherContext::default()
        };
        let key = ModelKind::Weather.live_key(&weather, &UserContext::default());
        assert!(key.contains("|low|"), "live key was {key}");
    }

    #[test]
    fn test_load_state_rejects_malformed_json() {
        let model = PatternModel::new(ModelKind::Weather);
        let err = model.load_state("not json").unwrap_err();
        assert!(matches!(err, PredictError::ParseError(_)));
        assert!(!model.is_trained());
    }

    #[test]
    fn test_sequence_model_builds_transition_keys() {
        let model = PatternModel::new(ModelKind::ActivitySequence);
        let mut records = make_records(30);
        // Force a >5 degree warming jump between the first two days
        records[0].temperature = 10.0;
        records[1].temperature = 18.0;
        model.train(&records).unwrap();

        let table = model.frequency_table();
        assert!(
            table.keys().any(|k| k.contains("|warming|")),
            "expected a warming transition key, got {:?}",
            table.keys().collect::<Vec<_>>()
        );
        assert!(table.keys().any(|k| k.contains("|stable|")));
    }

    #[test]
    fn test_positive_feedback_bumps_entry() {
        let model = PatternModel::new(ModelKind::Weather);
        model.train(&make_records(30)).unwrap();

        let result = validated_result(ActivityType::Relaxation, ActivityType::Relaxation);
        let key_fragment = ActivityType::Relaxation.as_str();
        let before: f64 = model
            .frequency_table()
            .iter()
            .filter(|(k, _)| k.ends_with(key_fragment))
            .map(|(_, v)| *v)
            .sum();

        model.reinforce_positive(&result);

        let after: f64 = model
            .frequency_table()
            .iter()
            .filter(|(k, _)| k.ends_with(key_fragment))
            .map(|(_, v)| *v)
            .sum();
        assert!((after - before - LEARNING_RATE * 0.1).abs() < EPSILON);
    }

    #[test]
    fn test_negative_feedback_shifts_mass() {
        let model = PatternModel::new(ModelKind::Weather);
        model.train(&make_records(30)).unwrap();

        let result = validated_result(ActivityType::Travel, ActivityType::Relaxation);
        model.adjust_negative(&result);

        let table = model.frequency_table();
        let context_key = ModelKind::Weather.live_key(&result.weather, &result.user);
        let correct = table
            .get(&entry_key(&context_key, ActivityType::Relaxation))
            .copied()
            .unwrap_or(0.0);
        assert!((correct - LEARNING_RATE * 0.05).abs() < EPSILON || correct > LEARNING_RATE * 0.05);
    }

    #[test]
    fn test_feedback_noop_when_untrained() {
        let model = PatternModel::new(ModelKind::Weather);
        let result = validated_result(ActivityType::Travel, ActivityType::Travel);

        model.reinforce_positive(&result);
        model.adjust_negative(&result);

        assert!(model.frequency_table().is_empty());
    }

    #[test]
    fn test_feedback_noop_when_unvalidated() {
        let model = PatternModel::new(ModelKind::Weather);
        model.train(&make_records(30)).unwrap();
        let table_before = model.frequency_table();

        let mut result = validated_result(ActivityType::Travel, ActivityType::Travel);
        result.validation = None;
        model.reinforce_positive(&result);

        assert_eq!(model.frequency_table(), table_before);
    }

    #[test]
    fn test_state_round_trip() {
        let model = PatternModel::new(ModelKind::UserBehavior);
        model.train(&make_records(20)).unwrap();

        let json = model.save_state().unwrap();
        let restored = PatternModel::new(ModelKind::UserBehavior);
        restored.load_state(&json).unwrap();

        assert!(restored.is_trained());
        assert_eq!(restored.sample_count(), model.sample_count());
        assert_eq!(restored.frequency_table(), model.frequency_table());
    }

    #[test]
    fn test_train_rejected_while_training_flag_held() {
        let model = PatternModel::new(ModelKind::Weather);
        model.training.store(true, Ordering::SeqCst);

        let err = model.train(&make_records(30)).unwrap_err();
        assert!(matches!(err, PredictError::TrainingInProgress(_)));
        assert!(!model.is_trained());
    }

    #[test]
    fn test_retrain_replaces_state() {
        let model = PatternModel::new(ModelKind::Weather);
        model.train(&make_records(30)).unwrap();
        let result = validated_result(ActivityType::Relaxation, ActivityType::Relaxation);
        model.reinforce_positive(&result);

        // Retraining renormalizes away any feedback drift
        model.train(&make_records(30)).unwrap();
        let total: f64 = model.frequency_table().values().sum();
        assert!((total - 1.0).abs() < 1e-6);
    }
}
