//! Ensemble prediction engine
//!
//! Composes the three pattern models, the rule-based scorer, and the
//! historical correlation scorer into one merged activity score, with a
//! fingerprint-keyed cache in front. Source weights are fixed: the internal
//! ML sub-ensemble contributes only once all three models are trained, and
//! its weight is simply omitted (not renormalized) while they are not.

use crate::cache::{Fingerprint, PredictionCache};
use crate::context::{TimeOfDay, UserContext, WeatherContext};
use crate::correlation::CorrelationScorer;
use crate::error::PredictError;
use crate::model::{ModelKind, PatternModel};
use crate::quantize::canonical_condition;
use crate::rules::{ContextScorer, RuleScorer};
use crate::types::{ActivityType, DailyRecord, PredictionResult};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// External merge weight of the ML sub-ensemble
pub const ML_WEIGHT: f64 = 0.5;
/// External merge weight of the correlation scorer
pub const CORRELATION_WEIGHT: f64 = 0.3;
/// External merge weight of the rule scorer
pub const RULE_WEIGHT: f64 = 0.2;

/// Internal ML sub-ensemble weights (weather / behavior / sequence)
const WEATHER_MODEL_WEIGHT: f64 = 0.4;
const BEHAVIOR_MODEL_WEIGHT: f64 = 0.3;
const SEQUENCE_MODEL_WEIGHT: f64 = 0.3;

/// Method label when the ML sub-ensemble contributed
pub const METHOD_ML: &str = "ml_ensemble";
/// Method label when only the heuristic sources contributed
pub const METHOD_HEURISTIC: &str = "heuristic_ensemble";

/// Fixed time-of-day multiplier applied to the correlation scores
fn time_multiplier(time_of_day: TimeOfDay, activity: ActivityType) -> f64 {
    match (time_of_day, activity) {
        (TimeOfDay::Morning, ActivityType::OutdoorExercise | ActivityType::IndoorExercise) => 1.2,
        (TimeOfDay::Afternoon, ActivityType::WorkProductivity | ActivityType::Travel) => 1.2,
        (TimeOfDay::Evening, ActivityType::SocialActivity | ActivityType::Recreational) => 1.2,
        (TimeOfDay::Night, ActivityType::Relaxation | ActivityType::IndoorActivities) => 1.2,
        (
            TimeOfDay::Night,
            ActivityType::OutdoorExercise | ActivityType::OutdoorLeisure | ActivityType::Travel,
        ) => 0.6,
        _ => 1.0,
    }
}

/// Weighted multi-model prediction engine with caching
pub struct EnsembleEngine {
    instance_id: String,
    weather_model: Arc<PatternModel>,
    behavior_model: Arc<PatternModel>,
    sequence_model: Arc<PatternModel>,
    rule_scorer: Box<dyn ContextScorer>,
    correlation_scorer: Box<dyn ContextScorer>,
    cache: PredictionCache,
}

impl Default for EnsembleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EnsembleEngine {
    /// Create an engine with untrained models and default collaborator
    /// scorers (empty correlation table)
    pub fn new() -> Self {
        Self::with_scorers(
            Box::new(RuleScorer::new()),
            Box::new(CorrelationScorer::default()),
        )
    }

    /// Create an engine whose correlation scorer is built from historical
    /// records. Models stay untrained until `train_models` runs.
    pub fn with_history(records: &[DailyRecord]) -> Self {
        Self::with_scorers(
            Box::new(RuleScorer::new()),
            Box::new(CorrelationScorer::from_records(records)),
        )
    }

    /// Create an engine with substituted collaborator scorers
    pub fn with_scorers(
        rule_scorer: Box<dyn ContextScorer>,
        correlation_scorer: Box<dyn ContextScorer>,
    ) -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
            weather_model: Arc::new(PatternModel::new(ModelKind::Weather)),
            behavior_model: Arc::new(PatternModel::new(ModelKind::UserBehavior)),
            sequence_model: Arc::new(PatternModel::new(ModelKind::ActivitySequence)),
            rule_scorer,
            correlation_scorer,
            cache: PredictionCache::new(),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Handles to the three pattern models, for feedback wiring
    pub fn models(&self) -> [Arc<PatternModel>; 3] {
        [
            Arc::clone(&self.weather_model),
            Arc::clone(&self.behavior_model),
            Arc::clone(&self.sequence_model),
        ]
    }

    pub fn all_models_trained(&self) -> bool {
        self.weather_model.is_trained()
            && self.behavior_model.is_trained()
            && self.sequence_model.is_trained()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Train all three models synchronously from one record batch
    pub fn train_models(&self, records: &[DailyRecord]) -> Vec<(ModelKind, Result<(), PredictError>)> {
        self.models()
            .into_iter()
            .map(|model| (model.kind(), model.train(records)))
            .collect()
    }

    /// Fire-and-forget batch training on a background thread.
    ///
    /// Failures are logged and not retried; the engine keeps serving
    /// uniform-distribution predictions until training completes.
    pub fn train_models_background(&self, records: Vec<DailyRecord>) -> std::thread::JoinHandle<()> {
        let models = self.models();
        std::thread::spawn(move || {
            for model in models {
                if let Err(error) = model.train(&records) {
                    warn!(
                        model = model.kind().as_str(),
                        %error,
                        "background training failed"
                    );
                }
            }
        })
    }

    /// Build contexts from raw weather readings and predict
    pub fn predict_from_readings(
        &self,
        target_time: DateTime<Utc>,
        temperature: f64,
        humidity: f64,
        condition: &str,
        user: UserContext,
    ) -> PredictionResult {
        let weather = WeatherContext::at(target_time, temperature, humidity, condition);
        self.predict_activity(target_time, weather, user)
    }

    /// Predict the most likely activity for the target time.
    ///
    /// A live cache entry for the request fingerprint is returned unchanged;
    /// otherwise the merged score is computed from whichever sources are
    /// available, the winner selected (ties broken by canonical activity
    /// order), and the result cached.
    pub fn predict_activity(
        &self,
        target_time: DateTime<Utc>,
        weather: WeatherContext,
        user: UserContext,
    ) -> PredictionResult {
        let fingerprint = Fingerprint::new(target_time, &weather);
        if let Some(hit) = self.cache.lookup(&fingerprint, Utc::now()) {
            return hit;
        }

        let ml = self.ml_scores(&weather, &user);

        let mut correlation = self.correlation_scorer.score(&weather, &user);
        for (activity, score) in correlation.iter_mut() {
            *score *= time_multiplier(weather.time_of_day, *activity);
        }

        let rules = self.rule_scorer.score(&weather, &user);

        let mut merged: HashMap<ActivityType, f64> = HashMap::new();
        for activity in ActivityType::ALL {
            let mut score = CORRELATION_WEIGHT
                * correlation.get(&activity).copied().unwrap_or(0.0)
                + RULE_WEIGHT * rules.get(&activity).copied().unwrap_or(0.0);
            if let Some(ml_scores) = &ml {
                score += ML_WEIGHT * ml_scores.get(&activity).copied().unwrap_or(0.0);
            }
            merged.insert(activity, score);
        }

        // Argmax in canonical order: strictly greater replaces, so ties go
        // to the earlier activity.
        let mut winner = ActivityType::ALL[0];
        let mut best = f64::NEG_INFINITY;
        for activity in ActivityType::ALL {
            let score = merged.get(&activity).copied().unwrap_or(0.0);
            if score > best {
                best = score;
                winner = activity;
            }
        }
        let confidence = best.clamp(0.0, 1.0);

        let mut ranked: Vec<(ActivityType, f64)> = ActivityType::ALL
            .iter()
            .filter(|a| **a != winner)
            .map(|a| (*a, merged.get(a).copied().unwrap_or(0.0)))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.canonical_index().cmp(&b.0.canonical_index()))
        });
        let alternatives: Vec<ActivityType> = ranked.iter().take(3).map(|(a, _)| *a).collect();

        let mut feature_importance = HashMap::new();
        if let Some(ml_scores) = &ml {
            feature_importance.insert(
                "ml_models".to_string(),
                ML_WEIGHT * ml_scores.get(&winner).copied().unwrap_or(0.0),
            );
        }
        feature_importance.insert(
            self.correlation_scorer.name().to_string(),
            CORRELATION_WEIGHT * correlation.get(&winner).copied().unwrap_or(0.0),
        );
        feature_importance.insert(
            self.rule_scorer.name().to_string(),
            RULE_WEIGHT * rules.get(&winner).copied().unwrap_or(0.0),
        );

        let method = if ml.is_some() { METHOD_ML } else { METHOD_HEURISTIC };
        debug!(
            predicted = winner.as_str(),
            confidence,
            method,
            "prediction computed"
        );

        let reasoning = reasoning_text(confidence, winner, &weather);
        let result = PredictionResult {
            id: Uuid::new_v4(),
            target_time,
            weather,
            user,
            predicted: winner,
            confidence,
            alternatives,
            feature_importance,
            reasoning,
            method: method.to_string(),
            produced_by: self.instance_id.clone(),
            validation: None,
        };

        self.cache.insert(fingerprint, result.clone());
        result
    }

    /// Internal ML sub-ensemble over the three pattern models.
    ///
    /// Computed only when all three are trained; otherwise the ML source is
    /// unavailable and its merge weight is omitted.
    fn ml_scores(
        &self,
        weather: &WeatherContext,
        user: &UserContext,
    ) -> Option<HashMap<ActivityType, f64>> {
        if !self.all_models_trained() {
            return None;
        }

        let weather_scores = self.weather_model.predict(weather, user);
        let behavior_scores = self.behavior_model.predict(weather, user);
        let sequence_scores = self.sequence_model.predict(weather, user);

        Some(
            ActivityType::ALL
                .iter()
                .map(|activity| {
                    let score = WEATHER_MODEL_WEIGHT
                        * weather_scores.get(activity).copied().unwrap_or(0.0)
                        + BEHAVIOR_MODEL_WEIGHT
                            * behavior_scores.get(activity).copied().unwrap_or(0.0)
                        + SEQUENCE_MODEL_WEIGHT
                            * sequence_scores.get(activity).copied().unwrap_or(0.0);
                    (*activity, score)
                })
                .collect(),
        )
    }
}

/// Templated reasoning text from confidence tiers plus temperature and
/// condition clauses. The clauses come from the result's own snapshot so
/// the text stays consistent with the cached prediction.
fn reasoning_text(confidence: f64, winner: ActivityType, weather: &WeatherContext) -> String {
    let tier = if confidence > 0.8 {
        "High confidence"
    } else if confidence > 0.6 {
        "Moderate confidence"
    } else {
        "Low confidence"
    };
    let temperature = if weather.temperature < 0.0 {
        "freezing"
    } else if weather.temperature < 10.0 {
        "cold"
    } else if weather.temperature <= 25.0 {
        "mild"
    } else {
        "hot"
    };
    format!(
        "{tier} that {} fits {} {:.1}\u{b0}C conditions ({}).",
        winner.as_str(),
        temperature,
        weather.temperature,
        canonical_condition(&weather.condition)
    )
}
