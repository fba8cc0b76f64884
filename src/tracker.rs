//! Accuracy tracking and the feedback loop
//!
//! Consumes validated predictions, maintains a bounded history plus running
//! accuracy aggregates grouped by method, activity, weather condition, and
//! time-of-day slot, and dispatches reinforcement or adjustment feedback
//! back into the pattern models.

use crate::context::TimeOfDay;
use crate::error::PredictError;
use crate::model::PatternModel;
use crate::quantize::canonical_condition;
use crate::types::{ActivityType, PredictionResult};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Maximum validated predictions retained for trend queries
pub const HISTORY_CAPACITY: usize = 1000;

/// Rolling accuracy window in days
const ROLLING_WINDOW_DAYS: i64 = 30;

/// Number of daily trend buckets
const DAILY_TREND_BUCKETS: usize = 14;

/// Number of weekly trend buckets
const WEEKLY_TREND_BUCKETS: usize = 8;

/// Feedback dispatch threshold: at or above reinforces, below adjusts
const FEEDBACK_THRESHOLD: f64 = 0.5;

/// Running (sum, count) accuracy aggregate
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct RunningAccuracy {
    sum: f64,
    count: u64,
}

impl RunningAccuracy {
    fn record(&mut self, accuracy: f64) {
        self.sum += accuracy;
        self.count += 1;
    }

    fn value(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// One validated prediction as retained in the history buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryEntry {
    recorded_at: DateTime<Utc>,
    accuracy: f64,
    method: String,
    predicted: ActivityType,
    actual: ActivityType,
    condition: String,
    time_slot: TimeOfDay,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TrackerState {
    history: VecDeque<HistoryEntry>,
    overall: RunningAccuracy,
    by_method: HashMap<String, RunningAccuracy>,
    by_activity: HashMap<ActivityType, RunningAccuracy>,
    missed_by_activity: HashMap<ActivityType, u64>,
    by_condition: HashMap<String, RunningAccuracy>,
    by_time_slot: HashMap<TimeOfDay, RunningAccuracy>,
}

/// Accuracy summary across all grouping dimensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyStatistics {
    /// Overall accuracy (sum/count over everything recorded)
    pub overall: f64,
    /// Accuracy over entries recorded in the last 30 days
    pub rolling_30_day: f64,
    /// Total validated predictions recorded
    pub sample_count: u64,
    pub by_method: HashMap<String, f64>,
    pub by_activity: HashMap<ActivityType, f64>,
    /// Times an activity was the observed outcome of a wrong prediction
    pub missed_by_activity: HashMap<ActivityType, u64>,
    pub by_condition: HashMap<String, f64>,
    pub by_time_slot: HashMap<TimeOfDay, f64>,
}

/// Fixed-length accuracy series, oldest to newest; empty buckets are 0
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyTrends {
    /// One bucket per day, 14 days
    pub daily: Vec<f64>,
    /// One bucket per week, 8 weeks
    pub weekly: Vec<f64>,
}

/// Tracks prediction accuracy and closes the feedback loop into the models
pub struct AccuracyTracker {
    state: RwLock<TrackerState>,
    models: Vec<Arc<PatternModel>>,
}

impl AccuracyTracker {
    /// Create a tracker that feeds validated outcomes back into the given
    /// models (normally the engine's three pattern models)
    pub fn new(models: Vec<Arc<PatternModel>>) -> Self {
        Self {
            state: RwLock::new(TrackerState::default()),
            models,
        }
    }

    /// Record a validated prediction.
    ///
    /// Unvalidated results are ignored. On each recorded result the tracker
    /// dispatches positive or negative feedback to every wired model.
    pub fn record_prediction_accuracy(&self, result: &PredictionResult) {
        let Some(validation) = &result.validation else {
            debug!("ignoring unvalidated prediction");
            return;
        };
        let accuracy = validation.accuracy;

        {
            let mut state = self.state.write();
            state.history.push_back(HistoryEntry {
                recorded_at: Utc::now(),
                accuracy,
                method: result.method.clone(),
                predicted: result.predicted,
                actual: validation.actual,
                condition: canonical_condition(&result.weather.condition).to_string(),
                time_slot: result.weather.time_of_day,
            });
            while state.history.len() > HISTORY_CAPACITY {
                state.history.pop_front();
            }

            state.overall.record(accuracy);
            state
                .by_method
                .entry(result.method.clone())
                .or_default()
                .record(accuracy);
            state
                .by_activity
                .entry(result.predicted)
                .or_default()
                .record(accuracy);
            if validation.actual != result.predicted {
                *state.missed_by_activity.entry(validation.actual).or_insert(0) += 1;
            }
            state
                .by_condition
                .entry(canonical_condition(&result.weather.condition).to_string())
                .or_default()
                .record(accuracy);
            state
                .by_time_slot
                .entry(result.weather.time_of_day)
                .or_default()
                .record(accuracy);
        }

        // Closing edge of the feedback loop
        for model in &self.models {
            if accuracy >= FEEDBACK_THRESHOLD {
                model.reinforce_positive(result);
            } else {
                model.adjust_negative(result);
            }
        }
    }

    pub fn history_len(&self) -> usize {
        self.state.read().history.len()
    }

    /// Accuracy across every grouping dimension
    pub fn accuracy_statistics(&self) -> AccuracyStatistics {
        let state = self.state.read();
        let now = Utc::now();

        let mut rolling = RunningAccuracy::default();
        for entry in &state.history {
            if (now - entry.recorded_at).num_days() < ROLLING_WINDOW_DAYS {
                rolling.record(entry.accuracy);
            }
        }

        AccuracyStatistics {
            overall: state.overall.value(),
            rolling_30_day: rolling.value(),
            sample_count: state.overall.count,
            by_method: state
                .by_method
                .iter()
                .map(|(k, v)| (k.clone(), v.value()))
                .collect(),
            by_activity: state
                .by_activity
                .iter()
                .map(|(k, v)| (*k, v.value()))
                .collect(),
            missed_by_activity: state.missed_by_activity.clone(),
            by_condition: state
                .by_condition
                .iter()
                .map(|(k, v)| (k.clone(), v.value()))
                .collect(),
            by_time_slot: state
                .by_time_slot
                .iter()
                .map(|(k, v)| (*k, v.value()))
                .collect(),
        }
    }

    /// Daily (14 buckets) and weekly (8 buckets) accuracy series computed
    /// from the history buffer, oldest to newest
    pub fn accuracy_trends(&self) -> AccuracyTrends {
        let state = self.state.read();
        let now = Utc::now();

        let mut daily = vec![RunningAccuracy::default(); DAILY_TREND_BUCKETS];
        let mut weekly = vec![RunningAccuracy::default(); WEEKLY_TREND_BUCKETS];

        for entry in &state.history {
            let days_ago = (now - entry.recorded_at).num_days();
            if days_ago >= 0 && (days_ago as usize) < DAILY_TREND_BUCKETS {
                daily[DAILY_TREND_BUCKETS - 1 - days_ago as usize].record(entry.accuracy);
            }
            let weeks_ago = days_ago / 7;
            if weeks_ago >= 0 && (weeks_ago as usize) < WEEKLY_TREND_BUCKETS {
                weekly[WEEKLY_TREND_BUCKETS - 1 - weeks_ago as usize].record(entry.accuracy);
            }
        }

        AccuracyTrends {
            daily: daily.iter().map(RunningAccuracy::value).collect(),
            weekly: weekly.iter().map(RunningAccuracy::value).collect(),
        }
    }

    /// Rule-based improvement suggestions derived from the aggregates
    pub fn improvement_suggestions(&self) -> Vec<String> {
        let stats = self.accuracy_statistics();
        let mut suggestions = Vec::new();

        if self.history_len() < 50 {
            suggestions.push(
                "Insufficient validated predictions for reliable statistics; keep collecting."
                    .to_string(),
            );
        }
        if stats.sample_count > 0 && stats.overall < 0.6 {
            suggestions.push(
                "Overall accuracy is below 0.6; the models need more training data.".to_string(),
            );
        }
        for (method, accuracy) in &stats.by_method {
            if *accuracy < 0.4 {
                suggestions.push(format!("Method '{method}' is underperforming (accuracy {accuracy:.2})."));
            }
        }
        for (activity, accuracy) in &stats.by_activity {
            if *accuracy < 0.4 {
                suggestions.push(format!(
                    "Predictions for {} are unreliable (accuracy {accuracy:.2}).",
                    activity.as_str()
                ));
            }
        }
        for (condition, accuracy) in &stats.by_condition {
            if *accuracy < 0.4 {
                suggestions.push(format!(
                    "Predictions under '{condition}' weather are unreliable (accuracy {accuracy:.2})."
                ));
            }
        }
        for (slot, accuracy) in &stats.by_time_slot {
            if *accuracy < 0.4 {
                suggestions.push(format!(
                    "Predictions in the {} slot are unreliable (accuracy {accuracy:.2}).",
                    slot.as_str()
                ));
            }
        }

        suggestions
    }

    /// Serialize tracker state to JSON
    pub fn save_state(&self) -> Result<String, PredictError> {
        serde_json::to_string(&*self.state.read()).map_err(PredictError::from)
    }

    /// Replace tracker state from JSON produced by `save_state`
    pub fn load_state(&self, json: &str) -> Result<(), PredictError> {
        let state: TrackerState =
            serde_json::from_str(json).map_err(|e| PredictError::ParseError(e.to_string()))?;
        *self.state.write() = state;
        Ok(())
    }
}
