//! Core types for the Nextmove prediction ensemble
//!
//! This module defines the data structures that flow through the engine:
//! daily behavioral records, the closed activity enumeration, and the
//! prediction results produced by the ensemble.

use crate::context::{UserContext, WeatherContext};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One day of behavioral and environmental signals.
///
/// Produced by an external collection pipeline; the prediction core treats
/// records as immutable input and never writes them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    /// Calendar date this record covers
    pub date: NaiveDate,
    /// Total step count
    pub steps: u32,
    /// Active minutes
    pub active_minutes: u32,
    /// Screen time (minutes)
    pub screen_time_minutes: u32,
    /// Number of distinct places visited
    pub places_visited: u32,
    /// Number of photos taken
    pub photo_count: u32,
    /// Productivity score (0-100)
    pub productivity_score: f64,
    /// Average temperature (celsius)
    pub temperature: f64,
    /// Average humidity (percentage, 0-100)
    pub humidity: f64,
    /// Free-text weather condition as reported by the provider
    pub weather_condition: String,
    /// Season label (e.g. "summer")
    pub season: String,
}

/// Activity classes the engine predicts.
///
/// The declaration order is the canonical total order: when two activities
/// tie on merged score, the one enumerated first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    OutdoorExercise,
    IndoorExercise,
    SocialActivity,
    WorkProductivity,
    Recreational,
    Relaxation,
    Travel,
    Photography,
    IndoorActivities,
    OutdoorLeisure,
}

impl ActivityType {
    /// All activity types in canonical order
    pub const ALL: [ActivityType; 10] = [
        ActivityType::OutdoorExercise,
        ActivityType::IndoorExercise,
        ActivityType::SocialActivity,
        ActivityType::WorkProductivity,
        ActivityType::Recreational,
        ActivityType::Relaxation,
        ActivityType::Travel,
        ActivityType::Photography,
        ActivityType::IndoorActivities,
        ActivityType::OutdoorLeisure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::OutdoorExercise => "outdoor_exercise",
            ActivityType::IndoorExercise => "indoor_exercise",
            ActivityType::SocialActivity => "social_activity",
            ActivityType::WorkProductivity => "work_productivity",
            ActivityType::Recreational => "recreational",
            ActivityType::Relaxation => "relaxation",
            ActivityType::Travel => "travel",
            ActivityType::Photography => "photography",
            ActivityType::IndoorActivities => "indoor_activities",
            ActivityType::OutdoorLeisure => "outdoor_leisure",
        }
    }

    /// Position in the canonical order (the tie-break order)
    pub fn canonical_index(self) -> usize {
        match self {
            ActivityType::OutdoorExercise => 0,
            ActivityType::IndoorExercise => 1,
            ActivityType::SocialActivity => 2,
            ActivityType::WorkProductivity => 3,
            ActivityType::Recreational => 4,
            ActivityType::Relaxation => 5,
            ActivityType::Travel => 6,
            ActivityType::Photography => 7,
            ActivityType::IndoorActivities => 8,
            ActivityType::OutdoorLeisure => 9,
        }
    }
}

/// Outcome of validating a prediction against the later-observed activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    /// Activity the user actually performed
    pub actual: ActivityType,
    /// Accuracy score for this prediction (0-1)
    pub accuracy: f64,
    /// When the validation was applied
    pub validated_at: DateTime<Utc>,
}

/// A completed prediction produced by the ensemble engine.
///
/// Immutable once created, except for a single `validate` call that attaches
/// the observed outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Unique prediction identifier
    pub id: Uuid,
    /// Time the prediction targets
    pub target_time: DateTime<Utc>,
    /// Weather snapshot the prediction was made from
    pub weather: WeatherContext,
    /// User snapshot the prediction was made from
    pub user: UserContext,
    /// Predicted activity
    pub predicted: ActivityType,
    /// Confidence in the prediction (0-1)
    pub confidence: f64,
    /// Up to 3 ranked alternatives, winner excluded
    pub alternatives: Vec<ActivityType>,
    /// Per-source contribution to the winning score
    pub feature_importance: HashMap<String, f64>,
    /// Human-readable reasoning text
    pub reasoning: String,
    /// Prediction method label (e.g. "ml_ensemble")
    pub method: String,
    /// Engine instance that produced this result
    pub produced_by: String,
    /// Validation outcome, once observed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
}

impl PredictionResult {
    /// Attach the observed activity to this prediction.
    ///
    /// Accuracy is binary: 1.0 on exact match, 0.0 otherwise. Calling
    /// `validate` on an already-validated result is a no-op.
    pub fn validate(&mut self, actual: ActivityType) {
        if self.validation.is_some() {
            return;
        }
        let accuracy = if actual == self.predicted { 1.0 } else { 0.0 };
        self.validation = Some(Validation {
            actual,
            accuracy,
            validated_at: Utc::now(),
        });
    }

    pub fn is_validated(&self) -> bool {
        self.validation.is_some()
    }

    /// Accuracy of this prediction, if validated
    pub fn accuracy(&self) -> Option<f64> {
        self.validation.as_ref().map(|v| v.accuracy)
    }
}
