use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VitalsError;

/// A subject's self-report for one point in time.
///
/// Observations are supplied by the caller and never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthObservation {
    /// Symptom labels as reported (unordered, duplicates allowed).
    #[serde(default)]
    pub symptoms: Vec<String>,
    /// Self-rated severity, 1–10.
    pub severity: u8,
    /// Hours slept, 0–24.
    #[serde(alias = "sleep")]
    pub sleep_hours: f64,
    /// Self-rated stress, 1–10.
    pub stress: u8,
    /// Minutes of exercise.
    #[serde(alias = "exercise")]
    pub exercise_minutes: f64,
    /// Free-text diet description.
    #[serde(default)]
    pub diet: String,
    /// Free-text notes.
    #[serde(default)]
    pub notes: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthObservation {
    /// Observation with the given vitals, no symptoms or free text, stamped now.
    pub fn new(severity: u8, sleep_hours: f64, stress: u8, exercise_minutes: f64) -> Self {
        Self {
            symptoms: Vec::new(),
            severity,
            sleep_hours,
            stress,
            exercise_minutes,
            diet: String::new(),
            notes: String::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_symptoms<I, S>(mut self, symptoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symptoms = symptoms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_diet(mut self, diet: impl Into<String>) -> Self {
        self.diet = diet.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Check that every field lies in its documented range.
    pub fn validate(&self) -> Result<(), VitalsError> {
        if !(1..=10).contains(&self.severity) {
            return Err(VitalsError::InvalidObservation(format!(
                "severity {} outside 1..=10",
                self.severity
            )));
        }
        if !(1..=10).contains(&self.stress) {
            return Err(VitalsError::InvalidObservation(format!(
                "stress {} outside 1..=10",
                self.stress
            )));
        }
        if !self.sleep_hours.is_finite() || !(0.0..=24.0).contains(&self.sleep_hours) {
            return Err(VitalsError::InvalidObservation(format!(
                "sleep hours {} outside 0..=24",
                self.sleep_hours
            )));
        }
        if !self.exercise_minutes.is_finite() || self.exercise_minutes < 0.0 {
            return Err(VitalsError::InvalidObservation(format!(
                "exercise minutes {} must be non-negative",
                self.exercise_minutes
            )));
        }
        Ok(())
    }

    /// Parse a JSON array of observations and validate each entry.
    pub fn parse_batch(json: &str) -> Result<Vec<Self>, VitalsError> {
        let batch: Vec<Self> = serde_json::from_str(json)?;
        for (i, obs) in batch.iter().enumerate() {
            if let Err(VitalsError::InvalidObservation(msg)) = obs.validate() {
                return Err(VitalsError::InvalidObservation(format!("entry {i}: {msg}")));
            }
        }
        Ok(batch)
    }

    /// Read and parse a batch file, see [`HealthObservation::parse_batch`].
    pub fn load_batch(path: &Path) -> Result<Vec<Self>, VitalsError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_batch(&contents)
    }
}
