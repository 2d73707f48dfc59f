//! FeatureConfig rule kind: symptom severity weights, body-system
//! categories, and diet keywords used by feature engineering.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::metadata::CommonMetadata;

/// Body-system categories counted by `symptom_diversity`.
pub const SYMPTOM_CATEGORIES: [&str; 5] = [
    "respiratory",
    "neurological",
    "cardiovascular",
    "gastrointestinal",
    "general",
];

// ── YAML-level types ────────────────────────────────────────────────

/// Top-level FeatureConfig rule document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FeatureConfigRule {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub spec: FeatureConfigSpec,
}

/// Specification section of a FeatureConfig rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FeatureConfigSpec {
    /// Symptom label → severity weight (matched case-insensitively).
    pub symptom_weights: BTreeMap<String, f64>,
    /// Weight used for symptoms missing from `symptom_weights`.
    #[serde(default = "default_symptom_weight")]
    pub default_symptom_weight: f64,
    /// Category → substring keywords.
    pub symptom_categories: BTreeMap<String, Vec<String>>,
    /// Diet keywords that raise the diet score by one each.
    pub healthy_diet_keywords: Vec<String>,
    /// Diet keywords that lower the diet score by one each.
    pub unhealthy_diet_keywords: Vec<String>,
}

fn default_symptom_weight() -> f64 {
    5.0
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for FeatureConfigSpec {
    fn default() -> Self {
        let symptom_weights = [
            ("chest pain", 9.0),
            ("difficulty breathing", 9.0),
            ("shortness of breath", 8.0),
            ("fainting", 8.0),
            ("palpitations", 7.0),
            ("confusion", 7.0),
            ("high fever", 7.0),
            ("fever", 6.0),
            ("vomiting", 6.0),
            ("migraine", 6.0),
            ("dizziness", 5.0),
            ("abdominal pain", 5.0),
            ("diarrhea", 5.0),
            ("anxiety", 5.0),
            ("headache", 4.0),
            ("nausea", 4.0),
            ("joint pain", 4.0),
            ("back pain", 4.0),
            ("insomnia", 4.0),
            ("chills", 4.0),
            ("cough", 3.0),
            ("sore throat", 3.0),
            ("fatigue", 3.0),
            ("muscle aches", 3.0),
            ("rash", 3.0),
            ("congestion", 2.0),
            ("runny nose", 2.0),
            ("bloating", 2.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let symptom_categories = [
            (
                "respiratory",
                strings(&["cough", "breath", "wheez", "congestion", "throat", "runny nose", "sneez"]),
            ),
            (
                "neurological",
                strings(&["headache", "migraine", "dizz", "confusion", "numb", "faint", "seizure"]),
            ),
            (
                "cardiovascular",
                strings(&["chest", "palpitation", "heart", "blood pressure", "swelling"]),
            ),
            (
                "gastrointestinal",
                strings(&["nausea", "vomit", "diarrhea", "stomach", "abdominal", "constipation", "bloat"]),
            ),
            (
                "general",
                strings(&["fatigue", "fever", "weak", "chills", "ache", "pain", "tired"]),
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            symptom_weights,
            default_symptom_weight: default_symptom_weight(),
            symptom_categories,
            healthy_diet_keywords: strings(&[
                "vegetable", "fruit", "salad", "whole grain", "lean", "fish", "water", "nuts",
                "beans", "oat", "yogurt", "balanced",
            ]),
            unhealthy_diet_keywords: strings(&[
                "fast food", "fried", "sugar", "soda", "candy", "processed", "junk", "alcohol",
                "chips", "pizza", "burger", "dessert",
            ]),
        }
    }
}

impl FeatureConfigRule {
    /// Built-in feature lexicon.
    pub fn builtin() -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "FeatureConfig".to_string(),
            metadata: CommonMetadata::builtin("feature-config-default", "Default feature lexicon"),
            spec: FeatureConfigSpec::default(),
        }
    }

    /// Check structural constraints not expressible in serde.
    pub fn validate(&self) -> Result<(), String> {
        for category in SYMPTOM_CATEGORIES {
            match self.spec.symptom_categories.get(category) {
                Some(keywords) if !keywords.is_empty() => {}
                Some(_) => return Err(format!("category '{category}' has no keywords")),
                None => return Err(format!("missing symptom category '{category}'")),
            }
        }
        for name in self.spec.symptom_categories.keys() {
            if !SYMPTOM_CATEGORIES.contains(&name.as_str()) {
                return Err(format!("unknown symptom category '{name}'"));
            }
        }
        if let Some((symptom, w)) = self
            .spec
            .symptom_weights
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(format!("symptom '{symptom}' has invalid weight {w}"));
        }
        Ok(())
    }

    /// Compile the YAML config into lowercase lookup structures.
    pub fn compile(&self) -> CompiledFeatureConfig {
        let lower = |v: &[String]| v.iter().map(|s| s.to_lowercase()).collect::<Vec<_>>();

        let symptom_weights = self
            .spec
            .symptom_weights
            .iter()
            .map(|(k, v)| (k.to_lowercase(), *v))
            .collect();

        // Keep the fixed category order regardless of map ordering.
        let symptom_categories = SYMPTOM_CATEGORIES
            .iter()
            .filter_map(|name| {
                self.spec
                    .symptom_categories
                    .get(*name)
                    .map(|kw| (name.to_string(), lower(kw)))
            })
            .collect();

        CompiledFeatureConfig {
            symptom_weights,
            default_symptom_weight: self.spec.default_symptom_weight,
            symptom_categories,
            healthy_diet_keywords: lower(&self.spec.healthy_diet_keywords),
            unhealthy_diet_keywords: lower(&self.spec.unhealthy_diet_keywords),
        }
    }
}

// ── Compiled (hot-path) types ───────────────────────────────────────

/// Pre-compiled feature lexicon with lowercased keys.
#[derive(Debug, Clone)]
pub struct CompiledFeatureConfig {
    pub symptom_weights: HashMap<String, f64>,
    pub default_symptom_weight: f64,
    /// Categories in fixed order with their keywords.
    pub symptom_categories: Vec<(String, Vec<String>)>,
    pub healthy_diet_keywords: Vec<String>,
    pub unhealthy_diet_keywords: Vec<String>,
}

impl CompiledFeatureConfig {
    /// Severity weight for a symptom label.
    pub fn symptom_weight(&self, symptom: &str) -> f64 {
        self.symptom_weights
            .get(symptom.trim().to_lowercase().as_str())
            .copied()
            .unwrap_or(self.default_symptom_weight)
    }
}

impl Default for CompiledFeatureConfig {
    fn default() -> Self {
        FeatureConfigRule::builtin().compile()
    }
}
