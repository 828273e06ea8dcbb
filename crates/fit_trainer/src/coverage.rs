//! Rule-coverage check for a trained artifact
//!
//! Replays known-important points through the same request path the
//! prediction service uses and compares against the rule engine. A clean
//! report is the gate for shipping a new rule table.

use fitcheck_core::{FitLabel, FitRequest, InferenceService, RuleEngine};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::errors::TrainerError;
use crate::generator::{AnchorPoint, REFERENCE_BAND, REFERENCE_CUP, REFERENCE_HEIGHT_CM};

/// One point the trained model must agree with the rule on
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CoverageCase {
    pub category: String,
    pub size: u32,
    pub waist: f64,
    /// Hip value a client might send; the override discards it when waist > 0
    pub client_hips: Option<f64>,
    pub expected: FitLabel,
}

impl CoverageCase {
    pub fn new(engine: &RuleEngine, category: &str, size: u32, waist: f64) -> Self {
        Self {
            category: category.to_string(),
            size,
            waist,
            client_hips: None,
            expected: engine.classify(size, category, waist),
        }
    }

    pub fn request(&self) -> FitRequest {
        FitRequest {
            height: Some(REFERENCE_HEIGHT_CM),
            waist: Some(self.waist),
            hips: self.client_hips,
            bra_num: Some(REFERENCE_BAND),
            cup_size: Some(REFERENCE_CUP.to_string()),
            size: Some(self.size),
            category: Some(self.category.clone()),
            ..FitRequest::default()
        }
    }
}

impl fmt::Display for CoverageCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} size {} waist {:.1}", self.category, self.size, self.waist)?;
        if let Some(hips) = self.client_hips {
            write!(f, " (client hips {hips:.1})")?;
        }
        Ok(())
    }
}

/// Cases replayed after training, expectations from the rule engine
///
/// Covers every anchor, the same waist one size either side of it, the
/// centre of the fit band for every (category, size) whose standard waist
/// lies on the waist grid, and the reference scenarios.
pub fn default_cases(engine: &RuleEngine, anchors: &[AnchorPoint]) -> Vec<CoverageCase> {
    let grid = engine.table().grid;
    let mut cases: Vec<CoverageCase> = anchors
        .iter()
        .map(|a| CoverageCase::new(engine, &a.category, a.size, a.waist))
        .collect();

    for anchor in anchors {
        for size in [anchor.size.checked_sub(1), anchor.size.checked_add(1)]
            .into_iter()
            .flatten()
            .filter(|s| grid.sizes().contains(s))
        {
            cases.push(CoverageCase::new(engine, &anchor.category, size, anchor.waist));
        }
    }

    let categories: Vec<String> = engine
        .table()
        .tolerances
        .category_names()
        .map(str::to_string)
        .collect();
    let waist_range = f64::from(grid.min_waist)..=f64::from(grid.max_waist);
    for category in &categories {
        for size in grid.sizes() {
            let centre = engine.standard_waist(size);
            if waist_range.contains(&centre) {
                cases.push(CoverageCase::new(engine, category, size, centre));
            }
        }
    }

    for (category, size, waist) in [
        ("bottoms", 3, 78.0),
        ("bottoms", 4, 78.0),
        ("outerwear", 0, 67.0),
        ("bottoms", 0, 66.0),
    ] {
        cases.push(CoverageCase::new(engine, category, size, waist));
    }
    cases.push(CoverageCase {
        client_hips: Some(50.0),
        ..CoverageCase::new(engine, "bottoms", 4, 90.0)
    });

    let mut seen = Vec::new();
    cases.retain(|case| {
        let key = (
            case.category.clone(),
            case.size,
            case.waist.to_bits(),
            case.client_hips.map(f64::to_bits),
        );
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
    cases
}

#[derive(Clone, Debug, Serialize)]
pub struct CoverageOutcome {
    pub case: CoverageCase,
    pub predicted: FitLabel,
    /// Probability of the expected label
    pub confidence: f64,
    /// Hip value the model actually saw
    pub hips_used: f64,
}

impl CoverageOutcome {
    pub fn passed(&self) -> bool {
        self.predicted == self.case.expected
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CoverageReport {
    pub outcomes: Vec<CoverageOutcome>,
}

impl CoverageReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CoverageOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }

    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(CoverageOutcome::passed)
    }

    /// Emit one log line per case and a summary
    pub fn log(&self) {
        for outcome in &self.outcomes {
            if outcome.passed() {
                info!(
                    "  ok   {} -> {} ({:.1}%)",
                    outcome.case,
                    outcome.predicted,
                    outcome.confidence * 100.0
                );
            } else {
                warn!(
                    "  FAIL {} -> {} (expected {}, {:.1}%)",
                    outcome.case,
                    outcome.predicted,
                    outcome.case.expected,
                    outcome.confidence * 100.0
                );
            }
        }
        info!("Rule coverage: {}/{} cases pass", self.passed(), self.outcomes.len());
    }

    /// Write the report as pretty JSON
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), TrainerError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| TrainerError::Training(format!("Failed to encode report: {e}")))?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Predict every case through `service` and compare with its expected label
pub fn check_coverage(
    service: &InferenceService,
    cases: &[CoverageCase],
) -> Result<CoverageReport, TrainerError> {
    let mut outcomes = Vec::with_capacity(cases.len());
    for case in cases {
        let prediction = service.predict(&case.request())?;
        outcomes.push(CoverageOutcome {
            case: case.clone(),
            predicted: prediction.label,
            confidence: prediction.probabilities.get(case.expected),
            hips_used: prediction.measurement.hips,
        });
    }
    Ok(CoverageReport { outcomes })
}
