//! Engine configuration.
//!
//! Solve limits, soft-constraint weights, and diagnostics bounds, loadable
//! from TOML so a deployment can retune the engine without code changes.
//!
//! ```
//! use u_timetable::config::TimetableConfig;
//! use std::time::Duration;
//!
//! let config = TimetableConfig::from_toml_str(r#"
//!     [limits]
//!     time_limit_ms = 5000
//!
//!     [weights]
//!     gap_penalties = [6, 6]
//!
//!     [[weights.period_penalties]]
//!     period = 1
//!     penalty = 8
//! "#).unwrap();
//!
//! assert_eq!(config.limits.time_limit(), Duration::from_secs(5));
//! assert_eq!(config.weights.gap_penalty(2), 6);
//! assert_eq!(config.weights.gap_penalty(3), 0);
//! assert_eq!(config.weights.period_penalty(1), 8);
//! assert_eq!(config.weights.preferred_slot_miss, 10);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimetableConfig {
    /// Solve limits.
    pub limits: SolveLimits,
    /// Soft-constraint weights.
    pub weights: SoftWeights,
    /// Infeasibility diagnostics bounds.
    pub diagnostics: DiagnosticsConfig,
}

impl TimetableConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file can't be read, contains invalid TOML, or
    /// holds out-of-range values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// Every weight and penalty must be non-negative: a negative weight
    /// rewards the rule it names and can leave the objective unbounded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(gap) = self.limits.optimality_gap {
            if !(0.0..1.0).contains(&gap) {
                return Err(ConfigError::Invalid(format!(
                    "optimality_gap must be in [0, 1), got {gap}"
                )));
            }
        }
        if let Some(p) = self.weights.period_penalties.iter().find(|p| p.period == 0) {
            return Err(ConfigError::Invalid(format!(
                "period penalties are 1-based, got period 0 with penalty {}",
                p.penalty
            )));
        }
        self.weights.check_signs()?;
        if self.diagnostics.max_trials == 0 {
            return Err(ConfigError::Invalid("max_trials must be at least 1".into()));
        }
        Ok(())
    }
}

/// Limits for one solver call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveLimits {
    /// Wall-clock budget in milliseconds. 0 = do not start the engine.
    pub time_limit_ms: u64,
    /// Target relative optimality gap.
    pub optimality_gap: Option<f64>,
    /// Return the first valid assignment instead of optimizing.
    pub stop_after_first: bool,
}

impl Default for SolveLimits {
    fn default() -> Self {
        Self {
            time_limit_ms: 30_000,
            optimality_gap: None,
            stop_after_first: false,
        }
    }
}

impl SolveLimits {
    /// Limits with the given budget.
    pub fn with_time_limit(time_limit_ms: u64) -> Self {
        Self {
            time_limit_ms,
            ..Self::default()
        }
    }

    /// Sets the optimality gap.
    pub fn with_gap(mut self, gap: f64) -> Self {
        self.optimality_gap = Some(gap);
        self
    }

    /// Stops at the first valid assignment.
    pub fn first_feasible(mut self) -> Self {
        self.stop_after_first = true;
        self
    }

    /// Budget as a duration.
    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }
}

/// Penalty for sessions held in one period of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodPenalty {
    /// 1-based period within the day.
    pub period: u32,
    /// Penalty per session.
    pub penalty: i64,
}

/// Soft-constraint weight table.
///
/// Relative priority between soft rules is expressed only through these
/// weights. A weight of 0 disables the rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftWeights {
    /// Per session outside the course's preferred slots.
    pub preferred_slot_miss: i64,
    /// Per session held in a penalized period.
    pub period_penalties: Vec<PeriodPenalty>,
    /// Per session on a group's requested free day.
    pub free_day: i64,
    /// Per idle stretch between two sessions of a group within a day,
    /// indexed by its length in periods minus one. Longer stretches are free.
    pub gap_penalties: Vec<i64>,
    /// Per idle stretch between two teaching days of a teacher who avoids
    /// them, indexed by its length in days minus one.
    pub day_gap_penalties: Vec<i64>,
    /// Per teacher teaching on the first study day choice.
    pub study_day_miss: i64,
    /// Per session above the even daily share of a teacher or group.
    pub uneven_load: i64,
}

impl Default for SoftWeights {
    fn default() -> Self {
        Self {
            preferred_slot_miss: 10,
            period_penalties: vec![
                PeriodPenalty { period: 1, penalty: 2 },
                PeriodPenalty { period: 5, penalty: 3 },
                PeriodPenalty { period: 6, penalty: 5 },
            ],
            free_day: 9,
            gap_penalties: vec![3, 4, 4, 3],
            day_gap_penalties: vec![18, 30, 18],
            study_day_miss: 30,
            uneven_load: 4,
        }
    }
}

impl SoftWeights {
    /// All soft rules switched off.
    pub fn disabled() -> Self {
        Self {
            preferred_slot_miss: 0,
            period_penalties: Vec::new(),
            free_day: 0,
            gap_penalties: Vec::new(),
            day_gap_penalties: Vec::new(),
            study_day_miss: 0,
            uneven_load: 0,
        }
    }

    /// Penalty per session in the given period (0 if not penalized).
    pub fn period_penalty(&self, period: u32) -> i64 {
        self.period_penalties
            .iter()
            .filter(|p| p.period == period)
            .map(|p| p.penalty)
            .sum()
    }

    /// Penalty for `len` idle periods between two group sessions.
    pub fn gap_penalty(&self, len: usize) -> i64 {
        nth_penalty(&self.gap_penalties, len)
    }

    /// Penalty for `len` idle days between two teaching days.
    pub fn day_gap_penalty(&self, len: usize) -> i64 {
        nth_penalty(&self.day_gap_penalties, len)
    }

    fn check_signs(&self) -> Result<(), ConfigError> {
        let scalars = [
            ("preferred_slot_miss", self.preferred_slot_miss),
            ("free_day", self.free_day),
            ("study_day_miss", self.study_day_miss),
            ("uneven_load", self.uneven_load),
        ];
        let tables = [
            ("gap_penalties", &self.gap_penalties),
            ("day_gap_penalties", &self.day_gap_penalties),
        ];
        let negative = scalars
            .into_iter()
            .chain(
                tables
                    .into_iter()
                    .flat_map(|(name, t)| t.iter().map(move |&w| (name, w))),
            )
            .chain(
                self.period_penalties
                    .iter()
                    .map(|p| ("period_penalties", p.penalty)),
            )
            .find(|(_, w)| *w < 0);
        match negative {
            Some((name, w)) => Err(ConfigError::Invalid(format!(
                "weights must be non-negative, got {name} = {w}"
            ))),
            None => Ok(()),
        }
    }
}

/// 1-based lookup into a penalty table; 0 outside it.
fn nth_penalty(table: &[i64], len: usize) -> i64 {
    len.checked_sub(1)
        .and_then(|i| table.get(i))
        .copied()
        .unwrap_or(0)
}

/// Bounds for infeasibility diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Maximum number of feasibility trials.
    pub max_trials: usize,
    /// Budget per trial in milliseconds.
    pub trial_time_limit_ms: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            max_trials: 32,
            trial_time_limit_ms: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = TimetableConfig::default();
        assert_eq!(c.limits.time_limit(), Duration::from_secs(30));
        assert_eq!(c.weights.period_penalty(6), 5);
        assert_eq!(c.weights.period_penalty(3), 0);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let c = TimetableConfig::from_toml_str("").unwrap();
        assert_eq!(c, TimetableConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let c = TimetableConfig::from_toml_str(
            r#"
            [limits]
            stop_after_first = true

            [diagnostics]
            max_trials = 4
            "#,
        )
        .unwrap();
        assert!(c.limits.stop_after_first);
        assert_eq!(c.limits.time_limit_ms, 30_000);
        assert_eq!(c.diagnostics.max_trials, 4);
        assert_eq!(c.diagnostics.trial_time_limit_ms, 5_000);
    }

    #[test]
    fn test_invalid_values() {
        let gap = TimetableConfig::from_toml_str("[limits]\noptimality_gap = 1.5");
        assert!(matches!(gap, Err(ConfigError::Invalid(_))));

        let trials = TimetableConfig::from_toml_str("[diagnostics]\nmax_trials = 0");
        assert!(matches!(trials, Err(ConfigError::Invalid(_))));

        let period = TimetableConfig::from_toml_str(
            "[[weights.period_penalties]]\nperiod = 0\npenalty = 1",
        );
        assert!(matches!(period, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_negative_weights_rejected() {
        let load = TimetableConfig::from_toml_str("[weights]\nuneven_load = -1");
        match load {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("uneven_load")),
            other => panic!("expected invalid config, got {other:?}"),
        }

        for toml in [
            "[weights]\npreferred_slot_miss = -10",
            "[weights]\nfree_day = -1",
            "[weights]\nstudy_day_miss = -30",
            "[weights]\ngap_penalties = [3, -4]",
            "[weights]\nday_gap_penalties = [-18]",
            "[[weights.period_penalties]]\nperiod = 1\npenalty = -2",
        ] {
            assert!(
                matches!(TimetableConfig::from_toml_str(toml), Err(ConfigError::Invalid(_))),
                "accepted {toml}"
            );
        }

        let mut c = TimetableConfig::default();
        c.weights.gap_penalties = vec![0, 0];
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_graded_penalties() {
        let w = SoftWeights::default();
        assert_eq!(w.gap_penalty(0), 0);
        assert_eq!(w.gap_penalty(1), 3);
        assert_eq!(w.gap_penalty(2), 4);
        assert_eq!(w.gap_penalty(4), 3);
        assert_eq!(w.gap_penalty(5), 0);
        assert_eq!(w.day_gap_penalty(2), 30);
    }

    #[test]
    fn test_bad_toml() {
        let r = TimetableConfig::from_toml_str("[limits\n");
        assert!(matches!(r, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_missing_file() {
        let r = TimetableConfig::load("/nonexistent/u-timetable.toml");
        assert!(matches!(r, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_disabled_weights() {
        let w = SoftWeights::disabled();
        assert_eq!(w.period_penalty(1), 0);
        assert_eq!(w.gap_penalty(1), 0);
        assert_eq!(w.study_day_miss, 0);
    }

    #[test]
    fn test_limits_builder() {
        let l = SolveLimits::with_time_limit(250).with_gap(0.05).first_feasible();
        assert_eq!(l.time_limit(), Duration::from_millis(250));
        assert_eq!(l.optimality_gap, Some(0.05));
        assert!(l.stop_after_first);
    }
}
