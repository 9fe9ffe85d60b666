use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::OptionsError;

/// How a three-way comparison pairs its documents.
///
/// Without a base document both modes degrade to a two-way comparison of
/// `input1` against `input2`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    /// Diff `base → input1` and `base → input2` independently.
    #[default]
    Split,
    /// Diff `base → input1`, then `input1 → input2`.
    Sequential,
}

impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Split => f.write_str("split"),
            Self::Sequential => f.write_str("sequential"),
        }
    }
}

impl FromStr for CompareMode {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "split" => Ok(Self::Split),
            "sequential" => Ok(Self::Sequential),
            other => Err(OptionsError::UnknownMode(other.to_string())),
        }
    }
}

const DEFAULT_BUDGET_MS: u64 = 100;

/// Configuration knobs for conflict detection and merge building.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectOptions {
    mode: CompareMode,
    budget_ms: u64,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self { mode: CompareMode::Split, budget_ms: DEFAULT_BUDGET_MS }
    }
}

impl DetectOptions {
    /// Returns the configured comparison mode.
    ///
    /// ```
    /// # use jsm_core::{CompareMode, DetectOptions};
    /// let opts = DetectOptions::default().with_mode(CompareMode::Sequential);
    /// assert_eq!(opts.mode(), CompareMode::Sequential);
    /// ```
    #[must_use]
    pub fn mode(&self) -> CompareMode {
        self.mode
    }

    /// Latency above which a computation logs a performance warning.
    ///
    /// ```
    /// # use jsm_core::DetectOptions;
    /// assert_eq!(DetectOptions::default().budget().as_millis(), 100);
    /// ```
    #[must_use]
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }

    /// Sets the comparison mode.
    #[must_use]
    pub fn with_mode(mut self, mode: CompareMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the soft latency budget.
    ///
    /// ```
    /// # use std::time::Duration;
    /// # use jsm_core::{DetectOptions, OptionsError};
    /// let opts = DetectOptions::default().with_budget(Duration::from_millis(250))?;
    /// assert_eq!(opts.budget(), Duration::from_millis(250));
    /// assert_eq!(
    ///     DetectOptions::default().with_budget(Duration::ZERO).unwrap_err(),
    ///     OptionsError::ZeroBudget
    /// );
    /// # Ok::<(), OptionsError>(())
    /// ```
    pub fn with_budget(mut self, budget: Duration) -> Result<Self, OptionsError> {
        self.budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), OptionsError> {
        if self.budget_ms == 0 {
            return Err(OptionsError::ZeroBudget);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Sequential".parse::<CompareMode>().unwrap(), CompareMode::Sequential);
        assert_eq!(" split ".parse::<CompareMode>().unwrap(), CompareMode::Split);
        assert_eq!(
            "merge".parse::<CompareMode>().unwrap_err(),
            OptionsError::UnknownMode("merge".to_string())
        );
    }

    #[test]
    fn sub_millisecond_budget_is_rejected() {
        let err = DetectOptions::default().with_budget(Duration::from_micros(10)).unwrap_err();
        assert_eq!(err, OptionsError::ZeroBudget);
    }

    #[test]
    fn options_serialize_with_lowercase_mode() {
        let opts = DetectOptions::default().with_mode(CompareMode::Sequential);
        let json = serde_json::to_string(&opts).unwrap();
        assert_eq!(json, "{\"mode\":\"sequential\",\"budget_ms\":100}");
    }
}
