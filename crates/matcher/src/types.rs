use index::IndexError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ranking knobs for [`crate::Matcher`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum cosine similarity for a candidate to be returned.
    pub threshold: f32,
    /// Maximum number of distinct individuals returned.
    pub max_results: usize,
    /// Neighbours examined before per-individual deduplication is
    /// `max_results * oversample_factor`, capped by the catalog size.
    pub oversample_factor: usize,
    /// Decimal digits kept in returned scores.
    pub score_decimals: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            max_results: 5,
            oversample_factor: 4,
            score_decimals: 4,
        }
    }
}

impl MatchConfig {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if !self.threshold.is_finite() {
            return Err(MatchError::InvalidConfig(
                "threshold must be finite".into(),
            ));
        }
        if self.max_results == 0 {
            return Err(MatchError::InvalidConfig(
                "max_results must be greater than zero".into(),
            ));
        }
        if self.oversample_factor == 0 {
            return Err(MatchError::InvalidConfig(
                "oversample_factor must be >= 1".into(),
            ));
        }
        if self.score_decimals > 7 {
            return Err(MatchError::InvalidConfig(
                "score_decimals must be <= 7".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn neighbour_budget(&self, catalog_size: usize) -> usize {
        (self.max_results * self.oversample_factor).min(catalog_size)
    }
}

/// One ranked individual.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub individual_id: String,
    pub display_name: String,
    pub score: f32,
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    /// The query vector width differs from the catalog's.
    #[error("query has {actual} components, catalog expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("index error: {0}")]
    Index(#[from] IndexError),
}

impl MatchError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, MatchError::DimensionMismatch { .. })
    }
}
