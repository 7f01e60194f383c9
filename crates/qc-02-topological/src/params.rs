//! # Consensus Parameters
//!
//! Immutable, validated sampling parameters. Overrides produce a new value;
//! nothing here is global or mutable after construction.
//!
//! ## Constraints
//!
//! | Field | Rule |
//! |-------|------|
//! | `k` | ≥ 1 |
//! | `alpha_preference` | k/2 < α_p ≤ k |
//! | `alpha_confidence` | α_p ≤ α_c ≤ k |
//! | `beta` | ≥ 1 |
//! | `concurrent_repolls` | 1 ≤ r ≤ β |
//! | `optimal_processing`, `max_outstanding_items` | ≥ 1 |
//! | `max_item_processing_time` | > 0 |

use crate::error::ParamsError;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::path::Path;
use std::time::Duration;

/// Sampling and liveness parameters for metastable consensus.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    /// Sample size per poll.
    pub k: usize,
    /// Votes required to change preference.
    pub alpha_preference: usize,
    /// Votes required for a poll to count toward confidence.
    pub alpha_confidence: usize,
    /// Consecutive successful polls required to accept.
    pub beta: usize,
    /// Polls kept in flight at once.
    pub concurrent_repolls: usize,
    /// Processing count below which the store reports healthy.
    pub optimal_processing: usize,
    /// Upper bound on blocks awaiting a decision.
    pub max_outstanding_items: usize,
    /// Longest a block may stay undecided before it is considered stuck.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub max_item_processing_time: Duration,
    /// Minimum spacing between poll rounds.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub min_round_interval: Duration,
}

impl Parameters {
    /// Production network profile.
    pub fn mainnet() -> Self {
        Self {
            k: 21,
            alpha_preference: 13,
            alpha_confidence: 18,
            beta: 8,
            concurrent_repolls: 4,
            optimal_processing: 10,
            max_outstanding_items: 369,
            max_item_processing_time: Duration::from_secs(9),
            min_round_interval: Duration::from_millis(200),
        }
    }

    /// Public test network profile.
    pub fn testnet() -> Self {
        Self {
            k: 11,
            alpha_preference: 7,
            alpha_confidence: 9,
            beta: 6,
            concurrent_repolls: 4,
            optimal_processing: 10,
            max_outstanding_items: 256,
            max_item_processing_time: Duration::from_secs(6),
            min_round_interval: Duration::from_millis(100),
        }
    }

    /// Small local network profile.
    pub fn local() -> Self {
        Self {
            k: 5,
            alpha_preference: 3,
            alpha_confidence: 4,
            beta: 3,
            concurrent_repolls: 2,
            optimal_processing: 10,
            max_outstanding_items: 256,
            max_item_processing_time: Duration::from_secs(3),
            min_round_interval: Duration::from_millis(50),
        }
    }

    /// Check every constraint.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.k == 0 {
            return Err(ParamsError::InvalidK);
        }
        if self.alpha_preference <= self.k / 2 || self.alpha_preference > self.k {
            return Err(ParamsError::InvalidAlphaPreference {
                alpha: self.alpha_preference,
                k: self.k,
            });
        }
        if self.alpha_confidence < self.alpha_preference || self.alpha_confidence > self.k {
            return Err(ParamsError::InvalidAlphaConfidence {
                alpha_confidence: self.alpha_confidence,
                alpha_preference: self.alpha_preference,
                k: self.k,
            });
        }
        if self.beta == 0 {
            return Err(ParamsError::InvalidBeta);
        }
        if self.concurrent_repolls == 0 || self.concurrent_repolls > self.beta {
            return Err(ParamsError::InvalidConcurrentRepolls {
                repolls: self.concurrent_repolls,
                beta: self.beta,
            });
        }
        if self.optimal_processing == 0 {
            return Err(ParamsError::NonPositive("optimal_processing"));
        }
        if self.max_outstanding_items == 0 {
            return Err(ParamsError::NonPositive("max_outstanding_items"));
        }
        if self.max_item_processing_time.is_zero() {
            return Err(ParamsError::NonPositive("max_item_processing_time"));
        }
        Ok(())
    }

    /// Return a new validated value with `overrides` applied.
    pub fn with_overrides(&self, overrides: &ParameterOverrides) -> Result<Self, ParamsError> {
        let mut next = *self;
        if let Some(v) = overrides.k {
            next.k = v;
        }
        if let Some(v) = overrides.alpha_preference {
            next.alpha_preference = v;
        }
        if let Some(v) = overrides.alpha_confidence {
            next.alpha_confidence = v;
        }
        if let Some(v) = overrides.beta {
            next.beta = v;
        }
        if let Some(v) = overrides.concurrent_repolls {
            next.concurrent_repolls = v;
        }
        if let Some(v) = overrides.optimal_processing {
            next.optimal_processing = v;
        }
        if let Some(v) = overrides.max_outstanding_items {
            next.max_outstanding_items = v;
        }
        if let Some(v) = overrides.max_item_processing_time {
            next.max_item_processing_time = v;
        }
        if let Some(v) = overrides.min_round_interval {
            next.min_round_interval = v;
        }
        next.validate()?;
        Ok(next)
    }

    /// Load and validate parameters from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParamsError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ParamsError::Io(e.to_string()))?;
        let params: Self =
            serde_json::from_str(&raw).map_err(|e| ParamsError::Parse(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Write parameters as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ParamsError> {
        let raw =
            serde_json::to_string_pretty(self).map_err(|e| ParamsError::Parse(e.to_string()))?;
        std::fs::write(path.as_ref(), raw).map_err(|e| ParamsError::Io(e.to_string()))
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::mainnet()
    }
}

/// Partial parameter set; `None` keeps the base value.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterOverrides {
    pub k: Option<usize>,
    pub alpha_preference: Option<usize>,
    pub alpha_confidence: Option<usize>,
    pub beta: Option<usize>,
    pub concurrent_repolls: Option<usize>,
    pub optimal_processing: Option<usize>,
    pub max_outstanding_items: Option<usize>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub max_item_processing_time: Option<Duration>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub min_round_interval: Option<Duration>,
}
