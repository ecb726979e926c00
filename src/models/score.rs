use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::UserId;
use crate::error::{AppError, AppResult};

/// Another user whose posting history overlaps the requester's
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResonantUser {
    pub user_id: UserId,
    /// Number of distinct spots both users have posted at
    pub match_count: u32,
}

/// Match count of the user behind the winning spot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResonanceCount(u32);

impl ResonanceCount {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

/// Total historical post count inside a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DensityScore(u64);

impl DensityScore {
    /// Converts a raw SQL count, which arrives as a signed integer
    pub fn from_count(count: i64) -> AppResult<Self> {
        u64::try_from(count)
            .map(Self)
            .map_err(|_| AppError::Storage(format!("negative post count {}", count)))
    }

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Composite score of the winning spot
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct TotalScore(f64);

impl TotalScore {
    pub fn new(value: f64) -> AppResult<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(AppError::Internal(format!("invalid total score {}", value)));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Human readable justification attached to a recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Reason(String);

impl Reason {
    /// Renders the fixed explanation for a winning resonance/density pair
    pub fn explain(resonance: ResonanceCount, density: DensityScore) -> Self {
        Self(format!(
            "Someone who shares {} of your spots vouches for this place, and {} posts have been made around it",
            resonance.value(),
            density.value()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
