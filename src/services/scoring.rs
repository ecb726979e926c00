//! Scoring rules for cell representatives.
//!
//! ```text
//! resonance_weight = ln(1 + match_count) * multiplier + offset
//! distance_weight  = 1 / (1 + ln(1 + distance_km))
//! score            = resonance_weight * density * distance_weight
//! ```
//!
//! Resonance and distance are both damped logarithmically, so a strongly
//! matched spot a few cells away can still beat a weak match next door.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::{
    geo::CellId,
    models::{DensityScore, Spot, UserId},
};

/// Tunable constants of the composite score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub resonance_multiplier: f64,
    pub resonance_offset: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            resonance_multiplier: 3.0,
            resonance_offset: 1.0,
        }
    }
}

impl ScoringWeights {
    pub fn resonance_weight(&self, match_count: u32) -> f64 {
        (1.0 + f64::from(match_count)).ln() * self.resonance_multiplier + self.resonance_offset
    }

    pub fn distance_weight(distance_km: f64) -> f64 {
        1.0 / (1.0 + (1.0 + distance_km).ln())
    }

    pub fn score(&self, match_count: u32, density: DensityScore, distance_km: f64) -> f64 {
        self.resonance_weight(match_count)
            * density.value() as f64
            * Self::distance_weight(distance_km)
    }
}

/// The spot standing in for a whole cell, with its owner's match count
#[derive(Debug, Clone, PartialEq)]
pub struct Representative {
    pub spot: Spot,
    pub match_count: u32,
}

/// Reduces candidates to one spot per cell
///
/// The spot owned by the most resonant user wins its cell; equal match counts
/// go to the lowest spot id. Candidates whose owner is not in `resonance` are
/// ignored. The map iterates cells in ascending id order.
pub fn select_representatives(
    candidates: Vec<Spot>,
    resonance: &HashMap<UserId, u32>,
) -> BTreeMap<CellId, Representative> {
    let mut by_cell: BTreeMap<CellId, Representative> = BTreeMap::new();

    for spot in candidates {
        let Some(&match_count) = resonance.get(&spot.owner) else {
            tracing::debug!(spot_id = %spot.id, owner = %spot.owner, "Skipping candidate with non-resonant owner");
            continue;
        };

        match by_cell.get_mut(&spot.cell) {
            Some(current) => {
                let better = match_count > current.match_count
                    || (match_count == current.match_count && spot.id < current.spot.id);
                if better {
                    *current = Representative { spot, match_count };
                }
            }
            None => {
                by_cell.insert(spot.cell.clone(), Representative { spot, match_count });
            }
        }
    }

    by_cell
}

/// A representative after density and distance have been folded in
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub representative: Representative,
    pub density: DensityScore,
    pub distance_km: f64,
    pub score: f64,
}

impl ScoredCandidate {
    /// Whether this candidate should replace `incumbent` as the running winner
    ///
    /// Only scores strictly above zero qualify. Higher score wins; an exact
    /// tie goes to the lower spot id.
    pub fn beats(&self, incumbent: Option<&ScoredCandidate>) -> bool {
        if !(self.score > 0.0) {
            return false;
        }
        match incumbent {
            None => true,
            Some(best) => {
                self.score > best.score
                    || (self.score == best.score
                        && self.representative.spot.id < best.representative.spot.id)
            }
        }
    }
}
