use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::{SpotId, UserId};
use crate::error::{AppError, AppResult};
use crate::geo::{CellId, Coordinate};

/// Display name of a spot, 1 to 64 characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpotName(String);

impl SpotName {
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let len = value.chars().count();
        if !(1..=64).contains(&len) {
            return Err(AppError::InvalidInput(format!(
                "spot name must be 1-64 chars, got {}",
                len
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SpotName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point of interest registered by a user
///
/// The cell is always derived from the stored coordinate, never read back
/// from a separate column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spot {
    pub id: SpotId,
    pub name: SpotName,
    pub cell: CellId,
    pub location: Coordinate,
    pub owner: UserId,
}

impl Spot {
    pub fn new(
        id: SpotId,
        name: SpotName,
        latitude: f64,
        longitude: f64,
        owner: UserId,
    ) -> AppResult<Self> {
        let location = Coordinate::new(latitude, longitude)?;
        Ok(Self {
            id,
            name,
            cell: CellId::of(&location),
            location,
            owner,
        })
    }
}
