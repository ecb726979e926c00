//! Fixed-resolution grid cells.
//!
//! A coordinate is scaled by [`CELLS_PER_DEGREE`], floored, and shifted by a
//! positive offset so both keys are non-negative. The pair is rendered as
//! `MSH-LLLLL-GGGGG`, the identifier stored in `spots.cell_id`.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::Coordinate;
use crate::error::AppResult;

/// Grid resolution: 100 cells per degree, i.e. 0.01° (~1.1 km at the equator)
pub const CELLS_PER_DEGREE: f64 = 100.0;

const CELL_PREFIX: &str = "MSH";
const LAT_OFFSET: i64 = 9_000;
const LNG_OFFSET: i64 = 18_000;
const MAX_LAT_KEY: i64 = 2 * LAT_OFFSET;
const MAX_LNG_KEY: i64 = 2 * LNG_OFFSET;

/// Opaque identifier of one grid cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(String);

impl CellId {
    /// Maps a raw latitude/longitude pair to its cell
    pub fn quantize(latitude: f64, longitude: f64) -> AppResult<Self> {
        let coordinate = Coordinate::new(latitude, longitude)?;
        Ok(Self::of(&coordinate))
    }

    /// Maps an already validated coordinate to its cell
    pub fn of(coordinate: &Coordinate) -> Self {
        let lat_key = (coordinate.latitude() * CELLS_PER_DEGREE).floor() as i64 + LAT_OFFSET;
        let lng_key = (coordinate.longitude() * CELLS_PER_DEGREE).floor() as i64 + LNG_OFFSET;
        Self::from_keys(lat_key, lng_key)
    }

    /// Parses a stored identifier, returning `None` if it is not a cell id
    pub fn parse(raw: &str) -> Option<Self> {
        let (lat_key, lng_key) = decode(raw)?;
        Some(Self::from_keys(lat_key, lng_key))
    }

    /// The 3x3 neighbourhood minus the cell itself
    ///
    /// Interior cells have exactly eight neighbours. Cells on the poles or the
    /// antimeridian lose the neighbours that would fall off the grid; there is
    /// no wraparound. An unparseable id yields an empty list.
    pub fn neighbors(&self) -> Vec<CellId> {
        let Some((lat_key, lng_key)) = decode(&self.0) else {
            return Vec::new();
        };

        let mut cells = Vec::with_capacity(8);
        for d_lat in -1..=1 {
            for d_lng in -1..=1 {
                if d_lat == 0 && d_lng == 0 {
                    continue;
                }
                let (lat, lng) = (lat_key + d_lat, lng_key + d_lng);
                if (0..=MAX_LAT_KEY).contains(&lat) && (0..=MAX_LNG_KEY).contains(&lng) {
                    cells.push(Self::from_keys(lat, lng));
                }
            }
        }
        cells
    }

    /// This cell followed by its neighbours
    pub fn with_neighbors(&self) -> Vec<CellId> {
        let mut cells = Vec::with_capacity(9);
        cells.push(self.clone());
        cells.extend(self.neighbors());
        cells
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_keys(lat_key: i64, lng_key: i64) -> Self {
        Self(format!("{}-{:05}-{:05}", CELL_PREFIX, lat_key, lng_key))
    }
}

impl Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn decode(raw: &str) -> Option<(i64, i64)> {
    let keys = raw.strip_prefix(CELL_PREFIX)?.strip_prefix('-')?;
    let (lat, lng) = keys.split_once('-')?;
    if !lat.bytes().all(|b| b.is_ascii_digit()) || !lng.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let lat_key: i64 = lat.parse().ok()?;
    let lng_key: i64 = lng.parse().ok()?;
    if lat_key > MAX_LAT_KEY || lng_key > MAX_LNG_KEY {
        return None;
    }
    Some((lat_key, lng_key))
}
