//! Ice quantity estimation
//!
//! Interpolates the empirical heat-chamber table relating food weight and
//! temperature to the pounds of ice a shipment needs, then rounds up to the
//! 2 lb packing increment.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::IceError;

/// Ice is packed in bags of this many pounds
pub const PACKING_INCREMENT_LBS: u32 = 2;

const EMPIRICAL_WEIGHTS: [f64; 5] = [3.5, 4.55, 8.54, 14.35, 19.25];
const EMPIRICAL_TEMPERATURES: [f64; 6] = [0.0, 50.0, 70.0, 80.0, 100.0, 200.0];
const EMPIRICAL_ICE: [[f64; 6]; 5] = [
    [0.0, 2.0, 4.0, 8.0, 8.0, 8.0], // 3.5
    [0.0, 2.0, 4.0, 8.0, 8.0, 8.0], // 4.55
    [0.0, 0.0, 4.0, 4.0, 4.0, 4.0], // 8.54
    [0.0, 0.0, 4.0, 4.0, 4.0, 4.0], // 14.35
    [0.0, 0.0, 4.0, 4.0, 4.0, 4.0], // 19.25
];

/// Grid of required ice (lbs) indexed by food weight (rows, lbs) and
/// temperature (columns, °F)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawIceTable")]
pub struct IceTable {
    weights: Vec<f64>,
    temperatures: Vec<f64>,
    ice: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
struct RawIceTable {
    weights: Vec<f64>,
    temperatures: Vec<f64>,
    ice: Vec<Vec<f64>>,
}

impl TryFrom<RawIceTable> for IceTable {
    type Error = IceError;

    fn try_from(raw: RawIceTable) -> Result<Self, Self::Error> {
        IceTable::new(raw.weights, raw.temperatures, raw.ice)
    }
}

impl Default for IceTable {
    fn default() -> Self {
        Self::empirical()
    }
}

impl IceTable {
    /// Build a table, checking that both axes are strictly increasing and the
    /// grid has one row per weight and one column per temperature.
    pub fn new(
        weights: Vec<f64>,
        temperatures: Vec<f64>,
        ice: Vec<Vec<f64>>,
    ) -> crate::Result<Self> {
        validate_axis("weights", &weights)?;
        validate_axis("temperatures", &temperatures)?;

        if ice.len() != weights.len() {
            return Err(IceError::config(format!(
                "ice table has {} rows but {} weights",
                ice.len(),
                weights.len()
            )));
        }
        for (row, weight) in ice.iter().zip(&weights) {
            if row.len() != temperatures.len() {
                return Err(IceError::config(format!(
                    "ice table row for weight {weight} has {} cells but {} temperatures",
                    row.len(),
                    temperatures.len()
                )));
            }
            if row.iter().any(|cell| !cell.is_finite() || *cell < 0.0) {
                return Err(IceError::config(format!(
                    "ice table row for weight {weight} contains a negative or non-finite cell"
                )));
            }
        }

        Ok(Self {
            weights,
            temperatures,
            ice,
        })
    }

    /// The table measured in the heat chamber
    #[must_use]
    pub fn empirical() -> Self {
        Self {
            weights: EMPIRICAL_WEIGHTS.to_vec(),
            temperatures: EMPIRICAL_TEMPERATURES.to_vec(),
            ice: EMPIRICAL_ICE.iter().map(|row| row.to_vec()).collect(),
        }
    }

    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[must_use]
    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    /// Bilinear interpolation of the ice quantity.
    ///
    /// Inputs beyond either axis are clamped to its nearest edge, so
    /// out-of-range weights or temperatures return edge values rather than an
    /// error. NaN clamps to the lower edge.
    #[must_use]
    pub fn interpolate(&self, temperature_f: f64, food_weight_lbs: f64) -> f64 {
        let (r0, r1, u) = bracket(&self.weights, food_weight_lbs);
        let (c0, c1, v) = bracket(&self.temperatures, temperature_f);

        let lower = lerp(self.ice[r0][c0], self.ice[r0][c1], v);
        let upper = lerp(self.ice[r1][c0], self.ice[r1][c1], v);
        lerp(lower, upper, u)
    }
}

fn validate_axis(name: &str, axis: &[f64]) -> crate::Result<()> {
    if axis.is_empty() {
        return Err(IceError::config(format!("ice table {name} cannot be empty")));
    }
    if axis.iter().any(|value| !value.is_finite()) {
        return Err(IceError::config(format!("ice table {name} must be finite")));
    }
    if axis.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(IceError::config(format!(
            "ice table {name} must be strictly increasing"
        )));
    }
    Ok(())
}

/// Indices of the grid cell containing `x` (after clamping) and the
/// fractional position of `x` between them.
fn bracket(axis: &[f64], x: f64) -> (usize, usize, f64) {
    let last = axis.len() - 1;
    if last == 0 {
        return (0, 0, 0.0);
    }

    // f64::max returns the non-NaN operand, so NaN lands on the lower edge.
    let x = x.max(axis[0]).min(axis[last]);
    let lo = axis
        .partition_point(|&edge| edge <= x)
        .saturating_sub(1)
        .min(last - 1);
    let hi = lo + 1;
    let t = (x - axis[lo]) / (axis[hi] - axis[lo]);
    (lo, hi, t)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

/// Round an ice quantity to a whole number of packing increments.
///
/// The floor is kept when it is already even; otherwise the next even value
/// above it is returned, so the result never falls more than one pound short
/// of `pounds`.
#[must_use]
pub fn round_to_packing_increment(pounds: f64) -> u32 {
    let floor = pounds.max(0.0).floor();
    // Saturating float-to-int cast; ice quantities are small.
    let floor = floor as u32;
    if floor % PACKING_INCREMENT_LBS == 0 {
        floor
    } else {
        floor + 1
    }
}

/// Recommends ice weight for a shipment from the shared ice table
#[derive(Debug, Clone)]
pub struct IceEstimator {
    table: Arc<IceTable>,
}

impl IceEstimator {
    #[must_use]
    pub fn new(table: Arc<IceTable>) -> Self {
        Self { table }
    }

    #[must_use]
    pub fn table(&self) -> &IceTable {
        &self.table
    }

    /// Continuous ice estimate in pounds, before rounding
    #[must_use]
    pub fn interpolate(&self, temperature_f: f64, food_weight_lbs: f64) -> f64 {
        self.table.interpolate(temperature_f, food_weight_lbs)
    }

    /// Recommended ice weight in pounds, always a multiple of the packing increment
    #[must_use]
    pub fn estimate(&self, temperature_f: f64, food_weight_lbs: f64) -> u32 {
        let pounds = self.interpolate(temperature_f, food_weight_lbs);
        let ice = round_to_packing_increment(pounds);
        tracing::debug!(
            temperature_f,
            food_weight_lbs,
            interpolated = pounds,
            ice,
            "estimated ice weight"
        );
        ice
    }
}

impl Default for IceEstimator {
    fn default() -> Self {
        Self::new(Arc::new(IceTable::empirical()))
    }
}
