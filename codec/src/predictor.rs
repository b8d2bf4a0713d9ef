//! Linear extrapolation from three baselines.

use crate::types::SnapshotTick;

/// Fixed-point denominator of the prediction fraction.
const FRACTION_ONE: i64 = 16;

/// Predicts a field value from the three most recent acknowledged baselines.
///
/// The prediction is `b0 + (b0 - b1) * t0 / t01`, where `t0` is the distance
/// from the newest baseline to the tick being written and `t01` the distance
/// between the two newest baselines, evaluated in 1/16 fixed point so encoder
/// and decoder agree bit for bit.
///
/// Prediction only kicks in when the baselines are strictly ordered and
/// evenly spaced; anything else falls back to `b0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaPredictor {
    fraction: i64,
    enabled: bool,
}

impl DeltaPredictor {
    #[must_use]
    pub fn new(
        tick: SnapshotTick,
        baseline0: SnapshotTick,
        baseline1: SnapshotTick,
        baseline2: SnapshotTick,
    ) -> Self {
        let t0 = i64::from(tick.ticks_since(baseline0));
        let t01 = i64::from(baseline0.ticks_since(baseline1));
        let t12 = i64::from(baseline1.ticks_since(baseline2));
        let enabled = t0 > 0 && t01 > 0 && t01 == t12;
        let fraction = if enabled { FRACTION_ONE * t0 / t01 } else { 0 };
        Self { fraction, enabled }
    }

    /// Returns `true` if predictions differ from plain `b0` deltas.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Extrapolated value of a signed field.
    #[must_use]
    pub fn predict_int(&self, baseline0: i32, baseline1: i32, baseline2: i32) -> i32 {
        let predicted = self.extrapolate(
            i64::from(baseline0),
            i64::from(baseline1),
            i64::from(baseline2),
        );
        predicted.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }

    /// Extrapolated value of an unsigned field.
    #[must_use]
    pub fn predict_uint(&self, baseline0: u32, baseline1: u32, baseline2: u32) -> u32 {
        let predicted = self.extrapolate(
            i64::from(baseline0),
            i64::from(baseline1),
            i64::from(baseline2),
        );
        predicted.clamp(0, i64::from(u32::MAX)) as u32
    }

    fn extrapolate(&self, b0: i64, b1: i64, b2: i64) -> i64 {
        if !self.enabled {
            return b0;
        }
        let d01 = b0 - b1;
        let d12 = b1 - b2;
        // Only continue a steady trend.
        if d01.signum() != d12.signum() {
            return b0;
        }
        b0.saturating_add(d01.saturating_mul(self.fraction) / FRACTION_ONE)
    }
}
