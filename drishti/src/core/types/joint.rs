//! Joint state messages.

use serde::{Deserialize, Serialize};

/// Measured joint angles, as delivered by the robot's joint-state stream.
///
/// The body rotation ("world") joint is the last entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JointState {
    /// Joint names, parallel to `positions`
    pub names: Vec<String>,
    /// Joint angles in radians
    pub positions: Vec<f64>,
    /// Timestamp in microseconds
    pub timestamp_us: u64,
}

impl JointState {
    pub fn new(names: Vec<String>, positions: Vec<f64>, timestamp_us: u64) -> Self {
        Self {
            names,
            positions,
            timestamp_us,
        }
    }

    /// Single-joint state, convenient for the body rotation joint alone.
    pub fn single(name: &str, position: f64, timestamp_us: u64) -> Self {
        Self::new(vec![name.to_string()], vec![position], timestamp_us)
    }

    /// Angle of the last joint, if any.
    #[inline]
    pub fn last_position(&self) -> Option<f64> {
        self.positions.last().copied()
    }
}
