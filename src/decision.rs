//! Threshold policy and the combined directive rule.

use image::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::occupancy::OccupancyState;
use crate::CameraSide;

pub const DEFAULT_FRONT_THRESHOLD: usize = 3;
pub const DEFAULT_BACK_THRESHOLD: usize = 10;

/// Binary alert state of one side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertColor {
    Red,
    Green,
}

impl AlertColor {
    /// Overlay color used when tinting a view with this state.
    pub fn tint(self) -> Rgb<u8> {
        match self {
            AlertColor::Red => Rgb([255, 0, 0]),
            AlertColor::Green => Rgb([0, 255, 0]),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertColor::Red => "red",
            AlertColor::Green => "green",
        }
    }
}

impl fmt::Display for AlertColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-side person-count thresholds.
///
/// The front camera sees a closer, narrower area, so its threshold is lower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub front: usize,
    pub back: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            front: DEFAULT_FRONT_THRESHOLD,
            back: DEFAULT_BACK_THRESHOLD,
        }
    }
}

impl Thresholds {
    pub fn for_side(&self, side: CameraSide) -> usize {
        match side {
            CameraSide::Front => self.front,
            CameraSide::Back => self.back,
        }
    }

    /// RED iff `max_count` is strictly above the side's threshold.
    pub fn decide(&self, side: CameraSide, max_count: usize) -> AlertColor {
        if max_count > self.for_side(side) {
            AlertColor::Red
        } else {
            AlertColor::Green
        }
    }
}

/// Decide with the default thresholds.
pub fn decide(side: CameraSide, max_count: usize) -> AlertColor {
    Thresholds::default().decide(side, max_count)
}

/// Actionable message raised by the combined rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    /// Front is over capacity while the back still has room.
    MoveBack,
}

impl Directive {
    pub fn message(self) -> &'static str {
        match self {
            Directive::MoveBack => "Go back!",
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Both sides' alert colors for one iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub front: AlertColor,
    pub back: AlertColor,
}

impl Decision {
    /// Recompute both colors from the current high-water marks.
    pub fn evaluate(thresholds: &Thresholds, state: &OccupancyState) -> Self {
        Self {
            front: thresholds.decide(CameraSide::Front, state.max_front),
            back: thresholds.decide(CameraSide::Back, state.max_back),
        }
    }

    pub fn color(&self, side: CameraSide) -> AlertColor {
        match side {
            CameraSide::Front => self.front,
            CameraSide::Back => self.back,
        }
    }

    /// The only actionable combination is RED front with GREEN back.
    pub fn directive(&self) -> Option<Directive> {
        match (self.front, self.back) {
            (AlertColor::Red, AlertColor::Green) => Some(Directive::MoveBack),
            _ => None,
        }
    }
}
