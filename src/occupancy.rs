//! Session high-water marks for person counts.

use serde::{Deserialize, Serialize};

use crate::CameraSide;

/// Largest person count observed per side since the pipeline started.
///
/// Starts at zero and only ever rises. There is no decay and no window: a frame
/// in which the detector misses everyone leaves the marks where they were.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyState {
    pub max_front: usize,
    pub max_back: usize,
}

impl OccupancyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max(&self, side: CameraSide) -> usize {
        match side {
            CameraSide::Front => self.max_front,
            CameraSide::Back => self.max_back,
        }
    }

    /// Fold this frame's count for `side` into its high-water mark.
    ///
    /// Returns `count` unchanged for logging.
    pub fn record(&mut self, side: CameraSide, count: usize) -> usize {
        let slot = match side {
            CameraSide::Front => &mut self.max_front,
            CameraSide::Back => &mut self.max_back,
        };
        *slot = (*slot).max(count);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let state = OccupancyState::new();
        assert_eq!(state.max(CameraSide::Front), 0);
        assert_eq!(state.max(CameraSide::Back), 0);
    }

    #[test]
    fn sides_are_independent() {
        let mut state = OccupancyState::new();
        state.record(CameraSide::Front, 4);
        assert_eq!(state.max_front, 4);
        assert_eq!(state.max_back, 0);
    }

    #[test]
    fn marks_never_decrease() {
        let mut state = OccupancyState::new();
        let counts = [2, 5, 0, 3, 7, 1, 7, 0];
        let mut previous = state;
        for (i, count) in counts.into_iter().enumerate() {
            let returned = state.record(CameraSide::Front, count);
            state.record(CameraSide::Back, counts[counts.len() - 1 - i]);
            assert_eq!(returned, count);
            assert!(state.max_front >= previous.max_front);
            assert!(state.max_back >= previous.max_back);
            previous = state;
        }
        assert_eq!(state.max_front, 7);
        assert_eq!(state.max_back, 7);
    }
}
