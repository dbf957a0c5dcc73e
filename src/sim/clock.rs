//! Fixed timestep clock
//!
//! Accumulates variable frame time and releases it as whole physics steps.
//! Elapsed time is clamped per frame so a long stall (debugger, window drag)
//! cannot queue an unbounded burst of steps.

use crate::consts::{MAX_FRAME_TIME, STEP_TIME};

#[derive(Debug, Clone)]
pub struct SimulationClock {
    step: f32,
    max_frame: f32,
    accumulator: f32,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(STEP_TIME, MAX_FRAME_TIME)
    }
}

impl SimulationClock {
    pub fn new(step: f32, max_frame: f32) -> Self {
        assert!(step > 0.0, "step size must be positive");
        Self {
            step,
            max_frame: max_frame.max(0.0),
            accumulator: 0.0,
        }
    }

    pub fn step_size(&self) -> f32 {
        self.step
    }

    /// Time carried over to the next frame
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Fraction of a step left in the accumulator (for render interpolation)
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.step
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }

    /// Feed one frame of elapsed time, calling `step` once per whole step.
    /// Returns the number of steps taken.
    pub fn advance(&mut self, elapsed: f32, mut step: impl FnMut(f32)) -> u32 {
        let elapsed = if elapsed.is_finite() { elapsed } else { 0.0 };
        if elapsed > self.max_frame {
            log::warn!(
                "Frame took {:.3}s, clamping to {:.3}s",
                elapsed,
                self.max_frame
            );
        }
        self.accumulator += elapsed.clamp(0.0, self.max_frame);

        let mut steps = 0;
        while self.accumulator >= self.step {
            self.accumulator -= self.step;
            step(self.step);
            steps += 1;
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_long_stall_is_clamped() {
        let mut clock = SimulationClock::new(1.0 / 45.0, 0.25);
        let steps = clock.advance(0.5, |_| {});
        assert_eq!(steps, 11);
        let leftover = 0.25 - 11.0 * (1.0 / 45.0);
        assert!((clock.accumulator() - leftover).abs() < 1e-5);
    }

    #[test]
    fn test_leftover_carries_into_next_frame() {
        let mut clock = SimulationClock::new(0.1, 0.25);
        assert_eq!(clock.advance(0.15, |_| {}), 1);
        assert_eq!(clock.advance(0.06, |_| {}), 1);
        assert!((clock.accumulator() - 0.01).abs() < 1e-5);
    }

    #[test]
    fn test_every_step_is_exactly_step_size() {
        let mut clock = SimulationClock::default();
        let mut sizes = Vec::new();
        clock.advance(0.21, |dt| sizes.push(dt));
        assert_eq!(sizes.len(), 9);
        assert!(sizes.iter().all(|&dt| dt == STEP_TIME));
    }

    #[test]
    fn test_negative_and_nan_elapsed_do_nothing() {
        let mut clock = SimulationClock::default();
        assert_eq!(clock.advance(-1.0, |_| {}), 0);
        assert_eq!(clock.advance(f32::NAN, |_| {}), 0);
        assert_eq!(clock.accumulator(), 0.0);
    }

    proptest! {
        #[test]
        fn prop_step_count_matches_floor(frames in prop::collection::vec(-0.1f32..0.6, 1..40)) {
            let step = 1.0 / 45.0;
            let mut clock = SimulationClock::new(step, 0.25);
            for elapsed in frames {
                let before = clock.accumulator() as f64;
                let total = elapsed.clamp(0.0, 0.25) as f64 + before;
                let ratio = total / step as f64;

                let mut largest = 0.0f32;
                let steps = clock.advance(elapsed, |dt| largest = largest.max(dt));

                prop_assert!(largest <= step);
                // Exact boundaries may round either way in f32
                if (ratio - ratio.round()).abs() > 1e-3 {
                    prop_assert_eq!(steps as f64, ratio.floor());
                }
                prop_assert!(clock.accumulator() < step + 1e-6);
                prop_assert!(clock.accumulator() >= -1e-6);
            }
        }
    }
}
