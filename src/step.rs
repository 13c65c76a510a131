//! Step Controller: quantizes continuous time into a step counter.

use crate::error::{Error, Result};
use crate::game_loop::TimedAction;

/// Marker for "no update recorded since start".
const NO_STEP: i64 = -1;

/// Counts how many `1 / frequency` second steps elapse while active.
#[derive(Debug, Clone, PartialEq)]
pub struct StepController {
    frequency: f64,
    active: bool,
    max_value: u64,
    offset_value: u64,
    absolute_value: u64,
    last_update_time: i64,
    update_time: i64,
}

impl StepController {
    pub fn new(frequency: f64) -> Result<Self> {
        check_frequency(frequency)?;
        Ok(Self {
            frequency,
            active: false,
            max_value: u64::MAX,
            offset_value: 0,
            absolute_value: 0,
            last_update_time: NO_STEP,
            update_time: NO_STEP,
        })
    }

    pub fn with_max_value(mut self, max_value: u64) -> Self {
        self.max_value = max_value;
        self
    }

    pub fn with_offset_value(mut self, offset_value: u64) -> Self {
        self.offset_value = offset_value;
        self
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Steps per second. Only allowed while stopped.
    pub fn set_frequency(&mut self, frequency: f64) -> Result<()> {
        if self.active {
            return Err(Error::FrequencyWhileActive);
        }
        check_frequency(frequency)?;
        self.frequency = frequency;
        Ok(())
    }

    pub fn set_max_value(&mut self, max_value: u64) {
        self.max_value = max_value;
    }

    pub fn set_offset_value(&mut self, offset_value: u64) {
        self.offset_value = offset_value;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Begin counting. The next `update_time` only seeds the markers.
    pub fn start(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        self.last_update_time = NO_STEP;
        self.update_time = NO_STEP;
    }

    /// Stop counting and reset the counter to zero.
    pub fn stop(&mut self) {
        self.active = false;
        self.absolute_value = 0;
        self.last_update_time = NO_STEP;
        self.update_time = NO_STEP;
    }

    /// Record `time` (seconds). Ignored while stopped.
    pub fn update_time(&mut self, time: f64) {
        if !self.active {
            return;
        }
        let index = (time.max(0.0) * self.frequency).floor() as i64;

        if self.update_time == NO_STEP {
            self.last_update_time = index;
            self.update_time = index;
            return;
        }

        self.last_update_time = self.update_time;
        self.update_time = index;
        self.absolute_value = self.absolute_value.saturating_add(self.number_of_steps());
    }

    /// Steps between the two most recent updates. Never negative.
    pub fn number_of_steps(&self) -> u64 {
        if self.last_update_time == NO_STEP || self.update_time == NO_STEP {
            return 0;
        }
        (self.update_time - self.last_update_time).max(0) as u64
    }

    /// `offset + counted steps`, capped at the maximum value.
    pub fn absolute_value(&self) -> u64 {
        self.offset_value
            .saturating_add(self.absolute_value)
            .min(self.max_value)
    }
}

impl TimedAction for StepController {
    fn update(&mut self, time: f64, _delta: f64) {
        self.update_time(time);
    }
}

fn check_frequency(frequency: f64) -> Result<()> {
    if frequency < 0.0 || frequency.is_nan() {
        return Err(Error::NegativeFrequency(frequency));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(frequency: f64) -> StepController {
        let mut steps = StepController::new(frequency).unwrap();
        steps.start();
        steps
    }

    #[test]
    fn test_first_update_seeds_markers() {
        let mut steps = started(10.0);
        steps.update_time(5.0);
        assert_eq!(steps.number_of_steps(), 0);
        assert_eq!(steps.absolute_value(), 0);
    }

    #[test]
    fn test_counts_quantized_steps() {
        let mut steps = started(10.0);
        steps.update_time(0.0);
        steps.update_time(0.25);
        assert_eq!(steps.number_of_steps(), 2);
        steps.update_time(0.31);
        assert_eq!(steps.number_of_steps(), 1);
        assert_eq!(steps.absolute_value(), 3);
    }

    #[test]
    fn test_monotonic_under_increasing_time() {
        let mut steps = started(30.0);
        let mut previous = 0;
        for i in 0..200 {
            steps.update_time(i as f64 * 0.017);
            let value = steps.absolute_value();
            assert!(value >= previous);
            previous = value;
        }
        assert!(previous > 0);
    }

    #[test]
    fn test_time_going_backwards_adds_nothing() {
        let mut steps = started(10.0);
        steps.update_time(1.0);
        steps.update_time(2.0);
        steps.update_time(1.5);
        assert_eq!(steps.number_of_steps(), 0);
        assert_eq!(steps.absolute_value(), 10);
    }

    #[test]
    fn test_stop_then_start_resets() {
        let mut steps = started(10.0);
        steps.update_time(0.0);
        steps.update_time(1.0);
        assert_eq!(steps.absolute_value(), 10);

        steps.stop();
        assert_eq!(steps.absolute_value(), 0);
        steps.update_time(3.0);
        assert_eq!(steps.absolute_value(), 0);

        steps.start();
        steps.update_time(7.0);
        assert_eq!(steps.absolute_value(), 0);
        steps.update_time(7.15);
        assert_eq!(steps.absolute_value(), 1);
    }

    #[test]
    fn test_offset_and_max_value() {
        let mut steps = StepController::new(1.0)
            .unwrap()
            .with_offset_value(5)
            .with_max_value(8);
        steps.start();
        steps.update_time(0.0);
        assert_eq!(steps.absolute_value(), 5);
        steps.update_time(2.0);
        assert_eq!(steps.absolute_value(), 7);
        steps.update_time(10.0);
        assert_eq!(steps.absolute_value(), 8);
    }

    #[test]
    fn test_set_frequency_rules() {
        let mut steps = StepController::new(4.0).unwrap();
        steps.set_frequency(2.0).unwrap();
        assert_eq!(steps.frequency(), 2.0);

        assert!(matches!(
            steps.set_frequency(-1.0),
            Err(Error::NegativeFrequency(_))
        ));

        steps.start();
        assert!(matches!(
            steps.set_frequency(3.0),
            Err(Error::FrequencyWhileActive)
        ));
        assert!(StepController::new(-0.5).is_err());
    }

    #[test]
    fn test_driven_as_timed_action() {
        let mut steps = started(2.0);
        for tick in 0..5 {
            steps.update(tick as f64, 1.0);
        }
        assert_eq!(steps.absolute_value(), 8);
    }
}
