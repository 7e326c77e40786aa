// Magnification level: doubled or halved on request, always within [min, max].
use tracing::info;

/// Direction of a scale change coming from the command surface or a sustained blink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleTrigger {
    Increase,
    Decrease,
}

#[derive(Debug, Clone)]
pub struct ScaleController {
    current: f64,
    min: f64,
    max: f64,
}

impl ScaleController {
    /// Bounds are validated by `Config`; `initial` is clamped into them.
    pub fn new(initial: f64, min: f64, max: f64) -> Self {
        Self { current: initial.clamp(min, max), min, max }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    /// Double, capped at `max`. Returns true if the factor changed.
    pub fn increase(&mut self) -> bool {
        self.set((self.current * 2.0).min(self.max))
    }

    /// Halve, floored at `min`. Returns true if the factor changed.
    pub fn decrease(&mut self) -> bool {
        self.set((self.current / 2.0).max(self.min))
    }

    pub fn adjust(&mut self, trigger: ScaleTrigger) -> bool {
        match trigger {
            ScaleTrigger::Increase => self.increase(),
            ScaleTrigger::Decrease => self.decrease(),
        }
    }

    fn set(&mut self, next: f64) -> bool {
        if next == self.current {
            return false;
        }
        info!(from = self.current, to = next, "magnification changed");
        self.current = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_up_to_max() {
        let mut s = ScaleController::new(2.0, 2.0, 12.0);
        assert!(s.increase());
        assert_eq!(s.current(), 4.0);
        assert!(s.increase());
        assert_eq!(s.current(), 8.0);
        assert!(s.increase());
        assert_eq!(s.current(), 12.0);
        assert!(!s.increase());
        assert_eq!(s.current(), 12.0);
    }

    #[test]
    fn halves_down_to_min() {
        let mut s = ScaleController::new(12.0, 2.0, 12.0);
        assert!(s.decrease());
        assert_eq!(s.current(), 6.0);
        assert!(s.decrease());
        assert_eq!(s.current(), 3.0);
        assert!(s.decrease());
        assert_eq!(s.current(), 2.0);
        assert!(!s.decrease());
    }

    #[test]
    fn repeated_adjustments_stay_in_bounds() {
        for (min, max) in [(2.0, 12.0), (0.5, 3.0), (1.0, 1.0)] {
            let mut s = ScaleController::new(min, min, max);
            for _ in 0..20 {
                s.adjust(ScaleTrigger::Increase);
                assert!(s.current() <= max);
            }
            assert_eq!(s.current(), max);
            for _ in 0..20 {
                s.adjust(ScaleTrigger::Decrease);
                assert!(s.current() >= min);
            }
            assert_eq!(s.current(), min);
        }
    }

    #[test]
    fn initial_is_clamped() {
        assert_eq!(ScaleController::new(40.0, 2.0, 12.0).current(), 12.0);
        assert_eq!(ScaleController::new(0.1, 2.0, 12.0).current(), 2.0);
    }
}
