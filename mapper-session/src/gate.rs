//! Rate limiting for map retrievals.

/// Fires at most once per `period`-second slot of the clock.
///
/// Slots are fixed (`floor(now / period)`), so the firing rate does not
/// drift with loop jitter and two polls in the same slot never both fire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicGate {
    period: f64,
    last_slot: Option<i64>,
}

impl PeriodicGate {
    pub fn new(period: f64) -> Self {
        Self {
            period,
            last_slot: None,
        }
    }

    /// Whether the gate opens at time `now`. Consumes the current slot.
    pub fn fire(&mut self, now: f64) -> bool {
        if !(self.period > 0.0) {
            return true;
        }
        let slot = (now / self.period).floor() as i64;
        match self.last_slot {
            Some(last) if slot <= last => false,
            _ => {
                self.last_slot = Some(slot);
                true
            }
        }
    }

    /// Forget the last fired slot.
    pub fn reset(&mut self) {
        self.last_slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_per_slot() {
        let mut gate = PeriodicGate::new(1.5);
        assert!(gate.fire(0.1));
        assert!(!gate.fire(0.2));
        assert!(!gate.fire(1.49));
        assert!(gate.fire(1.5));
        assert!(!gate.fire(2.9));
        assert!(gate.fire(3.0));
    }

    #[test]
    fn test_skipped_slots_do_not_accumulate() {
        let mut gate = PeriodicGate::new(1.0);
        assert!(gate.fire(0.0));
        assert!(gate.fire(10.2));
        assert!(!gate.fire(10.9));
    }

    #[test]
    fn test_reset_reopens_the_gate() {
        let mut gate = PeriodicGate::new(1.0);
        assert!(gate.fire(0.5));
        gate.reset();
        assert!(gate.fire(0.6));
    }

    #[test]
    fn test_zero_period_always_fires() {
        let mut gate = PeriodicGate::new(0.0);
        assert!(gate.fire(0.0));
        assert!(gate.fire(0.0));
    }
}
