use serde::Serialize;

/// One slot of a [`Schedule`](super::Schedule).
///
/// The timing fields are filled in by the schedule each time it resolves the
/// current slot; until then they are NaN.
#[derive(Debug, Clone, Serialize)]
pub struct Active<P> {
    payload: P,
    offset: f64,
    last_time: Option<f64>,
    next_time: f64,
    scheduled_time: f64,
}

impl<P> Active<P> {
    pub(crate) fn new(payload: P, offset: f64) -> Self {
        Self {
            payload,
            offset,
            last_time: None,
            next_time: f64::NAN,
            scheduled_time: f64::NAN,
        }
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Seconds from the start of the cycle, in `[0, cycle_time)`.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Time of the last activation, if any.
    pub fn last_time(&self) -> Option<f64> {
        self.last_time
    }

    /// Absolute time this slot next begins.
    ///
    /// For the current slot this is the start of its following occurrence.
    pub fn next_time(&self) -> f64 {
        self.next_time
    }

    /// Start of the occurrence this slot is currently tracking.
    pub fn scheduled_time(&self) -> f64 {
        self.scheduled_time
    }

    pub(crate) fn set_times(&mut self, scheduled_time: f64, next_time: f64) {
        self.scheduled_time = scheduled_time;
        self.next_time = next_time;
    }

    /// Whether the tracked occurrence has already been activated.
    pub fn is_activated(&self) -> bool {
        self.last_time
            .is_some_and(|last| last >= self.scheduled_time)
    }

    /// Record an activation at `now`.
    ///
    /// Returns `false` without changing anything if this occurrence was
    /// already activated.
    pub fn activate(&mut self, now: f64) -> bool {
        if self.is_activated() {
            return false;
        }
        self.last_time = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activate_once_per_occurrence() {
        let mut active = Active::new('a', 10.0);
        active.set_times(110.0, 210.0);
        assert!(!active.is_activated());
        assert!(active.activate(111.0));
        assert!(active.is_activated());
        assert!(!active.activate(150.0));
        assert_eq!(active.last_time(), Some(111.0));

        active.set_times(210.0, 310.0);
        assert!(!active.is_activated());
        assert!(active.activate(210.0));
        assert_eq!(active.last_time(), Some(210.0));
    }
}
