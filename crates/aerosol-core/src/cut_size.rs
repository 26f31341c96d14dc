//! Impactor cut-size selection
//!
//! Size-selective inlets switch between particle size cuts on a fixed cycle.
//! [`CutSize`] is a [`Schedule`] of [`Size`] values with a shortcut for the
//! common case of a single size that never changes.

use alloc::string::{String, ToString};
use core::fmt;
use core::str::FromStr;

use embedded_hal_async::delay::DelayNs;
use log::info;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::clock::Clock;
use crate::schedule::{Active, ActivationHandler, Schedule, ScheduleStatus};

/// Cycle time used when a cut-size schedule does not give one.
pub const DEFAULT_CYCLE_TIME: f64 = 3600.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CutSizeError {
    /// Value does not name a known size cut
    #[error("Invalid cut size: {token:?}")]
    InvalidToken {
        /// The rejected token as written
        token: String,
    },
}

/// Particle size cut selected by the impactor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "SizeToken")]
pub enum Size {
    #[serde(rename = "PM1")]
    PM1,
    #[serde(rename = "PM2.5")]
    PM2_5,
    #[serde(rename = "PM10")]
    PM10,
    /// No impactor in line
    #[serde(rename = "Whole")]
    Whole,
}

impl Size {
    /// Aerodynamic cut diameter in µm, `None` for whole air.
    pub fn diameter(&self) -> Option<f64> {
        match self {
            Self::PM1 => Some(1.0),
            Self::PM2_5 => Some(2.5),
            Self::PM10 => Some(10.0),
            Self::Whole => None,
        }
    }

    fn from_diameter(diameter: f64) -> Option<Self> {
        if diameter == 1.0 {
            Some(Self::PM1)
        } else if diameter == 2.5 {
            Some(Self::PM2_5)
        } else if diameter == 10.0 {
            Some(Self::PM10)
        } else {
            None
        }
    }

    /// Parse a size as written in configuration.
    ///
    /// Accepts `PM1`, `PM2.5`, `PM25`, `PM10` with or without the `PM`
    /// prefix, and `WHOLE`, `NONE`, `TOTAL` or an empty string for whole
    /// air. Case is ignored.
    pub fn parse(text: &str) -> Result<Self, CutSizeError> {
        let invalid = || CutSizeError::InvalidToken {
            token: text.to_string(),
        };

        let trimmed = text.trim();
        let bare = match trimmed.get(..2) {
            Some(prefix) if prefix.eq_ignore_ascii_case("PM") => {
                let rest = trimmed[2..].trim_start();
                if rest.is_empty() {
                    return Err(invalid());
                }
                rest
            }
            _ => trimmed,
        };

        for (name, size) in [
            ("", Self::Whole),
            ("WHOLE", Self::Whole),
            ("NONE", Self::Whole),
            ("TOTAL", Self::Whole),
            ("25", Self::PM2_5),
            ("2_5", Self::PM2_5),
        ] {
            if bare.eq_ignore_ascii_case(name) {
                return Ok(size);
            }
        }

        bare.parse::<f64>()
            .ok()
            .and_then(Self::from_diameter)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PM1 => "PM1",
            Self::PM2_5 => "PM2.5",
            Self::PM10 => "PM10",
            Self::Whole => "Whole",
        };
        f.write_str(name)
    }
}

impl FromStr for Size {
    type Err = CutSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A size as written in configuration, before validation
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SizeToken {
    Number(f64),
    Text(String),
}

impl TryFrom<SizeToken> for Size {
    type Error = CutSizeError;

    fn try_from(token: SizeToken) -> Result<Self, Self::Error> {
        Self::try_from(&token)
    }
}

impl TryFrom<&SizeToken> for Size {
    type Error = CutSizeError;

    fn try_from(token: &SizeToken) -> Result<Self, Self::Error> {
        match token {
            SizeToken::Number(diameter) => {
                Self::from_diameter(*diameter).ok_or_else(|| CutSizeError::InvalidToken {
                    token: diameter.to_string(),
                })
            }
            SizeToken::Text(text) => Self::parse(text),
        }
    }
}

/// What the impactor is doing now and what it does next.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutSizeStatus {
    pub current: Size,
    /// `None` when the size never changes
    pub next: Option<Size>,
    pub next_time: Option<f64>,
}

/// Cut-size schedule
#[derive(Debug, Clone)]
pub struct CutSize {
    schedule: Schedule<Size>,
    constant_size: bool,
}

impl Default for CutSize {
    fn default() -> Self {
        Self::constant(Size::Whole)
    }
}

impl From<Schedule<Size>> for CutSize {
    fn from(schedule: Schedule<Size>) -> Self {
        Self {
            constant_size: schedule.len() == 1,
            schedule,
        }
    }
}

impl CutSize {
    /// A cut size that never changes.
    pub fn constant(size: Size) -> Self {
        Self {
            schedule: Schedule::single(size, DEFAULT_CYCLE_TIME),
            constant_size: true,
        }
    }

    /// Whether the schedule has exactly one slot.
    pub fn is_constant(&self) -> bool {
        self.constant_size
    }

    pub fn schedule(&self) -> &Schedule<Size> {
        &self.schedule
    }

    pub fn current(&mut self, now: f64) -> Size {
        *self.schedule.current(now).payload()
    }

    /// The upcoming change, or `None` if the size is constant.
    pub fn next(&mut self, now: f64) -> Option<&Active<Size>> {
        if self.constant_size {
            return None;
        }
        Some(self.schedule.next(now))
    }

    pub fn status(&mut self, now: f64) -> CutSizeStatus {
        if self.constant_size {
            return CutSizeStatus {
                current: self.current(now),
                next: None,
                next_time: None,
            };
        }
        let ScheduleStatus {
            current,
            next,
            next_time,
        } = self.schedule.status(now);
        CutSizeStatus {
            current,
            next: Some(next),
            next_time: Some(next_time),
        }
    }

    /// Drive `handler` through every size change.
    ///
    /// A constant size is activated once, after which the future stays
    /// pending until dropped.
    pub async fn run<C, D, H>(&mut self, clock: &C, delay: &mut D, handler: &mut H)
    where
        C: Clock,
        D: DelayNs,
        H: ActivationHandler<Size>,
    {
        if !self.constant_size {
            return self.schedule.run(clock, delay, handler).await;
        }

        self.schedule.activate_current(clock.now(), handler).await;
        info!("Cut size fixed at {}", self.current(clock.now()));
        core::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::schedule::tests::{SlowHandler, StepDelay};
    use alloc::vec;
    use alloc::vec::Vec;
    use core::pin::pin;
    use embassy_futures::poll_once;

    #[derive(Default)]
    struct Valve {
        switched: Vec<(Size, f64)>,
    }

    impl ActivationHandler<Size> for Valve {
        async fn automatic_activation(&mut self, active: &Active<Size>, now: f64) {
            self.switched.push((*active.payload(), now));
        }
    }

    #[test]
    fn test_parse_tokens() {
        for (text, size) in [
            ("PM1", Size::PM1),
            ("pm1", Size::PM1),
            ("1", Size::PM1),
            ("1.0", Size::PM1),
            ("PM2.5", Size::PM2_5),
            ("PM25", Size::PM2_5),
            ("2.5", Size::PM2_5),
            ("pm2_5", Size::PM2_5),
            ("PM10", Size::PM10),
            ("10", Size::PM10),
            (" PM 10 ", Size::PM10),
            ("", Size::Whole),
            ("whole", Size::Whole),
            ("NONE", Size::Whole),
            ("Total", Size::Whole),
        ] {
            assert_eq!(Size::parse(text), Ok(size), "parsing {text:?}");
        }
    }

    #[test]
    fn test_parse_invalid() {
        for text in ["PM", "PM4", "3", "big", "2.55"] {
            assert_eq!(
                text.parse::<Size>(),
                Err(CutSizeError::InvalidToken {
                    token: text.to_string()
                })
            );
        }
        assert!(Size::try_from(SizeToken::Number(4.0)).is_err());
    }

    #[test]
    fn test_deserialize_size() {
        let sizes: Vec<Size> = serde_json::from_str(r#"["PM1", 2.5, 10, "whole"]"#).unwrap();
        assert_eq!(sizes, vec![Size::PM1, Size::PM2_5, Size::PM10, Size::Whole]);
        assert!(serde_json::from_str::<Size>("\"PM4\"").is_err());
        assert_eq!(serde_json::to_string(&Size::PM2_5).unwrap(), "\"PM2.5\"");
    }

    #[test]
    fn test_diameter_and_display() {
        assert_eq!(Size::PM2_5.diameter(), Some(2.5));
        assert_eq!(Size::Whole.diameter(), None);
        assert_eq!(Size::PM10.to_string(), "PM10");
        assert_eq!(Size::Whole.to_string(), "Whole");
    }

    #[test]
    fn test_default_is_constant_whole() {
        let mut cut = CutSize::default();
        assert!(cut.is_constant());
        assert_eq!(cut.current(12_345.0), Size::Whole);
        assert!(cut.next(12_345.0).is_none());
        assert_eq!(
            cut.status(12_345.0),
            CutSizeStatus {
                current: Size::Whole,
                next: None,
                next_time: None,
            }
        );
    }

    #[test]
    fn test_cycling() {
        let schedule = Schedule::new(
            DEFAULT_CYCLE_TIME,
            [(0.0, Size::PM10), (1800.0, Size::PM1)],
        )
        .unwrap();
        let mut cut = CutSize::from(schedule);
        assert!(!cut.is_constant());

        assert_eq!(cut.current(3_600.0), Size::PM10);
        let next = cut.next(3_600.0).unwrap();
        assert_eq!(*next.payload(), Size::PM1);
        assert_eq!(next.next_time(), 5_400.0);
        assert_eq!(cut.current(5_400.0), Size::PM1);
        assert_eq!(
            cut.status(5_400.0),
            CutSizeStatus {
                current: Size::PM1,
                next: Some(Size::PM10),
                next_time: Some(7_200.0),
            }
        );
    }

    #[test]
    fn test_constant_run_activates_once() {
        let clock = ManualClock::new(50.0);
        let mut delay = StepDelay::new(&clock, 10);
        let mut valve = Valve::default();
        let mut cut = CutSize::constant(Size::PM2_5);

        let poll = poll_once(pin!(cut.run(&clock, &mut delay, &mut valve)));
        assert!(poll.is_pending());
        assert!(delay.sleeps.is_empty());
        assert_eq!(valve.switched, vec![(Size::PM2_5, 50.0)]);
    }

    #[test]
    fn test_cycling_run() {
        let clock = ManualClock::new(0.0);
        let mut delay = StepDelay::new(&clock, 2);
        let mut valve = Valve::default();
        let schedule =
            Schedule::new(600.0, [(0.0, Size::PM1), (300.0, Size::PM10)]).unwrap();
        let mut cut = CutSize::from(schedule);

        let poll = poll_once(pin!(cut.run(&clock, &mut delay, &mut valve)));
        assert!(poll.is_pending());
        assert_eq!(
            valve.switched,
            vec![(Size::PM1, 0.0), (Size::PM10, 300.0), (Size::PM1, 600.0)]
        );
    }

    #[test]
    fn test_cycling_run_with_slow_impactor() {
        let clock = ManualClock::new(0.0);
        let mut delay = StepDelay::new(&clock, 1);
        let mut impactor = SlowHandler {
            clock: &clock,
            takes: 400.0,
            calls: Vec::new(),
        };
        let schedule =
            Schedule::new(600.0, [(0.0, Size::PM1), (300.0, Size::PM10)]).unwrap();
        let mut cut = CutSize::from(schedule);

        let poll = poll_once(pin!(cut.run(&clock, &mut delay, &mut impactor)));
        assert!(poll.is_pending());

        assert_eq!(delay.sleeps, vec![1]);
        let sizes: Vec<Size> = impactor.calls.iter().map(|(size, _)| *size).collect();
        assert_eq!(sizes, vec![Size::PM1, Size::PM10]);
    }
}
