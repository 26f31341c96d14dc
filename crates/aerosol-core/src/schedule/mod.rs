//! Cyclic scheduling of instrument states
//!
//! A [`Schedule`] repeats a fixed list of slots every `cycle_time` seconds.
//! Each slot starts at its offset into the cycle and stays current until the
//! next slot's offset. Resolution works from absolute time alone, so a caller
//! that sleeps through several boundaries lands on the right slot directly.

mod active;

use alloc::vec::Vec;
use core::future::Future;

use embedded_hal_async::delay::DelayNs;
use log::{debug, info};
use serde::Serialize;
use thiserror_no_std::Error;

use crate::clock::{Clock, sleep_until};
use crate::interval::floor_boundary;

pub use active::Active;

/// Slack used when deciding whether an alternate slot would land on the
/// first primary slot of the next cycle.
const OFFSET_EPSILON: f64 = 1e-6;

/// Most slots an alternate may expand into.
const MAX_ALTERNATE_SLOTS: f64 = 10_000.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("Schedule has no slots")]
    EmptySchedule,

    /// Cycle time must be positive and finite.
    #[error("Invalid cycle time: {value}")]
    InvalidCycleTime {
        /// The rejected cycle time in seconds
        value: f64,
    },

    /// Alternation interval must be positive and finite, and may not split
    /// the cycle into more slots than the schedule allows.
    #[error("Invalid alternate interval: {value}")]
    InvalidAlternateInterval {
        /// The rejected interval in seconds
        value: f64,
    },

    #[error("Invalid slot offset: {value}")]
    InvalidOffset {
        /// The rejected offset in seconds
        value: f64,
    },
}

/// A payload interleaved with the last primary slot every `interval` seconds
/// until the cycle wraps around.
#[derive(Debug, Clone)]
pub struct Alternate<P> {
    pub payload: P,
    pub interval: f64,
}

/// Snapshot of what is active and what comes next.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleStatus<P> {
    pub current: P,
    pub next: P,
    /// Absolute time the next slot begins
    pub next_time: f64,
}

/// Side effects to run when a slot becomes current.
pub trait ActivationHandler<P> {
    /// Called once per slot occurrence by [`Schedule::run`].
    ///
    /// The occurrence is only marked activated after the returned future
    /// completes, so if it is dropped part way the call is repeated.
    fn automatic_activation(&mut self, active: &Active<P>, now: f64) -> impl Future<Output = ()>;
}

impl<P> ActivationHandler<P> for () {
    async fn automatic_activation(&mut self, _active: &Active<P>, _now: f64) {}
}

/// Put `offset` into `[0, cycle_time)`.
fn normalize_offset(offset: f64, cycle_time: f64) -> f64 {
    let mut offset = offset % cycle_time;
    if offset < 0.0 {
        offset += cycle_time;
    }
    // -tiny + cycle_time can round up to cycle_time
    if offset >= cycle_time { 0.0 } else { offset }
}

fn sort_by_offset<P>(actives: &mut [Active<P>]) {
    actives.sort_by(|a, b| a.offset().total_cmp(&b.offset()));
}

/// Repeating list of slots, sorted by offset.
#[derive(Debug, Clone)]
pub struct Schedule<P> {
    cycle_time: f64,
    actives: Vec<Active<P>>,
    current_index: Option<usize>,
    /// Time at which the cached current slot stops being current
    boundary: f64,
}

impl<P: Clone> Schedule<P> {
    /// Create a schedule from `(offset, payload)` pairs.
    pub fn new(
        cycle_time: f64,
        entries: impl IntoIterator<Item = (f64, P)>,
    ) -> Result<Self, ScheduleError> {
        Self::build(cycle_time, entries, None)
    }

    /// Create a schedule, optionally expanding an alternate payload between
    /// the last primary slot and the first one of the following cycle.
    pub fn build(
        cycle_time: f64,
        entries: impl IntoIterator<Item = (f64, P)>,
        alternate: Option<Alternate<P>>,
    ) -> Result<Self, ScheduleError> {
        if !cycle_time.is_finite() || cycle_time <= 0.0 {
            return Err(ScheduleError::InvalidCycleTime { value: cycle_time });
        }

        let mut actives = Vec::new();
        for (offset, payload) in entries {
            if !offset.is_finite() {
                return Err(ScheduleError::InvalidOffset { value: offset });
            }
            actives.push(Active::new(payload, normalize_offset(offset, cycle_time)));
        }
        if actives.is_empty() {
            return Err(ScheduleError::EmptySchedule);
        }
        sort_by_offset(&mut actives);

        if let Some(alternate) = alternate {
            if !alternate.interval.is_finite()
                || alternate.interval <= 0.0
                || cycle_time / alternate.interval > MAX_ALTERNATE_SLOTS
            {
                return Err(ScheduleError::InvalidAlternateInterval {
                    value: alternate.interval,
                });
            }

            let first = actives[0].offset();
            let last = &actives[actives.len() - 1];
            let start = last.offset();
            let primary = last.payload().clone();
            let limit = first + cycle_time - OFFSET_EPSILON;

            let mut expanded = Vec::new();
            let mut step = 1_u32;
            loop {
                let offset = start + f64::from(step) * alternate.interval;
                if offset >= limit {
                    break;
                }
                let payload = if step % 2 == 1 {
                    alternate.payload.clone()
                } else {
                    primary.clone()
                };
                expanded.push(Active::new(payload, normalize_offset(offset, cycle_time)));
                step += 1;
            }
            debug!("Expanded alternate into {} slots", expanded.len());

            actives.extend(expanded);
            sort_by_offset(&mut actives);
        }

        Ok(Self {
            cycle_time,
            actives,
            current_index: None,
            boundary: f64::NAN,
        })
    }

    /// Payloads of the current and next slot at `now`.
    pub fn status(&mut self, now: f64) -> ScheduleStatus<P> {
        let current = self.advance(now);
        let next = self.next_index(current);
        ScheduleStatus {
            current: self.actives[current].payload().clone(),
            next: self.actives[next].payload().clone(),
            next_time: self.actives[next].next_time(),
        }
    }
}

impl<P> Schedule<P> {
    /// One slot at offset zero. `cycle_time` must be positive and finite.
    pub(crate) fn single(payload: P, cycle_time: f64) -> Self {
        Self {
            cycle_time,
            actives: alloc::vec![Active::new(payload, 0.0)],
            current_index: None,
            boundary: f64::NAN,
        }
    }

    pub fn cycle_time(&self) -> f64 {
        self.cycle_time
    }

    /// All slots in offset order.
    pub fn actives(&self) -> &[Active<P>] {
        &self.actives
    }

    pub fn len(&self) -> usize {
        self.actives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actives.is_empty()
    }

    fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.actives.len()
    }

    /// Resolve the slot that is current at `now` and return its position in
    /// [`actives`](Self::actives).
    ///
    /// The result is cached until `now` reaches the start of the next slot.
    /// Times earlier than the last resolution are not detected and return the
    /// cached slot.
    pub fn advance(&mut self, now: f64) -> usize {
        if let Some(index) = self.current_index
            && now < self.boundary
        {
            return index;
        }

        let cycle_time = self.cycle_time;
        let cycle_start = floor_boundary(now, cycle_time);
        let phase = now - cycle_start;

        let (index, occurrence_start) =
            match self.actives.iter().rposition(|active| active.offset() <= phase) {
                Some(index) => (index, cycle_start),
                // Before the first offset: still in the last slot of the previous cycle
                None => (self.actives.len() - 1, cycle_start - cycle_time),
            };

        for (i, active) in self.actives.iter_mut().enumerate() {
            if i == index {
                let scheduled = occurrence_start + active.offset();
                active.set_times(scheduled, scheduled + cycle_time);
            } else {
                let mut upcoming = cycle_start + active.offset();
                if upcoming <= now {
                    upcoming += cycle_time;
                }
                active.set_times(upcoming, upcoming);
            }
        }

        let next = self.next_index(index);
        self.boundary = self.actives[next].next_time();
        self.current_index = Some(index);
        debug!(
            "Resolved slot {} (offset {}) at {}, next boundary {}",
            index,
            self.actives[index].offset(),
            now,
            self.boundary
        );
        index
    }

    pub fn current(&mut self, now: f64) -> &Active<P> {
        let index = self.advance(now);
        &self.actives[index]
    }

    pub fn current_mut(&mut self, now: f64) -> &mut Active<P> {
        let index = self.advance(now);
        &mut self.actives[index]
    }

    /// The slot that follows the current one at `now`.
    pub fn next(&mut self, now: f64) -> &Active<P> {
        let index = self.advance(now);
        &self.actives[self.next_index(index)]
    }

    /// Activate the current slot through `handler` if this occurrence has
    /// not been activated yet.
    pub async fn activate_current<H>(&mut self, now: f64, handler: &mut H) -> bool
    where
        H: ActivationHandler<P>,
    {
        let index = self.advance(now);
        if self.actives[index].is_activated() {
            return false;
        }
        handler
            .automatic_activation(&self.actives[index], now)
            .await;
        let active = &mut self.actives[index];
        active.activate(now);
        info!(
            "Activated slot at offset {} (scheduled {})",
            active.offset(),
            active.scheduled_time()
        );
        true
    }

    /// Activate each slot as it becomes current, sleeping in between.
    ///
    /// Never returns; drop the future to stop.
    pub async fn run<C, D, H>(&mut self, clock: &C, delay: &mut D, handler: &mut H)
    where
        C: Clock,
        D: DelayNs,
        H: ActivationHandler<P>,
    {
        loop {
            // The boundary after this slot is taken from the activation time,
            // so a slow handler cannot skip past it.
            let now = clock.now();
            self.activate_current(now, handler).await;

            let target = self.next(now).next_time();
            delay_for(delay, sleep_until(target, clock.now())).await;
        }
    }
}

/// Sleep for `duration`, rounded up to whole milliseconds.
async fn delay_for<D: DelayNs>(delay: &mut D, duration: embassy_time::Duration) {
    let millis = duration.as_micros().div_ceil(1000);
    delay.delay_ms(u32::try_from(millis).unwrap_or(u32::MAX)).await;
}
