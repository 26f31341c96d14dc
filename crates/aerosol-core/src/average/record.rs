//! Interval bookkeeping for a set of accumulator entries

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};
use core::cell::Cell;

use critical_section::Mutex;
use log::{debug, trace, warn};
use serde::Serialize;

use super::RecordError;
use super::entry::{Accumulator, Array, EntryKind, FirstValid, Flag, LastValid, Variable, Vector};
use crate::config::AverageConfig;
use crate::interval::{ceil_boundary, floor_boundary};

static NEXT_RECORD_ID: Mutex<Cell<u32>> = Mutex::new(Cell::new(0));

fn next_record_id() -> u32 {
    critical_section::with(|cs| {
        let next = NEXT_RECORD_ID.borrow(cs);
        let id = next.get();
        next.set(id.wrapping_add(1));
        id
    })
}

/// Summary of one completed averaging interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AverageResult {
    /// Interval start (seconds since epoch)
    pub start_time: f64,
    /// Interval end (seconds since epoch)
    pub end_time: f64,
    /// Seconds of data that were folded into the entries
    pub total_seconds: f64,
    /// Number of accumulation passes that contributed data
    pub total_samples: u32,
}

/// Typed reference to an entry owned by an [`AverageRecord`].
///
/// Handles are only valid for the record that issued them.
pub struct Handle<K> {
    record: u32,
    index: usize,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> core::fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Handle")
            .field("record", &self.record)
            .field("index", &self.index)
            .finish()
    }
}

struct Slot {
    name: String,
    entry: super::Entry,
}

/// Folds timestamped samples into one statistic per averaging interval.
///
/// Instrument code pushes samples into the entries and then calls
/// [`tick`](Self::tick) with the sample time. Each call folds the span since
/// the previous call into every entry, weighted by its length in seconds,
/// and returns an [`AverageResult`] whenever an interval boundary is crossed.
///
/// ```rust,ignore
/// let mut record = AverageRecord::new(Some(60.0))?;
/// let scattering = record.variable("BsG")?;
///
/// record[scattering].push(12.5);
/// if let Some(result) = record.tick(now) {
///     emit(result, record[scattering].value());
/// }
/// ```
pub struct AverageRecord {
    id: u32,
    slots: Vec<Slot>,
    /// Averaging interval in seconds, `None` for pass-through
    interval: Option<f64>,
    average_start: Option<f64>,
    average_end: Option<f64>,
    /// Start of the span not yet folded into the entries
    next_record_start: Option<f64>,
    accumulated_seconds: f64,
    accumulated_samples: u32,
    averaging: bool,
    flush_end: Option<f64>,
}

impl AverageRecord {
    /// Create a record averaging over `interval` seconds.
    ///
    /// `None` or zero disables averaging: every tick then closes an interval.
    pub fn new(interval: Option<f64>) -> Result<Self, RecordError> {
        let interval = match interval {
            Some(value) if !value.is_finite() || value < 0.0 => {
                return Err(RecordError::InvalidInterval { value });
            }
            Some(value) if value == 0.0 => None,
            other => other,
        };

        Ok(Self {
            id: next_record_id(),
            slots: Vec::new(),
            interval,
            average_start: None,
            average_end: None,
            next_record_start: None,
            accumulated_seconds: 0.0,
            accumulated_samples: 0,
            averaging: true,
            flush_end: None,
        })
    }

    pub fn from_config(config: &AverageConfig) -> Result<Self, crate::config::ConfigError> {
        Ok(Self::new(config.interval()?)?)
    }

    fn register<K: EntryKind>(&mut self, name: &str) -> Result<Handle<K>, RecordError> {
        if self.slots.iter().any(|slot| slot.name == name) {
            return Err(RecordError::DuplicateEntry {
                name: name.to_string(),
            });
        }
        self.slots.push(Slot {
            name: name.to_string(),
            entry: K::default().wrap(),
        });
        Ok(Handle {
            record: self.id,
            index: self.slots.len() - 1,
            _kind: PhantomData,
        })
    }

    /// Add a time-weighted scalar mean.
    pub fn variable(&mut self, name: &str) -> Result<Handle<Variable>, RecordError> {
        self.register(name)
    }

    /// Add a boolean that reports whether it was ever set.
    pub fn flag(&mut self, name: &str) -> Result<Handle<Flag>, RecordError> {
        self.register(name)
    }

    /// Add a value that keeps the first valid sample of each interval.
    pub fn first_valid(&mut self, name: &str) -> Result<Handle<FirstValid>, RecordError> {
        self.register(name)
    }

    /// Add a value that keeps the last valid sample of each interval.
    pub fn last_valid(&mut self, name: &str) -> Result<Handle<LastValid>, RecordError> {
        self.register(name)
    }

    /// Add a magnitude/direction pair averaged as a vector.
    pub fn vector(&mut self, name: &str) -> Result<Handle<Vector>, RecordError> {
        self.register(name)
    }

    /// Add a variable-length array of scalar means.
    pub fn array(&mut self, name: &str) -> Result<Handle<Array>, RecordError> {
        self.register(name)
    }

    /// Typed access to an entry, `None` if the handle belongs to another record.
    pub fn get<K: EntryKind>(&self, handle: Handle<K>) -> Option<&K> {
        if handle.record != self.id {
            return None;
        }
        K::from_entry(&self.slots.get(handle.index)?.entry)
    }

    /// Mutable counterpart of [`get`](Self::get).
    pub fn get_mut<K: EntryKind>(&mut self, handle: Handle<K>) -> Option<&mut K> {
        if handle.record != self.id {
            return None;
        }
        K::from_entry_mut(&mut self.slots.get_mut(handle.index)?.entry)
    }

    /// Name the entry was registered under.
    pub fn name<K>(&self, handle: Handle<K>) -> Option<&str> {
        if handle.record != self.id {
            return None;
        }
        self.slots.get(handle.index).map(|slot| slot.name.as_str())
    }

    /// Entry names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.name.as_str())
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no entries are registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn interval(&self) -> Option<f64> {
        self.interval
    }

    pub fn average_start(&self) -> Option<f64> {
        self.average_start
    }

    pub fn average_end(&self) -> Option<f64> {
        self.average_end
    }

    pub fn is_averaging(&self) -> bool {
        self.averaging
    }

    /// Whether accumulation is being discarded at `now`.
    pub fn is_flushing(&self, now: f64) -> bool {
        self.flush_end.is_some_and(|end| now < end)
    }

    /// Enable or suspend accumulation (bypass). Boundaries keep advancing.
    pub fn set_averaging(&mut self, enabled: bool) {
        if self.averaging != enabled {
            debug!("Averaging {}", if enabled { "resumed" } else { "suspended" });
        }
        self.averaging = enabled;
    }

    /// Discard everything accumulated so far and ignore data until
    /// `now + duration`. An earlier flush that ends later is kept.
    pub fn start_flush(&mut self, duration: f64, now: f64) {
        self.reset();
        if !duration.is_finite() {
            warn!("Ignoring non-finite flush duration {}", duration);
            return;
        }
        let end = now + duration;
        let end = match self.flush_end {
            Some(existing) if existing > end => existing,
            _ => end,
        };
        debug!("Flushing data until {}", end);
        self.flush_end = Some(end);
    }

    /// Drop all entry state and the data accumulated in the open interval.
    ///
    /// Interval boundaries are kept, so the next result still lands on the
    /// same schedule.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.entry.reset();
        }
        self.accumulated_seconds = 0.0;
        self.accumulated_samples = 0;
        self.next_record_start = None;
    }

    fn for_each_entry(&mut self, mut op: impl FnMut(&mut super::Entry)) {
        for slot in &mut self.slots {
            op(&mut slot.entry);
        }
    }

    fn clear_pending(&mut self) {
        self.for_each_entry(|entry| entry.clear_pending());
    }

    /// Fold the pending samples into every entry over `[start, end)`,
    /// honouring bypass and flush suppression.
    fn accumulate_span(&mut self, start: f64, end: f64) {
        if !self.averaging {
            return;
        }
        let mut start = start;
        if let Some(flush_end) = self.flush_end {
            if end <= flush_end {
                return;
            }
            start = start.max(flush_end);
        }
        let seconds = end - start;
        if !(seconds >= 0.0) {
            return;
        }

        self.for_each_entry(|entry| entry.accumulate(seconds));
        self.accumulated_seconds += seconds;
        self.accumulated_samples += 1;
    }

    fn expire_flush(&mut self, now: f64) {
        if self.flush_end.is_some_and(|end| now >= end) {
            debug!("Flush ended at {}", now);
            self.flush_end = None;
        }
    }

    /// Open the interval containing `now`.
    fn arm(&mut self, now: f64) {
        match self.interval {
            Some(interval) => {
                self.average_start = Some(floor_boundary(now, interval));
                self.average_end = Some(ceil_boundary(now, interval));
            }
            None => {
                self.average_start = Some(now);
                self.average_end = None;
            }
        }
        self.accumulated_seconds = 0.0;
        self.accumulated_samples = 0;
    }

    fn publish(&mut self) {
        self.for_each_entry(|entry| {
            entry.complete();
            entry.begin();
        });
    }

    /// Process the samples pushed since the last call.
    ///
    /// The pending samples are taken to hold from the previous call up to
    /// `now`. Returns a result when `now` reaches the end of the open
    /// interval; otherwise `None`. The first call only opens an interval and
    /// discards whatever was pending.
    ///
    /// `now` must not decrease between calls.
    pub fn tick(&mut self, now: f64) -> Option<AverageResult> {
        let Some(average_start) = self.average_start else {
            self.arm(now);
            self.next_record_start = Some(now);
            self.clear_pending();
            self.expire_flush(now);
            trace!("Armed averaging at {} until {:?}", now, self.average_end);
            return None;
        };

        if let Some(end) = self.average_end
            && now < end
        {
            if let Some(start) = self.next_record_start {
                self.accumulate_span(start, now);
            }
            self.next_record_start = Some(now);
            self.clear_pending();
            self.expire_flush(now);
            return None;
        }

        // Reporting slower than the interval: move the boundary up to the
        // last one before `now` instead of emitting every missed interval.
        if let (Some(interval), Some(end)) = (self.interval, self.average_end) {
            let boundary = floor_boundary(now, interval);
            if boundary > end {
                warn!(
                    "Skipped averaging intervals: extending {} -> {} to {}",
                    average_start, end, boundary
                );
                self.average_end = Some(boundary);
            }
        }

        let carry = match (self.next_record_start.take(), self.average_end) {
            (Some(start), Some(end)) if now > end => {
                self.accumulate_span(start, end);
                Some(end)
            }
            (Some(start), _) => {
                self.accumulate_span(start, now);
                None
            }
            (None, _) => None,
        };

        let result = AverageResult {
            start_time: average_start,
            end_time: self.average_end.unwrap_or(now),
            total_seconds: self.accumulated_seconds,
            total_samples: self.accumulated_samples,
        };
        self.publish();
        debug!(
            "Completed average {} - {} ({} s, {} samples)",
            result.start_time, result.end_time, result.total_seconds, result.total_samples
        );

        self.arm(now);
        if let Some(start) = carry {
            self.accumulate_span(start, now);
        }
        self.next_record_start = Some(now);
        self.clear_pending();
        self.expire_flush(now);

        Some(result)
    }

    /// Close whatever interval is open, even a partial one, and return to
    /// the unarmed state. Used at shutdown.
    pub fn complete(&mut self, now: f64) -> Option<AverageResult> {
        let average_start = self.average_start?;

        let end_time = match self.average_end {
            Some(end) if end < now => end,
            _ => now,
        };
        if let Some(start) = self.next_record_start.take() {
            self.accumulate_span(start, end_time);
        }

        let result = AverageResult {
            start_time: average_start,
            end_time,
            total_seconds: self.accumulated_seconds,
            total_samples: self.accumulated_samples,
        };
        self.publish();
        self.clear_pending();
        debug!(
            "Final average {} - {} ({} s, {} samples)",
            result.start_time, result.end_time, result.total_seconds, result.total_samples
        );

        self.average_start = None;
        self.average_end = None;
        self.accumulated_seconds = 0.0;
        self.accumulated_samples = 0;
        self.flush_end = None;

        Some(result)
    }
}

impl<K: EntryKind> Index<Handle<K>> for AverageRecord {
    type Output = K;

    fn index(&self, handle: Handle<K>) -> &K {
        assert_eq!(handle.record, self.id, "entry handle used with a different AverageRecord");
        match K::from_entry(&self.slots[handle.index].entry) {
            Some(entry) => entry,
            None => unreachable!("handle kind always matches its slot"),
        }
    }
}

impl<K: EntryKind> IndexMut<Handle<K>> for AverageRecord {
    fn index_mut(&mut self, handle: Handle<K>) -> &mut K {
        assert_eq!(handle.record, self.id, "entry handle used with a different AverageRecord");
        match K::from_entry_mut(&mut self.slots[handle.index].entry) {
            Some(entry) => entry,
            None => unreachable!("handle kind always matches its slot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::average::Sample;

    fn record(interval: f64) -> AverageRecord {
        AverageRecord::new(Some(interval)).unwrap()
    }

    #[test]
    fn test_basic() {
        let mut rec = record(100.0);
        let v1 = rec.variable("v1").unwrap();

        rec[v1].push(1.0);
        assert_eq!(rec.tick(100.0), None);
        rec[v1].push(2.0);
        assert_eq!(rec.tick(150.0), None);
        rec[v1].push(3.0);
        let result = rec.tick(200.0).unwrap();

        assert_eq!(result.start_time, 100.0);
        assert_eq!(result.end_time, 200.0);
        assert_eq!(result.total_seconds, 100.0);
        assert_eq!(result.total_samples, 2);
        assert_eq!(rec[v1].value(), 2.5);
    }

    #[test]
    fn test_long() {
        let mut rec = record(100.0);
        let v = rec.variable("v").unwrap();

        assert_eq!(rec.tick(100.0), None);

        rec[v].push(2.0);
        let first = rec.tick(250.0).unwrap();
        assert_eq!((first.start_time, first.end_time), (100.0, 200.0));
        assert_eq!(first.total_seconds, 100.0);
        assert_eq!(rec[v].value(), 2.0);

        rec[v].push(3.0);
        let second = rec.tick(400.0).unwrap();
        assert_eq!((second.start_time, second.end_time), (200.0, 400.0));
        assert_eq!(second.total_seconds, 200.0);
        assert_eq!(rec[v].value(), 2.75);

        rec[v].push(4.0);
        let third = rec.tick(720.0).unwrap();
        assert_eq!((third.start_time, third.end_time), (400.0, 700.0));
        assert_eq!(rec[v].value(), 4.0);
        assert_eq!(rec.average_start(), Some(700.0));
        assert_eq!(rec.average_end(), Some(800.0));
    }

    #[test]
    fn test_carry_over_into_next_interval() {
        let mut rec = record(100.0);
        let v = rec.variable("v").unwrap();
        rec.tick(0.0);

        rec[v].push(10.0);
        rec.tick(50.0);
        rec[v].push(20.0);
        let result = rec.tick(150.0).unwrap();
        assert_eq!(result.total_seconds, 100.0);
        assert_eq!(rec[v].value(), 15.0);

        rec[v].push(30.0);
        let result = rec.tick(200.0).unwrap();
        assert_eq!((result.start_time, result.end_time), (100.0, 200.0));
        assert_eq!(result.total_seconds, 100.0);
        assert_eq!(result.total_samples, 2);
        assert_eq!(rec[v].value(), 25.0);
    }

    #[test]
    fn test_silent_interval_publishes_nan() {
        let mut rec = record(10.0);
        let v = rec.variable("v").unwrap();
        let f = rec.flag("f").unwrap();
        rec.tick(0.0);
        rec[v].push(1.0);
        rec[f].push(true);
        rec.tick(10.0).unwrap();
        assert_eq!(rec[v].value(), 1.0);
        assert!(rec[f].value());

        let result = rec.tick(20.0).unwrap();
        assert_eq!(result.total_samples, 1);
        assert!(rec[v].value().is_nan());
        assert!(!rec[f].value());
    }

    #[test]
    fn test_entry_kinds_in_record() {
        let mut rec = record(60.0);
        let flag = rec.flag("alarm").unwrap();
        let first = rec.first_valid("status").unwrap();
        let last = rec.last_valid("serial").unwrap();
        let wind = rec.vector("wind").unwrap();
        let raw = rec.array("raw").unwrap();

        rec.tick(0.0);
        rec[flag].push(true);
        rec[first].push("warming");
        rec[last].push(1_i64);
        rec[wind].push(20.0, 30.0);
        rec[raw].push(&[1.0, 2.0]);
        rec.tick(30.0);
        rec[flag].push(false);
        rec[first].push("ready");
        rec[last].push(2_i64);
        rec[wind].push(30.0, 30.0);
        rec[raw].push(&[3.0]);
        rec.tick(60.0).unwrap();

        assert!(rec[flag].value());
        assert_eq!(rec[first].value(), Some(&Sample::from("warming")));
        assert_eq!(rec[last].value(), Some(&Sample::Integer(2)));
        assert!((rec[wind].magnitude() - 25.0).abs() < 1e-9);
        assert!((rec[wind].direction() - 30.0).abs() < 1e-9);
        assert_eq!(rec[raw].value(), &[2.0, 2.0]);
    }

    #[test]
    fn test_unaveraged_passes_through() {
        let mut rec = AverageRecord::new(None).unwrap();
        let v = rec.variable("v").unwrap();
        assert_eq!(rec.tick(5.0), None);

        rec[v].push(7.0);
        let result = rec.tick(6.0).unwrap();
        assert_eq!((result.start_time, result.end_time), (5.0, 6.0));
        assert_eq!(rec[v].value(), 7.0);

        rec[v].push(8.0);
        let result = rec.tick(8.0).unwrap();
        assert_eq!((result.start_time, result.end_time), (6.0, 8.0));
        assert_eq!(result.total_seconds, 2.0);
        assert_eq!(rec[v].value(), 8.0);
    }

    #[test]
    fn test_zero_interval_is_unaveraged() {
        let rec = AverageRecord::new(Some(0.0)).unwrap();
        assert_eq!(rec.interval(), None);
    }

    #[test]
    fn test_invalid_interval_rejected() {
        assert!(matches!(
            AverageRecord::new(Some(-5.0)),
            Err(RecordError::InvalidInterval { .. })
        ));
        assert!(AverageRecord::new(Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut rec = record(60.0);
        rec.variable("BsG").unwrap();
        assert_eq!(
            rec.flag("BsG").unwrap_err(),
            RecordError::DuplicateEntry {
                name: "BsG".to_string()
            }
        );
        assert_eq!(rec.len(), 1);
    }

    #[test]
    fn test_record_ids_unique_across_threads() {
        let workers: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..50)
                        .map(|_| AverageRecord::new(Some(60.0)).unwrap().id)
                        .collect::<Vec<u32>>()
                })
            })
            .collect();

        let mut ids = std::collections::BTreeSet::new();
        for worker in workers {
            ids.extend(worker.join().unwrap());
        }
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn test_foreign_handle_rejected() {
        let mut a = record(60.0);
        let mut b = record(60.0);
        let handle = a.variable("x").unwrap();
        b.variable("x").unwrap();
        assert!(b.get(handle).is_none());
        assert!(b.get_mut(handle).is_none());
        assert!(b.name(handle).is_none());
        assert_eq!(a.name(handle), Some("x"));
    }

    #[test]
    #[should_panic(expected = "different AverageRecord")]
    fn test_foreign_handle_index_panics() {
        let mut a = record(60.0);
        let b = record(60.0);
        let handle = a.variable("x").unwrap();
        let _ = b[handle].value();
    }

    #[test]
    fn test_flush_suppresses_accumulation() {
        let mut rec = record(100.0);
        let v = rec.variable("v").unwrap();
        rec.tick(0.0);

        rec[v].push(100.0);
        rec.tick(10.0);
        rec.start_flush(30.0, 10.0);
        assert!(rec.is_flushing(20.0));

        rec[v].push(500.0);
        rec.tick(20.0);
        rec[v].push(500.0);
        rec.tick(35.0);
        assert!(rec.is_flushing(39.0));

        rec[v].push(1.0);
        rec.tick(50.0);
        assert!(!rec.is_flushing(50.0));
        rec[v].push(3.0);
        let result = rec.tick(100.0).unwrap();

        assert_eq!(result.total_seconds, 60.0);
        let expected = (1.0 * 10.0 + 3.0 * 50.0) / 60.0;
        assert!((rec[v].value() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_flush_never_shortened() {
        let mut rec = record(100.0);
        rec.tick(0.0);
        rec.start_flush(60.0, 0.0);
        rec.start_flush(10.0, 5.0);
        assert!(rec.is_flushing(59.0));
        assert!(!rec.is_flushing(60.0));
    }

    #[test]
    fn test_bypass_keeps_boundaries() {
        let mut rec = record(100.0);
        let v = rec.variable("v").unwrap();
        rec.tick(0.0);
        rec[v].push(1.0);
        rec.tick(50.0);

        rec.set_averaging(false);
        assert!(!rec.is_averaging());
        rec[v].push(9.0);
        let result = rec.tick(100.0).unwrap();
        assert_eq!(result.total_seconds, 50.0);
        assert_eq!(rec[v].value(), 1.0);

        rec[v].push(9.0);
        let result = rec.tick(200.0).unwrap();
        assert_eq!((result.start_time, result.end_time), (100.0, 200.0));
        assert_eq!(result.total_seconds, 0.0);
        assert_eq!(result.total_samples, 0);
        assert!(rec[v].value().is_nan());

        rec.set_averaging(true);
        rec[v].push(4.0);
        rec.tick(300.0).unwrap();
        assert_eq!(rec[v].value(), 4.0);
    }

    #[test]
    fn test_complete_partial_interval() {
        let mut rec = record(100.0);
        let v = rec.variable("v").unwrap();
        assert_eq!(rec.complete(10.0), None);

        rec.tick(100.0);
        rec[v].push(6.0);
        rec.tick(120.0);
        rec[v].push(2.0);
        let result = rec.complete(140.0).unwrap();
        assert_eq!((result.start_time, result.end_time), (100.0, 140.0));
        assert_eq!(result.total_seconds, 40.0);
        assert_eq!(rec[v].value(), 4.0);
        assert_eq!(rec.average_start(), None);

        assert_eq!(rec.tick(150.0), None, "complete leaves the record unarmed");
        assert_eq!(rec[v].value(), 4.0);
    }

    #[test]
    fn test_complete_after_boundary_clips_to_end() {
        let mut rec = record(100.0);
        let v = rec.variable("v").unwrap();
        rec.tick(0.0);
        rec[v].push(1.0);
        let result = rec.complete(250.0).unwrap();
        assert_eq!(result.end_time, 100.0);
        assert_eq!(result.total_seconds, 100.0);
    }

    #[test]
    fn test_reset_keeps_schedule() {
        let mut rec = record(100.0);
        let v = rec.variable("v").unwrap();
        rec.tick(0.0);
        rec[v].push(1.0);
        rec.tick(50.0);
        rec.reset();
        rec[v].push(2.0);
        rec.tick(60.0);
        rec[v].push(3.0);
        let result = rec.tick(100.0).unwrap();
        assert_eq!((result.start_time, result.end_time), (0.0, 100.0));
        assert_eq!(result.total_seconds, 40.0);
        assert_eq!(rec[v].value(), 3.0);
    }

    #[test]
    fn test_from_config() {
        let config: AverageConfig = serde_json::from_str(r#"{"interval": "PT5M"}"#).unwrap();
        let rec = AverageRecord::from_config(&config).unwrap();
        assert_eq!(rec.interval(), Some(300.0));

        let config: AverageConfig = serde_json::from_str(r#"{"interval": false}"#).unwrap();
        assert_eq!(AverageRecord::from_config(&config).unwrap().interval(), None);

        let config: AverageConfig = serde_json::from_str(r#"{"interval": -3}"#).unwrap();
        assert!(AverageRecord::from_config(&config).is_err());
    }
}
