//! Accumulator entry kinds
//!
//! Every entry holds three things:
//!
//! - a **pending** sample, the most recent value pushed by the instrument code
//! - the **running** state for the interval currently being averaged
//! - the **published** value of the last completed interval
//!
//! The owning [`AverageRecord`](super::AverageRecord) decides how many seconds
//! each pending sample stands for and calls [`Accumulator::accumulate`] with
//! that weight. Pushing never changes the published value; only
//! [`Accumulator::complete`] does.

use alloc::string::String;
use alloc::vec::Vec;
use core::f64::consts::PI;

use serde::Serialize;

use crate::math;

/// Directions within this distance of 360° are reported as 0°.
const DIRECTION_WRAP_EPSILON: f64 = 1e-10;

/// Operations shared by every entry kind.
///
/// `push` is not part of the trait because each kind takes a different sample
/// type.
pub trait Accumulator {
    /// Fold the pending sample into the running state with weight `seconds`.
    ///
    /// A no-op for the statistic when nothing is pending, but still marks the
    /// interval as open so the next completion publishes.
    fn accumulate(&mut self, seconds: f64);

    /// Publish the running state and clear it for the next interval.
    ///
    /// Calling this again without an intervening `accumulate` or `begin`
    /// leaves the published value untouched.
    fn complete(&mut self);

    /// Drop the running state and open a fresh interval.
    fn begin(&mut self);

    /// Drop pending, running and published state.
    fn reset(&mut self);

    /// Drop only the pending sample.
    fn clear_pending(&mut self);
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Time-weighted mean of a scalar.
#[derive(Debug, Clone)]
pub struct Variable {
    pending: Option<f64>,
    sum: f64,
    seconds: f64,
    open: bool,
    value: f64,
    weight: f64,
}

impl Default for Variable {
    fn default() -> Self {
        Self {
            pending: None,
            sum: 0.0,
            seconds: 0.0,
            open: true,
            value: f64::NAN,
            weight: 0.0,
        }
    }
}

impl Variable {
    /// Set the pending sample. NaN, infinities and `None` mark it absent.
    pub fn push(&mut self, value: impl Into<Option<f64>>) {
        self.pending = finite(value.into());
    }

    pub fn pending(&self) -> Option<f64> {
        self.pending
    }

    /// Mean of the last completed interval, NaN if nothing was accumulated.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Seconds of data behind [`value`](Self::value).
    pub fn weight(&self) -> f64 {
        self.weight
    }
}

impl Accumulator for Variable {
    fn accumulate(&mut self, seconds: f64) {
        self.open = true;
        let Some(value) = self.pending else {
            return;
        };
        if !(seconds >= 0.0) || !seconds.is_finite() {
            return;
        }
        self.sum += value * seconds;
        self.seconds += seconds;
    }

    fn complete(&mut self) {
        if !self.open {
            return;
        }
        self.value = if self.seconds > 0.0 {
            self.sum / self.seconds
        } else {
            f64::NAN
        };
        self.weight = self.seconds;
        self.sum = 0.0;
        self.seconds = 0.0;
        self.open = false;
    }

    fn begin(&mut self) {
        self.sum = 0.0;
        self.seconds = 0.0;
        self.open = true;
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn clear_pending(&mut self) {
        self.pending = None;
    }
}

/// Boolean that publishes `true` if it was ever `true` during the interval.
#[derive(Debug, Clone)]
pub struct Flag {
    pending: Option<bool>,
    seen: bool,
    open: bool,
    value: bool,
}

impl Default for Flag {
    fn default() -> Self {
        Self {
            pending: None,
            seen: false,
            open: true,
            value: false,
        }
    }
}

impl Flag {
    pub fn push(&mut self, value: impl Into<Option<bool>>) {
        self.pending = value.into();
    }

    pub fn pending(&self) -> Option<bool> {
        self.pending
    }

    pub fn value(&self) -> bool {
        self.value
    }
}

impl Accumulator for Flag {
    fn accumulate(&mut self, _seconds: f64) {
        self.open = true;
        if self.pending == Some(true) {
            self.seen = true;
        }
    }

    fn complete(&mut self) {
        if !self.open {
            return;
        }
        self.value = self.seen;
        self.seen = false;
        self.open = false;
    }

    fn begin(&mut self) {
        self.seen = false;
        self.open = true;
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn clear_pending(&mut self) {
        self.pending = None;
    }
}

/// Payload captured by [`FirstValid`] and [`LastValid`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Sample {
    Float(f64),
    Integer(i64),
    Text(String),
}

impl Sample {
    /// Non-finite floats count as missing data.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Float(value) => value.is_finite(),
            Self::Integer(_) | Self::Text(_) => true,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Integer(value) => Some(*value as f64),
            Self::Text(_) => None,
        }
    }
}

impl From<f64> for Sample {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for Sample {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for Sample {
    fn from(value: &str) -> Self {
        Self::Text(String::from(value))
    }
}

impl From<String> for Sample {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

fn valid_sample(value: Option<Sample>) -> Option<Sample> {
    value.filter(Sample::is_valid)
}

/// First valid sample seen during the interval, ignoring duration.
#[derive(Debug, Clone)]
pub struct FirstValid {
    pending: Option<Sample>,
    captured: Option<Sample>,
    open: bool,
    value: Option<Sample>,
}

impl Default for FirstValid {
    fn default() -> Self {
        Self {
            pending: None,
            captured: None,
            open: true,
            value: None,
        }
    }
}

impl FirstValid {
    pub fn push(&mut self, value: impl Into<Sample>) {
        self.pending = valid_sample(Some(value.into()));
    }

    pub fn push_option<V: Into<Sample>>(&mut self, value: Option<V>) {
        self.pending = valid_sample(value.map(Into::into));
    }

    pub fn value(&self) -> Option<&Sample> {
        self.value.as_ref()
    }
}

impl Accumulator for FirstValid {
    fn accumulate(&mut self, _seconds: f64) {
        self.open = true;
        if self.captured.is_none() {
            self.captured = self.pending.clone();
        }
    }

    fn complete(&mut self) {
        if !self.open {
            return;
        }
        self.value = self.captured.take();
        self.open = false;
    }

    fn begin(&mut self) {
        self.captured = None;
        self.open = true;
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn clear_pending(&mut self) {
        self.pending = None;
    }
}

/// Last valid sample seen during the interval, ignoring duration.
#[derive(Debug, Clone)]
pub struct LastValid {
    pending: Option<Sample>,
    captured: Option<Sample>,
    open: bool,
    value: Option<Sample>,
}

impl Default for LastValid {
    fn default() -> Self {
        Self {
            pending: None,
            captured: None,
            open: true,
            value: None,
        }
    }
}

impl LastValid {
    pub fn push(&mut self, value: impl Into<Sample>) {
        self.pending = valid_sample(Some(value.into()));
    }

    pub fn push_option<V: Into<Sample>>(&mut self, value: Option<V>) {
        self.pending = valid_sample(value.map(Into::into));
    }

    pub fn value(&self) -> Option<&Sample> {
        self.value.as_ref()
    }
}

impl Accumulator for LastValid {
    fn accumulate(&mut self, _seconds: f64) {
        self.open = true;
        if self.pending.is_some() {
            self.captured = self.pending.clone();
        }
    }

    fn complete(&mut self) {
        if !self.open {
            return;
        }
        self.value = self.captured.take();
        self.open = false;
    }

    fn begin(&mut self) {
        self.captured = None;
        self.open = true;
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn clear_pending(&mut self) {
        self.pending = None;
    }
}

/// Polar quantity (e.g. wind speed and direction) averaged as a vector.
///
/// Directions are meteorological "from" bearings in degrees, so components
/// are taken at `direction - 180`.
#[derive(Debug, Clone, Default)]
pub struct Vector {
    x: Variable,
    y: Variable,
}

impl Vector {
    /// Set the pending sample. If either part is missing or not finite the
    /// whole sample is absent.
    pub fn push(&mut self, magnitude: impl Into<Option<f64>>, direction: impl Into<Option<f64>>) {
        match (finite(magnitude.into()), finite(direction.into())) {
            (Some(magnitude), Some(direction)) => {
                let angle = (direction - 180.0) * PI / 180.0;
                self.x.push(math::cos(angle) * magnitude);
                self.y.push(math::sin(angle) * magnitude);
            }
            _ => {
                self.x.clear_pending();
                self.y.clear_pending();
            }
        }
    }

    /// Length of the mean vector.
    pub fn magnitude(&self) -> f64 {
        let (x, y) = (self.x.value(), self.y.value());
        math::sqrt(x * x + y * y)
    }

    /// Bearing of the mean vector in `[0, 360)`.
    pub fn direction(&self) -> f64 {
        let direction = math::atan2(self.y.value(), self.x.value()) * 180.0 / PI + 180.0;
        if math::abs(direction - 360.0) < DIRECTION_WRAP_EPSILON {
            0.0
        } else {
            direction
        }
    }

    /// Mean orthogonal components `(x, y)`.
    pub fn components(&self) -> (f64, f64) {
        (self.x.value(), self.y.value())
    }
}

impl Accumulator for Vector {
    fn accumulate(&mut self, seconds: f64) {
        self.x.accumulate(seconds);
        self.y.accumulate(seconds);
    }

    fn complete(&mut self) {
        self.x.complete();
        self.y.complete();
    }

    fn begin(&mut self) {
        self.x.begin();
        self.y.begin();
    }

    fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
    }

    fn clear_pending(&mut self) {
        self.x.clear_pending();
        self.y.clear_pending();
    }
}

/// Per-index time-weighted mean over samples whose length may vary.
#[derive(Debug, Clone)]
pub struct Array {
    pending: Option<Vec<f64>>,
    accumulators: Vec<Variable>,
    largest_size: usize,
    open: bool,
    value: Vec<f64>,
}

impl Default for Array {
    fn default() -> Self {
        Self {
            pending: None,
            accumulators: Vec::new(),
            largest_size: 0,
            open: true,
            value: Vec::new(),
        }
    }
}

impl Array {
    /// Set the pending sample. Non-finite elements are absent individually.
    pub fn push(&mut self, values: &[f64]) {
        self.pending = Some(values.to_vec());
    }

    pub fn push_option(&mut self, values: Option<&[f64]>) {
        self.pending = values.map(<[f64]>::to_vec);
    }

    /// Means of the last completed interval, as long as the longest sample
    /// counted up to its last finite element.
    pub fn value(&self) -> &[f64] {
        &self.value
    }
}

impl Accumulator for Array {
    fn accumulate(&mut self, seconds: f64) {
        self.open = true;
        let Some(values) = self.pending.as_ref() else {
            return;
        };

        // Trailing absent elements do not extend the result
        let len = values
            .iter()
            .rposition(|value| value.is_finite())
            .map_or(0, |index| index + 1);
        if len > self.accumulators.len() {
            self.accumulators.resize_with(len, Variable::default);
        }
        self.largest_size = self.largest_size.max(len);

        for (accumulator, &value) in self.accumulators.iter_mut().zip(&values[..len]) {
            accumulator.push(value);
            accumulator.accumulate(seconds);
            accumulator.clear_pending();
        }
    }

    fn complete(&mut self) {
        if !self.open {
            return;
        }
        self.accumulators.truncate(self.largest_size);
        self.value = self
            .accumulators
            .iter_mut()
            .map(|accumulator| {
                accumulator.complete();
                accumulator.value()
            })
            .collect();
        for accumulator in &mut self.accumulators {
            accumulator.begin();
        }
        self.largest_size = 0;
        self.open = false;
    }

    fn begin(&mut self) {
        for accumulator in &mut self.accumulators {
            accumulator.begin();
        }
        self.largest_size = 0;
        self.open = true;
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn clear_pending(&mut self) {
        self.pending = None;
    }
}

/// Closed set of entry kinds an [`AverageRecord`](super::AverageRecord) can own.
#[derive(Debug, Clone)]
pub enum Entry {
    Variable(Variable),
    Flag(Flag),
    FirstValid(FirstValid),
    LastValid(LastValid),
    Vector(Vector),
    Array(Array),
}

impl Entry {
    fn as_accumulator(&mut self) -> &mut dyn Accumulator {
        match self {
            Self::Variable(entry) => entry,
            Self::Flag(entry) => entry,
            Self::FirstValid(entry) => entry,
            Self::LastValid(entry) => entry,
            Self::Vector(entry) => entry,
            Self::Array(entry) => entry,
        }
    }

    /// Short kind name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Variable(_) => "variable",
            Self::Flag(_) => "flag",
            Self::FirstValid(_) => "first-valid",
            Self::LastValid(_) => "last-valid",
            Self::Vector(_) => "vector",
            Self::Array(_) => "array",
        }
    }
}

impl Accumulator for Entry {
    fn accumulate(&mut self, seconds: f64) {
        self.as_accumulator().accumulate(seconds);
    }

    fn complete(&mut self) {
        self.as_accumulator().complete();
    }

    fn begin(&mut self) {
        self.as_accumulator().begin();
    }

    fn reset(&mut self) {
        self.as_accumulator().reset();
    }

    fn clear_pending(&mut self) {
        self.as_accumulator().clear_pending();
    }
}

/// Links a concrete entry type to its [`Entry`] variant, so typed handles can
/// reach it without the caller matching.
pub trait EntryKind: Accumulator + Default + Sized {
    fn wrap(self) -> Entry;
    fn from_entry(entry: &Entry) -> Option<&Self>;
    fn from_entry_mut(entry: &mut Entry) -> Option<&mut Self>;
}

macro_rules! entry_kind {
    ($($kind:ident),* $(,)?) => {
        $(
            impl EntryKind for $kind {
                fn wrap(self) -> Entry {
                    Entry::$kind(self)
                }

                fn from_entry(entry: &Entry) -> Option<&Self> {
                    match entry {
                        Entry::$kind(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn from_entry_mut(entry: &mut Entry) -> Option<&mut Self> {
                    match entry {
                        Entry::$kind(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

entry_kind!(Variable, Flag, FirstValid, LastValid, Vector, Array);
