//! Time-weighted averaging of instrument data
//!
//! An [`AverageRecord`] owns a set of named entries, one per reported
//! quantity. Acquisition code pushes the latest sample into each entry and
//! then ticks the record with the sample time; the record weights each sample
//! by how long it was current and publishes one value per entry whenever an
//! averaging interval closes.

mod entry;
mod record;

use alloc::string::String;

use thiserror_no_std::Error;

pub use entry::{
    Accumulator, Array, Entry, EntryKind, FirstValid, Flag, LastValid, Sample, Variable, Vector,
};
pub use record::{AverageRecord, AverageResult, Handle};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    /// The averaging interval was negative or not a number.
    #[error("Invalid averaging interval: {value}")]
    InvalidInterval {
        /// Interval that was requested, in seconds
        value: f64,
    },

    /// An entry with this name is already registered.
    #[error("Duplicate entry name: {name}")]
    DuplicateEntry {
        /// The conflicting name
        name: String,
    },
}
