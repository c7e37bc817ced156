//! Types and traits for recording training metrics.
//!
//! [`Record`] is a key-value container filled by the environment, the agent
//! and the trainer during a training run. A [`Recorder`] receives records,
//! aggregates the scalar values and writes them to a destination, such as a
//! CSV file ([`CsvRecorder`]) or nowhere ([`NullRecorder`], used in tests).
mod base;
mod csv_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use csv_recorder::CsvRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
