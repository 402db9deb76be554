//! Skybridge Jobs Library
//!
//! Drives long-running vendor jobs (submit, poll, terminal state) with a
//! fixed poll interval, bounded poll-error tolerance and cooperative
//! cancellation. Job state lives in memory for the duration of one call.

pub mod driver;
pub mod job;

pub use driver::{JobDriver, JobDriverConfig, JobOperations};
pub use job::{AsyncJob, JobState};
