//! Worker/barrier harness that drives each lock algorithm in
//! `lockbench-locks` through a timed contention benchmark and aggregates
//! the results.

#![warn(missing_docs, rust_2018_idioms)]

pub mod barrier;
pub mod benchmark;
pub mod calibration;
pub mod config;
pub mod stats;
pub mod work_unit;
pub mod worker;

pub use barrier::Barrier;
pub use benchmark::benchmark;
pub use calibration::Calibration;
pub use config::Config;
pub use stats::LockResult;
pub use work_unit::{NanoRange, WorkUnit};
pub use worker::WorkerResult;
