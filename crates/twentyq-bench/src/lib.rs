//! Deterministic self-play harness: simulated answerers play full sessions against every
//! catalog character and the results are written as JSONL, markdown and a plot.

pub mod analytics;
pub mod config;
pub mod logging;
pub mod simulation;
pub mod telemetry;
