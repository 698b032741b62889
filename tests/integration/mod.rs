//! Integration test modules for Tactus
//!
//! - lifecycle: Play/stop state machine and restart behaviour
//! - timing: Delay accuracy, tempo maps and pre-computed play time
//! - concurrency: Controller threads racing the dispatch loop

pub mod concurrency;
pub mod lifecycle;
