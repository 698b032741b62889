//! Timing tolerances for playback tests.
//!
//! Sleeps never end early, so lower bounds stay tight. Upper bounds absorb
//! scheduler jitter on loaded CI machines.

/// Slack below an expected delay (clock granularity).
pub const EARLY_SLACK_MS: u64 = 5;

/// Slack above an expected delay.
pub const LATE_SLACK_MS: u64 = 250;

/// Maximum gap between two events that share a tick.
pub const SAME_TICK_MS: u64 = 50;

/// Upper bound for anything that should happen "promptly".
pub const NOTIFY_TIMEOUT_MS: u64 = 5_000;
