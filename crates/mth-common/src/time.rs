//! ---
//! mth_section: "01-core-functionality"
//! mth_subsection: "module"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Shared primitives and utilities for the harness runtime."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
use std::time::{Duration, Instant};

/// Capture an instant suitable for stage timing.
pub fn monotonic_now() -> Instant {
    Instant::now()
}

/// Convert a duration into milliseconds, saturating at `u64::MAX`.
pub fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Milliseconds elapsed since `started`.
pub fn elapsed_millis(started: Instant) -> u64 {
    duration_to_millis(started.elapsed())
}
