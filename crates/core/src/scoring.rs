//! Scoring module - line-clear points, level progression and fall speed
//!
//! - A clear of `n` lines at level `L` is worth `n² × 100 × L`.
//! - The level is `min(total_lines / 10 + 1, 15)`.
//! - The fall interval shrinks 50ms per level from 1000ms, never below 150ms.

use std::time::Duration;

use crate::types::{
    BASE_FALL_MS, FALL_STEP_MS, HARD_DROP_POINTS_PER_ROW, LINES_PER_LEVEL, LINE_CLEAR_BASE,
    MAX_LEVEL, MIN_FALL_MS, SOFT_DROP_POINTS_PER_ROW, STARTING_LEVEL,
};

/// Points for clearing `lines` rows at `level`
pub fn calculate_line_score(lines: u32, level: u32) -> u32 {
    lines
        .saturating_mul(lines)
        .saturating_mul(LINE_CLEAR_BASE)
        .saturating_mul(level)
}

/// Level for a running total of cleared lines
pub fn calculate_level(total_lines: u32) -> u32 {
    (total_lines / LINES_PER_LEVEL + STARTING_LEVEL).min(MAX_LEVEL)
}

/// Drop bonus
/// soft_drop: +1 per row
/// hard_drop: +2 per row
pub fn calculate_drop_score(rows: u32, is_hard_drop: bool) -> u32 {
    let per_row = if is_hard_drop {
        HARD_DROP_POINTS_PER_ROW
    } else {
        SOFT_DROP_POINTS_PER_ROW
    };
    rows.saturating_mul(per_row)
}

/// Milliseconds between automatic downward steps at `level`
pub fn fall_interval_ms(level: u32) -> u32 {
    let reduction = level.saturating_sub(1).saturating_mul(FALL_STEP_MS);
    BASE_FALL_MS.saturating_sub(reduction).max(MIN_FALL_MS)
}

pub fn fall_interval(level: u32) -> Duration {
    Duration::from_millis(u64::from(fall_interval_ms(level)))
}
