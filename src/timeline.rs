//! Capture timestamp assignment.
//!
//! Photo managers sort by capture time, so every frame of a run gets its own
//! strictly increasing instant. A single [`TimestampCursor`] starts at the run
//! start `T0` and advances one step per frame. It is never reset between rolls,
//! which is what keeps roll ranges from overlapping:
//!
//! ```text
//! roll 1: t, t+1ms, t+2ms
//! roll 2:             t+3ms, t+4ms
//! ```
//!
//! The cursor is a plain value threaded through [`assign`]; nothing here is
//! shared or global, and this stage must run sequentially.

use crate::types::{ResolvedFrame, TimestampedFrame};
use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, Timelike};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    #[error("Timestamp step must be at least 1ms")]
    ZeroStep,
    #[error("Timestamp cursor overflowed after {assigned} frames (last: {last})")]
    Overflow {
        assigned: usize,
        last: NaiveDateTime,
    },
}

/// Monotonic timestamp source for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampCursor {
    next: Option<NaiveDateTime>,
    last: NaiveDateTime,
    step: TimeDelta,
    assigned: usize,
}

impl TimestampCursor {
    /// Start a cursor at `start`, advancing `step_ms` milliseconds per frame.
    pub fn new(start: NaiveDateTime, step_ms: u32) -> Result<Self, TimelineError> {
        if step_ms == 0 {
            return Err(TimelineError::ZeroStep);
        }
        Ok(Self {
            next: Some(start),
            last: start,
            step: TimeDelta::milliseconds(i64::from(step_ms)),
            assigned: 0,
        })
    }

    /// Start a cursor at the current local time, truncated to milliseconds.
    pub fn starting_now(step_ms: u32) -> Result<Self, TimelineError> {
        Self::new(truncate_to_millis(Local::now()), step_ms)
    }

    /// Take the current instant and advance.
    ///
    /// The advance is checked eagerly but only reported when the overflowed
    /// value is actually needed, so the representable maximum is still usable.
    pub fn advance(&mut self) -> Result<NaiveDateTime, TimelineError> {
        let current = self.next.ok_or(TimelineError::Overflow {
            assigned: self.assigned,
            last: self.last,
        })?;
        self.last = current;
        self.next = current.checked_add_signed(self.step);
        self.assigned += 1;
        Ok(current)
    }

    /// The instant the next frame would receive, if representable.
    #[cfg(test)]
    fn peek(&self) -> Option<NaiveDateTime> {
        self.next
    }

    pub fn assigned(&self) -> usize {
        self.assigned
    }
}

fn truncate_to_millis(now: DateTime<Local>) -> NaiveDateTime {
    let naive = now.naive_local();
    let millis = naive.nanosecond() / 1_000_000 * 1_000_000;
    naive.with_nanosecond(millis).unwrap_or(naive)
}

/// Assign timestamps to already-reindexed rolls, in roll order.
///
/// Each inner slice is one roll, members in capture order. Empty rolls
/// contribute nothing and do not move the cursor.
pub fn assign(
    rolls: &[Vec<ResolvedFrame>],
    cursor: &mut TimestampCursor,
) -> Result<Vec<TimestampedFrame>, TimelineError> {
    let mut out = Vec::with_capacity(rolls.iter().map(Vec::len).sum());
    for roll in rolls {
        for frame in roll {
            out.push(TimestampedFrame {
                frame: frame.clone(),
                assigned_timestamp: cursor.advance()?,
            });
        }
    }
    Ok(out)
}
