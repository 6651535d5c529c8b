//! Event-time windows and the windowing strategy carried by every collection.
//!
//! Only what the combine path needs is modeled: the global window, fixed
//! (tumbling) interval windows, and the accumulation mode that hot-key
//! fan-out overrides for its pre-combine stage. Triggers and lateness are out
//! of scope; in batch execution every window fires exactly once.

use crate::error::CombineError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FormatResult};

/// Milliseconds since UNIX epoch (UTC).
pub type TimestampMs = i64;

/// Smallest representable timestamp; elements created without one carry it.
pub const MIN_TIMESTAMP: TimestampMs = i64::MIN / 1000;

/// End-of-window timestamp of the global window.
pub const GLOBAL_WINDOW_MAX_TIMESTAMP: TimestampMs = i64::MAX / 1000 - 86_400_000;

/// A closed-open time range: [start, end).
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntervalWindow {
    pub start: TimestampMs,
    pub end: TimestampMs,
}

impl IntervalWindow {
    #[inline]
    pub fn new(start: TimestampMs, end: TimestampMs) -> Self {
        debug_assert!(end >= start);
        Self { start, end }
    }

    /// The tumbling window [win_start, win_start + size) holding `ts`.
    #[inline]
    fn tumble(ts: TimestampMs, fixed: FixedWindows) -> Self {
        let FixedWindows { size_ms, offset_ms } = fixed;
        let k = (ts - offset_ms).div_euclid(size_ms);
        let start = k * size_ms + offset_ms;
        Self { start, end: start + size_ms }
    }
}

/// The window an element belongs to.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoundedWindow {
    Global,
    Interval(IntervalWindow),
}

impl BoundedWindow {
    /// Timestamp given to results emitted for this window.
    pub fn max_timestamp(&self) -> TimestampMs {
        match self {
            BoundedWindow::Global => GLOBAL_WINDOW_MAX_TIMESTAMP,
            BoundedWindow::Interval(w) => w.end - 1,
        }
    }
}

impl Display for BoundedWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self {
            BoundedWindow::Global => write!(f, "GlobalWindow"),
            BoundedWindow::Interval(w) => write!(f, "[{}, {})", w.start, w.end),
        }
    }
}

/// Assigns windows to elements based on their timestamps.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WindowFn {
    Global,
    Fixed(FixedWindows),
}

/// Tumbling windows of a positive size, shifted by `offset_ms`.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "(i64, i64)", into = "(i64, i64)")]
pub struct FixedWindows {
    size_ms: i64,
    offset_ms: i64,
}

impl FixedWindows {
    /// Fails for a size of zero or less.
    pub fn new(size_ms: i64, offset_ms: i64) -> Result<Self, CombineError> {
        if size_ms <= 0 {
            return Err(CombineError::NonPositiveWindowSize { size_ms });
        }
        Ok(Self { size_ms, offset_ms })
    }

    pub fn size_ms(&self) -> i64 {
        self.size_ms
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }
}

impl TryFrom<(i64, i64)> for FixedWindows {
    type Error = CombineError;

    fn try_from((size_ms, offset_ms): (i64, i64)) -> Result<Self, Self::Error> {
        Self::new(size_ms, offset_ms)
    }
}

impl From<FixedWindows> for (i64, i64) {
    fn from(f: FixedWindows) -> Self {
        (f.size_ms, f.offset_ms)
    }
}

impl WindowFn {
    pub fn fixed(size_ms: i64) -> Result<Self, CombineError> {
        Self::fixed_with_offset(size_ms, 0)
    }

    pub fn fixed_with_offset(size_ms: i64, offset_ms: i64) -> Result<Self, CombineError> {
        FixedWindows::new(size_ms, offset_ms).map(WindowFn::Fixed)
    }

    pub fn assign(&self, ts: TimestampMs) -> BoundedWindow {
        match *self {
            WindowFn::Global => BoundedWindow::Global,
            WindowFn::Fixed(fixed) => {
                BoundedWindow::Interval(IntervalWindow::tumble(ts, fixed))
            }
        }
    }

    /// Two window functions are compatible when they assign every timestamp
    /// to the same window.
    pub fn is_compatible(&self, other: &WindowFn) -> bool {
        self == other
    }
}

impl Display for WindowFn {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self {
            WindowFn::Global => write!(f, "GlobalWindows"),
            WindowFn::Fixed(FixedWindows { size_ms, offset_ms }) => {
                write!(f, "FixedWindows(size={size_ms}ms, offset={offset_ms}ms)")
            }
        }
    }
}

/// How successive firings of one window relate to each other.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum AccumulationMode {
    #[default]
    DiscardingFiredPanes,
    AccumulatingFiredPanes,
}

/// Window function plus accumulation mode of a collection.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WindowingStrategy {
    pub window_fn: WindowFn,
    pub mode: AccumulationMode,
}

impl WindowingStrategy {
    pub fn global() -> Self {
        Self { window_fn: WindowFn::Global, mode: AccumulationMode::default() }
    }

    pub fn of(window_fn: WindowFn) -> Self {
        Self { window_fn, mode: AccumulationMode::default() }
    }

    /// Copy of this strategy with a different accumulation mode.
    pub fn with_mode(&self, mode: AccumulationMode) -> Self {
        Self { mode, ..*self }
    }
}

impl Default for WindowingStrategy {
    fn default() -> Self {
        Self::global()
    }
}

/// A value in flight between stages, with its event time and window.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowedValue<T> {
    pub value: T,
    pub timestamp: TimestampMs,
    pub window: BoundedWindow,
}

impl<T> WindowedValue<T> {
    #[inline]
    pub fn new(value: T, timestamp: TimestampMs, window: BoundedWindow) -> Self {
        Self { value, timestamp, window }
    }

    /// A value with no timestamp, in the global window.
    #[inline]
    pub fn in_global_window(value: T) -> Self {
        Self::new(value, MIN_TIMESTAMP, BoundedWindow::Global)
    }

    /// Same timestamp and window, different value.
    #[inline]
    pub fn with_value<O>(&self, value: O) -> WindowedValue<O> {
        WindowedValue { value, timestamp: self.timestamp, window: self.window }
    }
}

/// A timestamped element (event-time semantics).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timestamped<T> {
    pub ts: TimestampMs,
    pub value: T,
}

impl<T> Timestamped<T> {
    #[inline]
    pub fn new(ts: TimestampMs, value: T) -> Self {
        Self { ts, value }
    }
}
