//! Typed failures raised by coders and combine transforms.
//!
//! Pipeline-facing operations return [`anyhow::Result`]; the errors defined
//! here travel inside it so callers that care can recover the kind with
//! `err.downcast_ref::<CombineError>()` (or [`CoderError`]).

use thiserror::Error;

/// Failures of the coder layer.
///
/// `CannotProvide` is a recoverable configuration condition (callers may fall
/// back or defer coder binding); the other variants are raised while
/// verifying or running a coder.
#[derive(Debug, Error)]
pub enum CoderError {
    /// No coder is known for the requested type.
    #[error("cannot provide a coder for {type_name}: {reason}")]
    CannotProvide {
        type_name: &'static str,
        reason: String,
    },

    /// A coder was required to be deterministic but is not.
    #[error("{coder} is not deterministic: {reason}")]
    NonDeterministic { coder: String, reason: String },

    /// The byte stream does not hold a valid encoding.
    #[error("malformed {coder} encoding: {reason}")]
    Malformed { coder: String, reason: String },

    /// The underlying reader or writer failed.
    #[error("coder i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

impl CoderError {
    pub(crate) fn cannot_provide<T: ?Sized>(reason: impl Into<String>) -> Self {
        CoderError::CannotProvide {
            type_name: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(coder: impl Into<String>, reason: impl Into<String>) -> Self {
        CoderError::Malformed {
            coder: coder.into(),
            reason: reason.into(),
        }
    }

    /// True for the recoverable "no coder known" condition.
    pub fn is_cannot_provide(&self) -> bool {
        matches!(self, CoderError::CannotProvide { .. })
    }
}

/// Configuration failures of the combine transforms and their windowing.
///
/// All of these are raised while a pipeline is built, never while data is
/// processed.
#[derive(Debug, Error)]
pub enum CombineError {
    /// Default-value insertion was requested on a collection that is not
    /// globally windowed.
    #[error("{message} (window function: {window_fn})")]
    IncompatibleWindowFn { window_fn: String, message: String },

    /// Hot-key fan-out needs to ship partial accumulators between stages.
    #[error("unable to determine accumulator coder")]
    AccumulatorCoder(#[source] CoderError),

    /// Fixed windows need a positive size.
    #[error("fixed window size must be positive, got {size_ms}ms")]
    NonPositiveWindowSize { size_ms: i64 },

    /// A singleton view had no value for a window and no default to fall back to.
    #[error("singleton view is empty for window {window}")]
    EmptySingletonView { window: String },

    /// A singleton view held more than one value for a window.
    #[error("singleton view holds {count} values for window {window}")]
    AmbiguousSingletonView { window: String, count: usize },
}
