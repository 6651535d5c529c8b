//! # ironbeam-combine
//!
//! The combine engine of a batch data-processing framework modeled on
//! Apache Beam: a combiner algebra, the transforms that run it over
//! keyed, grouped and whole collections, and hot-key fan-out for skewed keys.
//!
//! ## Quick Start
//!
//! ```
//! use ironbeam_combine::*;
//! use ironbeam_combine::combiners::{Count, Mean, Sum};
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let p = Pipeline::default();
//! let words = from_vec(&p, vec!["a", "b", "a", "c", "a"]);
//!
//! let mut counts = words
//!     .clone()
//!     .key_by(|w: &&str| w.to_string())
//!     .apply(Combine::per_key(Count))?
//!     .collect_seq()?;
//! counts.sort();
//! assert_eq!(counts, vec![("a".into(), 3), ("b".into(), 1), ("c".into(), 1)]);
//!
//! let total = from_vec(&p, vec![1u64, 2, 3])
//!     .apply(Combine::globally(Sum::<u64>::new()))?
//!     .collect_seq()?;
//! assert_eq!(total, vec![6]);
//!
//! // An empty input still yields one value: the combiner's default.
//! let mean = from_vec(&p, Vec::<u32>::new())
//!     .apply(Combine::globally(Mean))?
//!     .collect_seq()?;
//! assert_eq!(mean, vec![0.0]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Combiners
//!
//! A [`CombineFn<I, A, O>`](CombineFn) folds inputs `I` into an accumulator
//! `A`, merges accumulators built on different workers, and extracts an
//! output `O`. Merging must be associative and commutative, so the runner is
//! free to split the work however it likes. [`KeyedCombineFn`] is the same
//! algebra with the key and a [`CombineContext`] (side inputs, window) passed
//! to every call. The [`combiners`] module ships the common ones.
//!
//! ### Transforms
//!
//! - [`Combine::globally`]: one output per window of the whole collection;
//! - [`Combine::per_key`]: one output per key and window;
//! - [`Combine::grouped_values`]: combine already grouped `(K, Vec<V>)`.
//!
//! ### Coders
//!
//! Values crossing a grouping are encoded with a [`Coder`](coders::Coder).
//! Combiners pick the coder of their accumulators from the input coder, and
//! a combine output gets a coder whenever one can be derived.
//!
//! ### Execution
//!
//! Nothing runs until a `collect_*` method is called. Sequential and parallel
//! execution give the same results; parallel execution runs bundles on Rayon.
//!
//! ## Module Overview
//!
//! - [`combine_fn`] - the combiner traits and adapters
//! - [`combiners`] - built-in combiners
//! - [`combine`] - the combine transforms and hot-key fan-out
//! - [`coders`] - element and accumulator coders
//! - [`collection`] - `PCollection` and element-wise transforms
//! - [`window`] - windows, timestamps, windowing strategies
//! - [`side_inputs`] - per-window side inputs for keyed combiners
//! - [`runner`] - sequential and parallel execution
//! - [`testing`] - assertions and a test pipeline

pub mod accumulator;
pub mod coders;
pub mod collection;
pub mod combine;
pub mod combine_fn;
pub mod combiners;
pub mod error;
pub(crate) mod helpers;
pub(crate) mod node;
pub mod node_id;
pub mod pipeline;
pub mod runner;
pub mod side_inputs;
pub mod testing;
pub(crate) mod type_token;
pub mod window;

pub use accumulator::{Holder, InputOrAccum};
pub use collection::{Data, PCollection, PTransform, flatten, from_timestamped, from_vec};
pub use combine::{
    Combine, FixedNonceSeed, Globally, GroupedValues, NonceSeed, PerKey, RandomNonceSeed,
    SingletonView,
};
pub use combine_fn::{CombineFn, ForKey, Keyed, KeyedCombineFn, as_keyed, for_key};
pub use error::{CoderError, CombineError};
pub use helpers::GroupByKeyOptions;
pub use node_id::NodeId;
pub use pipeline::Pipeline;
pub use runner::{ExecMode, Runner};
pub use side_inputs::{CombineContext, SideInput, SideInputs, side_vec, side_windowed};
pub use window::{
    AccumulationMode, BoundedWindow, FixedWindows, IntervalWindow, TimestampMs, Timestamped, WindowFn,
    WindowedValue, WindowingStrategy,
};
