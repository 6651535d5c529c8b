//! Built-in combiners.
//!
//! These are reusable implementations of [`CombineFn`](crate::combine_fn::CombineFn)
//! for `Combine::globally`, `Combine::per_key` and `Combine::grouped_values`:
//!
//! - [`Sum<T>`] -- sum of values.
//! - [`Min<T>`] / [`Max<T>`] -- extreme value, `None` for empty input.
//! - [`Count`] -- number of inputs.
//! - [`Mean`] -- arithmetic mean as `f64`.
//! - [`BinaryCombineFn`] -- any associative operator, via [`binary_combine_fn`].
//! - [`ScalarCombineFn`] -- numeric operator with an identity, via
//!   [`binary_combine_i32`], [`binary_combine_i64`], [`binary_combine_f64`].
//! - [`IterableCombineFn`] -- buffering wrapper around `Fn(Vec<V>) -> V`.
//! - [`AccumulatingCombineFn`] -- delegates to an [`Accumulator`] type.
//!
//! Each combiner specifies its accumulator type (`A`) and output type (`O`),
//! and knows how to derive coders for both from its input coder.
//!
//! # Examples
//! ```
//! use ironbeam_combine::*;
//! use ironbeam_combine::combiners::{Count, Max, Sum};
//!
//! let p = Pipeline::default();
//!
//! let mut sums = from_vec(&p, vec![("a", 1u64), ("a", 2), ("b", 10)])
//!     .apply(Combine::per_key(Sum::<u64>::default()))?
//!     .collect_seq()?;
//! sums.sort();
//! assert_eq!(sums, vec![("a", 3), ("b", 10)]);
//!
//! let max = from_vec(&p, vec![3u64, 2, 5])
//!     .apply(Combine::globally(Max::<u64>::default()))?
//!     .collect_seq()?;
//! assert_eq!(max, vec![Some(5)]);
//!
//! let count = from_vec(&p, vec!["x", "y"])
//!     .apply(Combine::globally(Count))?
//!     .collect_seq()?;
//! assert_eq!(count, vec![2]);
//! # anyhow::Result::<()>::Ok(())
//! ```

mod accumulating;
mod basic;
mod binary;
mod iterable;
mod statistical;

pub use accumulating::{AccumulatingCombineFn, Accumulator};
pub use basic::{Count, Max, Min, Sum};
pub use binary::{
    BinaryCombineFn, ScalarCombineFn, binary_combine_f64, binary_combine_fn, binary_combine_i32,
    binary_combine_i64,
};
pub use iterable::{DEFAULT_BUFFER_SIZE, IterableCombineFn};
pub use statistical::Mean;
