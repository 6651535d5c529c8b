//! Combine transforms.
//!
//! Three entry points share one combiner algebra:
//!
//! - [`Combine::globally`]: the whole collection (per window) to one value;
//! - [`Combine::per_key`]: `(K, V)` to one `(K, O)` per key and window;
//! - [`Combine::grouped_values`]: already grouped `(K, Vec<V>)` to `(K, O)`.
//!
//! Per-key combines may split hot keys across several workers
//! ([`PerKey::with_hot_key_fanout`]) or pre-combine each bundle before the
//! shuffle ([`PerKey::with_combiner_lifting`]); both are load-distribution
//! options and never change the result.
//!
//! ```
//! use ironbeam_combine::*;
//! use ironbeam_combine::combiners::Sum;
//!
//! let p = Pipeline::default();
//! let mut out = from_vec(&p, vec![("a", 1i64), ("b", 2), ("a", 3)])
//!     .apply(Combine::per_key(Sum::<i64>::new()).with_hot_key_fanout_const(4))?
//!     .collect_par(None, Some(3))?;
//! out.sort();
//! assert_eq!(out, vec![("a", 4), ("b", 2)]);
//! # anyhow::Result::<()>::Ok(())
//! ```

mod fanout;
mod globally;
mod grouped_values;
mod per_key;

pub use fanout::{FixedNonceSeed, NonceSeed, RandomNonceSeed};
pub use globally::{Globally, SingletonView};
pub use grouped_values::GroupedValues;
pub use per_key::PerKey;

use crate::coders::{Coder, KvCoder};
use crate::collection::{Data, PCollection};
use crate::combine_fn::{CombineFn, Keyed, KeyedCombineFn};
use crate::combiners::IterableCombineFn;
use crate::error::CoderError;
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

/// Constructors for the combine transforms.
pub struct Combine;

impl Combine {
    /// Combine all elements of each window into one value.
    pub fn globally<C, I, A, O>(comb: C) -> Globally<C, I, A, O>
    where
        C: CombineFn<I, A, O>,
    {
        Globally::new(comb)
    }

    /// [`Combine::globally`] with a closure that combines a batch of values.
    pub fn globally_fn<V, F>(f: F) -> Globally<IterableCombineFn<V, F>, V, Vec<V>, V>
    where
        V: Data,
        F: Fn(Vec<V>) -> V + Send + Sync + 'static,
    {
        Globally::new(IterableCombineFn::new(f))
    }

    /// Combine the values of each key (and window) with a key-independent combiner.
    pub fn per_key<C, K, I, A, O>(comb: C) -> PerKey<Keyed<C>, K, I, A, O>
    where
        C: CombineFn<I, A, O>,
    {
        PerKey::new(Keyed(comb))
    }

    /// Combine the values of each key (and window) with a keyed combiner.
    pub fn per_key_keyed<C, K, I, A, O>(comb: C) -> PerKey<C, K, I, A, O>
    where
        C: KeyedCombineFn<K, I, A, O>,
    {
        PerKey::new(comb)
    }

    /// [`Combine::per_key`] with a closure that combines a batch of values.
    pub fn per_key_fn<K, V, F>(f: F) -> PerKey<Keyed<IterableCombineFn<V, F>>, K, V, Vec<V>, V>
    where
        V: Data,
        F: Fn(Vec<V>) -> V + Send + Sync + 'static,
    {
        PerKey::new(Keyed(IterableCombineFn::new(f)))
    }

    /// Combine `(K, Vec<V>)` records produced by a grouping.
    pub fn grouped_values<C, K, I, A, O>(comb: C) -> GroupedValues<Keyed<C>, K, I, A, O>
    where
        C: CombineFn<I, A, O>,
    {
        GroupedValues::from_shared(Arc::new(Keyed(comb)), Default::default())
    }

    pub fn grouped_values_keyed<C, K, I, A, O>(comb: C) -> GroupedValues<C, K, I, A, O>
    where
        C: KeyedCombineFn<K, I, A, O>,
    {
        GroupedValues::from_shared(Arc::new(comb), Default::default())
    }

    /// [`Combine::grouped_values`] with a closure that combines a batch of values.
    pub fn grouped_values_fn<K, V, F>(
        f: F,
    ) -> GroupedValues<Keyed<IterableCombineFn<V, F>>, K, V, Vec<V>, V>
    where
        V: Data,
        F: Fn(Vec<V>) -> V + Send + Sync + 'static,
    {
        GroupedValues::from_shared(Arc::new(Keyed(IterableCombineFn::new(f))), Default::default())
    }
}

/// Attach a `KvCoder` to a combine output when both component coders are known.
///
/// An unavailable coder only defers coder binding; other coder failures are
/// configuration errors.
pub(crate) fn bind_kv_output_coder<K: Data, O: Data>(
    out: PCollection<(K, O)>,
    key_coder: Result<Arc<dyn Coder<K>>, CoderError>,
    output_coder: Result<Arc<dyn Coder<O>>, CoderError>,
) -> Result<PCollection<(K, O)>> {
    match (key_coder, output_coder) {
        (Ok(k), Ok(o)) => Ok(out.set_coder(Arc::new(KvCoder::new(k, o)))),
        (Err(e), _) | (_, Err(e)) if e.is_cannot_provide() => {
            debug!(error = %e, "deferring combine output coder");
            Ok(out)
        }
        (Err(e), _) | (_, Err(e)) => Err(e.into()),
    }
}
