//! Combiners built from a binary operator.
//!
//! Two shapes, depending on whether "no input yet" needs its own state:
//!
//! - [`BinaryCombineFn`] keeps a [`Holder<V>`] that stays empty until the
//!   first input, so any associative operator works, identity or not.
//! - [`ScalarCombineFn`] keeps the bare value, seeded with a caller-supplied
//!   identity element. [`binary_combine_i32`], [`binary_combine_i64`] and
//!   [`binary_combine_f64`] build these.
//!
//! ```
//! use ironbeam_combine::combine_fn::CombineFn;
//! use ironbeam_combine::combiners::{binary_combine_fn, binary_combine_i64};
//!
//! let max = binary_combine_fn(|a: &i32, b: &i32| *a.max(b));
//! assert_eq!(max.apply(vec![3, 9, 4]), Some(9));
//! assert_eq!(max.default_value(), None);
//!
//! let product = binary_combine_i64(|a, b| a * b, 1);
//! assert_eq!(product.apply(vec![2, 3, 7]), 42);
//! ```

use crate::accumulator::Holder;
use crate::coders::{Coder, CoderRegistry, HolderCoder, NullableCoder};
use crate::collection::Data;
use crate::combine_fn::CombineFn;
use crate::error::CoderError;
use std::sync::Arc;

fn input_coder_or_registry<V: 'static>(
    registry: &CoderRegistry,
    input_coder: Option<&Arc<dyn Coder<V>>>,
) -> Result<Arc<dyn Coder<V>>, CoderError> {
    input_coder.cloned().map_or_else(|| registry.coder_for::<V>(), Ok)
}

/* ===================== BinaryCombineFn ===================== */

/// Combiner applying an associative, commutative `op` pairwise.
///
/// - Accumulator: [`Holder<V>`] (empty until the first input)
/// - Output: `Option<V>`; with no inputs this is the identity given to
///   [`with_identity`](Self::with_identity), or `None`.
pub struct BinaryCombineFn<V, F> {
    op: F,
    identity: Option<V>,
}

impl<V: Clone, F: Clone> Clone for BinaryCombineFn<V, F> {
    fn clone(&self) -> Self {
        Self { op: self.op.clone(), identity: self.identity.clone() }
    }
}

/// Build a [`BinaryCombineFn`] from `op`.
pub fn binary_combine_fn<V, F>(op: F) -> BinaryCombineFn<V, F>
where
    F: Fn(&V, &V) -> V,
{
    BinaryCombineFn { op, identity: None }
}

impl<V, F> BinaryCombineFn<V, F> {
    /// Copy of this combiner that reports `identity` for empty input.
    pub fn with_identity(self, identity: V) -> Self {
        Self { identity: Some(identity), ..self }
    }

    pub fn identity(&self) -> Option<&V> {
        self.identity.as_ref()
    }
}

impl<V, F> BinaryCombineFn<V, F>
where
    F: Fn(&V, &V) -> V,
{
    fn fold_into(&self, mut acc: Holder<V>, v: V) -> Holder<V> {
        let next = match acc.take() {
            Some(current) => (self.op)(&current, &v),
            None => v,
        };
        acc.set(next);
        acc
    }
}

impl<V, F> CombineFn<V, Holder<V>, Option<V>> for BinaryCombineFn<V, F>
where
    V: Data,
    F: Fn(&V, &V) -> V + Send + Sync + 'static,
{
    fn create_accumulator(&self) -> Holder<V> {
        Holder::empty()
    }

    fn add_input(&self, acc: Holder<V>, input: V) -> Holder<V> {
        self.fold_into(acc, input)
    }

    fn merge_accumulators(&self, accs: Vec<Holder<V>>) -> Holder<V> {
        accs.into_iter()
            .filter_map(Holder::into_inner)
            .fold(Holder::empty(), |acc, v| self.fold_into(acc, v))
    }

    fn extract_output(&self, acc: Holder<V>) -> Option<V> {
        acc.into_inner().or_else(|| self.identity.clone())
    }

    fn accumulator_coder(
        &self,
        registry: &CoderRegistry,
        input_coder: Option<&Arc<dyn Coder<V>>>,
    ) -> Result<Arc<dyn Coder<Holder<V>>>, CoderError> {
        Ok(Arc::new(HolderCoder::new(input_coder_or_registry(registry, input_coder)?)))
    }

    fn output_coder(
        &self,
        registry: &CoderRegistry,
        input_coder: Option<&Arc<dyn Coder<V>>>,
    ) -> Result<Arc<dyn Coder<Option<V>>>, CoderError> {
        Ok(Arc::new(NullableCoder::new(input_coder_or_registry(registry, input_coder)?)))
    }
}

/* ===================== ScalarCombineFn ===================== */

/// Combiner applying `op` to a bare scalar seeded with `identity`.
///
/// `op(identity, x) == x` must hold for every `x`.
#[derive(Clone)]
pub struct ScalarCombineFn<T, F> {
    op: F,
    identity: T,
}

impl<T: Clone, F> ScalarCombineFn<T, F> {
    pub fn new(op: F, identity: T) -> Self {
        Self { op, identity }
    }

    pub fn identity(&self) -> T {
        self.identity.clone()
    }
}

/// `i32` combiner from `op` and its identity element.
pub fn binary_combine_i32<F>(op: F, identity: i32) -> ScalarCombineFn<i32, F>
where
    F: Fn(i32, i32) -> i32 + Send + Sync + 'static,
{
    ScalarCombineFn::new(op, identity)
}

/// `i64` combiner from `op` and its identity element.
pub fn binary_combine_i64<F>(op: F, identity: i64) -> ScalarCombineFn<i64, F>
where
    F: Fn(i64, i64) -> i64 + Send + Sync + 'static,
{
    ScalarCombineFn::new(op, identity)
}

/// `f64` combiner from `op` and its identity element.
pub fn binary_combine_f64<F>(op: F, identity: f64) -> ScalarCombineFn<f64, F>
where
    F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
{
    ScalarCombineFn::new(op, identity)
}

impl<T, F> CombineFn<T, T, T> for ScalarCombineFn<T, F>
where
    T: Data + Copy,
    F: Fn(T, T) -> T + Send + Sync + 'static,
{
    fn create_accumulator(&self) -> T {
        self.identity
    }

    fn add_input(&self, acc: T, input: T) -> T {
        (self.op)(acc, input)
    }

    fn merge_accumulators(&self, accs: Vec<T>) -> T {
        let mut it = accs.into_iter();
        let first = it.next().unwrap_or(self.identity);
        it.fold(first, |a, b| (self.op)(a, b))
    }

    fn extract_output(&self, acc: T) -> T {
        acc
    }

    fn accumulator_coder(
        &self,
        registry: &CoderRegistry,
        input_coder: Option<&Arc<dyn Coder<T>>>,
    ) -> Result<Arc<dyn Coder<T>>, CoderError> {
        input_coder_or_registry(registry, input_coder)
    }

    fn output_coder(
        &self,
        registry: &CoderRegistry,
        input_coder: Option<&Arc<dyn Coder<T>>>,
    ) -> Result<Arc<dyn Coder<T>>, CoderError> {
        input_coder_or_registry(registry, input_coder)
    }
}
