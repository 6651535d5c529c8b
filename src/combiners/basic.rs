//! Basic arithmetic combiners: Sum, Min, Max, Count

use crate::coders::{Coder, CoderRegistry, NullableCoder, U64Coder};
use crate::collection::Data;
use crate::combine_fn::CombineFn;
use crate::error::CoderError;
use std::cmp::Ord;
use std::marker::PhantomData;
use std::ops::Add;
use std::sync::Arc;

fn input_or_registered<T: 'static>(
    registry: &CoderRegistry,
    input_coder: Option<&Arc<dyn Coder<T>>>,
) -> Result<Arc<dyn Coder<T>>, CoderError> {
    match input_coder {
        Some(c) => Ok(Arc::clone(c)),
        None => registry.coder_for::<T>(),
    }
}

/* ===================== Sum<T> ===================== */

/// Sum of values.
///
/// - Accumulator: `T`
/// - Output: `T`
///
/// Requires `T: Add<Output=T> + Default`; `T::default()` is the identity.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sum<T>(pub PhantomData<T>);
impl<T> Sum<T> {
    /// Convenience constructor (same as `Default`).
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> CombineFn<T, T, T> for Sum<T>
where
    T: Data + Add<Output = T> + Default,
{
    fn create_accumulator(&self) -> T {
        T::default()
    }

    fn add_input(&self, acc: T, v: T) -> T {
        acc + v
    }

    fn merge_accumulators(&self, accs: Vec<T>) -> T {
        accs.into_iter().fold(T::default(), |a, b| a + b)
    }

    fn extract_output(&self, acc: T) -> T {
        acc
    }

    fn accumulator_coder(
        &self,
        registry: &CoderRegistry,
        input_coder: Option<&Arc<dyn Coder<T>>>,
    ) -> Result<Arc<dyn Coder<T>>, CoderError> {
        input_or_registered(registry, input_coder)
    }

    fn output_coder(
        &self,
        registry: &CoderRegistry,
        input_coder: Option<&Arc<dyn Coder<T>>>,
    ) -> Result<Arc<dyn Coder<T>>, CoderError> {
        input_or_registered(registry, input_coder)
    }
}

/* ===================== Min<T> / Max<T> ===================== */

/// Keeps whichever of two present values `keep_left` prefers.
fn fold_extreme<T>(acc: Option<T>, v: Option<T>, keep_left: impl Fn(&T, &T) -> bool) -> Option<T> {
    match (acc, v) {
        (Some(a), Some(b)) => Some(if keep_left(&a, &b) { a } else { b }),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Minimum value (requires `Ord`).
///
/// - Accumulator: `Option<T>`
/// - Output: `Option<T>` (`None` for no inputs)
#[derive(Clone, Copy, Debug, Default)]
pub struct Min<T>(pub PhantomData<T>);
impl<T> Min<T> {
    /// Convenience constructor (same as `Default`).
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> CombineFn<T, Option<T>, Option<T>> for Min<T>
where
    T: Data + Ord,
{
    fn create_accumulator(&self) -> Option<T> {
        None
    }

    fn add_input(&self, acc: Option<T>, v: T) -> Option<T> {
        fold_extreme(acc, Some(v), |a, b| a <= b)
    }

    fn merge_accumulators(&self, accs: Vec<Option<T>>) -> Option<T> {
        accs.into_iter().fold(None, |a, b| fold_extreme(a, b, |x, y| x <= y))
    }

    fn extract_output(&self, acc: Option<T>) -> Option<T> {
        acc
    }

    fn accumulator_coder(
        &self,
        registry: &CoderRegistry,
        input_coder: Option<&Arc<dyn Coder<T>>>,
    ) -> Result<Arc<dyn Coder<Option<T>>>, CoderError> {
        Ok(Arc::new(NullableCoder::new(input_or_registered(registry, input_coder)?)))
    }

    fn output_coder(
        &self,
        registry: &CoderRegistry,
        input_coder: Option<&Arc<dyn Coder<T>>>,
    ) -> Result<Arc<dyn Coder<Option<T>>>, CoderError> {
        self.accumulator_coder(registry, input_coder)
    }
}

/// Maximum value (requires `Ord`).
///
/// - Accumulator: `Option<T>`
/// - Output: `Option<T>` (`None` for no inputs)
#[derive(Clone, Copy, Debug, Default)]
pub struct Max<T>(pub PhantomData<T>);
impl<T> Max<T> {
    /// Convenience constructor (same as `Default`).
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> CombineFn<T, Option<T>, Option<T>> for Max<T>
where
    T: Data + Ord,
{
    fn create_accumulator(&self) -> Option<T> {
        None
    }

    fn add_input(&self, acc: Option<T>, v: T) -> Option<T> {
        fold_extreme(acc, Some(v), |a, b| a >= b)
    }

    fn merge_accumulators(&self, accs: Vec<Option<T>>) -> Option<T> {
        accs.into_iter().fold(None, |a, b| fold_extreme(a, b, |x, y| x >= y))
    }

    fn extract_output(&self, acc: Option<T>) -> Option<T> {
        acc
    }

    fn accumulator_coder(
        &self,
        registry: &CoderRegistry,
        input_coder: Option<&Arc<dyn Coder<T>>>,
    ) -> Result<Arc<dyn Coder<Option<T>>>, CoderError> {
        Ok(Arc::new(NullableCoder::new(input_or_registered(registry, input_coder)?)))
    }

    fn output_coder(
        &self,
        registry: &CoderRegistry,
        input_coder: Option<&Arc<dyn Coder<T>>>,
    ) -> Result<Arc<dyn Coder<Option<T>>>, CoderError> {
        self.accumulator_coder(registry, input_coder)
    }
}

/* ===================== Count ===================== */

/// Number of inputs, whatever their type.
#[derive(Clone, Copy, Debug, Default)]
pub struct Count;

impl<V> CombineFn<V, u64, u64> for Count {
    fn create_accumulator(&self) -> u64 {
        0
    }

    fn add_input(&self, acc: u64, _v: V) -> u64 {
        acc + 1
    }

    fn merge_accumulators(&self, accs: Vec<u64>) -> u64 {
        accs.into_iter().sum()
    }

    fn extract_output(&self, acc: u64) -> u64 {
        acc
    }

    fn accumulator_coder(
        &self,
        _registry: &CoderRegistry,
        _input_coder: Option<&Arc<dyn Coder<V>>>,
    ) -> Result<Arc<dyn Coder<u64>>, CoderError> {
        Ok(Arc::new(U64Coder))
    }

    fn output_coder(
        &self,
        _registry: &CoderRegistry,
        _input_coder: Option<&Arc<dyn Coder<V>>>,
    ) -> Result<Arc<dyn Coder<u64>>, CoderError> {
        Ok(Arc::new(U64Coder))
    }
}
