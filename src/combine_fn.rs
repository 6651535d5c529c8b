//! The combiner algebra.
//!
//! A combiner reduces many inputs to one output through a mutable
//! accumulator:
//!
//! 1. inputs are split into batches (the engine picks the boundaries);
//! 2. each batch gets a fresh accumulator from `create_accumulator` and folds
//!    its inputs in with `add_input`;
//! 3. accumulators are merged with `merge_accumulators`, repeatedly and in an
//!    arbitrary tree shape, until one remains per group;
//! 4. `extract_output` reads the result.
//!
//! Because batch boundaries and merge order are unspecified, the combining
//! logic must be associative and commutative.
//!
//! [`CombineFn`] is the key-independent form. [`KeyedCombineFn`] additionally
//! receives the group's key and its [`CombineContext`] (window and resolved
//! side inputs) in every call. [`Keyed`] promotes a `CombineFn` to the keyed
//! form, and [`ForKey`] binds a keyed combiner to one key to get a
//! `CombineFn` back.
//!
//! ```
//! use ironbeam_combine::combine_fn::*;
//! use ironbeam_combine::combiners::Sum;
//!
//! let sum = Sum::<i64>::new();
//! assert_eq!(sum.apply(vec![1, 2, 3]), 6);
//! assert_eq!(sum.default_value(), 0);
//! ```

use crate::coders::{Coder, CoderRegistry};
use crate::error::CoderError;
use crate::side_inputs::CombineContext;
use std::any::type_name;
use std::sync::Arc;

/// Key-independent combiner from `I` inputs to an `O` output through `A`.
///
/// Implementations hold only immutable configuration and are invoked from
/// many workers at once; an accumulator is never shared between concurrent
/// calls. Callers must use the accumulator returned by `add_input`,
/// `merge_accumulators` and `compact`, never the one they passed in.
pub trait CombineFn<I, A, O>: Send + Sync + 'static {
    /// A fresh accumulator representing zero combined inputs.
    fn create_accumulator(&self) -> A;

    /// Fold one input into `acc`.
    fn add_input(&self, acc: A, input: I) -> A;

    /// Merge accumulators that each absorbed a subset of the inputs.
    ///
    /// An empty `accs` must yield the same as `create_accumulator()`.
    fn merge_accumulators(&self, accs: Vec<A>) -> A;

    /// Terminal read of a finished accumulator.
    fn extract_output(&self, acc: A) -> O;

    /// Re-densify `acc` without changing its logical value.
    fn compact(&self, acc: A) -> A {
        acc
    }

    /// Output for zero inputs.
    fn default_value(&self) -> O {
        self.extract_output(self.create_accumulator())
    }

    /// Combine `inputs` in a single batch.
    fn apply<It>(&self, inputs: It) -> O
    where
        It: IntoIterator<Item = I>,
        Self: Sized,
    {
        let acc = inputs
            .into_iter()
            .fold(self.create_accumulator(), |acc, i| self.add_input(acc, i));
        self.extract_output(acc)
    }

    /// Coder for accumulators, given the coder of the inputs when known.
    fn accumulator_coder(
        &self,
        registry: &CoderRegistry,
        _input_coder: Option<&Arc<dyn Coder<I>>>,
    ) -> Result<Arc<dyn Coder<A>>, CoderError>
    where
        A: 'static,
    {
        registry.coder_for::<A>()
    }

    fn output_coder(
        &self,
        registry: &CoderRegistry,
        _input_coder: Option<&Arc<dyn Coder<I>>>,
    ) -> Result<Arc<dyn Coder<O>>, CoderError>
    where
        O: 'static,
    {
        registry.coder_for::<O>()
    }

    /// Error message used when default-value insertion meets a collection
    /// that is not globally windowed.
    fn incompatible_global_window_error_message(&self) -> String {
        format!(
            "Default values are not supported in Combine::globally() if the output \
             collection is not windowed by GlobalWindows. Instead, use \
             Combine::globally(..).without_defaults() to output an empty collection \
             if the input is empty, or Combine::globally(..).as_singleton_view() to \
             get the default output of {} when a window is empty.",
            type_name::<Self>()
        )
    }
}

/// Per-key combiner: every operation also receives the group's key and context.
pub trait KeyedCombineFn<K, I, A, O>: Send + Sync + 'static {
    fn create_accumulator(&self, key: &K, ctx: &CombineContext) -> A;

    fn add_input(&self, key: &K, acc: A, input: I, ctx: &CombineContext) -> A;

    /// An empty `accs` must yield the same as `create_accumulator(key, ctx)`.
    fn merge_accumulators(&self, key: &K, accs: Vec<A>, ctx: &CombineContext) -> A;

    fn extract_output(&self, key: &K, acc: A, ctx: &CombineContext) -> O;

    fn compact(&self, _key: &K, acc: A, _ctx: &CombineContext) -> A {
        acc
    }

    /// Combine all `inputs` of one key in a single batch.
    fn apply<It>(&self, key: &K, inputs: It, ctx: &CombineContext) -> O
    where
        It: IntoIterator<Item = I>,
        Self: Sized,
    {
        let acc = inputs
            .into_iter()
            .fold(self.create_accumulator(key, ctx), |acc, i| {
                self.add_input(key, acc, i, ctx)
            });
        self.extract_output(key, acc, ctx)
    }

    fn accumulator_coder(
        &self,
        registry: &CoderRegistry,
        _key_coder: Option<&Arc<dyn Coder<K>>>,
        _input_coder: Option<&Arc<dyn Coder<I>>>,
    ) -> Result<Arc<dyn Coder<A>>, CoderError>
    where
        A: 'static,
    {
        registry.coder_for::<A>()
    }

    fn output_coder(
        &self,
        registry: &CoderRegistry,
        _key_coder: Option<&Arc<dyn Coder<K>>>,
        _input_coder: Option<&Arc<dyn Coder<I>>>,
    ) -> Result<Arc<dyn Coder<O>>, CoderError>
    where
        O: 'static,
    {
        registry.coder_for::<O>()
    }

    /// Short name used in transform descriptions.
    fn describe(&self) -> String {
        type_name::<Self>().to_string()
    }
}

/// A [`CombineFn`] used as a [`KeyedCombineFn`] that ignores key and context.
#[derive(Clone, Debug, Default)]
pub struct Keyed<C>(pub C);

impl<C> Keyed<C> {
    pub fn inner(&self) -> &C {
        &self.0
    }

    pub fn into_inner(self) -> C {
        self.0
    }
}

/// Promote a key-independent combiner to the keyed form.
pub fn as_keyed<C>(comb: C) -> Keyed<C> {
    Keyed(comb)
}

impl<K, I, A, O, C> KeyedCombineFn<K, I, A, O> for Keyed<C>
where
    C: CombineFn<I, A, O>,
{
    fn create_accumulator(&self, _key: &K, _ctx: &CombineContext) -> A {
        self.0.create_accumulator()
    }

    fn add_input(&self, _key: &K, acc: A, input: I, _ctx: &CombineContext) -> A {
        self.0.add_input(acc, input)
    }

    fn merge_accumulators(&self, _key: &K, accs: Vec<A>, _ctx: &CombineContext) -> A {
        self.0.merge_accumulators(accs)
    }

    fn extract_output(&self, _key: &K, acc: A, _ctx: &CombineContext) -> O {
        self.0.extract_output(acc)
    }

    fn compact(&self, _key: &K, acc: A, _ctx: &CombineContext) -> A {
        self.0.compact(acc)
    }

    fn accumulator_coder(
        &self,
        registry: &CoderRegistry,
        _key_coder: Option<&Arc<dyn Coder<K>>>,
        input_coder: Option<&Arc<dyn Coder<I>>>,
    ) -> Result<Arc<dyn Coder<A>>, CoderError>
    where
        A: 'static,
    {
        self.0.accumulator_coder(registry, input_coder)
    }

    fn output_coder(
        &self,
        registry: &CoderRegistry,
        _key_coder: Option<&Arc<dyn Coder<K>>>,
        input_coder: Option<&Arc<dyn Coder<I>>>,
    ) -> Result<Arc<dyn Coder<O>>, CoderError>
    where
        O: 'static,
    {
        self.0.output_coder(registry, input_coder)
    }

    fn describe(&self) -> String {
        type_name::<C>().to_string()
    }
}

/// A [`KeyedCombineFn`] bound to one key, usable as a [`CombineFn`].
///
/// Calls run in the global window without side inputs.
pub struct ForKey<C, K> {
    comb: C,
    key: K,
    ctx: Arc<CombineContext>,
}

/// Bind a keyed combiner to `key`.
pub fn for_key<C, K>(comb: C, key: K) -> ForKey<C, K> {
    ForKey { comb, key, ctx: Arc::new(CombineContext::global()) }
}

impl<C, K> ForKey<C, K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn into_inner(self) -> C {
        self.comb
    }
}

impl<K, I, A, O, C> CombineFn<I, A, O> for ForKey<C, K>
where
    C: KeyedCombineFn<K, I, A, O>,
    K: Send + Sync + 'static,
{
    fn create_accumulator(&self) -> A {
        self.comb.create_accumulator(&self.key, &self.ctx)
    }

    fn add_input(&self, acc: A, input: I) -> A {
        self.comb.add_input(&self.key, acc, input, &self.ctx)
    }

    fn merge_accumulators(&self, accs: Vec<A>) -> A {
        self.comb.merge_accumulators(&self.key, accs, &self.ctx)
    }

    fn extract_output(&self, acc: A) -> O {
        self.comb.extract_output(&self.key, acc, &self.ctx)
    }

    fn compact(&self, acc: A) -> A {
        self.comb.compact(&self.key, acc, &self.ctx)
    }

    fn accumulator_coder(
        &self,
        registry: &CoderRegistry,
        input_coder: Option<&Arc<dyn Coder<I>>>,
    ) -> Result<Arc<dyn Coder<A>>, CoderError>
    where
        A: 'static,
    {
        self.comb.accumulator_coder(registry, None, input_coder)
    }

    fn output_coder(
        &self,
        registry: &CoderRegistry,
        input_coder: Option<&Arc<dyn Coder<I>>>,
    ) -> Result<Arc<dyn Coder<O>>, CoderError>
    where
        O: 'static,
    {
        self.comb.output_coder(registry, None, input_coder)
    }
}
