//! Hot-key fan-out.
//!
//! A key whose spread is 2 or more has its records tagged with a nonce in
//! `[0, spread)` and grouped by `(key, nonce)`, so up to `spread` workers each
//! pre-combine a shard of it. The shard results are partial accumulators;
//! they are flattened with the untouched ("cold") records of every other key
//! and merged by a post-combine that accepts both shapes:
//!
//! ```text
//!            +-- spread >= 2 --> (K, nonce), I --GBK--> PreCombine --> (K, Accum(A)) --+
//! (K, I) ----+                                                                        +--> GBK --> PostCombine --> (K, O)
//!            +-- spread <= 1 --> (K, Input(I)) ---------------------------------------+
//! ```
//!
//! The result equals the plain per-key combine for any spread.
//!
//! Nonces come from a per-bundle counter seeded by a [`NonceSeed`] and taken
//! modulo the spread. The counter only spreads load within a bundle; nothing
//! coordinates bundles or workers, so an even spread is not guaranteed.

use super::grouped_values::GroupedValues;
use crate::accumulator::InputOrAccum;
use crate::coders::{Coder, CoderRegistry, InputOrAccumCoder, KvCoder, VarIntCoder};
use crate::collection::{Data, PCollection, flatten};
use crate::combine_fn::KeyedCombineFn;
use crate::error::{CoderError, CombineError};
use crate::helpers::keyed::{GroupByKeyOptions, kv_components};
use crate::side_inputs::{CombineContext, SideInputs};
use crate::window::{AccumulationMode, WindowedValue};
use anyhow::Result;
use rand::Rng;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Spread of each key; 0 or 1 means "not hot".
pub(crate) type HotKeyFanout<K> = Arc<dyn Fn(&K) -> usize + Send + Sync>;

pub(crate) fn constant_fanout<K: 'static>(spread: usize) -> HotKeyFanout<K> {
    Arc::new(move |_: &K| spread)
}

/// Source of the starting value of each bundle's nonce counter.
pub trait NonceSeed: Send + Sync {
    fn bundle_seed(&self) -> u64;
}

/// Random starting point per bundle.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomNonceSeed;

impl NonceSeed for RandomNonceSeed {
    fn bundle_seed(&self) -> u64 {
        rand::thread_rng().r#gen()
    }
}

/// The same starting point for every bundle; makes nonce sequences reproducible.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedNonceSeed(pub u64);

impl NonceSeed for FixedNonceSeed {
    fn bundle_seed(&self) -> u64 {
        self.0
    }
}

/// Record after the hot/cold split.
#[derive(Clone, Debug)]
enum Routed<K, I> {
    Hot((K, u32), I),
    Cold(K, I),
}

/// Shard combine: the user combiner keyed by `(key, nonce)` whose output is
/// the accumulator itself.
pub(crate) struct PreCombine<C, O> {
    comb: Arc<C>,
    _o: PhantomData<fn() -> O>,
}

impl<C, O> PreCombine<C, O> {
    fn new(comb: Arc<C>) -> Self {
        Self { comb, _o: PhantomData }
    }
}

impl<C, K, I, A, O> KeyedCombineFn<(K, u32), I, A, A> for PreCombine<C, O>
where
    C: KeyedCombineFn<K, I, A, O>,
    O: 'static,
{
    fn create_accumulator(&self, key: &(K, u32), ctx: &CombineContext) -> A {
        self.comb.create_accumulator(&key.0, ctx)
    }

    fn add_input(&self, key: &(K, u32), acc: A, input: I, ctx: &CombineContext) -> A {
        self.comb.add_input(&key.0, acc, input, ctx)
    }

    fn merge_accumulators(&self, key: &(K, u32), accs: Vec<A>, ctx: &CombineContext) -> A {
        self.comb.merge_accumulators(&key.0, accs, ctx)
    }

    fn extract_output(&self, key: &(K, u32), acc: A, ctx: &CombineContext) -> A {
        self.comb.compact(&key.0, acc, ctx)
    }

    fn compact(&self, key: &(K, u32), acc: A, ctx: &CombineContext) -> A {
        self.comb.compact(&key.0, acc, ctx)
    }

    fn describe(&self) -> String {
        format!("PreCombine({})", self.comb.describe())
    }
}

/// Final combine over raw inputs and partial accumulators of the same key.
pub(crate) struct PostCombine<C> {
    comb: Arc<C>,
}

impl<C> PostCombine<C> {
    pub(crate) fn new(comb: Arc<C>) -> Self {
        Self { comb }
    }
}

impl<C, K, I, A, O> KeyedCombineFn<K, InputOrAccum<I, A>, A, O> for PostCombine<C>
where
    C: KeyedCombineFn<K, I, A, O>,
    I: 'static,
    A: 'static,
{
    fn create_accumulator(&self, key: &K, ctx: &CombineContext) -> A {
        self.comb.create_accumulator(key, ctx)
    }

    fn add_input(&self, key: &K, acc: A, input: InputOrAccum<I, A>, ctx: &CombineContext) -> A {
        match input {
            InputOrAccum::Input(i) => self.comb.add_input(key, acc, i, ctx),
            InputOrAccum::Accum(a) => self.comb.merge_accumulators(key, vec![acc, a], ctx),
        }
    }

    fn merge_accumulators(&self, key: &K, accs: Vec<A>, ctx: &CombineContext) -> A {
        self.comb.merge_accumulators(key, accs, ctx)
    }

    fn extract_output(&self, key: &K, acc: A, ctx: &CombineContext) -> O {
        self.comb.extract_output(key, acc, ctx)
    }

    fn compact(&self, key: &K, acc: A, ctx: &CombineContext) -> A {
        self.comb.compact(key, acc, ctx)
    }

    fn accumulator_coder(
        &self,
        registry: &CoderRegistry,
        key_coder: Option<&Arc<dyn Coder<K>>>,
        input_coder: Option<&Arc<dyn Coder<InputOrAccum<I, A>>>>,
    ) -> Result<Arc<dyn Coder<A>>, CoderError> {
        self.comb.accumulator_coder(registry, key_coder, raw_input_coder(input_coder).as_ref())
    }

    fn output_coder(
        &self,
        registry: &CoderRegistry,
        key_coder: Option<&Arc<dyn Coder<K>>>,
        input_coder: Option<&Arc<dyn Coder<InputOrAccum<I, A>>>>,
    ) -> Result<Arc<dyn Coder<O>>, CoderError>
    where
        O: 'static,
    {
        self.comb.output_coder(registry, key_coder, raw_input_coder(input_coder).as_ref())
    }

    fn describe(&self) -> String {
        format!("PostCombine({})", self.comb.describe())
    }
}

fn raw_input_coder<I: 'static, A: 'static>(
    coder: Option<&Arc<dyn Coder<InputOrAccum<I, A>>>>,
) -> Option<Arc<dyn Coder<I>>> {
    coder
        .and_then(|c| c.as_any().downcast_ref::<InputOrAccumCoder<I, A>>())
        .map(InputOrAccumCoder::input_coder)
}

/// The hot records keyed by `(key, nonce)`, for the shard stage.
///
/// The shard stage never accumulates fired panes.
fn hot_records<K: Data, I: Data>(split: PCollection<Routed<K, I>>) -> PCollection<((K, u32), I)> {
    let original = split.windowing_strategy();
    let strategy = match original.mode {
        AccumulationMode::AccumulatingFiredPanes => {
            original.with_mode(AccumulationMode::DiscardingFiredPanes)
        }
        AccumulationMode::DiscardingFiredPanes => original,
    };
    split
        .flat_map(|r: &Routed<K, I>| match r {
            Routed::Hot(kn, v) => vec![(kn.clone(), v.clone())],
            Routed::Cold(..) => Vec::new(),
        })
        .with_windowing_strategy(strategy)
}

pub(crate) fn expand_hot_key_fanout<C, K, I, A, O>(
    input: PCollection<(K, I)>,
    comb: Arc<C>,
    fanout: HotKeyFanout<K>,
    nonce_seed: Arc<dyn NonceSeed>,
    side_inputs: SideInputs,
    few_keys: bool,
) -> Result<PCollection<(K, O)>>
where
    C: KeyedCombineFn<K, I, A, O>,
    K: Data + Eq + Hash,
    I: Data,
    A: Data,
    O: Data,
{
    let registry = input.pipeline().coder_registry();
    let (key_coder, input_coder) = kv_components(input.coder());
    let key_coder = key_coder.or_else(|| registry.coder_for::<K>().ok());
    let input_coder = input_coder.or_else(|| registry.coder_for::<I>().ok());
    let accum_coder = comb
        .accumulator_coder(&registry, key_coder.as_ref(), input_coder.as_ref())
        .map_err(CombineError::AccumulatorCoder)?;

    let original = input.windowing_strategy();

    let split = input.map_bundle(move |bundle: &[WindowedValue<(K, I)>]| {
        let mut counter = nonce_seed.bundle_seed();
        let mut hot = 0usize;
        let out: Vec<WindowedValue<Routed<K, I>>> = bundle
            .iter()
            .map(|wv| {
                let (k, v) = &wv.value;
                let spread = fanout(k);
                if spread <= 1 {
                    return wv.with_value(Routed::Cold(k.clone(), v.clone()));
                }
                let nonce = (counter % spread as u64) as u32;
                counter = counter.wrapping_add(1);
                hot += 1;
                wv.with_value(Routed::Hot((k.clone(), nonce), v.clone()))
            })
            .collect();
        debug!(records = out.len(), hot, "hot key fan-out split bundle");
        out
    });

    let hot = hot_records(split.clone());
    let hot = match (&key_coder, &input_coder) {
        (Some(kc), Some(ic)) => {
            let nonce_key: Arc<dyn Coder<(K, u32)>> =
                Arc::new(KvCoder::new(Arc::clone(kc), Arc::new(VarIntCoder)));
            hot.set_coder(Arc::new(KvCoder::new(nonce_key, Arc::clone(ic))))
        }
        _ => hot,
    };

    let precombined = hot
        .group_by_key_with(GroupByKeyOptions { few_keys: false, value_coder: input_coder.clone() })
        .apply(GroupedValues::<_, (K, u32), I, A, A>::from_shared(
            Arc::new(PreCombine::<C, O>::new(Arc::clone(&comb))),
            side_inputs.clone(),
        ))?
        .map(|(kn, acc): &((K, u32), A)| (kn.0.clone(), InputOrAccum::<I, A>::Accum(acc.clone())))
        .with_windowing_strategy(original);

    let cold = split.flat_map(|r: &Routed<K, I>| match r {
        Routed::Cold(k, v) => vec![(k.clone(), InputOrAccum::<I, A>::Input(v.clone()))],
        Routed::Hot(..) => Vec::new(),
    });

    let union_coder: Option<Arc<dyn Coder<InputOrAccum<I, A>>>> = match input_coder {
        Some(ic) => Some(Arc::new(InputOrAccumCoder::new(ic, accum_coder))),
        None => {
            debug!("post-combine shuffle runs without an input coder");
            None
        }
    };

    flatten(&[precombined, cold])?
        .group_by_key_with(GroupByKeyOptions { few_keys, value_coder: union_coder })
        .apply(GroupedValues::<_, K, InputOrAccum<I, A>, A, O>::from_shared(
            Arc::new(PostCombine::new(comb)),
            side_inputs,
        ))
}
