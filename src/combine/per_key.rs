//! Per-key combine: grouping followed by the grouped-values executor.

use super::fanout::{self, HotKeyFanout, NonceSeed, PostCombine, RandomNonceSeed};
use super::grouped_values::GroupedValues;
use crate::accumulator::InputOrAccum;
use crate::coders::{Coder, InputOrAccumCoder};
use crate::collection::{Data, PCollection, PTransform};
use crate::combine_fn::KeyedCombineFn;
use crate::helpers::keyed::{GroupByKeyOptions, kv_components};
use crate::side_inputs::{SideInput, SideInputs};
use crate::window::{BoundedWindow, WindowedValue};
use anyhow::Result;
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// `(K, I) -> (K, O)`: one output per key and window.
///
/// Every `with_*` method returns a modified copy; the receiver is unchanged.
pub struct PerKey<C, K, I, A, O> {
    comb: Arc<C>,
    side_inputs: SideInputs,
    few_keys: bool,
    lifting: bool,
    fanout: Option<HotKeyFanout<K>>,
    nonce_seed: Arc<dyn NonceSeed>,
    _t: PhantomData<fn(K, I) -> (A, O)>,
}

impl<C, K, I, A, O> Clone for PerKey<C, K, I, A, O> {
    fn clone(&self) -> Self {
        Self {
            comb: Arc::clone(&self.comb),
            side_inputs: self.side_inputs.clone(),
            few_keys: self.few_keys,
            lifting: self.lifting,
            fanout: self.fanout.clone(),
            nonce_seed: Arc::clone(&self.nonce_seed),
            _t: PhantomData,
        }
    }
}

impl<C, K, I, A, O> PerKey<C, K, I, A, O> {
    pub fn new(comb: C) -> Self {
        Self::from_shared(Arc::new(comb))
    }

    pub(crate) fn from_shared(comb: Arc<C>) -> Self {
        Self {
            comb,
            side_inputs: SideInputs::new(),
            few_keys: false,
            lifting: false,
            fanout: None,
            nonce_seed: Arc::new(RandomNonceSeed),
            _t: PhantomData,
        }
    }

    pub fn combine_fn(&self) -> &C {
        &self.comb
    }

    pub fn side_inputs(&self) -> &SideInputs {
        &self.side_inputs
    }

    pub fn has_fanout(&self) -> bool {
        self.fanout.is_some()
    }

    /// Copy of this transform that also reads `side`.
    pub fn with_side_inputs<T: Send + Sync + 'static>(&self, side: &SideInput<T>) -> Self {
        Self { side_inputs: self.side_inputs.and(side), ..self.clone() }
    }

    pub(crate) fn with_side_input_set(&self, side_inputs: SideInputs) -> Self {
        Self { side_inputs, ..self.clone() }
    }

    /// Copy of this transform that hints the grouping there are few distinct keys.
    pub fn with_few_keys(&self, few_keys: bool) -> Self {
        Self { few_keys, ..self.clone() }
    }

    /// Copy of this transform that pre-combines every bundle before grouping.
    pub fn with_combiner_lifting(&self) -> Self {
        Self { lifting: true, ..self.clone() }
    }

    /// Copy of this transform that spreads each key over `fanout(key)` shards.
    ///
    /// Keys with a spread of 0 or 1 take the ordinary path.
    pub fn with_hot_key_fanout<F>(&self, fanout: F) -> Self
    where
        F: Fn(&K) -> usize + Send + Sync + 'static,
    {
        Self { fanout: Some(Arc::new(fanout)), ..self.clone() }
    }

    /// [`with_hot_key_fanout`](Self::with_hot_key_fanout) with the same spread for every key.
    pub fn with_hot_key_fanout_const(&self, spread: usize) -> Self
    where
        K: 'static,
    {
        Self { fanout: Some(fanout::constant_fanout(spread)), ..self.clone() }
    }

    /// Copy of this transform drawing its per-bundle nonce seeds from `seed`.
    pub fn with_nonce_seed(&self, seed: Arc<dyn NonceSeed>) -> Self {
        Self { nonce_seed: seed, ..self.clone() }
    }
}

impl<C, K, I, A, O> PerKey<C, K, I, A, O>
where
    C: KeyedCombineFn<K, I, A, O>,
    K: Data + Eq + Hash,
    I: Data,
    A: Data,
    O: Data,
{
    fn expand_direct(&self, input: PCollection<(K, I)>) -> Result<PCollection<(K, O)>> {
        let grouped = input.group_by_key_with(GroupByKeyOptions {
            few_keys: self.few_keys,
            value_coder: None,
        });
        grouped.apply(GroupedValues::<C, K, I, A, O>::from_shared(
            Arc::clone(&self.comb),
            self.side_inputs.clone(),
        ))
    }

    /// Pre-combine each bundle to one compacted accumulator per key and
    /// window, then finish with the same post-combine as hot-key fan-out.
    fn expand_lifted(&self, input: PCollection<(K, I)>) -> Result<PCollection<(K, O)>> {
        let registry = input.pipeline().coder_registry();
        let (key_coder, input_coder) = kv_components(input.coder());
        let input_coder = input_coder.map_or_else(|| registry.coder_for::<I>(), Ok);
        let accum_coder =
            self.comb
                .accumulator_coder(&registry, key_coder.as_ref(), input_coder.as_ref().ok());
        let union_coder = match (input_coder, accum_coder) {
            (Ok(i), Ok(a)) => {
                Some(Arc::new(InputOrAccumCoder::new(i, a)) as Arc<dyn Coder<InputOrAccum<I, A>>>)
            }
            _ => {
                debug!("lifted combine shuffles accumulators without a coder");
                None
            }
        };

        let comb = Arc::clone(&self.comb);
        let sides = self.side_inputs.clone();
        let partials = input.map_bundle(move |bundle: &[WindowedValue<(K, I)>]| {
            let mut accs: HashMap<(K, BoundedWindow), A> = HashMap::new();
            let mut order: Vec<(K, BoundedWindow)> = Vec::new();
            let mut contexts = HashMap::new();
            for wv in bundle {
                let (k, v) = &wv.value;
                let ctx = contexts.entry(wv.window).or_insert_with(|| sides.resolve(wv.window));
                let slot = (k.clone(), wv.window);
                let acc = match accs.remove(&slot) {
                    Some(acc) => acc,
                    None => {
                        order.push(slot.clone());
                        comb.create_accumulator(k, ctx)
                    }
                };
                accs.insert(slot, comb.add_input(k, acc, v.clone(), ctx));
            }
            order
                .into_iter()
                .filter_map(|slot| {
                    let acc = accs.remove(&slot)?;
                    let (k, w) = slot;
                    let ctx = contexts.get(&w)?;
                    let acc = comb.compact(&k, acc, ctx);
                    Some(WindowedValue::new((k, InputOrAccum::Accum(acc)), w.max_timestamp(), w))
                })
                .collect()
        });

        partials
            .group_by_key_with(GroupByKeyOptions {
                few_keys: self.few_keys,
                value_coder: union_coder,
            })
            .apply(GroupedValues::<_, K, InputOrAccum<I, A>, A, O>::from_shared(
                Arc::new(PostCombine::new(Arc::clone(&self.comb))),
                self.side_inputs.clone(),
            ))
    }
}

impl<C, K, I, A, O> PTransform<(K, I), (K, O)> for PerKey<C, K, I, A, O>
where
    C: KeyedCombineFn<K, I, A, O>,
    K: Data + Eq + Hash,
    I: Data,
    A: Data,
    O: Data,
{
    fn expand(&self, input: PCollection<(K, I)>) -> Result<PCollection<(K, O)>> {
        match &self.fanout {
            Some(f) => fanout::expand_hot_key_fanout(
                input,
                Arc::clone(&self.comb),
                Arc::clone(f),
                Arc::clone(&self.nonce_seed),
                self.side_inputs.clone(),
                self.few_keys,
            ),
            None if self.lifting => self.expand_lifted(input),
            None => self.expand_direct(input),
        }
    }

    fn name(&self) -> String {
        format!("Combine.PerKey({})", self.comb.describe())
    }

    fn display_data(&self) -> serde_json::Value {
        serde_json::json!({
            "combine_fn": self.comb.describe(),
            "few_keys": self.few_keys,
            "combiner_lifting": self.lifting,
            "hot_key_fanout": self.fanout.is_some(),
            "side_inputs": self.side_inputs.len(),
        })
    }
}
