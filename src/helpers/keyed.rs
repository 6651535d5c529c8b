//! Key/value helpers and the grouping engine.
//!
//! `group_by_key` groups `(K, V)` elements by key *and window* and emits one
//! `(K, Vec<V>)` per group, stamped with the window's end-of-window
//! timestamp. It runs in two phases like every barrier in the runner: a local
//! phase per bundle, then a merge that re-splits the groups into bundles by
//! key hash. When a value coder is known, values cross the barrier encoded,
//! which is what a shuffle between machines would do to them.

use crate::coders::{Coder, IterableCoder, KvCoder, decode_from_slice, encode_to_vec};
use crate::collection::{Data, PCollection};
use crate::node::{LocalFn, MergeFn, Node};
use crate::type_token::Partition;
use crate::window::{BoundedWindow, WindowedValue};
use anyhow::{Context, Result, anyhow};
use std::any::Any;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, trace};

type Groups<K, X> = HashMap<(K, BoundedWindow), Vec<X>>;

/// Options of [`PCollection::group_by_key_with`].
pub struct GroupByKeyOptions<V> {
    /// Hint that there are few distinct keys: the grouped output stays in a
    /// single bundle instead of being spread by key hash.
    pub few_keys: bool,
    /// Coder for values crossing the barrier. `None` falls back to the
    /// collection's `KvCoder`, then to the pipeline registry.
    pub value_coder: Option<Arc<dyn Coder<V>>>,
}

impl<V> Default for GroupByKeyOptions<V> {
    fn default() -> Self {
        Self { few_keys: false, value_coder: None }
    }
}

impl<T: Data> PCollection<T> {
    /// Derive a key and produce `(K, T)`.
    pub fn key_by<K, F>(self, key_fn: F) -> PCollection<(K, T)>
    where
        K: Data,
        F: 'static + Send + Sync + Fn(&T) -> K,
    {
        self.map(move |t| (key_fn(t), t.clone()))
    }

    /// Pair every element with the same `key`.
    pub fn with_key<K: Data>(self, key: K) -> PCollection<(K, T)> {
        let registry = self.pipeline.coder_registry();
        let coder = match (registry.coder_for::<K>(), self.coder.clone()) {
            (Ok(kc), Some(vc)) => Some(Arc::new(KvCoder::new(kc, vc)) as Arc<dyn Coder<(K, T)>>),
            _ => None,
        };
        let out = self.map(move |t| (key.clone(), t.clone()));
        match coder {
            Some(c) => out.set_coder(c),
            None => out,
        }
    }
}

/// Component coders of a `(K, V)` collection, when its coder is a [`KvCoder`].
pub(crate) fn kv_components<K: 'static, V: 'static>(
    coder: Option<&Arc<dyn Coder<(K, V)>>>,
) -> (Option<Arc<dyn Coder<K>>>, Option<Arc<dyn Coder<V>>>) {
    match coder.and_then(|c| c.as_any().downcast_ref::<KvCoder<K, V>>()) {
        Some(kv) => (Some(kv.key_coder()), Some(kv.value_coder())),
        None => (None, None),
    }
}

impl<K: Data, V: Data> PCollection<(K, V)> {
    /// Transform only the value of each pair.
    pub fn map_values<O, F>(self, f: F) -> PCollection<(K, O)>
    where
        O: Data,
        F: 'static + Send + Sync + Fn(&V) -> O,
    {
        self.map(move |kv: &(K, V)| (kv.0.clone(), f(&kv.1)))
    }

    /// Drop the keys.
    pub fn values(self) -> PCollection<V> {
        let (_, value_coder) = kv_components(self.coder.as_ref());
        let out = self.map(|kv: &(K, V)| kv.1.clone());
        match value_coder {
            Some(c) => out.set_coder(c),
            None => out,
        }
    }

    /// Drop the values.
    pub fn keys(self) -> PCollection<K> {
        let (key_coder, _) = kv_components(self.coder.as_ref());
        let out = self.map(|kv: &(K, V)| kv.0.clone());
        match key_coder {
            Some(c) => out.set_coder(c),
            None => out,
        }
    }
}

impl<K: Data + Eq + Hash, V: Data> PCollection<(K, V)> {
    /// Group values by key and window: `(K, V) -> (K, Vec<V>)`.
    pub fn group_by_key(self) -> PCollection<(K, Vec<V>)> {
        self.group_by_key_with(GroupByKeyOptions::default())
    }

    pub fn group_by_key_with(self, opts: GroupByKeyOptions<V>) -> PCollection<(K, Vec<V>)> {
        let few_keys = opts.few_keys;
        let registry = self.pipeline.coder_registry();
        let (input_key_coder, input_value_coder) = kv_components(self.coder.as_ref());
        let key_coder = input_key_coder.or_else(|| registry.coder_for::<K>().ok());
        let value_coder = opts
            .value_coder
            .or(input_value_coder)
            .or_else(|| registry.coder_for::<V>().ok());
        let grouped_coder: Option<Arc<dyn Coder<(K, Vec<V>)>>> =
            match (key_coder, value_coder.as_ref()) {
                (Some(k), Some(v)) => {
                    let values: Arc<dyn Coder<Vec<V>>> = Arc::new(IterableCoder::new(Arc::clone(v)));
                    Some(Arc::new(KvCoder::new(k, values)))
                }
                _ => None,
            };

        let (local, merge): (LocalFn, MergeFn) = match value_coder {
            Some(coder) => {
                debug!(coder = %coder.describe(), few_keys, "group_by_key with encoded values");
                let enc = Arc::clone(&coder);
                let local: LocalFn = Arc::new(move |p: &dyn Any| {
                    gbk_local::<K, V, Vec<u8>>(p, |v| {
                        encode_to_vec(enc.as_ref(), v).context("encoding grouped value")
                    })
                });
                let merge: MergeFn = Arc::new(move |parts: Vec<Partition>, n: usize| {
                    gbk_merge::<K, V, Vec<u8>>(parts, n, few_keys, |bytes| {
                        decode_from_slice(coder.as_ref(), &bytes).context("decoding grouped value")
                    })
                });
                (local, merge)
            }
            None => {
                debug!(few_keys, "group_by_key without a value coder");
                let local: LocalFn =
                    Arc::new(|p: &dyn Any| gbk_local::<K, V, V>(p, |v| Ok(v.clone())));
                let merge: MergeFn = Arc::new(move |parts: Vec<Partition>, n: usize| {
                    gbk_merge::<K, V, V>(parts, n, few_keys, Ok)
                });
                (local, merge)
            }
        };

        let id = self.pipeline.insert_node(Node::GroupByKey { input: self.id, local, merge });
        PCollection::new(self.pipeline.clone(), id, self.strategy, grouped_coder)
    }
}

fn gbk_local<K, V, X>(p: &dyn Any, ship: impl Fn(&V) -> Result<X>) -> Result<Partition>
where
    K: Data + Eq + Hash,
    V: Data,
    X: Send + Sync + 'static,
{
    let kv = p
        .downcast_ref::<Vec<WindowedValue<(K, V)>>>()
        .ok_or_else(|| anyhow!("GBK local: bad input"))?;
    let mut m: Groups<K, X> = HashMap::new();
    for wv in kv {
        let (k, v) = &wv.value;
        m.entry((k.clone(), wv.window)).or_default().push(ship(v)?);
    }
    Ok(Box::new(m))
}

fn gbk_merge<K, V, X>(
    parts: Vec<Partition>,
    n: usize,
    few_keys: bool,
    receive: impl Fn(X) -> Result<V>,
) -> Result<Vec<Partition>>
where
    K: Data + Eq + Hash,
    V: Data,
    X: Send + Sync + 'static,
{
    let mut acc: Groups<K, X> = HashMap::new();
    for p in parts {
        let m = *p
            .downcast::<Groups<K, X>>()
            .map_err(|_| anyhow!("GBK merge: bad part"))?;
        for (k, vs) in m {
            acc.entry(k).or_default().extend(vs);
        }
    }

    let n = if few_keys { 1 } else { n.max(1) };
    let mut out: Vec<Vec<WindowedValue<(K, Vec<V>)>>> = (0..n).map(|_| Vec::new()).collect();
    let groups = acc.len();
    for ((k, w), shipped) in acc {
        let vs = shipped.into_iter().map(&receive).collect::<Result<Vec<V>>>()?;
        let slot = if n == 1 { 0 } else { bucket_of(&k, n) };
        out[slot].push(WindowedValue::new((k, vs), w.max_timestamp(), w));
    }
    trace!(groups, bundles = n, "GBK merged");
    Ok(out.into_iter().map(|b| Box::new(b) as Partition).collect())
}

fn bucket_of<K: Hash>(k: &K, n: usize) -> usize {
    let mut h = DefaultHasher::new();
    k.hash(&mut h);
    (h.finish() % n as u64) as usize
}
