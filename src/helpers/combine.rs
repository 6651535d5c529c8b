//! Method-call shorthands for the combine transforms.

use crate::collection::{Data, PCollection};
use crate::combine::Combine;
use crate::combine_fn::CombineFn;
use anyhow::Result;
use std::hash::Hash;

impl<K: Data + Eq + Hash, V: Data> PCollection<(K, V)> {
    /// `apply(Combine::per_key(comb))`.
    pub fn combine_values<C, A, O>(self, comb: C) -> Result<PCollection<(K, O)>>
    where
        C: CombineFn<V, A, O>,
        A: Data,
        O: Data,
    {
        self.apply(Combine::per_key(comb))
    }

    /// [`combine_values`](Self::combine_values) with every bundle pre-combined
    /// before the grouping.
    pub fn combine_values_lifted<C, A, O>(self, comb: C) -> Result<PCollection<(K, O)>>
    where
        C: CombineFn<V, A, O>,
        A: Data,
        O: Data,
    {
        self.apply(Combine::per_key(comb).with_combiner_lifting())
    }
}

impl<K: Data, V: Data> PCollection<(K, Vec<V>)> {
    /// Combine the output of a `group_by_key`.
    pub fn combine_grouped<C, A, O>(self, comb: C) -> Result<PCollection<(K, O)>>
    where
        C: CombineFn<V, A, O>,
        A: Data,
        O: Data,
    {
        self.apply(Combine::grouped_values(comb))
    }
}

impl<T: Data> PCollection<T> {
    /// `apply(Combine::globally(comb))`, sharded over `fanout` workers when given.
    pub fn combine_globally<C, A, O>(self, comb: C, fanout: Option<usize>) -> Result<PCollection<O>>
    where
        C: CombineFn<T, A, O>,
        A: Data,
        O: Data,
    {
        let t = Combine::globally(comb);
        match fanout {
            Some(n) => self.apply(t.with_fanout(n)),
            None => self.apply(t),
        }
    }
}
