//! List-buffering combiner around a `Fn(Vec<V>) -> V`.

use crate::coders::{Coder, CoderRegistry, IterableCoder};
use crate::collection::Data;
use crate::combine_fn::CombineFn;
use crate::error::CoderError;
use std::sync::Arc;

/// Number of inputs buffered before the closure collapses them.
pub const DEFAULT_BUFFER_SIZE: usize = 20;

/// Combiner that buffers raw inputs and periodically collapses them with a
/// user closure.
///
/// The closure receives a batch of values (possibly previous results) and
/// returns their combination; it must be associative and commutative over
/// those batches. Collapsing happens when the buffer grows past the
/// threshold, on merge, on `compact`, and on extract.
///
/// - Accumulator: `Vec<V>`
/// - Output: `V`
#[derive(Clone)]
pub struct IterableCombineFn<V, F> {
    f: F,
    buffer_size: usize,
    _v: std::marker::PhantomData<fn() -> V>,
}

impl<V, F> IterableCombineFn<V, F>
where
    F: Fn(Vec<V>) -> V,
{
    pub fn new(f: F) -> Self {
        Self { f, buffer_size: DEFAULT_BUFFER_SIZE, _v: std::marker::PhantomData }
    }

    /// Copy of this combiner collapsing after `buffer_size` inputs (minimum 1).
    pub fn with_buffer_size(self, buffer_size: usize) -> Self {
        Self { buffer_size: buffer_size.max(1), ..self }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn collapse(&self, buf: Vec<V>) -> Vec<V> {
        vec![(self.f)(buf)]
    }
}

impl<V, F> CombineFn<V, Vec<V>, V> for IterableCombineFn<V, F>
where
    V: Data,
    F: Fn(Vec<V>) -> V + Send + Sync + 'static,
{
    fn create_accumulator(&self) -> Vec<V> {
        Vec::new()
    }

    fn add_input(&self, mut acc: Vec<V>, input: V) -> Vec<V> {
        acc.push(input);
        if acc.len() > self.buffer_size {
            self.collapse(acc)
        } else {
            acc
        }
    }

    fn merge_accumulators(&self, accs: Vec<Vec<V>>) -> Vec<V> {
        let all: Vec<V> = accs.into_iter().flatten().collect();
        if all.is_empty() {
            self.create_accumulator()
        } else {
            self.collapse(all)
        }
    }

    fn extract_output(&self, acc: Vec<V>) -> V {
        (self.f)(acc)
    }

    fn compact(&self, acc: Vec<V>) -> Vec<V> {
        if acc.len() > 1 {
            self.collapse(acc)
        } else {
            acc
        }
    }

    fn accumulator_coder(
        &self,
        registry: &CoderRegistry,
        input_coder: Option<&Arc<dyn Coder<V>>>,
    ) -> Result<Arc<dyn Coder<Vec<V>>>, CoderError> {
        let elem = input_coder.cloned().map_or_else(|| registry.coder_for::<V>(), Ok)?;
        Ok(Arc::new(IterableCoder::new(elem)))
    }

    fn output_coder(
        &self,
        registry: &CoderRegistry,
        input_coder: Option<&Arc<dyn Coder<V>>>,
    ) -> Result<Arc<dyn Coder<V>>, CoderError> {
        input_coder.cloned().map_or_else(|| registry.coder_for::<V>(), Ok)
    }
}
