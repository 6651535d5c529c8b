//! Combine of already grouped values: `(K, Vec<I>) -> (K, O)`.

use super::bind_kv_output_coder;
use crate::coders::{Coder, IterableCoder};
use crate::collection::{Data, PCollection, PTransform};
use crate::combine_fn::KeyedCombineFn;
use crate::helpers::keyed::kv_components;
use crate::side_inputs::{SideInput, SideInputs};
use crate::window::WindowedValue;
use anyhow::Result;
use std::marker::PhantomData;
use std::sync::Arc;

/// Runs a keyed combiner over each grouped record.
///
/// For every `(key, values)` record: resolve the side inputs for the record's
/// window, create an accumulator, add every value, extract. The output
/// `(key, output)` keeps the record's window and is stamped with the window's
/// end-of-window timestamp.
pub struct GroupedValues<C, K, I, A, O> {
    pub(crate) comb: Arc<C>,
    pub(crate) side_inputs: SideInputs,
    _t: PhantomData<fn(K, I) -> (A, O)>,
}

impl<C, K, I, A, O> Clone for GroupedValues<C, K, I, A, O> {
    fn clone(&self) -> Self {
        Self::from_shared(Arc::clone(&self.comb), self.side_inputs.clone())
    }
}

impl<C, K, I, A, O> GroupedValues<C, K, I, A, O> {
    pub(crate) fn from_shared(comb: Arc<C>, side_inputs: SideInputs) -> Self {
        Self { comb, side_inputs, _t: PhantomData }
    }

    pub fn combine_fn(&self) -> &C {
        &self.comb
    }

    pub fn side_inputs(&self) -> &SideInputs {
        &self.side_inputs
    }

    /// Copy of this transform that also reads `side`.
    pub fn with_side_inputs<T: Send + Sync + 'static>(&self, side: &SideInput<T>) -> Self {
        Self::from_shared(Arc::clone(&self.comb), self.side_inputs.and(side))
    }
}

impl<C, K, I, A, O> PTransform<(K, Vec<I>), (K, O)> for GroupedValues<C, K, I, A, O>
where
    C: KeyedCombineFn<K, I, A, O>,
    K: Data,
    I: Data,
    A: 'static,
    O: Data,
{
    fn expand(&self, input: PCollection<(K, Vec<I>)>) -> Result<PCollection<(K, O)>> {
        let (key_coder, values_coder) = kv_components(input.coder());
        let input_coder: Option<Arc<dyn Coder<I>>> = values_coder.as_ref().and_then(|c| {
            c.as_any().downcast_ref::<IterableCoder<I>>().map(IterableCoder::elem_coder)
        });
        let registry = input.pipeline().coder_registry();
        let output_coder = self
            .comb
            .output_coder(&registry, key_coder.as_ref(), input_coder.as_ref());
        let key_coder = key_coder.map_or_else(|| registry.coder_for::<K>(), Ok);

        let comb = Arc::clone(&self.comb);
        let sides = self.side_inputs.clone();
        let out = input.map_windowed(move |wv: &WindowedValue<(K, Vec<I>)>| {
            let ctx = sides.resolve(wv.window);
            let (key, values) = &wv.value;
            let acc = values
                .iter()
                .cloned()
                .fold(comb.create_accumulator(key, &ctx), |acc, v| {
                    comb.add_input(key, acc, v, &ctx)
                });
            let output = comb.extract_output(key, acc, &ctx);
            vec![WindowedValue::new(
                (key.clone(), output),
                wv.window.max_timestamp(),
                wv.window,
            )]
        });

        bind_kv_output_coder(out, key_coder, output_coder)
    }

    fn name(&self) -> String {
        format!("Combine.GroupedValues({})", self.comb.describe())
    }

    fn display_data(&self) -> serde_json::Value {
        serde_json::json!({
            "combine_fn": self.comb.describe(),
            "side_inputs": self.side_inputs.len(),
        })
    }
}
