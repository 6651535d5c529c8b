//! Whole-collection combine.
//!
//! Implemented on the per-key path: every element is keyed by `()`, combined
//! per key, and the key dropped again. When default insertion is on, windows
//! with no input still produce `default_value()`. That is detected by grouping
//! the combined outputs together with one always-present guard record: a
//! group holding only the guard marks a window with no output.
//!
//! Default insertion only makes sense for the global window, the one window
//! known to exist even without data; any other windowing is rejected when
//! the transform is applied.

use super::per_key::PerKey;
use crate::collection::{Data, PCollection, PTransform, flatten, from_vec};
use crate::combine_fn::{CombineFn, Keyed};
use crate::error::CombineError;
use crate::helpers::keyed::GroupByKeyOptions;
use crate::side_inputs::{SideInput, SideInputs, side_windowed};
use crate::window::{BoundedWindow, WindowFn, WindowingStrategy};
use anyhow::Result;
use std::any::type_name;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// `I -> O`: one output per window.
///
/// Every `with_*` method returns a modified copy; the receiver is unchanged.
pub struct Globally<C, I, A, O> {
    comb: Arc<Keyed<C>>,
    insert_default: bool,
    fanout: usize,
    side_inputs: SideInputs,
    _t: PhantomData<fn(I) -> (A, O)>,
}

impl<C, I, A, O> Clone for Globally<C, I, A, O> {
    fn clone(&self) -> Self {
        Self {
            comb: Arc::clone(&self.comb),
            insert_default: self.insert_default,
            fanout: self.fanout,
            side_inputs: self.side_inputs.clone(),
            _t: PhantomData,
        }
    }
}

impl<C, I, A, O> Globally<C, I, A, O> {
    pub(crate) fn new(comb: C) -> Self {
        Self {
            comb: Arc::new(Keyed(comb)),
            insert_default: true,
            fanout: 0,
            side_inputs: SideInputs::new(),
            _t: PhantomData,
        }
    }

    pub fn combine_fn(&self) -> &C {
        self.comb.inner()
    }

    pub fn inserts_default(&self) -> bool {
        self.insert_default
    }

    pub fn fanout(&self) -> usize {
        self.fanout
    }

    pub fn side_inputs(&self) -> &SideInputs {
        &self.side_inputs
    }

    /// Copy of this transform that emits nothing for windows without input.
    pub fn without_defaults(&self) -> Self {
        Self { insert_default: false, ..self.clone() }
    }

    /// Copy of this transform that pre-combines on `fanout` shards when `fanout >= 2`.
    pub fn with_fanout(&self, fanout: usize) -> Self {
        Self { fanout, ..self.clone() }
    }

    /// Copy of this transform that also reads `side`.
    pub fn with_side_inputs<T: Send + Sync + 'static>(&self, side: &SideInput<T>) -> Self {
        Self { side_inputs: self.side_inputs.and(side), ..self.clone() }
    }
}

/// Marks the two sides of the default-insertion grouping.
#[derive(Clone)]
enum Slot<O> {
    Guard,
    Output(O),
}

impl<C, I, A, O> Globally<C, I, A, O>
where
    C: CombineFn<I, A, O>,
    I: Data,
    A: Data,
    O: Data,
{
    fn check_windowing(&self, strategy: &WindowingStrategy) -> Result<()> {
        if strategy.window_fn.is_compatible(&WindowFn::Global) {
            return Ok(());
        }
        Err(CombineError::IncompatibleWindowFn {
            window_fn: strategy.window_fn.to_string(),
            message: self.comb.inner().incompatible_global_window_error_message(),
        }
        .into())
    }

    fn combine_per_key(&self, input: PCollection<I>) -> Result<PCollection<O>> {
        let mut per_key = PerKey::<Keyed<C>, (), I, A, O>::from_shared(Arc::clone(&self.comb))
            .with_few_keys(true)
            .with_side_input_set(self.side_inputs.clone());
        if self.fanout >= 2 {
            per_key = per_key.with_hot_key_fanout_const(self.fanout);
        }
        Ok(input.with_key(()).apply(per_key)?.values())
    }

    fn insert_default(&self, combined: PCollection<O>) -> Result<PCollection<O>> {
        let p = combined.pipeline().clone();
        let default = self.comb.inner().default_value();
        let guard = from_vec(&p, vec![Slot::<O>::Guard]);
        let outputs = combined.clone().map(|o: &O| Slot::Output(o.clone()));

        let defaults = flatten(&[guard, outputs])?
            .with_key(())
            .group_by_key_with(GroupByKeyOptions { few_keys: true, value_coder: None })
            .flat_map(move |(_, slots): &((), Vec<Slot<O>>)| {
                if slots.iter().any(|s| matches!(s, Slot::Output(_))) {
                    Vec::new()
                } else {
                    debug!("inserting default value for empty window");
                    vec![default.clone()]
                }
            });
        let defaults = match combined.coder() {
            Some(c) => defaults.set_coder(Arc::clone(c)),
            None => defaults,
        };
        flatten(&[combined, defaults])
    }

    /// Execute the combine and expose its result as a per-window lookup.
    ///
    /// Windows without output resolve to `default_value()` unless defaults
    /// are disabled. No windowing check applies, so this is the way to get
    /// defaults for non-global windows.
    pub fn as_singleton_view(&self, input: PCollection<I>) -> Result<SingletonView<O>> {
        let mut by_window: HashMap<BoundedWindow, Vec<O>> = HashMap::new();
        for wv in self.combine_per_key(input)?.collect_windowed_seq()? {
            by_window.entry(wv.window).or_default().push(wv.value);
        }
        let default = self.insert_default.then(|| self.comb.inner().default_value());
        Ok(SingletonView { by_window, default })
    }
}

impl<C, I, A, O> PTransform<I, O> for Globally<C, I, A, O>
where
    C: CombineFn<I, A, O>,
    I: Data,
    A: Data,
    O: Data,
{
    fn expand(&self, input: PCollection<I>) -> Result<PCollection<O>> {
        if !self.insert_default {
            return self.combine_per_key(input);
        }
        self.check_windowing(&input.windowing_strategy())?;
        let combined = self.combine_per_key(input)?;
        self.insert_default(combined)
    }

    fn name(&self) -> String {
        format!("Combine.Globally({})", type_name::<C>())
    }

    fn display_data(&self) -> serde_json::Value {
        serde_json::json!({
            "combine_fn": type_name::<C>(),
            "insert_default": self.insert_default,
            "fanout": self.fanout,
            "side_inputs": self.side_inputs.len(),
        })
    }
}

/// Result of [`Globally::as_singleton_view`]: at most one value per window.
pub struct SingletonView<O> {
    by_window: HashMap<BoundedWindow, Vec<O>>,
    default: Option<O>,
}

impl<O: Clone> SingletonView<O> {
    /// The value for `window`, or the default when the window had no input.
    pub fn get(&self, window: &BoundedWindow) -> Result<O, CombineError> {
        match self.by_window.get(window).map(Vec::as_slice) {
            Some([one]) => Ok(one.clone()),
            Some(many) if many.len() > 1 => Err(CombineError::AmbiguousSingletonView {
                window: window.to_string(),
                count: many.len(),
            }),
            _ => self
                .default
                .clone()
                .ok_or_else(|| CombineError::EmptySingletonView { window: window.to_string() }),
        }
    }

    pub fn get_global(&self) -> Result<O, CombineError> {
        self.get(&BoundedWindow::Global)
    }

    /// Windows that produced output.
    pub fn windows(&self) -> impl Iterator<Item = &BoundedWindow> {
        self.by_window.keys()
    }

    /// The computed values as a side input for later combines.
    pub fn to_side_input(&self) -> SideInput<O>
    where
        O: Send + Sync + 'static,
    {
        side_windowed(self.by_window.iter().map(|(w, vs)| (*w, vs.clone())).collect())
    }
}
