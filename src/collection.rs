//! Typed collection handles and the element-wise transforms on them.
//!
//! A [`PCollection<T>`] is an immutable handle to one node of a [`Pipeline`]
//! plus what downstream transforms need to know about its elements: the
//! [`WindowingStrategy`] and, when known, the element [`Coder`]. Transforms
//! return new handles; nothing runs until one of the `collect_*` methods.

use crate::coders::Coder;
use crate::node::{DynOp, Node};
use crate::node_id::NodeId;
use crate::pipeline::Pipeline;
use crate::runner::{ExecMode, Runner};
use crate::type_token::Partition;
use crate::window::{Timestamped, WindowedValue, WindowingStrategy};
use anyhow::{Result, anyhow, bail};
use std::any::{Any, type_name};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Bound shared by every element type.
pub trait Data: 'static + Send + Sync + Clone {}
impl<T> Data for T where T: 'static + Send + Sync + Clone {}

pub struct PCollection<T> {
    pub(crate) pipeline: Pipeline,
    pub(crate) id: NodeId,
    pub(crate) strategy: WindowingStrategy,
    pub(crate) coder: Option<Arc<dyn Coder<T>>>,
    _t: PhantomData<fn() -> T>,
}

impl<T> Clone for PCollection<T> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            id: self.id,
            strategy: self.strategy,
            coder: self.coder.clone(),
            _t: PhantomData,
        }
    }
}

/// A transform from a `PCollection<In>` to a `PCollection<Out>`.
///
/// Transforms are immutable configuration; `expand` may be called any number
/// of times and builds graph nodes each time.
pub trait PTransform<In, Out> {
    /// Build the nodes implementing this transform on `input`.
    ///
    /// Configuration errors (an unusable windowing strategy, a missing coder)
    /// are raised here, before anything runs.
    fn expand(&self, input: PCollection<In>) -> Result<PCollection<Out>>;

    fn name(&self) -> String {
        type_name::<Self>().to_string()
    }

    /// Key/value description of the configuration, for debugging output.
    fn display_data(&self) -> serde_json::Value {
        serde_json::json!({})
    }
}

/// Elements without timestamps, in the global window.
///
/// The coder registered for `T` on the pipeline, if any, becomes the
/// collection's element coder.
pub fn from_vec<T: Data>(p: &Pipeline, data: Vec<T>) -> PCollection<T> {
    let coder = p.coder_registry().coder_for::<T>().ok();
    let data = data.into_iter().map(WindowedValue::in_global_window).collect();
    PCollection::new(p.clone(), p.add_source(data), WindowingStrategy::global(), coder)
}

/// Timestamped elements, in the global window until re-windowed.
pub fn from_timestamped<T: Data>(p: &Pipeline, data: Vec<Timestamped<T>>) -> PCollection<T> {
    let coder = p.coder_registry().coder_for::<T>().ok();
    let data = data
        .into_iter()
        .map(|t| WindowedValue::new(t.value, t.ts, crate::window::BoundedWindow::Global))
        .collect();
    PCollection::new(p.clone(), p.add_source(data), WindowingStrategy::global(), coder)
}

/// Concatenate collections of the same type and windowing.
pub fn flatten<T: Data>(colls: &[PCollection<T>]) -> Result<PCollection<T>> {
    let first = colls
        .first()
        .ok_or_else(|| anyhow!("flatten needs at least one collection"))?;
    for c in &colls[1..] {
        if !c.strategy.window_fn.is_compatible(&first.strategy.window_fn) {
            bail!(
                "cannot flatten collections windowed by {} and {}",
                first.strategy.window_fn,
                c.strategy.window_fn
            );
        }
    }
    let inputs = colls.iter().map(|c| c.id).collect();
    let id = first.pipeline.insert_node(Node::Flatten { inputs });
    Ok(PCollection::new(
        first.pipeline.clone(),
        id,
        first.strategy,
        first.coder.clone(),
    ))
}

/* ---------- stateless ops ---------- */

fn downcast_bundle<'a, T: 'static>(input: &'a dyn Any, op: &str) -> Result<&'a Vec<WindowedValue<T>>> {
    input
        .downcast_ref::<Vec<WindowedValue<T>>>()
        .ok_or_else(|| anyhow!("{op}: expected a bundle of {}", type_name::<T>()))
}

struct MapOp<I, O, F>(F, PhantomData<fn(I) -> O>);
impl<I: Data, O: Data, F> DynOp for MapOp<I, O, F>
where
    F: Send + Sync + Fn(&I) -> O + 'static,
{
    fn apply(&self, input: &dyn Any) -> Result<Partition> {
        let v = downcast_bundle::<I>(input, "MapOp")?;
        let out: Vec<WindowedValue<O>> = v.iter().map(|wv| wv.with_value(self.0(&wv.value))).collect();
        Ok(Box::new(out))
    }
}

struct FilterOp<T, P>(P, PhantomData<fn(T)>);
impl<T: Data, P> DynOp for FilterOp<T, P>
where
    P: Send + Sync + Fn(&T) -> bool + 'static,
{
    fn apply(&self, input: &dyn Any) -> Result<Partition> {
        let v = downcast_bundle::<T>(input, "FilterOp")?;
        let out: Vec<WindowedValue<T>> = v.iter().filter(|wv| self.0(&wv.value)).cloned().collect();
        Ok(Box::new(out))
    }
}

struct FlatMapOp<I, O, F>(F, PhantomData<fn(I) -> O>);
impl<I: Data, O: Data, F> DynOp for FlatMapOp<I, O, F>
where
    F: Send + Sync + Fn(&I) -> Vec<O> + 'static,
{
    fn apply(&self, input: &dyn Any) -> Result<Partition> {
        let v = downcast_bundle::<I>(input, "FlatMapOp")?;
        let mut out: Vec<WindowedValue<O>> = Vec::new();
        for wv in v {
            out.extend(self.0(&wv.value).into_iter().map(|o| wv.with_value(o)));
        }
        Ok(Box::new(out))
    }
}

/// Sees (and may rewrite) timestamps and windows.
struct WindowedOp<I, O, F>(F, PhantomData<fn(I) -> O>);
impl<I: Data, O: Data, F> DynOp for WindowedOp<I, O, F>
where
    F: Send + Sync + Fn(&WindowedValue<I>) -> Vec<WindowedValue<O>> + 'static,
{
    fn apply(&self, input: &dyn Any) -> Result<Partition> {
        let v = downcast_bundle::<I>(input, "WindowedOp")?;
        let out: Vec<WindowedValue<O>> = v.iter().flat_map(|wv| self.0(wv)).collect();
        Ok(Box::new(out))
    }
}

/// Sees a whole bundle at once, for per-bundle state.
struct BundleOp<I, O, F>(F, PhantomData<fn(I) -> O>);
impl<I: Data, O: Data, F> DynOp for BundleOp<I, O, F>
where
    F: Send + Sync + Fn(&[WindowedValue<I>]) -> Vec<WindowedValue<O>> + 'static,
{
    fn apply(&self, input: &dyn Any) -> Result<Partition> {
        let v = downcast_bundle::<I>(input, "BundleOp")?;
        Ok(Box::new(self.0(v)))
    }
}

impl<T: Data> PCollection<T> {
    pub(crate) fn new(
        pipeline: Pipeline,
        id: NodeId,
        strategy: WindowingStrategy,
        coder: Option<Arc<dyn Coder<T>>>,
    ) -> Self {
        Self { pipeline, id, strategy, coder, _t: PhantomData }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn node_id(&self) -> NodeId {
        self.id
    }

    pub fn windowing_strategy(&self) -> WindowingStrategy {
        self.strategy
    }

    /// Element coder, when one is known.
    pub fn coder(&self) -> Option<&Arc<dyn Coder<T>>> {
        self.coder.as_ref()
    }

    /// Same elements, with `coder` as their element coder.
    pub fn set_coder(self, coder: Arc<dyn Coder<T>>) -> Self {
        Self { coder: Some(coder), ..self }
    }

    /// Same elements under a different strategy; windows already assigned are kept.
    pub(crate) fn with_windowing_strategy(self, strategy: WindowingStrategy) -> Self {
        Self { strategy, ..self }
    }

    fn chain<O: Data>(&self, op: Arc<dyn DynOp>, coder: Option<Arc<dyn Coder<O>>>) -> PCollection<O> {
        let id = self.pipeline.insert_node(Node::Stateless { input: self.id, ops: vec![op] });
        PCollection::new(self.pipeline.clone(), id, self.strategy, coder)
    }

    pub fn map<O, F>(self, f: F) -> PCollection<O>
    where
        O: Data,
        F: 'static + Send + Sync + Fn(&T) -> O,
    {
        self.chain(Arc::new(MapOp::<T, O, F>(f, PhantomData)), None)
    }

    pub fn filter<F>(self, pred: F) -> PCollection<T>
    where
        F: 'static + Send + Sync + Fn(&T) -> bool,
    {
        let coder = self.coder.clone();
        self.chain(Arc::new(FilterOp::<T, F>(pred, PhantomData)), coder)
    }

    pub fn flat_map<O, F>(self, f: F) -> PCollection<O>
    where
        O: Data,
        F: 'static + Send + Sync + Fn(&T) -> Vec<O>,
    {
        self.chain(Arc::new(FlatMapOp::<T, O, F>(f, PhantomData)), None)
    }

    pub(crate) fn map_windowed<O, F>(self, f: F) -> PCollection<O>
    where
        O: Data,
        F: 'static + Send + Sync + Fn(&WindowedValue<T>) -> Vec<WindowedValue<O>>,
    {
        self.chain(Arc::new(WindowedOp::<T, O, F>(f, PhantomData)), None)
    }

    pub(crate) fn map_bundle<O, F>(self, f: F) -> PCollection<O>
    where
        O: Data,
        F: 'static + Send + Sync + Fn(&[WindowedValue<T>]) -> Vec<WindowedValue<O>>,
    {
        self.chain(Arc::new(BundleOp::<T, O, F>(f, PhantomData)), None)
    }

    /// Apply a composite transform.
    pub fn apply<O, P>(self, transform: P) -> Result<PCollection<O>>
    where
        O: Data,
        P: PTransform<T, O>,
    {
        debug!(
            transform = %transform.name(),
            config = %transform.display_data(),
            input = self.id.raw(),
            "applying transform"
        );
        transform.expand(self)
    }

    pub fn collect_seq(self) -> Result<Vec<T>> {
        Runner::sequential().run_collect::<T>(&self.pipeline, self.id)
    }

    pub fn collect_par(self, threads: Option<usize>, partitions: Option<usize>) -> Result<Vec<T>> {
        let r = Runner { mode: ExecMode::Parallel { threads, partitions }, ..Default::default() };
        r.run_collect::<T>(&self.pipeline, self.id)
    }

    /// Elements with their timestamps and windows.
    pub fn collect_windowed_seq(self) -> Result<Vec<WindowedValue<T>>> {
        Runner::sequential().run_collect_windowed::<T>(&self.pipeline, self.id)
    }

    pub fn collect_windowed_par(
        self,
        threads: Option<usize>,
        partitions: Option<usize>,
    ) -> Result<Vec<WindowedValue<T>>> {
        let r = Runner { mode: ExecMode::Parallel { threads, partitions }, ..Default::default() };
        r.run_collect_windowed::<T>(&self.pipeline, self.id)
    }
}
