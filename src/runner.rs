//! Executes a pipeline graph sequentially or on a Rayon pool.
//!
//! Nodes are evaluated bottom-up from the terminal node. Each node's output is
//! a list of bundles, memoized so a node feeding several consumers (a split
//! followed by a flatten, say) runs only once. Stateless chains are fused per
//! bundle; grouping nodes are barriers that merge every bundle before
//! re-splitting their output.

use crate::node::{DynOp, Node};
use crate::node_id::NodeId;
use crate::pipeline::Pipeline;
use crate::type_token::{Bundle, Partition};
use crate::window::WindowedValue;
use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use std::any::{Any, type_name};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Clone, Copy, Debug)]
pub enum ExecMode {
    Sequential,
    Parallel { threads: Option<usize>, partitions: Option<usize> },
}

pub struct Runner {
    pub mode: ExecMode,
    pub default_partitions: usize,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            mode: ExecMode::Parallel { threads: None, partitions: None },
            default_partitions: 2 * num_cpus::get().max(2),
        }
    }
}

impl Runner {
    /// Sequential runner: one bundle, one thread.
    pub fn sequential() -> Self {
        Self { mode: ExecMode::Sequential, ..Default::default() }
    }

    /// Evaluate `terminal` and return its windowed elements.
    pub fn run_collect_windowed<T: Clone + Send + Sync + 'static>(
        &self,
        p: &Pipeline,
        terminal: NodeId,
    ) -> Result<Vec<WindowedValue<T>>> {
        let (parallel, parts) = match self.mode {
            ExecMode::Sequential => (false, 1),
            ExecMode::Parallel { partitions, .. } => {
                (true, partitions.unwrap_or(self.default_partitions).max(1))
            }
        };
        let mut eval = Evaluation {
            nodes: p.snapshot(),
            memo: HashMap::new(),
            parallel,
            parts,
        };
        debug!(terminal = terminal.raw(), parallel, parts, "running pipeline");

        let bundles = match self.mode {
            ExecMode::Parallel { threads: Some(t), .. } => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(t)
                    .build()
                    .context("building runner thread pool")?;
                pool.install(|| eval.evaluate(terminal))?
            }
            _ => eval.evaluate(terminal)?,
        };

        let mut out = Vec::new();
        for b in bundles.iter() {
            let v = b
                .downcast_ref::<Vec<WindowedValue<T>>>()
                .ok_or_else(|| anyhow!("terminal type mismatch: expected {}", type_name::<T>()))?;
            out.extend(v.iter().cloned());
        }
        Ok(out)
    }

    /// Evaluate `terminal` and return its element values.
    pub fn run_collect<T: Clone + Send + Sync + 'static>(
        &self,
        p: &Pipeline,
        terminal: NodeId,
    ) -> Result<Vec<T>> {
        Ok(self
            .run_collect_windowed::<T>(p, terminal)?
            .into_iter()
            .map(|wv| wv.value)
            .collect())
    }
}

struct Evaluation {
    nodes: HashMap<NodeId, Node>,
    memo: HashMap<NodeId, Arc<Vec<Bundle>>>,
    parallel: bool,
    parts: usize,
}

impl Evaluation {
    fn evaluate(&mut self, id: NodeId) -> Result<Arc<Vec<Bundle>>> {
        if let Some(done) = self.memo.get(&id) {
            return Ok(Arc::clone(done));
        }
        let node = self
            .nodes
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("missing node {id:?}"))?;
        let inputs = node
            .inputs()
            .into_iter()
            .map(|i| self.evaluate(i))
            .collect::<Result<Vec<_>>>()?;

        trace!(node = id.raw(), kind = node.kind(), "evaluating node");
        let out: Vec<Bundle> = match node {
            Node::Source { payload, vec_ops, elem_tag } => {
                let len = vec_ops.len(&*payload).unwrap_or(0);
                let n = if self.parallel { self.parts.min(len.max(1)) } else { 1 };
                vec_ops
                    .split(&*payload, n)
                    .ok_or_else(|| anyhow!("source payload is not a Vec of {}", elem_tag.name))?
                    .into_iter()
                    .map(|p| -> Bundle { Arc::from(p) })
                    .collect()
            }
            Node::Stateless { ops, .. } => {
                let input = &inputs[0];
                let run = |b: &Bundle| -> Result<Bundle> {
                    Ok(Arc::from(fuse_stateless(&ops, &**b)?))
                };
                if self.parallel {
                    input.par_iter().map(run).collect::<Result<Vec<_>>>()?
                } else {
                    input.iter().map(run).collect::<Result<Vec<_>>>()?
                }
            }
            Node::GroupByKey { local, merge, .. } => {
                let input = &inputs[0];
                let run = |b: &Bundle| local(&**b);
                let locals: Vec<Partition> = if self.parallel {
                    input.par_iter().map(run).collect::<Result<Vec<_>>>()?
                } else {
                    input.iter().map(run).collect::<Result<Vec<_>>>()?
                };
                let n = if self.parallel { self.parts } else { 1 };
                merge(locals, n)?
                    .into_iter()
                    .map(|p| -> Bundle { Arc::from(p) })
                    .collect()
            }
            Node::Flatten { .. } => inputs
                .iter()
                .flat_map(|bundles| bundles.iter().cloned())
                .collect(),
        };

        debug!(node = id.raw(), bundles = out.len(), "node evaluated");
        let out = Arc::new(out);
        self.memo.insert(id, Arc::clone(&out));
        Ok(out)
    }
}

/// Run a fused stateless stage over one bundle.
fn fuse_stateless(ops: &[Arc<dyn DynOp>], input: &dyn Any) -> Result<Partition> {
    let mut ops = ops.iter();
    let first = ops.next().ok_or_else(|| anyhow!("empty stateless stage"))?;
    ops.try_fold(first.apply(input)?, |acc, op| op.apply(&*acc))
}
